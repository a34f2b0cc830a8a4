//! Simulates the AI engine's start-of-scan interrupt. A real
//! ISR runs in tens of microseconds and only acknowledges the hardware; this
//! hosted-OS stand-in sleeps for one scan interval, acknowledges, and hands
//! the newly available samples to the main thread over a channel rather than
//! touching shared state itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use daq_hal::{AiUnload, Board};

pub struct IsrSimThread {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl IsrSimThread {
    pub fn spawn(board: Arc<Mutex<Board>>, scan_interval_us: u32, unload_tx: Sender<AiUnload>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_thread = running.clone();
        let worker = std::thread::Builder::new()
            .name("ai-isr-sim".into())
            .spawn(move || run_loop(board, scan_interval_us, unload_tx, running_thread))
            .expect("spawn ai-isr-sim thread");
        IsrSimThread { running, worker: Some(worker) }
    }
}

impl Drop for IsrSimThread {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            handle.join().ok();
        }
    }
}

fn run_loop(board: Arc<Mutex<Board>>, scan_interval_us: u32, unload_tx: Sender<AiUnload>, running: Arc<AtomicBool>) {
    let period = Duration::from_micros(scan_interval_us as u64);
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(period);

        let unload = {
            let mut board = board.lock().unwrap();
            let ai = board.analog_input();
            if !ai.acknowledge_interrupt() {
                continue;
            }
            ai.unload(0, 0, false).ok()
        };

        if let Some(unload) = unload {
            if !unload.slow.is_empty() || !unload.fast.is_empty() {
                let _ = unload_tx.send(unload);
            }
        }
    }
}
