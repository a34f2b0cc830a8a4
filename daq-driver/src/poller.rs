//! Polls the event-timer FIFO and the renderer link at sub-millisecond
//! resolution, forwarding both onto the main
//! thread over channels. Neither the FIFO drain nor the link read blocks for
//! long: the event timer's `unload` is non-blocking by construction and the
//! link's read timeout is set short at connect time (see [`crate::link`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use daq_engines::{EventSeconds, EventTimerEngine};
use linktalk_proto::Signal;

use crate::link::Link;

/// Resolution floor from .
const POLL_INTERVAL: Duration = Duration::from_micros(500);

pub enum PollEvent {
    Events(Vec<EventSeconds>),
    Signal(Signal),
    LinkClosed,
}

pub struct PollerThread {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PollerThread {
    pub fn spawn(
        timer: Arc<Mutex<EventTimerEngine>>,
        link: Arc<Mutex<Link>>,
        tx: Sender<PollEvent>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_thread = running.clone();
        let worker = std::thread::Builder::new()
            .name("event-link-poller".into())
            .spawn(move || run_loop(timer, link, tx, running_thread))
            .expect("spawn event-link-poller thread");
        PollerThread { running, worker: Some(worker) }
    }
}

impl Drop for PollerThread {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            handle.join().ok();
        }
    }
}

fn run_loop(
    timer: Arc<Mutex<EventTimerEngine>>,
    link: Arc<Mutex<Link>>,
    tx: Sender<PollEvent>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);

        let events = timer.lock().unwrap().unload_seconds(256).unwrap_or_default();
        if !events.is_empty() && tx.send(PollEvent::Events(events)).is_err() {
            return;
        }

        match link.lock().unwrap().recv_signal() {
            Ok(signal) => {
                if tx.send(PollEvent::Signal(signal)).is_err() {
                    return;
                }
            }
            Err(e) if Link::is_timeout(&e) => {}
            Err(e) => {
                log::warn!("link read failed, stopping poller: {e}");
                let _ = tx.send(PollEvent::LinkClosed);
                return;
            }
        }
    }
}
