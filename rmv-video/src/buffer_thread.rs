//! The single video-buffering thread: round-robins decode work across the
//! open streams and keeps each one's ring topped up.
//!
//! Grounded on the driver's background-worker shape (a `JoinHandle` plus an
//! `AtomicBool` run flag, spawned once and joined on shutdown) rather than
//! the bare-metal ISR style the renderer core otherwise imitates, since this
//! thread runs under a hosted OS scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::stream::VideoStream;

pub const MAX_STREAMS: usize = 5;
const IDLE_SLEEP: Duration = Duration::from_millis(2);

struct Shared {
    streams: Mutex<Vec<Option<Arc<Mutex<VideoStream>>>>>,
    running: AtomicBool,
}

pub struct VideoBufferThread {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl VideoBufferThread {
    pub fn start() -> Self {
        let shared = Arc::new(Shared {
            streams: Mutex::new((0..MAX_STREAMS).map(|_| None).collect()),
            running: AtomicBool::new(true),
        });

        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("video-buffer".into())
            .spawn(move || run_loop(worker_shared))
            .expect("failed to spawn video-buffer thread");

        VideoBufferThread { shared, worker: Some(worker) }
    }

    /// Registers a newly opened stream, pre-filling its ring before
    /// returning so the target that owns it has frames ready immediately.
    pub fn open_stream(&self, stream: VideoStream) -> Option<Arc<Mutex<VideoStream>>> {
        let handle = Arc::new(Mutex::new(stream));
        {
            let mut guard = handle.lock().unwrap();
            while guard.ring().has_free_slot() {
                guard.pump_one_frame();
                if guard.eof_observed() || guard.disabled_on_error() {
                    break;
                }
            }
        }

        let mut slots = self.shared.streams.lock().unwrap();
        let free = slots.iter_mut().find(|slot| slot.is_none())?;
        *free = Some(handle.clone());
        Some(handle)
    }

    pub fn close_stream(&self, handle: &Arc<Mutex<VideoStream>>) {
        let mut slots = self.shared.streams.lock().unwrap();
        for slot in slots.iter_mut() {
            if let Some(existing) = slot {
                if Arc::ptr_eq(existing, handle) {
                    *slot = None;
                }
            }
        }
    }

    pub fn open_stream_count(&self) -> usize {
        self.shared.streams.lock().unwrap().iter().filter(|s| s.is_some()).count()
    }
}

impl Drop for VideoBufferThread {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_loop(shared: Arc<Shared>) {
    pin_to_highest_cpu();

    while shared.running.load(Ordering::Relaxed) {
        let mut did_work = false;
        {
            let slots = shared.streams.lock().unwrap();
            for slot in slots.iter().flatten() {
                let mut stream = slot.lock().unwrap();
                let before = stream.frames_decoded();
                stream.pump_one_frame();
                if stream.frames_decoded() != before {
                    did_work = true;
                }
            }
        }
        if !did_work {
            std::thread::sleep(IDLE_SLEEP);
        }
    }
}

/// Affinitizes the calling thread to the highest-numbered CPU, leaving the
/// rest free for the main renderer thread.
fn pin_to_highest_cpu() {
    if let Some(core) = core_affinity::get_core_ids().and_then(|ids| ids.into_iter().max_by_key(|id| id.id)) {
        core_affinity::set_for_current(core);
    }
}

/// Keeps the renderer's main thread off the core the buffer thread claims.
/// `core_affinity` only exposes single-core pinning, not an arbitrary mask,
/// so this pins to the next-highest core rather than a true complement set;
/// keeping the buffer thread's reserved core free is the part that matters.
pub fn restrict_main_thread_affinity() {
    let Some(mut ids) = core_affinity::get_core_ids() else { return };
    if ids.len() < 2 {
        return;
    }
    ids.sort_by_key(|id| id.id);
    ids.pop();
    if let Some(runner_up) = ids.pop() {
        core_affinity::set_for_current(runner_up);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::NullDecoder;

    #[test]
    fn open_stream_prefills_its_ring() {
        let thread = VideoBufferThread::start();
        let stream = VideoStream::new(Box::new(NullDecoder::new(2, 2, 20)), false, false, false);
        let handle = thread.open_stream(stream).expect("room for one stream");
        assert!(handle.lock().unwrap().take_next_frame().is_some());
        assert_eq!(thread.open_stream_count(), 1);
    }

    #[test]
    fn sixth_stream_is_rejected_at_capacity() {
        let thread = VideoBufferThread::start();
        let mut handles = Vec::new();
        for _ in 0..MAX_STREAMS {
            let stream = VideoStream::new(Box::new(NullDecoder::new(2, 2, 5)), false, false, false);
            handles.push(thread.open_stream(stream).unwrap());
        }
        let overflow = VideoStream::new(Box::new(NullDecoder::new(2, 2, 5)), false, false, false);
        assert!(thread.open_stream(overflow).is_none());
    }
}
