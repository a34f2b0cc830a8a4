//! The per-stream decoded-frame ring: single producer (the buffer thread),
//! single consumer (the main renderer thread), each index owned by exactly
//! one side.
//!
//! This is a safe, `std`-based restatement of the same discipline the
//! driver's race-free scanline buffer uses: one monotonic producer-owned
//! progress counter, one monotonic consumer-owned progress counter, and no
//! per-slot locking on the hot path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const RING_SLOTS: usize = 10;

#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub pts_s: f64,
    pub rgb24: Vec<u8>,
}

/// A fixed 10-slot ring of decoded frames. `write_index` is advanced only by
/// the producer, `read_index` only by the consumer; slot contents are
/// guarded individually so the two sides never block each other on an
/// uncontended slot.
pub struct FrameRing {
    slots: Vec<Mutex<Option<DecodedFrame>>>,
    write_index: AtomicUsize,
    read_index: AtomicUsize,
}

impl FrameRing {
    pub fn new() -> Self {
        FrameRing {
            slots: (0..RING_SLOTS).map(|_| Mutex::new(None)).collect(),
            write_index: AtomicUsize::new(0),
            read_index: AtomicUsize::new(0),
        }
    }

    fn depth(&self) -> usize {
        self.write_index.load(Ordering::Acquire) - self.read_index.load(Ordering::Acquire)
    }

    pub fn has_free_slot(&self) -> bool {
        self.depth() < RING_SLOTS
    }

    pub fn has_ready_frame(&self) -> bool {
        self.depth() > 0
    }

    /// Producer-side: writes into the next free slot and advances
    /// `write_index`. Panics if called with no free slot; callers must check
    /// [`has_free_slot`] first, exactly as the buffer thread does.
    pub fn push(&self, frame: DecodedFrame) {
        assert!(self.has_free_slot(), "ring push with no free slot");
        let idx = self.write_index.load(Ordering::Relaxed) % RING_SLOTS;
        *self.slots[idx].lock().unwrap() = Some(frame);
        self.write_index.fetch_add(1, Ordering::Release);
    }

    /// Consumer-side: returns the oldest undrained frame without advancing
    /// past it. Call [`advance_to_next`] once it has been consumed.
    pub fn peek(&self) -> Option<DecodedFrame> {
        if !self.has_ready_frame() {
            return None;
        }
        let idx = self.read_index.load(Ordering::Relaxed) % RING_SLOTS;
        self.slots[idx].lock().unwrap().clone()
    }

    /// Consumer-side: releases the current slot back to the producer.
    pub fn advance_to_next(&self) {
        if self.has_ready_frame() {
            self.read_index.fetch_add(1, Ordering::Release);
        }
    }
}

impl Default for FrameRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_drain_in_fifo_order() {
        let ring = FrameRing::new();
        for i in 0..3 {
            ring.push(DecodedFrame { pts_s: i as f64, rgb24: vec![] });
        }
        for i in 0..3 {
            assert_eq!(ring.peek().unwrap().pts_s, i as f64);
            ring.advance_to_next();
        }
        assert!(ring.peek().is_none());
    }

    #[test]
    fn ring_reports_full_at_capacity() {
        let ring = FrameRing::new();
        for i in 0..RING_SLOTS {
            assert!(ring.has_free_slot());
            ring.push(DecodedFrame { pts_s: i as f64, rgb24: vec![] });
        }
        assert!(!ring.has_free_slot());
    }
}
