//! The shared vertex buffer: 50,000 `(x, y, Tx, Ty)` vertices, with the
//! first 15 preloaded as fixed primitives and the remainder handed out as
//! contiguous slots to dot-based targets.

use crate::error::{GfxError, Result};

pub const VERTEX_CAPACITY: usize = 50_000;
pub const PRELOAD_COUNT: usize = 15;

/// Index of the first vertex of the unit quad (indices 0-5, two triangles).
pub const UNIT_QUAD: usize = 0;
/// Index of the first vertex of the flipped-texture quad used for video
/// (indices 6-11).
pub const VIDEO_QUAD: usize = 6;
/// Index of the first vertex of the unit vertical line (indices 12-13).
pub const UNIT_LINE: usize = 12;
/// Index of the single preloaded point.
pub const POINT: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32, tx: f32, ty: f32) -> Self {
        Vertex { x, y, tx, ty }
    }
}

fn preload_vertices() -> [Vertex; PRELOAD_COUNT] {
    [
        // Unit quad, two triangles, texture origin at bottom-left.
        Vertex::new(-0.5, -0.5, 0.0, 0.0),
        Vertex::new(0.5, -0.5, 1.0, 0.0),
        Vertex::new(0.5, 0.5, 1.0, 1.0),
        Vertex::new(-0.5, -0.5, 0.0, 0.0),
        Vertex::new(0.5, 0.5, 1.0, 1.0),
        Vertex::new(-0.5, 0.5, 0.0, 1.0),
        // Video quad: same geometry, vertically flipped texture coordinates
        // (decoded video frames are top-down).
        Vertex::new(-0.5, -0.5, 0.0, 1.0),
        Vertex::new(0.5, -0.5, 1.0, 1.0),
        Vertex::new(0.5, 0.5, 1.0, 0.0),
        Vertex::new(-0.5, -0.5, 0.0, 1.0),
        Vertex::new(0.5, 0.5, 1.0, 0.0),
        Vertex::new(-0.5, 0.5, 0.0, 0.0),
        // Unit vertical line.
        Vertex::new(0.0, -0.5, 0.0, 0.0),
        Vertex::new(0.0, 0.5, 0.0, 1.0),
        // Single point.
        Vertex::new(0.0, 0.0, 0.0, 0.0),
    ]
}

/// A contiguous reservation within the dynamic region of the vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexSlot {
    pub start: usize,
    pub len: usize,
}

/// Owns the CPU-side mirror of the buffer plus a free-list allocator over
/// the region past the 15 preloaded vertices. Uploading `data()` to the GL
/// buffer object is the caller's responsibility (kept out of this type so
/// it can be unit-tested without a GL context).
pub struct VertexBuffer {
    data: Vec<Vertex>,
    free_ranges: Vec<(usize, usize)>,
    dirty_from: usize,
}

impl VertexBuffer {
    pub fn new() -> Self {
        let mut data = vec![Vertex::default(); VERTEX_CAPACITY];
        for (i, v) in preload_vertices().into_iter().enumerate() {
            data[i] = v;
        }
        VertexBuffer {
            data,
            free_ranges: vec![(PRELOAD_COUNT, VERTEX_CAPACITY - PRELOAD_COUNT)],
            dirty_from: 0,
        }
    }

    pub fn data(&self) -> &[Vertex] {
        &self.data
    }

    /// First-fit reservation of `count` contiguous vertices.
    pub fn reserve(&mut self, count: usize) -> Result<VertexSlot> {
        for i in 0..self.free_ranges.len() {
            let (start, len) = self.free_ranges[i];
            if len >= count {
                if len == count {
                    self.free_ranges.remove(i);
                } else {
                    self.free_ranges[i] = (start + count, len - count);
                }
                return Ok(VertexSlot { start, len: count });
            }
        }
        Err(GfxError::VertexBufferFull(count))
    }

    pub fn free(&mut self, slot: VertexSlot) {
        self.free_ranges.push((slot.start, slot.len));
        self.free_ranges.sort_by_key(|r| r.0);
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (start, len) in self.free_ranges.drain(..) {
            if let Some(last) = merged.last_mut() {
                if last.0 + last.1 == start {
                    last.1 += len;
                    continue;
                }
            }
            merged.push((start, len));
        }
        self.free_ranges = merged;
    }

    pub fn write_slot(&mut self, slot: VertexSlot, vertices: &[Vertex]) {
        debug_assert_eq!(vertices.len(), slot.len);
        self.data[slot.start..slot.start + slot.len].copy_from_slice(vertices);
        self.dirty_from = self.dirty_from.min(slot.start);
    }

    /// Returns, and clears, the byte range that needs re-uploading to the GL
    /// buffer object since the last call.
    pub fn take_dirty_range(&mut self) -> Option<(usize, usize)> {
        if self.dirty_from >= self.data.len() {
            return None;
        }
        let from = self.dirty_from;
        self.dirty_from = self.data.len();
        Some((from, self.data.len() - from))
    }
}

impl Default for VertexBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preload_region_is_never_handed_out() {
        let mut vb = VertexBuffer::new();
        let slot = vb.reserve(10).unwrap();
        assert!(slot.start >= PRELOAD_COUNT);
    }

    #[test]
    fn freed_slots_are_reused_and_merged() {
        let mut vb = VertexBuffer::new();
        let a = vb.reserve(100).unwrap();
        let b = vb.reserve(200).unwrap();
        vb.free(a);
        vb.free(b);
        let c = vb.reserve(300).unwrap();
        assert_eq!(c.start, PRELOAD_COUNT);
        assert_eq!(c.len, 300);
    }

    #[test]
    fn exhausting_the_buffer_returns_an_error() {
        let mut vb = VertexBuffer::new();
        assert!(vb.reserve(VERTEX_CAPACITY).is_err());
        assert!(vb.reserve(VERTEX_CAPACITY - PRELOAD_COUNT).is_ok());
    }
}
