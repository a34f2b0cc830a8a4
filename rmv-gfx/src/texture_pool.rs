//! The texture pool: caches GL textures by `(kind, width, height)`, capped
//! at 50 MB total and trimmed to 45 MB on overflow.

use crate::error::Result;

pub const CAP_BYTES: usize = 50 * 1024 * 1024;
pub const TRIM_TARGET_BYTES: usize = 45 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    AlphaMask,
    RgbaImage,
    RgbFrame,
}

impl TextureKind {
    fn bytes_per_pixel(self) -> usize {
        match self {
            TextureKind::AlphaMask => 1,
            TextureKind::RgbaImage => 4,
            TextureKind::RgbFrame => 3,
        }
    }
}

/// Creates and destroys the GL-side texture object. Kept as a trait so the
/// pool's allocation/eviction policy can be unit-tested without a GL
/// context, mirroring the capability-trait split used for the DAQ hardware.
pub trait TextureBackend {
    fn create(&mut self, kind: TextureKind, width: u32, height: u32) -> u32;
    fn destroy(&mut self, handle: u32);
}

struct Entry {
    handle: u32,
    kind: TextureKind,
    width: u32,
    height: u32,
    in_use: bool,
    bytes: usize,
}

pub struct TexturePool<B: TextureBackend> {
    backend: B,
    entries: Vec<Entry>,
    total_bytes: usize,
}

impl<B: TextureBackend> TexturePool<B> {
    pub fn new(backend: B) -> Self {
        TexturePool {
            backend,
            entries: Vec::new(),
            total_bytes: 0,
        }
    }

    /// Returns the first unused texture of this kind whose dimensions meet
    /// or exceed the request, allocating a new one on a miss, evicting
    /// unused entries (oldest first) if the cap would otherwise be exceeded.
    pub fn acquire(&mut self, kind: TextureKind, width: u32, height: u32) -> Result<u32> {
        if let Some(i) = self.entries.iter().position(|e| {
            !e.in_use && e.kind == kind && e.width >= width && e.height >= height
        }) {
            self.entries[i].in_use = true;
            return Ok(self.entries[i].handle);
        }

        let bytes = width as usize * height as usize * kind.bytes_per_pixel();
        self.evict_to_fit(bytes);

        let handle = self.backend.create(kind, width, height);
        self.entries.push(Entry {
            handle,
            kind,
            width,
            height,
            in_use: true,
            bytes,
        });
        self.total_bytes += bytes;
        Ok(handle)
    }

    pub fn release(&mut self, handle: u32) {
        if let Some(e) = self.entries.iter_mut().find(|e| e.handle == handle) {
            e.in_use = false;
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    fn evict_to_fit(&mut self, incoming_bytes: usize) {
        if self.total_bytes + incoming_bytes <= CAP_BYTES {
            return;
        }
        let mut i = 0;
        while self.total_bytes + incoming_bytes > TRIM_TARGET_BYTES && i < self.entries.len() {
            if !self.entries[i].in_use {
                let e = self.entries.remove(i);
                self.backend.destroy(e.handle);
                self.total_bytes -= e.bytes;
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        next_handle: u32,
        creates: u32,
        destroys: u32,
    }

    impl TextureBackend for CountingBackend {
        fn create(&mut self, _kind: TextureKind, _width: u32, _height: u32) -> u32 {
            self.next_handle += 1;
            self.creates += 1;
            self.next_handle
        }
        fn destroy(&mut self, _handle: u32) {
            self.destroys += 1;
        }
    }

    #[test]
    fn a_large_enough_released_texture_is_reused() {
        let mut pool = TexturePool::new(CountingBackend::default());
        let h1 = pool.acquire(TextureKind::AlphaMask, 64, 64).unwrap();
        pool.release(h1);
        let h2 = pool.acquire(TextureKind::AlphaMask, 32, 32).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(pool.backend.creates, 1);
    }

    #[test]
    fn exceeding_the_cap_evicts_unused_textures_to_the_trim_target() {
        let mut pool = TexturePool::new(CountingBackend::default());
        // 512x512 RGBA image = 1 MiB each; allocate and release 60 of them
        // (60 MiB), which exceeds the 50 MiB cap.
        let mut handles = Vec::new();
        for _ in 0..60 {
            let h = pool.acquire(TextureKind::RgbaImage, 512, 512).unwrap();
            pool.release(h);
            handles.push(h);
        }
        assert!(pool.total_bytes() <= CAP_BYTES);
        assert!(pool.backend.destroys > 0);
    }
}
