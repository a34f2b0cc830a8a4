//! Word-oriented framing: "32-bit integers, first integer is a command or
//! signal tag, remaining integers are the payload. Variable-length payloads
//! carry their length in words as the second integer".

use std::io::{Read, Write};

use crate::error::{ProtoError, Result};

/// Caps the word count a single variable-length payload may declare, so a
/// corrupt or hostile peer cannot make us allocate unboundedly.
pub const MAX_PAYLOAD_WORDS: u32 = 1 << 20;

pub struct WordReader<R: Read> {
    inner: R,
}

impl<R: Read> WordReader<R> {
    pub fn new(inner: R) -> Self {
        WordReader { inner }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ProtoError::Truncated
            } else {
                ProtoError::Io(e)
            }
        })?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_words(&mut self, count: u32) -> Result<Vec<u32>> {
        if count > MAX_PAYLOAD_WORDS {
            return Err(ProtoError::PayloadTooLarge(count, MAX_PAYLOAD_WORDS));
        }
        (0..count).map(|_| self.read_u32()).collect()
    }

    /// Reads a length-prefixed byte string: one word giving the byte count,
    /// rounded up to a whole number of words on the wire.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let byte_len = self.read_u32()?;
        if byte_len > MAX_PAYLOAD_WORDS * 4 {
            return Err(ProtoError::PayloadTooLarge(byte_len, MAX_PAYLOAD_WORDS * 4));
        }
        let word_len = (byte_len as usize + 3) / 4;
        let mut bytes = vec![0u8; word_len * 4];
        self.inner.read_exact(&mut bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ProtoError::Truncated
            } else {
                ProtoError::Io(e)
            }
        })?;
        bytes.truncate(byte_len as usize);
        Ok(bytes)
    }

    pub fn read_string(&mut self) -> Result<String> {
        String::from_utf8(self.read_bytes()?).map_err(|_| ProtoError::InvalidText)
    }
}

pub struct WordWriter<W: Write> {
    inner: W,
}

impl<W: Write> WordWriter<W> {
    pub fn new(inner: W) -> Self {
        WordWriter { inner }
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_u32(value as u32)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_u32(value.to_bits())
    }

    pub fn write_words(&mut self, words: &[u32]) -> Result<()> {
        for w in words {
            self.write_u32(*w)?;
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_u32(bytes.len() as u32)?;
        let padded = (bytes.len() + 3) / 4 * 4;
        self.inner.write_all(bytes)?;
        for _ in bytes.len()..padded {
            self.inner.write_all(&[0u8])?;
        }
        Ok(())
    }

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_and_string_round_trip() {
        let mut buf = Vec::new();
        {
            let mut w = WordWriter::new(&mut buf);
            w.write_u32(0xdead_beef).unwrap();
            w.write_string("chamber-seven").unwrap();
            w.write_i32(-12).unwrap();
        }
        let mut r = WordReader::new(buf.as_slice());
        assert_eq!(r.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(r.read_string().unwrap(), "chamber-seven");
        assert_eq!(r.read_i32().unwrap(), -12);
    }

    #[test]
    fn truncated_stream_is_reported() {
        let buf = [0u8; 2];
        let mut r = WordReader::new(buf.as_slice());
        assert!(matches!(r.read_u32(), Err(ProtoError::Truncated)));
    }
}
