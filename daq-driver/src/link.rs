//! TCP link to the stimulus renderer. The driver
//! initiates a single session; after that each side writes `Command`s or
//! `Signal`s over the same word-framed stream with no further handshake.

use std::net::TcpStream;
use std::time::Duration;

use linktalk_proto::{Command, Signal, WordReader, WordWriter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("connecting to renderer at {addr}: {source}")]
    Connect { addr: String, source: std::io::Error },
    #[error(transparent)]
    Proto(#[from] linktalk_proto::ProtoError),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Owns the driver side of the link: a `Command` writer and `Signal` reader
/// sharing one `TcpStream`, cloned so reads and writes don't need to share a
/// lock across the poller and main threads.
pub struct Link {
    writer: WordWriter<TcpStream>,
    reader: WordReader<TcpStream>,
}

impl Link {
    /// Connects to the renderer's link server. `read_timeout` bounds
    /// `recv_signal` so the event-poller thread can keep servicing the
    /// event-timer FIFO even when the renderer has nothing to say.
    pub fn connect(addr: &str, read_timeout: Option<Duration>) -> Result<Link> {
        let stream = TcpStream::connect(addr)
            .map_err(|source| LinkError::Connect { addr: addr.to_string(), source })?;
        stream.set_nodelay(true).ok();
        stream.set_read_timeout(read_timeout).ok();
        let writer = WordWriter::new(stream.try_clone().map_err(|source| LinkError::Connect {
            addr: addr.to_string(),
            source,
        })?);
        let reader = WordReader::new(stream);
        log::info!("connected to renderer at {addr}");
        Ok(Link { writer, reader })
    }

    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        command.encode(&mut self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Blocks (up to the configured read timeout) for the next `Signal`.
    /// A timed-out read surfaces as `ProtoError::Io` with `WouldBlock` /
    /// `TimedOut`; callers distinguish that from a real protocol error via
    /// [`Self::is_timeout`].
    pub fn recv_signal(&mut self) -> Result<Signal> {
        Ok(Signal::decode(&mut self.reader)?)
    }

    pub fn is_timeout(err: &LinkError) -> bool {
        matches!(
            err,
            LinkError::Proto(linktalk_proto::ProtoError::Io(e))
                if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
        )
    }
}
