//! The renderer side of the link: accepts the
//! driver's single incoming connection and exchanges `Command`/`Signal`
//! over the same word-framed stream `daq-driver::link` uses.

use std::net::{TcpListener, TcpStream};

use linktalk_proto::{Command, ProtoError, Signal, WordReader, WordWriter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkServerError {
    #[error("binding link server to {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },
    #[error("accepting a driver connection: {0}")]
    Accept(std::io::Error),
    #[error("setting link socket options: {0}")]
    SocketOption(std::io::Error),
    #[error(transparent)]
    Proto(#[from] ProtoError),
}

pub type Result<T> = std::result::Result<T, LinkServerError>;

pub struct LinkServer {
    listener: TcpListener,
}

impl LinkServer {
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|source| LinkServerError::Bind { addr: addr.to_string(), source })?;
        log::info!("link server listening on {addr}");
        Ok(LinkServer { listener })
    }

    /// Blocks for the driver's one connection; there is never more than
    /// one session at a time.
    pub fn accept(&self) -> Result<DriverLink> {
        let (stream, peer) = self.listener.accept().map_err(LinkServerError::Accept)?;
        stream.set_nodelay(true).ok();
        log::info!("driver connected from {peer}");
        let control = stream.try_clone().map_err(LinkServerError::Accept)?;
        let writer = WordWriter::new(stream.try_clone().map_err(LinkServerError::Accept)?);
        let reader = WordReader::new(stream);
        Ok(DriverLink { control, writer, reader })
    }
}

/// One accepted driver session: reads `Command`s, writes `Signal`s. `control`
/// is a third clone of the same socket kept only so read-timeout changes
/// take effect on the stream the reader is blocked on.
pub struct DriverLink {
    control: TcpStream,
    writer: WordWriter<TcpStream>,
    reader: WordReader<TcpStream>,
}

impl DriverLink {
    pub fn recv_command(&mut self) -> Result<Command> {
        Ok(Command::decode(&mut self.reader)?)
    }

    /// Non-blocking variant used inside the animation loop, which must keep
    /// presenting frames even when no command has arrived: reads at most
    /// one command per iteration and never blocks on it.
    pub fn try_recv_command(&mut self) -> Result<Option<Command>> {
        match Command::decode(&mut self.reader) {
            Ok(cmd) => Ok(Some(cmd)),
            Err(ProtoError::Io(e)) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        self.control.set_read_timeout(timeout).map_err(LinkServerError::SocketOption)
    }

    pub fn send_signal(&mut self, signal: &Signal) -> Result<()> {
        signal.encode(&mut self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
