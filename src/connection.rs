//! The channel the driver uses to reach the instrument.
//!
//! Anything that can send a command line and read back a response line can drive a
//! [`Keithley2600`](crate::smu::Keithley2600): a VISA session, a GPIB adapter, or a plain
//! RS-232 port. Byte streams implementing [embedded_io::Read] & [embedded_io::Write] can be
//! wrapped in a [`StreamConnection`] to get the line handling for free.

use embedded_io::{Read, Write};
use thiserror::Error;

/// An open, message-based connection to a single instrument.
pub trait Connection {
    /// Timeouts should be reported with [`embedded_io::ErrorKind::TimedOut`].
    type Error: embedded_io::Error;

    /// Whether the connection can still carry commands.
    fn is_open(&self) -> bool {
        true
    }

    /// Send a single command. Any line termination is the connection's business.
    fn write(&mut self, command: &str) -> Result<(), Self::Error>;

    /// Send a single command and read back one response line into `response`.
    ///
    /// Returns the number of bytes placed in `response`, excluding the line terminator.
    fn query(&mut self, command: &str, response: &mut [u8]) -> Result<usize, Self::Error>;

    /// Release the connection. Further writes are expected to fail.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Errors raised by a [`StreamConnection`].
#[derive(Error, Debug)]
pub enum StreamError<E: embedded_io::Error> {
    #[error("Stream I/O error")]
    Io(E),
    #[error("Response did not fit in the receive buffer")]
    Overflow,
    #[error("Stream is closed")]
    Disconnected,
}

impl<E: embedded_io::Error> embedded_io::Error for StreamError<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            StreamError::Io(err) => err.kind(),
            StreamError::Overflow => embedded_io::ErrorKind::OutOfMemory,
            StreamError::Disconnected => embedded_io::ErrorKind::NotConnected,
        }
    }
}

/// Line oriented [`Connection`] over a byte stream.
///
/// Commands are terminated with `\n`. Responses are read up to the next `\n` and a trailing
/// `\r` is dropped. The 2600 series uses these terminators on its RS-232 and USB-TMC ports.
pub struct StreamConnection<S: Read + Write> {
    stream: S,
    open: bool,
}

impl<S: Read + Write> StreamConnection<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, open: true }
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// An oversized line is still consumed up to its terminator, so the next query reads its
    /// own reply.
    fn read_line(&mut self, response: &mut [u8]) -> Result<usize, StreamError<S::Error>> {
        let mut len = 0;
        let mut overflowed = false;
        // One byte at a time so we never consume past the terminator.
        let mut byte = [0u8; 1];
        loop {
            match self.stream.read(&mut byte) {
                Ok(0) => return Err(StreamError::Disconnected),
                Ok(_) => match byte[0] {
                    b'\n' => break,
                    b'\r' => continue,
                    value => match response.get_mut(len) {
                        Some(slot) => {
                            *slot = value;
                            len += 1;
                        }
                        None => overflowed = true,
                    },
                },
                Err(e) => return Err(StreamError::Io(e)),
            }
        }
        if overflowed {
            return Err(StreamError::Overflow);
        }
        Ok(len)
    }
}

impl<S: Read + Write> Connection for StreamConnection<S> {
    type Error = StreamError<S::Error>;

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&mut self, command: &str) -> Result<(), Self::Error> {
        if !self.open {
            return Err(StreamError::Disconnected);
        }
        self.stream
            .write_all(command.as_bytes())
            .map_err(StreamError::Io)?;
        self.stream.write_all(b"\n").map_err(StreamError::Io)?;
        self.stream.flush().map_err(StreamError::Io)
    }

    fn query(&mut self, command: &str, response: &mut [u8]) -> Result<usize, Self::Error> {
        self.write(command)?;
        self.read_line(response)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        if self.open {
            self.open = false;
            self.stream.flush().map_err(StreamError::Io)?;
        }
        Ok(())
    }
}
