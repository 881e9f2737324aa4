//! Our error types for the Keithley 2600 driver.

use strum_macros::Display;
use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for Keithley 2600 communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Connection is closed or invalid")]
    Connection,
    #[error("Transport error")]
    Transport(I),
    #[error("Communication timeout")]
    Timeout,
    #[error("Could not parse {0} from instrument response")]
    Parse(ValueKind),
    #[error("Value {0} cannot be sent to the instrument")]
    InvalidValue(f64),
    #[error("Command or response exceeded buffer capacity")]
    BufferError,
}

impl<I: embedded_io::Error> Error<I> {
    /// Wrap an error raised by the connection, splitting out timeouts and lost connections.
    pub(crate) fn transport(err: I) -> Self {
        match err.kind() {
            embedded_io::ErrorKind::TimedOut => Error::Timeout,
            embedded_io::ErrorKind::NotConnected => Error::Connection,
            _ => Error::Transport(err),
        }
    }
}

/// The shape of value we expected to find in a response.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    #[strum(serialize = "a number")]
    Number,
    #[strum(serialize = "an on/off flag")]
    Flag,
    #[strum(serialize = "an enumerated setting")]
    Setting,
    #[strum(serialize = "a current/voltage pair")]
    Pair,
    #[strum(serialize = "an identification string")]
    Identity,
    #[strum(serialize = "text")]
    Text,
}
