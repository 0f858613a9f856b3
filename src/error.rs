//! Unified error type.

use std::fmt;
use std::net::AddrParseError;

/// The error type returned by portcullis's fallible operations.
///
/// Application-level outcomes (404, 303 to the login page, etc.) are
/// expressed as HTTP [`Response`](crate::Response) values, not as `Error`s.
/// This type surfaces infrastructure failures and faults the pipeline had to
/// contain.
#[derive(Debug)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    Io(std::io::Error),
    /// The bind address is not a valid `host:port`.
    Addr(AddrParseError),
    /// A handler or middleware panicked; carries the normalised message.
    Panic(String),
    /// An access-log sink could not record a request.
    Log(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)    => write!(f, "io: {e}"),
            Self::Addr(e)  => write!(f, "invalid socket address: {e}"),
            Self::Panic(m) => write!(f, "internal error: {m}"),
            Self::Log(m)   => write!(f, "access log: {m}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)   => Some(e),
            Self::Addr(e) => Some(e),
            Self::Panic(_) | Self::Log(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AddrParseError> for Error {
    fn from(e: AddrParseError) -> Self {
        Self::Addr(e)
    }
}
