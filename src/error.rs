//! Crate-wide error and result types.
//!
//! Every layer reports expected failures as values. The four kinds are kept
//! apart so a caller can tell a service rejection (`Grpc`, e.g. "flight not
//! found" or rate limiting) from a broken connection (`Transport`) or a
//! corrupt body (`Decode`).

use crate::client::TransportError;
use crate::protocol::{DecodeError, GrpcCode, GrpcError};
use crate::request::BuildError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Grpc(#[from] GrpcError),
    #[error("Build error: {0}")]
    Build(#[from] BuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Decode,
    Grpc,
    Build,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Grpc(_) => ErrorKind::Grpc,
            Self::Build(_) => ErrorKind::Build,
        }
    }

    /// The service status, if this is a status error.
    pub fn grpc(&self) -> Option<&GrpcError> {
        match self {
            Self::Grpc(e) => Some(e),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u32> {
        self.grpc().map(|e| e.status)
    }

    pub fn code(&self) -> Option<GrpcCode> {
        self.grpc().map(GrpcError::code)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(TransportError::Request(e))
    }
}
