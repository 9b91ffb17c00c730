//! Error types for table parsing and process correlation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single socket-table line was rejected.
///
/// These never abort a table read: the reader logs them and drops the line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid address length: {len} (expected {expected})")]
    InvalidAddressLength { len: usize, expected: &'static str },

    #[error("invalid address hex {0:?}")]
    InvalidAddress(String),

    #[error("invalid port hex {0:?}")]
    InvalidPort(String),

    #[error("endpoint {0:?} must be exactly one address and one port")]
    InvalidEndpoint(String),

    #[error("invalid state hex {0:?}")]
    InvalidState(String),

    #[error("invalid queue pair {0:?}")]
    InvalidQueuePair(String),
}

#[derive(Error, Debug)]
pub enum CorrelateError {
    #[error("record has {fields} raw fields, inode is field 9")]
    MissingInode { fields: usize },

    #[error("failed to list {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Any failure from this crate.
///
/// [`crate::sockets`] only ever returns `Io`: it drops bad lines and logs
/// correlation failures. `Parse` and `Correlate` let callers that drive
/// [`crate::parser::parse_socket_line`] or [`crate::relate_process`]
/// themselves use `?` into one error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Correlate(#[from] CorrelateError),

    #[error("failed to read socket table")]
    Io(#[from] io::Error),
}
