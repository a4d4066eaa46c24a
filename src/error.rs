//! Error types for the I/O-facing parts of the codec.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::frequency::Symbol;

/// Errors raised while reading, writing or parsing compressed data.
#[derive(Debug, Error)]
pub enum Error {
    /// The input file does not exist.
    #[error("source file does not exist: {}", path.display())]
    MissingSource { path: PathBuf },

    /// The serialized frequency table at the head of a compressed file is malformed.
    #[error("malformed frequency header: {0}")]
    Header(String),

    /// The input contains a symbol the encoding map has no code for.
    #[error("no code for symbol {0}")]
    UnknownSymbol(Symbol),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
