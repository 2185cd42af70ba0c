use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{
    core::record::FieldType,
    item::csv::charset::{DecodeError, EncodeError},
};

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("Unable to write record: {0}")]
    Write(#[source] csv::Error),

    #[error("Unable to flush output: {0}")]
    Flush(#[source] io::Error),

    #[error("Unable to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("to readable string failed for field {index}")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },

    #[error("Unable to encode field {index}")]
    Encode {
        index: usize,
        #[source]
        source: EncodeError,
    },

    #[error("Field {index} is declared {expected} but holds a {found} value")]
    FieldType {
        index: usize,
        expected: FieldType,
        found: &'static str,
    },

    #[error("Unable to get length of {}: {source}", path.display())]
    Length {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Writer is already closed")]
    Closed,
}
