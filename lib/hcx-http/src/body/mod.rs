/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use crate::HttpLineParseError;

mod chunked_decoder;

mod decoder;
pub use decoder::{HttpBodyDecodeReader, HttpBodyDecoder};

mod encoder;
pub use encoder::{BodyWriteError, HttpBodyEncodeWriter};

/// A received body violated the message framing.
#[derive(Debug, Error)]
pub enum HttpBodyDecodeError {
    #[error("invalid chunk line: {0}")]
    InvalidChunkLine(#[from] HttpLineParseError),
    #[error("too large trailer (> {0})")]
    TooLargeTrailer(usize),
    #[error("no chunk data end found")]
    NoChunkDataEnd,
}

impl From<HttpBodyDecodeError> for io::Error {
    fn from(e: HttpBodyDecodeError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, e)
    }
}

/// The framing error behind an `InvalidData` error returned while decoding a body.
pub fn decode_error(e: &io::Error) -> Option<&HttpBodyDecodeError> {
    e.get_ref()?.downcast_ref::<HttpBodyDecodeError>()
}
