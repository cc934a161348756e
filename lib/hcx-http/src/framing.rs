/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use atoi::FromRadix10Checked;
use http::{HeaderMap, Method, header};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("invalid chunked transfer-encoding")]
    InvalidChunkedTransferEncoding,
    #[error("unsupported transfer-encoding: {0}")]
    UnsupportedTransferEncoding(String),
    #[error("invalid content length")]
    InvalidContentLength,
    #[error("conflicting content length values")]
    ConflictingContentLength,
    #[error("identity framing is not allowed for an outgoing message body")]
    IdentityNotAllowed,
}

/// How the body of a message is delimited on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentLengthMode {
    Chunked,
    /// Delimited by the close of the connection.
    Identity,
    Fixed(u64),
}

impl ContentLengthMode {
    /// Framing of a received message body, identity is the fallback.
    pub fn for_inbound(headers: &HeaderMap) -> Result<Self, FramingError> {
        Self::determine(headers, true)
    }

    /// Framing of a message body about to be sent.
    ///
    /// An outgoing body without `Transfer-Encoding` or `Content-Length` can only be
    /// terminated by closing the connection, so it fails unless `allow_identity` is set.
    pub fn for_outbound(headers: &HeaderMap, allow_identity: bool) -> Result<Self, FramingError> {
        Self::determine(headers, allow_identity)
    }

    fn determine(headers: &HeaderMap, allow_identity: bool) -> Result<Self, FramingError> {
        // see https://datatracker.ietf.org/doc/html/rfc9112#section-6.3
        let mut codings: Vec<String> = Vec::new();
        for value in headers.get_all(header::TRANSFER_ENCODING) {
            let value = value
                .to_str()
                .map_err(|_| FramingError::InvalidChunkedTransferEncoding)?;
            for coding in value.split(',') {
                let coding = coding.trim();
                if !coding.is_empty() {
                    codings.push(coding.to_ascii_lowercase());
                }
            }
        }

        if let Some((last, others)) = codings.split_last() {
            if others.iter().any(|c| c == "chunked") {
                // chunked must be applied exactly once, as the final coding
                return Err(FramingError::InvalidChunkedTransferEncoding);
            }
            if last == "chunked" {
                return Ok(ContentLengthMode::Chunked);
            }
            if codings.iter().all(|c| c == "identity") {
                return if allow_identity {
                    Ok(ContentLengthMode::Identity)
                } else {
                    Err(FramingError::IdentityNotAllowed)
                };
            }
            return Err(FramingError::UnsupportedTransferEncoding(codings.join(", ")));
        }

        match content_length(headers)? {
            Some(len) => Ok(ContentLengthMode::Fixed(len)),
            None if allow_identity => Ok(ContentLengthMode::Identity),
            None => Err(FramingError::IdentityNotAllowed),
        }
    }
}

fn parse_content_length(value: &str) -> Result<u64, FramingError> {
    let value = value.trim();
    let (len, used) = u64::from_radix_10_checked(value.as_bytes());
    if used == 0 || used != value.len() {
        return Err(FramingError::InvalidContentLength);
    }
    len.ok_or(FramingError::InvalidContentLength)
}

/// Value of the `Content-Length` headers, repeated values must be identical.
pub(crate) fn content_length(headers: &HeaderMap) -> Result<Option<u64>, FramingError> {
    let mut found: Option<u64> = None;
    for value in headers.get_all(header::CONTENT_LENGTH) {
        let value = value
            .to_str()
            .map_err(|_| FramingError::InvalidContentLength)?;
        for v in value.split(',') {
            let len = parse_content_length(v)?;
            match found {
                Some(prev) if prev != len => return Err(FramingError::ConflictingContentLength),
                _ => found = Some(len),
            }
        }
    }
    Ok(found)
}

/// Whether a response with status `code` to a `method` request may carry a body.
pub fn response_has_body(method: &Method, code: u16) -> bool {
    !(method == Method::HEAD || code < 200 || code == 204 || code == 304)
}
