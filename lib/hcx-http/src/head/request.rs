/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use http::{HeaderMap, Method, Version, header};
use thiserror::Error;
use tokio::io::AsyncBufRead;

use super::HeaderBlockError;
use crate::io::LimitedBufReadExt;
use crate::{
    ContentLengthMode, FramingError, HttpLineParseError, HttpRequestLine, MessageConstraints,
};

#[derive(Debug, Error)]
pub enum HttpRequestParseError {
    #[error("client closed connection")]
    ClientClosed,
    #[error("truncated request head")]
    Truncated,
    #[error("too large header, should be less than {0}")]
    TooLargeHeader(usize),
    #[error("too many headers, should be less than {0}")]
    TooManyHeaders(usize),
    #[error("invalid request line: {0}")]
    InvalidRequestLine(HttpLineParseError),
    #[error("invalid header line: {0}")]
    InvalidHeaderLine(HttpLineParseError),
    #[error("io failed: {0:?}")]
    IoFailed(#[from] io::Error),
}

fn header_block_error(e: HeaderBlockError) -> HttpRequestParseError {
    match e {
        HeaderBlockError::Closed => HttpRequestParseError::Truncated,
        HeaderBlockError::TooLarge(n) => HttpRequestParseError::TooLargeHeader(n),
        HeaderBlockError::TooMany(n) => HttpRequestParseError::TooManyHeaders(n),
        HeaderBlockError::InvalidLine(e) => HttpRequestParseError::InvalidHeaderLine(e),
        HeaderBlockError::Io(e) => HttpRequestParseError::IoFailed(e),
    }
}

/// Head of a request as written to, or read from, the wire.
#[derive(Clone, Debug)]
pub struct HttpRequestHead {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: HeaderMap,
}

impl HttpRequestHead {
    pub fn new(method: Method, target: String, version: Version) -> Self {
        HttpRequestHead {
            method,
            target,
            version,
            headers: HeaderMap::new(),
        }
    }

    /// Framing of the request body, `None` when the head announces no body.
    pub fn body_mode(&self) -> Result<Option<ContentLengthMode>, FramingError> {
        if self.headers.contains_key(header::TRANSFER_ENCODING)
            || self.headers.contains_key(header::CONTENT_LENGTH)
        {
            ContentLengthMode::for_inbound(&self.headers).map(Some)
        } else {
            Ok(None)
        }
    }

    pub async fn parse<R>(
        reader: &mut R,
        constraints: &MessageConstraints,
    ) -> Result<Self, HttpRequestParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line_buf = Vec::<u8>::with_capacity(1024);
        let max_line = constraints.max_line_length();
        let mut empty_lines = 0usize;

        let (mut req, line_size) = loop {
            line_buf.clear();
            let (found, nr) = reader
                .limited_read_until(b'\n', max_line, &mut line_buf)
                .await?;
            if nr == 0 {
                return Err(HttpRequestParseError::ClientClosed);
            }
            if !found {
                return if nr < max_line {
                    Err(HttpRequestParseError::Truncated)
                } else {
                    Err(HttpRequestParseError::InvalidRequestLine(
                        HttpLineParseError::LineTooLong(max_line),
                    ))
                };
            }

            // empty lines ahead of the request line are ignored
            if crate::trim_line_end(&line_buf).is_empty() {
                empty_lines += 1;
                if empty_lines > constraints.max_garbage_lines() {
                    return Err(HttpRequestParseError::InvalidRequestLine(
                        HttpLineParseError::NotLongEnough,
                    ));
                }
                continue;
            }

            let line =
                HttpRequestLine::parse(&line_buf).map_err(HttpRequestParseError::InvalidRequestLine)?;
            let method = Method::from_bytes(line.method.as_bytes()).map_err(|_| {
                HttpRequestParseError::InvalidRequestLine(HttpLineParseError::InvalidMethod)
            })?;
            break (
                HttpRequestHead::new(method, line.target.to_string(), line.version),
                nr,
            );
        };

        req.headers = super::read_header_block(reader, constraints, line_size, &mut line_buf)
            .await
            .map_err(header_block_error)?;
        Ok(req)
    }

    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        HttpRequestLine {
            method: self.method.as_str(),
            target: &self.target,
            version: self.version,
        }
        .serialize_to(buf);
        super::serialize_headers(&self.headers, buf);
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::<u8>::with_capacity(1024);
        self.serialize_to(&mut buf);
        buf
    }
}
