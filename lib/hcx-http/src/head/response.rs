/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use http::{HeaderMap, Method, Version};
use log::debug;
use thiserror::Error;
use tokio::io::AsyncBufRead;

use super::HeaderBlockError;
use crate::io::LimitedBufReadExt;
use crate::{
    ContentLengthMode, FramingError, HttpLineParseError, HttpStatusLine, MessageConstraints,
};

#[derive(Debug, Error)]
pub enum HttpResponseParseError {
    #[error("no response: remote closed before responding")]
    NoResponse,
    #[error("truncated response head")]
    Truncated,
    #[error("no valid status line found after {0} lines")]
    TooManyGarbageLines(usize),
    #[error("too large header, should be less than {0}")]
    TooLargeHeader(usize),
    #[error("too many headers, should be less than {0}")]
    TooManyHeaders(usize),
    #[error("invalid status line: {0}")]
    InvalidStatusLine(HttpLineParseError),
    #[error("invalid header line: {0}")]
    InvalidHeaderLine(HttpLineParseError),
    #[error("io failed: {0:?}")]
    IoFailed(#[from] io::Error),
}

fn header_block_error(e: HeaderBlockError) -> HttpResponseParseError {
    match e {
        HeaderBlockError::Closed => HttpResponseParseError::Truncated,
        HeaderBlockError::TooLarge(n) => HttpResponseParseError::TooLargeHeader(n),
        HeaderBlockError::TooMany(n) => HttpResponseParseError::TooManyHeaders(n),
        HeaderBlockError::InvalidLine(e) => HttpResponseParseError::InvalidHeaderLine(e),
        HeaderBlockError::Io(e) => HttpResponseParseError::IoFailed(e),
    }
}

#[derive(Clone, Debug)]
pub struct HttpResponseHead {
    pub version: Version,
    pub code: u16,
    pub reason: String,
    pub headers: HeaderMap,
}

impl HttpResponseHead {
    pub fn new(version: Version, code: u16, reason: &str) -> Self {
        HttpResponseHead {
            version,
            code,
            reason: reason.to_string(),
            headers: HeaderMap::new(),
        }
    }

    #[inline]
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Framing of the body following this head, `None` if no body is expected.
    pub fn body_mode(&self, method: &Method) -> Result<Option<ContentLengthMode>, FramingError> {
        if crate::response_has_body(method, self.code) {
            ContentLengthMode::for_inbound(&self.headers).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read a response head, skipping noise lines before the status line.
    ///
    /// Some intermediaries send blank or junk lines ahead of the real response,
    /// at most `max_garbage_lines` of them are tolerated.
    pub async fn parse<R>(
        reader: &mut R,
        constraints: &MessageConstraints,
    ) -> Result<Self, HttpResponseParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line_buf = Vec::<u8>::with_capacity(1024);
        let max_line = constraints.max_line_length();
        let mut garbage_lines = 0usize;

        let (mut rsp, status_size) = loop {
            line_buf.clear();
            let (found, nr) = reader
                .limited_read_until(b'\n', max_line, &mut line_buf)
                .await?;
            if !found {
                return if nr == 0 && garbage_lines == 0 {
                    Err(HttpResponseParseError::NoResponse)
                } else if nr < max_line {
                    Err(HttpResponseParseError::Truncated)
                } else {
                    Err(HttpResponseParseError::InvalidStatusLine(
                        HttpLineParseError::LineTooLong(max_line),
                    ))
                };
            }

            if HttpStatusLine::has_protocol_version(&line_buf) {
                let line = HttpStatusLine::parse(line_buf.trim_ascii_start())
                    .map_err(HttpResponseParseError::InvalidStatusLine)?;
                break (HttpResponseHead::new(line.version, line.code, line.reason), nr);
            }

            garbage_lines += 1;
            if garbage_lines > constraints.max_garbage_lines() {
                return Err(HttpResponseParseError::TooManyGarbageLines(garbage_lines));
            }
            debug!("skipped garbage line #{garbage_lines} before status line");
        };

        rsp.headers = super::read_header_block(reader, constraints, status_size, &mut line_buf)
            .await
            .map_err(header_block_error)?;
        Ok(rsp)
    }

    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        HttpStatusLine {
            version: self.version,
            code: self.code,
            reason: &self.reason,
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
