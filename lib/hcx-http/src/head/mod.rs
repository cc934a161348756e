/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use http::{HeaderMap, HeaderName, HeaderValue};
use tokio::io::AsyncBufRead;

use crate::io::LimitedBufReadExt;
use crate::{HttpHeaderLine, HttpLineParseError, MessageConstraints};

mod request;
pub use request::{HttpRequestHead, HttpRequestParseError};

mod response;
pub use response::{HttpResponseHead, HttpResponseParseError};

enum HeaderBlockError {
    Closed,
    TooLarge(usize),
    TooMany(usize),
    InvalidLine(HttpLineParseError),
    Io(io::Error),
}

impl From<io::Error> for HeaderBlockError {
    fn from(e: io::Error) -> Self {
        HeaderBlockError::Io(e)
    }
}

fn append_header(
    headers: &mut HeaderMap,
    name: HeaderName,
    value: String,
) -> Result<(), HeaderBlockError> {
    let value = HeaderValue::from_bytes(value.as_bytes())
        .map_err(|_| HeaderBlockError::InvalidLine(HttpLineParseError::InvalidHeaderValue))?;
    headers.append(name, value);
    Ok(())
}

/// Read header lines up to and including the empty line ending the head.
///
/// `header_size` is the size of the head already consumed, e.g. the start line.
async fn read_header_block<R>(
    reader: &mut R,
    constraints: &MessageConstraints,
    mut header_size: usize,
    line_buf: &mut Vec<u8>,
) -> Result<HeaderMap, HeaderBlockError>
where
    R: AsyncBufRead + Unpin,
{
    let max_header_size = constraints.max_header_size();
    let mut headers = HeaderMap::new();
    let mut pending: Option<(HeaderName, String)> = None;
    let mut count = 0usize;

    loop {
        if header_size >= max_header_size {
            return Err(HeaderBlockError::TooLarge(max_header_size));
        }
        line_buf.clear();
        let max_len = (max_header_size - header_size).min(constraints.max_line_length());
        let (found, nr) = reader.limited_read_until(b'\n', max_len, line_buf).await?;
        if !found {
            return if nr < max_len {
                Err(HeaderBlockError::Closed)
            } else if header_size + nr >= max_header_size {
                Err(HeaderBlockError::TooLarge(max_header_size))
            } else {
                Err(HeaderBlockError::InvalidLine(HttpLineParseError::LineTooLong(
                    constraints.max_line_length(),
                )))
            };
        }
        header_size += nr;

        let line = crate::trim_line_end(line_buf);
        if line.is_empty() {
            // header end line
            break;
        }

        if HttpHeaderLine::is_continuation(line) {
            let Some((_, value)) = pending.as_mut() else {
                return Err(HeaderBlockError::InvalidLine(
                    HttpLineParseError::InvalidHeaderName,
                ));
            };
            let more = std::str::from_utf8(line)
                .map_err(|e| HeaderBlockError::InvalidLine(e.into()))?
                .trim();
            value.push(' ');
            value.push_str(more);
            continue;
        }

        if let Some((name, value)) = pending.take() {
            append_header(&mut headers, name, value)?;
        }
        count += 1;
        if count > constraints.max_header_count() {
            return Err(HeaderBlockError::TooMany(constraints.max_header_count()));
        }

        let header = HttpHeaderLine::parse(line).map_err(HeaderBlockError::InvalidLine)?;
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|_| HeaderBlockError::InvalidLine(HttpLineParseError::InvalidHeaderName))?;
        pending = Some((name, header.value.to_string()));
    }

    if let Some((name, value)) = pending.take() {
        append_header(&mut headers, name, value)?;
    }
    Ok(headers)
}

fn serialize_headers(headers: &HeaderMap, buf: &mut Vec<u8>) {
    for (name, value) in headers {
        buf.extend_from_slice(name.as_str().as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"\r\n");
}
