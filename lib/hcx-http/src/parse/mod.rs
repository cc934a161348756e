/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use http::Version;

mod error;
pub use error::HttpLineParseError;

mod request_line;
pub use request_line::HttpRequestLine;

mod status_line;
pub use status_line::HttpStatusLine;

mod header_line;
pub use header_line::HttpHeaderLine;

mod chunked_line;
pub use chunked_line::HttpChunkedLine;

/// Strip the trailing `\n` or `\r\n` of a line.
pub fn trim_line_end(buf: &[u8]) -> &[u8] {
    match buf {
        [head @ .., b'\r', b'\n'] => head,
        [head @ .., b'\n'] => head,
        _ => buf,
    }
}

pub(crate) fn parse_version(buf: &[u8]) -> Result<Version, HttpLineParseError> {
    match buf {
        b"HTTP/1.0" => Ok(Version::HTTP_10),
        b"HTTP/1.1" => Ok(Version::HTTP_11),
        _ => Err(HttpLineParseError::InvalidVersion),
    }
}

/// The protocol token written on the wire for `version`.
///
/// Only HTTP/1.0 and HTTP/1.1 are spoken here, anything else is sent as HTTP/1.1.
pub fn version_str(version: Version) -> &'static str {
    if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else {
        "HTTP/1.1"
    }
}
