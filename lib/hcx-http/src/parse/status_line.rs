/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use atoi::FromRadix10;
use http::Version;

use super::HttpLineParseError;

pub struct HttpStatusLine<'a> {
    pub version: Version,
    pub code: u16,
    pub reason: &'a str,
}

impl<'a> HttpStatusLine<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<HttpStatusLine<'a>, HttpLineParseError> {
        const MINIMAL_LENGTH: usize = 12; // HTTP/1.x XYZ

        let buf = super::trim_line_end(buf);
        if buf.len() < MINIMAL_LENGTH {
            return Err(HttpLineParseError::NotLongEnough);
        }

        let Some(p) = memchr::memchr(b' ', buf) else {
            return Err(HttpLineParseError::NoDelimiterFound(' '));
        };
        let version = super::parse_version(&buf[0..p])?;

        let left = &buf[p + 1..];
        let (code, len) = u16::from_radix_10(left);
        if len != 3 || code < 100 {
            return Err(HttpLineParseError::InvalidStatusCode);
        }

        let reason = match left.get(3) {
            None => "",
            Some(b' ') => std::str::from_utf8(&left[4..])?.trim(),
            Some(_) => return Err(HttpLineParseError::InvalidStatusCode),
        };

        Ok(HttpStatusLine {
            version,
            code,
            reason,
        })
    }

    /// Whether the line starts like a status line, ignoring leading whitespace.
    ///
    /// Lines failing this check are treated as noise before the real response.
    pub fn has_protocol_version(buf: &[u8]) -> bool {
        let start = buf
            .iter()
            .position(|c| !c.is_ascii_whitespace())
            .unwrap_or(buf.len());
        buf[start..].starts_with(b"HTTP/")
    }

    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(super::version_str(self.version).as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.code.to_string().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.reason.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
}
