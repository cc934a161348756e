/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::HttpLineParseError;

pub struct HttpHeaderLine<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

impl<'a> HttpHeaderLine<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<HttpHeaderLine<'a>, HttpLineParseError> {
        let line = std::str::from_utf8(super::trim_line_end(buf))?;
        let Some(p) = memchr::memchr(b':', line.as_bytes()) else {
            return Err(HttpLineParseError::NoDelimiterFound(':'));
        };

        // no whitespace allowed between the field name and the colon
        let name = &line[0..p];
        if name.is_empty() || name.bytes().any(|c| c.is_ascii_whitespace()) {
            return Err(HttpLineParseError::InvalidHeaderName);
        }
        let value = line[p + 1..].trim();

        Ok(HttpHeaderLine { name, value })
    }

    /// Whether the line continues the previous header value (obsolete line folding).
    pub fn is_continuation(buf: &[u8]) -> bool {
        matches!(buf.first(), Some(b' ' | b'\t'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple() {
        let h = HttpHeaderLine::parse(b"Content-Length: 10\r\n").unwrap();
        assert_eq!(h.name, "Content-Length");
        assert_eq!(h.value, "10");

        let h = HttpHeaderLine::parse(b"X-Empty:\r\n").unwrap();
        assert_eq!(h.name, "X-Empty");
        assert_eq!(h.value, "");
    }

    #[test]
    fn invalid() {
        assert!(matches!(
            HttpHeaderLine::parse(b"no colon here\r\n"),
            Err(HttpLineParseError::NoDelimiterFound(':'))
        ));
        assert!(matches!(
            HttpHeaderLine::parse(b"Host : example.com\r\n"),
            Err(HttpLineParseError::InvalidHeaderName)
        ));
        assert!(matches!(
            HttpHeaderLine::parse(b": value\r\n"),
            Err(HttpLineParseError::InvalidHeaderName)
        ));
    }

    #[test]
    fn continuation() {
        assert!(HttpHeaderLine::is_continuation(b" more\r\n"));
        assert!(HttpHeaderLine::is_continuation(b"\tmore\r\n"));
        assert!(!HttpHeaderLine::is_continuation(b"Host: a\r\n"));
    }
}
