/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use http::Version;

use super::HttpLineParseError;

pub struct HttpRequestLine<'a> {
    pub method: &'a str,
    pub target: &'a str,
    pub version: Version,
}

fn is_token_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&c)
}

impl<'a> HttpRequestLine<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<HttpRequestLine<'a>, HttpLineParseError> {
        const MINIMAL_LENGTH: usize = 14; // M / HTTP/1.x

        let buf = super::trim_line_end(buf);
        if buf.len() < MINIMAL_LENGTH {
            return Err(HttpLineParseError::NotLongEnough);
        }

        let Some(p) = memchr::memchr(b' ', buf) else {
            return Err(HttpLineParseError::NoDelimiterFound(' '));
        };
        let method = &buf[0..p];
        if method.is_empty() || !method.iter().all(|c| is_token_char(*c)) {
            return Err(HttpLineParseError::InvalidMethod);
        }

        let left = &buf[p + 1..];
        let Some(p) = memchr::memrchr(b' ', left) else {
            return Err(HttpLineParseError::NoDelimiterFound(' '));
        };
        let version = super::parse_version(&left[p + 1..])?;

        let target = std::str::from_utf8(&left[0..p])?.trim();
        if target.is_empty() || target.contains(' ') {
            return Err(HttpLineParseError::InvalidRequestTarget);
        }

        Ok(HttpRequestLine {
            // token chars are all ascii
            method: std::str::from_utf8(method)?,
            target,
            version,
        })
    }

    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.method.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.target.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(super::version_str(self.version).as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_form() {
        let line = HttpRequestLine::parse(b"GET /index.html?a=b HTTP/1.1\r\n").unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.target, "/index.html?a=b");
        assert_eq!(line.version, Version::HTTP_11);
    }

    #[test]
    fn absolute_form() {
        let line = HttpRequestLine::parse(b"POST http://example.com/x HTTP/1.0\n").unwrap();
        assert_eq!(line.method, "POST");
        assert_eq!(line.target, "http://example.com/x");
        assert_eq!(line.version, Version::HTTP_10);
    }

    #[test]
    fn malformed() {
        assert!(matches!(
            HttpRequestLine::parse(b"GET\r\n"),
            Err(HttpLineParseError::NotLongEnough)
        ));
        assert!(matches!(
            HttpRequestLine::parse(b"GET_/index.html_HTTP/1.1\r\n"),
            Err(HttpLineParseError::NoDelimiterFound(' '))
        ));
        assert!(matches!(
            HttpRequestLine::parse(b"GET /index.html HTTP/3.0\r\n"),
            Err(HttpLineParseError::InvalidVersion)
        ));
        assert!(matches!(
            HttpRequestLine::parse(b"G(T /index.html HTTP/1.1\r\n"),
            Err(HttpLineParseError::InvalidMethod)
        ));
        assert!(matches!(
            HttpRequestLine::parse(b"GET /a /b HTTP/1.1\r\n"),
            Err(HttpLineParseError::InvalidRequestTarget)
        ));
    }

    #[test]
    fn serialize() {
        let line = HttpRequestLine {
            method: "HEAD",
            target: "/",
            version: Version::HTTP_11,
        };
        let mut buf = Vec::new();
        line.serialize_to(&mut buf);
        assert_eq!(buf.as_slice(), b"HEAD / HTTP/1.1\r\n");
    }
}
