/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use atoi::FromRadix16Checked;

use super::HttpLineParseError;

pub struct HttpChunkedLine<'a> {
    pub chunk_size: u64,
    pub extension: Option<&'a str>,
}

impl<'a> HttpChunkedLine<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<HttpChunkedLine<'a>, HttpLineParseError> {
        let buf = super::trim_line_end(buf);
        let (chunk_size, offset) = u64::from_radix_16_checked(buf);
        if offset == 0 {
            return Err(HttpLineParseError::InvalidChunkSize);
        }
        let Some(chunk_size) = chunk_size else {
            return Err(HttpLineParseError::InvalidChunkSize);
        };

        let left = &buf[offset..];
        let skip = left
            .iter()
            .position(|c| *c != b' ' && *c != b'\t')
            .unwrap_or(left.len());
        match left.get(skip) {
            None => Ok(HttpChunkedLine {
                chunk_size,
                extension: None,
            }),
            Some(b';') => {
                let extension = std::str::from_utf8(&left[skip + 1..])?.trim();
                Ok(HttpChunkedLine {
                    chunk_size,
                    extension: Some(extension),
                })
            }
            Some(_) => Err(HttpLineParseError::InvalidChunkSize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple() {
        let chunk = HttpChunkedLine::parse(b"1\r\n").unwrap();
        assert_eq!(chunk.chunk_size, 1);

        let chunk = HttpChunkedLine::parse(b"1F\r\n").unwrap();
        assert_eq!(chunk.chunk_size, 0x1f);

        let chunk = HttpChunkedLine::parse(b"a \n").unwrap();
        assert_eq!(chunk.chunk_size, 10);
        assert!(chunk.extension.is_none());
    }

    #[test]
    fn with_extension() {
        let chunk = HttpChunkedLine::parse(b"1; ieof\r\n").unwrap();
        assert_eq!(chunk.chunk_size, 1);
        assert_eq!(chunk.extension, Some("ieof"));
    }

    #[test]
    fn invalid() {
        assert!(matches!(
            HttpChunkedLine::parse(b"\r\n"),
            Err(HttpLineParseError::InvalidChunkSize)
        ));
        assert!(matches!(
            HttpChunkedLine::parse(b"-1\r\n"),
            Err(HttpLineParseError::InvalidChunkSize)
        ));
        assert!(matches!(
            HttpChunkedLine::parse(b"1x\r\n"),
            Err(HttpLineParseError::InvalidChunkSize)
        ));
        assert!(matches!(
            HttpChunkedLine::parse(b"1ffffffffffffffff\r\n"),
            Err(HttpLineParseError::InvalidChunkSize)
        ));
    }
}
