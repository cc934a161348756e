/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::ContentLengthMode;

#[derive(Debug, Error)]
pub enum BodyWriteError {
    #[error("write failed: {0:?}")]
    WriteFailed(#[from] io::Error),
    #[error("content length {0} exceeded")]
    ContentLengthExceeded(u64),
    #[error("content length mismatch: expected {expected}, written {written}")]
    ContentLengthMismatch { expected: u64, written: u64 },
    #[error("body already finished")]
    AlreadyFinished,
}

enum EncodeKind {
    Identity,
    Fixed { expected: u64 },
    Chunked { cache: Vec<u8>, fragment_size: usize },
}

/// Frames an outgoing body onto a borrowed writer.
///
/// A chunked body must be closed with [`HttpBodyEncodeWriter::finish`] to emit the
/// last chunk. A body not fully written can be dropped with
/// [`HttpBodyEncodeWriter::abandon`], after which the connection must not be reused.
pub struct HttpBodyEncodeWriter<'a, W> {
    writer: &'a mut W,
    kind: EncodeKind,
    written: u64,
    finished: bool,
}

impl<'a, W> HttpBodyEncodeWriter<'a, W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: &'a mut W, mode: ContentLengthMode, fragment_size: usize) -> Self {
        let kind = match mode {
            ContentLengthMode::Identity => EncodeKind::Identity,
            ContentLengthMode::Fixed(expected) => EncodeKind::Fixed { expected },
            ContentLengthMode::Chunked => EncodeKind::Chunked {
                cache: Vec::with_capacity(fragment_size),
                fragment_size,
            },
        };
        HttpBodyEncodeWriter {
            writer,
            kind,
            written: 0,
            finished: false,
        }
    }

    /// Payload bytes accepted so far, chunk framing excluded.
    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }

    #[inline]
    pub fn finished(&self) -> bool {
        self.finished
    }

    async fn write_chunk(&mut self, parts: &[&[u8]]) -> io::Result<()> {
        let len: usize = parts.iter().map(|p| p.len()).sum();
        if len == 0 {
            return Ok(());
        }
        let head = format!("{len:x}\r\n");
        self.writer.write_all(head.as_bytes()).await?;
        for part in parts {
            self.writer.write_all(part).await?;
        }
        self.writer.write_all(b"\r\n").await
    }

    pub async fn write_all(&mut self, data: &[u8]) -> Result<(), BodyWriteError> {
        if self.finished {
            return Err(BodyWriteError::AlreadyFinished);
        }
        if data.is_empty() {
            return Ok(());
        }

        match &mut self.kind {
            EncodeKind::Identity => self.writer.write_all(data).await?,
            EncodeKind::Fixed { expected } => {
                let expected = *expected;
                if self.written + data.len() as u64 > expected {
                    return Err(BodyWriteError::ContentLengthExceeded(expected));
                }
                self.writer.write_all(data).await?;
            }
            EncodeKind::Chunked {
                cache,
                fragment_size,
            } => {
                if data.len() < *fragment_size - cache.len() {
                    cache.extend_from_slice(data);
                } else {
                    // the cached bytes and this write leave as one chunk
                    let cached = std::mem::take(cache);
                    self.write_chunk(&[&cached, data]).await?;
                    if let EncodeKind::Chunked { cache, .. } = &mut self.kind {
                        *cache = cached;
                        cache.clear();
                    }
                }
            }
        }
        self.written += data.len() as u64;
        Ok(())
    }

    /// Complete the body and flush the writer.
    ///
    /// Finishing twice is a no-op.
    pub async fn finish(&mut self) -> Result<(), BodyWriteError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        match &mut self.kind {
            EncodeKind::Identity => {}
            EncodeKind::Fixed { expected } => {
                if self.written != *expected {
                    return Err(BodyWriteError::ContentLengthMismatch {
                        expected: *expected,
                        written: self.written,
                    });
                }
            }
            EncodeKind::Chunked { cache, .. } => {
                let cached = std::mem::take(cache);
                self.write_chunk(&[&cached]).await?;
                self.writer.write_all(b"0\r\n\r\n").await?;
            }
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Stop writing without completing the framing.
    pub fn abandon(&mut self) {
        self.finished = true;
        if let EncodeKind::Chunked { cache, .. } = &mut self.kind {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    use crate::MessageConstraints;
    use crate::body::HttpBodyDecodeReader;

    async fn decode(mode: ContentLengthMode, encoded: &[u8]) -> Vec<u8> {
        use tokio::io::AsyncReadExt;

        let mut reader = BufReader::new(encoded);
        let mut body_reader =
            HttpBodyDecodeReader::new(&mut reader, mode, &MessageConstraints::default());
        let mut buf = Vec::new();
        body_reader.read_to_end(&mut buf).await.unwrap();
        assert!(body_reader.finished());
        buf
    }

    #[tokio::test]
    async fn chunked_each_write() {
        let mut out = Vec::new();
        let mut writer = HttpBodyEncodeWriter::new(&mut out, ContentLengthMode::Chunked, 0);
        writer.write_all(b"hello").await.unwrap();
        writer.write_all(b"").await.unwrap();
        writer.write_all(b" world, long enough").await.unwrap();
        writer.finish().await.unwrap();
        assert_eq!(
            out.as_slice(),
            b"5\r\nhello\r\n13\r\n world, long enough\r\n0\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn chunked_buffered() {
        let mut out = Vec::new();
        let mut writer = HttpBodyEncodeWriter::new(&mut out, ContentLengthMode::Chunked, 8);
        writer.write_all(b"ab").await.unwrap();
        writer.write_all(b"cd").await.unwrap();
        writer.write_all(b"efghij").await.unwrap();
        writer.write_all(b"k").await.unwrap();
        writer.finish().await.unwrap();
        assert_eq!(out.as_slice(), b"a\r\nabcdefghij\r\n1\r\nk\r\n0\r\n\r\n");
    }

    #[tokio::test]
    async fn chunked_empty_body() {
        let mut out = Vec::new();
        let mut writer = HttpBodyEncodeWriter::new(&mut out, ContentLengthMode::Chunked, 16);
        writer.finish().await.unwrap();
        writer.finish().await.unwrap();
        assert_eq!(out.as_slice(), b"0\r\n\r\n");
    }

    #[tokio::test]
    async fn chunked_split_writes() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        for k in [1usize, 2, 37] {
            let mut out = Vec::new();
            let mut writer = HttpBodyEncodeWriter::new(&mut out, ContentLengthMode::Chunked, 64);
            let step = data.len().div_ceil(k);
            for part in data.chunks(step) {
                writer.write_all(part).await.unwrap();
            }
            writer.finish().await.unwrap();

            let decoded = decode(ContentLengthMode::Chunked, &out).await;
            assert_eq!(decoded, data, "split into {k} writes");
        }
    }

    #[tokio::test]
    async fn fixed_exact() {
        for n in [0usize, 1, 65536] {
            let data: Vec<u8> = (0..n).map(|i| (i % 13) as u8).collect();
            let mut out = Vec::new();
            let mut writer =
                HttpBodyEncodeWriter::new(&mut out, ContentLengthMode::Fixed(n as u64), 0);
            writer.write_all(&data).await.unwrap();
            writer.finish().await.unwrap();
            assert_eq!(writer.written(), n as u64);

            let decoded = decode(ContentLengthMode::Fixed(n as u64), &out).await;
            assert_eq!(decoded, data);
        }
    }

    #[tokio::test]
    async fn fixed_exceeded() {
        let mut out = Vec::new();
        let mut writer = HttpBodyEncodeWriter::new(&mut out, ContentLengthMode::Fixed(4), 0);
        writer.write_all(b"abc").await.unwrap();
        let e = writer.write_all(b"de").await.unwrap_err();
        assert!(matches!(e, BodyWriteError::ContentLengthExceeded(4)));
        assert_eq!(writer.written(), 3);
    }

    #[tokio::test]
    async fn fixed_short() {
        let mut out = Vec::new();
        let mut writer = HttpBodyEncodeWriter::new(&mut out, ContentLengthMode::Fixed(4), 0);
        writer.write_all(b"ab").await.unwrap();
        let e = writer.finish().await.unwrap_err();
        assert!(matches!(
            e,
            BodyWriteError::ContentLengthMismatch {
                expected: 4,
                written: 2
            }
        ));
    }

    #[tokio::test]
    async fn fixed_abandon() {
        let mut out = Vec::new();
        let mut writer = HttpBodyEncodeWriter::new(&mut out, ContentLengthMode::Fixed(4), 0);
        writer.write_all(b"ab").await.unwrap();
        writer.abandon();
        assert!(writer.finished());
        writer.finish().await.unwrap();
        assert!(matches!(
            writer.write_all(b"cd").await,
            Err(BodyWriteError::AlreadyFinished)
        ));
        assert_eq!(out.as_slice(), b"ab");
    }

    #[tokio::test]
    async fn identity() {
        let mut out = Vec::new();
        let mut writer = HttpBodyEncodeWriter::new(&mut out, ContentLengthMode::Identity, 0);
        writer.write_all(b"raw ").await.unwrap();
        writer.write_all(b"bytes").await.unwrap();
        writer.finish().await.unwrap();
        assert_eq!(out.as_slice(), b"raw bytes");
    }
}
