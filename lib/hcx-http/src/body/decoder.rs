/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use http::HeaderMap;
use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};

use super::chunked_decoder::ChunkedDecoder;
use crate::{ContentLengthMode, MessageConstraints};

enum DecodeState {
    Identity,
    Fixed(u64),
    Chunked(ChunkedDecoder),
    Done,
}

/// Decoding state of a message body, detached from the reader it pulls from.
///
/// The owner drives it with [`HttpBodyDecoder::poll_decode`], handing in the
/// same reader on every call.
pub struct HttpBodyDecoder {
    mode: ContentLengthMode,
    state: DecodeState,
    read_size: u64,
}

impl HttpBodyDecoder {
    pub fn new(mode: ContentLengthMode, constraints: &MessageConstraints) -> Self {
        let state = match mode {
            ContentLengthMode::Identity => DecodeState::Identity,
            ContentLengthMode::Fixed(0) => DecodeState::Done,
            ContentLengthMode::Fixed(n) => DecodeState::Fixed(n),
            ContentLengthMode::Chunked => DecodeState::Chunked(ChunkedDecoder::new(
                constraints.max_line_length(),
                constraints.max_trailer_size(),
            )),
        };
        HttpBodyDecoder {
            mode,
            state,
            read_size: 0,
        }
    }

    #[inline]
    pub fn mode(&self) -> ContentLengthMode {
        self.mode
    }

    pub fn finished(&self) -> bool {
        match &self.state {
            DecodeState::Done => true,
            DecodeState::Chunked(c) => c.finished(),
            _ => false,
        }
    }

    /// Body bytes handed out so far.
    #[inline]
    pub fn read_size(&self) -> u64 {
        self.read_size
    }

    /// Trailer fields of a chunked body, available once the body is finished.
    pub fn trailers(&self) -> Option<&HeaderMap> {
        match &self.state {
            DecodeState::Chunked(c) if c.finished() => Some(c.trailers()),
            _ => None,
        }
    }

    pub fn poll_decode<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut reader: Pin<&mut R>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>>
    where
        R: AsyncBufRead + Unpin,
    {
        let old_filled = buf.filled().len();
        match &mut self.state {
            DecodeState::Done => {}
            DecodeState::Identity => {
                if buf.remaining() == 0 {
                    return Poll::Ready(Ok(()));
                }
                ready!(reader.as_mut().poll_read(cx, buf))?;
                if buf.filled().len() == old_filled {
                    // io closed, which indicates the end of body
                    self.state = DecodeState::Done;
                }
            }
            DecodeState::Fixed(left) => {
                if buf.remaining() == 0 {
                    return Poll::Ready(Ok(()));
                }

                let to_read = usize::try_from(*left)
                    .unwrap_or(usize::MAX)
                    .min(buf.remaining());
                let mut limited_buf = ReadBuf::new(buf.initialize_unfilled_to(to_read));
                ready!(reader.as_mut().poll_read(cx, &mut limited_buf))?;
                let nr = limited_buf.filled().len();
                if nr == 0 {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "reader closed while reading fixed length body",
                    )));
                }
                buf.advance(nr);
                *left -= nr as u64;
                if *left == 0 {
                    self.state = DecodeState::Done;
                }
            }
            DecodeState::Chunked(c) => ready!(c.poll_decode(cx, reader, buf))?,
        }
        self.read_size += (buf.filled().len() - old_filled) as u64;
        Poll::Ready(Ok(()))
    }
}

/// A body reader borrowing the connection reader.
pub struct HttpBodyDecodeReader<'a, R> {
    reader: &'a mut R,
    decoder: HttpBodyDecoder,
}

impl<'a, R> HttpBodyDecodeReader<'a, R> {
    pub fn new(reader: &'a mut R, mode: ContentLengthMode, constraints: &MessageConstraints) -> Self {
        HttpBodyDecodeReader {
            reader,
            decoder: HttpBodyDecoder::new(mode, constraints),
        }
    }

    pub fn finished(&self) -> bool {
        self.decoder.finished()
    }

    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.decoder.trailers()
    }

    pub fn into_reader(self) -> &'a mut R {
        self.reader
    }
}

impl<R> AsyncRead for HttpBodyDecodeReader<'_, R>
where
    R: AsyncBufRead + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = &mut *self;
        me.decoder.poll_decode(cx, Pin::new(&mut *me.reader), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, BufReader, Result};
    use tokio_util::io::StreamReader;

    use crate::HttpLineParseError;
    use crate::body::{HttpBodyDecodeError, decode_error};

    fn constraints() -> MessageConstraints {
        MessageConstraints::default()
    }

    #[tokio::test]
    async fn read_until_end() {
        let content1 = b"test body";
        let content2 = b"hello world";
        let stream = tokio_stream::iter(vec![
            Result::Ok(Bytes::from_static(content1)),
            Result::Ok(Bytes::from_static(content2)),
        ]);
        let stream = StreamReader::new(stream);
        let mut buf_stream = BufReader::new(stream);
        let mut body_reader = HttpBodyDecodeReader::new(
            &mut buf_stream,
            ContentLengthMode::Identity,
            &constraints(),
        );

        let mut buf = Vec::new();
        body_reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf.as_slice(), b"test bodyhello world");
        assert!(body_reader.finished());
    }

    #[tokio::test]
    async fn read_content_length() {
        let content1 = b"hello world";
        let content2 = b"test bodyxxxx";
        let stream = tokio_stream::iter(vec![
            Result::Ok(Bytes::from_static(content1)),
            Result::Ok(Bytes::from_static(content2)),
        ]);
        let stream = StreamReader::new(stream);
        let mut buf_stream = BufReader::new(stream);
        let mut body_reader = HttpBodyDecodeReader::new(
            &mut buf_stream,
            ContentLengthMode::Fixed(20),
            &constraints(),
        );

        let mut buf = Vec::new();
        body_reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf.as_slice(), b"hello worldtest body");
        assert!(body_reader.finished());

        let buf_stream = body_reader.into_reader();
        let mut left = Vec::new();
        buf_stream.read_to_end(&mut left).await.unwrap();
        assert_eq!(left.as_slice(), b"xxxx");
    }

    #[tokio::test]
    async fn zero_content_length() {
        let stream = tokio_test::io::Builder::new().build();
        let mut buf_stream = BufReader::new(stream);
        let mut body_reader = HttpBodyDecodeReader::new(
            &mut buf_stream,
            ContentLengthMode::Fixed(0),
            &constraints(),
        );
        assert!(body_reader.finished());

        let mut buf = [0u8; 8];
        let len = body_reader.read(&mut buf).await.unwrap();
        assert_eq!(len, 0);
    }

    #[tokio::test]
    async fn early_eof_content_length() {
        let stream = tokio_test::io::Builder::new().read(b"short").build();
        let mut buf_stream = BufReader::new(stream);
        let mut body_reader = HttpBodyDecodeReader::new(
            &mut buf_stream,
            ContentLengthMode::Fixed(10),
            &constraints(),
        );

        let mut buf = Vec::new();
        let e = body_reader.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
        assert!(!body_reader.finished());
    }

    #[tokio::test]
    async fn read_chunked() {
        let stream = tokio_test::io::Builder::new()
            .read(b"5\r\nhello\r\n")
            .read(b"6; ext=1\r\n world\r")
            .read(b"\n0\r\n\r\nNEXT")
            .build();
        let mut buf_stream = BufReader::new(stream);
        let mut body_reader = HttpBodyDecodeReader::new(
            &mut buf_stream,
            ContentLengthMode::Chunked,
            &constraints(),
        );

        let mut buf = Vec::new();
        body_reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf.as_slice(), b"hello world");
        assert!(body_reader.finished());
        assert!(body_reader.trailers().unwrap().is_empty());

        let buf_stream = body_reader.into_reader();
        let mut left = Vec::new();
        buf_stream.read_to_end(&mut left).await.unwrap();
        assert_eq!(left.as_slice(), b"NEXT");
    }

    #[tokio::test]
    async fn read_chunked_trailer() {
        let stream = tokio_test::io::Builder::new()
            .read(b"3\r\nabc\r\n0\r\nX-Checksum: 123\r\nX-Other: a\r\n\r\n")
            .build();
        let mut buf_stream = BufReader::new(stream);
        let mut body_reader = HttpBodyDecodeReader::new(
            &mut buf_stream,
            ContentLengthMode::Chunked,
            &constraints(),
        );

        let mut buf = Vec::new();
        body_reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf.as_slice(), b"abc");
        let trailers = body_reader.trailers().unwrap();
        assert_eq!(trailers.len(), 2);
        assert_eq!(trailers.get("x-checksum").unwrap(), "123");
    }

    #[tokio::test]
    async fn chunk_size_line_too_long() {
        let mut line = vec![b'0'; 100];
        line.extend_from_slice(b"1\r\nx\r\n0\r\n\r\n");
        let stream = tokio_test::io::Builder::new().read(&line).build();
        let mut buf_stream = BufReader::new(stream);
        let mut constraints = constraints();
        constraints.set_max_line_length(32);
        let mut body_reader =
            HttpBodyDecodeReader::new(&mut buf_stream, ContentLengthMode::Chunked, &constraints);

        let mut buf = Vec::new();
        let e = body_reader.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            decode_error(&e),
            Some(HttpBodyDecodeError::InvalidChunkLine(
                HttpLineParseError::LineTooLong(32)
            ))
        ));
    }

    #[tokio::test]
    async fn invalid_chunk_size() {
        let stream = tokio_test::io::Builder::new().read(b"zz\r\nabc\r\n").build();
        let mut buf_stream = BufReader::new(stream);
        let mut body_reader = HttpBodyDecodeReader::new(
            &mut buf_stream,
            ContentLengthMode::Chunked,
            &constraints(),
        );

        let mut buf = Vec::new();
        let e = body_reader.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn missing_chunk_end() {
        let stream = tokio_test::io::Builder::new().read(b"3\r\nabcX\r\n").build();
        let mut buf_stream = BufReader::new(stream);
        let mut body_reader = HttpBodyDecodeReader::new(
            &mut buf_stream,
            ContentLengthMode::Chunked,
            &constraints(),
        );

        let mut buf = Vec::new();
        let e = body_reader.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            decode_error(&e),
            Some(HttpBodyDecodeError::NoChunkDataEnd)
        ));
    }

    #[tokio::test]
    async fn trailer_too_large() {
        let stream = tokio_test::io::Builder::new()
            .read(b"1\r\na\r\n0\r\nX-One: 0123456789\r\nX-Two: 0123456789\r\n\r\n")
            .build();
        let mut buf_stream = BufReader::new(stream);
        let mut constraints = constraints();
        constraints.set_max_trailer_size(24);
        let mut body_reader =
            HttpBodyDecodeReader::new(&mut buf_stream, ContentLengthMode::Chunked, &constraints);

        let mut buf = Vec::new();
        let e = body_reader.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            decode_error(&e),
            Some(HttpBodyDecodeError::TooLargeTrailer(24))
        ));
    }

    #[tokio::test]
    async fn truncated_chunked() {
        let stream = tokio_test::io::Builder::new().read(b"a\r\nabc").build();
        let mut buf_stream = BufReader::new(stream);
        let mut body_reader = HttpBodyDecodeReader::new(
            &mut buf_stream,
            ContentLengthMode::Chunked,
            &constraints(),
        );

        let mut buf = Vec::new();
        let e = body_reader.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
    }
}
