/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::BufMut;
use http::{HeaderMap, HeaderName, HeaderValue};
use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};

use super::HttpBodyDecodeError;
use crate::{HttpChunkedLine, HttpHeaderLine, HttpLineParseError};

#[derive(Clone, Copy)]
enum ChunkedState {
    Size,
    Data(u64),
    DataEndCr,
    DataEndLf,
    Trailer,
    End,
}

fn invalid_line(e: HttpLineParseError) -> io::Error {
    HttpBodyDecodeError::InvalidChunkLine(e).into()
}

pub(super) struct ChunkedDecoder {
    line_max_size: usize,
    trailer_max_size: usize,
    line: Vec<u8>,
    state: ChunkedState,
    trailer_size: usize,
    trailers: HeaderMap,
}

impl ChunkedDecoder {
    pub(super) fn new(line_max_size: usize, trailer_max_size: usize) -> Self {
        ChunkedDecoder {
            line_max_size,
            trailer_max_size,
            line: Vec::with_capacity(32),
            state: ChunkedState::Size,
            trailer_size: 0,
            trailers: HeaderMap::new(),
        }
    }

    pub(super) fn finished(&self) -> bool {
        matches!(self.state, ChunkedState::End)
    }

    pub(super) fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    fn poll_line<R>(&mut self, cx: &mut Context<'_>, mut reader: Pin<&mut R>) -> Poll<io::Result<()>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let r_buf = ready!(reader.as_mut().poll_fill_buf(cx))?;
            if r_buf.is_empty() {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "reader closed while reading chunk line",
                )));
            }

            let (done, len) = match memchr::memchr(b'\n', r_buf) {
                Some(p) => (true, p + 1),
                None => (false, r_buf.len()),
            };
            if self.line.len() + len > self.line_max_size {
                return Poll::Ready(Err(invalid_line(HttpLineParseError::LineTooLong(
                    self.line_max_size,
                ))));
            }
            self.line.put_slice(&r_buf[0..len]);
            reader.as_mut().consume(len);
            if done {
                return Poll::Ready(Ok(()));
            }
        }
    }

    fn add_trailer(&mut self) -> io::Result<()> {
        self.trailer_size += self.line.len();
        if self.trailer_size > self.trailer_max_size {
            return Err(HttpBodyDecodeError::TooLargeTrailer(self.trailer_max_size).into());
        }

        let header = HttpHeaderLine::parse(&self.line).map_err(invalid_line)?;
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|_| invalid_line(HttpLineParseError::InvalidHeaderName))?;
        let value = HeaderValue::from_str(header.value)
            .map_err(|_| invalid_line(HttpLineParseError::InvalidHeaderValue))?;
        self.trailers.append(name, value);
        Ok(())
    }

    pub(super) fn poll_decode<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut reader: Pin<&mut R>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            match self.state {
                ChunkedState::Size => {
                    ready!(self.poll_line(cx, reader.as_mut()))?;
                    let chunk_line = HttpChunkedLine::parse(&self.line).map_err(invalid_line)?;
                    self.state = match chunk_line.chunk_size {
                        0 => ChunkedState::Trailer,
                        n => ChunkedState::Data(n),
                    };
                    self.line.clear();
                }
                ChunkedState::Data(left) => {
                    if buf.remaining() == 0 {
                        return Poll::Ready(Ok(()));
                    }

                    let to_read = usize::try_from(left)
                        .unwrap_or(usize::MAX)
                        .min(buf.remaining());
                    let mut limited_buf = ReadBuf::new(buf.initialize_unfilled_to(to_read));
                    ready!(reader.as_mut().poll_read(cx, &mut limited_buf))?;
                    let nr = limited_buf.filled().len();
                    if nr == 0 {
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "reader closed while reading chunk data",
                        )));
                    }
                    buf.advance(nr);

                    let left = left - nr as u64;
                    self.state = if left == 0 {
                        ChunkedState::DataEndCr
                    } else {
                        ChunkedState::Data(left)
                    };
                    return Poll::Ready(Ok(()));
                }
                ChunkedState::DataEndCr | ChunkedState::DataEndLf => {
                    let r_buf = ready!(reader.as_mut().poll_fill_buf(cx))?;
                    let Some(c) = r_buf.first() else {
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "reader closed while reading chunk data end",
                        )));
                    };
                    match (self.state, *c) {
                        (ChunkedState::DataEndCr, b'\r') => self.state = ChunkedState::DataEndLf,
                        (_, b'\n') => self.state = ChunkedState::Size,
                        _ => {
                            return Poll::Ready(Err(HttpBodyDecodeError::NoChunkDataEnd.into()));
                        }
                    }
                    reader.as_mut().consume(1);
                }
                ChunkedState::Trailer => {
                    ready!(self.poll_line(cx, reader.as_mut()))?;
                    if crate::trim_line_end(&self.line).is_empty() {
                        self.state = ChunkedState::End;
                    } else {
                        self.add_trailer()?;
                    }
                    self.line.clear();
                }
                ChunkedState::End => return Poll::Ready(Ok(())),
            }
        }
    }
}
