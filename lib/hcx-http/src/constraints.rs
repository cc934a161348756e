/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

/// Size limits applied when reading a message head or a chunked body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageConstraints {
    max_header_size: usize,
    max_header_count: usize,
    max_line_length: usize,
    max_garbage_lines: usize,
    max_trailer_size: usize,
}

impl Default for MessageConstraints {
    fn default() -> Self {
        MessageConstraints {
            max_header_size: 16384,
            max_header_count: 100,
            max_line_length: 8192,
            max_garbage_lines: 8,
            max_trailer_size: 16384,
        }
    }
}

impl MessageConstraints {
    #[inline]
    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }

    #[inline]
    pub fn set_max_header_size(&mut self, size: usize) {
        self.max_header_size = size;
    }

    #[inline]
    pub fn max_header_count(&self) -> usize {
        self.max_header_count
    }

    #[inline]
    pub fn set_max_header_count(&mut self, count: usize) {
        self.max_header_count = count;
    }

    /// Cap for a single line, including chunk-size lines of a chunked body.
    #[inline]
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    #[inline]
    pub fn set_max_line_length(&mut self, len: usize) {
        self.max_line_length = len.max(16);
    }

    /// Lines not looking like a status line that may be skipped before a response.
    #[inline]
    pub fn max_garbage_lines(&self) -> usize {
        self.max_garbage_lines
    }

    #[inline]
    pub fn set_max_garbage_lines(&mut self, count: usize) {
        self.max_garbage_lines = count;
    }

    #[inline]
    pub fn max_trailer_size(&self) -> usize {
        self.max_trailer_size
    }

    #[inline]
    pub fn set_max_trailer_size(&mut self, size: usize) {
        self.max_trailer_size = size;
    }
}
