/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod parse;
pub use parse::{
    HttpChunkedLine, HttpHeaderLine, HttpLineParseError, HttpRequestLine, HttpStatusLine,
    trim_line_end, version_str,
};

pub mod io;

mod constraints;
pub use constraints::MessageConstraints;

mod framing;
pub use framing::{ContentLengthMode, FramingError, response_has_body};

pub mod body;

mod head;
pub use head::{
    HttpRequestHead, HttpRequestParseError, HttpResponseHead, HttpResponseParseError,
};
