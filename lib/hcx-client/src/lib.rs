/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::{HttpClientError, HttpExecError, ProtocolError};

mod config;
pub use config::RequestConfig;

pub mod route;

mod cancel;
pub use cancel::{CancelToken, Cancellable};

mod context;
pub use context::{AuthProtocolState, AuthState, ClientContext};

mod request;
pub use request::{EntityWriteError, HttpEntity, HttpRequest, RequestWrapper};

pub mod conn;
pub mod strategy;
pub mod protocol;

mod response;
pub use response::{CloseableResponse, ResponseBody};

pub mod exec;

mod client;
pub use client::{HttpClient, HttpClientBuilder};

pub use hcx_http::{HttpRequestHead, HttpResponseHead, MessageConstraints};
