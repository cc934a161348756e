/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use async_trait::async_trait;

use crate::route::HttpRoute;
use crate::{CancelToken, ClientContext, CloseableResponse, HttpExecError, RequestWrapper};

mod minimal;
pub use minimal::MinimalClientExec;

mod redirect;
pub use redirect::RedirectExec;

/// One stage of the request execution chain.
///
/// Decorating stages wrap the next one and call into it, the terminal stage
/// talks to the connection.
#[async_trait]
pub trait ClientExecChain: Send + Sync {
    async fn execute(
        &self,
        route: &HttpRoute,
        request: &mut RequestWrapper,
        ctx: &mut ClientContext,
        cancel: Option<&CancelToken>,
    ) -> Result<CloseableResponse, HttpExecError>;
}
