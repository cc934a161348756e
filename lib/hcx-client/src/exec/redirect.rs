/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::ClientExecChain;
use crate::route::{HttpHost, HttpRoute, HttpRoutePlanner};
use crate::strategy::RedirectStrategy;
use crate::{
    CancelToken, ClientContext, CloseableResponse, HttpExecError, ProtocolError, RequestWrapper,
};

/// Follows redirects by re-entering the next stage with the follow-up request.
pub struct RedirectExec {
    next: Arc<dyn ClientExecChain>,
    route_planner: Arc<dyn HttpRoutePlanner>,
    redirect_strategy: Arc<dyn RedirectStrategy>,
}

impl RedirectExec {
    pub fn new(
        next: Arc<dyn ClientExecChain>,
        route_planner: Arc<dyn HttpRoutePlanner>,
        redirect_strategy: Arc<dyn RedirectStrategy>,
    ) -> Self {
        RedirectExec {
            next,
            route_planner,
            redirect_strategy,
        }
    }

    /// Build the follow-up request and its route.
    fn follow(
        &self,
        current: &RequestWrapper,
        response: &CloseableResponse,
        route: &HttpRoute,
        ctx: &mut ClientContext,
    ) -> Result<(RequestWrapper, HttpRoute), HttpExecError> {
        let original = current.original();
        let mut redirect = self
            .redirect_strategy
            .get_redirect(original, response.head(), ctx)?;
        if redirect.headers().is_empty() {
            *redirect.headers_mut() = original.headers().clone();
        }

        let Some(target) = HttpHost::from_uri(redirect.uri()) else {
            return Err(ProtocolError::RedirectWithoutHost(redirect.uri().to_string()).into());
        };
        let next_route = self
            .route_planner
            .determine_route(Some(&target), &redirect, ctx)?;

        if next_route.target_host() != route.target_host() {
            debug!(
                "redirecting to another target {}, resetting target auth state",
                next_route.target_host()
            );
            ctx.target_auth_state_mut().reset();
            if ctx.proxy_auth_state().is_connection_based() {
                debug!("resetting connection based proxy auth state");
                ctx.proxy_auth_state_mut().reset();
            }
        }

        debug!("redirecting to '{}' via {next_route}", redirect.uri());
        Ok((RequestWrapper::wrap(redirect, Some(target)), next_route))
    }
}

/// Dispose of a response that will not be returned.
///
/// After a protocol level failure the connection may still be salvaged by
/// reading the rest of the body, for any other failure it is closed.
async fn discard(response: &mut CloseableResponse, salvage: bool) {
    if salvage && let Err(e) = response.drain().await {
        debug!("failed to drain redirect response body: {e}");
    }
    response.close();
}

#[async_trait]
impl ClientExecChain for RedirectExec {
    async fn execute(
        &self,
        route: &HttpRoute,
        request: &mut RequestWrapper,
        ctx: &mut ClientContext,
        cancel: Option<&CancelToken>,
    ) -> Result<CloseableResponse, HttpExecError> {
        ctx.clear_redirect_locations();

        let config = ctx.request_config().clone();
        let max_redirects = config.max_redirects();
        let mut redirect_count = 0usize;
        let mut current_route = route.clone();
        let mut followed: Option<RequestWrapper> = None;

        loop {
            let current = match followed.as_mut() {
                Some(r) => r,
                None => &mut *request,
            };
            let mut response = self
                .next
                .execute(&current_route, current, ctx, cancel)
                .await?;

            if !config.redirects_enabled() {
                return Ok(response);
            }
            match self
                .redirect_strategy
                .is_redirected(current.original(), response.head(), ctx)
            {
                Ok(true) => {}
                Ok(false) => return Ok(response),
                Err(e) => {
                    discard(&mut response, true).await;
                    return Err(e.into());
                }
            }

            if !current.is_repeatable() {
                debug!("cannot redirect non-repeatable request");
                return Ok(response);
            }
            if redirect_count >= max_redirects {
                discard(&mut response, true).await;
                return Err(HttpExecError::RedirectLimit(max_redirects));
            }
            redirect_count += 1;

            let (next_request, next_route) =
                match self.follow(current, &response, &current_route, ctx) {
                    Ok(next) => next,
                    Err(e) => {
                        discard(&mut response, e.is_protocol_error()).await;
                        return Err(e);
                    }
                };

            if let Err(e) = response.drain().await {
                response.close();
                return Err(e.into());
            }
            response.close();

            current_route = next_route;
            followed = Some(next_request);
        }
    }
}
