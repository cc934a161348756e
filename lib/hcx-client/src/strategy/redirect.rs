/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use hcx_http::HttpResponseHead;
use http::{Method, Uri, header};
use log::debug;
use url::Url;

use crate::{ClientContext, HttpRequest, ProtocolError};

pub trait RedirectStrategy: Send + Sync {
    fn is_redirected(
        &self,
        request: &HttpRequest,
        response: &HttpResponseHead,
        ctx: &ClientContext,
    ) -> Result<bool, ProtocolError>;

    /// Build the follow-up request, recording its location in the context.
    fn get_redirect(
        &self,
        request: &HttpRequest,
        response: &HttpResponseHead,
        ctx: &mut ClientContext,
    ) -> Result<HttpRequest, ProtocolError>;
}

pub struct DefaultRedirectStrategy {
    redirectable: Vec<Method>,
}

impl Default for DefaultRedirectStrategy {
    fn default() -> Self {
        DefaultRedirectStrategy {
            redirectable: vec![Method::GET, Method::HEAD],
        }
    }
}

impl DefaultRedirectStrategy {
    /// Also follows 301, 302, 307 and 308 for POST and DELETE.
    pub fn lax() -> Self {
        DefaultRedirectStrategy {
            redirectable: vec![Method::GET, Method::HEAD, Method::POST, Method::DELETE],
        }
    }

    fn is_redirectable(&self, method: &Method) -> bool {
        self.redirectable.contains(method)
    }

    fn base_url(request: &HttpRequest, ctx: &ClientContext) -> Option<Url> {
        let uri = request.uri();
        if uri.scheme().is_some() && uri.authority().is_some() {
            return Url::parse(&uri.to_string()).ok();
        }
        let target = ctx.target_host()?;
        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        Url::parse(&format!("{}{path}", target.to_uri_string())).ok()
    }

    fn location_uri(
        &self,
        request: &HttpRequest,
        response: &HttpResponseHead,
        ctx: &mut ClientContext,
    ) -> Result<Uri, ProtocolError> {
        let Some(value) = response.headers.get(header::LOCATION) else {
            return Err(ProtocolError::MissingLocation(response.code));
        };
        let location = value.to_str().map_err(|_| {
            ProtocolError::InvalidRedirectLocation(
                String::from_utf8_lossy(value.as_bytes()).to_string(),
                "not a visible ascii string".to_string(),
            )
        })?;
        debug!("redirect requested to location '{location}'");

        let config = ctx.request_config();
        let mut url = match Url::parse(location) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                if !config.relative_redirects_allowed() {
                    return Err(ProtocolError::RelativeRedirect(location.to_string()));
                }
                let Some(base) = Self::base_url(request, ctx) else {
                    return Err(ProtocolError::InvalidRedirectLocation(
                        location.to_string(),
                        "no base uri to resolve against".to_string(),
                    ));
                };
                base.join(location).map_err(|e| {
                    ProtocolError::InvalidRedirectLocation(location.to_string(), e.to_string())
                })?
            }
            Err(e) => {
                return Err(ProtocolError::InvalidRedirectLocation(
                    location.to_string(),
                    e.to_string(),
                ));
            }
        };
        url.set_fragment(None);

        let uri = Uri::from_str(url.as_str()).map_err(|e| {
            ProtocolError::InvalidRedirectLocation(location.to_string(), e.to_string())
        })?;

        if !config.circular_redirects_allowed() && ctx.redirect_locations().contains(&uri) {
            return Err(ProtocolError::CircularRedirect(uri.to_string()));
        }
        ctx.push_redirect_location(uri.clone());
        Ok(uri)
    }
}

impl RedirectStrategy for DefaultRedirectStrategy {
    fn is_redirected(
        &self,
        request: &HttpRequest,
        response: &HttpResponseHead,
        _ctx: &ClientContext,
    ) -> Result<bool, ProtocolError> {
        let method = request.method();
        let redirected = match response.code {
            302 => {
                self.is_redirectable(method) && response.headers.contains_key(header::LOCATION)
            }
            301 | 307 | 308 => self.is_redirectable(method),
            303 => true,
            _ => false,
        };
        Ok(redirected)
    }

    fn get_redirect(
        &self,
        request: &HttpRequest,
        response: &HttpResponseHead,
        ctx: &mut ClientContext,
    ) -> Result<HttpRequest, ProtocolError> {
        let uri = self.location_uri(request, response, ctx)?;
        let method = request.method();
        let redirect = if method == Method::HEAD {
            HttpRequest::head(uri)
        } else if method == Method::GET {
            HttpRequest::get(uri)
        } else if matches!(response.code, 307 | 308) {
            let mut copy = request.clone();
            copy.set_uri(uri);
            copy
        } else {
            HttpRequest::get(uri)
        };
        Ok(redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::HttpHost;
    use crate::{HttpEntity, RequestConfig};
    use http::Version;

    fn redirect(code: u16, location: Option<&'static str>) -> HttpResponseHead {
        let mut rsp = HttpResponseHead::new(Version::HTTP_11, code, "Redirect");
        if let Some(location) = location {
            rsp.headers
                .insert(header::LOCATION, location.parse().unwrap());
        }
        rsp
    }

    fn request(method: Method) -> HttpRequest {
        HttpRequest::new(method, Uri::from_static("http://example.com/a/b?q=1"))
    }

    #[test]
    fn redirected_codes() {
        let strategy = DefaultRedirectStrategy::default();
        let ctx = ClientContext::default();
        let get = request(Method::GET);
        let post = request(Method::POST);

        assert!(strategy.is_redirected(&get, &redirect(302, Some("/x")), &ctx).unwrap());
        assert!(!strategy.is_redirected(&get, &redirect(302, None), &ctx).unwrap());
        assert!(!strategy.is_redirected(&post, &redirect(302, Some("/x")), &ctx).unwrap());
        for code in [301, 307, 308] {
            assert!(strategy.is_redirected(&get, &redirect(code, Some("/x")), &ctx).unwrap());
            assert!(!strategy.is_redirected(&post, &redirect(code, Some("/x")), &ctx).unwrap());
        }
        assert!(strategy.is_redirected(&post, &redirect(303, Some("/x")), &ctx).unwrap());
        assert!(!strategy.is_redirected(&get, &redirect(304, Some("/x")), &ctx).unwrap());
        assert!(!strategy.is_redirected(&get, &redirect(200, Some("/x")), &ctx).unwrap());

        let lax = DefaultRedirectStrategy::lax();
        assert!(lax.is_redirected(&post, &redirect(302, Some("/x")), &ctx).unwrap());
        assert!(lax.is_redirected(&request(Method::DELETE), &redirect(301, None), &ctx).unwrap());
        assert!(!lax.is_redirected(&request(Method::PUT), &redirect(301, None), &ctx).unwrap());
    }

    #[test]
    fn resolve_relative() {
        let strategy = DefaultRedirectStrategy::default();
        let mut ctx = ClientContext::default();
        let get = request(Method::GET);

        let next = strategy
            .get_redirect(&get, &redirect(302, Some("../c#frag")), &mut ctx)
            .unwrap();
        assert_eq!(next.method(), Method::GET);
        assert_eq!(next.uri(), "http://example.com/c");

        let next = strategy
            .get_redirect(&get, &redirect(301, Some("//other.example/p")), &mut ctx)
            .unwrap();
        assert_eq!(next.uri(), "http://other.example/p");
        assert_eq!(ctx.redirect_locations().len(), 2);
    }

    #[test]
    fn resolve_against_target_host() {
        let strategy = DefaultRedirectStrategy::default();
        let mut ctx = ClientContext::default();
        ctx.set_target_host(HttpHost::new("example.net", Some(8080), "https"));
        let get = HttpRequest::get(Uri::from_static("/dir/page"));
        let next = strategy
            .get_redirect(&get, &redirect(302, Some("other")), &mut ctx)
            .unwrap();
        assert_eq!(next.uri(), "https://example.net:8080/dir/other");
    }

    #[test]
    fn relative_not_allowed() {
        let strategy = DefaultRedirectStrategy::default();
        let mut config = RequestConfig::default();
        config.set_relative_redirects_allowed(false);
        let mut ctx = ClientContext::new(config);
        let e = strategy
            .get_redirect(&request(Method::GET), &redirect(302, Some("/x")), &mut ctx)
            .unwrap_err();
        assert!(matches!(e, ProtocolError::RelativeRedirect(_)));

        let next = strategy
            .get_redirect(
                &request(Method::GET),
                &redirect(302, Some("http://example.com/x")),
                &mut ctx,
            )
            .unwrap();
        assert_eq!(next.uri(), "http://example.com/x");
    }

    #[test]
    fn missing_or_invalid_location() {
        let strategy = DefaultRedirectStrategy::default();
        let mut ctx = ClientContext::default();
        let e = strategy
            .get_redirect(&request(Method::GET), &redirect(301, None), &mut ctx)
            .unwrap_err();
        assert!(matches!(e, ProtocolError::MissingLocation(301)));

        let e = strategy
            .get_redirect(&request(Method::GET), &redirect(301, Some("http://")), &mut ctx)
            .unwrap_err();
        assert!(matches!(e, ProtocolError::InvalidRedirectLocation(..)));
    }

    #[test]
    fn circular() {
        let strategy = DefaultRedirectStrategy::default();
        let mut ctx = ClientContext::default();
        let get = request(Method::GET);
        strategy
            .get_redirect(&get, &redirect(302, Some("/loop")), &mut ctx)
            .unwrap();
        let e = strategy
            .get_redirect(&get, &redirect(302, Some("/loop")), &mut ctx)
            .unwrap_err();
        assert!(matches!(e, ProtocolError::CircularRedirect(_)));

        let mut config = RequestConfig::default();
        config.set_circular_redirects_allowed(true);
        let mut ctx = ClientContext::new(config);
        for _ in 0..3 {
            strategy
                .get_redirect(&get, &redirect(302, Some("/loop")), &mut ctx)
                .unwrap();
        }
        assert_eq!(ctx.redirect_locations().len(), 3);
    }

    #[test]
    fn method_rewrite() {
        let strategy = DefaultRedirectStrategy::lax();
        let mut ctx = ClientContext::default();
        ctx.set_request_config({
            let mut config = RequestConfig::default();
            config.set_circular_redirects_allowed(true);
            config
        });

        let mut post = HttpRequest::post(
            Uri::from_static("http://example.com/form"),
            HttpEntity::from_bytes("a=1"),
        );
        post.headers_mut()
            .insert("x-token", "secret".parse().unwrap());

        let next = strategy
            .get_redirect(&post, &redirect(303, Some("/done")), &mut ctx)
            .unwrap();
        assert_eq!(next.method(), Method::GET);
        assert!(next.entity().is_none());
        assert!(next.headers().is_empty());

        let next = strategy
            .get_redirect(&post, &redirect(302, Some("/done")), &mut ctx)
            .unwrap();
        assert_eq!(next.method(), Method::GET);

        for code in [307, 308] {
            let next = strategy
                .get_redirect(&post, &redirect(code, Some("/again")), &mut ctx)
                .unwrap();
            assert_eq!(next.method(), Method::POST);
            assert_eq!(next.uri(), "http://example.com/again");
            assert!(next.entity().is_some());
            assert_eq!(next.headers().get("x-token").unwrap(), "secret");
        }

        let head = request(Method::HEAD);
        let next = strategy
            .get_redirect(&head, &redirect(303, Some("/h")), &mut ctx)
            .unwrap();
        assert_eq!(next.method(), Method::HEAD);
    }
}
