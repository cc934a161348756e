/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;

use super::{HttpHost, RoutePlanError};

/// Maps a host without explicit port to the default port of its scheme.
pub trait SchemePortResolver: Send + Sync {
    fn resolve(&self, host: &HttpHost) -> Result<u16, RoutePlanError>;
}

#[derive(Clone, Debug, Default)]
pub struct DefaultSchemePortResolver {
    extra: HashMap<String, u16>,
}

impl DefaultSchemePortResolver {
    pub fn with_scheme(mut self, scheme: &str, port: u16) -> Self {
        self.extra.insert(scheme.to_ascii_lowercase(), port);
        self
    }
}

impl SchemePortResolver for DefaultSchemePortResolver {
    fn resolve(&self, host: &HttpHost) -> Result<u16, RoutePlanError> {
        if let Some(port) = host.port() {
            return Ok(port);
        }
        match host.scheme() {
            "http" => Ok(80),
            "https" => Ok(443),
            scheme => self
                .extra
                .get(scheme)
                .copied()
                .ok_or_else(|| RoutePlanError::UnsupportedScheme(scheme.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve() {
        let resolver = DefaultSchemePortResolver::default().with_scheme("WS", 80);
        assert_eq!(
            resolver.resolve(&HttpHost::new("a", None, "http")).unwrap(),
            80
        );
        assert_eq!(
            resolver.resolve(&HttpHost::new("a", None, "https")).unwrap(),
            443
        );
        assert_eq!(
            resolver
                .resolve(&HttpHost::new("a", Some(8080), "https"))
                .unwrap(),
            8080
        );
        assert_eq!(resolver.resolve(&HttpHost::new("a", None, "ws")).unwrap(), 80);

        let e = resolver
            .resolve(&HttpHost::new("a", None, "gopher"))
            .unwrap_err();
        assert!(matches!(e, RoutePlanError::UnsupportedScheme(s) if s == "gopher"));
    }
}
