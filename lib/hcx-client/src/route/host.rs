/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use http::Uri;
use http::uri::Authority;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpHostParseError {
    #[error("empty host")]
    EmptyHost,
    #[error("invalid authority: {0}")]
    InvalidAuthority(http::uri::InvalidUri),
    #[error("invalid uri: {0}")]
    InvalidUri(http::uri::InvalidUri),
    #[error("no host in uri")]
    NoHost,
}

/// A scheme, host and optional port triple.
///
/// Scheme and host name are stored lowercased, so equality is case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpHost {
    scheme: String,
    hostname: String,
    port: Option<u16>,
}

impl HttpHost {
    pub const DEFAULT_SCHEME: &'static str = "http";

    pub fn new(hostname: &str, port: Option<u16>, scheme: &str) -> Self {
        HttpHost {
            scheme: scheme.to_ascii_lowercase(),
            hostname: hostname.to_ascii_lowercase(),
            port,
        }
    }

    /// Extract the target host of an absolute uri, `None` for a relative one.
    pub fn from_uri(uri: &Uri) -> Option<Self> {
        let host = uri.host()?;
        if host.is_empty() {
            return None;
        }
        let scheme = uri.scheme_str().unwrap_or(Self::DEFAULT_SCHEME);
        Some(HttpHost::new(host, uri.port_u16(), scheme))
    }

    #[inline]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[inline]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[inline]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn with_port(&self, port: u16) -> Self {
        HttpHost {
            scheme: self.scheme.clone(),
            hostname: self.hostname.clone(),
            port: Some(port),
        }
    }

    /// The `host[:port]` form used in the `Host` header.
    pub fn to_host_string(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.hostname),
            None => self.hostname.clone(),
        }
    }

    pub fn to_uri_string(&self) -> String {
        format!("{}://{}", self.scheme, self.to_host_string())
    }
}

impl fmt::Display for HttpHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.hostname)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

impl FromStr for HttpHost {
    type Err = HttpHostParseError;

    /// Accepts both `scheme://host[:port]` and a bare `host[:port]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(HttpHostParseError::EmptyHost);
        }
        if s.contains("://") {
            let uri = Uri::from_str(s).map_err(HttpHostParseError::InvalidUri)?;
            HttpHost::from_uri(&uri).ok_or(HttpHostParseError::NoHost)
        } else {
            let authority = Authority::from_str(s).map_err(HttpHostParseError::InvalidAuthority)?;
            Ok(HttpHost::new(
                authority.host(),
                authority.port_u16(),
                Self::DEFAULT_SCHEME,
            ))
        }
    }
}
