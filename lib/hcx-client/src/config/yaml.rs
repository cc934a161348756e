/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::RequestConfig;
use crate::route::HttpHost;

impl RequestConfig {
    pub fn parse_yaml(&mut self, v: &Yaml) -> anyhow::Result<()> {
        if let Yaml::Hash(map) = v {
            hcx_yaml::foreach_kv(map, |k, v| self.set(k, v))
        } else {
            Err(anyhow!(
                "yaml value type for 'request config' should be 'map'"
            ))
        }
    }

    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match hcx_yaml::key::normalize(k).as_str() {
            "redirects_enabled" | "follow_redirects" => {
                self.redirects_enabled = hcx_yaml::value::as_bool(v)?;
                Ok(())
            }
            "max_redirects" => {
                self.max_redirects = hcx_yaml::value::as_usize(v)?;
                Ok(())
            }
            "circular_redirects_allowed" => {
                self.circular_redirects_allowed = hcx_yaml::value::as_bool(v)?;
                Ok(())
            }
            "relative_redirects_allowed" => {
                self.relative_redirects_allowed = hcx_yaml::value::as_bool(v)?;
                Ok(())
            }
            "expect_continue_enabled" | "expect_continue" => {
                self.expect_continue_enabled = hcx_yaml::value::as_bool(v)?;
                Ok(())
            }
            "expect_continue_timeout" => {
                self.expect_continue_timeout = hcx_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "connection_request_timeout" => {
                let timeout = hcx_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                self.set_connection_request_timeout(Some(timeout));
                Ok(())
            }
            "connect_timeout" => {
                let timeout = hcx_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                self.set_connect_timeout(Some(timeout));
                Ok(())
            }
            "socket_timeout" => {
                let timeout = hcx_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                self.set_socket_timeout(Some(timeout));
                Ok(())
            }
            "proxy" => {
                let s = hcx_yaml::value::as_string(v)?;
                let proxy = HttpHost::from_str(&s)
                    .map_err(|e| anyhow!("invalid proxy host {s}: {e}"))?;
                self.proxy = Some(proxy);
                Ok(())
            }
            "local_address" => {
                let ip = hcx_yaml::value::as_ipaddr(v)
                    .context(format!("invalid ip address value for key {k}"))?;
                self.local_address = Some(ip);
                Ok(())
            }
            "chunk_fragment_size" => {
                self.chunk_fragment_size = hcx_yaml::humanize::as_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
                Ok(())
            }
            "max_header_size" => {
                let size = hcx_yaml::humanize::as_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
                self.message_constraints.set_max_header_size(size);
                Ok(())
            }
            "max_header_count" => {
                let count = hcx_yaml::value::as_usize(v)?;
                self.message_constraints.set_max_header_count(count);
                Ok(())
            }
            "max_line_length" => {
                let len = hcx_yaml::humanize::as_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
                self.message_constraints.set_max_line_length(len);
                Ok(())
            }
            "max_garbage_lines" => {
                let count = hcx_yaml::value::as_usize(v)?;
                self.message_constraints.set_max_garbage_lines(count);
                Ok(())
            }
            "max_trailer_size" => {
                let size = hcx_yaml::humanize::as_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
                self.message_constraints.set_max_trailer_size(size);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }
}
