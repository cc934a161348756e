/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::str::FromStr;

use anyhow::anyhow;
use yaml_rust::Yaml;

pub fn as_ipaddr(v: &Yaml) -> anyhow::Result<IpAddr> {
    if let Yaml::String(s) = v {
        let ip = IpAddr::from_str(s).map_err(|e| anyhow!("invalid ip address {s}: {e}"))?;
        Ok(ip)
    } else {
        Err(anyhow!("yaml value type for 'IpAddr' should be 'string'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn t_ipaddr() {
        let v = Yaml::String("192.168.1.1".to_string());
        assert_eq!(
            as_ipaddr(&v).unwrap(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))
        );

        let v = Yaml::String("::1".to_string());
        assert!(as_ipaddr(&v).unwrap().is_loopback());

        let v = Yaml::String("example.com".to_string());
        assert!(as_ipaddr(&v).is_err());

        let v = Yaml::Integer(1);
        assert!(as_ipaddr(&v).is_err());
    }
}
