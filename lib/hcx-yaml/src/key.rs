/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

/// Map keys are matched case-insensitively, with `-` and `_` treated alike.
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t() {
        assert_eq!(normalize("Max-Redirects"), "max_redirects");
        assert_eq!(normalize("socket_timeout"), "socket_timeout");
        assert_eq!(normalize("A-B_C"), "a_b_c");
    }
}
