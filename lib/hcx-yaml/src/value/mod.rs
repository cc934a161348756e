/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod primary;
pub use primary::{as_bool, as_string, as_usize};

mod net;
pub use net::as_ipaddr;
