/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod reuse;
pub use reuse::{
    ConnectionReuseStrategy, DefaultConnectionReuseStrategy, NoConnectionReuseStrategy,
};

mod keepalive;
pub use keepalive::{ConnectionKeepAliveStrategy, DefaultConnectionKeepAliveStrategy};

mod redirect;
pub use redirect::{DefaultRedirectStrategy, RedirectStrategy};
