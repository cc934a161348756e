/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod connection;
#[cfg(test)]
pub(crate) use connection::connection_shutdown_error;
pub use connection::{
    BoxAsyncRead, BoxAsyncWrite, ConnectionIo, ConnectionShutdown, GuardedReader, GuardedWriter,
    HttpConnection, is_connection_shutdown,
};

mod manager;
pub use manager::{ConnectionManager, ConnectionRequest, ConnectionRequestError};

mod lease;
pub use lease::ConnectionLease;
