// Copyright (C) Microsoft Corporation. All rights reserved.

//! AEAD provider engine.
//!
//! This crate adapts a backend crypto library's one-shot AES-GCM primitives
//! to the call pattern of a host cryptographic framework: one `init` carrying
//! key and/or nonce material, zero or more `ctrl` commands configuring the
//! nonce, tag and associated data, and one or more `cipher` data calls that
//! resolve the operation. Two usage modes are supported:
//!
//! - **Standalone AEAD**: the caller manages nonce and tag out of band and
//!   feeds associated data through repeated `cipher` calls with no output
//!   buffer.
//! - **Transport records**: a fixed-format header installs the associated
//!   data, and each record carries its explicit nonce at the head and its
//!   tag at the tail of a single buffer.
//!
//! The backend (key scheduling, the GCM transform and the secure random
//! source) lives in [`backend`]; the per-operation state machines and the
//! algorithm registry live in [`ciphers`].

use std::env::var_os;
use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

pub mod backend;
pub mod ciphers;

mod error;
pub use error::*;

/// Configure engine logging.
///
/// Logging is disabled unless `AEAD_ENGINE_LOG_STDERR` is set in the
/// environment; levels follow the `RUST_LOG` filter syntax. Safe to call
/// more than once.
pub fn init_log() {
    static LOG_INIT: OnceLock<()> = OnceLock::new();

    LOG_INIT.get_or_init(|| {
        if var_os("AEAD_ENGINE_LOG_STDERR").is_some() {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    });
}
