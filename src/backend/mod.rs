// Copyright (C) Microsoft Corporation. All rights reserved.

//! Backend crypto provider.
//!
//! Everything the adapter consumes from the underlying crypto library:
//! key scheduling and one-shot authenticated encrypt/decrypt ([`gcm_ossl`])
//! and the secure random source ([`rng`]). The cipher state machines in
//! [`crate::ciphers`] build on this module and add no cryptography of their
//! own.

mod gcm_ossl;
mod rng;

pub use gcm_ossl::*;
pub use rng::*;
