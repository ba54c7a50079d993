// Copyright (C) Microsoft Corporation. All rights reserved.

//! AEAD cipher methods exposed to the host framework.

use crate::error::*;

mod aes_gcm;
mod ctrl;
mod record;

pub use aes_gcm::AesGcmContext;
pub use ctrl::*;
pub use record::RecordLenConvention;
pub use record::TLS_AAD_LEN;
pub use record::TLS_EXPLICIT_IV_LEN;
pub use record::TLS_FIXED_IV_LEN;

/// Numeric algorithm id for AES-128-GCM.
pub const NID_AES_128_GCM: i32 = 895;
/// Numeric algorithm id for AES-192-GCM.
pub const NID_AES_192_GCM: i32 = 898;
/// Numeric algorithm id for AES-256-GCM.
pub const NID_AES_256_GCM: i32 = 901;

/// AEAD algorithms this engine provides.
///
/// A closed set selected by numeric algorithm id; the host's registry
/// resolves an id through [`AeadAlgo::from_nid`] and constructs a context
/// for the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgo {
    Aes128Gcm,
    Aes192Gcm,
    Aes256Gcm,
}

impl AeadAlgo {
    /// Looks up the algorithm for a host numeric id.
    pub fn from_nid(nid: i32) -> EngineResult<Self> {
        match nid {
            NID_AES_128_GCM => Ok(AeadAlgo::Aes128Gcm),
            NID_AES_192_GCM => Ok(AeadAlgo::Aes192Gcm),
            NID_AES_256_GCM => Ok(AeadAlgo::Aes256Gcm),
            _ => Err(EngineError::UnsupportedAlgorithm(nid)),
        }
    }

    /// Host numeric id of the algorithm.
    pub fn nid(&self) -> i32 {
        match self {
            AeadAlgo::Aes128Gcm => NID_AES_128_GCM,
            AeadAlgo::Aes192Gcm => NID_AES_192_GCM,
            AeadAlgo::Aes256Gcm => NID_AES_256_GCM,
        }
    }

    /// Key length in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            AeadAlgo::Aes128Gcm => 16,
            AeadAlgo::Aes192Gcm => 24,
            AeadAlgo::Aes256Gcm => 32,
        }
    }
}

/// Algorithm ids this engine registers with the host.
pub fn supported_cipher_nids() -> &'static [i32] {
    &[NID_AES_128_GCM, NID_AES_192_GCM, NID_AES_256_GCM]
}

/// Direction of a cipher operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherDirection {
    Encrypt,
    Decrypt,
}

/// Usage mode of a cipher context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    /// Plain AEAD: nonce and tag are managed out of band by the caller.
    Standalone,
    /// Record framing: explicit nonce and tag are embedded in one buffer.
    /// Entered through the record-header control command and kept for the
    /// context's lifetime.
    TransportRecord,
}
