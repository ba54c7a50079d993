// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL-backed AES-GCM primitives.
//!
//! One-shot authenticated encrypt/decrypt over `CipherCtx`, plus the nonce
//! helpers the cipher contexts build on: extending a fixed nonce prefix with
//! secure-random bytes and the big-endian counter increment that derives the
//! next per-record nonce.

use openssl::cipher::*;
use openssl::cipher_ctx::*;
use zeroize::Zeroize;

use crate::backend::rng::*;
use crate::error::*;

/// Maximum nonce length accepted by the GCM adapter.
pub const GCM_NONCE_MAX_LEN: usize = 16;
/// Normal nonce length - used as is, other lengths are hashed by the backend.
pub const GCM_NONCE_MID_LEN: usize = 12;
/// GCM authentication tag length.
pub const AES_GCM_TAG_LEN: usize = 16;

/// A scheduled AES-GCM key.
///
/// Wraps validated key material and selects the backend cipher by key size.
/// Key bytes are zeroized on drop.
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct GcmKey {
    key: Vec<u8>,
}

impl GcmKey {
    /// Schedules key material.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidKeySize` unless the key is 16, 24 or 32
    /// bytes.
    pub fn from_bytes(bytes: &[u8]) -> EngineResult<Self> {
        match bytes.len() {
            16 | 24 | 32 => Ok(Self {
                key: bytes.to_vec(),
            }),
            n => Err(EngineError::InvalidKeySize(n)),
        }
    }

    /// Key length in bytes.
    pub fn size(&self) -> usize {
        self.key.len()
    }

    fn cipher(&self) -> &'static CipherRef {
        match self.key.len() {
            16 => Cipher::aes_128_gcm(),
            24 => Cipher::aes_192_gcm(),
            _ => Cipher::aes_256_gcm(),
        }
    }

    /// One-shot AES-GCM encrypt.
    ///
    /// Encrypts `input` into `output` (which must be at least `input.len()`
    /// bytes) under `nonce`, authenticating `aad` alongside, and writes the
    /// authentication tag into `tag`.
    pub fn encrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        input: &[u8],
        output: &mut [u8],
        tag: &mut [u8],
    ) -> EngineResult<()> {
        let cipher = self.cipher();

        let mut ctx = CipherCtx::new().map_err(|_| EngineError::BackendFailure)?;
        ctx.encrypt_init(Some(cipher), None, None)
            .map_err(|_| EngineError::BackendFailure)?;
        if nonce.len() != GCM_NONCE_MID_LEN {
            ctx.set_iv_length(nonce.len())
                .map_err(|_| EngineError::BackendFailure)?;
        }
        ctx.encrypt_init(None, Some(&self.key), Some(nonce))
            .map_err(|_| EngineError::BackendFailure)?;

        if !aad.is_empty() {
            ctx.cipher_update(aad, None)
                .map_err(|_| EngineError::BackendFailure)?;
        }

        ctx.cipher_update(input, Some(&mut output[..input.len()]))
            .map_err(|_| EngineError::BackendFailure)?;

        let mut final_block = vec![0u8; cipher.block_size()];
        ctx.cipher_final(&mut final_block)
            .map_err(|_| EngineError::BackendFailure)?;

        ctx.tag(tag).map_err(|_| EngineError::BackendFailure)?;

        Ok(())
    }

    /// One-shot AES-GCM decrypt.
    ///
    /// Decrypts `input` into `output` under `nonce`, verifying `tag` over
    /// the ciphertext and `aad`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::AuthenticationFailure` when tag verification
    /// fails; `output` contents must then be discarded by the caller.
    pub fn decrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        input: &[u8],
        tag: &[u8],
        output: &mut [u8],
    ) -> EngineResult<()> {
        let cipher = self.cipher();

        let mut ctx = CipherCtx::new().map_err(|_| EngineError::BackendFailure)?;
        ctx.decrypt_init(Some(cipher), None, None)
            .map_err(|_| EngineError::BackendFailure)?;
        if nonce.len() != GCM_NONCE_MID_LEN {
            ctx.set_iv_length(nonce.len())
                .map_err(|_| EngineError::BackendFailure)?;
        }
        ctx.decrypt_init(None, Some(&self.key), Some(nonce))
            .map_err(|_| EngineError::BackendFailure)?;

        // Tag must be in place before the final-block verification.
        ctx.set_tag(tag).map_err(|_| EngineError::BackendFailure)?;

        if !aad.is_empty() {
            ctx.cipher_update(aad, None)
                .map_err(|_| EngineError::BackendFailure)?;
        }

        ctx.cipher_update(input, Some(&mut output[..input.len()]))
            .map_err(|_| EngineError::BackendFailure)?;

        let mut final_block = vec![0u8; cipher.block_size()];
        ctx.cipher_final(&mut final_block)
            .map_err(|_| EngineError::AuthenticationFailure)?;

        Ok(())
    }
}

impl Drop for GcmKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Builds a nonce from a fixed prefix and a secure-random remainder.
///
/// The first `fixed.len()` bytes of the result are copied from `fixed`; the
/// rest up to `nonce_len` comes from `rng`. The caller validates that
/// `fixed.len() <= nonce_len <= GCM_NONCE_MAX_LEN`.
pub fn extend_nonce(
    fixed: &[u8],
    nonce_len: usize,
    rng: &Rng,
) -> EngineResult<[u8; GCM_NONCE_MAX_LEN]> {
    let mut nonce = [0u8; GCM_NONCE_MAX_LEN];
    nonce[..fixed.len()].copy_from_slice(fixed);
    rng.rand_bytes(&mut nonce[fixed.len()..nonce_len])?;
    Ok(nonce)
}

/// Advances the big-endian record counter kept in the trailing nonce bytes.
///
/// A wrap to zero carries into the next byte toward the front; propagation
/// stops at the start of the nonce.
pub fn increment_nonce_counter(nonce: &mut [u8]) {
    for i in (0..nonce.len()).rev() {
        nonce[i] = nonce[i].wrapping_add(1);
        if nonce[i] != 0 {
            break;
        }
    }
}
