// Copyright (C) Microsoft Corporation. All rights reserved.

//! Transport-record framing.
//!
//! A record carries its explicit nonce at the head and its tag at the tail
//! of a single buffer; a fixed-format header supplies the associated data.
//! The header's trailing two bytes hold a big-endian length covering the
//! whole wire payload, which the adapter rewrites down to the cipher-input
//! length before authenticating it.

use zeroize::Zeroize;

use crate::backend::*;
use crate::ciphers::aes_gcm::AesGcmContext;
use crate::ciphers::CipherDirection;
use crate::error::*;

/// Transport-record header length.
pub const TLS_AAD_LEN: usize = 13;
/// Explicit (per-record) nonce bytes carried at the head of a record.
pub const TLS_EXPLICIT_IV_LEN: usize = 8;
/// Fixed nonce bytes shared by every record of a session.
pub const TLS_FIXED_IV_LEN: usize = 4;

/// Return-length convention for transport-record decrypt.
///
/// Host framework protocol versions disagree on what the decrypt data call
/// reports; the active convention is fixed at context construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordLenConvention {
    /// Report the decrypted payload length.
    #[default]
    PlaintextLen,
    /// Report the full consumed record length.
    ConsumedLen,
}

/// Validates a record header and rewrites its length field down to the
/// cipher-input length. Returns the adjusted header.
pub(super) fn adjust_record_header(
    header: &[u8],
    direction: CipherDirection,
    tag_len: usize,
) -> EngineResult<Vec<u8>> {
    if header.len() != TLS_AAD_LEN {
        return Err(EngineError::IncorrectParam(
            "record header length".to_string(),
            TLS_AAD_LEN.to_string(),
            header.len().to_string(),
        ));
    }

    let mut aad = header.to_vec();
    let wire_len = usize::from(u16::from_be_bytes([
        aad[TLS_AAD_LEN - 2],
        aad[TLS_AAD_LEN - 1],
    ]));

    let mut len = wire_len.checked_sub(TLS_EXPLICIT_IV_LEN).ok_or_else(|| {
        EngineError::IncorrectParam(
            "record length field".to_string(),
            format!(">= {TLS_EXPLICIT_IV_LEN}"),
            wire_len.to_string(),
        )
    })?;
    if direction == CipherDirection::Decrypt {
        len = len.checked_sub(tag_len).ok_or_else(|| {
            EngineError::IncorrectParam(
                "record length field".to_string(),
                format!(">= {}", TLS_EXPLICIT_IV_LEN + tag_len),
                wire_len.to_string(),
            )
        })?;
    }

    let len = (len as u16).to_be_bytes();
    aad[TLS_AAD_LEN - 2] = len[0];
    aad[TLS_AAD_LEN - 1] = len[1];
    Ok(aad)
}

/// Processes one transport record.
///
/// The header associated data never survives the call, success or failure;
/// a stale header must not authenticate the next record.
pub(super) fn record_cipher(
    ctx: &mut AesGcmContext,
    output: Option<&mut [u8]>,
    input: &[u8],
) -> EngineResult<usize> {
    let result = match ctx.direction {
        Some(CipherDirection::Encrypt) => record_encrypt(ctx, output, input),
        Some(CipherDirection::Decrypt) => record_decrypt(ctx, output, input),
        None => Err(EngineError::NotInitialized),
    };
    ctx.aad.zeroize();
    result
}

fn record_encrypt(
    ctx: &mut AesGcmContext,
    output: Option<&mut [u8]>,
    input: &[u8],
) -> EngineResult<usize> {
    // Zero-length requests succeed without touching the output buffer.
    if input.is_empty() {
        return Ok(0);
    }

    let enc_len = record_payload_len(input.len())?;
    let output = output.ok_or_else(|| {
        EngineError::IncorrectParam(
            "output buffer".to_string(),
            "present".to_string(),
            "absent".to_string(),
        )
    })?;
    if output.len() < input.len() {
        return Err(EngineError::BufferTooSmall(input.len(), output.len()));
    }
    check_record_nonce_len(ctx.iv_len)?;
    let key = ctx.key.as_ref().ok_or(EngineError::NotInitialized)?;

    let out = &mut output[..input.len()];
    let (head, rest) = out.split_at_mut(TLS_EXPLICIT_IV_LEN);
    let (body, tail) = rest.split_at_mut(enc_len);

    // The explicit nonce part travels at the head of the record.
    head.copy_from_slice(&ctx.iv[TLS_FIXED_IV_LEN..TLS_FIXED_IV_LEN + TLS_EXPLICIT_IV_LEN]);

    key.encrypt(
        &ctx.iv[..ctx.iv_len],
        &ctx.aad,
        &input[TLS_EXPLICIT_IV_LEN..TLS_EXPLICIT_IV_LEN + enc_len],
        body,
        tail,
    )?;
    increment_nonce_counter(&mut ctx.iv[..ctx.iv_len]);

    Ok(input.len())
}

fn record_decrypt(
    ctx: &mut AesGcmContext,
    output: Option<&mut [u8]>,
    input: &[u8],
) -> EngineResult<usize> {
    let dec_len = record_payload_len(input.len())?;
    let output = output.ok_or_else(|| {
        EngineError::IncorrectParam(
            "output buffer".to_string(),
            "present".to_string(),
            "absent".to_string(),
        )
    })?;
    if output.len() < TLS_EXPLICIT_IV_LEN + dec_len {
        return Err(EngineError::BufferTooSmall(
            TLS_EXPLICIT_IV_LEN + dec_len,
            output.len(),
        ));
    }
    check_record_nonce_len(ctx.iv_len)?;

    // The explicit nonce part comes from the head of the record.
    ctx.iv[TLS_FIXED_IV_LEN..GCM_NONCE_MID_LEN].copy_from_slice(&input[..TLS_EXPLICIT_IV_LEN]);

    let key = ctx.key.as_ref().ok_or(EngineError::NotInitialized)?;
    let tag = &input[input.len() - AES_GCM_TAG_LEN..];
    key.decrypt(
        &ctx.iv[..ctx.iv_len],
        &ctx.aad,
        &input[TLS_EXPLICIT_IV_LEN..input.len() - AES_GCM_TAG_LEN],
        tag,
        &mut output[TLS_EXPLICIT_IV_LEN..TLS_EXPLICIT_IV_LEN + dec_len],
    )?;

    Ok(match ctx.record_len {
        RecordLenConvention::PlaintextLen => dec_len,
        RecordLenConvention::ConsumedLen => input.len(),
    })
}

fn record_payload_len(record_len: usize) -> EngineResult<usize> {
    record_len
        .checked_sub(TLS_EXPLICIT_IV_LEN + AES_GCM_TAG_LEN)
        .ok_or_else(|| {
            EngineError::IncorrectParam(
                "record length".to_string(),
                format!(">= {}", TLS_EXPLICIT_IV_LEN + AES_GCM_TAG_LEN),
                record_len.to_string(),
            )
        })
}

fn check_record_nonce_len(iv_len: usize) -> EngineResult<()> {
    if iv_len != GCM_NONCE_MID_LEN {
        return Err(EngineError::IncorrectParam(
            "record nonce length".to_string(),
            GCM_NONCE_MID_LEN.to_string(),
            iv_len.to_string(),
        ));
    }
    Ok(())
}
