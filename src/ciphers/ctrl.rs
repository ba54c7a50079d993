// Copyright (C) Microsoft Corporation. All rights reserved.

//! Control commands for cipher contexts.

/// `SetIvFixed` length argument meaning "copy the whole nonce".
pub const IV_FIXED_COPY_ALL: i32 = -1;

/// Control operations the host framework issues against a cipher context.
pub enum CipherCtrlOp {
    /// Set the nonce length to use.
    SetIvLen(i32),
    /// Set the fixed part of the nonce and have the rest generated;
    /// [`IV_FIXED_COPY_ALL`] copies the whole nonce instead.
    SetIvFixed(Vec<u8>, i32),
    /// Read back the configured nonce length.
    GetIvLen,
    /// Install a generated nonce and advance its record counter.
    IvGen(Vec<u8>, i32),
    /// Read back the tag produced by an encrypt.
    GetTag(i32),
    /// Set the tag for decryption, or only the tag length when no data is
    /// supplied.
    SetTag(Option<Vec<u8>>, i32),
    /// Install a transport-record header as associated data.
    SetTlsAad(Vec<u8>),
}

/// Results of control operations.
#[derive(Debug, PartialEq, Eq)]
pub enum CipherCtrlResult {
    SetIvLenSuccess,
    SetIvFixedSuccess,
    IvLen(usize),
    IvGenSuccess,
    Tag(Vec<u8>),
    SetTagSuccess,
    /// Advisory tag length for transport-record processing.
    TlsAadTagLen(usize),
}
