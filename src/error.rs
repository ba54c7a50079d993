// Copyright (C) Microsoft Corporation. All rights reserved.

//! Error types for the AEAD engine.

use thiserror::Error;

/// Errors surfaced by the engine to the host framework.
///
/// Every failure is reported synchronously to the immediate caller; the
/// engine never retries internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A parameter was outside its permitted range or missing.
    #[error("incorrect parameter {0}: expected {1}, got {2}")]
    IncorrectParam(String, String, String),

    /// Key material did not match the algorithm's key size.
    #[error("invalid key size: {0} bytes")]
    InvalidKeySize(usize),

    /// The associated data buffer could not be grown.
    #[error("could not grow associated data buffer")]
    AllocationFailure,

    /// Authentication tag verification failed on decrypt.
    ///
    /// Any bytes already written to the output buffer must be discarded by
    /// the caller; they are never valid plaintext.
    #[error("authentication tag mismatch")]
    AuthenticationFailure,

    /// The control operation is not supported by this cipher.
    #[error("unsupported control operation")]
    UnsupportedOperation,

    /// No cipher method is registered for the algorithm id.
    #[error("unsupported algorithm id: {0}")]
    UnsupportedAlgorithm(i32),

    /// The context is missing a key or direction for the requested call.
    #[error("cipher context not initialized")]
    NotInitialized,

    /// Output buffer smaller than the operation requires.
    #[error("output buffer too small: need {0}, got {1}")]
    BufferTooSmall(usize, usize),

    /// The backend crypto library rejected the operation.
    #[error("backend cipher failure")]
    BackendFailure,

    /// The secure random source failed.
    #[error("random source failure")]
    RngFailure,
}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
