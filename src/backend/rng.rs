// Copyright (C) Microsoft Corporation. All rights reserved.

//! Random number generation support

use std::sync::OnceLock;

use crate::error::*;

/// RNG struct for random number generation
#[derive(Debug, Clone, Copy, Default)]
pub struct Rng {}

/// Trait for RNG operations.
pub trait RngOp {
    /// Fills `buf` with cryptographically secure random bytes.
    ///
    /// # Returns
    ///
    /// * `Result<(), EngineError>` - Returns `Ok(())` on success,
    ///   or `Err(EngineError::RngFailure)` if random generation fails.
    fn rand_bytes(&self, buf: &mut [u8]) -> Result<(), EngineError>;
}

impl RngOp for Rng {
    fn rand_bytes(&self, buf: &mut [u8]) -> Result<(), EngineError> {
        openssl::rand::rand_bytes(buf).map_err(|_| EngineError::RngFailure)
    }
}

/// Process-wide random source.
///
/// Contexts normally receive their own [`Rng`] at construction; this
/// accessor serves hosts that want a single shared instance. First use is
/// guarded by `OnceLock`, so concurrent initialization is safe.
pub fn process_rng() -> &'static Rng {
    static PROCESS_RNG: OnceLock<Rng> = OnceLock::new();
    PROCESS_RNG.get_or_init(Rng::default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rand_bytes() {
        let rng = Rng {};
        let mut buf = [0u8; 1024];
        assert!(rng.rand_bytes(&mut buf).is_ok());
        // Check that the buffer is not all zeros (very unlikely)
        assert_ne!(buf, [0u8; 1024]);
    }

    #[test]
    fn test_process_rng() {
        let mut buf = [0u8; 64];
        assert!(process_rng().rand_bytes(&mut buf).is_ok());
        assert_ne!(buf, [0u8; 64]);
    }
}
