// Copyright (C) Microsoft Corporation. All rights reserved.

//! AES-GCM cipher context.
//!
//! One context per operation, driven by the host framework's three-call
//! protocol: [`AesGcmContext::init`] fixes the key and direction,
//! [`AesGcmContext::ctrl`] configures nonce, tag and record state, and
//! [`AesGcmContext::cipher`] accumulates associated data until the terminal
//! call resolves the operation against the backend's one-shot primitive.

use zeroize::Zeroize;

use crate::backend::*;
use crate::ciphers::ctrl::*;
use crate::ciphers::record;
use crate::ciphers::AeadAlgo;
use crate::ciphers::CipherDirection;
use crate::ciphers::CipherMode;
use crate::ciphers::RecordLenConvention;
use crate::error::*;

/// Per-operation AES-GCM state.
pub struct AesGcmContext {
    algo: AeadAlgo,
    pub(super) key: Option<GcmKey>,
    pub(super) iv: [u8; GCM_NONCE_MAX_LEN],
    pub(super) iv_len: usize,
    iv_set: bool,
    tag: [u8; AES_GCM_TAG_LEN],
    tag_len: usize,
    pub(super) aad: Vec<u8>,
    pub(super) direction: Option<CipherDirection>,
    mode: CipherMode,
    pub(super) record_len: RecordLenConvention,
    rng: Rng,
    init: bool,
}

impl AesGcmContext {
    /// Creates a context for one operation.
    ///
    /// `record_len` selects the decrypt return-length convention used in
    /// transport-record mode; `rng` supplies the random bytes for generated
    /// nonce parts.
    pub fn new(algo: AeadAlgo, record_len: RecordLenConvention, rng: Rng) -> Self {
        Self {
            algo,
            key: None,
            iv: [0; GCM_NONCE_MAX_LEN],
            iv_len: GCM_NONCE_MID_LEN,
            iv_set: false,
            tag: [0; AES_GCM_TAG_LEN],
            tag_len: 0,
            aad: Vec::new(),
            direction: None,
            mode: CipherMode::Standalone,
            record_len,
            rng,
            init: false,
        }
    }

    /// Algorithm this context was constructed for.
    pub fn algo(&self) -> AeadAlgo {
        self.algo
    }

    /// Usage mode the context is currently in.
    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    /// Current nonce bytes.
    pub fn iv(&self) -> &[u8] {
        &self.iv[..self.iv_len]
    }

    /// Initializes or re-initializes the operation.
    ///
    /// The first call fixes the direction and, when key bytes are present,
    /// schedules the key. A later call with both `key` and `iv` absent resets
    /// the per-message state (nonce length, tag, associated data) while the
    /// scheduled key, the nonce bytes and the usage mode survive; this is how
    /// the host reuses one key across messages. An `iv`, when present, must
    /// be the default nonce length.
    pub fn init(
        &mut self,
        key: Option<&[u8]>,
        iv: Option<&[u8]>,
        direction: CipherDirection,
    ) -> EngineResult<()> {
        if (key.is_none() && iv.is_none()) || !self.init {
            self.iv_len = GCM_NONCE_MID_LEN;
            self.iv_set = false;
            self.tag_len = 0;
            self.aad.zeroize();
            self.init = true;
        }
        match self.direction {
            None => self.direction = Some(direction),
            Some(dir) if dir != direction => {
                // Direction is fixed for the context's lifetime.
                tracing::warn!("init direction change ignored: {dir:?} -> {direction:?}");
            }
            Some(_) => {}
        }
        if let Some(key) = key {
            if key.len() != self.algo.key_len() {
                return Err(EngineError::InvalidKeySize(key.len()));
            }
            self.key = Some(GcmKey::from_bytes(key)?);
        }
        if let Some(iv) = iv {
            if iv.len() != GCM_NONCE_MID_LEN {
                return Err(EngineError::IncorrectParam(
                    "IV Length".to_string(),
                    GCM_NONCE_MID_LEN.to_string(),
                    iv.len().to_string(),
                ));
            }
            self.iv_len = GCM_NONCE_MID_LEN;
            self.iv[..GCM_NONCE_MID_LEN].copy_from_slice(iv);
            self.iv_set = true;
        }
        Ok(())
    }

    /// Dispatches a control command against this context.
    pub fn ctrl(&mut self, ctrl_op: CipherCtrlOp) -> EngineResult<CipherCtrlResult> {
        match ctrl_op {
            CipherCtrlOp::SetIvLen(len) => {
                self.ctrl_set_iv_len(len)?;
                Ok(CipherCtrlResult::SetIvLenSuccess)
            }
            CipherCtrlOp::SetIvFixed(fixed, len) => {
                self.ctrl_set_iv_fixed(&fixed, len)?;
                Ok(CipherCtrlResult::SetIvFixedSuccess)
            }
            CipherCtrlOp::GetIvLen => Ok(CipherCtrlResult::IvLen(self.iv_len)),
            CipherCtrlOp::IvGen(iv, len) => {
                self.ctrl_iv_gen(&iv, len)?;
                Ok(CipherCtrlResult::IvGenSuccess)
            }
            CipherCtrlOp::GetTag(len) => Ok(CipherCtrlResult::Tag(self.ctrl_get_tag(len)?)),
            CipherCtrlOp::SetTag(tag, len) => {
                self.ctrl_set_tag(tag.as_deref(), len)?;
                Ok(CipherCtrlResult::SetTagSuccess)
            }
            CipherCtrlOp::SetTlsAad(header) => {
                let tag_len = self.ctrl_set_tls_aad(&header)?;
                Ok(CipherCtrlResult::TlsAadTagLen(tag_len))
            }
        }
    }

    fn ctrl_set_iv_len(&mut self, len: i32) -> EngineResult<()> {
        if len <= 0 || len as usize > GCM_NONCE_MAX_LEN {
            return Err(EngineError::IncorrectParam(
                "IV Length".to_string(),
                format!("1..={GCM_NONCE_MAX_LEN}"),
                len.to_string(),
            ));
        }
        self.iv_len = len as usize;
        Ok(())
    }

    fn ctrl_set_iv_fixed(&mut self, fixed: &[u8], len: i32) -> EngineResult<()> {
        if len == IV_FIXED_COPY_ALL {
            // Copy a complete caller-supplied nonce.
            if fixed.len() != self.iv_len {
                return Err(EngineError::IncorrectParam(
                    "IV Length".to_string(),
                    self.iv_len.to_string(),
                    fixed.len().to_string(),
                ));
            }
            self.iv[..self.iv_len].copy_from_slice(fixed);
        } else {
            // Keep the fixed prefix, generate the rest.
            if len < 0 || len as usize > self.iv_len || fixed.len() != len as usize {
                return Err(EngineError::IncorrectParam(
                    "Fixed IV Length".to_string(),
                    format!("0..={}", self.iv_len),
                    len.to_string(),
                ));
            }
            let nonce = extend_nonce(fixed, self.iv_len, &self.rng)?;
            self.iv[..self.iv_len].copy_from_slice(&nonce[..self.iv_len]);
        }
        self.iv_set = true;
        Ok(())
    }

    fn ctrl_iv_gen(&mut self, iv: &[u8], len: i32) -> EngineResult<()> {
        if len <= 0 || len as usize > GCM_NONCE_MAX_LEN || iv.len() != len as usize {
            return Err(EngineError::IncorrectParam(
                "IV Length".to_string(),
                format!("1..={GCM_NONCE_MAX_LEN}"),
                len.to_string(),
            ));
        }
        self.iv[..iv.len()].copy_from_slice(iv);
        increment_nonce_counter(&mut self.iv[..self.iv_len]);
        self.iv_set = true;
        Ok(())
    }

    fn ctrl_get_tag(&self, len: i32) -> EngineResult<Vec<u8>> {
        // Only an encrypt produces a tag to read back.
        if self.direction != Some(CipherDirection::Encrypt) {
            return Err(EngineError::UnsupportedOperation);
        }
        if len <= 0 || len as usize > self.tag_len {
            return Err(EngineError::IncorrectParam(
                "Tag Length".to_string(),
                format!("1..={}", self.tag_len),
                len.to_string(),
            ));
        }
        Ok(self.tag[..len as usize].to_vec())
    }

    fn ctrl_set_tag(&mut self, tag: Option<&[u8]>, len: i32) -> EngineResult<()> {
        if len <= 0 || len as usize > AES_GCM_TAG_LEN {
            return Err(EngineError::IncorrectParam(
                "Tag Length".to_string(),
                format!("1..={AES_GCM_TAG_LEN}"),
                len.to_string(),
            ));
        }
        let decrypt = self.direction == Some(CipherDirection::Decrypt);
        match tag {
            Some(tag) => {
                if tag.len() != len as usize {
                    return Err(EngineError::IncorrectParam(
                        "Tag Length".to_string(),
                        len.to_string(),
                        tag.len().to_string(),
                    ));
                }
                if decrypt {
                    self.tag[..tag.len()].copy_from_slice(tag);
                }
            }
            // Without tag data this is a length-only adjustment, which only
            // an encrypt may request.
            None if decrypt => {
                return Err(EngineError::IncorrectParam(
                    "Tag".to_string(),
                    "present".to_string(),
                    "absent".to_string(),
                ));
            }
            None => {}
        }
        self.tag_len = len as usize;
        Ok(())
    }

    fn ctrl_set_tls_aad(&mut self, header: &[u8]) -> EngineResult<usize> {
        let direction = self.direction.ok_or(EngineError::NotInitialized)?;
        let aad = record::adjust_record_header(header, direction, AES_GCM_TAG_LEN)?;
        self.aad.zeroize();
        self.aad = aad;
        self.mode = CipherMode::TransportRecord;
        Ok(AES_GCM_TAG_LEN)
    }

    /// Processes associated data or runs the terminal encrypt/decrypt.
    ///
    /// With no `output` the input is buffered as associated data and the call
    /// may be repeated. With an `output`, a non-empty input resolves the
    /// operation in one shot; empty input is a no-op so callers can close out
    /// associated data without supplying payload. In transport-record mode
    /// the record sub-protocol takes over regardless of `output`.
    ///
    /// Returns the number of bytes written (or buffered).
    pub fn cipher(&mut self, output: Option<&mut [u8]>, input: &[u8]) -> EngineResult<usize> {
        if self.mode == CipherMode::TransportRecord {
            return record::record_cipher(self, output, input);
        }
        let Some(output) = output else {
            return self.aad_append(input);
        };
        if input.is_empty() {
            return Ok(0);
        }
        // The associated data never survives the terminal call.
        let result = self.cipher_final(output, input);
        self.aad.zeroize();
        result
    }

    fn aad_append(&mut self, input: &[u8]) -> EngineResult<usize> {
        self.aad
            .try_reserve(input.len())
            .map_err(|_| EngineError::AllocationFailure)?;
        self.aad.extend_from_slice(input);
        Ok(input.len())
    }

    fn cipher_final(&mut self, output: &mut [u8], input: &[u8]) -> EngineResult<usize> {
        if output.len() < input.len() {
            return Err(EngineError::BufferTooSmall(input.len(), output.len()));
        }
        let key = self.key.as_ref().ok_or(EngineError::NotInitialized)?;
        match self.direction.ok_or(EngineError::NotInitialized)? {
            CipherDirection::Encrypt => {
                if !self.iv_set {
                    return Err(EngineError::IncorrectParam(
                        "IV".to_string(),
                        "supplied or generated".to_string(),
                        "unset".to_string(),
                    ));
                }
                // Tag always full size on calculation.
                self.tag_len = AES_GCM_TAG_LEN;
                key.encrypt(
                    &self.iv[..self.iv_len],
                    &self.aad,
                    input,
                    output,
                    &mut self.tag,
                )?;
                // Advance the nonce so a follow-up encrypt under this key
                // cannot repeat it.
                increment_nonce_counter(&mut self.iv[..self.iv_len]);
            }
            CipherDirection::Decrypt => {
                if self.tag_len == 0 {
                    return Err(EngineError::IncorrectParam(
                        "Tag".to_string(),
                        "set before decrypt".to_string(),
                        "unset".to_string(),
                    ));
                }
                key.decrypt(
                    &self.iv[..self.iv_len],
                    &self.aad,
                    input,
                    &self.tag[..self.tag_len],
                    output,
                )?;
            }
        }
        Ok(input.len())
    }
}

impl Drop for AesGcmContext {
    fn drop(&mut self) {
        self.iv.zeroize();
        self.tag.zeroize();
        self.aad.zeroize();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TEST_KEY: [u8; 16] = [0x42; 16];
    const TEST_IV: [u8; GCM_NONCE_MID_LEN] = [1; GCM_NONCE_MID_LEN];

    fn gcm_init(direction: CipherDirection) -> AesGcmContext {
        let mut ctx = AesGcmContext::new(
            AeadAlgo::Aes128Gcm,
            RecordLenConvention::default(),
            Rng::default(),
        );
        ctx.init(Some(&TEST_KEY), Some(&TEST_IV), direction)
            .expect("Could not init context");
        ctx
    }

    #[test]
    fn test_init_rejects_wrong_key_size() {
        let mut ctx = AesGcmContext::new(
            AeadAlgo::Aes256Gcm,
            RecordLenConvention::default(),
            Rng::default(),
        );
        let result = ctx.init(Some(&TEST_KEY), None, CipherDirection::Encrypt);
        assert_eq!(result, Err(EngineError::InvalidKeySize(16)));
        // The failed init must not have produced a usable key.
        let result = ctx.cipher(Some(&mut [0u8; 4]), &[0u8; 4]);
        assert_eq!(result, Err(EngineError::NotInitialized));
    }

    #[test]
    fn test_init_rejects_wrong_iv_length() {
        let mut ctx = AesGcmContext::new(
            AeadAlgo::Aes128Gcm,
            RecordLenConvention::default(),
            Rng::default(),
        );
        let result = ctx.init(Some(&TEST_KEY), Some(&[0u8; 7]), CipherDirection::Encrypt);
        assert!(result.is_err(), "result {:?}", result);
    }

    #[test]
    fn test_reinit_resets_message_state() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        ctx.ctrl(CipherCtrlOp::SetIvLen(16))
            .expect("Could not set IV length");
        ctx.cipher(None, b"aad bytes").expect("Could not set AAD");

        ctx.init(None, None, CipherDirection::Encrypt)
            .expect("Could not re-init context");
        assert_eq!(
            ctx.ctrl(CipherCtrlOp::GetIvLen).expect("Could not get IV length"),
            CipherCtrlResult::IvLen(GCM_NONCE_MID_LEN)
        );
        // The key survives a reset: a fresh IV is enough to encrypt again.
        ctx.init(None, Some(&TEST_IV), CipherDirection::Encrypt)
            .expect("Could not set IV");
        let mut output = [0u8; 4];
        ctx.cipher(Some(&mut output), &[0u8; 4])
            .expect("Could not encrypt after reset");
    }

    #[test]
    fn test_direction_fixed_for_lifetime() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        // A differing direction on re-init is ignored, not applied.
        ctx.init(None, Some(&TEST_IV), CipherDirection::Decrypt)
            .expect("Could not re-init context");
        let mut output = [0u8; 8];
        ctx.cipher(Some(&mut output), &[0u8; 8])
            .expect("Could not encrypt");
        let result = ctx.ctrl(CipherCtrlOp::GetTag(AES_GCM_TAG_LEN as i32));
        assert!(result.is_ok(), "result {:?}", result);
    }

    #[test]
    fn test_ctrl_set_iv_len_bounds() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        for len in 1..=GCM_NONCE_MAX_LEN as i32 {
            assert!(ctx.ctrl(CipherCtrlOp::SetIvLen(len)).is_ok());
        }
        assert!(ctx.ctrl(CipherCtrlOp::SetIvLen(0)).is_err());
        assert!(ctx.ctrl(CipherCtrlOp::SetIvLen(17)).is_err());
        assert!(ctx.ctrl(CipherCtrlOp::SetIvLen(-1)).is_err());
    }

    #[test]
    fn test_ctrl_set_iv_fixed_copy_all() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        let iv = vec![9u8; GCM_NONCE_MID_LEN];
        ctx.ctrl(CipherCtrlOp::SetIvFixed(iv.clone(), IV_FIXED_COPY_ALL))
            .expect("Could not set IV");
        assert_eq!(ctx.iv(), iv.as_slice());

        let result = ctx.ctrl(CipherCtrlOp::SetIvFixed(vec![9u8; 4], IV_FIXED_COPY_ALL));
        assert!(result.is_err(), "result {:?}", result);
    }

    #[test]
    fn test_ctrl_set_iv_fixed_generates_tail() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        let fixed = [0xaa, 0xbb, 0xcc, 0xdd];
        ctx.ctrl(CipherCtrlOp::SetIvFixed(fixed.to_vec(), fixed.len() as i32))
            .expect("Could not set fixed IV part");
        assert_eq!(&ctx.iv()[..4], &fixed);

        let result = ctx.ctrl(CipherCtrlOp::SetIvFixed(vec![0u8; 13], 13));
        assert!(result.is_err(), "result {:?}", result);
    }

    #[test]
    fn test_ctrl_iv_gen_increments_counter() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        let mut iv = [0u8; GCM_NONCE_MID_LEN];
        iv[GCM_NONCE_MID_LEN - 1] = 0xff;
        ctx.ctrl(CipherCtrlOp::IvGen(iv.to_vec(), iv.len() as i32))
            .expect("Could not generate IV");
        let mut expected = [0u8; GCM_NONCE_MID_LEN];
        expected[GCM_NONCE_MID_LEN - 2] = 1;
        assert_eq!(ctx.iv(), &expected);

        assert!(ctx.ctrl(CipherCtrlOp::IvGen(Vec::new(), 0)).is_err());
        assert!(ctx.ctrl(CipherCtrlOp::IvGen(vec![0u8; 17], 17)).is_err());
    }

    #[test]
    fn test_ctrl_get_tag_requires_encrypt() {
        let mut ctx = gcm_init(CipherDirection::Decrypt);
        let result = ctx.ctrl(CipherCtrlOp::GetTag(AES_GCM_TAG_LEN as i32));
        assert_eq!(result, Err(EngineError::UnsupportedOperation));
    }

    #[test]
    fn test_ctrl_get_tag_bounds() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        let mut output = [0u8; 4];
        ctx.cipher(Some(&mut output), &[7u8; 4])
            .expect("Could not encrypt");

        // Shorter reads of the tag are allowed, longer ones are not.
        let result = ctx.ctrl(CipherCtrlOp::GetTag(8));
        assert!(matches!(result, Ok(CipherCtrlResult::Tag(ref t)) if t.len() == 8));
        assert!(ctx.ctrl(CipherCtrlOp::GetTag(0)).is_err());
        assert!(ctx.ctrl(CipherCtrlOp::GetTag(17)).is_err());
    }

    #[test]
    fn test_ctrl_set_tag() {
        let mut ctx = gcm_init(CipherDirection::Decrypt);
        let tag = vec![5u8; AES_GCM_TAG_LEN];
        let result = ctx.ctrl(CipherCtrlOp::SetTag(Some(tag), AES_GCM_TAG_LEN as i32));
        assert_eq!(result, Ok(CipherCtrlResult::SetTagSuccess));

        assert!(ctx.ctrl(CipherCtrlOp::SetTag(Some(vec![5u8; 17]), 17)).is_err());
        assert!(ctx.ctrl(CipherCtrlOp::SetTag(Some(Vec::new()), 0)).is_err());
        // A length probe without tag data is an encrypt-only request.
        assert!(ctx.ctrl(CipherCtrlOp::SetTag(None, 12)).is_err());

        let mut ctx = gcm_init(CipherDirection::Encrypt);
        let result = ctx.ctrl(CipherCtrlOp::SetTag(None, 12));
        assert_eq!(result, Ok(CipherCtrlResult::SetTagSuccess));
    }

    #[test]
    fn test_aad_only_call_buffers_input() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        assert_eq!(ctx.cipher(None, b"first"), Ok(5));
        assert_eq!(ctx.cipher(None, b"second"), Ok(6));
        assert_eq!(ctx.aad, b"firstsecond");
    }

    #[test]
    fn test_zero_len_data_call_is_noop() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        let mut output = [0u8; 4];
        assert_eq!(ctx.cipher(Some(&mut output), &[]), Ok(0));
    }

    #[test]
    fn test_encrypt_requires_nonce() {
        let mut ctx = AesGcmContext::new(
            AeadAlgo::Aes128Gcm,
            RecordLenConvention::default(),
            Rng::default(),
        );
        ctx.init(Some(&TEST_KEY), None, CipherDirection::Encrypt)
            .expect("Could not init context");
        let mut output = [0u8; 4];
        let result = ctx.cipher(Some(&mut output), &[0u8; 4]);
        assert!(result.is_err(), "result {:?}", result);
    }

    #[test]
    fn test_decrypt_requires_tag() {
        let mut ctx = gcm_init(CipherDirection::Decrypt);
        let mut output = [0u8; 4];
        let result = ctx.cipher(Some(&mut output), &[0u8; 4]);
        assert!(result.is_err(), "result {:?}", result);
    }

    #[test]
    fn test_cipher_output_too_small() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        let mut output = [0u8; 4];
        let result = ctx.cipher(Some(&mut output), &[0u8; 8]);
        assert_eq!(result, Err(EngineError::BufferTooSmall(8, 4)));
    }

    #[test]
    fn test_encrypt_clears_aad_and_advances_nonce() {
        let mut ctx = gcm_init(CipherDirection::Encrypt);
        ctx.cipher(None, b"header").expect("Could not set AAD");

        let iv_before = ctx.iv().to_vec();
        let mut output = [0u8; 8];
        ctx.cipher(Some(&mut output), &[3u8; 8])
            .expect("Could not encrypt");
        assert!(ctx.aad.is_empty());
        assert_ne!(ctx.iv(), iv_before.as_slice());
    }

    #[test]
    fn test_decrypt_failure_clears_aad() {
        let mut ctx = gcm_init(CipherDirection::Decrypt);
        ctx.cipher(None, b"header").expect("Could not set AAD");
        ctx.ctrl(CipherCtrlOp::SetTag(
            Some(vec![0u8; AES_GCM_TAG_LEN]),
            AES_GCM_TAG_LEN as i32,
        ))
        .expect("Could not set tag");

        let mut output = [0u8; 8];
        let result = ctx.cipher(Some(&mut output), &[3u8; 8]);
        assert_eq!(result, Err(EngineError::AuthenticationFailure));
        assert!(ctx.aad.is_empty());
    }
}
