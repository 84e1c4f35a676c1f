use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{Config, IvSetting};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the CBC IV (one AES block) in bytes.
pub const IV_SIZE: usize = 16;
/// The size of the HMAC-SHA256 integrity tag in bytes.
pub const TAG_SIZE: usize = 32;

const BLOCK_SIZE: usize = 16;
const MAC_KEY_LABEL: &[u8] = b"taskcrypt envelope mac v1";

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Failures of the cipher envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Serialization or cipher setup failed; no output was produced.
    #[error("Encryption failed: {0}")]
    Encryption(String),
    /// The envelope was empty, malformed, tampered with or sealed under another key.
    #[error("Decryption failed: {0}")]
    Decryption(String),
}

/// How the IV is chosen for each encryption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IvMode {
    /// Fresh random IV per call. Envelope = `iv || ciphertext || hmac`.
    PerMessage,
    /// Process-wide IV. Envelope = `ciphertext`, byte-compatible with the legacy scheme.
    Static([u8; IV_SIZE]),
}

/// Symmetric AES-256-CBC envelope over UTF-8 payloads, hex encoded.
///
/// Built once at startup and shared read-only between the token issuer, the
/// token authenticator and the transport codec.
#[derive(Clone)]
pub struct CipherEnvelope {
    key: Zeroizing<[u8; KEY_SIZE]>,
    mac_key: Zeroizing<[u8; KEY_SIZE]>,
    iv_mode: IvMode,
}

impl CipherEnvelope {
    /// Creates a new envelope from raw key material.
    pub fn new(key: &[u8; KEY_SIZE], iv_mode: IvMode) -> Result<Self, CipherError> {
        Ok(Self {
            key: Zeroizing::new(*key),
            mac_key: derive_mac_key(key)?,
            iv_mode,
        })
    }

    /// Creates the envelope described by the application configuration.
    pub fn from_config(config: &Config) -> Result<Self, CipherError> {
        let iv_mode = match &config.iv_setting {
            IvSetting::Random => IvMode::PerMessage,
            IvSetting::Static(iv) => IvMode::Static(**iv),
        };
        Self::new(&config.encryption_key, iv_mode)
    }

    /// Returns `true` when every call reuses the same IV.
    pub fn is_deterministic(&self) -> bool {
        matches!(self.iv_mode, IvMode::Static(_))
    }

    /// Encrypts a UTF-8 string and returns the hex-encoded envelope.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        match &self.iv_mode {
            IvMode::Static(iv) => {
                let ciphertext = self.seal(iv, plaintext.as_bytes())?;
                Ok(hex::encode(ciphertext))
            }
            IvMode::PerMessage => {
                let mut iv = [0u8; IV_SIZE];
                OsRng.fill_bytes(&mut iv);

                let ciphertext = self.seal(&iv, plaintext.as_bytes())?;

                let mut envelope = Vec::with_capacity(IV_SIZE + ciphertext.len() + TAG_SIZE);
                envelope.extend_from_slice(&iv);
                envelope.extend_from_slice(&ciphertext);
                let tag = self.tag(&envelope)?;
                envelope.extend_from_slice(&tag);

                Ok(hex::encode(envelope))
            }
        }
    }

    /// Serializes `value` to compact JSON and encrypts it.
    pub fn encrypt_json<T>(&self, value: &T) -> Result<String, CipherError>
    where
        T: Serialize + ?Sized,
    {
        let json = Zeroizing::new(
            sonic_rs::to_string(value)
                .map_err(|e| CipherError::Encryption(format!("serialization error: {}", e)))?,
        );
        self.encrypt(&json)
    }

    /// Decrypts a hex-encoded envelope back into its plaintext string.
    ///
    /// The plaintext is returned as-is; callers decide whether it is JSON.
    pub fn decrypt(&self, envelope_hex: &str) -> Result<String, CipherError> {
        if envelope_hex.is_empty() {
            return Err(CipherError::Decryption("empty input".to_string()));
        }

        let envelope = hex::decode(envelope_hex)
            .map_err(|e| CipherError::Decryption(format!("invalid hex: {}", e)))?;

        let plaintext = match &self.iv_mode {
            IvMode::Static(iv) => self.open(iv, &envelope)?,
            IvMode::PerMessage => {
                if envelope.len() < IV_SIZE + BLOCK_SIZE + TAG_SIZE {
                    return Err(CipherError::Decryption("envelope too short".to_string()));
                }
                let (sealed, tag) = envelope.split_at(envelope.len() - TAG_SIZE);
                self.verify_tag(sealed, tag)?;

                let (iv, ciphertext) = sealed.split_at(IV_SIZE);
                let iv: [u8; IV_SIZE] = iv
                    .try_into()
                    .map_err(|_| CipherError::Decryption("invalid IV length".to_string()))?;
                self.open(&iv, ciphertext)?
            }
        };

        String::from_utf8(plaintext)
            .map_err(|_| CipherError::Decryption("plaintext is not valid UTF-8".to_string()))
    }

    fn seal(&self, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let cipher = Aes256CbcEnc::new_from_slices(self.key.as_slice(), iv)
            .map_err(|e| CipherError::Encryption(format!("cipher init: {}", e)))?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn open(&self, iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::Decryption(
                "ciphertext is not a whole number of blocks".to_string(),
            ));
        }
        let cipher = Aes256CbcDec::new_from_slices(self.key.as_slice(), iv)
            .map_err(|e| CipherError::Decryption(format!("cipher init: {}", e)))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CipherError::Decryption("bad padding".to_string()))
    }

    fn tag(&self, data: &[u8]) -> Result<[u8; TAG_SIZE], CipherError> {
        let mut mac = HmacSha256::new_from_slice(self.mac_key.as_slice())
            .map_err(|e| CipherError::Encryption(format!("mac init: {}", e)))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().into())
    }

    fn verify_tag(&self, data: &[u8], tag: &[u8]) -> Result<(), CipherError> {
        let mut mac = HmacSha256::new_from_slice(self.mac_key.as_slice())
            .map_err(|e| CipherError::Decryption(format!("mac init: {}", e)))?;
        mac.update(data);
        mac.verify_slice(tag)
            .map_err(|_| CipherError::Decryption("integrity check failed".to_string()))
    }
}

/// Derives the HMAC key from the cipher key so the two are never the same bytes.
fn derive_mac_key(key: &[u8; KEY_SIZE]) -> Result<Zeroizing<[u8; KEY_SIZE]>, CipherError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| CipherError::Encryption(format!("mac key derivation: {}", e)))?;
    mac.update(MAC_KEY_LABEL);
    Ok(Zeroizing::new(mac.finalize().into_bytes().into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
        0x1e, 0x1f,
    ];
    const IV: [u8; IV_SIZE] = [
        0x0f, 0x0e, 0x0d, 0x0c, 0x0b, 0x0a, 0x09, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01,
        0x00,
    ];

    fn per_message() -> CipherEnvelope {
        CipherEnvelope::new(&KEY, IvMode::PerMessage).unwrap()
    }

    fn legacy() -> CipherEnvelope {
        CipherEnvelope::new(&KEY, IvMode::Static(IV)).unwrap()
    }

    /// Replaces the hex digit at `index` with a different one.
    fn flip_hex(envelope: &str, index: usize) -> String {
        let mut chars: Vec<char> = envelope.chars().collect();
        chars[index] = if chars[index] == '0' { '1' } else { '0' };
        chars.into_iter().collect()
    }

    #[test]
    fn round_trips_strings() {
        let cipher = per_message();
        let long = "x".repeat(4096);
        for plaintext in ["", "a", "exactly sixteen!", "héllo wörld ✓", long.as_str()] {
            let envelope = cipher.encrypt(plaintext).unwrap();
            assert_eq!(cipher.decrypt(&envelope).unwrap(), plaintext);
        }
    }

    #[test]
    fn round_trips_structured_values() {
        #[derive(Serialize)]
        struct Payload<'a> {
            success: bool,
            message: &'a str,
        }

        let cipher = per_message();
        let envelope = cipher
            .encrypt_json(&Payload { success: true, message: "ok" })
            .unwrap();
        assert_eq!(
            cipher.decrypt(&envelope).unwrap(),
            r#"{"success":true,"message":"ok"}"#
        );
    }

    #[test]
    fn per_message_iv_hides_repeated_plaintexts() {
        let cipher = per_message();
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
        assert!(!cipher.is_deterministic());
        // iv (16) + one block (16) + tag (32), hex encoded
        assert_eq!(a.len(), 2 * (IV_SIZE + 16 + TAG_SIZE));
    }

    #[test]
    fn legacy_mode_matches_known_vectors() {
        let cipher = legacy();
        assert!(cipher.is_deterministic());
        assert_eq!(
            cipher.encrypt("hello, sealed world").unwrap(),
            "8cd7c2b73bc1fef647b0d2a1c6cd8e2e8fd90da203feaf7d01f1079afb65629e"
        );
        assert_eq!(
            cipher
                .decrypt("52c7aa869c499975638db673202feadcb10b7c57e9f4374bbd3b91ada9d3e553")
                .unwrap(),
            r#"{"success":true}"#
        );
    }

    #[test]
    fn every_flipped_hex_digit_is_rejected() {
        let cipher = per_message();
        let envelope = cipher.encrypt(r#"{"title":"write tests"}"#).unwrap();
        for index in 0..envelope.len() {
            let tampered = flip_hex(&envelope, index);
            assert!(
                matches!(cipher.decrypt(&tampered), Err(CipherError::Decryption(_))),
                "tampered digit {} was accepted",
                index
            );
        }
    }

    #[test]
    fn rejects_malformed_input() {
        let cipher = per_message();
        let envelope = cipher.encrypt("payload").unwrap();

        for bad in [
            "",
            "not hex at all",
            &envelope[..envelope.len() - 1],
            &envelope[..envelope.len() - 2],
            &envelope[..64],
        ] {
            assert!(matches!(cipher.decrypt(bad), Err(CipherError::Decryption(_))));
        }
    }

    #[test]
    fn rejects_envelopes_from_another_key() {
        let other = CipherEnvelope::new(&[7u8; KEY_SIZE], IvMode::PerMessage).unwrap();
        let envelope = other.encrypt("secret").unwrap();
        assert!(per_message().decrypt(&envelope).is_err());

        let other_legacy = CipherEnvelope::new(&[7u8; KEY_SIZE], IvMode::Static(IV)).unwrap();
        let envelope = other_legacy.encrypt("secret").unwrap();
        assert_ne!(legacy().decrypt(&envelope).ok().as_deref(), Some("secret"));
    }

    #[test]
    fn legacy_mode_rejects_partial_blocks() {
        let cipher = legacy();
        let envelope = cipher.encrypt("hello, sealed world").unwrap();
        assert!(cipher.decrypt(&envelope[..envelope.len() - 2]).is_err());
        assert!(cipher.decrypt(&envelope[..30]).is_err());
    }
}
