//! Archive cryptography: per-frame XChaCha20-Poly1305 sealing and a keyed
//! BLAKE3 running MAC over the encrypted byte stream.
//!
//! Key *management* is the caller's problem — this module consumes an
//! already-derived 32-byte backup key and derives the two subkeys (cipher,
//! MAC) with domain-separated BLAKE3 contexts.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::constants::{KDF_CONTEXT_BACKUP_CIPHER, KDF_CONTEXT_BACKUP_MAC, MAC_SIZE, NONCE_SIZE};
use crate::error::CryptoError;

pub type SymmetricKey = [u8; 32];

/// The externally-derived key for one encrypted archive.
#[derive(Clone)]
pub struct BackupKey(pub SymmetricKey);

impl BackupKey {
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Subkey used to seal individual frames.
    pub fn cipher_key(&self) -> SymmetricKey {
        derive_subkey(&self.0, KDF_CONTEXT_BACKUP_CIPHER)
    }

    /// Subkey for the keyed-BLAKE3 stream MAC.
    pub fn mac_key(&self) -> SymmetricKey {
        derive_subkey(&self.0, KDF_CONTEXT_BACKUP_MAC)
    }
}

impl std::fmt::Debug for BackupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BackupKey(..)")
    }
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

// Returns nonce || ciphertext (24 bytes nonce prepended)
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

pub fn decrypt(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

// BLAKE3 KDF with domain separation
fn derive_subkey(key: &SymmetricKey, context: &str) -> SymmetricKey {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(key);
    let hash = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash.as_bytes()[..32]);
    out
}

/// Incremental keyed-BLAKE3 MAC over an archive's byte stream.
pub struct StreamMac {
    hasher: blake3::Hasher,
}

impl StreamMac {
    pub fn new(mac_key: &SymmetricKey) -> Self {
        Self {
            hasher: blake3::Hasher::new_keyed(mac_key),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    pub fn finalize(self) -> [u8; MAC_SIZE] {
        *self.hasher.finalize().as_bytes()
    }

    /// Constant-time comparison against an expected MAC trailer.
    pub fn verify(self, expected: &[u8; MAC_SIZE]) -> bool {
        // blake3::Hash implements constant-time PartialEq
        self.hasher.finalize() == blake3::Hash::from(*expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = BackupKey::generate();
        let plaintext = b"the archive never lies";

        let encrypted = encrypt(&key.cipher_key(), plaintext).unwrap();
        let decrypted = decrypt(&key.cipher_key(), &encrypted).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = BackupKey::generate();
        let key2 = BackupKey::generate();

        let encrypted = encrypt(&key1.cipher_key(), b"secret frame").unwrap();
        assert!(decrypt(&key2.cipher_key(), &encrypted).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = BackupKey::generate();

        let mut encrypted = encrypt(&key.cipher_key(), b"frame payload").unwrap();
        let len = encrypted.len();
        encrypted[len - 1] ^= 0xFF;

        assert!(decrypt(&key.cipher_key(), &encrypted).is_err());
    }

    #[test]
    fn test_empty_data_fails() {
        let key = BackupKey::generate();
        assert!(decrypt(&key.cipher_key(), &[]).is_err());
    }

    #[test]
    fn test_cipher_and_mac_subkeys_differ() {
        let key = BackupKey::generate();
        assert_ne!(key.cipher_key(), key.mac_key());
    }

    #[test]
    fn test_stream_mac_detects_change() {
        let key = BackupKey::generate();

        let mut mac = StreamMac::new(&key.mac_key());
        mac.update(b"abc");
        mac.update(b"def");
        let tag = mac.finalize();

        let mut ok = StreamMac::new(&key.mac_key());
        ok.update(b"abcdef");
        assert!(ok.verify(&tag));

        let mut bad = StreamMac::new(&key.mac_key());
        bad.update(b"abcdeg");
        assert!(!bad.verify(&tag));
    }
}
