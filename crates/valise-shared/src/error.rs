use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Invalid key length")]
    InvalidKeyLength,
}

#[derive(Error, Debug)]
pub enum IdentifierError {
    #[error("Invalid service id: {0}")]
    InvalidServiceId(String),

    #[error("Invalid E.164 phone number: {0}")]
    InvalidE164(String),
}
