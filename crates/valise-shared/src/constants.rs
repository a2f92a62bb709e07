/// Application name
pub const APP_NAME: &str = "Valise";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Symmetric key size in bytes (XChaCha20-Poly1305 and keyed BLAKE3)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Keyed-BLAKE3 stream MAC size in bytes
pub const MAC_SIZE: usize = 32;

/// Profile key size in bytes
pub const PROFILE_KEY_SIZE: usize = 32;

/// Group master key size in bytes
pub const GROUP_MASTER_KEY_SIZE: usize = 32;

/// Sticker pack id size in bytes
pub const STICKER_PACK_ID_SIZE: usize = 16;

/// Sticker pack key size in bytes
pub const STICKER_PACK_KEY_SIZE: usize = 32;

/// Maximum size of a single archive frame payload (16 MiB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// How long a distribution-list deletion tombstone stays visible (30 days).
///
/// Measured against the archive's `backup_time_ms` anchor, never wall clock,
/// so imports of old archives are deterministic.
pub const TOMBSTONE_RETENTION_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Key derivation contexts (BLAKE3)
pub const KDF_CONTEXT_BACKUP_CIPHER: &str = "valise-backup-cipher-v1";
pub const KDF_CONTEXT_BACKUP_MAC: &str = "valise-backup-mac-v1";
