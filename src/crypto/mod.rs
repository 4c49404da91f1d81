//! Cryptographic building blocks for the container format.
//!
//! Provides the header codec, key derivation, and the authenticated
//! cipher adapter (one-shot and streaming).

pub mod aead;
pub mod header;
pub mod kdf;

pub use aead::{CipherAlgo, StreamDecryptor, StreamEncryptor, generate_nonce, generate_salt};
pub use header::ContainerHeader;
pub use kdf::{KdfParams, derive_key};

/// Length of the KDF salt (32 bytes).
pub const SALT_LEN: usize = 32;
/// Length of the AEAD nonce (12 bytes for AES-256-GCM / ChaCha20-Poly1305).
pub const NONCE_LEN: usize = 12;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the authentication tag (16 bytes).
pub const TAG_LEN: usize = 16;
/// Length of the magic bytes (4 bytes "SFM\0").
pub const MAGIC_LEN: usize = 4;
/// Length of the version field (2 bytes).
pub const VER_LEN: usize = 2;
/// Length of the cipher algorithm field (1 byte).
pub const ALGO_LEN: usize = 1;
/// Length of the KDF iteration count field (4 bytes).
pub const ITER_LEN: usize = 4;
/// Length of the KDF memory cost field (4 bytes).
pub const MEM_LEN: usize = 4;
/// Length of the reserved header checksum field (32 bytes).
pub const CHECKSUM_LEN: usize = 32;
