//! Password-protected, authenticated file-encryption containers.
//!
//! A container file is a fixed 91-byte header followed by the encrypted
//! payload and a single 16-byte authentication tag:
//!
//! ```text
//! [header (91)] [ciphertext] [tag (16)]
//! ```
//!
//! The header carries everything needed to re-derive the key from a
//! password: per-container salt, Argon2 cost parameters, and the AEAD
//! nonce. Payloads are processed in bounded chunks, so file size never
//! dictates memory use.

mod container;
pub mod crypto;
mod error;
mod login;
mod storage;
mod wipe;

pub use crate::container::{
    CHUNK_SIZE, create_container, create_container_with_kdf, decrypt_file, encrypt_file,
    encrypt_file_with_kdf, open_container,
};
pub use crate::crypto::{CipherAlgo, ContainerHeader, KdfParams};
pub use crate::error::ContainerError;
pub use crate::login::{LoginOutcome, authenticate_or_register};
pub use crate::wipe::secure_delete;
