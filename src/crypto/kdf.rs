use anyhow::{Context, Result};
use argon2::{Algorithm, Argon2, Params, Version};

use super::KEY_LEN;

/// Argon2 lane count. Not stored in the header; changing it would change
/// derived keys for existing containers.
const PARALLELISM: u32 = 1;

/// Cost parameters for key derivation, persisted in the container header
/// so they can be raised without breaking old containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    iterations: u32,
    memory_kib: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            // default number of passes
            iterations: 3,
            // default memory cost, 64 MiB
            memory_kib: 64 * 1024,
        }
    }
}

impl KdfParams {
    pub fn new(iterations: u32, memory_kib: u32) -> Result<Self> {
        let params = Self {
            iterations,
            memory_kib,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations < 1 {
            anyhow::bail!("argon2 iteration count must be >= 1");
        }
        if self.memory_kib < 8 * PARALLELISM {
            anyhow::bail!("argon2 memory cost must be at least 8 KiB per lane");
        }
        Ok(())
    }
}

/// Derives the 32-byte master key from a password and the header's salt and
/// cost parameters. Deterministic; a failure here is a misconfiguration,
/// never a retryable condition.
pub fn derive_key(password: &str, salt: &[u8], kdf: KdfParams) -> Result<[u8; KEY_LEN]> {
    kdf.validate().context("invalid Argon2 parameters")?;

    let params = Params::new(
        kdf.memory_kib,
        kdf.iterations,
        PARALLELISM,
        Some(KEY_LEN),
    )
    .map_err(|e| anyhow::anyhow!("failed to construct Argon2 params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| anyhow::anyhow!("argon2 key derivation failed {e}"))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SALT_LEN;

    fn fast_params() -> KdfParams {
        KdfParams::new(1, 8 * 1024).unwrap()
    }

    #[test]
    fn kdf_is_deterministic() {
        let salt = [42u8; SALT_LEN];
        let kdf = fast_params();

        let k1 = derive_key("password", &salt, kdf).unwrap();
        let k2 = derive_key("password", &salt, kdf).unwrap();

        assert_eq!(k1, k2);
    }

    #[test]
    fn kdf_password_affects_output() {
        let salt = [7u8; SALT_LEN];
        let kdf = fast_params();

        let k1 = derive_key("pw1", &salt, kdf).unwrap();
        let k2 = derive_key("pw2", &salt, kdf).unwrap();

        assert_ne!(k1, k2);
    }

    #[test]
    fn kdf_salt_affects_output() {
        let kdf = fast_params();

        let k1 = derive_key("pw", &[1u8; SALT_LEN], kdf).unwrap();
        let k2 = derive_key("pw", &[2u8; SALT_LEN], kdf).unwrap();

        assert_ne!(k1, k2);
    }

    #[test]
    fn kdf_params_affect_output() {
        let salt = [7u8; SALT_LEN];

        let kdf1 = KdfParams::new(1, 8 * 1024).unwrap();
        let kdf2 = KdfParams::new(2, 8 * 1024).unwrap();
        let kdf3 = KdfParams::new(1, 16 * 1024).unwrap();

        let k1 = derive_key("pw", &salt, kdf1).unwrap();
        let k2 = derive_key("pw", &salt, kdf2).unwrap();
        let k3 = derive_key("pw", &salt, kdf3).unwrap();

        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn kdf_invalid_params_fail_gracefully() {
        assert!(KdfParams::new(0, 8 * 1024).is_err());
        assert!(KdfParams::new(1, 4).is_err());
    }
}
