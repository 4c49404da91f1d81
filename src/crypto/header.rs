use super::aead::CipherAlgo;
use super::kdf::KdfParams;
use super::{ALGO_LEN, CHECKSUM_LEN, ITER_LEN, MAGIC_LEN, MEM_LEN, NONCE_LEN, SALT_LEN, VER_LEN};
use crate::error::ContainerError;

pub const VERSION_V1: u16 = 1;
/// Three ASCII bytes and a terminating zero.
pub const MAGIC: &[u8; MAGIC_LEN] = b"SFM\0";

/// Fixed-layout container header preceding the ciphertext.
///
/// Layout, all integers little-endian, no padding:
///
/// ```text
/// MAGIC (4) | VERSION (2) | ALGO (1) | SALT (32) | ITERATIONS (4) |
/// MEMORY_KIB (4) | NONCE (12) | CHECKSUM (32, reserved)
/// ```
#[derive(Debug)]
pub struct ContainerHeader {
    version: u16,
    algo: CipherAlgo,
    salt: [u8; SALT_LEN],
    kdf: KdfParams,
    nonce: [u8; NONCE_LEN],
    checksum: [u8; CHECKSUM_LEN],
}

impl ContainerHeader {
    pub const LEN: usize =
        MAGIC_LEN + VER_LEN + ALGO_LEN + SALT_LEN + ITER_LEN + MEM_LEN + NONCE_LEN + CHECKSUM_LEN;

    pub fn new(
        algo: CipherAlgo,
        kdf: KdfParams,
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
    ) -> Self {
        Self {
            version: VERSION_V1,
            algo,
            salt,
            kdf,
            nonce,
            // integrity field, not yet populated or verified
            checksum: [0u8; CHECKSUM_LEN],
        }
    }

    pub fn algo(&self) -> CipherAlgo {
        self.algo
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);

        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.push(self.algo.as_u8());
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&self.kdf.iterations().to_le_bytes());
        buf.extend_from_slice(&self.kdf.memory_kib().to_le_bytes());
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.checksum);

        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ContainerError> {
        if data.len() < Self::LEN {
            return Err(ContainerError::InvalidFormat("file too short for header"));
        }

        if &data[..MAGIC_LEN] != MAGIC {
            return Err(ContainerError::InvalidFormat("bad magic"));
        }

        let mut offset = MAGIC_LEN;

        let version = u16::from_le_bytes([data[offset], data[offset + 1]]);
        if version != VERSION_V1 {
            return Err(ContainerError::InvalidFormat("unsupported version"));
        }
        offset += VER_LEN;

        let algo = CipherAlgo::from_u8(data[offset])
            .ok_or(ContainerError::InvalidFormat("unknown cipher algorithm"))?;
        offset += ALGO_LEN;

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&data[offset..offset + SALT_LEN]);
        offset += SALT_LEN;

        let mut word = [0u8; ITER_LEN];
        word.copy_from_slice(&data[offset..offset + ITER_LEN]);
        let iterations = u32::from_le_bytes(word);
        offset += ITER_LEN;

        word.copy_from_slice(&data[offset..offset + MEM_LEN]);
        let memory_kib = u32::from_le_bytes(word);
        offset += MEM_LEN;

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&data[offset..offset + NONCE_LEN]);
        offset += NONCE_LEN;

        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&data[offset..offset + CHECKSUM_LEN]);

        let kdf = KdfParams::new(iterations, memory_kib)
            .map_err(|_| ContainerError::InvalidFormat("invalid key derivation parameters"))?;

        Ok(Self {
            version,
            algo,
            salt,
            kdf,
            nonce,
            checksum,
        })
    }
}
