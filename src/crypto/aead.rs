use aes::Aes256;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher};
use aes_gcm::{Aes256Gcm, Nonce, aead::Aead};
use anyhow::{Result, anyhow};
use chacha20::ChaCha20;
use getrandom::fill;
use ghash::GHash;
use ghash::universal_hash::UniversalHash;
use poly1305::Poly1305;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::{KEY_LEN, NONCE_LEN, SALT_LEN, TAG_LEN};

/// Cipher block and MAC block size shared by both suites.
const BLOCK_LEN: usize = 16;

type Ctr32 = ctr::Ctr32BE<Aes256>;

/// Cipher suite identifier as stored in the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgo {
    Aes256Gcm = 1,
    ChaCha20Poly1305 = 2,
}

impl CipherAlgo {
    pub fn from_u8(id: u8) -> Option<Self> {
        match id {
            1 => Some(CipherAlgo::Aes256Gcm),
            2 => Some(CipherAlgo::ChaCha20Poly1305),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| anyhow!("OS random generator unavailable"))
}

/// Generate a fresh per-container salt
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate a fresh nonce. Must never be reused with the same key.
pub fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;
    Ok(nonce)
}

/// Encrypt plaintext in one shot, returning ciphertext with the tag appended
pub fn encrypt(
    algo: CipherAlgo,
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let result = match algo {
        CipherAlgo::Aes256Gcm => {
            let cipher = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key));
            cipher.encrypt(Nonce::from_slice(nonce), plaintext)
        }
        CipherAlgo::ChaCha20Poly1305 => {
            let cipher =
                chacha20poly1305::ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key));
            cipher.encrypt(chacha20poly1305::Nonce::from_slice(nonce), plaintext)
        }
    };
    result.map_err(|_| anyhow!("encryption failed"))
}

/// Decrypt ciphertext in one shot, verifying the tag before releasing
/// any plaintext
pub fn decrypt(
    algo: CipherAlgo,
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let result = match algo {
        CipherAlgo::Aes256Gcm => {
            let cipher = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key));
            cipher.decrypt(Nonce::from_slice(nonce), ciphertext)
        }
        CipherAlgo::ChaCha20Poly1305 => {
            let cipher =
                chacha20poly1305::ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key));
            cipher.decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext)
        }
    };
    result
        .map(Zeroizing::new)
        .map_err(|_| anyhow!("authentication tag mismatch"))
}

/// Decrypts only the leading bytes of a payload using the raw keystream.
///
/// The tag is not examined, so the output must never be treated as
/// authenticated data. This exists for probing a key against known
/// plaintext without reading the whole payload.
pub fn decrypt_unverified_prefix(
    algo: CipherAlgo,
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    buf: &mut [u8],
) {
    let mut state = StreamState::init(algo, key, nonce);
    state.apply_keystream(buf);
}

/// Keystream plus authenticator state for one payload.
enum StreamState {
    Gcm {
        ctr: Ctr32,
        ghash: GHash,
        tag_mask: [u8; BLOCK_LEN],
    },
    ChaCha {
        cipher: ChaCha20,
        mac: Poly1305,
    },
}

impl StreamState {
    fn init(algo: CipherAlgo, key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Self {
        match algo {
            CipherAlgo::Aes256Gcm => {
                let block_cipher = Aes256::new(GenericArray::from_slice(key));

                let mut subkey = [0u8; BLOCK_LEN];
                block_cipher.encrypt_block(GenericArray::from_mut_slice(&mut subkey));

                // J0 = nonce || 0^31 || 1. The payload keystream starts one
                // counter step past J0; E(K, J0) itself masks the tag.
                let mut j0 = [0u8; BLOCK_LEN];
                j0[..NONCE_LEN].copy_from_slice(nonce);
                j0[BLOCK_LEN - 1] = 1;

                let mut tag_mask = j0;
                block_cipher.encrypt_block(GenericArray::from_mut_slice(&mut tag_mask));

                let mut ctr0 = j0;
                ctr0[NONCE_LEN..].copy_from_slice(&2u32.to_be_bytes());
                let ctr = Ctr32::new(
                    GenericArray::from_slice(key),
                    GenericArray::from_slice(&ctr0),
                );

                let ghash = GHash::new(ghash::Key::from_slice(&subkey));
                StreamState::Gcm {
                    ctr,
                    ghash,
                    tag_mask,
                }
            }
            CipherAlgo::ChaCha20Poly1305 => {
                let mut cipher = ChaCha20::new(
                    chacha20::Key::from_slice(key),
                    chacha20::Nonce::from_slice(nonce),
                );

                // the first keystream block keys the authenticator; the
                // payload keystream begins at block one
                let mut mac_key = Zeroizing::new([0u8; 64]);
                cipher.apply_keystream(&mut mac_key[..]);
                let mac = Poly1305::new(poly1305::Key::from_slice(&mac_key[..32]));

                StreamState::ChaCha { cipher, mac }
            }
        }
    }

    fn apply_keystream(&mut self, buf: &mut [u8]) {
        match self {
            StreamState::Gcm { ctr, .. } => ctr.apply_keystream(buf),
            StreamState::ChaCha { cipher, .. } => cipher.apply_keystream(buf),
        }
    }

    /// Absorbs exactly one 16-byte ciphertext block into the authenticator.
    fn mac_block(&mut self, block: &[u8]) {
        let block = GenericArray::clone_from_slice(block);
        match self {
            StreamState::Gcm { ghash, .. } => ghash.update(&[block]),
            StreamState::ChaCha { mac, .. } => mac.update(&[block]),
        }
    }

    fn finalize(self, ct_len: u64) -> [u8; TAG_LEN] {
        match self {
            StreamState::Gcm {
                mut ghash,
                tag_mask,
                ..
            } => {
                // length block: AAD bits (zero), then ciphertext bits, big-endian
                let mut lens = [0u8; BLOCK_LEN];
                lens[8..].copy_from_slice(&(ct_len * 8).to_be_bytes());
                ghash.update(&[GenericArray::clone_from_slice(&lens)]);

                let digest = ghash.finalize();
                let mut tag = [0u8; TAG_LEN];
                for (i, byte) in digest.iter().enumerate() {
                    tag[i] = byte ^ tag_mask[i];
                }
                tag
            }
            StreamState::ChaCha { mut mac, .. } => {
                // length block: AAD bytes (zero), then ciphertext bytes, little-endian
                let mut lens = [0u8; BLOCK_LEN];
                lens[8..].copy_from_slice(&ct_len.to_le_bytes());
                mac.update(&[GenericArray::clone_from_slice(&lens)]);
                mac.finalize().into()
            }
        }
    }
}

/// Shared chunking layer: buffers partial MAC blocks so callers may feed
/// chunks of any size.
struct AeadStream {
    state: StreamState,
    pending: [u8; BLOCK_LEN],
    pending_len: usize,
    ct_len: u64,
}

impl AeadStream {
    fn new(algo: CipherAlgo, key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Self {
        Self {
            state: StreamState::init(algo, key, nonce),
            pending: [0u8; BLOCK_LEN],
            pending_len: 0,
            ct_len: 0,
        }
    }

    fn absorb_ct(&mut self, data: &[u8]) {
        self.ct_len += data.len() as u64;

        let mut data = data;
        if self.pending_len > 0 {
            let take = (BLOCK_LEN - self.pending_len).min(data.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&data[..take]);
            self.pending_len += take;
            data = &data[take..];

            if self.pending_len < BLOCK_LEN {
                return;
            }
            let block = self.pending;
            self.state.mac_block(&block);
            self.pending_len = 0;
        }

        let full = data.len() - data.len() % BLOCK_LEN;
        for block in data[..full].chunks_exact(BLOCK_LEN) {
            self.state.mac_block(block);
        }

        let tail = &data[full..];
        self.pending[..tail.len()].copy_from_slice(tail);
        self.pending_len = tail.len();
    }

    fn finish_tag(mut self) -> [u8; TAG_LEN] {
        if self.pending_len > 0 {
            // the final partial block is zero-padded before authentication
            let mut block = [0u8; BLOCK_LEN];
            block[..self.pending_len].copy_from_slice(&self.pending[..self.pending_len]);
            self.state.mac_block(&block);
        }
        self.state.finalize(self.ct_len)
    }
}

/// Incremental encryption of a single payload with one trailing tag.
///
/// Chunks may be any size; the concatenated output followed by
/// [`finalize`](Self::finalize) is byte-identical to [`encrypt`] over the
/// whole plaintext.
pub struct StreamEncryptor {
    stream: AeadStream,
}

impl StreamEncryptor {
    pub fn new(algo: CipherAlgo, key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Self {
        Self {
            stream: AeadStream::new(algo, key, nonce),
        }
    }

    /// Encrypts a chunk in place.
    pub fn update(&mut self, chunk: &mut [u8]) {
        self.stream.state.apply_keystream(chunk);
        self.stream.absorb_ct(chunk);
    }

    /// Consumes the encryptor and returns the authentication tag.
    pub fn finalize(self) -> [u8; TAG_LEN] {
        self.stream.finish_tag()
    }
}

/// Incremental decryption of a single payload.
///
/// Decrypted chunks are unauthenticated until [`verify`](Self::verify)
/// succeeds; callers must discard any output written before a failure.
pub struct StreamDecryptor {
    stream: AeadStream,
}

impl StreamDecryptor {
    pub fn new(algo: CipherAlgo, key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Self {
        Self {
            stream: AeadStream::new(algo, key, nonce),
        }
    }

    /// Decrypts a chunk in place.
    pub fn update(&mut self, chunk: &mut [u8]) {
        self.stream.absorb_ct(chunk);
        self.stream.state.apply_keystream(chunk);
    }

    /// Consumes the decryptor, checking the expected tag in constant time.
    pub fn verify(self, tag: &[u8; TAG_LEN]) -> Result<()> {
        let computed = self.stream.finish_tag();
        if bool::from(computed[..].ct_eq(&tag[..])) {
            Ok(())
        } else {
            Err(anyhow!("authentication tag mismatch"))
        }
    }
}
