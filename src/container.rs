//! Container lifecycle operations.
//!
//! Each operation is self-contained: it derives its own key, owns its own
//! file handles, and shares no state with any other call. Failures are
//! single-attempt and are reported as [`ContainerError`] kinds; nothing
//! from the cryptographic layer leaks through raw.
//!
//! Concurrent processes operating on the same container path are not
//! synchronized; that is the caller's responsibility.

use crate::crypto::{
    self, CipherAlgo, ContainerHeader, KdfParams, StreamDecryptor, StreamEncryptor, KEY_LEN,
    TAG_LEN,
};
use crate::error::ContainerError;
use crate::storage::AtomicFile;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use zeroize::Zeroizing;

/// Payloads are processed in chunks of this size.
pub const CHUNK_SIZE: usize = 4096;

/// Length of the known-plaintext block probed by [`open_container`].
const PROBE_LEN: usize = 16;

/// Creates a container of exactly `size_in_bytes` zero bytes of plaintext
/// at `path`, encrypted under `password` with default KDF costs.
///
/// The resulting file is `91 + size_in_bytes + 16` bytes.
pub fn create_container(
    path: &Path,
    password: &str,
    size_in_bytes: u64,
) -> Result<(), ContainerError> {
    create_container_with_kdf(path, password, size_in_bytes, KdfParams::default())
}

pub fn create_container_with_kdf(
    path: &Path,
    password: &str,
    size_in_bytes: u64,
    kdf: KdfParams,
) -> Result<(), ContainerError> {
    let header = fresh_header(kdf)?;
    let key = derive_master_key(password, &header)?;

    let mut out = AtomicFile::create(path).map_err(io_failure)?;
    out.write_all(&header.to_bytes())?;

    let mut encryptor = StreamEncryptor::new(header.algo(), &key, header.nonce());
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut remaining = size_in_bytes;
    while remaining > 0 {
        let n = remaining.min(CHUNK_SIZE as u64) as usize;
        chunk[..n].fill(0);
        encryptor.update(&mut chunk[..n]);
        out.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    out.write_all(&encryptor.finalize())?;

    out.commit().map_err(io_failure)
}

/// Checks `password` against the container at `path` without decrypting the
/// body: the first cipher block is decrypted with the raw keystream and
/// compared to the all-zero plaintext written by [`create_container`].
///
/// Only meaningful for containers produced by [`create_container`]; a file
/// produced by [`encrypt_file`] holds arbitrary plaintext and is rejected
/// here regardless of the password.
pub fn open_container(path: &Path, password: &str) -> Result<(), ContainerError> {
    let mut file = open_input(path)?;
    let header = read_header(&mut file)?;
    let key = derive_master_key(password, &header)?;

    let mut probe = [0u8; PROBE_LEN];
    file.read_exact(&mut probe).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            ContainerError::Corrupted("container body shorter than one cipher block")
        }
        _ => ContainerError::Io(e),
    })?;

    crypto::aead::decrypt_unverified_prefix(header.algo(), &key, header.nonce(), &mut probe);

    if probe.iter().all(|&b| b == 0) {
        Ok(())
    } else {
        Err(ContainerError::Authentication)
    }
}

/// Encrypts an arbitrary file into the container format with default KDF
/// costs.
pub fn encrypt_file(input: &Path, output: &Path, password: &str) -> Result<(), ContainerError> {
    encrypt_file_with_kdf(input, output, password, KdfParams::default())
}

pub fn encrypt_file_with_kdf(
    input: &Path,
    output: &Path,
    password: &str,
    kdf: KdfParams,
) -> Result<(), ContainerError> {
    let mut reader = BufReader::new(open_input(input)?);

    let header = fresh_header(kdf)?;
    let key = derive_master_key(password, &header)?;

    let mut out = AtomicFile::create(output).map_err(io_failure)?;
    out.write_all(&header.to_bytes())?;

    let mut encryptor = StreamEncryptor::new(header.algo(), &key, header.nonce());
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        encryptor.update(&mut chunk[..n]);
        out.write_all(&chunk[..n])?;
    }
    out.write_all(&encryptor.finalize())?;

    out.commit().map_err(io_failure)
}

/// Decrypts a container file back to plaintext, verifying the trailing tag.
///
/// Plaintext is streamed into a temporary file while decrypting; the output
/// only appears at `output` after the tag verifies, so a wrong password or
/// a tampered container never leaves partial plaintext behind.
pub fn decrypt_file(input: &Path, output: &Path, password: &str) -> Result<(), ContainerError> {
    let mut reader = BufReader::new(open_input(input)?);
    let header = read_header(&mut reader)?;
    let key = derive_master_key(password, &header)?;

    let mut out = AtomicFile::create(output).map_err(io_failure)?;
    let mut decryptor = StreamDecryptor::new(header.algo(), &key, header.nonce());

    // the last TAG_LEN bytes of the stream are the tag, not ciphertext,
    // so that many bytes are always held back until end of input
    let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE + TAG_LEN);
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&chunk[..n]);
        if pending.len() > TAG_LEN {
            let take = pending.len() - TAG_LEN;
            let mut body: Vec<u8> = pending.drain(..take).collect();
            decryptor.update(&mut body);
            out.write_all(&body)?;
        }
    }

    if pending.len() < TAG_LEN {
        return Err(ContainerError::Corrupted(
            "ciphertext shorter than its authentication tag",
        ));
    }
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&pending);

    decryptor
        .verify(&tag)
        .map_err(|_| ContainerError::Authentication)?;

    out.commit().map_err(io_failure)
}

fn fresh_header(kdf: KdfParams) -> Result<ContainerHeader, ContainerError> {
    let salt = crypto::generate_salt().map_err(io_failure)?;
    let nonce = crypto::generate_nonce().map_err(io_failure)?;
    Ok(ContainerHeader::new(CipherAlgo::Aes256Gcm, kdf, salt, nonce))
}

fn derive_master_key(
    password: &str,
    header: &ContainerHeader,
) -> Result<Zeroizing<[u8; KEY_LEN]>, ContainerError> {
    crypto::derive_key(password, header.salt(), *header.kdf())
        .map(Zeroizing::new)
        .map_err(|_| ContainerError::InvalidFormat("invalid key derivation parameters"))
}

fn open_input(path: &Path) -> Result<File, ContainerError> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ContainerError::FileNotFound(path.to_path_buf()),
        _ => ContainerError::Io(e),
    })
}

fn read_header<R: Read>(reader: &mut R) -> Result<ContainerHeader, ContainerError> {
    let mut buf = [0u8; ContainerHeader::LEN];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ContainerError::InvalidFormat("file too short for header"),
        _ => ContainerError::Io(e),
    })?;
    ContainerHeader::from_bytes(&buf)
}

fn io_failure(err: anyhow::Error) -> ContainerError {
    ContainerError::Io(io::Error::other(err))
}
