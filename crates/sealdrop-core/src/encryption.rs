//! Streaming file encryption (AES-256-CBC, PKCS#7)
//!
//! Artifact layout: `IV (16 bytes) || ciphertext`. The plaintext is read in
//! fixed-size chunks and ciphertext is written as it is produced, so memory use
//! does not grow with the file. Output goes to `{dst}.part` and is renamed into
//! place only after it has been synced; a failed run never leaves a file at
//! `dst`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::constants::{IV_LEN, KEY_LEN};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const BLOCK_LEN: usize = 16;
const CHUNK_SIZE: usize = 64 * 1024;
const PART_SUFFIX: &str = "part";

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("encryption key not configured")]
    KeyUnavailable,

    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
}

/// Process-wide file cipher. Cloning shares the key.
#[derive(Clone)]
pub struct StreamCipher {
    key: Option<Arc<[u8; KEY_LEN]>>,
}

impl std::fmt::Debug for StreamCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCipher")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl StreamCipher {
    /// Create a cipher from a raw 32-byte key.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, EncryptionError> {
        let key: [u8; KEY_LEN] = key_bytes.try_into().map_err(|_| {
            EncryptionError::InvalidKey(format!(
                "key must be {} bytes (256 bits), got {}",
                KEY_LEN,
                key_bytes.len()
            ))
        })?;
        Ok(Self {
            key: Some(Arc::new(key)),
        })
    }

    /// Parse an `ENCRYPTION_KEY` value: 64 hex characters or base64 of 32 bytes.
    pub fn from_encoded(encoded: &str) -> Result<Self, EncryptionError> {
        let encoded = encoded.trim();
        let bytes = if encoded.len() == KEY_LEN * 2 && encoded.chars().all(|c| c.is_ascii_hexdigit())
        {
            hex::decode(encoded).map_err(|e| EncryptionError::InvalidKey(e.to_string()))?
        } else {
            general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| EncryptionError::InvalidKey(format!("not hex or base64: {}", e)))?
        };
        Self::from_key_bytes(&bytes)
    }

    /// A cipher without a key. Every operation fails with `KeyUnavailable`.
    pub fn unconfigured() -> Self {
        Self { key: None }
    }

    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    fn key(&self) -> Result<&[u8; KEY_LEN], EncryptionError> {
        self.key.as_deref().ok_or(EncryptionError::KeyUnavailable)
    }

    /// Encrypt `src` into a new artifact at `dst`. Returns the artifact size in bytes.
    pub async fn encrypt_file(&self, src: &Path, dst: &Path) -> Result<u64, EncryptionError> {
        let key = self.key()?;
        let part = partial_path(dst);
        let started = std::time::Instant::now();

        let result = match encrypt_stream(key, src, &part).await {
            Ok(written) => commit(&part, dst).await.map(|_| written),
            Err(e) => Err(e),
        };

        match &result {
            Ok(written) => tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                bytes = written,
                duration_ms = started.elapsed().as_millis() as u64,
                "Encrypted file"
            ),
            Err(e) => {
                discard_partial(dst).await;
                tracing::warn!(src = %src.display(), error = %e, "Encryption failed");
            }
        }

        result
    }

    /// Decrypt the artifact at `src` into `dst`. Returns the plaintext size in bytes.
    pub async fn decrypt_file(&self, src: &Path, dst: &Path) -> Result<u64, EncryptionError> {
        let key = self.key()?;
        let part = partial_path(dst);

        let result = match decrypt_stream(key, src, &part).await {
            Ok(written) => commit(&part, dst).await.map(|_| written),
            Err(e) => Err(e),
        };

        if result.is_err() {
            discard_partial(dst).await;
        }
        result
    }
}

/// Path of the in-progress output for `dst`.
pub fn partial_path(dst: &Path) -> PathBuf {
    let mut name = dst.as_os_str().to_os_string();
    name.push(".");
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Remove the in-progress output for `dst`, if any.
pub async fn discard_partial(dst: &Path) {
    let part = partial_path(dst);
    match fs::remove_file(&part).await {
        Ok(()) => tracing::debug!(path = %part.display(), "Removed partial artifact"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %part.display(), error = %e, "Failed to remove partial artifact"),
    }
}

fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);
    iv
}

fn read_err(path: &Path) -> impl FnOnce(io::Error) -> EncryptionError + '_ {
    move |source| EncryptionError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn write_err(path: &Path) -> impl FnOnce(io::Error) -> EncryptionError + '_ {
    move |source| EncryptionError::Write {
        path: path.to_path_buf(),
        source,
    }
}

async fn commit(part: &Path, dst: &Path) -> Result<(), EncryptionError> {
    fs::rename(part, dst).await.map_err(write_err(dst))
}

async fn encrypt_stream(
    key: &[u8; KEY_LEN],
    src: &Path,
    part: &Path,
) -> Result<u64, EncryptionError> {
    let iv = random_iv();
    let mut cipher = Aes256CbcEnc::new_from_slices(key, &iv)
        .map_err(|e| EncryptionError::InvalidKey(e.to_string()))?;

    let mut reader = File::open(src).await.map_err(read_err(src))?;
    let mut writer = File::create(part).await.map_err(write_err(part))?;

    writer.write_all(&iv).await.map_err(write_err(part))?;
    let mut written = IV_LEN as u64;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE + BLOCK_LEN);

    loop {
        let n = reader.read(&mut buf).await.map_err(read_err(src))?;
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&buf[..n]);

        let full = pending.len() - pending.len() % BLOCK_LEN;
        if full == 0 {
            continue;
        }
        encrypt_blocks(&mut cipher, &mut pending[..full]);
        writer
            .write_all(&pending[..full])
            .await
            .map_err(write_err(part))?;
        written += full as u64;
        pending.drain(..full);
    }

    // PKCS#7: always pad, a full block when the input is block-aligned.
    let pad = BLOCK_LEN - pending.len();
    pending.resize(BLOCK_LEN, pad as u8);
    encrypt_blocks(&mut cipher, &mut pending);
    writer.write_all(&pending).await.map_err(write_err(part))?;
    written += BLOCK_LEN as u64;

    writer.flush().await.map_err(write_err(part))?;
    writer.sync_all().await.map_err(write_err(part))?;

    Ok(written)
}

async fn decrypt_stream(
    key: &[u8; KEY_LEN],
    src: &Path,
    part: &Path,
) -> Result<u64, EncryptionError> {
    let mut reader = File::open(src).await.map_err(read_err(src))?;

    let mut iv = [0u8; IV_LEN];
    if let Err(e) = reader.read_exact(&mut iv).await {
        return Err(if e.kind() == io::ErrorKind::UnexpectedEof {
            EncryptionError::InvalidArtifact("artifact is shorter than its IV".to_string())
        } else {
            read_err(src)(e)
        });
    }

    let mut cipher = Aes256CbcDec::new_from_slices(key, &iv)
        .map_err(|e| EncryptionError::InvalidKey(e.to_string()))?;
    let mut writer = File::create(part).await.map_err(write_err(part))?;
    let mut written = 0u64;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE + BLOCK_LEN);

    loop {
        let n = reader.read(&mut buf).await.map_err(read_err(src))?;
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&buf[..n]);

        // The last block carries the padding; hold it back until EOF.
        if pending.len() <= BLOCK_LEN {
            continue;
        }
        let ready = ((pending.len() - 1) / BLOCK_LEN) * BLOCK_LEN;
        decrypt_blocks(&mut cipher, &mut pending[..ready]);
        writer
            .write_all(&pending[..ready])
            .await
            .map_err(write_err(part))?;
        written += ready as u64;
        pending.drain(..ready);
    }

    if pending.len() != BLOCK_LEN {
        return Err(EncryptionError::InvalidArtifact(
            "ciphertext is not a whole number of blocks".to_string(),
        ));
    }

    decrypt_blocks(&mut cipher, &mut pending);
    let keep = strip_padding(&pending)?;
    writer
        .write_all(&pending[..keep])
        .await
        .map_err(write_err(part))?;
    written += keep as u64;

    writer.flush().await.map_err(write_err(part))?;
    writer.sync_all().await.map_err(write_err(part))?;

    Ok(written)
}

fn encrypt_blocks(cipher: &mut Aes256CbcEnc, data: &mut [u8]) {
    for block in data.chunks_exact_mut(BLOCK_LEN) {
        cipher.encrypt_block_mut(aes::Block::from_mut_slice(block));
    }
}

fn decrypt_blocks(cipher: &mut Aes256CbcDec, data: &mut [u8]) {
    for block in data.chunks_exact_mut(BLOCK_LEN) {
        cipher.decrypt_block_mut(aes::Block::from_mut_slice(block));
    }
}

/// Number of plaintext bytes in the final decrypted block.
fn strip_padding(block: &[u8]) -> Result<usize, EncryptionError> {
    let pad = block[BLOCK_LEN - 1] as usize;
    if pad == 0 || pad > BLOCK_LEN || block[BLOCK_LEN - pad..].iter().any(|&b| b as usize != pad) {
        return Err(EncryptionError::InvalidArtifact(
            "bad padding (wrong key or corrupted artifact)".to_string(),
        ));
    }
    Ok(BLOCK_LEN - pad)
}
