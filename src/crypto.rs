use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Argon2, Params};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
/// Leading bytes of every sealed blob. Also bound into the AEAD tag.
const MAGIC: &[u8; 8] = b"FEMCARE1";
/// magic || memory_kib (u32 LE) || iterations (u32 LE)
const HEADER_LEN: usize = MAGIC.len() + 8;
/// Highest Argon2 cost accepted, four times the default. The header is only
/// authenticated after key derivation, so a corrupted cost must not reach it.
const MAX_MEMORY_KIB: u32 = 4 * 65536;
const MAX_ITERATIONS: u32 = 4 * 3;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("encryption failed")]
    Encryption,
    #[error("decryption failed: wrong passphrase or corrupted data")]
    Decryption,
    #[error("invalid data format")]
    InvalidFormat,
}

/// A user passphrase, wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase(..)")
    }
}

/// Argon2id cost parameters. Stored in each blob so old files stay readable
/// after the configured cost changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
        }
    }
}

impl KdfParams {
    fn to_header(self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[..MAGIC.len()].copy_from_slice(MAGIC);
        header[MAGIC.len()..MAGIC.len() + 4].copy_from_slice(&self.memory_kib.to_le_bytes());
        header[MAGIC.len() + 4..].copy_from_slice(&self.iterations.to_le_bytes());
        header
    }

    fn from_header(header: &[u8]) -> Result<Self, CryptoError> {
        if header.len() != HEADER_LEN || &header[..MAGIC.len()] != MAGIC {
            return Err(CryptoError::InvalidFormat);
        }
        let word = |at: usize| -> Result<u32, CryptoError> {
            header[at..at + 4]
                .try_into()
                .map(u32::from_le_bytes)
                .map_err(|_| CryptoError::InvalidFormat)
        };
        let params = Self {
            memory_kib: word(MAGIC.len())?,
            iterations: word(MAGIC.len() + 4)?,
        };
        if !params.within_limits() {
            return Err(CryptoError::InvalidFormat);
        }
        Ok(params)
    }

    fn within_limits(&self) -> bool {
        self.memory_kib <= MAX_MEMORY_KIB && self.iterations <= MAX_ITERATIONS
    }

    /// Derive a 256-bit key from a passphrase and salt using Argon2id.
    fn derive_key(&self, passphrase: &Passphrase, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
        let params = Params::new(self.memory_kib, self.iterations, 1, Some(KEY_LEN))
            .map_err(|_| CryptoError::KeyDerivation)?;
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let mut key = [0u8; KEY_LEN];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|_| CryptoError::KeyDerivation)?;
        Ok(key)
    }
}

/// Encrypt plaintext under a passphrase.
/// Output: header (16) || salt (32) || nonce (12) || ciphertext
pub fn seal(passphrase: &Passphrase, params: KdfParams, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if !params.within_limits() {
        return Err(CryptoError::KeyDerivation);
    }

    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let header = params.to_header();
    let mut key = params.derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Encryption);
    key.zeroize();

    let ciphertext = cipher?
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|_| CryptoError::Encryption)?;

    let mut output = Vec::with_capacity(HEADER_LEN + SALT_LEN + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&header);
    output.extend_from_slice(&salt);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt a blob produced by [`seal`].
pub fn open(passphrase: &Passphrase, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < HEADER_LEN + SALT_LEN + NONCE_LEN {
        return Err(CryptoError::InvalidFormat);
    }

    let (header, rest) = sealed.split_at(HEADER_LEN);
    let (salt, rest) = rest.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let params = KdfParams::from_header(header)?;
    let mut key = params.derive_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Decryption);
    key.zeroize();

    cipher?
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| CryptoError::Decryption)
}

/// True if the bytes carry the sealed-blob header.
pub fn is_sealed(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}
