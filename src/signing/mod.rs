use std::{
    fs,
    path::{Path, PathBuf},
};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

pub const KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;
pub const SECRET_KEY_FILE: &str = "sk.hex";
pub const PUBLIC_KEY_FILE: &str = "pk.hex";

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid hex key material: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("key must be 32 bytes, got {0}")]
    KeyLength(usize),
    #[error("signature must be 64 bytes, got {0}")]
    SignatureLength(usize),
    #[error("signature invalid: {0}")]
    Invalid(#[from] ed25519_dalek::SignatureError),
}

fn read(path: &Path) -> Result<Vec<u8>, SigningError> {
    fs::read(path).map_err(|source| SigningError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), SigningError> {
    let io_err = |source: std::io::Error| SigningError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, bytes).map_err(io_err)
}

fn parse_key_hex(text: &str) -> Result<[u8; KEY_LEN], SigningError> {
    let bytes = hex::decode(text.trim())?;
    <[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| SigningError::KeyLength(bytes.len()))
}

fn read_key_hex(path: &Path) -> Result<[u8; KEY_LEN], SigningError> {
    let raw = read(path)?;
    parse_key_hex(&String::from_utf8_lossy(&raw))
}

/// Fresh Ed25519 key from OS randomness.
pub fn generate_keypair() -> SigningKey {
    let mut sk_bytes = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut sk_bytes);
    SigningKey::from_bytes(&sk_bytes)
}

/// Generate a key and store it as `sk.hex` / `pk.hex` under `out_dir`.
pub fn write_keypair(out_dir: &Path) -> Result<SigningKey, SigningError> {
    let sk = generate_keypair();
    write(
        &out_dir.join(SECRET_KEY_FILE),
        hex::encode(sk.to_bytes()).as_bytes(),
    )?;
    write(
        &out_dir.join(PUBLIC_KEY_FILE),
        hex::encode(sk.verifying_key().as_bytes()).as_bytes(),
    )?;
    Ok(sk)
}

pub fn load_signing_key(path: &Path) -> Result<SigningKey, SigningError> {
    Ok(SigningKey::from_bytes(&read_key_hex(path)?))
}

pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey, SigningError> {
    Ok(VerifyingKey::from_bytes(&read_key_hex(path)?)?)
}

/// Short SHA-256 fingerprint of a public key for display.
pub fn fingerprint(key: &VerifyingKey) -> String {
    let digest: [u8; 32] = Sha256::digest(key.as_bytes()).into();
    hex::encode(&digest[..8])
}

pub fn sign(key: &SigningKey, payload: &[u8]) -> [u8; SIGNATURE_LEN] {
    key.sign(payload).to_bytes()
}

pub fn verify(key: &VerifyingKey, payload: &[u8], signature: &[u8]) -> Result<(), SigningError> {
    let signature = Signature::from_slice(signature)
        .map_err(|_| SigningError::SignatureLength(signature.len()))?;
    key.verify(payload, &signature)?;
    Ok(())
}

/// Default detached signature location: `<file>.sig`.
pub fn signature_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".sig");
    PathBuf::from(name)
}

/// Sign the contents of `path`, writing the raw signature next to it.
pub fn sign_file(path: &Path, key: &SigningKey) -> Result<PathBuf, SigningError> {
    let payload = read(path)?;
    let sig_path = signature_path(path);
    write(&sig_path, &sign(key, &payload))?;
    tracing::info!(file = %path.display(), sig = %sig_path.display(), "signed");
    Ok(sig_path)
}

pub fn verify_file(path: &Path, sig_path: &Path, key: &VerifyingKey) -> Result<(), SigningError> {
    let payload = read(path)?;
    let signature = read(sig_path)?;
    verify(key, &payload, &signature)
}
