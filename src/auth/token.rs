//! Opaque session tokens.

use rand::RngCore;

use crate::audit::sha256_hex;

/// Random bytes per token
const TOKEN_BYTES: usize = 32;

/// Generate a fresh random token, hex-encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest stored in place of the token
pub fn hash_token(token: &str) -> String {
    sha256_hex(token)
}
