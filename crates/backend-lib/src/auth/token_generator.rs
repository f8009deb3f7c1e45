// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Secret generation for single-use tokens and session handles.
Only the plaintext produced here ever leaves the server; the store keeps
its `SecretHash`. */
use rand::{rngs::OsRng, RngCore};

use crate::models::SecretHash;

/// 32 bytes = 256 bits of entropy
const SECRET_BYTES: usize = 32;

/// A freshly generated secret and the hash that gets persisted
#[derive(Debug)]
pub struct GeneratedSecret {
    pub plaintext: String,
    pub hash: SecretHash,
}

/** Generate a secret from OS entropy.
# Returns
The base64url (unpadded) plaintext together with its hash */
pub fn generate_secret() -> GeneratedSecret {
    let plaintext = generate_secure_token_with_size(SECRET_BYTES);
    let hash = SecretHash::of(&plaintext);
    GeneratedSecret { plaintext, hash }
}

/** Generate a random token of `bytes` bytes.
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
