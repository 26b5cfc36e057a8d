mod api_ext;
mod jwt;

pub use self::{
    api_ext::SecurityApiExt,
    jwt::{issue_token, verify_token},
};

use hex::ToHex;
use sha2::{Digest, Sha256};

/// Computes the opaque password hash stored for a user. The storage engine
/// never interprets this value, it only compares it for equality.
pub fn compute_password_hash(password: &str) -> String {
    Sha256::digest(password.as_bytes()).encode_hex()
}
