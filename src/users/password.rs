use sha2::{Digest, Sha256};

/// Salted password digest: hex-encoded SHA-256 over `password:salt`. The
/// salt is application-wide and comes from configuration, so the same
/// credentials always map to the same hash and login can match on the
/// stored column directly.
pub fn hash(plain: &str, salt: &str) -> String {
    hex::encode(Sha256::digest(format!("{plain}:{salt}")))
}
