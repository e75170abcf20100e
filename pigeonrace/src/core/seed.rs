use sha2::{Digest, Sha256};
use std::f64::consts::PI;

/// id_hash derives a platform independent 64 bit hash from an identifier and a domain tag.
pub fn id_hash(domain: &[u8], id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(id.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// phase maps an identifier onto an angle in [0, 2 * pi).
pub fn phase(domain: &[u8], id: &str) -> f64 {
    // top 53 bits -> exact fraction in [0, 1)
    ((id_hash(domain, id) >> 11) as f64 / (1u64 << 53) as f64) * 2.0 * PI
}
