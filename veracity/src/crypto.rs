//! API key generation and hashing.
//!
//! Keys are `vk_` followed by 32 lowercase hex characters (16 random bytes).
//! Only the SHA-256 hash of the full key and a short display prefix are ever
//! persisted; the raw key is returned to the caller exactly once at issuance.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Literal scheme prefix carried by every issued key.
pub const API_KEY_SCHEME: &str = "vk_";

/// Display prefix length: scheme prefix + first 8 hex characters.
const DISPLAY_HEX_CHARS: usize = 8;

/// Generates a new API key: `vk_` + 32 lowercase hex chars (128 bits of entropy).
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    format!("{API_KEY_SCHEME}{}", hex::encode(bytes))
}

/// SHA-256 hash of the full raw key, hex-encoded. This is the only form the
/// secret is stored or looked up in.
pub fn hash_api_key(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(digest)
}

/// Non-secret display prefix shown to users for key identification,
/// e.g. `vk_1a2b3c4d`.
pub fn display_prefix(raw: &str) -> String {
    raw.chars().take(API_KEY_SCHEME.len() + DISPLAY_HEX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_expected_shape() {
        let key = generate_api_key();
        assert!(key.starts_with(API_KEY_SCHEME));
        assert_eq!(key.len(), API_KEY_SCHEME.len() + 32);
        assert!(key[API_KEY_SCHEME.len()..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn keys_are_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_stable_and_not_the_key() {
        let key = generate_api_key();
        assert_eq!(hash_api_key(&key), hash_api_key(&key));
        assert_ne!(hash_api_key(&key), key);
        assert_eq!(hash_api_key(&key).len(), 64);
    }

    #[test]
    fn display_prefix_is_scheme_plus_eight() {
        let prefix = display_prefix("vk_0123456789abcdef0123456789abcdef");
        assert_eq!(prefix, "vk_01234567");
    }
}
