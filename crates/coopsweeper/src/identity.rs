//! Server-issued participant identities.

use coopsweeper_protocol::ParticipantId;
use rand::Rng;

/// Generates a fresh identity: 128 random bits as 32 lowercase hex
/// characters.
pub fn generate_identity() -> ParticipantId {
    let bytes: [u8; 16] = rand::rng().random();
    ParticipantId::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

/// Longest username kept, in characters.
pub const MAX_USERNAME_LEN: usize = 32;

const DEFAULT_USERNAME: &str = "anonymous";

/// Trims the client's chosen name and caps its length. Missing or blank
/// names become `anonymous`.
pub fn normalize_username(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name.chars().take(MAX_USERNAME_LEN).collect(),
        _ => DEFAULT_USERNAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_identity_is_32_hex_chars() {
        let id = generate_identity();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_identity_unique() {
        assert_ne!(generate_identity(), generate_identity());
    }

    #[test]
    fn test_normalize_username_trims() {
        assert_eq!(normalize_username(Some("  alice ")), "alice");
    }

    #[test]
    fn test_normalize_username_blank_is_anonymous() {
        assert_eq!(normalize_username(None), "anonymous");
        assert_eq!(normalize_username(Some("   ")), "anonymous");
    }

    #[test]
    fn test_normalize_username_caps_length() {
        let long = "é".repeat(40);
        assert_eq!(normalize_username(Some(&long)).chars().count(), MAX_USERNAME_LEN);
    }
}
