//! Curator authentication.
//!
//! Salted, iterated SHA-256 password hashing with constant-time
//! verification, bearer-token extraction for the daemon, and the explicit
//! `AuthContext` that gates create/archive/restore.

use rand::{distr::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;

/// Iteration count for password hashing. High enough to make offline
/// guessing expensive for a single-admin deployment.
const HASH_ITERATIONS: u32 = 100_000;

const SALT_LENGTH: usize = 16;

/// Who is driving the current command. Built once at the boundary and passed
/// into every operation that needs gating; there is no ambient login state.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub username: Option<String>,
    pub admin: bool,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn admin(username: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            admin: true,
        }
    }

    /// Creation, archive and restore all require an admin context.
    pub fn can_curate(&self) -> bool {
        self.admin
    }
}

/// Resolve a username/password pair against the configured credentials.
///
/// With no password configured the store runs in open single-user mode and
/// every login is an admin.
pub fn login(auth: &AuthConfig, username: &str, password: &str) -> AuthContext {
    if !auth.has_password() {
        return AuthContext::admin(username);
    }

    if username == auth.username
        && verify_password(&auth.password_hash, &auth.password_salt, password)
    {
        AuthContext::admin(username)
    } else {
        AuthContext::anonymous()
    }
}

pub fn generate_salt() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash a password with its salt: SHA-256 over salt+password, then iterated
/// rehashing, hex-encoded.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();

    for _ in 1..HASH_ITERATIONS {
        digest = Sha256::digest(digest);
    }

    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Constant-time check of a candidate password against the stored hash.
pub fn verify_password(expected_hex: &str, salt: &str, candidate: &str) -> bool {
    let candidate_hex = hash_password(candidate, salt);
    constant_time_eq(candidate_hex.as_bytes(), expected_hex.as_bytes())
}

/// Validates a provided daemon token against the expected token using
/// constant-time comparison. Empty tokens are never valid.
pub fn validate_token(provided: &str, expected: &str) -> bool {
    if provided.is_empty() || expected.is_empty() {
        return false;
    }

    constant_time_eq(provided.as_bytes(), expected.as_bytes())
}

/// Extracts the bearer token from an Authorization header value.
///
/// Expected format: "Bearer <token>"
/// Returns `None` if the header doesn't match the expected format.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();

    // Case-insensitive "Bearer " prefix check (RFC 6750 allows case-insensitive)
    if header.len() < 7 {
        return None;
    }

    let (prefix, token) = header.split_at(7);
    if prefix.eq_ignore_ascii_case("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    } else {
        None
    }
}

fn constant_time_eq(provided: &[u8], expected: &[u8]) -> bool {
    // Length mismatch - still compare to maintain constant time
    let len_match = provided.len() == expected.len();

    // XOR accumulator: if any byte differs, result will be non-zero
    let mut diff: u8 = 0;
    for (a, b) in provided.iter().zip(expected.iter()) {
        diff |= a ^ b;
    }

    len_match && diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_round_trip() {
        let salt = generate_salt();
        let hash = hash_password("s3cret", &salt);

        assert!(verify_password(&hash, &salt, "s3cret"));
        assert!(!verify_password(&hash, &salt, "s3cret "));
        assert!(!verify_password(&hash, &salt, "guess"));
    }

    #[test]
    fn test_hash_is_deterministic_per_salt() {
        assert_eq!(hash_password("pw", "salt-a"), hash_password("pw", "salt-a"));
        assert_ne!(hash_password("pw", "salt-a"), hash_password("pw", "salt-b"));
    }

    #[test]
    fn test_generate_salt_length_and_uniqueness() {
        let a = generate_salt();
        let b = generate_salt();
        assert_eq!(a.len(), SALT_LENGTH);
        assert_ne!(a, b);
    }

    #[test]
    fn test_login_open_mode_grants_admin() {
        let auth = AuthConfig::default();
        let ctx = login(&auth, "anyone", "");
        assert!(ctx.can_curate());
    }

    #[test]
    fn test_login_with_configured_password() {
        let salt = generate_salt();
        let auth = AuthConfig {
            username: "curator".to_string(),
            password_hash: hash_password("letmein", &salt),
            password_salt: salt,
            api_token: None,
        };

        assert!(login(&auth, "curator", "letmein").can_curate());
        assert!(!login(&auth, "curator", "wrong").can_curate());
        assert!(!login(&auth, "intruder", "letmein").can_curate());
    }

    #[test]
    fn test_validate_token() {
        assert!(validate_token("secret123", "secret123"));
        assert!(!validate_token("secret123", "secret124"));
        assert!(!validate_token("short", "longer"));
        assert!(!validate_token("", ""));
        assert!(!validate_token("", "secret"));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer secret123"), Some("secret123"));
        assert_eq!(extract_bearer_token("bearer secret123"), Some("secret123"));
        assert_eq!(extract_bearer_token("  Bearer abc  "), Some("abc"));
        assert_eq!(extract_bearer_token("Basic secret123"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token(""), None);
    }
}
