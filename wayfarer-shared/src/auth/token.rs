/// Session token generation
///
/// Session tokens are the opaque bearer credentials presented on every
/// authenticated request. Each token carries 256 bits of OS randomness,
/// hex-encoded to 64 characters. Exactly one token is valid per account;
/// rotation simply overwrites the stored value, which makes a revocation
/// list unnecessary.
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes per token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generates a fresh session token: 32 bytes from the OS RNG, hex-encoded.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length_and_charset() {
        let token = generate_session_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
    }
}
