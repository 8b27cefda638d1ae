//! Activation token codec
//!
//! Tokens grant subscription months to a manager and travel out-of-band
//! (printed cards, chat messages), so the layout is fixed-width text:
//!
//! ```text
//! VCHR-<8 hex of manager id>-<2-digit months>-<8 hex random>
//! ```
//!
//! All hex is upper-case. Parsing checks the layout and nothing else: the
//! manager-id prefix is not a credential, and redeeming a token must
//! separately verify that the named manager exists and that the caller is
//! authorized. Format validity is not authorization.

use rand::RngCore;
use thiserror::Error;
use uuid::Uuid;

pub const TOKEN_PREFIX: &str = "VCHR";

/// Inclusive bounds for the months field (two decimal digits on the wire).
pub const MIN_MONTHS: i32 = 1;
pub const MAX_MONTHS: i32 = 99;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token format")]
    InvalidFormat,

    #[error("Token months out of range: {0} (expected {MIN_MONTHS}..={MAX_MONTHS})")]
    MonthsOutOfRange(i32),
}

/// Decoded token fields. The manager prefix is the first 8 hex characters of
/// the manager's id, upper-cased; the nonce only serves to make tokens
/// distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationToken {
    pub manager_prefix: String,
    pub months: i32,
    pub nonce: String,
}

/// Generate a fresh activation token for the given manager and month count.
pub fn generate(manager_id: Uuid, months: i32) -> Result<String, TokenError> {
    if !(MIN_MONTHS..=MAX_MONTHS).contains(&months) {
        return Err(TokenError::MonthsOutOfRange(months));
    }

    let id_hex = manager_id.simple().to_string();
    let prefix = id_hex[..8].to_uppercase();

    let mut nonce_bytes = [0u8; 4];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = hex::encode_upper(nonce_bytes);

    Ok(format!("{TOKEN_PREFIX}-{prefix}-{months:02}-{nonce}"))
}

/// Parse a token string, accepting only the exact fixed-width layout.
pub fn parse(token: &str) -> Result<ActivationToken, TokenError> {
    let parts: Vec<&str> = token.split('-').collect();
    if parts.len() != 4 || parts[0] != TOKEN_PREFIX {
        return Err(TokenError::InvalidFormat);
    }

    let manager_prefix = parts[1];
    let months_str = parts[2];
    let nonce = parts[3];

    if !is_upper_hex(manager_prefix, 8) || !is_upper_hex(nonce, 8) {
        return Err(TokenError::InvalidFormat);
    }
    if months_str.len() != 2 || !months_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TokenError::InvalidFormat);
    }

    let months: i32 = months_str
        .parse()
        .map_err(|_| TokenError::InvalidFormat)?;
    if !(MIN_MONTHS..=MAX_MONTHS).contains(&months) {
        return Err(TokenError::MonthsOutOfRange(months));
    }

    Ok(ActivationToken {
        manager_prefix: manager_prefix.to_string(),
        months,
        nonce: nonce.to_string(),
    })
}

fn is_upper_hex(s: &str, len: usize) -> bool {
    s.len() == len
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_recovers_months_and_prefix() {
        let manager_id = Uuid::new_v4();
        let token = generate(manager_id, 3).unwrap();
        let decoded = parse(&token).unwrap();

        assert_eq!(decoded.months, 3);
        assert_eq!(
            decoded.manager_prefix,
            manager_id.simple().to_string()[..8].to_uppercase()
        );
    }

    #[test]
    fn test_generated_token_layout() {
        let token = generate(Uuid::new_v4(), 12).unwrap();
        let parts: Vec<&str> = token.split('-').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "VCHR");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2], "12");
        assert_eq!(parts[3].len(), 8);
        assert_eq!(token, token.to_uppercase());
    }

    #[test]
    fn test_generate_rejects_out_of_range_months() {
        let id = Uuid::new_v4();
        assert_eq!(generate(id, 0), Err(TokenError::MonthsOutOfRange(0)));
        assert_eq!(generate(id, -2), Err(TokenError::MonthsOutOfRange(-2)));
        assert_eq!(generate(id, 100), Err(TokenError::MonthsOutOfRange(100)));
    }

    #[test]
    fn test_parse_rejects_malformed_tokens() {
        let bad = [
            "",
            "VCHR",
            "VCHR-12345678-01",                  // missing nonce
            "OTHER-12345678-01-ABCDEF01",        // wrong prefix
            "VCHR-1234567-01-ABCDEF01",          // short id prefix
            "VCHR-12345678-1-ABCDEF01",          // one-digit months
            "VCHR-12345678-1x-ABCDEF01",         // non-digit months
            "VCHR-12345678-01-ABCDEF0",          // short nonce
            "VCHR-1234567G-01-ABCDEF01",         // non-hex id prefix
            "VCHR-abcdef01-01-ABCDEF01",         // lower-case hex
            "VCHR-12345678-01-ABCDEF01-EXTRA",   // trailing segment
        ];
        for token in bad {
            assert_eq!(parse(token), Err(TokenError::InvalidFormat), "{token}");
        }
    }

    #[test]
    fn test_parse_rejects_zero_months() {
        assert_eq!(
            parse("VCHR-12345678-00-ABCDEF01"),
            Err(TokenError::MonthsOutOfRange(0))
        );
    }

    #[test]
    fn test_tokens_for_same_manager_differ() {
        let id = Uuid::new_v4();
        let a = generate(id, 1).unwrap();
        let b = generate(id, 1).unwrap();
        assert_ne!(a, b);
    }
}
