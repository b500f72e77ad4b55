//! Record ids, referral codes, and timestamps.

use rand::distributions::Alphanumeric;
use rand::Rng;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Length of a generated referral code.
pub const REFERRAL_CODE_LEN: usize = 7;

/// A fresh record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A random upper-case alphanumeric referral code. Uniqueness is the
/// caller's job: draw again while the code is taken.
pub fn referral_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERRAL_CODE_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_codes_are_upper_alphanumeric() {
        for _ in 0..50 {
            let code = referral_code();
            assert_eq!(code.len(), REFERRAL_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn ids_are_distinct() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn timestamps_parse_back() {
        let now = now_rfc3339();
        assert!(OffsetDateTime::parse(&now, &Rfc3339).is_ok(), "{now}");
    }
}
