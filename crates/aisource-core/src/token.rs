//! Random analytics-identifier tokens.
//!
//! Tokens concatenate a random base-36 fragment with the current time in
//! base 36. Collision probability is acceptable for analytics identifiers;
//! these MUST NOT be used as authorization credentials.

use chrono::Utc;
use rand::Rng;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encode a non-negative integer in lowercase base 36.
pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// A random base-36 fragment of `len` characters.
pub fn base36_fragment(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..36)] as char)
        .collect()
}

/// Generate a visitor/session/insert token: random fragment + epoch-millis
/// in base 36.
pub fn generate_token() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    format!("{}{}", base36_fragment(11), to_base36(millis))
}
