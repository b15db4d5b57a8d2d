//! Guest access codes
//!
//! An access code is 8 symbols from `[A-Z0-9]`, drawn from the operating
//! system RNG (about 41 bits). The generator does not guarantee uniqueness;
//! the guest store's unique index does, and callers retry on conflict
//! (see `services::guests::create_guest`).

use rand::{rngs::OsRng, Rng};

/// Number of symbols in an access code
pub const ACCESS_CODE_LEN: usize = 8;

/// Uppercase letters followed by digits
pub const ACCESS_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a new access code
pub fn generate_access_code() -> String {
    generate_with(&mut OsRng)
}

fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    // gen_range is unbiased over the 36-symbol range
    (0..ACCESS_CODE_LEN)
        .map(|_| ACCESS_CODE_ALPHABET[rng.gen_range(0..ACCESS_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form of user-supplied code input: trimmed and uppercased
pub fn normalize_access_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

/// Whether `code` is already in canonical access code form
pub fn is_valid_access_code(code: &str) -> bool {
    code.len() == ACCESS_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Short form safe for logs
pub fn mask_access_code(code: &str) -> String {
    let visible: String = code.chars().take(2).collect();
    format!("{visible}******")
}
