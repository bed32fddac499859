//! Campaign invite codes: 8 chars from `A-Z0-9`, shown as `XXXX-XXXX`.

use rand::Rng;
use std::fmt;

pub const CODE_LENGTH: usize = 8;
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Fresh codes tried before giving up on a unique-violation streak.
pub const MAX_GENERATION_ATTEMPTS: usize = 5;

/// Canonical (unhyphenated, uppercase) invite code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InviteCode(String);

impl InviteCode {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..CODE_LENGTH)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect();
        InviteCode(code)
    }

    /// Accepts user input in either form, case-insensitive.
    pub fn parse(input: &str) -> Option<Self> {
        let code = normalize(input);
        is_canonical(&code).then_some(InviteCode(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display(&self.0))
    }
}

/// New code in display form.
pub fn generate() -> String {
    InviteCode::generate().to_string()
}

/// Trim, uppercase, and drop one separating hyphen.
pub fn normalize(input: &str) -> String {
    let upper = input.trim().to_ascii_uppercase();
    match upper.split_once('-') {
        Some((head, tail)) if !head.is_empty() && !tail.is_empty() && !tail.contains('-') => {
            format!("{head}{tail}")
        }
        _ => upper,
    }
}

pub fn validate(input: &str) -> bool {
    is_canonical(&normalize(input))
}

fn is_canonical(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| ALPHABET.contains(&b))
}

/// `ABCD1234` -> `ABCD-1234`; anything else is returned unchanged.
pub fn display(canonical: &str) -> String {
    if is_canonical(canonical) {
        format!("{}-{}", &canonical[..4], &canonical[4..])
    } else {
        canonical.to_owned()
    }
}
