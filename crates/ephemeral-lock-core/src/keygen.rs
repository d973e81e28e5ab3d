//! Random key generation.
//!
//! Keys are drawn from an alphabet without visually ambiguous characters
//! (`0/O`, `1/l/I`), so they survive being read aloud or copied by hand.
//! The same keys serve as entity ids and as lock acquisition tokens.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{LockError, LockResult};

/// Characters used by [`Alphabet::default`].
pub const DEFAULT_ALPHABET: &str = "23456789abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";

/// Length of a short key.
pub const SHORT_KEY_LENGTH: usize = 11;

/// Length of a medium key.
pub const MEDIUM_KEY_LENGTH: usize = 22;

/// Length of a long key.
pub const LONG_KEY_LENGTH: usize = 44;

/// A set of distinct characters keys are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    /// Builds an alphabet from the characters of `symbols`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidAlphabet`] if `symbols` is empty or repeats
    /// a character (a repeated character would be drawn more often).
    pub fn new(symbols: &str) -> LockResult<Self> {
        let chars: Vec<char> = symbols.chars().collect();
        if chars.is_empty() {
            return Err(LockError::InvalidAlphabet(
                "alphabet cannot be empty".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(chars.len());
        for ch in &chars {
            if !seen.insert(*ch) {
                return Err(LockError::InvalidAlphabet(format!(
                    "character {ch:?} appears more than once"
                )));
            }
        }
        Ok(Self { chars })
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Always `false`; an alphabet cannot be empty.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Whether `ch` belongs to the alphabet.
    pub fn contains(&self, ch: char) -> bool {
        self.chars.contains(&ch)
    }

    /// Characters in declaration order.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Bits of entropy in a key of `length` characters.
    pub fn entropy_bits(&self, length: usize) -> f64 {
        length as f64 * (self.chars.len() as f64).log2()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            chars: DEFAULT_ALPHABET.chars().collect(),
        }
    }
}

/// Generates a key of `length` characters drawn uniformly from `alphabet`
/// using the caller's random number generator.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, length: usize, alphabet: &Alphabet) -> String {
    (0..length)
        .filter_map(|_| alphabet.chars.choose(rng))
        .collect()
}

/// Generates a key of `length` characters drawn uniformly from `alphabet`.
///
/// Uses the thread-local generator, a cryptographically secure PRNG seeded
/// from the operating system.
pub fn generate(length: usize, alphabet: &Alphabet) -> String {
    generate_with(&mut rand::thread_rng(), length, alphabet)
}

/// Generates an 11 character key from the default alphabet.
pub fn generate_short_key() -> String {
    generate(SHORT_KEY_LENGTH, &Alphabet::default())
}

/// Generates a 22 character key from the default alphabet.
pub fn generate_medium_key() -> String {
    generate(MEDIUM_KEY_LENGTH, &Alphabet::default())
}

/// Generates a 44 character key from the default alphabet.
pub fn generate_long_key() -> String {
    generate(LONG_KEY_LENGTH, &Alphabet::default())
}

/// Generates a key of the default (medium) size.
pub fn generate_key() -> String {
    generate_medium_key()
}
