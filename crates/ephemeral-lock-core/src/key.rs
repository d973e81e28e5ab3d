//! Lock name to store key encoding.
//!
//! Some stores cap key length (memcache allows 250 bytes). Names that fit are
//! used verbatim; longer names keep a readable prefix and end in a Base32
//! digest of the full name so distinct names stay distinct.

use sha2::{Digest, Sha512};

use crate::error::{LockError, LockResult};

/// Hash length in Base32 characters (160 bits / 5 bits per char).
const HASH_LENGTH_IN_CHARS: usize = 32;

/// Base32 alphabet (RFC 4648).
const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Encodes `name` into a key no longer than `max_length` bytes.
///
/// With no limit, or a name within the limit, the name is returned unchanged.
///
/// # Errors
///
/// Returns [`LockError::InvalidName`] for an empty name or a zero limit.
pub fn to_store_key(name: &str, max_length: Option<usize>) -> LockResult<String> {
    if name.is_empty() {
        return Err(LockError::InvalidName("lock name cannot be empty".to_string()));
    }

    let Some(max_length) = max_length else {
        return Ok(name.to_string());
    };
    if max_length == 0 {
        return Err(LockError::InvalidName(
            "store key limit must be greater than zero".to_string(),
        ));
    }
    if name.len() <= max_length {
        return Ok(name.to_string());
    }

    let name_hash = compute_hash(name.as_bytes());
    if name_hash.len() >= max_length {
        return Ok(name_hash[..max_length].to_string());
    }

    let prefix_room = max_length - name_hash.len();
    let mut prefix = String::with_capacity(prefix_room);
    for ch in name.chars() {
        if prefix.len() + ch.len_utf8() > prefix_room {
            break;
        }
        prefix.push(ch);
    }
    Ok(format!("{prefix}{name_hash}"))
}

/// SHA-512 truncated to 160 bits, Base32 encoded.
fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    let hash_bytes = hasher.finalize();

    let mut chars = String::with_capacity(HASH_LENGTH_IN_CHARS);
    let mut bit_buffer = 0u32;
    let mut bits_remaining = 0u32;

    for &byte in &hash_bytes[..20] {
        bit_buffer |= u32::from(byte) << bits_remaining;
        bits_remaining += 8;

        while bits_remaining >= 5 {
            chars.push(BASE32_ALPHABET[(bit_buffer & 0x1f) as usize] as char);
            bit_buffer >>= 5;
            bits_remaining -= 5;
        }
    }

    chars
}
