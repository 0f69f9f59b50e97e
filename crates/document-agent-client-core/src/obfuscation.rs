//! Reversible obfuscation for values kept in browser storage.
//!
//! Repeating-key XOR over the UTF-8 bytes followed by standard base64. The key
//! ships inside the client bundle, so this only keeps session records from
//! being human-readable in storage inspectors. It is not encryption and must
//! not be treated as a confidentiality boundary.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

const OBFUSCATION_KEY: &[u8] = b"dA$7k!mQ9x#Lp2Wv";

/// Obfuscates `plaintext` into a base64 token. Deterministic for a given key.
#[must_use]
pub fn encrypt(plaintext: &str) -> String {
    STANDARD.encode(xor_with_key(plaintext.as_bytes(), OBFUSCATION_KEY))
}

/// Reverses [`encrypt`]. Returns `None` for anything that is not valid base64
/// or does not decode back to UTF-8 text.
#[must_use]
pub fn decrypt(token: &str) -> Option<String> {
    let ciphered = STANDARD.decode(token.trim()).ok()?;
    String::from_utf8(xor_with_key(&ciphered, OBFUSCATION_KEY)).ok()
}

fn xor_with_key(input: &[u8], key: &[u8]) -> Vec<u8> {
    input
        .iter()
        .zip(key.iter().cycle())
        .map(|(byte, key_byte)| byte ^ key_byte)
        .collect()
}
