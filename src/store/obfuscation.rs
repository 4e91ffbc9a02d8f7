//! Reversible XOR + base64 masking for tokens written to disk.
//!
//! Keeps tokens out of casual view only. This is not encryption.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::AuthError;
use crate::utils::constants::OBFUSCATION_KEY;

fn xor_with_key(data: &[u8]) -> Vec<u8> {
    let key = OBFUSCATION_KEY.as_bytes();
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

pub fn obfuscate(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    STANDARD.encode(xor_with_key(value.as_bytes()))
}

pub fn deobfuscate(value: &str) -> Result<String, AuthError> {
    if value.is_empty() {
        return Ok(String::new());
    }
    let bytes = STANDARD
        .decode(value)
        .map_err(|e| AuthError::Decode(format!("stored token is not base64: {e}")))?;
    String::from_utf8(xor_with_key(&bytes))
        .map_err(|e| AuthError::Decode(format!("stored token is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii_utf8_and_empty() {
        let samples = [
            "",
            "A",
            "eyJhbGciOiJSUzI1NiJ9.eyJleHAiOjF9.sig",
            " !\"#$%&'()*+,-./0123456789:;<=>?@[\\]^_`{|}~",
            "токен-ü-🔐",
            "onto_mcp_2025onto_mcp_2025onto",
        ];
        for sample in samples {
            let masked = obfuscate(sample);
            assert_eq!(deobfuscate(&masked).unwrap(), sample);
        }
    }

    #[test]
    fn masked_value_differs_from_input() {
        let masked = obfuscate("secret-token");
        assert_ne!(masked, "secret-token");
        assert!(!masked.contains("secret"));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(deobfuscate("%%%"), Err(AuthError::Decode(_))));
    }
}
