use std::fmt;
use std::ops::Deref;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// BIP-39 seed bytes, wiped when dropped. `Debug` shows only the length.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingBytes(Vec<u8>);

impl ZeroizingBytes {
    /// Lower-case hex; the encoded copy is wiped as well.
    pub fn to_hex(&self) -> ZeroizingString {
        ZeroizingString(hex::encode(&self.0))
    }
}

impl Deref for ZeroizingBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for ZeroizingBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for ZeroizingBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} secret bytes>", self.0.len())
    }
}

/// Recovery phrase, WIF key or hex seed handed back to a caller.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingString(String);

impl Deref for ZeroizingString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ZeroizingString {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for ZeroizingString {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl fmt::Debug for ZeroizingString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_hex_matches_bytes() {
        let seed = ZeroizingBytes::from(&[0xaf, 0x17, 0x00][..]);
        assert_eq!(&*seed, &[0xaf, 0x17, 0x00][..]);
        assert_eq!(&*seed.to_hex(), "af1700");
    }

    #[test]
    fn debug_output_hides_contents() {
        let seed = ZeroizingBytes::from(&[0xde, 0xad, 0xbe, 0xef][..]);
        assert_eq!(format!("{seed:?}"), "<4 secret bytes>");

        let phrase = ZeroizingString::from("october eager misery".to_string());
        assert_eq!(format!("{phrase:?}"), "<secret>");
    }

    #[test]
    fn derefs_to_str() {
        let phrase = ZeroizingString::from("abandon about".to_string());
        assert!(phrase.starts_with("abandon"));
        assert_eq!(phrase.split_whitespace().count(), 2);
    }

    #[test]
    fn zeroize_empties_buffers() {
        let mut seed = ZeroizingBytes::from(&[0xaa; 64][..]);
        seed.zeroize();
        assert!(seed.is_empty());

        let mut key = ZeroizingString::from("cTuc3sRj".to_string());
        key.zeroize();
        assert!(key.is_empty());
    }
}
