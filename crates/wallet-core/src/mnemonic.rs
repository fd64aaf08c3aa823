use bip39::{Language, Mnemonic};
use crypto_utils::random::mnemonic_entropy;
use crypto_utils::{ZeroizingBytes, ZeroizingString};
use zeroize::Zeroize;

use crate::error::WalletError;

/// Generate a new 12-word BIP-39 mnemonic (128 bits of entropy).
pub fn generate_mnemonic() -> Result<Mnemonic, WalletError> {
    let entropy = mnemonic_entropy();
    Mnemonic::from_entropy_in(Language::English, &entropy[..])
        .map_err(|e| WalletError::InvalidRecoveryPhrase(e.to_string()))
}

/// Parse and checksum-validate a phrase. Extra whitespace and letter case
/// are ignored.
///
/// The error names the problem (word count, unknown word position, bad
/// checksum), never the words themselves.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, WalletError> {
    let mut normalized = phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    let parsed = Mnemonic::parse_in_normalized(Language::English, &normalized).map_err(|e| {
        let reason = match e {
            bip39::Error::BadWordCount(n) => format!("{n} words is not a valid phrase length"),
            bip39::Error::UnknownWord(i) => format!("word {} is not in the word list", i + 1),
            bip39::Error::InvalidChecksum => "checksum mismatch".to_string(),
            _ => "malformed phrase".to_string(),
        };
        WalletError::InvalidRecoveryPhrase(reason)
    });
    normalized.zeroize();
    parsed
}

/// The phrase as space-separated words.
pub fn phrase_of(mnemonic: &Mnemonic) -> ZeroizingString {
    ZeroizingString::from(mnemonic.to_string())
}

/// 64-byte BIP-39 seed for `mnemonic` and `passphrase`.
pub fn mnemonic_to_seed(mnemonic: &Mnemonic, passphrase: &str) -> ZeroizingBytes {
    let mut seed = mnemonic.to_seed(passphrase);
    let bytes = ZeroizingBytes::from(&seed[..]);
    seed.zeroize();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn generates_twelve_words() {
        let mnemonic = generate_mnemonic().unwrap();
        assert_eq!(mnemonic.word_count(), 12);
        assert!(parse_mnemonic(&phrase_of(&mnemonic)).is_ok());
    }

    #[test]
    fn generated_phrases_differ() {
        let a = phrase_of(&generate_mnemonic().unwrap());
        let b = phrase_of(&generate_mnemonic().unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_bad_checksum() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        assert!(matches!(
            parse_mnemonic(phrase),
            Err(WalletError::InvalidRecoveryPhrase(msg)) if msg == "checksum mismatch"
        ));
    }

    #[test]
    fn rejects_unknown_word_without_echoing_it() {
        let phrase = ABANDON.replace("about", "zzzzzz");
        let err = parse_mnemonic(&phrase).unwrap_err();
        assert!(!err.to_string().contains("zzzzzz"));
        assert!(err.to_string().contains("word 12"));
    }

    #[test]
    fn tolerates_case_and_spacing() {
        let messy = format!("  {}  ", ABANDON.to_uppercase().replace(' ', "   "));
        let parsed = parse_mnemonic(&messy).unwrap();
        assert_eq!(&*phrase_of(&parsed), ABANDON);
    }

    #[test]
    fn bip39_test_vector() {
        // Official BIP-39 test vector (12 words, no passphrase)
        let seed = mnemonic_to_seed(&parse_mnemonic(ABANDON).unwrap(), "");
        assert_eq!(
            hex::encode(&seed[..]),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }

    #[test]
    fn passphrase_changes_seed() {
        let mnemonic = parse_mnemonic(ABANDON).unwrap();
        let plain = mnemonic_to_seed(&mnemonic, "");
        let salted = mnemonic_to_seed(&mnemonic, "mypassphrase");
        assert_ne!(&plain[..], &salted[..]);
    }
}
