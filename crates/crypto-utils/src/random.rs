use rand::RngCore;
use rand_core::OsRng;
use zeroize::Zeroizing;

/// Entropy length behind a 12-word recovery phrase (128 bits).
pub const MNEMONIC_ENTROPY_LEN: usize = 16;

/// Fills a fixed-size buffer from the operating system RNG.
pub fn random_bytes_fixed<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Fresh entropy for a new recovery phrase, wiped on drop.
pub fn mnemonic_entropy() -> Zeroizing<[u8; MNEMONIC_ENTROPY_LEN]> {
    Zeroizing::new(random_bytes_fixed::<MNEMONIC_ENTROPY_LEN>())
}
