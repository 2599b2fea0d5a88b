use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

/// Number of random bytes behind every nullifier and secret (248 bits, always below the BN254 modulus).
pub const RANDOM_BYTES: usize = 31;

/// Generate a uniformly random BigUint of `nbytes` bytes (little-endian)
pub fn rbigint<R: RngCore + CryptoRng>(rng: &mut R, nbytes: usize) -> BigUint {
    let mut buf = vec![0u8; nbytes];
    rng.fill_bytes(&mut buf);
    BigUint::from_bytes_le(&buf)
}

/// Hex string with `0x` and exactly 64 digits
pub fn to_hex32(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// `0x`-prefixed hex of arbitrary bytes, as used for calldata
pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
