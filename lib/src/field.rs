//! BN254 scalar field element used for every commitment, hash and tree node.
//!
//! Values cross the external boundaries as base-10 strings (JSON), `0x` hex
//! strings (user input), big-endian `bytes32` (ledger events) or `U256`
//! (ABI encoding). Everything in between stays a `FieldElement`.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use ark_bn254::Fr;
use ark_ff::{BigInteger, One, PrimeField, Zero};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::WillError;
use crate::utils::{rbigint, to_hex32, RANDOM_BYTES};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldElement(Fr);

impl FieldElement {
    pub fn from_fr(fr: Fr) -> Self {
        Self(fr)
    }

    pub fn into_fr(self) -> Fr {
        self.0
    }

    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    pub fn one() -> Self {
        Self(Fr::one())
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    /// Reduces an arbitrary integer modulo the field order.
    pub fn from_biguint(n: &BigUint) -> Self {
        Self(Fr::from_le_bytes_mod_order(&n.to_bytes_le()))
    }

    pub fn to_biguint(&self) -> BigUint {
        self.0.into_bigint().into()
    }

    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    pub fn to_be_bytes32(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.into_bigint().to_bytes_be());
        out
    }

    pub fn to_u256(&self) -> U256 {
        U256::from_be_bytes(self.to_be_bytes32())
    }

    pub fn to_hex(&self) -> String {
        to_hex32(&self.to_be_bytes32())
    }

    /// Samples 248 random bits from `rng`. The result is always canonical
    /// because 2^248 is below the field order.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_biguint(&rbigint(rng, RANDOM_BYTES))
    }
}

impl From<u64> for FieldElement {
    fn from(v: u64) -> Self {
        Self(Fr::from(v))
    }
}

impl FromStr for FieldElement {
    type Err = WillError;

    /// Accepts base-10 or `0x`-prefixed hex and reduces modulo p.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            if digits.is_empty() {
                return Err(WillError::Validation("empty hex field element".into()));
            }
            let padded;
            let digits = if digits.len() % 2 == 1 {
                padded = format!("0{digits}");
                padded.as_str()
            } else {
                digits
            };
            let bytes = hex::decode(digits)
                .map_err(|e| WillError::Validation(format!("invalid hex \"{s}\": {e}")))?;
            return Ok(Self::from_be_bytes_mod_order(&bytes));
        }
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WillError::Validation(format!(
                "invalid decimal field element \"{s}\""
            )));
        }
        let n = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| WillError::Validation(format!("invalid decimal \"{s}\"")))?;
        Ok(Self::from_biguint(&n))
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_biguint())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P_MINUS_ONE: &str =
        "21888242871839275222246405745257275088548364400416034343698204186575808495616";

    #[test]
    fn test_decimal_and_hex_agree() {
        let dec: FieldElement = "255".parse().unwrap();
        let hex: FieldElement = "0xff".parse().unwrap();
        let odd: FieldElement = "0x0ff".parse().unwrap();
        assert_eq!(dec, hex);
        assert_eq!(dec, odd);
        assert_eq!(dec, FieldElement::from(255));
    }

    #[test]
    fn test_reduces_modulo_order() {
        let p_minus_one: FieldElement = P_MINUS_ONE.parse().unwrap();
        assert_eq!(p_minus_one.to_string(), P_MINUS_ONE);

        let p = BigUint::parse_bytes(P_MINUS_ONE.as_bytes(), 10).unwrap() + 1u32;
        assert_eq!(FieldElement::from_biguint(&p), FieldElement::zero());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("".parse::<FieldElement>().is_err());
        assert!("12a".parse::<FieldElement>().is_err());
        assert!("-5".parse::<FieldElement>().is_err());
        assert!("0x".parse::<FieldElement>().is_err());
        assert!("0xzz".parse::<FieldElement>().is_err());
    }

    #[test]
    fn test_bytes32_is_big_endian() {
        let fe = FieldElement::from(0x0102);
        let bytes = fe.to_be_bytes32();
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert_eq!(FieldElement::from_be_bytes_mod_order(&bytes), fe);
        assert_eq!(fe.to_u256(), U256::from(0x0102u64));
    }

    #[test]
    fn test_serde_uses_decimal_strings() {
        let fe = FieldElement::from(42);
        assert_eq!(serde_json::to_string(&fe).unwrap(), "\"42\"");
        let back: FieldElement = serde_json::from_str("\"0x2a\"").unwrap();
        assert_eq!(back, fe);
    }
}
