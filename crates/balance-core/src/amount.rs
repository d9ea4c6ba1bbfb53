//! Arbitrary-precision token amounts
//!
//! Balances are kept in the token's minor unit as unsigned big integers. Chain
//! clients report them as JSON numbers, decimal strings or `0x` hex strings, so
//! parsing accepts all three. Arithmetic that could go below zero saturates.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Largest power of ten accepted from scientific-notation number text
const MAX_DECIMAL_SHIFT: u32 = 128;

/// Parts-per-million denominator for fixed-point multipliers
pub const PPM_SCALE: u64 = 1_000_000;

/// Non-negative token amount in minor units
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

/// Error returned when an amount string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid amount: {0}")]
pub struct ParseAmountError(pub String);

impl Amount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    /// `self - other`, floored at zero
    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        if self.0 > other.0 {
            Amount(&self.0 - &other.0)
        } else {
            Amount::zero()
        }
    }

    /// `self - other`, or `None` if the result would be negative
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 >= other.0 {
            Some(Amount(&self.0 - &other.0))
        } else {
            None
        }
    }

    /// `self * numerator / denominator`, rounded down. Zero denominator yields zero.
    pub fn mul_div(&self, numerator: &Amount, denominator: &Amount) -> Amount {
        if denominator.is_zero() {
            return Amount::zero();
        }
        Amount(&self.0 * &numerator.0 / &denominator.0)
    }

    /// `self * numerator / denominator`, rounded up. Zero denominator yields zero.
    pub fn mul_div_ceil(&self, numerator: &Amount, denominator: &Amount) -> Amount {
        if denominator.is_zero() {
            return Amount::zero();
        }
        let product = &self.0 * &numerator.0;
        let quotient = &product / &denominator.0;
        if (&quotient * &denominator.0) == product {
            Amount(quotient)
        } else {
            Amount(quotient + 1u32)
        }
    }

    /// Multiply by a parts-per-million factor (e.g. a fee safety ratio), rounding up
    pub fn mul_ppm(&self, ppm: u64) -> Amount {
        self.mul_div_ceil(&Amount::from(ppm), &Amount::from(PPM_SCALE))
    }

    /// Parse from a decoded chain value: number, decimal string or `0x` hex string.
    ///
    /// `null` decodes as zero (absent storage entry).
    pub fn from_json(value: &serde_json::Value) -> Option<Amount> {
        match value {
            serde_json::Value::Null => Some(Amount::zero()),
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(Amount::from)
                .or_else(|| Amount::from_number_text(&n.to_string())),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Parse JSON number text exactly: plain digits or integral scientific
    /// notation such as `1e20` or `1.5E3`.
    ///
    /// Negative or fractional values are rejected.
    pub fn from_number_text(text: &str) -> Option<Amount> {
        let (mantissa, exponent) = match text.split_once(|c: char| c == 'e' || c == 'E') {
            Some((mantissa, exponent)) => (mantissa, exponent.trim_start_matches('+').parse::<i64>().ok()?),
            None => (text, 0),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let frac_part = frac_part.trim_end_matches('0');
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let shift = exponent.checked_sub(frac_part.len() as i64)?;
        let shift = u32::try_from(shift).ok().filter(|s| *s <= MAX_DECIMAL_SHIFT)?;
        let digits = BigUint::parse_bytes(format!("{}{}", int_part, frac_part).as_bytes(), 10)?;
        Some(Amount(digits * BigUint::from(10u32).pow(shift)))
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().replace(',', "");
        if trimmed.is_empty() {
            return Err(ParseAmountError(s.to_string()));
        }

        let parsed = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if hex.is_empty() {
                Some(BigUint::zero())
            } else {
                BigUint::parse_bytes(hex.as_bytes(), 16)
            }
        } else {
            BigUint::parse_bytes(trimmed.as_bytes(), 10)
        };

        parsed.map(Amount).ok_or_else(|| ParseAmountError(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(BigUint::from(v))
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Self(BigUint::from(v))
    }
}

impl From<BigUint> for Amount {
    fn from(v: BigUint) -> Self {
        Self(v)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| &acc + a)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer, decimal string, or 0x-prefixed hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from)
            .map_err(|_| E::custom(format!("negative amount: {}", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
            BigUint::from_f64(v)
                .map(Amount)
                .ok_or_else(|| E::custom(format!("invalid amount: {}", v)))
        } else {
            Err(E::custom(format!("not a whole non-negative amount: {}", v)))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    /// serde_json hands numbers beyond u128 over as a single-entry map holding
    /// the exact number text
    fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Amount, A::Error> {
        let (_, text): (String, String) = map
            .next_entry()?
            .ok_or_else(|| de::Error::custom("empty amount"))?;
        Amount::from_number_text(&text)
            .ok_or_else(|| de::Error::custom(format!("not a whole non-negative amount: {}", text)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::zero())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
