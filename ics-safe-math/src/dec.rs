//! Signed fixed-point decimal with 18 fractional digits.
//!
//! [`Dec`] stores a sign and the magnitude `|value| * 10^18` as a
//! [`U256`], which holds any `u128` amount with every fractional digit.
//! Products and quotients are formed on magnitudes through
//! [`mul_div_wide`](crate::mul_div_wide) so the intermediate never
//! overflows, and every lossy step truncates toward zero. Nothing in this
//! module rounds.

use std::cmp::Ordering;
use std::fmt;
use std::io;
use std::ops::Neg;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use primitive_types::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{mul_div_wide, MathError};

/// Number of fractional digits carried by [`Dec`].
pub const PRECISION: u32 = 18;

const SCALE: u64 = 1_000_000_000_000_000_000;

fn scale() -> U256 {
    U256::from(SCALE)
}

/// Zero is never negative, so derived equality and hashing agree with the
/// numeric value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dec {
    negative: bool,
    magnitude: U256,
}

impl Dec {
    pub const ZERO: Dec = Dec {
        negative: false,
        magnitude: U256([0; 4]),
    };
    pub const ONE: Dec = Dec {
        negative: false,
        magnitude: U256([SCALE, 0, 0, 0]),
    };

    fn signed(negative: bool, magnitude: U256) -> Self {
        Dec {
            negative: negative && !magnitude.is_zero(),
            magnitude,
        }
    }

    pub fn from_int(value: i128) -> Self {
        Self::signed(value < 0, U256::from(value.unsigned_abs()) * scale())
    }

    pub fn from_u128(value: u128) -> Self {
        Self::signed(false, U256::from(value) * scale())
    }

    /// `value * 10^-prec`, e.g. `new_with_prec(30, 2)` is `0.30`.
    pub fn new_with_prec(value: i128, prec: u32) -> Result<Self, MathError> {
        if prec > PRECISION {
            return Err(MathError::InvalidDecimal);
        }
        let factor = U256::exp10((PRECISION - prec) as usize);
        Ok(Self::signed(
            value < 0,
            U256::from(value.unsigned_abs()) * factor,
        ))
    }

    pub fn is_zero(self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.negative
    }

    pub fn is_positive(self) -> bool {
        !self.negative && !self.magnitude.is_zero()
    }

    pub fn abs(self) -> Self {
        Self::signed(false, self.magnitude)
    }

    pub fn checked_add(self, other: Dec) -> Result<Self, MathError> {
        if self.negative == other.negative {
            let magnitude = self
                .magnitude
                .checked_add(other.magnitude)
                .ok_or(MathError::AdditionOverflow)?;
            return Ok(Self::signed(self.negative, magnitude));
        }
        // Opposite signs: the larger magnitude keeps its sign.
        Ok(if self.magnitude >= other.magnitude {
            Self::signed(self.negative, self.magnitude - other.magnitude)
        } else {
            Self::signed(other.negative, other.magnitude - self.magnitude)
        })
    }

    pub fn checked_sub(self, other: Dec) -> Result<Self, MathError> {
        self.checked_add(-other)
    }

    /// `self * other`, truncating anything past the 18th fractional digit.
    pub fn mul_truncate(self, other: Dec) -> Result<Self, MathError> {
        let magnitude = mul_div_wide(self.magnitude, other.magnitude, scale())?;
        Ok(Self::signed(self.negative != other.negative, magnitude))
    }

    /// `self / other`, truncating anything past the 18th fractional digit.
    pub fn quo_truncate(self, other: Dec) -> Result<Self, MathError> {
        if other.is_zero() {
            return Err(MathError::DivisionOverflow);
        }
        let magnitude = mul_div_wide(self.magnitude, scale(), other.magnitude)?;
        Ok(Self::signed(self.negative != other.negative, magnitude))
    }

    /// `self * mul / div` with a single truncation, so the product never has
    /// to fit on its own.
    pub fn mul_quo_truncate(self, mul: Dec, div: Dec) -> Result<Self, MathError> {
        if div.is_zero() {
            return Err(MathError::DivisionOverflow);
        }
        let magnitude = mul_div_wide(self.magnitude, mul.magnitude, div.magnitude)?;
        let negative = self.negative != mul.negative;
        Ok(Self::signed(negative != div.negative, magnitude))
    }

    pub fn mul_int(self, value: u128) -> Result<Self, MathError> {
        let magnitude = self
            .magnitude
            .checked_mul(U256::from(value))
            .ok_or(MathError::MultiplicationOverflow)?;
        Ok(Self::signed(self.negative, magnitude))
    }

    pub fn quo_int(self, value: u128) -> Result<Self, MathError> {
        let magnitude = self
            .magnitude
            .checked_div(U256::from(value))
            .ok_or(MathError::DivisionOverflow)?;
        Ok(Self::signed(self.negative, magnitude))
    }

    /// Drops the fractional digits, toward zero.
    pub fn trunc(self) -> Self {
        Self::signed(self.negative, self.magnitude / scale() * scale())
    }

    /// Integer part as `u128`, truncated toward zero. Fails when that part is
    /// negative or does not fit.
    pub fn to_u128(self) -> Result<u128, MathError> {
        let int_part = self.magnitude / scale();
        if int_part.is_zero() {
            return Ok(0);
        }
        if self.negative {
            return Err(MathError::ConversionError);
        }
        u128::try_from(int_part).map_err(|_| MathError::ConversionError)
    }
}

impl Neg for Dec {
    type Output = Dec;

    fn neg(self) -> Dec {
        Dec::signed(!self.negative, self.magnitude)
    }
}

impl Ord for Dec {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
        }
    }
}

impl PartialOrd for Dec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            self.magnitude / scale(),
            (self.magnitude % scale()).low_u64(),
            width = PRECISION as usize
        )
    }
}

impl FromStr for Dec {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty()
            || !all_digits(int_part)
            || !all_digits(frac_part)
            || frac_part.len() > PRECISION as usize
            || (body.contains('.') && frac_part.is_empty())
        {
            return Err(MathError::InvalidDecimal);
        }

        let int_value = U256::from_dec_str(int_part).map_err(|_| MathError::InvalidDecimal)?;
        let frac_value: u64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| MathError::InvalidDecimal)?
        };

        let magnitude = int_value
            .checked_mul(scale())
            .ok_or(MathError::MultiplicationOverflow)?
            .checked_add(U256::from(frac_value) * U256::exp10(PRECISION as usize - frac_part.len()))
            .ok_or(MathError::AdditionOverflow)?;
        Ok(Dec::signed(negative, magnitude))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// Sign byte followed by the four little-endian magnitude limbs.
impl BorshSerialize for Dec {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.negative, writer)?;
        BorshSerialize::serialize(&self.magnitude.0, writer)
    }
}

impl BorshDeserialize for Dec {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let negative = bool::deserialize_reader(reader)?;
        let magnitude = U256(<[u64; 4]>::deserialize_reader(reader)?);
        if negative && magnitude.is_zero() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "negative zero"));
        }
        Ok(Dec {
            negative,
            magnitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_with_prec() {
        assert_eq!(Dec::new_with_prec(30, 2).unwrap(), dec("0.3"));
        assert_eq!(Dec::new_with_prec(7, 0).unwrap(), Dec::from_int(7));
        assert_eq!(Dec::new_with_prec(-1, 18).unwrap(), dec("-0.000000000000000001"));
        assert_eq!(Dec::new_with_prec(1, 19), Err(MathError::InvalidDecimal));
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(dec("0.3").to_string(), "0.300000000000000000");
        assert_eq!(dec("-12.5").to_string(), "-12.500000000000000000");
        assert_eq!(Dec::ZERO.to_string(), "0.000000000000000000");
        assert_eq!(dec("-0").to_string(), "0.000000000000000000");
        assert_eq!(
            Dec::from_u128(u128::MAX).to_string(),
            "340282366920938463463374607431768211455.000000000000000000"
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", ".5", "1.", "1.2.3", "abc", "1e5", "0.1234567890123456789", "--1", "+1"] {
            assert_eq!(bad.parse::<Dec>(), Err(MathError::InvalidDecimal), "{bad}");
        }
        // 2^256 does not fit the magnitude.
        assert!("115792089237316195423570985008687907853269984665640564039457584007913129639936"
            .parse::<Dec>()
            .is_err());
    }

    #[test]
    fn test_sign_handling() {
        assert_eq!(dec("-0"), Dec::ZERO);
        assert!(!dec("-0").is_negative());
        assert!(dec("-1") < dec("-0.5"));
        assert!(dec("-0.5") < Dec::ZERO);
        assert!(Dec::ZERO < dec("0.5"));
        assert_eq!(dec("1").checked_sub(dec("3")).unwrap(), dec("-2"));
        assert_eq!(dec("-1").checked_add(dec("1")).unwrap(), Dec::ZERO);
        assert_eq!(-dec("2.5"), dec("-2.5"));
        assert_eq!(dec("-2.5").abs(), dec("2.5"));
        assert_eq!(-Dec::ZERO, Dec::ZERO);
    }

    #[test]
    fn test_quo_truncates() {
        // 2/3 = 0.666..., the 18th digit is not rounded up.
        let two_thirds = Dec::from_int(2).quo_truncate(Dec::from_int(3)).unwrap();
        assert_eq!(two_thirds.to_string(), "0.666666666666666666");

        let neg = Dec::from_int(-2).quo_truncate(Dec::from_int(3)).unwrap();
        assert_eq!(neg.to_string(), "-0.666666666666666666");

        assert_eq!(
            Dec::ONE.quo_truncate(Dec::ZERO),
            Err(MathError::DivisionOverflow)
        );
    }

    #[test]
    fn test_mul_truncates() {
        let third = dec("0.333333333333333333");
        assert_eq!(third.mul_truncate(dec("0.5")).unwrap().to_string(), "0.166666666666666666");
        assert_eq!(
            dec("0.63").mul_truncate(Dec::from_int(1_075_000)).unwrap(),
            Dec::from_int(677_250)
        );
    }

    #[test]
    fn test_wide_amounts() {
        let max = Dec::from_u128(u128::MAX);
        assert_eq!(max.to_u128(), Ok(u128::MAX));
        assert_eq!(dec("0.5").mul_truncate(max).unwrap().to_u128(), Ok(u128::MAX / 2));
        assert_eq!(
            max.quo_truncate(max.checked_add(max).unwrap()).unwrap(),
            dec("0.5")
        );
        assert_eq!(
            max.checked_add(Dec::ONE).unwrap().to_u128(),
            Err(MathError::ConversionError)
        );
        // u128::MAX squared exceeds the 256-bit magnitude once scaled.
        assert_eq!(max.mul_truncate(max), Err(MathError::ConversionError));
        assert_eq!(max.mul_quo_truncate(max, max).unwrap(), max);
        assert_eq!(
            dec("-3").mul_quo_truncate(dec("2"), dec("4")).unwrap(),
            dec("-1.5")
        );
        assert_eq!(max.mul_quo_truncate(max, Dec::ZERO), Err(MathError::DivisionOverflow));
    }

    #[test]
    fn test_int_helpers() {
        assert_eq!(dec("12.5").trunc(), dec("12"));
        assert_eq!(dec("-12.5").trunc(), dec("-12"));
        assert_eq!(dec("-0.5").trunc(), Dec::ZERO);
        assert_eq!(dec("12.9").to_u128(), Ok(12));
        assert_eq!(dec("-0.5").to_u128(), Ok(0));
        assert_eq!(dec("-1.5").to_u128(), Err(MathError::ConversionError));
        assert_eq!(dec("50").quo_int(4).unwrap(), dec("12.5"));
        assert_eq!(dec("0.15").mul_int(20).unwrap(), Dec::from_int(3));
        assert_eq!(Dec::ONE.quo_int(0), Err(MathError::DivisionOverflow));
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&dec("0.25")).unwrap();
        assert_eq!(json, "\"0.250000000000000000\"");
        let back: Dec = serde_json::from_str("\"0.25\"").unwrap();
        assert_eq!(back, dec("0.25"));
    }

    #[test]
    fn test_borsh_layout() {
        let bytes = borsh::to_vec(&dec("-1")).unwrap();
        assert_eq!(bytes.len(), 33);
        assert_eq!(bytes[0], 1);
        assert_eq!(Dec::try_from_slice(&bytes).unwrap(), dec("-1"));

        let mut negative_zero = vec![1u8];
        negative_zero.extend([0u8; 32]);
        assert!(Dec::try_from_slice(&negative_zero).is_err());
    }

    fn arb_dec() -> impl Strategy<Value = Dec> {
        (any::<bool>(), any::<[u64; 4]>())
            .prop_map(|(negative, limbs)| Dec::signed(negative, U256(limbs)))
    }

    proptest! {
        #[test]
        fn fuzz_display_parse(value in arb_dec()) {
            prop_assert_eq!(value.to_string().parse::<Dec>().unwrap(), value);
        }

        #[test]
        fn fuzz_int_truncation(value in any::<u128>()) {
            prop_assert_eq!(Dec::from_u128(value).to_u128().unwrap(), value);
        }

        #[test]
        fn fuzz_add_sub_inverse(a in any::<i128>(), b in any::<i128>()) {
            let (a, b) = (Dec::from_int(a), Dec::from_int(b));
            prop_assert_eq!(a.checked_add(b).unwrap().checked_sub(b).unwrap(), a);
        }

        #[test]
        fn fuzz_quo_then_mul_never_exceeds(a in any::<u128>(), b in 1u128..) {
            let a = Dec::from_u128(a);
            let b = Dec::from_u128(b);
            let ratio = a.quo_truncate(b).unwrap();
            prop_assert!(ratio.mul_truncate(b).unwrap() <= a);
        }
    }
}
