//! Checked arithmetic shared by the staking accounting crates.
//!
//! Integer helpers (`safe_*`, [`mul_div`]) surface overflow as [`MathError`]
//! instead of panicking, and [`Dec`] provides the 18-digit fixed-point type
//! used for every intent weight and allocation delta. `Dec` carries a 256-bit
//! magnitude, so any `u128` amount fits with all 18 digits.

use num::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub};

use primitive_types::{U256, U512};
use thiserror::Error;

mod dec;

pub use dec::{Dec, PRECISION};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("Addition overflowed")]
    AdditionOverflow,
    #[error("Subtraction overflowed")]
    SubtractionOverflow,
    #[error("Multiplication overflowed")]
    MultiplicationOverflow,
    #[error("Division overflowed")]
    DivisionOverflow,
    #[error("Failed to convert a math result from U256 back to its original type")]
    ConversionError,
    #[error("Invalid decimal string")]
    InvalidDecimal,
}

pub fn safe_add<T>(a: T, b: T) -> Result<T, MathError>
where
    T: CheckedAdd,
{
    a.checked_add(&b).ok_or(MathError::AdditionOverflow)
}

pub fn safe_sub<T>(a: T, b: T) -> Result<T, MathError>
where
    T: CheckedSub,
{
    a.checked_sub(&b).ok_or(MathError::SubtractionOverflow)
}

pub fn safe_mul<T>(a: T, b: T) -> Result<T, MathError>
where
    T: CheckedMul,
{
    a.checked_mul(&b).ok_or(MathError::MultiplicationOverflow)
}

pub fn safe_div<T>(a: T, b: T) -> Result<T, MathError>
where
    T: CheckedDiv,
{
    a.checked_div(&b).ok_or(MathError::DivisionOverflow)
}

/// Computes `mul_a * mul_b / div` with a 256-bit intermediate, truncating
/// the quotient toward zero.
pub fn mul_div<T>(mul_a: T, mul_b: T, div: T) -> Result<T, MathError>
where
    T: TryFrom<U256>,
    U256: From<T>,
{
    let a = U256::from(mul_a);
    let b = U256::from(mul_b);

    let mul = a.checked_mul(b).ok_or(MathError::MultiplicationOverflow)?;
    let div = U256::from(div);

    let res = mul.checked_div(div).ok_or(MathError::DivisionOverflow)?;

    res.try_into().map_err(|_| MathError::ConversionError)
}

/// [`mul_div`] for 256-bit operands, through a 512-bit intermediate.
pub fn mul_div_wide(mul_a: U256, mul_b: U256, div: U256) -> Result<U256, MathError> {
    if div.is_zero() {
        return Err(MathError::DivisionOverflow);
    }
    let res = mul_a.full_mul(mul_b) / U512::from(div);

    U256::try_from(res).map_err(|_| MathError::ConversionError)
}

/// Sums `values`, failing on the first overflow.
pub fn checked_sum<T, I>(values: I) -> Result<T, MathError>
where
    T: CheckedAdd + Default,
    I: IntoIterator<Item = T>,
{
    values
        .into_iter()
        .try_fold(T::default(), |acc, v| safe_add(acc, v))
}
