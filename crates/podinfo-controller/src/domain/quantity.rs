//! Conversion of Kubernetes resource quantities to whole units.
//!
//! Kubernetes reports a quantity's integer value rounded up, so `500m` of CPU
//! counts as one core. The arithmetic here is exact: the quantity is kept as an
//! integer mantissa with base-10 and base-2 exponents until the final rounding.

use core::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum QuantityError {
    #[display("empty quantity")]
    Empty,
    #[display("invalid number")]
    InvalidNumber,
    #[display("unknown suffix {suffix:?}")]
    UnknownSuffix { suffix: String },
    #[display("value out of range")]
    OutOfRange,
}

impl Error for QuantityError {}

/// Scale carried by a quantity suffix.
struct Scale {
    exp10: i32,
    exp2: u32,
}

fn parse_suffix(suffix: &str) -> Result<Scale, QuantityError> {
    let binary = |exp2| Ok(Scale { exp10: 0, exp2 });
    let decimal = |exp10| Ok(Scale { exp10, exp2: 0 });

    match suffix {
        "" => decimal(0),
        "n" => decimal(-9),
        "u" => decimal(-6),
        "m" => decimal(-3),
        "k" => decimal(3),
        "M" => decimal(6),
        "G" => decimal(9),
        "T" => decimal(12),
        "P" => decimal(15),
        "E" => decimal(18),
        "Ki" => binary(10),
        "Mi" => binary(20),
        "Gi" => binary(30),
        "Ti" => binary(40),
        "Pi" => binary(50),
        "Ei" => binary(60),
        _ => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))
                .and_then(|exp| exp.parse::<i32>().ok())
                .ok_or_else(|| QuantityError::UnknownSuffix {
                    suffix: suffix.to_string(),
                })?;
            decimal(exponent)
        }
    }
}

/// Parses a quantity such as `2`, `500m`, `1.5`, `1Ki` or `1e3` and returns its
/// value rounded up to the next integer.
pub fn ceil_value(raw: &str) -> Result<i64, QuantityError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(QuantityError::Empty);
    }

    let number_end = raw
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-')))
        .unwrap_or(raw.len());
    let (number, suffix) = raw.split_at(number_end);

    let (negative, unsigned) = match number.as_bytes().first() {
        Some(b'-') => (true, &number[1..]),
        Some(b'+') => (false, &number[1..]),
        _ => (false, number),
    };

    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
    {
        return Err(QuantityError::InvalidNumber);
    }

    let scale = parse_suffix(suffix)?;

    let digits = format!("{whole}{fraction}");
    let digits = digits.trim_start_matches('0');
    let mut mantissa: i128 = if digits.is_empty() {
        0
    } else {
        digits.parse().map_err(|_| QuantityError::OutOfRange)?
    };
    if negative {
        mantissa = -mantissa;
    }

    let fraction_len = i32::try_from(fraction.len()).map_err(|_| QuantityError::OutOfRange)?;
    let exp10 = scale
        .exp10
        .checked_sub(fraction_len)
        .ok_or(QuantityError::OutOfRange)?;

    let numerator = mantissa
        .checked_mul(1_i128 << scale.exp2)
        .ok_or(QuantityError::OutOfRange)?;

    let value = if exp10 >= 0 {
        10_i128
            .checked_pow(exp10.unsigned_abs())
            .and_then(|factor| numerator.checked_mul(factor))
            .ok_or(QuantityError::OutOfRange)?
    } else {
        match 10_i128.checked_pow(exp10.unsigned_abs()) {
            // integer division truncates toward zero, which is already the
            // ceiling for negative values
            Some(divisor) if numerator > 0 => (numerator - 1) / divisor + 1,
            Some(divisor) => numerator / divisor,
            // the divisor exceeds any representable numerator
            None if numerator > 0 => 1,
            None => 0,
        }
    };

    i64::try_from(value).map_err(|_| QuantityError::OutOfRange)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn whole_numbers_and_millicores() {
        let cases = [
            ("2", 2),
            ("0", 0),
            ("500m", 1),
            ("1000m", 1),
            ("1500m", 2),
            ("3000m", 3),
            ("100m", 1),
            ("0m", 0),
        ];

        for (raw, expected) in cases {
            assert_eq!(ceil_value(raw), Ok(expected), "quantity {raw}");
        }
    }

    #[test]
    fn fractions_round_up() {
        assert_eq!(ceil_value("1.5"), Ok(2));
        assert_eq!(ceil_value("0.1"), Ok(1));
        assert_eq!(ceil_value("2.0"), Ok(2));
        assert_eq!(ceil_value(".5"), Ok(1));
        assert_eq!(ceil_value("10n"), Ok(1));
    }

    #[test]
    fn negative_values_round_toward_zero() {
        assert_eq!(ceil_value("-1.5"), Ok(-1));
        assert_eq!(ceil_value("-500m"), Ok(0));
    }

    #[test]
    fn scaled_suffixes() {
        assert_eq!(ceil_value("1k"), Ok(1_000));
        assert_eq!(ceil_value("1Ki"), Ok(1_024));
        assert_eq!(ceil_value("2Mi"), Ok(2 * 1_048_576));
        assert_eq!(ceil_value("1e3"), Ok(1_000));
        assert_eq!(ceil_value("1E3"), Ok(1_000));
        assert_eq!(ceil_value("15e-1"), Ok(2));
        assert_eq!(ceil_value("2E"), Ok(2_000_000_000_000_000_000));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(ceil_value(""), Err(QuantityError::Empty));
        assert_eq!(ceil_value("abc"), Err(QuantityError::InvalidNumber));
        assert_eq!(ceil_value("1.2.3"), Err(QuantityError::InvalidNumber));
        assert_eq!(ceil_value("."), Err(QuantityError::InvalidNumber));
        assert_eq!(
            ceil_value("1Zi"),
            Err(QuantityError::UnknownSuffix {
                suffix: "Zi".to_string()
            })
        );
    }

    #[test]
    fn rejects_values_beyond_i64() {
        assert_eq!(ceil_value("10E"), Err(QuantityError::OutOfRange));
        assert_eq!(ceil_value("1e40"), Err(QuantityError::OutOfRange));
    }

    #[test]
    fn tiny_positive_values_round_to_one() {
        assert_eq!(ceil_value("1e-50"), Ok(1));
        assert_eq!(ceil_value("0e-50"), Ok(0));
    }
}
