use num_bigint::BigUint;
use num_traits::One;

/// A decimal amount string did not parse into a non-negative number.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid amount string {0:?}")]
pub struct AmountParseError(pub String);

/// Parse a human-scale decimal amount string (e.g. `"100.5"`) into its
/// smallest-unit representation at `decimals` places, as an arbitrary-width
/// unsigned integer.
///
/// Excess fractional digits beyond `decimals` are **rounded**, not
/// truncated: the digit immediately past the cutoff decides whether the
/// kept value rounds up (`5`-`9`) or stays (`0`-`4`).
pub fn parse_amount(amount: &str, decimals: u32) -> Result<BigUint, AmountParseError> {
    let amount = amount.trim();
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(AmountParseError(amount.to_owned()));
    }

    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountParseError(amount.to_owned()));
    }
    let int_part = if int_part.is_empty() { "0" } else { int_part };

    let decimals = decimals as usize;
    let mut round_up = false;
    let kept_frac = if frac_part.len() <= decimals {
        format!("{frac_part:0<width$}", width = decimals)
    } else {
        let (kept, rest) = frac_part.split_at(decimals);
        if rest.as_bytes()[0] >= b'5' {
            round_up = true;
        }
        kept.to_owned()
    };

    let digits = format!("{int_part}{kept_frac}");
    let mut value: BigUint = digits.parse().map_err(|_| AmountParseError(amount.to_owned()))?;
    if round_up {
        value += BigUint::one();
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit() {
        assert_eq!(parse_amount("100.5", 18).unwrap(), parse_amount("100.500000000000000000", 18).unwrap());
    }

    #[test]
    fn no_fraction() {
        assert_eq!(parse_amount("100", 6).unwrap(), BigUint::from(100_000_000u64));
    }

    #[test]
    fn rounds_up_excess_digits() {
        // 1 wei at 0 extra decimals but with a trailing 5 rounds up.
        let rounded = parse_amount("1.000000000000000005", 18).unwrap();
        let truncated_equivalent = BigUint::from(1_000_000_000_000_000_000u64) + BigUint::one();
        assert_eq!(rounded, truncated_equivalent);
    }

    #[test]
    fn rounds_down_small_excess_digits() {
        let rounded = parse_amount("1.0000000000000000049", 18).unwrap();
        assert_eq!(rounded, BigUint::from(1_000_000_000_000_000_000u64));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_amount("not-a-number", 18).is_err());
        assert!(parse_amount("", 18).is_err());
    }
}
