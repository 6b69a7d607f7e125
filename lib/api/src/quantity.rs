// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-point resource quantities.
//!
//! Quantities are parsed from the standard binary-or-decimal SI string form
//! (`"1000m"`, `"2"`, `"2Gi"`, `"1.5G"`, `"3e2"`) and compare as rational
//! numbers in their base unit. Internally a quantity is a single `i128`
//! count of milli-units, which is exact for every suffix down to `m`.

use std::fmt;
use std::str::FromStr;

/// Parse failure for a quantity string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityParseError {
    #[error("empty quantity string")]
    Empty,
    #[error("invalid quantity {0:?}")]
    Invalid(String),
    #[error("unknown unit suffix {suffix:?} in quantity {input:?}")]
    UnknownSuffix { input: String, suffix: String },
    #[error("quantity {0:?} overflows the internal representation")]
    Overflow(String),
}

/// A resource quantity held as a count of milli-units.
///
/// Ordering and addition are exact; there is no floating point involved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity {
    millis: i128,
}

/// Mantissa digits are capped so that `mantissa * scale` stays far away
/// from `i128::MAX` for every supported suffix.
const MAX_MANTISSA_DIGITS: usize = 15;

impl Quantity {
    /// The zero quantity.
    pub const fn zero() -> Self {
        Self { millis: 0 }
    }

    /// Build a quantity from a count of milli-units (e.g. milli-CPU).
    pub const fn from_milli(millis: i128) -> Self {
        Self { millis }
    }

    /// Build a quantity from a count of base units (e.g. bytes).
    pub const fn from_units(units: i128) -> Self {
        Self {
            millis: units.saturating_mul(1000),
        }
    }

    /// The raw milli-unit count.
    pub const fn as_milli(&self) -> i128 {
        self.millis
    }

    pub const fn is_zero(&self) -> bool {
        self.millis == 0
    }
}

impl std::ops::Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity {
            millis: self.millis.saturating_add(rhs.millis),
        }
    }
}

impl std::ops::AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.millis = self.millis.saturating_add(rhs.millis);
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis % 1000 == 0 {
            write!(f, "{}", self.millis / 1000)
        } else {
            write!(f, "{}m", self.millis)
        }
    }
}

/// Multiplier for a unit suffix, expressed in milli-units per suffix unit.
fn suffix_scale_millis(suffix: &str) -> Option<i128> {
    const KI: i128 = 1024;
    Some(match suffix {
        "" => 1000,
        "m" => 1,
        "k" => 1000 * 1_000,
        "M" => 1000 * 1_000_000,
        "G" => 1000 * 1_000_000_000,
        "T" => 1000 * 1_000_000_000_000,
        "P" => 1000 * 1_000_000_000_000_000,
        "E" => 1000 * 1_000_000_000_000_000_000,
        "Ki" => 1000 * KI,
        "Mi" => 1000 * KI * KI,
        "Gi" => 1000 * KI * KI * KI,
        "Ti" => 1000 * KI * KI * KI * KI,
        "Pi" => 1000 * KI * KI * KI * KI * KI,
        "Ei" => 1000 * KI * KI * KI * KI * KI * KI,
        _ => return None,
    })
}

impl FromStr for Quantity {
    type Err = QuantityParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        if s.is_empty() {
            return Err(QuantityParseError::Empty);
        }

        let (negative, s) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let number_len = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(s.len());
        let (number, suffix) = s.split_at(number_len);

        let (int_part, frac_part) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(QuantityParseError::Invalid(input.to_string()));
        }
        if !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(QuantityParseError::Invalid(input.to_string()));
        }

        // The mantissa is the concatenated integer and fraction digits; the
        // fraction length becomes a decimal divisor applied after scaling.
        let digits = format!("{int_part}{frac_part}");
        if digits.len() > MAX_MANTISSA_DIGITS {
            return Err(QuantityParseError::Overflow(input.to_string()));
        }
        let mantissa: i128 = digits
            .parse()
            .map_err(|_| QuantityParseError::Invalid(input.to_string()))?;

        let scale = parse_suffix(input, suffix)?;

        let divisor = 10_i128.pow(frac_part.len() as u32);
        let scaled = mantissa
            .checked_mul(scale)
            .ok_or_else(|| QuantityParseError::Overflow(input.to_string()))?;
        // Round sub-milli remainders away from zero, matching the canonical
        // quantity behaviour of never under-reporting.
        let mut millis = scaled / divisor;
        if scaled % divisor != 0 {
            millis += 1;
        }
        if negative {
            millis = -millis;
        }

        Ok(Quantity { millis })
    }
}

/// Resolve a unit suffix or a decimal exponent (`e3`, `E-2`).
///
/// `E` followed by an integer is an exponent; a bare `E` is the exa
/// suffix and `Ei` the exbi suffix, both resolved from the unit table.
fn parse_suffix(input: &str, suffix: &str) -> Result<i128, QuantityParseError> {
    if let Some(exp) = suffix.strip_prefix(['e', 'E']).filter(|rest| {
        !rest.is_empty()
            && rest
                .bytes()
                .all(|b| b.is_ascii_digit() || b == b'-' || b == b'+')
    }) {
        let exp: i32 = exp.parse().map_err(|_| QuantityParseError::UnknownSuffix {
            input: input.to_string(),
            suffix: suffix.to_string(),
        })?;
        // Milli-units give three decimal digits of headroom below the base
        // unit; anything finer cannot be represented.
        if !(-3..=18).contains(&exp) {
            return Err(QuantityParseError::Overflow(input.to_string()));
        }
        return Ok(10_i128.pow((exp + 3) as u32));
    }

    suffix_scale_millis(suffix).ok_or_else(|| QuantityParseError::UnknownSuffix {
        input: input.to_string(),
        suffix: suffix.to_string(),
    })
}
