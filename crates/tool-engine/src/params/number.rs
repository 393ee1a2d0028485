//! Numeric literals and inclusive bounds

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A numeric scalar usable in number and number-list parameters
pub trait NumberLiteral: Copy + PartialOrd + Display + Send + Sync + 'static {
    /// Type name used in error messages
    const TYPE_NAME: &'static str;

    /// Parse a literal, returning `None` if it is not a valid number of this type
    fn parse_literal(s: &str) -> Option<Self>;

    /// Format the value in its locale-independent serialized form
    fn format_literal(self) -> String;
}

impl NumberLiteral for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn parse_literal(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(v) = s.parse::<i64>() {
            return Some(v);
        }
        // Integral values written in scientific notation, e.g. "5e0"
        let v = s.parse::<f64>().ok()?;
        if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
            Some(v as i64)
        } else {
            None
        }
    }

    fn format_literal(self) -> String {
        self.to_string()
    }
}

impl NumberLiteral for f64 {
    const TYPE_NAME: &'static str = "double";

    fn parse_literal(s: &str) -> Option<Self> {
        s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
    }

    fn format_literal(self) -> String {
        format!("{:e}", self)
    }
}

/// Inclusive bounds; an open side is `None`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub lower: Option<T>,
    pub upper: Option<T>,
}

impl<T: NumberLiteral> Bounds<T> {
    /// Bounds accepting every value
    pub fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// Closed bounds [lower, upper]
    pub fn new(lower: T, upper: T) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// Parse a `lower:upper` restriction string where either side may be empty
    pub fn parse_restrictions(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::unbounded());
        }
        let (lo, hi) = s
            .split_once(':')
            .ok_or_else(|| format!("restriction '{}' is not of the form lower:upper", s))?;
        let side = |part: &str| -> Result<Option<T>, String> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            T::parse_literal(part)
                .map(Some)
                .ok_or_else(|| format!("'{}' is not a valid {} bound", part, T::TYPE_NAME))
        };
        Ok(Self {
            lower: side(lo)?,
            upper: side(hi)?,
        })
    }

    /// Whether `value` lies within the bounds; unset values are always valid
    pub fn validate(&self, value: Option<T>) -> bool {
        let Some(v) = value else {
            return true;
        };
        self.lower.map_or(true, |lo| lo <= v) && self.upper.map_or(true, |hi| v <= hi)
    }

    pub(crate) fn describe(&self) -> String {
        let side = |b: Option<T>| b.map(|v| v.to_string()).unwrap_or_default();
        format!("[{}:{}]", side(self.lower), side(self.upper))
    }
}

impl<T: NumberLiteral> Default for Bounds<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Parse `s` as a `T` within `bounds`, describing the violation on failure
pub(crate) fn parse_bounded<T: NumberLiteral>(s: &str, bounds: &Bounds<T>) -> Result<T, String> {
    let v = T::parse_literal(s)
        .ok_or_else(|| format!("'{}' is not a valid {}", s, T::TYPE_NAME))?;
    if !bounds.validate(Some(v)) {
        return Err(format!("{} is outside of {}", v, bounds.describe()));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_literals() {
        assert_eq!(i64::parse_literal("42"), Some(42));
        assert_eq!(i64::parse_literal(" -3 "), Some(-3));
        assert_eq!(i64::parse_literal("5e0"), Some(5));
        assert_eq!(i64::parse_literal("1.5"), None);
        assert_eq!(i64::parse_literal("abc"), None);
    }

    #[test]
    fn test_double_scientific_format() {
        assert_eq!(1.5f64.format_literal(), "1.5e0");
        assert_eq!(0.001f64.format_literal(), "1e-3");
        assert_eq!(f64::parse_literal("1e-3"), Some(0.001));
        assert_eq!(f64::parse_literal("NaN"), None);
    }

    #[test]
    fn test_bounds_validate_inclusive() {
        let b = Bounds::new(0i64, 10);
        assert!(b.validate(Some(0)));
        assert!(b.validate(Some(10)));
        assert!(!b.validate(Some(-1)));
        assert!(!b.validate(Some(11)));
        assert!(b.validate(None));
    }

    #[test]
    fn test_bounds_property_over_range() {
        let b = Bounds::new(-5i64, 5);
        for v in -20..=20 {
            assert_eq!(b.validate(Some(v)), (-5..=5).contains(&v), "value {}", v);
        }
    }

    #[test]
    fn test_parse_restrictions_open_sides() {
        let b = Bounds::<f64>::parse_restrictions("0.5:").unwrap();
        assert_eq!(b.lower, Some(0.5));
        assert_eq!(b.upper, None);

        let b = Bounds::<i64>::parse_restrictions(":10").unwrap();
        assert_eq!(b.lower, None);
        assert_eq!(b.upper, Some(10));

        assert!(Bounds::<i64>::parse_restrictions("a:b").is_err());
        assert!(Bounds::<i64>::parse_restrictions("10").is_err());
    }

    #[test]
    fn test_parse_bounded_rejects_out_of_range() {
        let b = Bounds::new(0i64, 10);
        assert_eq!(parse_bounded("7", &b), Ok(7));
        assert!(parse_bounded("11", &b).unwrap_err().contains("outside"));
        assert!(parse_bounded("x", &b).unwrap_err().contains("not a valid integer"));
    }
}
