// ==========================================
// ITS Stock Ledger - quantity helpers
// ==========================================
// All comparisons between stored quantities go through a tolerance so
// that f64 sums such as 0.1 + 0.2 compare equal to 0.3.
// ==========================================

use crate::engine::error::{RuleResult, RuleViolation};

/// `value` is finite and strictly positive
pub fn ensure_positive(field: &str, value: f64) -> RuleResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(RuleViolation::InvalidQuantity {
            field: field.to_string(),
            value,
        })
    }
}

/// `value` is finite and >= 0
pub fn ensure_non_negative(field: &str, value: f64) -> RuleResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(RuleViolation::InvalidQuantity {
            field: field.to_string(),
            value,
        })
    }
}

/// Trimmed non-blank text
pub fn ensure_not_blank(field: &str, value: &str) -> RuleResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RuleViolation::BlankField {
            field: field.to_string(),
        })
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// `a > b` by more than the tolerance
pub fn exceeds(a: f64, b: f64, tolerance: f64) -> bool {
    a - b > tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_rejects_zero_negative_and_nan() {
        assert!(ensure_positive("q", 0.0).is_err());
        assert!(ensure_positive("q", -3.0).is_err());
        assert!(ensure_positive("q", f64::NAN).is_err());
        assert!(ensure_positive("q", f64::INFINITY).is_err());
        assert_eq!(ensure_positive("q", 12.5), Ok(12.5));
    }

    #[test]
    fn test_non_negative_accepts_zero() {
        assert_eq!(ensure_non_negative("delivered", 0.0), Ok(0.0));
        assert!(ensure_non_negative("delivered", -0.5).is_err());
    }

    #[test]
    fn test_tolerance_comparisons() {
        assert!(approx_eq(0.1 + 0.2, 0.3, 1e-6));
        assert!(!exceeds(0.1 + 0.2, 0.3, 1e-6));
        assert!(exceeds(100.01, 100.0, 1e-6));
        assert!(!approx_eq(99.9, 100.0, 1e-6));
    }

    #[test]
    fn test_blank_field() {
        assert_eq!(ensure_not_blank("vessel_name", "  MV SAHEL "), Ok("MV SAHEL".to_string()));
        assert!(ensure_not_blank("vessel_name", "   ").is_err());
    }
}
