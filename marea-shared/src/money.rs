//! Cents-precision money helpers. All platform amounts are `i32` cents.

/// Convert a dollar amount to whole cents, rounding to the nearest cent.
pub fn dollars_to_cents(dollars: f64) -> Option<i32> {
    if !dollars.is_finite() {
        return None;
    }
    Some((dollars * 100.0).round() as i32)
}

/// Platform commission on a subtotal, rounded to the nearest cent.
pub fn commission_cents(subtotal_cents: i32, rate: f64) -> i32 {
    (subtotal_cents as f64 * rate).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dollars_to_cents() {
        assert_eq!(dollars_to_cents(60.0), Some(6000));
        assert_eq!(dollars_to_cents(0.015), Some(2));
        assert_eq!(dollars_to_cents(f64::NAN), None);
    }

    #[test]
    fn test_commission_rounds_to_nearest_cent() {
        // 18% of 100 cents is exactly 18
        assert_eq!(commission_cents(100, 0.18), 18);
        // 18% of 105 cents is 18.9, rounds up
        assert_eq!(commission_cents(105, 0.18), 19);
        assert_eq!(commission_cents(0, 0.18), 0);
    }
}
