use marea_shared::money::commission_cents;
use marea_shared::Route;
use serde::{Deserialize, Serialize};

/// Platform commission charged on every live ride, as a fraction of the
/// subtotal.
pub const COMMISSION_RATE: f64 = 0.18;

/// Flat platform hourly rate for a route, in cents. Live rides do not use
/// per-boat pricing; every boat on a route bills the same rate.
pub fn hourly_rate_cents(route: Route) -> i32 {
    match route {
        Route::Rumbo1 => 60_00,
        Route::Rumbo2 => 80_00,
        Route::Rumbo3 => 100_00,
    }
}

/// A priced live ride: the numbers frozen onto the request at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveRideQuote {
    pub hourly_rate_cents: i32,
    pub subtotal_cents: i32,
    pub commission_cents: i32,
    pub total_cents: i32,
}

impl LiveRideQuote {
    /// Quote a ride at the route's flat rate for the requested duration.
    pub fn for_ride(route: Route, hours: i32) -> Self {
        let hourly_rate_cents = hourly_rate_cents(route);
        let subtotal_cents = hourly_rate_cents * hours;
        let commission = commission_cents(subtotal_cents, COMMISSION_RATE);
        Self {
            hourly_rate_cents,
            subtotal_cents,
            commission_cents: commission,
            total_cents: subtotal_cents + commission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_rate_table() {
        assert_eq!(hourly_rate_cents(Route::Rumbo1), 6000);
        assert_eq!(hourly_rate_cents(Route::Rumbo2), 8000);
        assert_eq!(hourly_rate_cents(Route::Rumbo3), 10000);
    }

    #[test]
    fn test_quote_for_minimum_ride() {
        let quote = LiveRideQuote::for_ride(Route::Rumbo1, 4);
        assert_eq!(quote.hourly_rate_cents, 6000);
        assert_eq!(quote.subtotal_cents, 24000);
        // round(24000 * 0.18) = 4320
        assert_eq!(quote.commission_cents, 4320);
        assert_eq!(quote.total_cents, 28320);
    }

    #[test]
    fn test_commission_rounding_property() {
        // Canonical rounding check: subtotal 100 at 18% is exactly 18.
        let commission = marea_shared::money::commission_cents(100, COMMISSION_RATE);
        assert_eq!(commission, 18);
        assert_eq!(100 + commission, 118);
    }
}
