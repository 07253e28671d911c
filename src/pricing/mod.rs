//! Session Billing
//!
//! Converts table time and ordered items into a payable amount.
//! Pricing configuration is always passed in explicitly; nothing here reads
//! storage, so the management view and the in-match view share one result.
//!
//! Amounts cross this module as `f64` and every arithmetic step runs on
//! `rust_decimal::Decimal`.

mod bill;
mod rates;
mod session;

pub use bill::*;
pub use rates::*;
pub use session::*;

use rust_decimal::prelude::*;
use thiserror::Error;

/// Highest accepted base rate or menu price (VND).
pub const MAX_PRICE: f64 = 1_000_000_000.0;
/// Highest accepted time slot multiplier.
pub const MAX_MULTIPLIER: f64 = 10.0;
/// Highest quantity accepted in a single order request.
pub const MAX_QUANTITY: i32 = 9999;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BillingError {
    #[error("timestamp {0} ms is outside the supported calendar range")]
    TimestampOutOfRange(i64),

    #[error("amount {0} cannot be used for billing")]
    UnrepresentableAmount(f64),

    #[error("billing amount overflowed")]
    Overflow,
}

#[inline]
pub(crate) fn to_decimal(value: f64) -> Result<Decimal, BillingError> {
    Decimal::from_f64(value).ok_or(BillingError::UnrepresentableAmount(value))
}

#[inline]
pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{PriceConfig, PricingConfig, TimeSlot};
    use chrono::{FixedOffset, TimeZone};

    /// Venue zone used by the pricing tests (UTC+7).
    pub fn venue_tz() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    /// Epoch milliseconds for a wall-clock time on 2024-05-10 in the venue zone.
    pub fn at(hour: u32, minute: u32, second: u32) -> i64 {
        venue_tz()
            .with_ymd_and_hms(2024, 5, 10, hour, minute, second)
            .unwrap()
            .timestamp_millis()
    }

    pub fn slot(id: &str, start_hour: u32, end_hour: u32, multiplier: f64) -> TimeSlot {
        TimeSlot {
            id: id.to_string(),
            name: id.to_string(),
            start_hour,
            end_hour,
            multiplier,
        }
    }

    /// CAROM 60000/h with a 08-12 slot at 0.7 and nothing after noon.
    pub fn morning_discount() -> PricingConfig {
        PricingConfig {
            base_rates: PriceConfig::default(),
            time_slots: vec![slot("morning", 8, 12, 0.7)],
        }
    }
}
