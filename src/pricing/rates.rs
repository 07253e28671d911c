//! Rate Resolver
//!
//! Picks the hourly rate for a game type at a point in time.

use chrono::{TimeZone, Timelike};
use rust_decimal::Decimal;

use super::{to_decimal, to_f64, BillingError};
use crate::models::{GameType, PricingConfig, TimeSlot};

/// Hour of day (0-23) of `timestamp_ms` in `tz`.
pub fn hour_of_day<Tz: TimeZone>(timestamp_ms: i64, tz: &Tz) -> Result<u32, BillingError> {
    tz.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.hour())
        .ok_or(BillingError::TimestampOutOfRange(timestamp_ms))
}

/// First slot, in configured order, whose `[start_hour, end_hour)` holds `hour`.
pub fn matching_slot(slots: &[TimeSlot], hour: u32) -> Option<&TimeSlot> {
    slots.iter().find(|slot| slot.contains_hour(hour))
}

pub(crate) fn hourly_rate<Tz: TimeZone>(
    pricing: &PricingConfig,
    game_type: GameType,
    timestamp_ms: i64,
    tz: &Tz,
) -> Result<Decimal, BillingError> {
    let hour = hour_of_day(timestamp_ms, tz)?;
    let base = to_decimal(pricing.base_rates.rate(game_type))?;

    match matching_slot(&pricing.time_slots, hour) {
        Some(slot) => base
            .checked_mul(to_decimal(slot.multiplier)?)
            .ok_or(BillingError::Overflow),
        None => Ok(base),
    }
}

/// Hourly rate in effect at `timestamp_ms`: base rate times the matching
/// slot multiplier, or the base rate when no slot matches. Not rounded.
pub fn resolve_rate<Tz: TimeZone>(
    pricing: &PricingConfig,
    game_type: GameType,
    timestamp_ms: i64,
    tz: &Tz,
) -> Result<f64, BillingError> {
    hourly_rate(pricing, game_type, timestamp_ms, tz).map(to_f64)
}
