//! Session Cost Calculator
//!
//! Integrates table time into a cost, honoring rate changes at slot
//! boundaries, then rounds up to the billing unit.

use chrono::TimeZone;
use rust_decimal::Decimal;

use super::{hourly_rate, to_f64, BillingError};
use crate::models::{GameType, PricingConfig};

pub const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

/// Session costs are charged in whole multiples of this amount.
pub const ROUNDING_UNIT: Decimal = Decimal::ONE_THOUSAND;

/// Unrounded cost of `[start_ms, end_ms)`.
///
/// The window is split into whole-minute segments from `start_ms`, the last
/// one possibly shorter. Each segment is charged at the rate in effect at the
/// segment's start. Segments accrue as `rate × elapsed ms` and the sum is
/// divided once, which equals summing `minutes × rate / 60` per segment
/// without losing exactness to repeated division.
///
/// Fails with [`BillingError::Overflow`] instead of panicking when the
/// accrued amount leaves the `Decimal` range.
pub fn raw_session_cost<Tz: TimeZone>(
    pricing: &PricingConfig,
    start_ms: i64,
    end_ms: i64,
    game_type: GameType,
    tz: &Tz,
) -> Result<Decimal, BillingError> {
    let mut accrued = Decimal::ZERO;
    let mut cursor = start_ms;

    while cursor < end_ms {
        let next = cursor.saturating_add(MINUTE_MS).min(end_ms);
        let rate = hourly_rate(pricing, game_type, cursor, tz)?;
        let charge = rate
            .checked_mul(Decimal::from(next - cursor))
            .ok_or(BillingError::Overflow)?;
        accrued = accrued.checked_add(charge).ok_or(BillingError::Overflow)?;
        cursor = next;
    }

    Ok(accrued / Decimal::from(HOUR_MS))
}

/// Rounds `raw` up to the next multiple of [`ROUNDING_UNIT`].
pub fn round_up_to_unit(raw: Decimal) -> Decimal {
    (raw / ROUNDING_UNIT).ceil() * ROUNDING_UNIT
}

/// Rounded cost of a table session.
///
/// A session that never started (`start_ms` is `None`) or an empty or
/// inverted window costs nothing.
pub fn calculate_session_cost<Tz: TimeZone>(
    pricing: &PricingConfig,
    start_ms: Option<i64>,
    end_ms: i64,
    game_type: GameType,
    tz: &Tz,
) -> Result<f64, BillingError> {
    let Some(start_ms) = start_ms else {
        return Ok(0.0);
    };
    if end_ms <= start_ms {
        return Ok(0.0);
    }

    let raw = raw_session_cost(pricing, start_ms, end_ms, game_type, tz)?;
    Ok(to_f64(round_up_to_unit(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceConfig;
    use crate::pricing::test_support::{at, morning_discount, slot, venue_tz};
    use rust_decimal::prelude::FromPrimitive;

    fn cost(
        pricing: &PricingConfig,
        start_ms: Option<i64>,
        end_ms: i64,
        game_type: GameType,
    ) -> Result<f64, BillingError> {
        calculate_session_cost(pricing, start_ms, end_ms, game_type, &venue_tz())
    }

    fn raw(pricing: &PricingConfig, start_ms: i64, end_ms: i64, game_type: GameType) -> Decimal {
        raw_session_cost(pricing, start_ms, end_ms, game_type, &venue_tz()).unwrap()
    }

    #[test]
    fn test_half_hour_in_morning_slot() {
        let pricing = morning_discount();
        let cost = cost(&pricing, Some(at(9, 0, 0)), at(9, 30, 0), GameType::Carom);
        assert_eq!(cost, Ok(21000.0));
    }

    #[test]
    fn test_session_straddling_slot_boundary() {
        let pricing = morning_discount();

        let unrounded = raw(&pricing, at(11, 45, 0), at(12, 15, 0), GameType::Carom);
        assert_eq!(unrounded, Decimal::from(25500));

        let cost = cost(&pricing, Some(at(11, 45, 0)), at(12, 15, 0), GameType::Carom);
        assert_eq!(cost, Ok(26000.0));
    }

    #[test]
    fn test_zero_cost_cases() {
        let pricing = morning_discount();
        let start = at(9, 0, 0);

        assert_eq!(cost(&pricing, Some(start), start, GameType::Pool), Ok(0.0));
        assert_eq!(cost(&pricing, None, at(10, 0, 0), GameType::Pool), Ok(0.0));
        assert_eq!(cost(&pricing, Some(start), start - MINUTE_MS, GameType::Pool), Ok(0.0));
    }

    #[test]
    fn test_partial_minute_rounds_up_to_unit() {
        let pricing = morning_discount();

        // 30 seconds at 700/min
        let unrounded = raw(&pricing, at(9, 0, 0), at(9, 0, 30), GameType::Carom);
        assert_eq!(unrounded, Decimal::from(350));

        let cost = cost(&pricing, Some(at(9, 0, 0)), at(9, 0, 30), GameType::Carom);
        assert_eq!(cost, Ok(1000.0));
    }

    #[test]
    fn test_segment_priced_at_its_start() {
        let pricing = morning_discount();

        // Starts 30s before noon: every segment begins 30s past a minute, so
        // the segment beginning 11:59:30 is charged entirely at the slot rate.
        let unrounded = raw(&pricing, at(11, 59, 30), at(12, 0, 30), GameType::Carom);
        assert_eq!(unrounded, Decimal::from(700));
    }

    #[test]
    fn test_rates_not_dividing_by_sixty_stay_exact() {
        let pricing = PricingConfig {
            base_rates: PriceConfig {
                carom: 100000.0,
                pool: 70000.0,
                libre: 50000.0,
            },
            time_slots: vec![],
        };

        for (game_type, expected) in [
            (GameType::Carom, 100000.0),
            (GameType::Pool, 70000.0),
            (GameType::Libre, 50000.0),
        ] {
            let cost = cost(&pricing, Some(at(14, 0, 0)), at(15, 0, 0), game_type);
            assert_eq!(cost, Ok(expected), "{:?}", game_type);
        }
    }

    #[test]
    fn test_long_session_across_several_slots() {
        let pricing = PricingConfig {
            base_rates: PriceConfig::default(),
            time_slots: vec![slot("morning", 8, 12, 0.7), slot("evening", 18, 22, 1.5)],
        };

        // 10:00-20:00 POOL: 2h at 56000, 6h at 80000, 2h at 120000
        let unrounded = raw(&pricing, at(10, 0, 0), at(20, 0, 0), GameType::Pool);
        assert_eq!(unrounded, Decimal::from(112000 + 480000 + 240000));
    }

    #[test]
    fn test_cost_is_monotonic_in_end_time() {
        let pricing = morning_discount();
        let start = at(10, 47, 13);

        let mut previous = 0.0;
        let mut end = start;
        while end < at(13, 30, 0) {
            let cost = cost(&pricing, Some(start), end, GameType::Libre).unwrap();
            assert!(cost >= previous, "cost dropped at end={}: {} < {}", end, cost, previous);
            previous = cost;
            end += 37_000;
        }
    }

    #[test]
    fn test_rounding_policy() {
        assert_eq!(round_up_to_unit(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(round_up_to_unit(Decimal::from(21000)), Decimal::from(21000));
        assert_eq!(round_up_to_unit(Decimal::from(25500)), Decimal::from(26000));
        assert_eq!(
            round_up_to_unit(Decimal::from_f64(0.0001).unwrap()),
            Decimal::from(1000)
        );

        for raw in ["1", "999", "1000.5", "41666.67", "123456.789"] {
            let raw: Decimal = raw.parse().unwrap();
            let rounded = round_up_to_unit(raw);
            assert_eq!(rounded % ROUNDING_UNIT, Decimal::ZERO);
            assert!(rounded >= raw && rounded - raw < ROUNDING_UNIT);
        }
    }

    #[test]
    fn test_overflow_is_an_error() {
        let pricing = PricingConfig {
            base_rates: PriceConfig {
                carom: 1e22,
                ..PriceConfig::default()
            },
            time_slots: vec![],
        };

        // 200 one-minute segments of 6e26 each exceed the Decimal range
        let result = cost(&pricing, Some(at(14, 0, 0)), at(17, 20, 0), GameType::Carom);
        assert_eq!(result, Err(BillingError::Overflow));
    }

    #[test]
    fn test_same_inputs_same_cost() {
        let pricing = morning_discount();
        let first = cost(&pricing, Some(at(11, 3, 17)), at(12, 41, 5), GameType::Carom);
        let second = cost(&pricing, Some(at(11, 3, 17)), at(12, 41, 5), GameType::Carom);
        assert_eq!(first, second);
    }
}
