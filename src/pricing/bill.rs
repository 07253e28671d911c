//! Service totals and bill assembly

use chrono::{DateTime, TimeZone};
use rust_decimal::prelude::*;

use super::{calculate_session_cost, resolve_rate, to_decimal, to_f64, BillingError, MINUTE_MS};
use crate::models::{CheckoutSummary, GameType, OrderItem, PricingConfig};

/// Sum of `price × quantity` over the ordered lines. Not rounded.
pub fn calculate_service_total(items: &[OrderItem]) -> Result<f64, BillingError> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| {
            let line = to_decimal(item.price)?
                .checked_mul(Decimal::from(item.quantity))
                .ok_or(BillingError::Overflow)?;
            total.checked_add(line).ok_or(BillingError::Overflow)
        })
        .map(to_f64)
}

/// Clamps a discount percentage into `[0, 100]`; non-finite input means no discount.
pub fn clamp_discount(percent: f64) -> f64 {
    if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// `(session_cost + service_total) × (1 - discount / 100)`.
///
/// The discount is re-clamped here. The result is not rounded again, so a
/// discount can leave a fractional amount.
pub fn assemble_bill(
    session_cost: f64,
    service_total: f64,
    discount_percent: f64,
) -> Result<f64, BillingError> {
    let subtotal = to_decimal(session_cost)?
        .checked_add(to_decimal(service_total)?)
        .ok_or(BillingError::Overflow)?;
    let discount = to_decimal(clamp_discount(discount_percent))?;

    subtotal
        .checked_mul(Decimal::ONE - discount / Decimal::ONE_HUNDRED)
        .map(to_f64)
        .ok_or(BillingError::Overflow)
}

/// All checkout figures for a table window ending at `now`, priced in
/// `now`'s time zone.
pub fn summarize_checkout<Tz: TimeZone>(
    pricing: &PricingConfig,
    game_type: GameType,
    start_ms: Option<i64>,
    orders: &[OrderItem],
    discount_percent: f64,
    now: &DateTime<Tz>,
) -> Result<CheckoutSummary, BillingError> {
    let tz = now.timezone();
    let end_ms = now.timestamp_millis();

    let session_cost = calculate_session_cost(pricing, start_ms, end_ms, game_type, &tz)?;
    let service_total = calculate_service_total(orders)?;
    let discount_percent = clamp_discount(discount_percent);

    Ok(CheckoutSummary {
        duration_minutes: start_ms
            .map(|start| (end_ms - start).max(0) / MINUTE_MS)
            .unwrap_or(0),
        hourly_rate: resolve_rate(pricing, game_type, end_ms, &tz)?,
        session_cost,
        service_total,
        discount_percent,
        total_amount: assemble_bill(session_cost, service_total, discount_percent)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::test_support::{at, morning_discount, venue_tz};

    fn line(menu_item_id: i64, price: f64, quantity: i32) -> OrderItem {
        OrderItem {
            menu_item_id,
            name: format!("item {}", menu_item_id),
            price,
            quantity,
        }
    }

    #[test]
    fn test_service_total() {
        assert_eq!(calculate_service_total(&[]), Ok(0.0));
        assert_eq!(calculate_service_total(&[line(4, 15000.0, 2)]), Ok(30000.0));
        assert_eq!(
            calculate_service_total(&[
                line(1, 20000.0, 1),
                line(7, 30000.0, 3),
                line(6, 5000.0, 4)
            ]),
            Ok(130000.0)
        );
    }

    #[test]
    fn test_service_total_ignores_order() {
        let items = vec![line(1, 20000.0, 1), line(2, 25000.0, 2), line(3, 10000.0, 5)];
        let mut reversed = items.clone();
        reversed.reverse();
        assert_eq!(calculate_service_total(&items), calculate_service_total(&reversed));
    }

    #[test]
    fn test_service_total_rejects_unbillable_lines() {
        assert_eq!(
            calculate_service_total(&[line(1, 1e30, 1)]),
            Err(BillingError::UnrepresentableAmount(1e30))
        );
        assert_eq!(
            calculate_service_total(&[line(1, 5e28, 1), line(2, 5e28, 1)]),
            Err(BillingError::Overflow)
        );
    }

    #[test]
    fn test_assemble_with_discount() {
        assert_eq!(assemble_bill(21000.0, 30000.0, 10.0), Ok(45900.0));
        assert_eq!(assemble_bill(21000.0, 30000.0, 0.0), Ok(51000.0));
        assert_eq!(assemble_bill(21000.0, 30000.0, 100.0), Ok(0.0));
    }

    #[test]
    fn test_assemble_keeps_fraction() {
        assert_eq!(assemble_bill(1000.0, 0.0, 33.5), Ok(665.0));
        assert_eq!(assemble_bill(21000.0, 5000.0, 12.5), Ok(22750.0));
        assert_eq!(assemble_bill(1000.0, 15.0, 10.0), Ok(913.5));
    }

    #[test]
    fn test_discount_clamped() {
        assert_eq!(clamp_discount(-5.0), 0.0);
        assert_eq!(clamp_discount(150.0), 100.0);
        assert_eq!(clamp_discount(f64::NAN), 0.0);
        assert_eq!(clamp_discount(f64::INFINITY), 0.0);
        assert_eq!(clamp_discount(42.0), 42.0);

        assert_eq!(assemble_bill(21000.0, 30000.0, -20.0), Ok(51000.0));
        assert_eq!(assemble_bill(21000.0, 30000.0, 250.0), Ok(0.0));
    }

    #[test]
    fn test_summarize_checkout() {
        let pricing = morning_discount();
        let now = venue_tz().timestamp_millis_opt(at(9, 30, 0)).unwrap();
        let orders = vec![line(4, 15000.0, 2)];

        let start = Some(at(9, 0, 0));

        let summary =
            summarize_checkout(&pricing, GameType::Carom, start, &orders, 10.0, &now).unwrap();

        assert_eq!(
            summary,
            CheckoutSummary {
                duration_minutes: 30,
                hourly_rate: 42000.0,
                session_cost: 21000.0,
                service_total: 30000.0,
                discount_percent: 10.0,
                total_amount: 45900.0,
            }
        );

        let again =
            summarize_checkout(&pricing, GameType::Carom, start, &orders, 10.0, &now).unwrap();
        assert_eq!(summary, again);
    }

    #[test]
    fn test_summarize_without_session() {
        let pricing = morning_discount();
        let now = venue_tz().timestamp_millis_opt(at(13, 0, 0)).unwrap();

        let orders = [line(3, 10000.0, 1)];

        let summary =
            summarize_checkout(&pricing, GameType::Pool, None, &orders, 0.0, &now).unwrap();

        assert_eq!(summary.duration_minutes, 0);
        assert_eq!(summary.hourly_rate, 80000.0);
        assert_eq!(summary.session_cost, 0.0);
        assert_eq!(summary.total_amount, 10000.0);
    }
}
