use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{AppError, AppResult};
use crate::pricing::{MAX_MULTIPLIER, MAX_PRICE};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameType {
    Carom,
    Pool,
    Libre,
}

impl GameType {
    pub const ALL: [GameType; 3] = [GameType::Carom, GameType::Pool, GameType::Libre];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Carom => "CAROM",
            GameType::Pool => "POOL",
            GameType::Libre => "LIBRE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableStatus {
    Available,
    Occupied,
    Maintenance,
    Locked,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "AVAILABLE",
            TableStatus::Occupied => "OCCUPIED",
            TableStatus::Maintenance => "MAINTENANCE",
            TableStatus::Locked => "LOCKED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            TableStatus::Available,
            TableStatus::Occupied,
            TableStatus::Maintenance,
            TableStatus::Locked,
        ]
        .into_iter()
        .find(|s| s.as_str() == value)
    }
}

/// Base hourly rate per game type. Every game type always has a rate, so a
/// lookup can never miss; stored JSON missing a key fails to deserialize.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PriceConfig {
    #[serde(rename = "CAROM")]
    pub carom: f64,
    #[serde(rename = "POOL")]
    pub pool: f64,
    #[serde(rename = "LIBRE")]
    pub libre: f64,
}

impl PriceConfig {
    pub fn rate(&self, game_type: GameType) -> f64 {
        match game_type {
            GameType::Carom => self.carom,
            GameType::Pool => self.pool,
            GameType::Libre => self.libre,
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        PriceConfig {
            carom: 60000.0,
            pool: 80000.0,
            libre: 50000.0,
        }
    }
}

/// Recurring daily hour range `[start_hour, end_hour)` in venue local time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimeSlot {
    pub id: String,
    pub name: String,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Below 1.0 is a discount, above 1.0 a surcharge.
    pub multiplier: f64,
}

impl TimeSlot {
    pub fn contains_hour(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PricingConfig {
    pub base_rates: PriceConfig,
    pub time_slots: Vec<TimeSlot>,
}

impl PricingConfig {
    /// Checks the configuration before it is stored or used for billing.
    ///
    /// Slots whose end hour is not after the start hour are rejected: the
    /// matching rule cannot express a range across midnight.
    pub fn validate(&self) -> AppResult<()> {
        for game_type in GameType::ALL {
            let rate = self.base_rates.rate(game_type);
            if !rate.is_finite() || rate < 0.0 {
                return Err(AppError::InvalidPricing(format!(
                    "base rate for {} must be a non-negative number, got {}",
                    game_type.as_str(),
                    rate
                )));
            }
            if rate > MAX_PRICE {
                return Err(AppError::InvalidPricing(format!(
                    "base rate for {} exceeds maximum allowed ({}), got {}",
                    game_type.as_str(),
                    MAX_PRICE,
                    rate
                )));
            }
        }

        let mut seen = HashSet::new();
        for slot in &self.time_slots {
            if !seen.insert(slot.id.as_str()) {
                return Err(AppError::InvalidPricing(format!(
                    "duplicate time slot id '{}'",
                    slot.id
                )));
            }
            if slot.start_hour > 23 || slot.end_hour > 24 {
                return Err(AppError::InvalidPricing(format!(
                    "time slot '{}' hours out of range: {}-{}",
                    slot.id, slot.start_hour, slot.end_hour
                )));
            }
            if slot.end_hour <= slot.start_hour {
                return Err(AppError::InvalidPricing(format!(
                    "time slot '{}' must end after it starts (no wrap past midnight)",
                    slot.id
                )));
            }
            if !slot.multiplier.is_finite() || slot.multiplier <= 0.0 {
                return Err(AppError::InvalidPricing(format!(
                    "time slot '{}' multiplier must be positive, got {}",
                    slot.id, slot.multiplier
                )));
            }
            if slot.multiplier > MAX_MULTIPLIER {
                return Err(AppError::InvalidPricing(format!(
                    "time slot '{}' multiplier exceeds maximum allowed ({}), got {}",
                    slot.id, MAX_MULTIPLIER, slot.multiplier
                )));
            }
        }

        Ok(())
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            base_rates: PriceConfig::default(),
            time_slots: vec![
                TimeSlot {
                    id: "morning".to_string(),
                    name: "Morning (08:00 - 12:00)".to_string(),
                    start_hour: 8,
                    end_hour: 12,
                    multiplier: 0.7,
                },
                TimeSlot {
                    id: "evening".to_string(),
                    name: "Evening (18:00 - 22:00)".to_string(),
                    start_hour: 18,
                    end_hour: 22,
                    multiplier: 1.0,
                },
            ],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MenuCategory {
    Drink,
    Food,
    Other,
}

impl MenuCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuCategory::Drink => "drink",
            MenuCategory::Food => "food",
            MenuCategory::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [MenuCategory::Drink, MenuCategory::Food, MenuCategory::Other]
            .into_iter()
            .find(|c| c.as_str() == value)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub category: MenuCategory,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMenuItem {
    pub name: String,
    pub price: f64,
    pub category: MenuCategory,
}

/// A line charged to a table. `price` is the menu price captured when the
/// line was first ordered.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderItem {
    pub menu_item_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Table {
    pub id: i64,
    pub name: String,
    pub game_type: GameType,
    pub status: TableStatus,
    /// Epoch milliseconds, set while the table is occupied.
    pub start_time: Option<i64>,
    pub camera_url: Option<String>,
    pub camera_status: Option<String>,
    pub password: Option<String>,
    pub orders: Vec<OrderItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTable {
    pub name: String,
    pub game_type: GameType,
    pub camera_url: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTable {
    pub id: i64,
    pub name: String,
    pub game_type: GameType,
    pub camera_url: Option<String>,
    pub password: Option<String>,
}

/// Live billing figures for an occupied table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CheckoutSummary {
    pub duration_minutes: i64,
    /// Hourly rate in effect at the end of the window.
    pub hourly_rate: f64,
    pub session_cost: f64,
    pub service_total: f64,
    pub discount_percent: f64,
    pub total_amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Bill {
    pub id: i64,
    pub table_id: i64,
    pub table_name: String,
    pub game_type: GameType,
    pub start_time: i64,
    pub end_time: i64,
    pub duration_minutes: i64,
    pub hourly_rate: f64,
    pub session_cost: f64,
    pub service_total: f64,
    pub discount_percent: f64,
    pub total_amount: f64,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaySummary {
    pub date: String,
    pub total_revenue: f64,
    pub total_bills: i32,
    pub bills: Vec<Bill>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatchRecord {
    pub id: i64,
    pub played_at: String,
    pub game_type: GameType,
    pub sub_type: Option<String>,
    pub player1_name: String,
    pub player2_name: String,
    pub score1: i32,
    pub score2: i32,
    /// `None` when the match ended level.
    pub winner_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMatchRecord {
    pub game_type: GameType,
    pub sub_type: Option<String>,
    pub player1_name: String,
    pub player2_name: String,
    pub score1: i32,
    pub score2: i32,
}
