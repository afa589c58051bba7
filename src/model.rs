/// Row types shared by the ETL jobs, the screeners and the watchlist store.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ta::{Close, High, Low};

/// One trading day for one symbol, joined with institutional flows and
/// reference data. Flows default to 0 when the day has no institutional row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub symbol: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub foreign_net: f64,
    pub trust_net: f64,
    pub dealer_net: f64,
}

impl High for DailyBar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for DailyBar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for DailyBar {
    fn close(&self) -> f64 {
        self.close
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RevenueRecord {
    pub report_month: NaiveDate,
    pub symbol: String,
    pub rev_current: Option<f64>,
    pub yoy_pct: Option<f64>,
    pub yoy_accumulated_pct: Option<f64>,
}

/// Denormalized output row written to `strongbuy_indicators` /
/// `daily_stock_indicators`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub symbol: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub pct_change: Option<f64>,
    pub foreign_net: f64,
    pub trust_net: f64,
    pub yoy_pct: Option<f64>,
    #[sqlx(rename = "MA5")]
    pub ma5: Option<f64>,
    #[sqlx(rename = "MA10")]
    pub ma10: Option<f64>,
    #[sqlx(rename = "MA20")]
    pub ma20: Option<f64>,
    #[sqlx(rename = "MA60")]
    pub ma60: Option<f64>,
    #[sqlx(rename = "K")]
    pub k: Option<f64>,
    #[sqlx(rename = "D")]
    pub d: Option<f64>,
    #[sqlx(rename = "MACD_OSC")]
    pub macd_osc: Option<f64>,
    #[sqlx(rename = "DIF")]
    pub dif: Option<f64>,
    #[sqlx(rename = "MACD")]
    pub macd: Option<f64>,
    pub total_score: Option<i32>,
    pub signal_list: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct WatchlistMenu {
    pub id: i32,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct WatchlistItem {
    pub symbol: String,
    pub added_date: NaiveDate,
}
