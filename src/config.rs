use std::env;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

/// Which batch job a pipeline run reproduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Multi-source strong-buy scoring over the last month of trading days.
    StrongBuy,
    /// Technical + chip scoring for the most recent trading day only.
    Daily,
}

impl Profile {
    pub fn table(&self) -> &'static str {
        match self {
            Profile::StrongBuy => "strongbuy_indicators",
            Profile::Daily => "daily_stock_indicators",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub profile: Profile,
    /// Calendar days of price history pulled before `as_of`.
    pub price_lookback_days: i64,
    /// Calendar days of monthly revenue pulled before `as_of`; 0 disables revenue.
    pub revenue_lookback_days: i64,
    /// Rows dated within this many calendar days of the latest date get a score.
    /// `None` scores the latest date only.
    pub score_window_days: Option<i64>,
    /// Keep symbols that have no `stock_info` row.
    pub keep_unlisted: bool,
    pub insert_chunk_size: usize,
    pub as_of: NaiveDate,
}

impl EtlConfig {
    pub fn strong_buy(as_of: NaiveDate) -> Self {
        Self {
            profile: Profile::StrongBuy,
            price_lookback_days: 150,
            revenue_lookback_days: 400,
            score_window_days: Some(30),
            keep_unlisted: true,
            insert_chunk_size: 2000,
            as_of,
        }
    }

    pub fn daily(as_of: NaiveDate) -> Self {
        Self {
            profile: Profile::Daily,
            price_lookback_days: 200,
            revenue_lookback_days: 0,
            score_window_days: None,
            keep_unlisted: false,
            insert_chunk_size: 2000,
            as_of,
        }
    }

    pub fn price_start(&self) -> NaiveDate {
        self.as_of - chrono::Duration::days(self.price_lookback_days)
    }

    pub fn revenue_start(&self) -> NaiveDate {
        self.as_of - chrono::Duration::days(self.revenue_lookback_days)
    }

    pub fn wants_revenue(&self) -> bool {
        self.revenue_lookback_days > 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.price_lookback_days <= 0 {
            bail!("price lookback must be positive, got {}", self.price_lookback_days);
        }
        if let Some(days) = self.score_window_days.filter(|d| *d < 0) {
            bail!("scoring window must not be negative, got {}", days);
        }
        // one chunk binds 24 values per row
        if self.insert_chunk_size == 0 || self.insert_chunk_size * 24 > 65_535 {
            bail!("insert chunk size {} out of range (1..=2730)", self.insert_chunk_size);
        }
        Ok(())
    }
}

/// Resolve the Postgres URL from the environment (`.env` is honoured).
pub fn database_url() -> Result<String> {
    dotenv::dotenv().ok();
    env::var("SUPABASE_DB_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .context("SUPABASE_DB_URL is not set; export it or add it to .env")
}

/// Parse a `YYYY-MM-DD` CLI date, defaulting to today.
pub fn parse_as_of(value: Option<&str>) -> Result<NaiveDate> {
    match value {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s)),
        None => Ok(chrono::Local::now().date_naive()),
    }
}
