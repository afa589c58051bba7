use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::config::Profile;
use crate::model::{DailyBar, IndicatorRow, RevenueRecord};

/// Tables used by the jobs. Raw tables are normally filled by the ingestion
/// scripts; creating them here lets a fresh database run the ETL end to end.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stock_info (
        symbol TEXT PRIMARY KEY,
        name TEXT,
        industry TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_prices (
        date DATE NOT NULL,
        symbol TEXT NOT NULL,
        open DOUBLE PRECISION,
        high DOUBLE PRECISION,
        low DOUBLE PRECISION,
        close DOUBLE PRECISION,
        volume BIGINT,
        PRIMARY KEY (date, symbol)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS institutional_investors (
        date DATE NOT NULL,
        symbol TEXT NOT NULL,
        foreign_net BIGINT,
        trust_net BIGINT,
        dealer_net BIGINT,
        PRIMARY KEY (date, symbol)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS monthly_revenue (
        report_month DATE NOT NULL,
        symbol TEXT NOT NULL,
        rev_current DOUBLE PRECISION,
        yoy_pct DOUBLE PRECISION,
        yoy_accumulated_pct DOUBLE PRECISION,
        PRIMARY KEY (report_month, symbol)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS watchlist_menus (
        id SERIAL PRIMARY KEY,
        username TEXT NOT NULL,
        name TEXT NOT NULL,
        UNIQUE (username, name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS watchlist_items (
        menu_id INTEGER NOT NULL REFERENCES watchlist_menus(id) ON DELETE CASCADE,
        symbol TEXT NOT NULL,
        added_date DATE NOT NULL DEFAULT CURRENT_DATE,
        PRIMARY KEY (menu_id, symbol)
    )
    "#,
];

fn indicator_table_ddl(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            date DATE NOT NULL,
            symbol TEXT NOT NULL,
            name TEXT,
            industry TEXT,
            open DOUBLE PRECISION,
            high DOUBLE PRECISION,
            low DOUBLE PRECISION,
            close DOUBLE PRECISION NOT NULL,
            volume DOUBLE PRECISION,
            pct_change DOUBLE PRECISION,
            foreign_net DOUBLE PRECISION,
            trust_net DOUBLE PRECISION,
            yoy_pct DOUBLE PRECISION,
            "MA5" DOUBLE PRECISION,
            "MA10" DOUBLE PRECISION,
            "MA20" DOUBLE PRECISION,
            "MA60" DOUBLE PRECISION,
            "K" DOUBLE PRECISION,
            "D" DOUBLE PRECISION,
            "MACD_OSC" DOUBLE PRECISION,
            "DIF" DOUBLE PRECISION,
            "MACD" DOUBLE PRECISION,
            total_score INTEGER,
            signal_list TEXT,
            PRIMARY KEY (date, symbol)
        )
        "#,
        table
    )
}

const INDICATOR_COLUMNS: &str = r#"date, symbol, name, industry, open, high, low, close, volume,
    pct_change, foreign_net, trust_net, yoy_pct, "MA5", "MA10", "MA20", "MA60",
    "K", "D", "MACD_OSC", "DIF", "MACD", total_score, signal_list"#;

/// Create every table the jobs touch. Idempotent.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(pool).await.context("schema bootstrap failed")?;
    }
    for profile in [Profile::StrongBuy, Profile::Daily] {
        sqlx::query(&indicator_table_ddl(profile.table()))
            .execute(pool)
            .await
            .with_context(|| format!("creating {}", profile.table()))?;
    }
    Ok(())
}

/// Prices joined with institutional flows and reference data for
/// `[start, end]`, ordered by symbol then date.
///
/// `keep_unlisted` keeps symbols missing from `stock_info` (name and industry
/// come back NULL).
pub async fn fetch_daily_bars(
    pool: &PgPool,
    start: NaiveDate,
    end: NaiveDate,
    keep_unlisted: bool,
) -> Result<Vec<DailyBar>> {
    let join = if keep_unlisted { "LEFT JOIN" } else { "JOIN" };
    let sql = format!(
        r#"
        SELECT sp.date, TRIM(sp.symbol) AS symbol, si.name, si.industry,
               COALESCE(sp.open, sp.close)::DOUBLE PRECISION AS open,
               COALESCE(sp.high, sp.close)::DOUBLE PRECISION AS high,
               COALESCE(sp.low, sp.close)::DOUBLE PRECISION AS low,
               sp.close::DOUBLE PRECISION AS close,
               COALESCE(sp.volume, 0)::DOUBLE PRECISION AS volume,
               COALESCE(ii.foreign_net, 0)::DOUBLE PRECISION AS foreign_net,
               COALESCE(ii.trust_net, 0)::DOUBLE PRECISION AS trust_net,
               COALESCE(ii.dealer_net, 0)::DOUBLE PRECISION AS dealer_net
        FROM stock_prices sp
        LEFT JOIN institutional_investors ii ON sp.date = ii.date AND sp.symbol = ii.symbol
        {} stock_info si ON sp.symbol = si.symbol
        WHERE sp.date >= $1 AND sp.date <= $2 AND sp.close IS NOT NULL
        ORDER BY sp.symbol, sp.date
        "#,
        join
    );
    let bars = sqlx::query_as::<_, DailyBar>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
        .context("fetching stock prices")?;
    debug!("fetched {} price rows between {} and {}", bars.len(), start, end);
    Ok(bars)
}

pub async fn fetch_revenue(pool: &PgPool, start: NaiveDate, end: NaiveDate) -> Result<Vec<RevenueRecord>> {
    let records = sqlx::query_as::<_, RevenueRecord>(
        r#"
        SELECT report_month, TRIM(symbol) AS symbol,
               rev_current::DOUBLE PRECISION AS rev_current,
               yoy_pct::DOUBLE PRECISION AS yoy_pct,
               yoy_accumulated_pct::DOUBLE PRECISION AS yoy_accumulated_pct
        FROM monthly_revenue
        WHERE report_month >= $1 AND report_month <= $2
        ORDER BY symbol, report_month
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .context("fetching monthly revenue")?;
    Ok(records)
}

/// The most recent `n` distinct trading dates in `stock_prices`, newest first.
pub async fn recent_trading_dates(pool: &PgPool, n: i64) -> Result<Vec<NaiveDate>> {
    let dates: Vec<NaiveDate> =
        sqlx::query_scalar("SELECT DISTINCT date FROM stock_prices ORDER BY date DESC LIMIT $1")
            .bind(n)
            .fetch_all(pool)
            .await?;
    Ok(dates)
}

/// Date span covered by `rows`, or `None` when empty.
pub fn date_span(rows: &[IndicatorRow]) -> Option<(NaiveDate, NaiveDate)> {
    let min = rows.iter().map(|r| r.date).min()?;
    let max = rows.iter().map(|r| r.date).max()?;
    Some((min, max))
}

/// Overwrite the derived table between the earliest and latest date in `rows`.
///
/// Rows outside that span are never touched, so a backfill with an older
/// as-of date keeps later results. The delete and all inserts share one
/// transaction; any failure leaves the previous contents in place.
pub async fn replace_indicators(
    pool: &PgPool,
    profile: Profile,
    rows: &[IndicatorRow],
    chunk_size: usize,
) -> Result<u64> {
    let Some((min_date, max_date)) = date_span(rows) else {
        info!("no indicator rows to write");
        return Ok(0);
    };
    let table = profile.table();

    let mut tx = pool.begin().await?;
    let deleted = sqlx::query(&format!("DELETE FROM {} WHERE date >= $1 AND date <= $2", table))
        .bind(min_date)
        .bind(max_date)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("clearing {} for {}..={}", table, min_date, max_date))?
        .rows_affected();
    debug!("deleted {} stale rows from {}", deleted, table);

    let mut inserted = 0u64;
    for chunk in rows.chunks(chunk_size.max(1)) {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", table, INDICATOR_COLUMNS));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.date)
                .push_bind(r.symbol.clone())
                .push_bind(r.name.clone())
                .push_bind(r.industry.clone())
                .push_bind(r.open)
                .push_bind(r.high)
                .push_bind(r.low)
                .push_bind(r.close)
                .push_bind(r.volume)
                .push_bind(r.pct_change)
                .push_bind(r.foreign_net)
                .push_bind(r.trust_net)
                .push_bind(r.yoy_pct)
                .push_bind(r.ma5)
                .push_bind(r.ma10)
                .push_bind(r.ma20)
                .push_bind(r.ma60)
                .push_bind(r.k)
                .push_bind(r.d)
                .push_bind(r.macd_osc)
                .push_bind(r.dif)
                .push_bind(r.macd)
                .push_bind(r.total_score)
                .push_bind(r.signal_list.clone());
        });
        inserted += qb.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Read back a derived table for `[start, end]`, ordered by symbol then date.
pub async fn fetch_indicators(
    pool: &PgPool,
    profile: Profile,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<IndicatorRow>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE date >= $1 AND date <= $2 ORDER BY symbol, date",
        INDICATOR_COLUMNS,
        profile.table()
    );
    let rows = sqlx::query_as::<_, IndicatorRow>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
        .with_context(|| format!("reading {}", profile.table()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_ddl_quotes_mixed_case_columns() {
        let ddl = indicator_table_ddl("strongbuy_indicators");
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS strongbuy_indicators"));
        for col in ["\"MA5\"", "\"K\"", "\"MACD_OSC\"", "\"DIF\"", "\"MACD\""] {
            assert!(ddl.contains(col), "missing {}", col);
            assert!(INDICATOR_COLUMNS.contains(col));
        }
        assert!(ddl.contains("PRIMARY KEY (date, symbol)"));
    }

    #[test]
    fn delete_span_is_bounded_by_written_rows() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
        let row = |d| IndicatorRow {
            date: day(d),
            symbol: "2330".to_string(),
            name: None,
            industry: None,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
            pct_change: None,
            foreign_net: 0.0,
            trust_net: 0.0,
            yoy_pct: None,
            ma5: None,
            ma10: None,
            ma20: None,
            ma60: None,
            k: None,
            d: None,
            macd_osc: None,
            dif: None,
            macd: None,
            total_score: None,
            signal_list: None,
        };
        assert_eq!(date_span(&[]), None);
        assert_eq!(date_span(&[row(7), row(3), row(20)]), Some((day(3), day(20))));
    }

    #[test]
    fn column_list_matches_bind_count() {
        assert_eq!(INDICATOR_COLUMNS.split(',').count(), 24);
    }
}
