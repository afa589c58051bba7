use chrono::{Duration, NaiveDate};
use stock_warroom::config::Profile;
use stock_warroom::model::{DailyBar, IndicatorRow, RevenueRecord};
use stock_warroom::pipeline::transform;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn bars(symbol: &str, days: i64, base: f64, step: f64) -> Vec<DailyBar> {
    (0..days)
        .map(|i| {
            let close = base + step * i as f64;
            DailyBar {
                date: start() + Duration::days(i),
                symbol: symbol.to_string(),
                name: Some(format!("{} Corp", symbol)),
                industry: Some("半導體業".to_string()),
                open: close - step / 2.0,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0 + 10.0 * i as f64,
                foreign_net: 50.0,
                trust_net: if i % 2 == 0 { 20.0 } else { -20.0 },
                dealer_net: 0.0,
            }
        })
        .collect()
}

fn market() -> Vec<DailyBar> {
    let mut all = bars("2330", 80, 100.0, 1.0);
    all.extend(bars("2317", 80, 200.0, -0.5));
    all
}

#[test]
fn test_transform_is_deterministic_and_order_independent() {
    let first = transform(market(), &[], Profile::StrongBuy, Some(30));
    let again = transform(market(), &[], Profile::StrongBuy, Some(30));
    assert_eq!(first, again);

    let mut reversed = market();
    reversed.reverse();
    let shuffled = transform(reversed, &[], Profile::StrongBuy, Some(30));
    assert_eq!(first, shuffled);

    // ordered by symbol, then date
    assert_eq!(first[0].symbol, "2317");
    assert_eq!(first[0].date, start());
    assert_eq!(first[80].symbol, "2330");
}

#[test]
fn test_only_scoring_window_gets_scores() {
    let rows = transform(market(), &[], Profile::StrongBuy, Some(30));
    let latest = start() + Duration::days(79);
    let cutoff = latest - Duration::days(30);

    assert_eq!(rows.len(), 160);
    for r in &rows {
        assert_eq!(r.total_score.is_some(), r.date >= cutoff, "{} {}", r.symbol, r.date);
        assert_eq!(r.signal_list.is_some(), r.date >= cutoff);
    }
}

#[test]
fn test_daily_profile_scores_latest_date_only() {
    let rows = transform(market(), &[], Profile::Daily, None);
    let latest = start() + Duration::days(79);

    let scored: Vec<_> = rows.iter().filter(|r| r.total_score.is_some()).collect();
    assert_eq!(scored.len(), 2);
    assert!(scored.iter().all(|r| r.date == latest));
    assert!(rows.iter().all(|r| r.yoy_pct.is_none()));
}

#[test]
fn test_uptrend_outscores_downtrend() {
    let rows = transform(market(), &[], Profile::StrongBuy, Some(30));
    let latest = start() + Duration::days(79);
    let score = |symbol: &str| {
        rows.iter()
            .find(|r| r.symbol == symbol && r.date == latest)
            .and_then(|r| r.total_score)
            .unwrap()
    };
    assert!(score("2330") > score("2317"));

    let up = rows.iter().find(|r| r.symbol == "2330" && r.date == latest).unwrap();
    let signals = up.signal_list.as_deref().unwrap();
    assert!(signals.contains("突破月線"), "{}", signals);
    assert!(up.ma60.is_some());
}

#[test]
fn test_warmup_columns_are_null() {
    let rows = transform(market(), &[], Profile::StrongBuy, Some(30));
    let first = &rows[0];
    assert_eq!(first.pct_change, None);
    assert_eq!(first.ma5, None);
    assert_eq!(first.ma60, None);
    assert!(first.dif.is_some());

    let day_five = &rows[4];
    assert!(day_five.ma5.is_some());
    assert_eq!(day_five.ma10, None);
}

#[test]
fn test_revenue_yoy_is_carried_for_strong_buy() {
    let revenue = vec![RevenueRecord {
        report_month: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
        symbol: "2330".to_string(),
        rev_current: Some(1.0e9),
        yoy_pct: Some(25.0),
        yoy_accumulated_pct: Some(12.0),
    }];
    let rows = transform(market(), &revenue, Profile::StrongBuy, Some(30));

    let tsmc = rows.iter().filter(|r| r.symbol == "2330");
    assert!(tsmc.clone().all(|r| r.yoy_pct == Some(25.0)));
    let other = rows.iter().find(|r| r.symbol == "2317").unwrap();
    assert_eq!(other.yoy_pct, Some(0.0));
}

fn report(symbol: &str, month: NaiveDate, rev: f64, yoy: f64, accumulated: f64) -> RevenueRecord {
    RevenueRecord {
        report_month: month,
        symbol: symbol.to_string(),
        rev_current: Some(rev),
        yoy_pct: Some(yoy),
        yoy_accumulated_pct: Some(accumulated),
    }
}

fn latest_signals<'a>(rows: &'a [IndicatorRow], symbol: &str) -> &'a str {
    let latest = start() + Duration::days(79);
    rows.iter()
        .find(|r| r.symbol == symbol && r.date == latest)
        .and_then(|r| r.signal_list.as_deref())
        .unwrap()
}

#[test]
fn test_revenue_high_and_growth_streak_signals() {
    let month = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap();
    let mut revenue = vec![
        report("2330", month(2023, 10), 100.0, 5.0, 18.0),
        report("2330", month(2023, 11), 90.0, 6.0, 19.0),
        report("2330", month(2023, 12), 120.0, 10.0, 25.0),
    ];
    let rows = transform(market(), &revenue, Profile::StrongBuy, Some(30));
    let signals = latest_signals(&rows, "2330");
    assert!(signals.ends_with("🔥營收創歷史新高, 營收連3月成長, 累計年增25.00%"), "{}", signals);
    assert!(!latest_signals(&rows, "2317").contains("營收"));

    // a weaker February report replaces December for every scored row
    revenue.push(report("2330", month(2024, 2), 80.0, -3.0, 15.0));
    let rows = transform(market(), &revenue, Profile::StrongBuy, Some(30));
    let signals = latest_signals(&rows, "2330");
    assert!(!signals.contains("營收"), "{}", signals);
    assert!(!signals.contains("累計年增"), "{}", signals);
}

#[test]
fn test_weekly_red_streak_signal() {
    let rows = transform(market(), &[], Profile::StrongBuy, Some(30));

    // 2024-03-20 sees the eleven red weeks closed by Friday 2024-03-15
    assert!(latest_signals(&rows, "2330").contains("🔥週K連11紅"));
    let thursday = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
    let row = rows.iter().find(|r| r.symbol == "2330" && r.date == thursday).unwrap();
    assert!(row.signal_list.as_deref().unwrap().contains("🔥週K連10紅"));

    assert!(!latest_signals(&rows, "2317").contains("週K"));
}

#[test]
fn test_daily_trust_streak_and_ranks() {
    let mut bars = market();
    for b in bars.iter_mut() {
        let day = (b.date - start()).num_days();
        match b.symbol.as_str() {
            "2330" if day >= 76 => b.trust_net = 100.0,
            "2317" if day == 79 => b.trust_net = 30.0,
            _ => {}
        }
    }
    let rows = transform(bars, &[], Profile::Daily, None);

    let tsmc = latest_signals(&rows, "2330");
    assert!(tsmc.ends_with("投信連買超4天, 投信今日買超第1名, 投信近5日買超第1名"), "{}", tsmc);

    let hon_hai = latest_signals(&rows, "2317");
    assert!(hon_hai.ends_with("投信今日買超第2名, 投信近5日買超第2名"), "{}", hon_hai);
    assert!(!hon_hai.contains("投信連買超"), "{}", hon_hai);
}
