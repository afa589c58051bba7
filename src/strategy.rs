/// Rule-based signal scoring.
///
/// A strategy is an ordered list of rules. Each rule that holds for a row adds
/// one point and contributes its trigger text (when non-empty) to the row's
/// signal list, in rule order.
use crate::features::Features;

pub enum Describe {
    Fixed(&'static str),
    Dynamic(fn(&Features) -> String),
}

pub struct Rule {
    pub condition: fn(&Features) -> bool,
    pub describe: Describe,
}

impl Rule {
    fn fixed(condition: fn(&Features) -> bool, text: &'static str) -> Self {
        Self { condition, describe: Describe::Fixed(text) }
    }

    fn dynamic(condition: fn(&Features) -> bool, describe: fn(&Features) -> String) -> Self {
        Self { condition, describe: Describe::Dynamic(describe) }
    }

    pub fn describe(&self, f: &Features) -> String {
        match &self.describe {
            Describe::Fixed(text) => (*text).to_string(),
            Describe::Dynamic(render) => render(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Evaluation {
    pub score: i32,
    pub signals: Vec<String>,
}

impl Evaluation {
    pub fn signal_list(&self) -> String {
        self.signals.join(", ")
    }
}

pub struct Strategy {
    pub name: &'static str,
    rules: Vec<Rule>,
}

fn rank_at_most(rank: Option<u32>, limit: u32) -> bool {
    rank.is_some_and(|r| r <= limit)
}

fn rank_text(rank: Option<u32>, template: &str) -> String {
    rank.map(|r| template.replace("{}", &r.to_string())).unwrap_or_default()
}

fn short_bull_stack(f: &Features) -> bool {
    f.bar.close > f.ma5 && f.ma5 > f.ma10 && f.ma10 > f.ma20
}

fn long_bull_stack(f: &Features) -> bool {
    f.bar.close > f.ma10 && f.ma10 > f.ma20 && f.ma20 > f.ma60
}

fn kd_golden_cross(f: &Features) -> bool {
    f.k > f.d && f.prev_k < f.prev_d
}

fn macd_turns_red(f: &Features) -> bool {
    f.macd_osc > 0.0 && f.prev_macd_osc < 0.0
}

fn surge_on_volume(f: &Features) -> bool {
    f.pct_change > 3.0 && f.bar.volume >= f.vol_max_3d
}

impl Strategy {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn evaluate(&self, f: &Features) -> Evaluation {
        let mut eval = Evaluation::default();
        for rule in &self.rules {
            if (rule.condition)(f) {
                eval.score += 1;
                let text = rule.describe(f);
                if !text.is_empty() {
                    eval.signals.push(text);
                }
            }
        }
        eval
    }

    /// Price, volume, oscillator, foreign-flow and monthly-revenue triggers
    /// used by the strong-buy board.
    pub fn strong_buy() -> Self {
        let rules = vec![
            Rule::dynamic(|f| f.bias_ma5 > 1.0, |f| format!("突破週線{:.2}%", f.bias_ma5)),
            Rule::dynamic(|f| f.bias_ma5 > 5.0, |f| format!("正乖離週線{:.2}%", f.bias_ma5)),
            Rule::dynamic(|f| f.bias_ma20 > 5.0, |f| format!("正乖離月線{:.2}%", f.bias_ma20)),
            Rule::dynamic(|f| f.bar.close > f.ma5, |f| format!("突破週線{:.2}%", f.bias_ma5)),
            Rule::dynamic(|f| f.bar.close > f.ma20, |f| format!("突破月線{:.2}%", f.bias_ma20)),
            Rule::dynamic(|f| f.bar.close > f.ma60, |f| format!("突破季線{:.2}%", f.bias_ma60)),
            Rule::fixed(|f| (f.bar.close - f.bar.open) / f.bar.open > 0.03, "盤中長紅>3%"),
            Rule::fixed(|f| f.bar.close >= f.high_3d, "創3日新高"),
            Rule::dynamic(|f| f.pct_change > 3.0, |f| format!("今日漲幅{:.2}%", f.pct_change)),
            Rule::dynamic(|f| f.pct_change_3d > 10.0, |f| format!("3天漲幅{:.2}%", f.pct_change_3d)),
            Rule::dynamic(|f| f.pct_change_5d > 15.0, |f| format!("5天漲幅{:.2}%", f.pct_change_5d)),
            Rule::fixed(|f| f.pct_change > 9.5, "🔥今日漲停"),
            Rule::fixed(surge_on_volume, "漲>3%且量創3日高"),
            Rule::dynamic(|f| rank_at_most(f.ranks.pct_1d, 10), |f| rank_text(f.ranks.pct_1d, "漲幅第{}名")),
            Rule::dynamic(|f| rank_at_most(f.ranks.pct_5d, 67), |f| rank_text(f.ranks.pct_5d, "5日漲幅第{}名")),
            Rule::dynamic(|f| f.w_red_streak >= 2, |f| format!("🔥週K連{}紅", f.w_red_streak)),
            Rule::dynamic(|f| f.days_above_ma20 >= 47, |f| format!("連{}日站月線", f.days_above_ma20)),
            Rule::dynamic(|f| f.days_above_ma60 >= 177, |f| format!("連{}日站季線", f.days_above_ma60)),
            Rule::fixed(short_bull_stack, "短線多頭排列"),
            Rule::fixed(long_bull_stack, "長線多頭排列"),
            Rule::dynamic(|f| f.vol_bias_ma5 > 31.0, |f| format!("較5日量增{:.1}%", f.vol_bias_ma5)),
            Rule::dynamic(|f| f.vol_bias_ma10 > 30.0, |f| format!("較10日量增{:.1}%", f.vol_bias_ma10)),
            Rule::dynamic(|f| f.vol_bias_ma20 > 40.0, |f| format!("較20日量增{:.1}%", f.vol_bias_ma20)),
            Rule::fixed(|f| f.bar.volume > f.vol_ma5, "量大於5日均量"),
            Rule::dynamic(
                |f| f.bar.volume > f.prev_volume * 1.5,
                |f| format!("量增{:.1}倍", f.bar.volume / f.prev_volume),
            ),
            Rule::fixed(|f| f.k > f.prev_k, "K值向上"),
            Rule::fixed(|f| f.k > f.d, "K>D多頭"),
            Rule::fixed(kd_golden_cross, "KD金叉"),
            Rule::fixed(|f| f.macd_osc > 0.0 && f.macd_osc > f.prev_macd_osc, "MACD紅柱延長"),
            Rule::fixed(|f| f.macd_osc < 0.0 && f.macd_osc > f.prev_macd_osc, "MACD綠柱縮短"),
            Rule::fixed(macd_turns_red, "MACD轉紅"),
            Rule::dynamic(|f| f.f_buy_streak >= 2, |f| format!("外資連買{}天", f.f_buy_streak)),
            Rule::dynamic(
                |f| rank_at_most(f.ranks.foreign_1d, 12),
                |f| rank_text(f.ranks.foreign_1d, "外資買超第{}名"),
            ),
            Rule::dynamic(
                |f| rank_at_most(f.ranks.foreign_5d, 22),
                |f| rank_text(f.ranks.foreign_5d, "外資5日買超第{}名"),
            ),
            Rule::fixed(|f| f.revenue.is_ath, "🔥營收創歷史新高"),
            Rule::dynamic(|f| f.revenue.yoy_streak >= 3, |f| format!("營收連{}月成長", f.revenue.yoy_streak)),
            Rule::dynamic(
                |f| f.revenue.yoy_accumulated_pct > 20.0,
                |f| format!("累計年增{:.2}%", f.revenue.yoy_accumulated_pct),
            ),
        ];
        Self { name: "strongbuy", rules }
    }

    /// Technical and institutional-flow triggers for the latest session.
    pub fn daily() -> Self {
        let rules = vec![
            Rule::dynamic(|f| f.bar.close > f.ma5, |f| format!("突破週線{:.2}%", f.bias_ma5)),
            Rule::fixed(|f| f.bar.close > f.ma20, "突破月線"),
            Rule::fixed(|f| f.bar.close > f.ma60, "突破季線"),
            Rule::fixed(|f| f.bar.close >= f.close_max_3d, "股價創下3日新高"),
            Rule::dynamic(|f| f.pct_change > 3.0, |f| format!("漲幅{:.2}%", f.pct_change)),
            Rule::fixed(|f| f.pct_change > 9.5, "🔥漲停"),
            Rule::fixed(short_bull_stack, "短線多頭排列"),
            Rule::fixed(long_bull_stack, "長線多頭排列"),
            Rule::dynamic(
                |f| f.days_above_ma20_47d >= 47.0,
                |f| format!("連{:.0}日站月線", f.days_above_ma20_47d),
            ),
            Rule::dynamic(|f| f.vol_bias_ma5 > 30.0, |f| format!("較5日量增{:.1}%", f.vol_bias_ma5)),
            Rule::fixed(|f| f.bar.volume > f.vol_ma5, "今日成交量大於5日均量"),
            Rule::fixed(|f| f.bar.volume >= f.prev_volume * 1.5, "今日成交量為前日的1.5倍以上"),
            Rule::fixed(surge_on_volume, "漲幅>3%且量創3日高"),
            Rule::fixed(|f| f.k > f.d, "KD多頭"),
            Rule::fixed(kd_golden_cross, "KD金叉"),
            Rule::fixed(macd_turns_red, "MACD轉紅"),
            Rule::dynamic(|f| f.f_buy_streak >= 3, |f| format!("外資連買超{}天", f.f_buy_streak)),
            Rule::dynamic(
                |f| rank_at_most(f.ranks.foreign_1d, 12),
                |f| rank_text(f.ranks.foreign_1d, "外資今日買超第{}名"),
            ),
            Rule::dynamic(
                |f| rank_at_most(f.ranks.foreign_5d, 22),
                |f| rank_text(f.ranks.foreign_5d, "外資近5日買超第{}名"),
            ),
            Rule::dynamic(|f| f.t_buy_streak >= 3, |f| format!("投信連買超{}天", f.t_buy_streak)),
            Rule::dynamic(
                |f| rank_at_most(f.ranks.trust_1d, 12),
                |f| rank_text(f.ranks.trust_1d, "投信今日買超第{}名"),
            ),
            Rule::dynamic(
                |f| rank_at_most(f.ranks.trust_5d, 22),
                |f| rank_text(f.ranks.trust_5d, "投信近5日買超第{}名"),
            ),
        ];
        Self { name: "daily", rules }
    }
}
