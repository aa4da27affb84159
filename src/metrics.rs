use crate::config::{acc_dist, momentum, price_bands as tiers};
use crate::types::{AccDistStatus, DerivedMetrics, MergedStockRecord, PriceBands};

/// Derive every analytics field from a merged record.
///
/// Percentages and price deltas are rounded to 2 dp here, so scoring sees
/// exactly the values that get stored.
pub fn derive(record: &MergedStockRecord) -> DerivedMetrics {
    let (acc_dist_status, acc_dist_score) = accumulation_distribution(record);

    DerivedMetrics {
        change: round2(price_change(record.price, record.prev_close, record.reported_change)),
        change_percent: round2(change_percent(record.price, record.prev_close)),
        volatility: round2(volatility_pct(record.price, record.high, record.low)),
        spread: round2(spread_pct(record.price, record.bid, record.ask)),
        net_foreign: net_foreign(record.foreign_buy, record.foreign_sell),
        bands: price_bands(record.prev_close),
        acc_dist_status,
        acc_dist_score,
        market_cap: (record.listed_shares * record.price).trunc() as i64,
    }
}

/// Absolute change. Uses the exchange-reported figure when previous close is unknown.
pub fn price_change(price: f64, prev_close: f64, reported_change: f64) -> f64 {
    if prev_close > 0.0 {
        price - prev_close
    } else {
        reported_change
    }
}

pub fn change_percent(price: f64, prev_close: f64) -> f64 {
    if prev_close > 0.0 {
        (price - prev_close) / prev_close * 100.0
    } else {
        0.0
    }
}

/// Intraday range as a percentage of last price.
pub fn volatility_pct(price: f64, high: f64, low: f64) -> f64 {
    if price > 0.0 && high > 0.0 && low > 0.0 {
        (high - low) / price * 100.0
    } else {
        0.0
    }
}

/// Best bid/ask gap as a percentage of last price.
pub fn spread_pct(price: f64, bid: f64, ask: f64) -> f64 {
    if price > 0.0 && bid > 0.0 && ask > 0.0 {
        (ask - bid) / price * 100.0
    } else {
        0.0
    }
}

pub fn net_foreign(foreign_buy: i64, foreign_sell: i64) -> i64 {
    foreign_buy.saturating_sub(foreign_sell)
}

/// Auto-rejection bands from previous close.
///
/// | previous close | band |
/// |---|---|
/// | < 200 | 35% |
/// | 200 ..= 5000 | 25% |
/// | > 5000 | 20% |
///
/// Both bands are rounded to whole rupiah; the lower band never drops below 1.
pub fn price_bands(prev_close: f64) -> PriceBands {
    if prev_close <= 0.0 {
        return PriceBands::default();
    }

    let pct = if prev_close < tiers::LOW_TIER_MAX {
        tiers::LOW_TIER_PCT
    } else if prev_close <= tiers::MID_TIER_MAX {
        tiers::MID_TIER_PCT
    } else {
        tiers::HIGH_TIER_PCT
    };
    let fraction = f64::from(pct) / 100.0;

    PriceBands {
        ara: (prev_close * (1.0 + fraction)).round(),
        arb: (prev_close * (1.0 - fraction)).round().max(tiers::MIN_LOWER_BAND),
        ara_pct: pct,
        arb_pct: -pct,
    }
}

/// Three-signal buying/selling pressure score: foreign flow, order-book
/// imbalance, and chart price versus open.
pub fn accumulation_distribution(record: &MergedStockRecord) -> (AccDistStatus, i32) {
    let mut score = 0;

    if record.foreign_buy > 0 || record.foreign_sell > 0 {
        score += match record.foreign_buy.cmp(&record.foreign_sell) {
            std::cmp::Ordering::Greater => acc_dist::FOREIGN_FLOW_WEIGHT,
            std::cmp::Ordering::Less => -acc_dist::FOREIGN_FLOW_WEIGHT,
            std::cmp::Ordering::Equal => 0,
        };
    }

    if record.bid_size > 0 || record.ask_size > 0 {
        let bid = record.bid_size as f64;
        let ask = record.ask_size as f64;
        if bid > ask * acc_dist::IMBALANCE_RATIO {
            score += acc_dist::ORDER_BOOK_WEIGHT;
        } else if ask > bid * acc_dist::IMBALANCE_RATIO {
            score -= acc_dist::ORDER_BOOK_WEIGHT;
        }
    }

    // Only a chart snapshot price counts; the exchange close is not intraday.
    if record.chart_price > 0.0 && record.open_price > 0.0 {
        if record.chart_price > record.open_price {
            score += acc_dist::PRICE_ACTION_WEIGHT;
        } else if record.chart_price < record.open_price {
            score -= acc_dist::PRICE_ACTION_WEIGHT;
        }
    }

    let status = if score >= acc_dist::CLASSIFY_THRESHOLD {
        AccDistStatus::Accumulation
    } else if score <= -acc_dist::CLASSIFY_THRESHOLD {
        AccDistStatus::Distribution
    } else {
        AccDistStatus::Neutral
    };
    (status, score)
}

/// Single-observation stand-in for a relative-strength oscillator: daily
/// change normalised by the intraday range, centred on 50.
pub fn momentum_index(change_percent: f64, volatility: f64) -> f64 {
    if volatility <= 0.0 {
        return momentum::NEUTRAL;
    }
    (momentum::NEUTRAL + change_percent / volatility * momentum::SCALE)
        .clamp(momentum::MIN, momentum::MAX)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MergedStockRecord {
        MergedStockRecord {
            symbol: "TEST".to_string(),
            name: "Test".to_string(),
            price: 1000.0,
            prev_close: 980.0,
            open_price: 990.0,
            high: 1020.0,
            low: 970.0,
            volume: 1_500_000,
            reported_change: 0.0,
            frequency: 300,
            value: 1.5e9,
            bid: 995.0,
            ask: 1000.0,
            bid_size: 0,
            ask_size: 0,
            foreign_buy: 0,
            foreign_sell: 0,
            listed_shares: 2_000_000.0,
            chart_price: 1000.0,
            iep: 0.0,
            iev: 0,
        }
    }

    #[test]
    fn band_examples() {
        assert_eq!(
            price_bands(150.0),
            PriceBands { ara: 203.0, arb: 98.0, ara_pct: 35, arb_pct: -35 }
        );
        assert_eq!(
            price_bands(3000.0),
            PriceBands { ara: 3750.0, arb: 2250.0, ara_pct: 25, arb_pct: -25 }
        );
        assert_eq!(
            price_bands(6000.0),
            PriceBands { ara: 7200.0, arb: 4800.0, ara_pct: 20, arb_pct: -20 }
        );
    }

    #[test]
    fn band_tier_edges() {
        assert_eq!(price_bands(199.0).ara_pct, 35);
        assert_eq!(price_bands(200.0).ara_pct, 25);
        assert_eq!(price_bands(5000.0).ara_pct, 25);
        assert_eq!(price_bands(5000.5).ara_pct, 20);
    }

    #[test]
    fn bands_zero_for_unknown_previous_close() {
        assert_eq!(price_bands(0.0), PriceBands::default());
        assert_eq!(price_bands(-10.0), PriceBands::default());
    }

    #[test]
    fn lower_band_never_below_one() {
        for pc in [0.5, 1.0, 1.4, 2.0, 3.0, 10.0, 50.0, 199.0, 200.0, 5000.0, 5001.0, 99_999.0] {
            let b = price_bands(pc);
            assert!(b.arb >= 1.0, "arb {} for {}", b.arb, pc);
            assert!(b.ara >= b.arb);
        }
        assert_eq!(price_bands(1.0).arb, 1.0);
    }

    #[test]
    fn percentages_guard_non_positive_inputs() {
        assert_eq!(volatility_pct(0.0, 10.0, 5.0), 0.0);
        assert_eq!(volatility_pct(100.0, 0.0, 5.0), 0.0);
        assert_eq!(round2(volatility_pct(100.0, 103.0, 100.0)), 3.0);
        assert_eq!(spread_pct(100.0, 0.0, 101.0), 0.0);
        assert_eq!(round2(spread_pct(200.0, 100.0, 102.0)), 1.0);
        assert_eq!(change_percent(110.0, 0.0), 0.0);
        assert_eq!(round2(change_percent(110.0, 100.0)), 10.0);
    }

    #[test]
    fn change_uses_reported_value_without_previous_close() {
        assert_eq!(price_change(105.0, 100.0, 99.0), 5.0);
        assert_eq!(price_change(105.0, 0.0, 7.0), 7.0);
    }

    #[test]
    fn acc_dist_all_signals_bullish() {
        let mut r = record();
        r.foreign_buy = 500;
        r.foreign_sell = 100;
        r.bid_size = 130;
        r.ask_size = 100;
        assert_eq!(accumulation_distribution(&r), (AccDistStatus::Accumulation, 100));
    }

    #[test]
    fn acc_dist_imbalance_needs_more_than_ratio() {
        let mut r = record();
        r.open_price = r.price;
        r.bid_size = 120;
        r.ask_size = 100;
        assert_eq!(accumulation_distribution(&r), (AccDistStatus::Neutral, 0));

        r.bid_size = 100;
        r.ask_size = 121;
        assert_eq!(accumulation_distribution(&r), (AccDistStatus::Distribution, -35));
    }

    #[test]
    fn acc_dist_mixed_signals_stay_neutral() {
        let mut r = record();
        r.foreign_buy = 100;
        r.foreign_sell = 500;
        // price above open: +25, foreign: -40
        assert_eq!(accumulation_distribution(&r), (AccDistStatus::Neutral, -15));
    }

    #[test]
    fn acc_dist_price_signal_needs_chart_price() {
        // Exchange close above open, but no chart snapshot.
        let mut r = record();
        r.chart_price = 0.0;
        r.price = 1100.0;
        r.open_price = 1000.0;
        r.foreign_sell = 500;
        assert_eq!(accumulation_distribution(&r), (AccDistStatus::Distribution, -40));
    }

    #[test]
    fn momentum_is_neutral_without_range_and_clamped() {
        assert_eq!(momentum_index(5.0, 0.0), 50.0);
        assert_eq!(round2(momentum_index(1.0, 3.0)), 58.33);
        assert_eq!(momentum_index(10.0, 1.0), 100.0);
        assert_eq!(momentum_index(-10.0, 1.0), 0.0);
    }

    #[test]
    fn derive_rounds_and_fills_everything() {
        let m = derive(&record());
        assert_eq!(m.change, 20.0);
        assert_eq!(m.change_percent, 2.04);
        assert_eq!(m.volatility, 5.0);
        assert_eq!(m.spread, 0.5);
        assert_eq!(m.net_foreign, 0);
        assert_eq!(m.bands.ara_pct, 25);
        assert_eq!(m.acc_dist_status, AccDistStatus::Neutral);
        assert_eq!(m.acc_dist_score, 25);
        assert_eq!(m.market_cap, 2_000_000_000);
    }
}
