use crate::config::screening as rules;
use crate::metrics::{self, momentum_index, round2};
use crate::types::{AccDistStatus, DerivedMetrics, MergedStockRecord, ScreeningResult};

/// Outcome of the scalping screen for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screening {
    pub score: i32,
    /// False when volume, volatility or price is out of range.
    pub passed: bool,
    pub momentum_index: f64,
}

/// Score a derived record.
///
/// Six weighted criteria make up a nominal 100-point base; foreign inflow
/// and accumulation add bonuses on top with no ceiling. Only the first three
/// criteria gate `passed`; the score is computed either way.
pub fn screen(record: &MergedStockRecord, m: &DerivedMetrics) -> Screening {
    // Windows are tested on the raw index; only the stored value is rounded.
    let momentum = momentum_index(m.change_percent, m.volatility);
    let mut score = 0;
    let mut passed = true;

    // 1. Liquidity
    if record.volume >= rules::VOLUME_STRONG {
        score += rules::VOLUME_STRONG_POINTS;
    } else if record.volume >= rules::VOLUME_WEAK {
        score += rules::VOLUME_WEAK_POINTS;
    } else {
        passed = false;
    }

    // 2. Intraday range
    if m.volatility >= rules::VOLATILITY_STRONG {
        score += rules::VOLATILITY_STRONG_POINTS;
    } else if m.volatility >= rules::VOLATILITY_WEAK {
        score += rules::VOLATILITY_WEAK_POINTS;
    } else {
        passed = false;
    }

    // 3. Price range
    if (rules::PRICE_MIN..=rules::PRICE_MAX).contains(&round2(record.price)) {
        score += rules::PRICE_POINTS;
    } else {
        passed = false;
    }

    // 4. Momentum away from the extremes
    let (core_lo, core_hi) = rules::MOMENTUM_CORE;
    let (outer_lo, outer_hi) = rules::MOMENTUM_OUTER;
    if (core_lo..=core_hi).contains(&momentum) {
        score += rules::MOMENTUM_CORE_POINTS;
    } else if (outer_lo..=outer_hi).contains(&momentum) {
        score += rules::MOMENTUM_OUTER_POINTS;
    }

    // 5. Moving at all, preferably up
    if m.change_percent.abs() >= rules::CHANGE_MIN_ABS_PCT {
        score += rules::CHANGE_POINTS;
        if m.change_percent > 0.0 {
            score += rules::UPTREND_BONUS;
        }
    }

    // 6. Tight book
    if m.spread > 0.0 && m.spread < rules::SPREAD_MAX_PCT {
        score += rules::SPREAD_POINTS;
    } else if m.spread >= rules::SPREAD_MAX_PCT {
        score += rules::WIDE_SPREAD_PENALTY;
    }

    if m.net_foreign > 0 {
        score += rules::FOREIGN_INFLOW_POINTS;
        if m.net_foreign > rules::FOREIGN_HEAVY_INFLOW {
            score += rules::FOREIGN_HEAVY_INFLOW_POINTS;
        }
    }

    if m.acc_dist_status == AccDistStatus::Accumulation {
        score += rules::ACCUMULATION_POINTS;
    }

    Screening {
        score,
        passed,
        momentum_index: round2(momentum),
    }
}

/// Derive metrics and screen a merged record into the row that gets stored.
pub fn evaluate(record: MergedStockRecord) -> ScreeningResult {
    let metrics = metrics::derive(&record);
    let Screening {
        score,
        passed,
        momentum_index,
    } = screen(&record, &metrics);
    ScreeningResult {
        record,
        metrics,
        momentum_index,
        score,
        passed,
    }
}
