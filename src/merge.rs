//! Reconcile primary, secondary and auxiliary records into one quote per symbol.
//!
//! Price-like fields prefer the chart snapshot and fall back to the exchange
//! summary; order-book and foreign-flow fields only exist on the exchange
//! side; indicative auction prices only on the auxiliary feed. A zero or
//! missing value never wins over a real one.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::error::MergeError;
use crate::types::{
    first_nonzero, IndicativeQuote, MergedStockRecord, PrimaryQuote, SecondaryQuote,
};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Ordered by symbol.
    pub records: Vec<MergedStockRecord>,
    /// Symbols with no positive price after resolution.
    pub dropped: usize,
    /// Symbols that hit a record-level error.
    pub skipped: Vec<MergeError>,
}

/// Borrowed view of everything fetched in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct SourceSet<'a> {
    pub primary: &'a HashMap<String, PrimaryQuote>,
    pub secondary: &'a HashMap<String, SecondaryQuote>,
    pub auxiliary: &'a HashMap<String, IndicativeQuote>,
}

impl SourceSet<'_> {
    /// Primary keys when the exchange summary came through, else whatever
    /// the chart fetches produced.
    pub fn universe(&self) -> BTreeSet<&str> {
        if self.primary.is_empty() {
            self.secondary.keys().map(String::as_str).collect()
        } else {
            self.primary.keys().map(String::as_str).collect()
        }
    }
}

/// Merge every symbol in the universe. Never fails as a whole.
pub fn merge_all(sources: SourceSet<'_>) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for symbol in sources.universe() {
        let primary = sources.primary.get(symbol);
        let secondary = sources.secondary.get(symbol);
        if primary.is_none() && secondary.is_none() {
            continue;
        }

        match merge_symbol(symbol, primary, secondary, sources.auxiliary.get(symbol)) {
            Ok(Some(record)) => outcome.records.push(record),
            Ok(None) => outcome.dropped += 1,
            Err(e) => {
                warn!(symbol = %symbol, "Skipping symbol: {e}");
                outcome.skipped.push(e);
            }
        }
    }

    outcome
}

/// Resolve one symbol. `Ok(None)` means the record has no usable price.
pub fn merge_symbol(
    symbol: &str,
    primary: Option<&PrimaryQuote>,
    secondary: Option<&SecondaryQuote>,
    auxiliary: Option<&IndicativeQuote>,
) -> Result<Option<MergedStockRecord>, MergeError> {
    let p = |f: fn(&PrimaryQuote) -> Option<f64>| primary.and_then(f);
    let s = |f: fn(&SecondaryQuote) -> Option<f64>| secondary.and_then(f);

    let price = finite(symbol, "price", first_nonzero(&[s(|q| q.price), p(|q| q.close)]))?;
    if price <= 0.0 {
        return Ok(None);
    }

    let name = secondary
        .and_then(|q| q.name.as_deref())
        .into_iter()
        .chain(primary.and_then(|q| q.stock_name.as_deref()))
        .map(str::trim)
        .find(|n| !n.is_empty())
        .unwrap_or(symbol)
        .to_string();

    let primary_only = |field: &'static str, f: fn(&PrimaryQuote) -> Option<f64>| {
        finite(symbol, field, p(f).unwrap_or(0.0))
    };

    Ok(Some(MergedStockRecord {
        symbol: symbol.to_string(),
        name,
        price,
        prev_close: finite(
            symbol,
            "prev_close",
            first_nonzero(&[s(|q| q.previous_close), p(|q| q.previous)]),
        )?,
        open_price: finite(
            symbol,
            "open_price",
            first_nonzero(&[s(|q| q.open), p(|q| q.open_price)]),
        )?,
        high: finite(symbol, "high", first_nonzero(&[s(|q| q.high), p(|q| q.high)]))?,
        low: finite(symbol, "low", first_nonzero(&[s(|q| q.low), p(|q| q.low)]))?,
        volume: volume(symbol, first_nonzero(&[s(|q| q.volume), p(|q| q.volume)]))?,
        reported_change: primary_only("change", |q| q.change)?,
        frequency: count(symbol, "frequency", primary_only("frequency", |q| q.frequency)?)?,
        value: primary_only("value", |q| q.value)?,
        bid: primary_only("bid", |q| q.bid)?,
        ask: primary_only("ask", |q| q.offer)?,
        bid_size: count(symbol, "bid_size", primary_only("bid_size", |q| q.bid_volume)?)?,
        ask_size: count(symbol, "ask_size", primary_only("ask_size", |q| q.offer_volume)?)?,
        foreign_buy: count(symbol, "foreign_buy", primary_only("foreign_buy", |q| q.foreign_buy)?)?,
        foreign_sell: count(
            symbol,
            "foreign_sell",
            primary_only("foreign_sell", |q| q.foreign_sell)?,
        )?,
        listed_shares: primary_only("listed_shares", |q| q.listed_shares)?,
        chart_price: finite(symbol, "chart_price", first_nonzero(&[s(|q| q.price)]))?,
        iep: finite(symbol, "iep", auxiliary.map(IndicativeQuote::price).unwrap_or(0.0))?,
        iev: count(
            symbol,
            "iev",
            finite(symbol, "iev", auxiliary.map(IndicativeQuote::volume).unwrap_or(0.0))?,
        )?,
    }))
}

fn finite(symbol: &str, field: &'static str, v: f64) -> Result<f64, MergeError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MergeError::NonFinite {
            symbol: symbol.to_string(),
            field,
        })
    }
}

/// Share counts are truncated toward zero, like the exchange's own integer columns.
fn count(symbol: &str, field: &'static str, v: f64) -> Result<i64, MergeError> {
    let v = finite(symbol, field, v)?;
    if v.abs() >= i64::MAX as f64 {
        return Err(MergeError::NonFinite {
            symbol: symbol.to_string(),
            field,
        });
    }
    Ok(v.trunc() as i64)
}

fn volume(symbol: &str, v: f64) -> Result<i64, MergeError> {
    let v = finite(symbol, "volume", v)?;
    if v < 0.0 || v >= i64::MAX as f64 {
        return Err(MergeError::VolumeOutOfRange {
            symbol: symbol.to_string(),
            value: v,
        });
    }
    Ok(v.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary(code: &str) -> PrimaryQuote {
        PrimaryQuote {
            stock_code: code.to_string(),
            stock_name: Some("Exchange Name ".to_string()),
            previous: Some(1000.0),
            open_price: Some(1005.0),
            high: Some(1050.0),
            low: Some(990.0),
            close: Some(1020.0),
            change: Some(20.0),
            volume: Some(750_000.0),
            value: Some(765_000_000.0),
            frequency: Some(812.0),
            foreign_buy: Some(40_000.0),
            foreign_sell: Some(10_000.0),
            listed_shares: Some(1_000_000_000.0),
            bid: Some(1015.0),
            bid_volume: Some(5_000.0),
            offer: Some(1020.0),
            offer_volume: Some(3_000.0),
        }
    }

    fn secondary(symbol: &str, price: f64) -> SecondaryQuote {
        SecondaryQuote {
            symbol: symbol.to_string(),
            price: Some(price),
            previous_close: Some(1001.0),
            open: Some(1006.0),
            high: Some(1060.0),
            low: None,
            volume: Some(800_000.0),
            name: Some("Chart Name".to_string()),
        }
    }

    fn maps(
        p: Vec<PrimaryQuote>,
        s: Vec<SecondaryQuote>,
    ) -> (HashMap<String, PrimaryQuote>, HashMap<String, SecondaryQuote>) {
        (
            p.into_iter().map(|q| (q.stock_code.clone(), q)).collect(),
            s.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
        )
    }

    #[test]
    fn secondary_wins_price_fields_primary_fills_gaps() {
        let rec = merge_symbol("AAAA", Some(&primary("AAAA")), Some(&secondary("AAAA", 1025.0)), None)
            .unwrap()
            .unwrap();
        assert_eq!(rec.price, 1025.0);
        assert_eq!(rec.prev_close, 1001.0);
        assert_eq!(rec.open_price, 1006.0);
        assert_eq!(rec.high, 1060.0);
        // Chart had no low.
        assert_eq!(rec.low, 990.0);
        assert_eq!(rec.volume, 800_000);
        assert_eq!(rec.name, "Chart Name");
        // Exchange-only fields.
        assert_eq!(rec.bid, 1015.0);
        assert_eq!(rec.ask, 1020.0);
        assert_eq!(rec.bid_size, 5_000);
        assert_eq!(rec.foreign_buy, 40_000);
        assert_eq!(rec.frequency, 812);
        assert_eq!(rec.iep, 0.0);
        assert_eq!(rec.iev, 0);
        assert_eq!(rec.chart_price, 1025.0);
    }

    #[test]
    fn primary_only_record_has_no_chart_price() {
        let rec = merge_symbol("AAAA", Some(&primary("AAAA")), None, None)
            .unwrap()
            .unwrap();
        assert_eq!(rec.price, 1020.0);
        assert_eq!(rec.chart_price, 0.0);
    }

    #[test]
    fn zero_secondary_value_does_not_shadow_primary() {
        let mut s = secondary("AAAA", 0.0);
        s.volume = Some(0.0);
        s.name = Some("   ".to_string());
        let rec = merge_symbol("AAAA", Some(&primary("AAAA")), Some(&s), None)
            .unwrap()
            .unwrap();
        assert_eq!(rec.price, 1020.0);
        assert_eq!(rec.volume, 750_000);
        assert_eq!(rec.name, "Exchange Name");
    }

    #[test]
    fn name_falls_back_to_symbol() {
        let mut p = primary("AAAA");
        p.stock_name = None;
        let rec = merge_symbol("AAAA", Some(&p), None, None).unwrap().unwrap();
        assert_eq!(rec.name, "AAAA");
    }

    #[test]
    fn indicative_values_come_from_auxiliary_only() {
        let aux = IndicativeQuote {
            stock_code: "AAAA".to_string(),
            iep: Some(1010.0),
            iev: Some(12_345.0),
            ..IndicativeQuote::default()
        };
        let rec = merge_symbol("AAAA", Some(&primary("AAAA")), None, Some(&aux))
            .unwrap()
            .unwrap();
        assert_eq!(rec.iep, 1010.0);
        assert_eq!(rec.iev, 12_345);
    }

    #[test]
    fn non_positive_price_is_dropped() {
        let mut p = primary("AAAA");
        p.close = Some(0.0);
        assert_eq!(merge_symbol("AAAA", Some(&p), None, None), Ok(None));
        p.close = Some(-5.0);
        assert_eq!(merge_symbol("AAAA", Some(&p), None, None), Ok(None));
        assert_eq!(merge_symbol("AAAA", None, None, None), Ok(None));
    }

    #[test]
    fn bad_numbers_are_record_level_errors() {
        let mut p = primary("AAAA");
        p.high = Some(f64::NAN);
        assert!(matches!(
            merge_symbol("AAAA", Some(&p), None, None),
            Err(MergeError::NonFinite { field: "high", .. })
        ));

        let mut p = primary("BBBB");
        p.volume = Some(-1.0);
        assert!(matches!(
            merge_symbol("BBBB", Some(&p), None, None),
            Err(MergeError::VolumeOutOfRange { .. })
        ));
    }

    #[test]
    fn universe_is_primary_keys_when_available() {
        let (p, s) = maps(
            vec![primary("AAAA"), primary("BBBB")],
            vec![secondary("AAAA", 1025.0), secondary("ZZZZ", 50.0)],
        );
        let aux = HashMap::new();
        let out = merge_all(SourceSet { primary: &p, secondary: &s, auxiliary: &aux });
        let symbols: Vec<&str> = out.records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAAA", "BBBB"]);
    }

    #[test]
    fn universe_falls_back_to_secondary_keys() {
        let (p, s) = maps(vec![], vec![secondary("ZZZZ", 50.0), secondary("YYYY", 0.0)]);
        let aux = HashMap::new();
        let out = merge_all(SourceSet { primary: &p, secondary: &s, auxiliary: &aux });
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].symbol, "ZZZZ");
        assert_eq!(out.records[0].bid, 0.0);
        assert_eq!(out.dropped, 1);
    }

    #[test]
    fn one_bad_symbol_does_not_abort_the_batch() {
        let mut bad = primary("BAD1");
        bad.open_price = Some(f64::INFINITY);
        let (p, s) = maps(vec![primary("AAAA"), bad, primary("CCCC")], vec![]);
        let aux = HashMap::new();
        let out = merge_all(SourceSet { primary: &p, secondary: &s, auxiliary: &aux });
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.skipped.len(), 1);
    }

    #[test]
    fn merge_is_deterministic() {
        let (p, s) = maps(
            vec![primary("CCCC"), primary("AAAA"), primary("BBBB")],
            vec![secondary("BBBB", 990.0)],
        );
        let aux = HashMap::new();
        let first = merge_all(SourceSet { primary: &p, secondary: &s, auxiliary: &aux });
        let second = merge_all(SourceSet { primary: &p, secondary: &s, auxiliary: &aux });
        assert_eq!(first, second);
    }
}
