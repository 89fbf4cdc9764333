// Normalization of raw provider rows into clean, adjusted candles
use crate::types::*;
use chrono::{DateTime, Utc};

/// One provider row before cleaning; any field may be missing
#[derive(Debug, Clone, Default)]
pub struct RawBar {
    pub timestamp: Option<DateTime<Utc>>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub adj_close: Option<f64>,
}

/// Turn raw rows into candles.
///
/// Rows with a missing or non-finite field are dropped. When `auto_adjust` is
/// set and the response carries an adjusted-close series, OHLC are rescaled
/// by `adj_close / close` and rows without their own adjusted close are
/// dropped, so a series is never part adjusted and part raw. Output is sorted by timestamp with duplicate
/// timestamps collapsed (last row wins).
pub fn assemble_candles(rows: Vec<RawBar>, auto_adjust: bool) -> Vec<Candle> {
    let adjust_rows = auto_adjust && rows.iter().any(|r| r.adj_close.is_some());

    let mut candles: Vec<Candle> = rows
        .into_iter()
        .filter_map(|row| {
            let candle = Candle {
                timestamp: row.timestamp?,
                open: finite(row.open?)?,
                high: finite(row.high?)?,
                low: finite(row.low?)?,
                close: finite(row.close?)?,
                volume: finite(row.volume.unwrap_or(0.0))?,
            };

            if !adjust_rows {
                return Some(candle);
            }
            adjust(candle, row.adj_close?)
        })
        .collect();

    candles.sort_by_key(|c| c.timestamp);

    // keep the last row for each timestamp
    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp == candle.timestamp => *prev = candle,
            _ => deduped.push(candle),
        }
    }
    deduped
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn adjust(candle: Candle, adj_close: f64) -> Option<Candle> {
    let factor = finite(adj_close / candle.close)?;
    Some(Candle {
        open: candle.open * factor,
        high: candle.high * factor,
        low: candle.low * factor,
        close: adj_close,
        ..candle
    })
}

/// Validate that closes are usable for return calculations
pub fn validate_candles(candles: &[Candle]) -> Result<()> {
    if let Some(bad) = candles.iter().find(|c| c.close <= 0.0) {
        return Err(MarketDataError::InvalidResponse(format!(
            "Close must be positive, got {} at {}",
            bad.close, bad.timestamp
        )));
    }
    Ok(())
}
