//! Trade replay: feeds recorded trades onto the bus as if they came from the
//! exchange feed.
//!
//! Input is JSON lines, one `gdax.TRADE` payload per line:
//!
//! ```text
//! {"exchange":"gdax","trade":{"price":"19650.01","product_id":"BTC-USD","time":"2017-12-17T12:00:00Z"}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. At end of input a
//! `gdax.CLOSE` is emitted, like a feed disconnect.

use anyhow::Result;
use ath_core::bus::EventBus;
use ath_core::events;
use ath_core::types::TradeEvent;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

/// Counters reported when a replay finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub emitted: u64,
    pub skipped: u64,
}

/// Emit every valid trade line from `reader`, then `gdax.CLOSE`.
///
/// Lines that are not trade payloads are logged and skipped. The raw JSON is
/// emitted unchanged so feed fields the recipe ignores still reach other
/// subscribers.
pub async fn replay<R>(bus: &dyn EventBus, reader: R) -> Result<ReplayStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ReplayStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = serde_json::from_str::<Value>(line)
            .map_err(|e| e.to_string())
            .and_then(|v| TradeEvent::deserialize(&v).map(|_| v).map_err(|e| e.to_string()));
        match parsed {
            Ok(payload) => {
                bus.emit(events::TRADE, payload);
                stats.emitted += 1;
            }
            Err(e) => {
                warn!("replay line {line_no}: not a trade ({e})");
                stats.skipped += 1;
            }
        }
    }

    bus.emit(events::FEED_CLOSE, Value::Null);
    info!("replay finished: {} trade(s) emitted, {} line(s) skipped", stats.emitted, stats.skipped);
    Ok(stats)
}
