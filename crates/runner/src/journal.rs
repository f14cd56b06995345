//! Journal sinks
//!
//! `JsonlJournal` appends one JSON line per record to a file;
//! `LogJournal` forwards everything to the log facade, which is enough
//! for paper runs and tests. Neither blocks the decision loop on
//! failure: a write error is logged and dropped.

use std::path::Path;

use async_trait::async_trait;
use log::{error, info};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use vega_core::{JournalRecord, PortfolioSnapshot};
use vega_ports::JournalSink;

/// Append-only JSON-lines journal
pub struct JsonlJournal {
    file: Mutex<File>,
}

impl JsonlJournal {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    async fn write_line(&self, line: String) {
        let mut file = self.file.lock().await;
        if let Err(e) = file.write_all(line.as_bytes()).await {
            error!("[Journal] Write failed: {}", e);
            return;
        }
        if let Err(e) = file.write_all(b"\n").await {
            error!("[Journal] Write failed: {}", e);
        }
    }
}

#[async_trait]
impl JournalSink for JsonlJournal {
    async fn record(&self, record: JournalRecord) {
        match serde_json::to_string(&record) {
            Ok(line) => self.write_line(line).await,
            Err(e) => error!("[Journal] Serialize failed: {}", e),
        }
    }

    async fn snapshot(&self, snapshot: PortfolioSnapshot) {
        match serde_json::to_string(&snapshot) {
            Ok(line) => self.write_line(line).await,
            Err(e) => error!("[Journal] Serialize failed: {}", e),
        }
    }
}

/// Journal that only logs, for paper runs and tests
#[derive(Default)]
pub struct LogJournal;

#[async_trait]
impl JournalSink for LogJournal {
    async fn record(&self, record: JournalRecord) {
        info!(
            "[Journal] {} {} {} x {} at {} ({})",
            record.status,
            record.side,
            record.symbol,
            record.quantity,
            record.premium,
            record.order_id
        );
    }

    async fn snapshot(&self, snapshot: PortfolioSnapshot) {
        info!(
            "[Journal] Snapshot: {} legs, {} resting, realized {}, unrealized {}, exposure {}",
            snapshot.active_legs,
            snapshot.pending_orders,
            snapshot.realized_pnl,
            snapshot.unrealized_pnl,
            snapshot.exposure_ratio
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_jsonl_lines_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("vega-journal-{}.jsonl", Uuid::new_v4()));
        let journal = JsonlJournal::open(&path).await.unwrap();

        journal
            .record(JournalRecord {
                timestamp: Utc::now(),
                order_id: "SIM-1".to_string(),
                correlation_id: Uuid::new_v4(),
                symbol: "NIFTY25SEP2524000CE".to_string(),
                side: "SELL".to_string(),
                quantity: dec!(50),
                premium: dec!(120),
                status: "FILLED".to_string(),
                spot: Some(dec!(24000)),
            })
            .await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: JournalRecord = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed.order_id, "SIM-1");
        assert_eq!(parsed.premium, dec!(120));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
