#![warn(unused_crate_dependencies)]

//! Calibrated training-data export (spec.md §1, §6). The core emits structured episodes rather
//! than running ML training loops itself; this crate buffers those episodes and flushes them as
//! the core's one in-scope export shape, raw canonical JSON (spec.md §6: "the core emits the
//! canonical JSON; the other shapes are produced by an external exporter that reads the Event
//! Bus"). Grounded in `jackbot-snapshot`'s stage-then-flush scheduler shape.

use chrono::{DateTime, Utc};
use echelon_domain::{Agent, Market, MarketId, Signal, Timeline, TimelineId};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::sync::Mutex;
use tokio::time;

/// One tick's worth of state a downstream ML consumer needs to reconstruct a training episode
/// (spec.md §1 Non-goals: "No ML training loops - the core emits structured episodes"). Each
/// field is a snapshot, not a diff; consumers reconcile `episode_id` ordering themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeRecord {
    pub episode_id: u64,
    pub timeline_id: TimelineId,
    pub captured_ts: DateTime<Utc>,
    pub markets: Vec<Market>,
    pub agents: Vec<Agent>,
    pub signals: Vec<Signal>,
    pub timeline: Timeline,
}

/// The `ExportReady` event payload (spec.md §4.7 event taxonomy): published onto the Event Bus
/// once a canonical JSON flush completes, carrying just enough to locate and size the artifact
/// without re-reading it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportReady {
    pub export_id: u64,
    pub record_count: usize,
    pub market_ids: Vec<MarketId>,
    pub canonical_path: PathBuf,
    pub flushed_ts: DateTime<Utc>,
}

/// Staging area episodes accumulate in between flushes, mirroring `jackbot-snapshot`'s `FakeRedis`
/// staging role but holding typed [`EpisodeRecord`]s instead of opaque key/value strings.
#[derive(Debug, Default)]
pub struct EpisodeBuffer {
    pending: Mutex<Vec<EpisodeRecord>>,
}

impl EpisodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, record: EpisodeRecord) {
        self.pending.lock().await.push(record);
    }

    /// Drain every buffered record, leaving the buffer empty for the next accumulation window.
    pub async fn drain(&self) -> Vec<EpisodeRecord> {
        std::mem::take(&mut *self.pending.lock().await)
    }
}

/// Writes a batch of [`EpisodeRecord`]s as newline-delimited canonical JSON, one record per line,
/// matching `jackbot-snapshot::write_parquet`'s line-delimited shape (despite that function's
/// name, it already wrote JSON lines - this crate keeps the format and drops the misleading name).
pub fn write_canonical_json(records: &[EpisodeRecord], path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    for record in records {
        serde_json::to_writer(&mut file, record)?;
        use io::Write;
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// Periodically flushes an [`EpisodeBuffer`] to canonical JSON on disk and produces the
/// [`ExportReady`] payload for each flush (spec.md §4.7). Grounded in
/// `jackbot-snapshot::SnapshotScheduler`'s `snapshot_once`/`start` shape; the tensor-archive,
/// robotics log-bundle, and record-stream export shapes named in spec.md §6 are explicitly out of
/// core scope and have no counterpart here.
pub struct ExportScheduler {
    buffer: Arc<EpisodeBuffer>,
    export_root: PathBuf,
    interval: Duration,
    next_export_id: Mutex<u64>,
}

impl ExportScheduler {
    pub fn new(buffer: Arc<EpisodeBuffer>, export_root: PathBuf, interval: Duration) -> Self {
        Self { buffer, export_root, interval, next_export_id: Mutex::new(0) }
    }

    /// Drain the buffer and flush whatever accumulated since the last flush. No-ops (returns
    /// `None`) when nothing is buffered, so an idle scheduler doesn't emit empty `ExportReady`
    /// events onto the bus.
    pub async fn export_once(&self) -> io::Result<Option<ExportReady>> {
        let records = self.buffer.drain().await;
        if records.is_empty() {
            return Ok(None);
        }
        let mut id_guard = self.next_export_id.lock().await;
        let export_id = *id_guard;
        *id_guard += 1;
        drop(id_guard);

        let file_name = format!("episodes_{export_id}.jsonl");
        let canonical_path = self.export_root.join(&file_name);
        write_canonical_json(&records, &canonical_path)?;

        let market_ids = records.iter().flat_map(|r| r.markets.iter().map(|m| m.id)).collect();
        let ready = ExportReady {
            export_id,
            record_count: records.len(),
            market_ids,
            canonical_path,
            flushed_ts: Utc::now(),
        };
        tracing::info!(export_id, record_count = ready.record_count, path = %ready.canonical_path.display(), "flushed canonical export");
        Ok(Some(ready))
    }

    /// Runs [`Self::export_once`] on `interval` until the calling task is dropped or cancelled.
    pub async fn start(&self) {
        let mut ticker = time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.export_once().await {
                Ok(Some(_)) | Ok(None) => {}
                Err(err) => tracing::warn!(%err, "canonical export flush failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echelon_domain::{Archetype, CapitalMode, MarketStatus, OwnerRef, SourceTier, TimelineStatus, Visibility};
    use rust_decimal::Decimal;

    fn sample_episode(episode_id: u64) -> EpisodeRecord {
        let timeline_id = TimelineId(1);
        EpisodeRecord {
            episode_id,
            timeline_id,
            captured_ts: Utc::now(),
            markets: vec![Market {
                id: MarketId(1),
                timeline_id,
                outcomes: vec!["YES".into(), "NO".into()],
                reserves: vec![Decimal::from(1000), Decimal::from(1000)],
                total_volume: Decimal::ZERO,
                status: MarketStatus::Open,
                created_ts: Utc::now(),
                resolution_ts: None,
                winning_idx: None,
            }],
            agents: vec![Agent::spawn(echelon_domain::AgentId(1), Archetype::Shark, Decimal::from(100), 0, vec![])],
            signals: vec![Signal::new("reuters", Utc::now(), "weather", 0.8, vec![], SourceTier::Premium)],
            timeline: Timeline {
                id: timeline_id,
                parent_id: None,
                fork_point_state_hash: [0u8; 32],
                created_ts: Utc::now(),
                expiry_ts: None,
                visibility: Visibility::GlobalOnChain,
                status: TimelineStatus::Active,
                capital_mode: CapitalMode::Real,
                creator: OwnerRef::Wallet("system".into()),
                stability: 1.0,
                logic_gap: 0.0,
            },
        }
    }

    #[tokio::test]
    async fn export_once_is_a_noop_when_buffer_is_empty() {
        let buffer = Arc::new(EpisodeBuffer::new());
        let dir = std::env::temp_dir().join("echelon_export_empty_test");
        let scheduler = ExportScheduler::new(buffer, dir, Duration::from_millis(1));
        assert!(scheduler.export_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn export_once_flushes_buffered_episodes_to_canonical_json() {
        let buffer = Arc::new(EpisodeBuffer::new());
        buffer.push(sample_episode(0)).await;
        buffer.push(sample_episode(1)).await;
        let dir = std::env::temp_dir().join("echelon_export_flush_test");
        let scheduler = ExportScheduler::new(buffer, dir.clone(), Duration::from_millis(1));

        let ready = scheduler.export_once().await.unwrap().unwrap();
        assert_eq!(ready.record_count, 2);
        assert_eq!(ready.market_ids, vec![MarketId(1), MarketId(1)]);

        let contents = fs::read_to_string(&ready.canonical_path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let first: EpisodeRecord = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(first.episode_id, 0);
    }

    #[tokio::test]
    async fn export_ids_increment_across_flushes() {
        let buffer = Arc::new(EpisodeBuffer::new());
        let dir = std::env::temp_dir().join("echelon_export_increment_test");
        let scheduler = ExportScheduler::new(buffer.clone(), dir, Duration::from_millis(1));

        buffer.push(sample_episode(0)).await;
        let first = scheduler.export_once().await.unwrap().unwrap();
        buffer.push(sample_episode(1)).await;
        let second = scheduler.export_once().await.unwrap().unwrap();

        assert_eq!(first.export_id, 0);
        assert_eq!(second.export_id, 1);
    }
}
