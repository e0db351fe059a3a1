use chrono::Utc;
use echelon_domain::{
    Agent, Archetype, CapitalMode, Market, MarketId, MarketStatus, OwnerRef, Signal, SourceTier,
    Timeline, TimelineId, TimelineStatus, Visibility,
};
use echelon_export::{EpisodeBuffer, EpisodeRecord, ExportScheduler};
use rust_decimal::Decimal;
use std::{sync::Arc, time::Duration};

fn episode(episode_id: u64, timeline_id: TimelineId) -> EpisodeRecord {
    EpisodeRecord {
        episode_id,
        timeline_id,
        captured_ts: Utc::now(),
        markets: vec![Market {
            id: MarketId(7),
            timeline_id,
            outcomes: vec!["YES".into(), "NO".into()],
            reserves: vec![Decimal::from(500), Decimal::from(500)],
            total_volume: Decimal::ZERO,
            status: MarketStatus::Open,
            created_ts: Utc::now(),
            resolution_ts: None,
            winning_idx: None,
        }],
        agents: vec![Agent::spawn(echelon_domain::AgentId(9), Archetype::Spy, Decimal::from(50), 0, vec![])],
        signals: vec![Signal::new("reuters", Utc::now(), "elections", 0.6, vec![], SourceTier::Free)],
        timeline: Timeline {
            id: timeline_id,
            parent_id: None,
            fork_point_state_hash: [0u8; 32],
            created_ts: Utc::now(),
            expiry_ts: None,
            visibility: Visibility::UserPublic,
            status: TimelineStatus::Active,
            capital_mode: CapitalMode::Simulated,
            creator: OwnerRef::Wallet("alice".into()),
            stability: 0.9,
            logic_gap: 0.1,
        },
    }
}

#[tokio::test]
async fn scheduler_flushes_two_separate_canonical_exports() {
    let buffer = Arc::new(EpisodeBuffer::new());
    let timeline_id = TimelineId(3);
    let dir = std::env::temp_dir().join("echelon_export_integration_test");
    let scheduler = ExportScheduler::new(buffer.clone(), dir.clone(), Duration::from_millis(1));

    buffer.push(episode(0, timeline_id)).await;
    let first = scheduler.export_once().await.unwrap().unwrap();

    buffer.push(episode(1, timeline_id)).await;
    let second = scheduler.export_once().await.unwrap().unwrap();

    assert_ne!(first.canonical_path, second.canonical_path);
    assert_eq!(first.record_count, 1);
    assert_eq!(second.record_count, 1);
    assert!(std::fs::read_to_string(&first.canonical_path).unwrap().contains("\"episode_id\":0"));
    assert!(std::fs::read_to_string(&second.canonical_path).unwrap().contains("\"episode_id\":1"));
}
