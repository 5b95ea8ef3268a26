use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use vatio::api::PriceSource;
use vatio::coordinator::{RefreshCoordinator, RefreshState};
use vatio::error::{Result, VatioError};
use vatio::series::{PricePoint, PriceSeries};

/// What a scripted source does for one requested date
#[derive(Clone, Copy)]
enum Reply {
    Series { delay_ms: u64, marker: f64 },
    Failure { delay_ms: u64 },
}

struct ScriptedSource {
    replies: HashMap<NaiveDate, Reply>,
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<PriceSeries>> {
        let reply = *self
            .replies
            .get(&date)
            .unwrap_or(&Reply::Failure { delay_ms: 0 });
        match reply {
            Reply::Series { delay_ms, marker } => {
                sleep(Duration::from_millis(delay_ms)).await;
                Ok(vec![series_with_marker(marker)])
            }
            Reply::Failure { delay_ms } => {
                sleep(Duration::from_millis(delay_ms)).await;
                Err(VatioError::fetch("scripted failure"))
            }
        }
    }
}

fn series_with_marker(marker: f64) -> PriceSeries {
    PriceSeries {
        title: format!("scripted-{}", marker),
        last_update: DateTime::parse_from_rfc3339("2024-03-11T20:15:00+02:00").unwrap(),
        points: vec![PricePoint {
            value: marker,
            instant: DateTime::parse_from_rfc3339("2024-03-11T10:00:00+02:00").unwrap(),
        }],
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn marker_of(state: &RefreshState) -> Option<f64> {
    state.series.first().and_then(|s| s.points.first()).map(|p| p.value)
}

/// Wait until the predicate holds for the published state
async fn wait_for<F>(state_rx: &mut watch::Receiver<RefreshState>, predicate: F) -> RefreshState
where
    F: Fn(&RefreshState) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = state_rx.borrow_and_update();
                if predicate(&state) {
                    return state.clone();
                }
            }
            state_rx.changed().await.expect("coordinator alive");
        }
    })
    .await
    .expect("state condition reached in time")
}

#[tokio::test]
async fn latest_selection_wins_when_stale_fetch_finishes_last() {
    let source = ScriptedSource {
        replies: HashMap::from([
            (date(11), Reply::Series { delay_ms: 150, marker: 1.0 }),
            (date(12), Reply::Series { delay_ms: 10, marker: 2.0 }),
        ]),
    };
    let (coordinator, handle) = RefreshCoordinator::new(Arc::new(source), date(11));
    let task = tokio::spawn(coordinator.run());
    let mut state_rx = handle.state();

    // Supersede the initial fetch right away
    assert!(handle.select_date(date(12)));

    let settled = wait_for(&mut state_rx, |s| s.generation == 2 && !s.loading).await;
    assert_eq!(marker_of(&settled), Some(2.0));
    assert_eq!(settled.selected_date, date(12));

    // Let the superseded fetch complete; it must be discarded silently
    sleep(Duration::from_millis(300)).await;
    let state = state_rx.borrow().clone();
    assert_eq!(marker_of(&state), Some(2.0));
    assert_eq!(state.generation, 2);
    assert!(!state.loading);

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn latest_selection_wins_when_stale_fetch_finishes_first() {
    let source = ScriptedSource {
        replies: HashMap::from([
            (date(11), Reply::Series { delay_ms: 10, marker: 1.0 }),
            (date(12), Reply::Series { delay_ms: 150, marker: 2.0 }),
        ]),
    };
    let (coordinator, handle) = RefreshCoordinator::new(Arc::new(source), date(11));
    let task = tokio::spawn(coordinator.run());
    let mut state_rx = handle.state();

    assert!(handle.select_date(date(12)));

    let settled = wait_for(&mut state_rx, |s| s.generation == 2 && !s.loading).await;
    assert_eq!(marker_of(&settled), Some(2.0));

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn failed_fetch_preserves_previous_series_and_clears_loading() {
    let source = ScriptedSource {
        replies: HashMap::from([
            (date(11), Reply::Series { delay_ms: 5, marker: 1.0 }),
            (date(12), Reply::Failure { delay_ms: 5 }),
        ]),
    };
    let (coordinator, handle) = RefreshCoordinator::new(Arc::new(source), date(11));
    let task = tokio::spawn(coordinator.run());
    let mut state_rx = handle.state();

    let first = wait_for(&mut state_rx, |s| s.generation == 1 && !s.loading).await;
    assert_eq!(marker_of(&first), Some(1.0));

    assert!(handle.select_date(date(12)));
    let after_failure = wait_for(&mut state_rx, |s| s.generation == 2 && !s.loading).await;

    // Stale series kept, not blanked; the date tracks the selection
    assert_eq!(marker_of(&after_failure), Some(1.0));
    assert_eq!(after_failure.selected_date, date(12));

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn each_selection_bumps_the_generation() {
    let source = ScriptedSource {
        replies: HashMap::from([
            (date(11), Reply::Series { delay_ms: 1, marker: 1.0 }),
            (date(12), Reply::Series { delay_ms: 1, marker: 2.0 }),
        ]),
    };
    let (coordinator, handle) = RefreshCoordinator::new(Arc::new(source), date(11));
    let task = tokio::spawn(coordinator.run());
    let mut state_rx = handle.state();

    wait_for(&mut state_rx, |s| s.generation == 1 && !s.loading).await;
    handle.select_date(date(12));
    wait_for(&mut state_rx, |s| s.generation == 2 && !s.loading).await;
    handle.select_date(date(11));
    let settled = wait_for(&mut state_rx, |s| s.generation == 3 && !s.loading).await;
    assert_eq!(marker_of(&settled), Some(1.0));

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn loading_flag_is_visible_while_a_fetch_is_outstanding() {
    let source = ScriptedSource {
        replies: HashMap::from([(date(11), Reply::Series { delay_ms: 100, marker: 1.0 })]),
    };
    let (coordinator, handle) = RefreshCoordinator::new(Arc::new(source), date(11));
    let task = tokio::spawn(coordinator.run());
    let mut state_rx = handle.state();

    let loading = wait_for(&mut state_rx, |s| s.loading).await;
    assert_eq!(loading.generation, 1);
    assert!(loading.series.is_empty());

    let settled = wait_for(&mut state_rx, |s| !s.loading).await;
    assert_eq!(marker_of(&settled), Some(1.0));

    handle.shutdown();
    task.await.unwrap();
}
