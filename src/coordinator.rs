//! Background refresh coordination for the displayed price series
//!
//! The coordinator owns the "currently displayed" state. Every date
//! selection bumps a monotonic generation counter and spawns one background
//! fetch tagged with it; whichever fetch completes publishes its result only
//! if its generation is still current. A superseded fetch is never aborted
//! mid-flight, it runs to completion and its tagged result is discarded at
//! publish time. State writes happen on this task only; readers take
//! snapshots through the watch channel.

use crate::api::PriceSource;
use crate::error::Result;
use crate::logging::StructuredLogger;
use crate::series::PriceSeries;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Shared refresh state, read by the display layer
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshState {
    /// Day the display is tracking
    pub selected_date: NaiveDate,

    /// Whether a fetch for the current generation is outstanding
    pub loading: bool,

    /// Last successfully published series
    pub series: Vec<PriceSeries>,

    /// Monotonic counter distinguishing successive refresh requests
    pub generation: u64,
}

/// Commands accepted by the coordinator from the UI layer
#[derive(Debug, Clone)]
pub enum RefreshCommand {
    /// Track a different day
    SelectDate(NaiveDate),

    /// Stop the coordinator loop
    Shutdown,
}

/// Completed fetch tagged with the generation it was spawned under
struct FetchOutcome {
    generation: u64,
    result: Result<Vec<PriceSeries>>,
}

/// Handle the UI layer uses to drive the coordinator and observe its state
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<RefreshCommand>,
    state: watch::Receiver<RefreshState>,
}

impl CoordinatorHandle {
    /// Request a refresh for the given day; returns false when the
    /// coordinator is gone
    pub fn select_date(&self, date: NaiveDate) -> bool {
        self.commands.send(RefreshCommand::SelectDate(date)).is_ok()
    }

    /// Ask the coordinator loop to stop
    pub fn shutdown(&self) {
        let _ = self.commands.send(RefreshCommand::Shutdown);
    }

    /// Fresh receiver for state snapshots
    pub fn state(&self) -> watch::Receiver<RefreshState> {
        self.state.clone()
    }
}

/// Owner of the refresh state machine
pub struct RefreshCoordinator {
    source: Arc<dyn PriceSource>,
    state: watch::Sender<RefreshState>,
    commands_rx: mpsc::UnboundedReceiver<RefreshCommand>,
    results_tx: mpsc::UnboundedSender<FetchOutcome>,
    results_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    logger: StructuredLogger,
}

impl RefreshCoordinator {
    /// Create a coordinator tracking `initial_date`; the first fetch starts
    /// when [`RefreshCoordinator::run`] is entered
    pub fn new(source: Arc<dyn PriceSource>, initial_date: NaiveDate) -> (Self, CoordinatorHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(RefreshState {
            selected_date: initial_date,
            loading: false,
            series: Vec::new(),
            generation: 0,
        });

        let coordinator = Self {
            source,
            state: state_tx,
            commands_rx,
            results_tx,
            results_rx,
            logger: crate::logging::get_logger("coordinator"),
        };
        let handle = CoordinatorHandle {
            commands: commands_tx,
            state: state_rx,
        };
        (coordinator, handle)
    }

    /// Run the coordinator loop until shutdown or until every handle is
    /// dropped
    pub async fn run(mut self) {
        let initial_date = self.state.borrow().selected_date;
        self.start_fetch(initial_date);

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => match command {
                    Some(RefreshCommand::SelectDate(date)) => self.start_fetch(date),
                    Some(RefreshCommand::Shutdown) | None => break,
                },
                Some(outcome) = self.results_rx.recv() => self.apply_outcome(outcome),
            }
        }

        self.logger.debug("Coordinator loop stopped");
    }

    /// Bump the generation, flag loading, and spawn exactly one fetch
    /// carrying the new generation
    fn start_fetch(&mut self, date: NaiveDate) {
        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            state.selected_date = date;
            state.loading = true;
            generation = state.generation;
        });
        self.logger
            .debug(&format!("Fetching {} (generation {})", date, generation));

        let source = Arc::clone(&self.source);
        let results_tx = self.results_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_day(date).await;
            let _ = results_tx.send(FetchOutcome { generation, result });
        });
    }

    /// Publish a completed fetch, unless a newer generation superseded it
    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        let current = self.state.borrow().generation;
        if outcome.generation != current {
            self.logger.debug(&format!(
                "Discarding superseded fetch (generation {}, current {})",
                outcome.generation, current
            ));
            return;
        }

        match outcome.result {
            Ok(series) => {
                self.logger
                    .debug(&format!("Publishing {} series", series.len()));
                self.state.send_modify(|state| {
                    state.series = series;
                    state.loading = false;
                });
            }
            Err(e) => {
                // Keep showing the previous series rather than blanking out
                self.logger
                    .error(&format!("Refresh failed, keeping previous series: {}", e));
                self.state.send_modify(|state| state.loading = false);
            }
        }
    }
}
