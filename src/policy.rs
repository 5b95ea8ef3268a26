//! Mapping of declarative retry/timeout policy onto the HTTP client
//!
//! The configuration file describes retries and timeouts declaratively
//! (aggregate and granular counters side by side). This module maps those
//! settings into the concrete plans the API client consumes, applying the
//! precedence rules between the aggregate and granular counters: when the
//! aggregate `total` is present, the granular counters, the method
//! allow-list, and the status forcelist are not forwarded at all.

use crate::config::{RetryConfig, TimeoutConfig};
use std::time::Duration;

/// Backoff schedule forwarded to the client. Present only when the
/// configured factor is greater than zero.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPlan {
    /// Base factor: delay = factor * 2^(previous retries)
    pub factor: f64,

    /// Cap in seconds on a single pause, when configured above zero
    pub max: Option<f64>,

    /// Upper range in seconds for random jitter, when configured above zero
    pub jitter: Option<f64>,
}

/// Retry budget the client decrements while a request is failing.
///
/// `Total` deliberately carries no granular counters, allow-list, or status
/// forcelist: with an aggregate budget those settings are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryBudget {
    /// Aggregate counter: any failure kind consumes from the same pool
    Total(u32),

    /// Per-kind counters, consulted by failure classification
    Granular {
        connect: u32,
        read: u32,
        status: u32,
        other: u32,
        /// `None` retries any HTTP method
        allowed_methods: Option<Vec<String>>,
        /// `None` disables status-driven retries
        status_forcelist: Option<Vec<u16>>,
    },
}

/// Classification of a failed attempt, used to pick the granular counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connect,
    Read,
    Status,
    Other,
}

/// Concrete retry parameters the API client executes
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPlan {
    /// Backoff between attempts, if enabled
    pub backoff: Option<BackoffPlan>,

    /// Maximum HTTP redirections to follow
    pub redirect_limit: u32,

    /// Remaining-attempt accounting
    pub budget: RetryBudget,
}

/// Concrete timeout parameters the API client applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutPlan {
    /// Whole-request deadline; granular values are absent when set
    pub total: Option<Duration>,

    /// Connection-phase deadline
    pub connect: Option<Duration>,

    /// Read-phase deadline
    pub read: Option<Duration>,
}

/// Map the declarative retry settings into a concrete plan
pub fn build_retry_plan(config: &RetryConfig) -> RetryPlan {
    let backoff = if config.backoff.factor > 0.0 {
        Some(BackoffPlan {
            factor: config.backoff.factor,
            max: (config.backoff.max > 0.0).then_some(config.backoff.max),
            jitter: (config.backoff.jitter > 0.0).then_some(config.backoff.jitter),
        })
    } else {
        None
    };

    let budget = match config.total {
        Some(total) => RetryBudget::Total(total),
        None => RetryBudget::Granular {
            connect: config.connect,
            read: config.read,
            status: config.status,
            other: config.other,
            allowed_methods: config.allowed_methods.clone(),
            status_forcelist: (!config.status_forcelist.is_empty())
                .then(|| config.status_forcelist.clone()),
        },
    };

    RetryPlan {
        backoff,
        redirect_limit: config.redirect,
        budget,
    }
}

/// Map the declarative timeout settings into a concrete plan
pub fn build_timeout_plan(config: &TimeoutConfig) -> TimeoutPlan {
    match config.total {
        Some(total) => TimeoutPlan {
            total: Some(Duration::from_secs_f64(total)),
            connect: None,
            read: None,
        },
        None => TimeoutPlan {
            total: None,
            connect: (config.connect > 0.0).then(|| Duration::from_secs_f64(config.connect)),
            read: (config.read > 0.0).then(|| Duration::from_secs_f64(config.read)),
        },
    }
}

impl RetryPlan {
    /// Whether a failure of the given kind may still be retried; decrements
    /// the matching counter when it can.
    ///
    /// The method check applies to the single request method this client
    /// ever issues (GET); an explicit allow-list without it disables
    /// retries entirely.
    pub fn consume(&mut self, kind: FailureKind, method: &str) -> bool {
        match &mut self.budget {
            RetryBudget::Total(remaining) => {
                if *remaining == 0 {
                    return false;
                }
                *remaining -= 1;
                true
            }
            RetryBudget::Granular {
                connect,
                read,
                status,
                other,
                allowed_methods,
                ..
            } => {
                if let Some(methods) = allowed_methods
                    && !methods.iter().any(|m| m.eq_ignore_ascii_case(method))
                {
                    return false;
                }
                let counter = match kind {
                    FailureKind::Connect => connect,
                    FailureKind::Read => read,
                    FailureKind::Status => status,
                    FailureKind::Other => other,
                };
                if *counter == 0 {
                    return false;
                }
                *counter -= 1;
                true
            }
        }
    }

    /// Whether the given HTTP status forces a retry attempt
    pub fn retries_status(&self, status: u16) -> bool {
        match &self.budget {
            RetryBudget::Total(_) => false,
            RetryBudget::Granular {
                status_forcelist, ..
            } => status_forcelist
                .as_ref()
                .is_some_and(|list| list.contains(&status)),
        }
    }

    /// Pause before the next attempt, given how many retries already ran.
    /// `None` when backoff is disabled.
    pub fn backoff_delay(&self, previous_retries: u32) -> Option<Duration> {
        let backoff = self.backoff.as_ref()?;
        let mut seconds = backoff.factor * f64::from(2u32.saturating_pow(previous_retries));
        if let Some(max) = backoff.max {
            seconds = seconds.min(max);
        }
        if let Some(jitter) = backoff.jitter {
            seconds += rand::random_range(0.0..jitter);
        }
        Some(Duration::from_secs_f64(seconds))
    }
}
