//! Live log feed for dashboard clients.
//!
//! A [`LogFeed`] fans entries out to subscribers over a Tokio broadcast
//! channel and keeps a bounded history so late joiners can catch up. Entries
//! come from domain events and, optionally, from a background simulator that
//! replays canned SOC telemetry.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default number of entries retained for late subscribers.
pub const DEFAULT_HISTORY_SIZE: usize = 75;

/// Default broadcast channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default interval between simulated entries.
pub const DEFAULT_SIMULATION_INTERVAL: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Critical,
}

/// One line of the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Broadcast channel plus bounded history of log entries.
pub struct LogFeed {
    tx: broadcast::Sender<LogEntry>,
    history: RwLock<VecDeque<LogEntry>>,
    history_size: usize,
}

impl Default for LogFeed {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl LogFeed {
    /// Creates a feed retaining up to `history_size` entries.
    pub fn new(history_size: usize) -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            tx,
            history: RwLock::new(VecDeque::with_capacity(history_size)),
            history_size,
        }
    }

    /// Publishes an entry to history and to all current subscribers.
    ///
    /// The send happens under the history lock, so a concurrent
    /// [`subscribe_with_history`](Self::subscribe_with_history) sees each
    /// entry exactly once: in its snapshot or on its receiver.
    pub async fn publish(&self, entry: LogEntry) {
        let mut history = self.history.write().await;
        if self.history_size > 0 {
            while history.len() >= self.history_size {
                history.pop_front();
            }
            history.push_back(entry.clone());
        }

        // No subscribers is fine; the entry still lands in history.
        if self.tx.send(entry).is_err() {
            debug!("Log feed entry published with no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    /// Snapshot of the history, oldest first, plus a receiver for every entry
    /// published after it.
    pub async fn subscribe_with_history(&self) -> (Vec<LogEntry>, broadcast::Receiver<LogEntry>) {
        let history = self.history.read().await;
        let rx = self.tx.subscribe();
        (history.iter().cloned().collect(), rx)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Returns retained entries, oldest first. `limit` keeps the newest `n`.
    pub async fn recent(&self, limit: Option<usize>) -> Vec<LogEntry> {
        let history = self.history.read().await;
        let skip = match limit {
            Some(n) => history.len().saturating_sub(n),
            None => 0,
        };
        history.iter().skip(skip).cloned().collect()
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }
}

struct Template {
    level: LogLevel,
    message: &'static str,
    source: &'static str,
}

const TEMPLATES: [Template; 15] = [
    Template {
        level: LogLevel::Info,
        message: "System integrity check passed - all sensors nominal",
        source: "CORE-MONITOR",
    },
    Template {
        level: LogLevel::Warn,
        message: "Brute force attempt detected on SSH port 22 - rate limiting applied",
        source: "IDS-SENSOR-04",
    },
    Template {
        level: LogLevel::Error,
        message: "Unauthorized subnet scan detected - connection terminated",
        source: "FIREWALL-02",
    },
    Template {
        level: LogLevel::Info,
        message: "Neural threat pattern database updated - 14,882 new signatures",
        source: "AI-ENGINE",
    },
    Template {
        level: LogLevel::Warn,
        message: "Suspicious DNS query: xf-99.bit - classified as C2 domain",
        source: "DNS-FILTER",
    },
    Template {
        level: LogLevel::Critical,
        message: "ALERT: Lateral movement detected on VLAN-10 segment",
        source: "EDR-AGENT",
    },
    Template {
        level: LogLevel::Info,
        message: "TLS certificate renewed - expiry extended 90 days",
        source: "PKI-MANAGER",
    },
    Template {
        level: LogLevel::Warn,
        message: "Memory anomaly on Finance-PC-07 - process injection suspected",
        source: "EDR-AGENT",
    },
    Template {
        level: LogLevel::Error,
        message: "SQL injection payload blocked by WAF - rule 941300 triggered",
        source: "WAF-CLUSTER",
    },
    Template {
        level: LogLevel::Info,
        message: "Threat level recalibrated by ML model - confidence 94.2%",
        source: "AI-ENGINE",
    },
    Template {
        level: LogLevel::Critical,
        message: "DARKNET ALERT: Company domain detected in credential dump",
        source: "DARKNET-MONITOR",
    },
    Template {
        level: LogLevel::Warn,
        message: "Unusual after-hours access by jhbadmin01 - SIEM correlated",
        source: "UEBA-ENGINE",
    },
    Template {
        level: LogLevel::Info,
        message: "Backup verification complete - all 1,247 systems backed up",
        source: "BACKUP-MGR",
    },
    Template {
        level: LogLevel::Error,
        message: "VPN tunnel disruption on edge-node-3 - failover activated",
        source: "NETWORK-OPS",
    },
    Template {
        level: LogLevel::Info,
        message: "Zero-trust policy evaluated - 3 devices quarantined for review",
        source: "ZT-ENGINE",
    },
];

/// Builds one random simulated entry.
pub fn simulated_entry() -> LogEntry {
    let mut rng = rand::thread_rng();
    // TEMPLATES is a non-empty const array.
    let template = TEMPLATES.choose(&mut rng).unwrap_or(&TEMPLATES[0]);
    LogEntry::new(template.level, template.message).with_source(template.source)
}

/// Spawns a task that publishes a simulated entry every `interval`.
///
/// The task runs until the returned handle is aborted.
pub fn spawn_simulator(feed: Arc<LogFeed>, interval: Duration) -> JoinHandle<()> {
    info!(interval_ms = interval.as_millis() as u64, "Starting log feed simulator");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            feed.publish(simulated_entry()).await;
        }
    })
}
