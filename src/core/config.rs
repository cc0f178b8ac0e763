//! Sync configuration.
//!
//! Games pick a latency class that sets how often the polling fallback runs;
//! everything else has defaults that suit every game in the suite.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How latency-sensitive a game is. Sets the polling interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyClass {
    /// Buzzer races, live drawing.
    Realtime,
    /// Ordinary turn-based play.
    #[default]
    Turn,
    /// Slow deliberation (voting rounds).
    Relaxed,
}

impl LatencyClass {
    #[must_use]
    pub const fn poll_interval(self) -> Duration {
        match self {
            LatencyClass::Realtime => Duration::from_millis(300),
            LatencyClass::Turn => Duration::from_millis(1000),
            LatencyClass::Relaxed => Duration::from_millis(2000),
        }
    }
}

/// What the reconciler does with a snapshot older than what we hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleGuard {
    /// Reject snapshots with a lower revision than the last applied one.
    #[default]
    Revision,
    /// Accept whatever arrives last (wall-clock parity).
    Disabled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Window in which repeated coalesced commits collapse into one write.
    #[serde(with = "millis")]
    pub coalesce_delay: Duration,

    pub latency: LatencyClass,

    /// Overrides the latency class interval when set.
    #[serde(with = "opt_millis")]
    pub poll_interval_override: Option<Duration>,

    pub stale_guard: StaleGuard,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            coalesce_delay: Duration::from_millis(500),
            latency: LatencyClass::default(),
            poll_interval_override: None,
            stale_guard: StaleGuard::default(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn new(latency: LatencyClass) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_coalesce_delay(mut self, delay: Duration) -> Self {
        self.coalesce_delay = delay;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_override = Some(interval);
        self
    }

    #[must_use]
    pub fn with_stale_guard(mut self, guard: StaleGuard) -> Self {
        self.stale_guard = guard;
        self
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_override
            .unwrap_or_else(|| self.latency.poll_interval())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
