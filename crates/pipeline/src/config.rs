use std::time::Duration;

/// Pacing knobs. The protocol is correct for any values, zero included; they
/// only shape interleaving and wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Generator pause after each enqueue.
    pub dispatch_interval: Duration,
    /// Processor pause after each status transition (simulated handling).
    pub stage_interval: Duration,
    /// Longest the processor waits on an empty buffer before rechecking
    /// cancellation and producer shutdown.
    pub poll_interval: Duration,
    /// Head start given to the generator before the processor begins.
    pub start_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_millis(1000),
            stage_interval: Duration::from_millis(1500),
            poll_interval: Duration::from_millis(500),
            start_delay: Duration::from_millis(2000),
        }
    }
}

impl PipelineConfig {
    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            dispatch_interval: Duration::ZERO,
            stage_interval: Duration::ZERO,
            poll_interval: Duration::ZERO,
            start_delay: Duration::ZERO,
        }
    }

    /// Defaults overridden by `HAUL_DISPATCH_MS`, `HAUL_STAGE_MS`,
    /// `HAUL_POLL_MS` and `HAUL_START_DELAY_MS`. Unparseable values are ignored.
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ms = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok()).map(Duration::from_millis);
        let d = Self::default();
        Self {
            dispatch_interval: ms("HAUL_DISPATCH_MS").unwrap_or(d.dispatch_interval),
            stage_interval: ms("HAUL_STAGE_MS").unwrap_or(d.stage_interval),
            poll_interval: ms("HAUL_POLL_MS").unwrap_or(d.poll_interval),
            start_delay: ms("HAUL_START_DELAY_MS").unwrap_or(d.start_delay),
        }
    }
}
