use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::SystemTime;

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Counters shared by the prediction path and the registry poller
#[derive(Debug)]
pub struct ServingStats {
    /// Successful predictions
    pub prediction_count: AtomicUsize,
    /// Predictions rejected for bad input or model faults
    pub prediction_errors: AtomicUsize,
    /// Requests that arrived before any model was loaded
    pub unavailable_count: AtomicUsize,
    /// Latest prediction latency in microseconds
    pub latest_prediction_latency_us: AtomicUsize,
    /// Registry polls attempted
    pub poll_count: AtomicUsize,
    /// Polls where the registry could not be queried
    pub poll_failures: AtomicUsize,
    /// Candidates that could not be loaded
    pub load_failures: AtomicUsize,
    /// Bundles adopted into service
    pub adoptions: AtomicUsize,
    /// Creation timestamp
    pub created_at: SystemTime,
    /// Last adoption timestamp (Unix seconds, 0 if none)
    pub last_adopted_at: AtomicU64,
}

impl ServingStats {
    pub fn new() -> Self {
        Self {
            prediction_count: AtomicUsize::new(0),
            prediction_errors: AtomicUsize::new(0),
            unavailable_count: AtomicUsize::new(0),
            latest_prediction_latency_us: AtomicUsize::new(0),
            poll_count: AtomicUsize::new(0),
            poll_failures: AtomicUsize::new(0),
            load_failures: AtomicUsize::new(0),
            adoptions: AtomicUsize::new(0),
            created_at: SystemTime::now(),
            last_adopted_at: AtomicU64::new(0),
        }
    }

    pub fn record_adoption(&self) {
        self.adoptions.fetch_add(1, Ordering::SeqCst);
        self.last_adopted_at.store(unix_secs(), Ordering::SeqCst);
    }

    /// Get formatted statistics as a string
    pub fn format_stats(&self) -> String {
        format!(
            "Predictions: {} | Errors: {} | Unavailable: {} | Latency: {}μs | Polls: {} ({} failed) | Load failures: {} | Adoptions: {}",
            self.prediction_count.load(Ordering::Relaxed),
            self.prediction_errors.load(Ordering::Relaxed),
            self.unavailable_count.load(Ordering::Relaxed),
            self.latest_prediction_latency_us.load(Ordering::Relaxed),
            self.poll_count.load(Ordering::Relaxed),
            self.poll_failures.load(Ordering::Relaxed),
            self.load_failures.load(Ordering::Relaxed),
            self.adoptions.load(Ordering::Relaxed),
        )
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or_default()
            .as_secs()
    }

    /// Seconds since the last adoption, `None` before the first one
    pub fn time_since_adoption_secs(&self) -> Option<u64> {
        match self.last_adopted_at.load(Ordering::Relaxed) {
            0 => None,
            at => Some(unix_secs().saturating_sub(at)),
        }
    }
}

impl Default for ServingStats {
    fn default() -> Self {
        Self::new()
    }
}
