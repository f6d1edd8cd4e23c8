//! Progress tracking types for scoring runs.
//!
//! These types provide structured progress information that can be used
//! to drive a progress bar, log progress, or measure scorer latency.

use instant::Instant;

/// Progress of one pipeline run across its scorers.
#[derive(Debug, Clone)]
pub struct ScorerProgress {
    /// Number of scorers that have finished
    pub completed: usize,
    /// Total number of scorers in the pipeline
    pub total: usize,
    /// Method name of the scorer about to run, `None` once all finished
    pub current: Option<String>,
    /// Time elapsed since the run started (milliseconds)
    pub elapsed_ms: u64,
}

impl ScorerProgress {
    /// Creates a new progress instance.
    pub fn new(completed: usize, total: usize, current: Option<String>, elapsed_ms: u64) -> Self {
        Self {
            completed,
            total,
            current,
            elapsed_ms,
        }
    }

    /// Returns the completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    /// Returns true if every scorer has finished.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Returns estimated time remaining in milliseconds, if computable.
    ///
    /// Assumes each remaining scorer costs the average of the finished ones.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        if self.completed == 0 || self.completed >= self.total {
            return None;
        }
        let remaining = self.total - self.completed;
        let ms_per_scorer = self.elapsed_ms / self.completed as u64;
        Some(remaining as u64 * ms_per_scorer)
    }
}

/// Helper for tracking elapsed time during scoring.
pub struct ProgressTimer {
    start: Instant,
}

impl ProgressTimer {
    /// Creates a new timer starting now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for ProgressTimer {
    fn default() -> Self {
        Self::new()
    }
}
