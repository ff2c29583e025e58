//! Observable events
//!
//! Events are explicit and typed. Each maps to one stable log event name.

use std::fmt;

use super::logger::Severity;

/// Observable events in chart query and explain processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Workflow execution
    /// Step kind not recognized, rows passed through
    UnknownStep,
    /// Filter pattern failed to compile
    InvalidPattern,

    // Computation
    /// Query answered from the cache
    CacheHit,
    /// Computation call failed
    ComputationFailed,

    // Explain
    /// Candidate produced
    CandidateEmitted,
    /// Candidate dropped (empty or degenerate distribution)
    CandidateSkipped,
    /// Result arrived for a superseded request
    StaleResultDiscarded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::UnknownStep => "WORKFLOW_UNKNOWN_STEP",
            Event::InvalidPattern => "FILTER_INVALID_PATTERN",

            Event::CacheHit => "QUERY_CACHE_HIT",
            Event::ComputationFailed => "COMPUTATION_FAILED",

            Event::CandidateEmitted => "EXPLAIN_CANDIDATE_EMITTED",
            Event::CandidateSkipped => "EXPLAIN_CANDIDATE_SKIPPED",
            Event::StaleResultDiscarded => "EXPLAIN_STALE_RESULT_DISCARDED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::UnknownStep | Event::InvalidPattern => Severity::Warn,
            Event::ComputationFailed => Severity::Error,
            Event::CacheHit
            | Event::CandidateEmitted
            | Event::CandidateSkipped
            | Event::StaleResultDiscarded => Severity::Trace,
            Event::ConfigLoaded => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
