//! Error types for clock/reset composition.

use thiserror::Error;

/// Errors raised while wiring or finalizing a clock/reset graph.
///
/// Every variant is fatal to the current build: they describe a structurally
/// invalid clock configuration, never a transient condition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClockError {
    /// A PLL output frequency cannot be derived within the family's ranges.
    #[error(
        "PLL '{pll}' cannot derive {requested_hz} Hz for domain '{domain}' (nearest achievable: {})",
        nearest_display(.nearest_hz)
    )]
    ClockConfig {
        pll: String,
        domain: String,
        requested_hz: u64,
        nearest_hz: Option<u64>,
    },

    #[error("PLL '{pll}' input {input_hz} Hz is outside the supported range {min_hz}..={max_hz} Hz")]
    InputOutOfRange {
        pll: String,
        input_hz: u64,
        min_hz: u64,
        max_hz: u64,
    },

    #[error("PLL '{pll}' requests {requested} outputs but the family supports at most {max}")]
    TooManyOutputs {
        pll: String,
        requested: usize,
        max: usize,
    },

    /// A domain depends on a peripheral or domain that was never instantiated.
    #[error("domain '{domain}' depends on '{dependency}', which was never instantiated")]
    UnresolvedClockSource { domain: String, dependency: String },

    #[error("domain '{0}' was declared but never wired to a clock source")]
    UnwiredDomain(String),

    #[error("domain '{0}' is already declared")]
    DuplicateDomain(String),

    #[error("unknown clock domain: '{0}'")]
    UnknownDomain(String),

    #[error("domain '{0}' is already wired; clock wiring is write-once")]
    AlreadyWired(String),

    #[error("PLL '{0}' is already instantiated")]
    DuplicatePll(String),

    #[error("peripheral '{0}' already provides a clock")]
    DuplicatePeripheral(String),

    #[error("clock graph has no 'sys' domain")]
    MissingSysDomain,

    #[error("clock cycle detected involving domain '{0}'")]
    ClockCycle(String),

    #[error("'{consumer}' expects {expected_hz} Hz from '{dependency}', which runs at {actual_hz} Hz")]
    FrequencyMismatch {
        consumer: String,
        dependency: String,
        expected_hz: u64,
        actual_hz: u64,
    },

    /// A clock recovered by a peripheral is reset by that peripheral, not a board pin.
    #[error("domain '{domain}' is clocked by '{peripheral}' and cannot take a board pin reset")]
    PinResetOnRecoveredClock { domain: String, peripheral: String },

    #[error("reset synchronizer for '{domain}' needs at least 2 stages, got {stages}")]
    InvalidSynchronizer { domain: String, stages: u8 },
}

fn nearest_display(nearest: &Option<u64>) -> String {
    match nearest {
        Some(hz) => format!("{hz} Hz"),
        None => "none".to_string(),
    }
}

/// Result type for clock operations.
pub type Result<T> = std::result::Result<T, ClockError>;
