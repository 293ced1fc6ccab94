//! Reset inputs, polarity normalization, and reset synchronizers.

use serde::{Deserialize, Serialize};

use crate::error::{ClockError, Result};
use crate::signal::{Signal, SignalRef};

/// A reset request feeding a domain or a PLL, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetInput {
    /// A board pin; its polarity comes from the platform.
    Pin(Signal),
    /// The SoC controller's soft reset (active-high, driven from `sys`).
    Soft,
    /// The reset exported by a peripheral (active-high by convention).
    Peripheral(String),
}

impl ResetInput {
    /// Normalize to an active-high term.
    pub fn normalize(&self) -> ResetTerm {
        match self {
            ResetInput::Pin(sig) => ResetTerm {
                signal: SignalRef::Pin(sig.clone()),
                inverted: sig.polarity.is_inverted(),
            },
            ResetInput::Soft => ResetTerm {
                signal: SignalRef::SoftReset,
                inverted: false,
            },
            ResetInput::Peripheral(p) => ResetTerm {
                signal: SignalRef::PeripheralReset(p.clone()),
                inverted: false,
            },
        }
    }

    /// Name of the peripheral this input depends on, if any.
    pub fn peripheral(&self) -> Option<&str> {
        match self {
            ResetInput::Peripheral(p) => Some(p),
            _ => None,
        }
    }
}

/// One active-high term of a normalized reset expression.
///
/// The term is asserted when `signal` is high, or low if `inverted`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResetTerm {
    pub signal: SignalRef,
    pub inverted: bool,
}

impl ResetTerm {
    /// Term asserted while a PLL is not locked.
    pub fn pll_unlocked(pll: &str) -> Self {
        Self {
            signal: SignalRef::PllLocked(pll.to_string()),
            inverted: true,
        }
    }

    /// Expression text, e.g. `~user_btn0`.
    pub fn expr(&self) -> String {
        if self.inverted {
            format!("~{}", self.signal)
        } else {
            self.signal.to_string()
        }
    }
}

/// Async-assert, sync-deassert reset chain for one domain.
///
/// Assertion of any input reaches the domain immediately; deassertion is
/// clocked through `stages` flops, so the domain reset stays high for at
/// least `stages` cycles of the domain clock after every assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResetSynchronizer {
    pub domain: String,
    pub stages: u8,
    pub inputs: Vec<ResetTerm>,
}

impl ResetSynchronizer {
    pub const DEFAULT_STAGES: u8 = 2;

    pub fn new(domain: impl Into<String>, inputs: Vec<ResetTerm>) -> Self {
        Self {
            domain: domain.into(),
            stages: Self::DEFAULT_STAGES,
            inputs,
        }
    }

    /// Use a longer flop chain. Fewer than two stages cannot filter metastability.
    pub fn with_stages(mut self, stages: u8) -> Result<Self> {
        if stages < 2 {
            return Err(ClockError::InvalidSynchronizer {
                domain: self.domain,
                stages,
            });
        }
        self.stages = stages;
        Ok(self)
    }

    /// Guaranteed minimum reset pulse, in domain clock cycles.
    pub fn min_pulse_cycles(&self) -> u32 {
        self.stages as u32
    }

    /// Guaranteed minimum reset pulse in picoseconds at the given frequency.
    pub fn min_pulse_width_ps(&self, frequency_hz: u64) -> u64 {
        if frequency_hz == 0 {
            return 0;
        }
        let period_ps = 1_000_000_000_000u64.div_ceil(frequency_hz);
        period_ps * self.min_pulse_cycles() as u64
    }

    /// Combined asynchronous input, e.g. `~user_btn0 | crg.rst`.
    pub fn input_expr(&self) -> String {
        if self.inputs.is_empty() {
            return "0".to_string();
        }
        self.inputs
            .iter()
            .map(ResetTerm::expr)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Polarity;

    #[test]
    fn active_low_pin_is_inverted() {
        let term = ResetInput::Pin(Signal::new("user_btn", 0, Polarity::ActiveLow)).normalize();
        assert!(term.inverted);
        assert_eq!(term.expr(), "~user_btn0");

        let term = ResetInput::Pin(Signal::active_high("rst")).normalize();
        assert!(!term.inverted);
        assert_eq!(term.expr(), "rst0");
    }

    #[test]
    fn peripheral_and_soft_resets_are_active_high() {
        assert!(!ResetInput::Soft.normalize().inverted);
        let p = ResetInput::Peripheral("pcie".into());
        assert_eq!(p.peripheral(), Some("pcie"));
        assert_eq!(p.normalize().expr(), "pcie_rst");
    }

    #[test]
    fn synchronizer_pulse_width() {
        let sync = ResetSynchronizer::new("sys", vec![ResetInput::Soft.normalize()]);
        assert_eq!(sync.min_pulse_cycles(), 2);
        // 100 MHz -> 10 ns period -> 20 ns minimum pulse
        assert_eq!(sync.min_pulse_width_ps(100_000_000), 20_000);

        let sync = sync.with_stages(4).unwrap();
        assert_eq!(sync.min_pulse_cycles(), 4);
    }

    #[test]
    fn synchronizer_rejects_single_stage() {
        let err = ResetSynchronizer::new("sys", vec![]).with_stages(1).unwrap_err();
        assert!(matches!(err, ClockError::InvalidSynchronizer { stages: 1, .. }));
    }

    #[test]
    fn input_expression() {
        let sync = ResetSynchronizer::new(
            "sys",
            vec![
                ResetTerm::pll_unlocked("pll"),
                ResetInput::Soft.normalize(),
            ],
        );
        assert_eq!(sync.input_expr(), "~pll.locked | crg.rst");
        assert_eq!(ResetSynchronizer::new("sys", vec![]).input_expr(), "0");
    }
}
