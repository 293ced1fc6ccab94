//! Opaque wire handles and the named nets the clock graph refers to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Electrical polarity of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// True if the signal is asserted when the wire is low.
    pub fn is_inverted(self) -> bool {
        self == Polarity::ActiveLow
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::ActiveHigh => write!(f, "active-high"),
            Polarity::ActiveLow => write!(f, "active-low"),
        }
    }
}

/// A physical pin handed out by the platform.
///
/// Only the polarity carries meaning for composition; name and index
/// identify the pin for constraint files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Signal {
    pub name: String,
    pub index: usize,
    pub polarity: Polarity,
}

impl Signal {
    pub fn new(name: impl Into<String>, index: usize, polarity: Polarity) -> Self {
        Self {
            name: name.into(),
            index,
            polarity,
        }
    }

    /// An active-high signal at index 0.
    pub fn active_high(name: impl Into<String>) -> Self {
        Self::new(name, 0, Polarity::ActiveHigh)
    }

    /// An active-low signal at index 0.
    pub fn active_low(name: impl Into<String>) -> Self {
        Self::new(name, 0, Polarity::ActiveLow)
    }

    /// Net name used in generated collateral (`user_btn0`, `clk100`).
    pub fn net_name(&self) -> String {
        if self.index == 0 && self.name.chars().last().is_some_and(|c| c.is_ascii_digit()) {
            self.name.clone()
        } else {
            format!("{}{}", self.name, self.index)
        }
    }
}

/// A named net inside the clock/reset graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "name")]
pub enum SignalRef {
    /// A board pin.
    Pin(Signal),
    /// The clock of a domain.
    DomainClock(String),
    /// The (normalized, active-high) reset of a domain.
    DomainReset(String),
    /// The reference clock input of a PLL.
    PllClkIn(String),
    /// The lock indicator of a PLL.
    PllLocked(String),
    /// A clock exported by a peripheral (e.g. a PCIe link clock).
    PeripheralClock(String),
    /// A reset exported by a peripheral.
    PeripheralReset(String),
    /// The soft reset driven by the SoC controller.
    SoftReset,
}

impl fmt::Display for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalRef::Pin(s) => write!(f, "{}", s.net_name()),
            SignalRef::DomainClock(d) => write!(f, "{d}_clk"),
            SignalRef::DomainReset(d) => write!(f, "{d}_rst"),
            SignalRef::PllClkIn(p) => write!(f, "{p}.clkin"),
            SignalRef::PllLocked(p) => write!(f, "{p}.locked"),
            SignalRef::PeripheralClock(p) => write!(f, "{p}_clk"),
            SignalRef::PeripheralReset(p) => write!(f, "{p}_rst"),
            SignalRef::SoftReset => write!(f, "crg.rst"),
        }
    }
}
