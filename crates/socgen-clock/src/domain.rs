//! Clock domains.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reset::ResetSynchronizer;
use crate::signal::{Polarity, SignalRef};
use crate::source::ClockOrigin;

/// Handle to a declared domain inside one [`ClockResetGraph`](crate::ClockResetGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainHandle(pub(crate) usize);

/// What drives a domain's clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainDriver {
    /// Direct connection to a pin, peripheral clock or other domain.
    Direct(ClockOrigin),
    /// Output `output` of PLL instance `pll`.
    Pll { pll: String, output: usize },
}

impl fmt::Display for DomainDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainDriver::Direct(origin) => write!(f, "{}", origin.signal_ref()),
            DomainDriver::Pll { pll, output } => write!(f, "{pll}.clkout{output}"),
        }
    }
}

/// Synchronized reset of a domain. Always active-high.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResetSignal {
    pub synchronizer: ResetSynchronizer,
}

impl ResetSignal {
    /// Polarity seen by consumers. Source polarities are folded into the
    /// synchronizer's input terms at wiring time.
    pub fn polarity(&self) -> Polarity {
        Polarity::ActiveHigh
    }

    pub fn signal_ref(&self) -> SignalRef {
        SignalRef::DomainReset(self.synchronizer.domain.clone())
    }
}

/// A named synchronous domain in a finalized clock tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClockDomain {
    pub name: String,
    pub frequency_hz: u64,
    pub driver: DomainDriver,
    /// `None` for reset-less domains.
    pub reset: Option<ResetSignal>,
}

impl ClockDomain {
    pub fn clock_signal(&self) -> SignalRef {
        SignalRef::DomainClock(self.name.clone())
    }

    pub fn reset_signal(&self) -> Option<SignalRef> {
        self.reset.as_ref().map(ResetSignal::signal_ref)
    }

    pub fn is_reset_less(&self) -> bool {
        self.reset.is_none()
    }

    /// Clock period in nanoseconds.
    pub fn period_ns(&self) -> f64 {
        1e9 / self.frequency_hz as f64
    }
}

impl fmt::Display for ClockDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.3} MHz from {}",
            self.name,
            self.frequency_hz as f64 / 1e6,
            self.driver
        )?;
        match &self.reset {
            Some(r) => write!(f, ", reset {}", r.synchronizer.input_expr()),
            None => write!(f, ", reset-less"),
        }
    }
}
