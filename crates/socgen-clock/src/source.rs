//! Clock inputs: board oscillators and peripheral-recovered clocks.

use serde::{Deserialize, Serialize};

use crate::signal::{Polarity, Signal, SignalRef};

/// A physical input clock read from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClockSource {
    /// Pin name (e.g., "clk100", "clk125").
    pub name: String,
    /// Pin index within its group.
    #[serde(default)]
    pub index: usize,
    /// Nominal oscillator frequency in Hz.
    pub nominal_frequency_hz: u64,
    /// Whether the clock arrives on a differential pair.
    #[serde(default)]
    pub is_differential: bool,
    /// Reset pin that belongs with this clock (e.g., a push button).
    #[serde(default)]
    pub associated_reset: Option<Signal>,
}

impl ClockSource {
    pub fn new(name: impl Into<String>, nominal_frequency_hz: u64) -> Self {
        Self {
            name: name.into(),
            index: 0,
            nominal_frequency_hz,
            is_differential: false,
            associated_reset: None,
        }
    }

    /// Mark the source as a differential pair.
    pub fn differential(mut self) -> Self {
        self.is_differential = true;
        self
    }

    /// Attach the reset pin that comes with this clock.
    pub fn with_reset(mut self, reset: Signal) -> Self {
        self.associated_reset = Some(reset);
        self
    }

    /// The pin handle of this clock. Clocks carry no polarity.
    pub fn signal(&self) -> Signal {
        Signal::new(self.name.clone(), self.index, Polarity::ActiveHigh)
    }

    /// Period in nanoseconds.
    pub fn period_ns(&self) -> f64 {
        1e9 / self.nominal_frequency_hz as f64
    }
}

/// A clock exported by an instantiated peripheral.
///
/// The exported reset follows domain conventions and is always active-high.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeripheralClock {
    /// Peripheral name (e.g., "pcie").
    pub peripheral: String,
    /// Frequency of the exported clock in Hz.
    pub frequency_hz: u64,
}

impl PeripheralClock {
    pub fn new(peripheral: impl Into<String>, frequency_hz: u64) -> Self {
        Self {
            peripheral: peripheral.into(),
            frequency_hz,
        }
    }
}

/// Where a domain (or a PLL) takes its clock from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockOrigin {
    /// A board oscillator pin.
    Pin(ClockSource),
    /// A clock recovered by a peripheral that may not be instantiated yet.
    Peripheral {
        peripheral: String,
        frequency_hz: u64,
    },
    /// The clock of another domain in the same graph.
    Domain(String),
}

impl ClockOrigin {
    /// The net this origin drives.
    pub fn signal_ref(&self) -> SignalRef {
        match self {
            ClockOrigin::Pin(src) => SignalRef::Pin(src.signal()),
            ClockOrigin::Peripheral { peripheral, .. } => {
                SignalRef::PeripheralClock(peripheral.clone())
            }
            ClockOrigin::Domain(d) => SignalRef::DomainClock(d.clone()),
        }
    }

    /// Name of the peripheral this origin depends on, if any.
    pub fn peripheral(&self) -> Option<&str> {
        match self {
            ClockOrigin::Peripheral { peripheral, .. } => Some(peripheral),
            _ => None,
        }
    }
}
