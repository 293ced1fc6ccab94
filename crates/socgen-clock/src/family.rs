//! Built-in PLL hardware families.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pll::{PllConstraints, PllModel};

/// PLL primitives found on supported boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PllFamily {
    /// Xilinx 7-Series PLLE2, speed grade -1.
    S7Pll,
    /// Xilinx 7-Series MMCME2, speed grade -1.
    S7Mmcm,
    /// Xilinx UltraScale+ MMCME4, speed grade -1.
    UspMmcm,
    /// Efinix Trion PLL.
    TrionPll,
}

impl PllFamily {
    pub const ALL: [PllFamily; 4] = [
        PllFamily::S7Pll,
        PllFamily::S7Mmcm,
        PllFamily::UspMmcm,
        PllFamily::TrionPll,
    ];
}

impl fmt::Display for PllFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.family())
    }
}

impl PllModel for PllFamily {
    fn family(&self) -> &str {
        match self {
            PllFamily::S7Pll => "s7-pll",
            PllFamily::S7Mmcm => "s7-mmcm",
            PllFamily::UspMmcm => "usp-mmcm",
            PllFamily::TrionPll => "trion-pll",
        }
    }

    fn constraints(&self) -> PllConstraints {
        match self {
            PllFamily::S7Pll => PllConstraints {
                clkin_min_hz: 19_000_000,
                clkin_max_hz: 800_000_000,
                vco_min_hz: 800_000_000,
                vco_max_hz: 1_600_000_000,
                mult_min: 2,
                mult_max: 64,
                div_min: 1,
                div_max: 56,
                out_div_min: 1,
                out_div_max: 128,
                max_outputs: 6,
                tolerance: 1e-2,
            },
            PllFamily::S7Mmcm => PllConstraints {
                clkin_min_hz: 10_000_000,
                clkin_max_hz: 800_000_000,
                vco_min_hz: 600_000_000,
                vco_max_hz: 1_200_000_000,
                mult_min: 2,
                mult_max: 64,
                div_min: 1,
                div_max: 106,
                out_div_min: 1,
                out_div_max: 128,
                max_outputs: 7,
                tolerance: 1e-2,
            },
            PllFamily::UspMmcm => PllConstraints {
                clkin_min_hz: 10_000_000,
                clkin_max_hz: 800_000_000,
                vco_min_hz: 800_000_000,
                vco_max_hz: 1_600_000_000,
                mult_min: 2,
                mult_max: 128,
                div_min: 1,
                div_max: 106,
                out_div_min: 1,
                out_div_max: 128,
                max_outputs: 7,
                tolerance: 1e-2,
            },
            PllFamily::TrionPll => PllConstraints {
                clkin_min_hz: 10_000_000,
                clkin_max_hz: 400_000_000,
                vco_min_hz: 500_000_000,
                vco_max_hz: 1_500_000_000,
                mult_min: 1,
                mult_max: 255,
                div_min: 1,
                div_max: 15,
                out_div_min: 1,
                out_div_max: 256,
                max_outputs: 3,
                tolerance: 1e-2,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pll::PllSpec;
    use crate::source::{ClockOrigin, ClockSource};

    fn spec(input_hz: u64, target_hz: u64) -> PllSpec {
        PllSpec::new(
            "pll",
            ClockOrigin::Pin(ClockSource::new("clk", input_hz)),
            input_hz,
        )
        .output("sys", target_hz)
    }

    #[test]
    fn tables_are_consistent() {
        for family in PllFamily::ALL {
            let c = family.constraints();
            assert!(c.clkin_min_hz < c.clkin_max_hz, "{family}");
            assert!(c.vco_min_hz < c.vco_max_hz, "{family}");
            assert!(c.mult_min <= c.mult_max, "{family}");
            assert!(c.div_min >= 1 && c.div_min <= c.div_max, "{family}");
            assert!(c.out_div_min >= 1, "{family}");
            assert!(c.max_outputs > 0, "{family}");
        }
    }

    #[test]
    fn board_defaults_are_feasible() {
        // ego1: 100 MHz in, 100 MHz sys
        assert!(PllFamily::S7Pll.solve(&spec(100_000_000, 100_000_000)).is_ok());
        // decklink: 125 MHz PCIe clock in, 125 MHz sys
        assert!(PllFamily::S7Pll.solve(&spec(125_000_000, 125_000_000)).is_ok());
        // snickerdoodle: 10 MHz external clock, 100 MHz sys
        assert!(PllFamily::S7Mmcm.solve(&spec(10_000_000, 100_000_000)).is_ok());
        // zcu106: 125 MHz differential clock, 125 MHz sys
        assert!(PllFamily::UspMmcm.solve(&spec(125_000_000, 125_000_000)).is_ok());
        // trion t20: 50 MHz in, 100 MHz sys
        assert!(PllFamily::TrionPll.solve(&spec(50_000_000, 100_000_000)).is_ok());
    }

    #[test]
    fn mmcm_low_input_exact() {
        let cfg = PllFamily::S7Mmcm.solve(&spec(10_000_000, 100_000_000)).unwrap();
        assert_eq!(cfg.outputs[0].achieved_hz, 100_000_000);
        assert_eq!(cfg.family, "s7-mmcm");
    }

    #[test]
    fn display_names() {
        assert_eq!(PllFamily::TrionPll.to_string(), "trion-pll");
        assert_eq!(PllFamily::S7Mmcm.to_string(), "s7-mmcm");
    }
}
