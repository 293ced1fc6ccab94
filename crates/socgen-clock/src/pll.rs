//! PLL specification and configuration search.
//!
//! A PLL derives every output as `f_in * mult / (div * out_div)`. Feasibility
//! depends on the hardware family: each family publishes a [`PllConstraints`]
//! table and may override [`PllModel::solve`] entirely.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ClockError, Result};
use crate::reset::ResetInput;
use crate::source::ClockOrigin;

/// How a PLL output domain is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetPolicy {
    /// Held in reset while the PLL is unlocked or any PLL reset is asserted,
    /// released through a reset synchronizer.
    Synchronized,
    /// No reset (e.g., a pixel clock).
    None,
}

/// One requested PLL output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PllOutput {
    pub domain: String,
    pub target_freq_hz: u64,
    pub reset_policy: ResetPolicy,
}

/// A PLL instance request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PllSpec {
    /// Instance name (e.g., "pll").
    pub name: String,
    /// Reference clock.
    pub input: ClockOrigin,
    /// Reference clock frequency in Hz.
    pub input_freq_hz: u64,
    /// Outputs in port order.
    pub outputs: Vec<PllOutput>,
    /// Asynchronous resets of the PLL itself.
    pub resets: Vec<ResetInput>,
}

impl PllSpec {
    pub fn new(name: impl Into<String>, input: ClockOrigin, input_freq_hz: u64) -> Self {
        Self {
            name: name.into(),
            input,
            input_freq_hz,
            outputs: Vec::new(),
            resets: Vec::new(),
        }
    }

    /// Add a synchronized-reset output.
    pub fn output(mut self, domain: impl Into<String>, target_freq_hz: u64) -> Self {
        self.outputs.push(PllOutput {
            domain: domain.into(),
            target_freq_hz,
            reset_policy: ResetPolicy::Synchronized,
        });
        self
    }

    /// Add an output without reset.
    pub fn reset_less_output(mut self, domain: impl Into<String>, target_freq_hz: u64) -> Self {
        self.outputs.push(PllOutput {
            domain: domain.into(),
            target_freq_hz,
            reset_policy: ResetPolicy::None,
        });
        self
    }

    /// Add an asynchronous PLL reset.
    pub fn reset(mut self, input: ResetInput) -> Self {
        self.resets.push(input);
        self
    }
}

/// Multiply/divide and frequency ranges of a PLL family. All ranges are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PllConstraints {
    pub clkin_min_hz: u64,
    pub clkin_max_hz: u64,
    pub vco_min_hz: u64,
    pub vco_max_hz: u64,
    pub mult_min: u32,
    pub mult_max: u32,
    pub div_min: u32,
    pub div_max: u32,
    pub out_div_min: u32,
    pub out_div_max: u32,
    pub max_outputs: usize,
    /// Maximum relative error between target and achieved frequency.
    pub tolerance: f64,
}

/// Solved divider settings for one output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PllOutputConfig {
    pub domain: String,
    pub out_div: u32,
    pub achieved_hz: u64,
}

/// A complete PLL configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PllConfig {
    pub family: String,
    pub div: u32,
    pub mult: u32,
    pub vco_hz: u64,
    pub outputs: Vec<PllOutputConfig>,
}

/// A PLL hardware family.
pub trait PllModel {
    /// Family name (e.g., "s7-pll").
    fn family(&self) -> &str;

    /// Range table for this family.
    fn constraints(&self) -> PllConstraints;

    /// Find a configuration meeting every output, or report the first
    /// output that cannot be met together with its nearest achievable value.
    fn solve(&self, spec: &PllSpec) -> Result<PllConfig> {
        solve_with(self.family(), &self.constraints(), spec)
    }
}

/// Exhaustive search over (div, mult, out_div).
///
/// Dividers are scanned in increasing order and multipliers in decreasing
/// order so the highest valid VCO frequency wins, which minimizes jitter.
pub fn solve_with(family: &str, c: &PllConstraints, spec: &PllSpec) -> Result<PllConfig> {
    if spec.outputs.len() > c.max_outputs {
        return Err(ClockError::TooManyOutputs {
            pll: spec.name.clone(),
            requested: spec.outputs.len(),
            max: c.max_outputs,
        });
    }
    if spec.input_freq_hz < c.clkin_min_hz || spec.input_freq_hz > c.clkin_max_hz {
        return Err(ClockError::InputOutOfRange {
            pll: spec.name.clone(),
            input_hz: spec.input_freq_hz,
            min_hz: c.clkin_min_hz,
            max_hz: c.clkin_max_hz,
        });
    }

    let f_in = spec.input_freq_hz as f64;
    // Longest prefix of outputs satisfied by a single VCO setting, and the
    // VCO it was reached at; used to pick the offending output on failure.
    let mut best_prefix: (usize, f64) = (0, 0.0);

    for div in c.div_min..=c.div_max {
        for mult in (c.mult_min..=c.mult_max).rev() {
            let vco = f_in * mult as f64 / div as f64;
            if vco < c.vco_min_hz as f64 || vco > c.vco_max_hz as f64 {
                continue;
            }
            let mut outputs = Vec::with_capacity(spec.outputs.len());
            for out in &spec.outputs {
                match find_out_div(vco, out.target_freq_hz, c) {
                    Some(out_div) => outputs.push(PllOutputConfig {
                        domain: out.domain.clone(),
                        out_div,
                        achieved_hz: (vco / out_div as f64).round() as u64,
                    }),
                    None => break,
                }
            }
            if outputs.len() == spec.outputs.len() {
                let config = PllConfig {
                    family: family.to_string(),
                    div,
                    mult,
                    vco_hz: vco.round() as u64,
                    outputs,
                };
                debug!(
                    "PLL '{}' ({family}): {} Hz * {mult} / {div} = {} Hz VCO",
                    spec.name, spec.input_freq_hz, config.vco_hz
                );
                return Ok(config);
            }
            if outputs.len() > best_prefix.0 || best_prefix.1 == 0.0 {
                best_prefix = (outputs.len(), vco);
            }
        }
    }

    // Infeasible: report an output that no VCO can serve, otherwise the first
    // output that could not be met alongside its predecessors.
    let alone = spec.outputs.iter().find(|o| {
        nearest_achievable(f_in, o.target_freq_hz, c)
            .map(|n| !within_tolerance(n as f64, o.target_freq_hz, c.tolerance))
            .unwrap_or(true)
    });
    let (out, nearest_hz) = match alone {
        Some(out) => (out, nearest_achievable(f_in, out.target_freq_hz, c)),
        None => match spec.outputs.get(best_prefix.0) {
            Some(out) => (out, nearest_at_vco(best_prefix.1, out.target_freq_hz, c)),
            // No outputs requested and no valid VCO setting at all.
            None => {
                return Err(ClockError::InputOutOfRange {
                    pll: spec.name.clone(),
                    input_hz: spec.input_freq_hz,
                    min_hz: c.clkin_min_hz,
                    max_hz: c.clkin_max_hz,
                })
            }
        },
    };
    Err(ClockError::ClockConfig {
        pll: spec.name.clone(),
        domain: out.domain.clone(),
        requested_hz: out.target_freq_hz,
        nearest_hz,
    })
}

fn within_tolerance(achieved: f64, target: u64, tolerance: f64) -> bool {
    (achieved - target as f64).abs() <= target as f64 * tolerance
}

fn find_out_div(vco: f64, target: u64, c: &PllConstraints) -> Option<u32> {
    (c.out_div_min..=c.out_div_max).find(|d| within_tolerance(vco / *d as f64, target, c.tolerance))
}

fn nearest_at_vco(vco: f64, target: u64, c: &PllConstraints) -> Option<u64> {
    (c.out_div_min..=c.out_div_max)
        .map(|d| vco / d as f64)
        .min_by(|a, b| {
            let ea = (a - target as f64).abs();
            let eb = (b - target as f64).abs();
            ea.total_cmp(&eb)
        })
        .map(|f| f.round() as u64)
}

/// Closest frequency any valid setting of the family can produce.
pub fn nearest_achievable(f_in: f64, target: u64, c: &PllConstraints) -> Option<u64> {
    let mut best: Option<f64> = None;
    for div in c.div_min..=c.div_max {
        for mult in c.mult_min..=c.mult_max {
            let vco = f_in * mult as f64 / div as f64;
            if vco < c.vco_min_hz as f64 || vco > c.vco_max_hz as f64 {
                continue;
            }
            if let Some(f) = nearest_at_vco(vco, target, c) {
                let f = f as f64;
                let better = match best {
                    Some(b) => (f - target as f64).abs() < (b - target as f64).abs(),
                    None => true,
                };
                if better {
                    best = Some(f);
                }
            }
        }
    }
    best.map(|f| f.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ClockSource;

    fn table() -> PllConstraints {
        PllConstraints {
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
        }
    }

    fn clk100() -> ClockOrigin {
        ClockOrigin::Pin(ClockSource::new("clk100", 100_000_000))
    }

    #[test]
    fn solves_two_outputs() {
        let spec = PllSpec::new("pll", clk100(), 100_000_000)
            .output("sys", 100_000_000)
            .reset_less_output("vga", 25_000_000);
        let cfg = solve_with("test", &table(), &spec).unwrap();
        assert_eq!(cfg.outputs.len(), 2);
        assert_eq!(cfg.outputs[0].achieved_hz, 100_000_000);
        assert_eq!(cfg.outputs[1].achieved_hz, 25_000_000);
        assert!(cfg.vco_hz >= 800_000_000 && cfg.vco_hz <= 1_600_000_000);
    }

    #[test]
    fn highest_vco_preferred() {
        let spec = PllSpec::new("pll", clk100(), 100_000_000).output("sys", 100_000_000);
        let cfg = solve_with("test", &table(), &spec).unwrap();
        assert_eq!(cfg.div, 1);
        assert_eq!(cfg.mult, 16);
        assert_eq!(cfg.vco_hz, 1_600_000_000);
        assert_eq!(cfg.outputs[0].out_div, 16);
    }

    #[test]
    fn too_fast_reports_nearest() {
        let spec = PllSpec::new("pll", clk100(), 100_000_000).output("sys", 2_000_000_000);
        match solve_with("test", &table(), &spec).unwrap_err() {
            ClockError::ClockConfig {
                domain,
                requested_hz,
                nearest_hz,
                ..
            } => {
                assert_eq!(domain, "sys");
                assert_eq!(requested_hz, 2_000_000_000);
                assert_eq!(nearest_hz, Some(1_600_000_000));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn too_slow_reports_nearest() {
        let spec = PllSpec::new("pll", clk100(), 100_000_000).output("sys", 1_000_000);
        match solve_with("test", &table(), &spec).unwrap_err() {
            ClockError::ClockConfig { nearest_hz, .. } => {
                // 800 MHz / 128 is the slowest reachable output.
                assert_eq!(nearest_hz, Some(6_250_000));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn input_out_of_range() {
        let spec = PllSpec::new("pll", clk100(), 10_000_000).output("sys", 100_000_000);
        assert!(matches!(
            solve_with("test", &table(), &spec),
            Err(ClockError::InputOutOfRange { .. })
        ));
    }

    #[test]
    fn too_many_outputs() {
        let mut spec = PllSpec::new("pll", clk100(), 100_000_000);
        for i in 0..7 {
            spec = spec.output(format!("d{i}"), 100_000_000);
        }
        assert!(matches!(
            solve_with("test", &table(), &spec),
            Err(ClockError::TooManyOutputs { requested: 7, max: 6, .. })
        ));
    }

    #[test]
    fn sweep_within_tolerance() {
        // Every target reachable with an exact VCO/out_div pair is met within tolerance.
        let c = table();
        for target in (10..=400).step_by(5).map(|mhz| mhz as u64 * 1_000_000) {
            let spec = PllSpec::new("pll", clk100(), 100_000_000).output("sys", target);
            match solve_with("test", &c, &spec) {
                Ok(cfg) => {
                    let achieved = cfg.outputs[0].achieved_hz as f64;
                    assert!((achieved - target as f64).abs() <= target as f64 * c.tolerance);
                }
                Err(ClockError::ClockConfig { nearest_hz, .. }) => {
                    let nearest = nearest_hz.unwrap() as f64;
                    assert!((nearest - target as f64).abs() > target as f64 * c.tolerance);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }
}
