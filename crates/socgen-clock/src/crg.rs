//! Clock/reset graph: write-once domain wiring and finalization.
//!
//! A [`ClockResetGraph`] is built once per SoC. Domains are declared, then
//! wired exactly once to a pin, a peripheral clock, another domain, or a PLL
//! output. Peripheral clocks may be referenced before the peripheral exists;
//! [`ClockResetGraph::finalize`] resolves those references and produces an
//! immutable [`ClockTree`].

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::domain::{ClockDomain, DomainDriver, DomainHandle, ResetSignal};
use crate::error::{ClockError, Result};
use crate::pll::{PllConfig, PllModel, PllSpec, ResetPolicy};
use crate::reset::{ResetInput, ResetSynchronizer, ResetTerm};
use crate::signal::SignalRef;
use crate::source::{ClockOrigin, PeripheralClock};

/// The domain every SoC must have.
pub const SYS_DOMAIN: &str = "sys";

/// A hint the toolchain must honor when timing the design.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingException {
    /// Do not time paths between these two nets.
    FalsePath { from: SignalRef, to: SignalRef },
}

impl fmt::Display for TimingException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingException::FalsePath { from, to } => write!(f, "false path {from} -> {to}"),
        }
    }
}

/// Period constraint for a clock entering the fabric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeriodConstraint {
    pub signal: SignalRef,
    pub period_ns: f64,
}

/// A solved PLL instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PllInstance {
    pub spec: PllSpec,
    pub config: PllConfig,
}

#[derive(Debug, Clone)]
enum Wiring {
    Direct {
        origin: ClockOrigin,
        resets: Vec<ResetInput>,
    },
    Pll {
        pll: usize,
        output: usize,
    },
}

#[derive(Debug, Clone)]
struct DomainSlot {
    name: String,
    reset_less: bool,
    wiring: Option<Wiring>,
}

/// Mutable clock/reset graph under construction.
#[derive(Debug, Default)]
pub struct ClockResetGraph {
    slots: Vec<DomainSlot>,
    plls: Vec<PllInstance>,
    exceptions: Vec<TimingException>,
    provided: BTreeMap<String, PeripheralClock>,
}

impl ClockResetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a domain with a synchronized reset.
    pub fn declare_domain(&mut self, name: &str) -> Result<DomainHandle> {
        self.declare(name, false)
    }

    /// Declare a domain without reset.
    pub fn declare_reset_less_domain(&mut self, name: &str) -> Result<DomainHandle> {
        self.declare(name, true)
    }

    fn declare(&mut self, name: &str, reset_less: bool) -> Result<DomainHandle> {
        if self.domain(name).is_some() {
            return Err(ClockError::DuplicateDomain(name.to_string()));
        }
        self.slots.push(DomainSlot {
            name: name.to_string(),
            reset_less,
            wiring: None,
        });
        Ok(DomainHandle(self.slots.len() - 1))
    }

    /// Look up a declared domain.
    pub fn domain(&self, name: &str) -> Option<DomainHandle> {
        self.slots.iter().position(|s| s.name == name).map(DomainHandle)
    }

    /// Name of a declared domain.
    pub fn domain_name(&self, handle: DomainHandle) -> Option<&str> {
        self.slots.get(handle.0).map(|s| s.name.as_str())
    }

    /// Whether the domain has been wired.
    pub fn is_wired(&self, handle: DomainHandle) -> bool {
        self.slots.get(handle.0).is_some_and(|s| s.wiring.is_some())
    }

    /// Wire a domain directly to a clock origin.
    ///
    /// `resets` may mix polarities; they are normalized to active-high when
    /// the graph is finalized.
    pub fn wire_from_source(
        &mut self,
        domain: DomainHandle,
        origin: ClockOrigin,
        resets: Vec<ResetInput>,
    ) -> Result<()> {
        let slot = self
            .slots
            .get(domain.0)
            .ok_or_else(|| ClockError::UnknownDomain(format!("#{}", domain.0)))?;
        let name = slot.name.clone();
        if slot.wiring.is_some() {
            return Err(ClockError::AlreadyWired(name));
        }
        if let ClockOrigin::Domain(parent) = &origin {
            if *parent == name {
                return Err(ClockError::ClockCycle(name));
            }
            if self.domain(parent).is_none() {
                return Err(ClockError::UnknownDomain(parent.clone()));
            }
        }
        check_recovered_resets(&name, &origin, &resets)?;

        let Some(slot) = self.slots.get_mut(domain.0) else {
            return Err(ClockError::UnknownDomain(name));
        };
        let resets = if slot.reset_less && !resets.is_empty() {
            warn!("domain '{name}' is reset-less; ignoring {} reset input(s)", resets.len());
            Vec::new()
        } else {
            resets
        };
        info!("clock domain '{name}' wired from {}", origin.signal_ref());
        slot.wiring = Some(Wiring::Direct { origin, resets });
        Ok(())
    }

    /// Instantiate a PLL and wire every output domain it lists.
    ///
    /// Either all outputs are wired or, on error, none are.
    pub fn wire_from_pll(&mut self, spec: &PllSpec, model: &dyn PllModel) -> Result<PllConfig> {
        if self.plls.iter().any(|p| p.spec.name == spec.name) {
            return Err(ClockError::DuplicatePll(spec.name.clone()));
        }
        match &spec.input {
            ClockOrigin::Domain(parent) if self.domain(parent).is_none() => {
                return Err(ClockError::UnknownDomain(parent.clone()));
            }
            ClockOrigin::Pin(src) if src.nominal_frequency_hz != spec.input_freq_hz => {
                return Err(ClockError::FrequencyMismatch {
                    consumer: spec.name.clone(),
                    dependency: spec.input.signal_ref().to_string(),
                    expected_hz: spec.input_freq_hz,
                    actual_hz: src.nominal_frequency_hz,
                });
            }
            _ => {}
        }

        let mut handles = Vec::with_capacity(spec.outputs.len());
        for out in &spec.outputs {
            let handle = self
                .domain(&out.domain)
                .ok_or_else(|| ClockError::UnknownDomain(out.domain.clone()))?;
            if self.is_wired(handle) || handles.contains(&handle) {
                return Err(ClockError::AlreadyWired(out.domain.clone()));
            }
            check_recovered_resets(&out.domain, &spec.input, &spec.resets)?;
            handles.push(handle);
        }

        let config = model.solve(spec)?;
        for out in &config.outputs {
            debug!(
                "PLL '{}' clkout -> '{}': {} Hz (/{})",
                spec.name, out.domain, out.achieved_hz, out.out_div
            );
        }

        let pll = self.plls.len();
        self.plls.push(PllInstance {
            spec: spec.clone(),
            config: config.clone(),
        });
        for (output, handle) in handles.into_iter().enumerate() {
            self.slots[handle.0].wiring = Some(Wiring::Pll { pll, output });
        }
        info!(
            "PLL '{}' ({}) wired {} output(s)",
            spec.name,
            model.family(),
            spec.outputs.len()
        );
        Ok(config)
    }

    /// Record a false path between two nets.
    pub fn add_timing_exception(&mut self, from: SignalRef, to: SignalRef) {
        let exception = TimingException::FalsePath { from, to };
        if !self.exceptions.contains(&exception) {
            debug!("timing exception: {exception}");
            self.exceptions.push(exception);
        }
    }

    /// Resolve a forward-declared peripheral clock.
    pub fn provide_peripheral(&mut self, clock: PeripheralClock) -> Result<()> {
        if self.provided.contains_key(&clock.peripheral) {
            return Err(ClockError::DuplicatePeripheral(clock.peripheral));
        }
        info!(
            "peripheral '{}' provides a {} Hz clock",
            clock.peripheral, clock.frequency_hz
        );
        self.provided.insert(clock.peripheral.clone(), clock);
        Ok(())
    }

    /// Peripherals referenced by the wiring.
    pub fn required_peripherals(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |p: &str| {
            if !names.iter().any(|n| n == p) {
                names.push(p.to_string());
            }
        };
        for slot in &self.slots {
            if let Some(Wiring::Direct { origin, resets }) = &slot.wiring {
                origin.peripheral().into_iter().for_each(&mut push);
                resets.iter().filter_map(ResetInput::peripheral).for_each(&mut push);
            }
        }
        for pll in &self.plls {
            pll.spec.input.peripheral().into_iter().for_each(&mut push);
            pll.spec
                .resets
                .iter()
                .filter_map(ResetInput::peripheral)
                .for_each(&mut push);
        }
        names
    }

    /// Check every dependency and freeze the graph.
    pub fn finalize(self) -> Result<ClockTree> {
        if self.domain(SYS_DOMAIN).is_none() {
            return Err(ClockError::MissingSysDomain);
        }
        for slot in &self.slots {
            if slot.wiring.is_none() {
                return Err(ClockError::UnwiredDomain(slot.name.clone()));
            }
        }
        self.check_peripherals()?;
        for exception in &self.exceptions {
            let TimingException::FalsePath { from, to } = exception;
            for sig in [from, to] {
                if let SignalRef::DomainClock(d) | SignalRef::DomainReset(d) = sig {
                    if self.domain(d).is_none() {
                        return Err(ClockError::UnknownDomain(d.clone()));
                    }
                }
            }
        }

        let mut freqs: Vec<Option<u64>> = vec![None; self.slots.len()];
        let mut visiting = vec![false; self.slots.len()];
        for i in 0..self.slots.len() {
            self.frequency_of(i, &mut freqs, &mut visiting)?;
        }

        let mut domains = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.iter().enumerate() {
            let frequency_hz = freqs[i].unwrap_or_default();
            let (driver, reset) = match slot.wiring.as_ref() {
                Some(Wiring::Direct { origin, resets }) => {
                    let mut terms: Vec<ResetTerm> = Vec::new();
                    match origin {
                        ClockOrigin::Peripheral { peripheral, .. } => {
                            terms.push(ResetInput::Peripheral(peripheral.clone()).normalize());
                        }
                        ClockOrigin::Domain(parent) => {
                            let parent_has_reset = self
                                .slots
                                .iter()
                                .any(|s| s.name == *parent && !s.reset_less);
                            if parent_has_reset {
                                terms.push(ResetTerm {
                                    signal: SignalRef::DomainReset(parent.clone()),
                                    inverted: false,
                                });
                            }
                        }
                        ClockOrigin::Pin(_) => {}
                    }
                    push_unique(&mut terms, resets.iter().map(ResetInput::normalize));
                    (DomainDriver::Direct(origin.clone()), (!slot.reset_less).then_some(terms))
                }
                Some(Wiring::Pll { pll, output }) => {
                    let inst = &self.plls[*pll];
                    let policy = inst.spec.outputs[*output].reset_policy;
                    let mut terms = vec![ResetTerm::pll_unlocked(&inst.spec.name)];
                    if let Some(p) = inst.spec.input.peripheral() {
                        push_unique(&mut terms, [ResetInput::Peripheral(p.to_string()).normalize()]);
                    }
                    push_unique(&mut terms, inst.spec.resets.iter().map(ResetInput::normalize));
                    let reset = (!slot.reset_less && policy == ResetPolicy::Synchronized)
                        .then_some(terms);
                    (
                        DomainDriver::Pll {
                            pll: inst.spec.name.clone(),
                            output: *output,
                        },
                        reset,
                    )
                }
                None => return Err(ClockError::UnwiredDomain(slot.name.clone())),
            };
            domains.push(ClockDomain {
                name: slot.name.clone(),
                frequency_hz,
                driver,
                reset: reset.map(|terms| ResetSignal {
                    synchronizer: ResetSynchronizer::new(slot.name.clone(), terms),
                }),
            });
        }

        let period_constraints = self.period_constraints();
        info!(
            "clock tree finalized: {} domain(s), {} PLL(s), {} timing exception(s)",
            domains.len(),
            self.plls.len(),
            self.exceptions.len()
        );
        ClockTree::try_from(ClockTreeData {
            domains,
            plls: self.plls,
            timing_exceptions: self.exceptions,
            period_constraints,
            peripheral_clocks: self.provided.into_values().collect(),
        })
    }

    fn check_peripherals(&self) -> Result<()> {
        let lookup = |consumer: &str, peripheral: &str| {
            self.provided
                .get(peripheral)
                .ok_or_else(|| ClockError::UnresolvedClockSource {
                    domain: consumer.to_string(),
                    dependency: peripheral.to_string(),
                })
        };
        let check_freq = |consumer: &str, clock: &PeripheralClock, expected_hz: u64| {
            if clock.frequency_hz != expected_hz {
                return Err(ClockError::FrequencyMismatch {
                    consumer: consumer.to_string(),
                    dependency: clock.peripheral.clone(),
                    expected_hz,
                    actual_hz: clock.frequency_hz,
                });
            }
            Ok(())
        };

        for slot in &self.slots {
            if let Some(Wiring::Direct { origin, resets }) = &slot.wiring {
                if let ClockOrigin::Peripheral {
                    peripheral,
                    frequency_hz,
                } = origin
                {
                    let clock = lookup(&slot.name, peripheral)?;
                    check_freq(&slot.name, clock, *frequency_hz)?;
                }
                for p in resets.iter().filter_map(ResetInput::peripheral) {
                    lookup(&slot.name, p)?;
                }
            }
        }
        for pll in &self.plls {
            // Report against the first domain the PLL feeds.
            let consumer = pll
                .spec
                .outputs
                .first()
                .map(|o| o.domain.as_str())
                .unwrap_or(pll.spec.name.as_str());
            if let Some(p) = pll.spec.input.peripheral() {
                let clock = lookup(consumer, p)?;
                check_freq(&pll.spec.name, clock, pll.spec.input_freq_hz)?;
            }
            for p in pll.spec.resets.iter().filter_map(ResetInput::peripheral) {
                lookup(consumer, p)?;
            }
        }
        Ok(())
    }

    fn frequency_of(
        &self,
        i: usize,
        freqs: &mut [Option<u64>],
        visiting: &mut [bool],
    ) -> Result<u64> {
        if let Some(f) = freqs[i] {
            return Ok(f);
        }
        if visiting[i] {
            return Err(ClockError::ClockCycle(self.slots[i].name.clone()));
        }
        visiting[i] = true;

        let f = match self.slots[i].wiring.as_ref() {
            Some(Wiring::Direct { origin, .. }) => self.origin_frequency(origin, freqs, visiting)?,
            Some(Wiring::Pll { pll, output }) => {
                let inst = &self.plls[*pll];
                if inst.spec.input.peripheral().is_none() {
                    let input_hz = self.origin_frequency(&inst.spec.input, freqs, visiting)?;
                    if input_hz != inst.spec.input_freq_hz {
                        return Err(ClockError::FrequencyMismatch {
                            consumer: inst.spec.name.clone(),
                            dependency: inst.spec.input.signal_ref().to_string(),
                            expected_hz: inst.spec.input_freq_hz,
                            actual_hz: input_hz,
                        });
                    }
                }
                inst.config.outputs[*output].achieved_hz
            }
            None => return Err(ClockError::UnwiredDomain(self.slots[i].name.clone())),
        };

        visiting[i] = false;
        freqs[i] = Some(f);
        Ok(f)
    }

    fn origin_frequency(
        &self,
        origin: &ClockOrigin,
        freqs: &mut [Option<u64>],
        visiting: &mut [bool],
    ) -> Result<u64> {
        match origin {
            ClockOrigin::Pin(src) => Ok(src.nominal_frequency_hz),
            ClockOrigin::Peripheral { frequency_hz, .. } => Ok(*frequency_hz),
            ClockOrigin::Domain(parent) => {
                let j = self
                    .domain(parent)
                    .ok_or_else(|| ClockError::UnknownDomain(parent.clone()))?
                    .0;
                self.frequency_of(j, freqs, visiting)
            }
        }
    }

    fn period_constraints(&self) -> Vec<PeriodConstraint> {
        let mut out: Vec<PeriodConstraint> = Vec::new();
        let origins = self
            .slots
            .iter()
            .filter_map(|s| match &s.wiring {
                Some(Wiring::Direct { origin, .. }) => Some(origin),
                _ => None,
            })
            .chain(self.plls.iter().map(|p| &p.spec.input));
        for origin in origins {
            let (signal, hz) = match origin {
                ClockOrigin::Pin(src) => (origin.signal_ref(), src.nominal_frequency_hz),
                ClockOrigin::Peripheral { frequency_hz, .. } => {
                    (origin.signal_ref(), *frequency_hz)
                }
                ClockOrigin::Domain(_) => continue,
            };
            if hz > 0 && !out.iter().any(|c| c.signal == signal) {
                out.push(PeriodConstraint {
                    signal,
                    period_ns: 1e9 / hz as f64,
                });
            }
        }
        out
    }
}

fn push_unique(terms: &mut Vec<ResetTerm>, new: impl IntoIterator<Item = ResetTerm>) {
    for term in new {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
}

// A recovered clock is reset by its own link, never by a board pin.
fn check_recovered_resets(domain: &str, origin: &ClockOrigin, resets: &[ResetInput]) -> Result<()> {
    if let Some(p) = origin.peripheral() {
        if resets.iter().any(|r| matches!(r, ResetInput::Pin(_))) {
            return Err(ClockError::PinResetOnRecoveredClock {
                domain: domain.to_string(),
                peripheral: p.to_string(),
            });
        }
    }
    Ok(())
}

/// Finalized, read-only clock/reset graph.
///
/// Always contains a `sys` domain, whether built by `finalize` or
/// deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "ClockTreeData")]
pub struct ClockTree {
    domains: Vec<ClockDomain>,
    plls: Vec<PllInstance>,
    timing_exceptions: Vec<TimingException>,
    period_constraints: Vec<PeriodConstraint>,
    peripheral_clocks: Vec<PeripheralClock>,
    #[serde(skip)]
    sys: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClockTreeData {
    domains: Vec<ClockDomain>,
    plls: Vec<PllInstance>,
    timing_exceptions: Vec<TimingException>,
    period_constraints: Vec<PeriodConstraint>,
    peripheral_clocks: Vec<PeripheralClock>,
}

impl TryFrom<ClockTreeData> for ClockTree {
    type Error = ClockError;

    fn try_from(data: ClockTreeData) -> Result<Self> {
        let sys = data
            .domains
            .iter()
            .position(|d| d.name == SYS_DOMAIN)
            .ok_or(ClockError::MissingSysDomain)?;
        Ok(Self {
            domains: data.domains,
            plls: data.plls,
            timing_exceptions: data.timing_exceptions,
            period_constraints: data.period_constraints,
            peripheral_clocks: data.peripheral_clocks,
            sys,
        })
    }
}

impl ClockTree {
    /// Domains in declaration order.
    pub fn domains(&self) -> &[ClockDomain] {
        &self.domains
    }

    pub fn domain(&self, name: &str) -> Option<&ClockDomain> {
        self.domains.iter().find(|d| d.name == name)
    }

    /// The `sys` domain.
    pub fn sys(&self) -> &ClockDomain {
        &self.domains[self.sys]
    }

    pub fn sys_frequency_hz(&self) -> u64 {
        self.sys().frequency_hz
    }

    pub fn plls(&self) -> &[PllInstance] {
        &self.plls
    }

    pub fn timing_exceptions(&self) -> &[TimingException] {
        &self.timing_exceptions
    }

    pub fn period_constraints(&self) -> &[PeriodConstraint] {
        &self.period_constraints
    }

    pub fn peripheral_clocks(&self) -> &[PeripheralClock] {
        &self.peripheral_clocks
    }
}

impl fmt::Display for ClockTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Clock Tree ===")?;
        for d in &self.domains {
            writeln!(f, "  {d}")?;
        }
        for p in &self.plls {
            writeln!(
                f,
                "  PLL {} ({}): {} Hz x{} /{} = {} Hz VCO",
                p.spec.name,
                p.config.family,
                p.spec.input_freq_hz,
                p.config.mult,
                p.config.div,
                p.config.vco_hz
            )?;
        }
        for e in &self.timing_exceptions {
            writeln!(f, "  {e}")?;
        }
        Ok(())
    }
}
