//! SoC composer: CPU base layout, peripherals and explicit regions.

use log::{debug, info};
use socgen_clock::ClockResetGraph;

use crate::address_space::AddressSpace;
use crate::cpu::CpuSpec;
use crate::error::{Result, SocError};
use crate::peripheral::{csr_slot, PeripheralKind, CSR_BANK_SIZE};
use crate::region::{MemoryRegion, Placement, RegionKind};
use crate::soc::{CsrBank, Soc};

/// Name of the region the CPU boots from.
pub const BOOT_ROM: &str = "rom";

/// Relative frequency error accepted between a video mode and its domain.
const PIXEL_CLOCK_TOLERANCE: f64 = 1e-2;

const BASE_CSR_BANKS: [&str; 4] = ["ctrl", "identifier_mem", "uart", "timer0"];

/// Builds an [`AddressSpace`] and collects peripherals for one SoC.
#[derive(Debug, Clone)]
pub struct SocComposer {
    ident: String,
    build_name: String,
    cpu: CpuSpec,
    space: AddressSpace,
    peripherals: Vec<PeripheralKind>,
    csr_banks: Vec<CsrBank>,
}

impl SocComposer {
    /// Seed the address space with the CPU's integrated memories and CSR window.
    pub fn with_cpu(cpu: CpuSpec) -> Result<Self> {
        let mut composer = Self {
            ident: "socgen SoC".into(),
            build_name: "soc".into(),
            space: AddressSpace::new(cpu.address_width, cpu.io_windows.clone()),
            cpu,
            peripherals: Vec::new(),
            csr_banks: Vec::new(),
        };

        let base = [
            ("rom", composer.cpu.integrated_rom_size, RegionKind::Rom),
            ("sram", composer.cpu.integrated_sram_size, RegionKind::Ram),
            ("main_ram", composer.cpu.integrated_main_ram_size, RegionKind::Ram),
            ("csr", composer.cpu.csr_size, RegionKind::Io),
        ];
        for (name, size, kind) in base {
            if size == 0 {
                continue;
            }
            let origin = composer.cpu.origin(name)?;
            composer.space.insert(MemoryRegion::new(name, origin, size, kind))?;
        }
        for bank in BASE_CSR_BANKS {
            composer.add_csr_bank(bank, "soc")?;
        }
        info!(
            "CPU {} ({}) seeded {} region(s)",
            composer.cpu.name,
            composer.cpu.variant,
            composer.space.len()
        );
        Ok(composer)
    }

    pub fn with_ident(mut self, ident: impl Into<String>) -> Self {
        self.ident = ident.into();
        self
    }

    pub fn with_build_name(mut self, build_name: impl Into<String>) -> Self {
        self.build_name = build_name.into();
        self
    }

    pub fn cpu(&self) -> &CpuSpec {
        &self.cpu
    }

    pub fn address_space(&self) -> &AddressSpace {
        &self.space
    }

    /// Add an explicit region.
    ///
    /// Aliases are always `Linker` regions and ignore `kind`. An alias named
    /// `rom` moves the CPU reset vector to its origin.
    pub fn add_region(
        &mut self,
        name: &str,
        placement: Placement,
        size: u64,
        kind: RegionKind,
    ) -> Result<()> {
        let region = match placement {
            Placement::Fixed(origin) => MemoryRegion::new(name, origin, size, kind),
            Placement::AliasOf { target, offset } => {
                let t = self
                    .space
                    .get(&target)
                    .ok_or_else(|| SocError::UnknownRegion(target.clone()))?;
                if offset > t.size || size > t.size - offset {
                    return Err(SocError::AliasOutOfBounds {
                        name: name.to_string(),
                        target,
                        offset,
                        size,
                        target_size: t.size,
                    });
                }
                MemoryRegion {
                    cached: t.cached,
                    alias_of: Some(target),
                    ..MemoryRegion::new(name, t.origin + offset, size, RegionKind::Linker)
                }
            }
        };
        let origin = region.origin;
        let is_alias = region.is_alias();
        self.space.insert(region)?;

        if is_alias && name == BOOT_ROM {
            self.cpu.set_reset_address(origin);
            info!("boot ROM aliased at 0x{origin:08x}; reset vector follows");
        }
        Ok(())
    }

    /// Attach one peripheral, claiming its regions and CSR banks.
    pub fn attach(&mut self, peripheral: PeripheralKind) -> Result<()> {
        peripheral.validate()?;
        if self.peripherals.iter().any(|p| p.name() == peripheral.name()) {
            return Err(SocError::DuplicatePeripheral(peripheral.name().to_string()));
        }
        for region in peripheral.regions(&self.cpu)? {
            self.space.insert(region)?;
        }
        for bank in peripheral.csr_banks() {
            self.add_csr_bank(&bank, peripheral.name())?;
        }
        info!("attached peripheral '{}'", peripheral.name());
        self.peripherals.push(peripheral);
        Ok(())
    }

    /// Attach peripherals in their fixed rank order, whatever the input order.
    pub fn attach_all(&mut self, mut peripherals: Vec<PeripheralKind>) -> Result<()> {
        peripherals.sort_by_key(PeripheralKind::rank);
        for p in peripherals {
            self.attach(p)?;
        }
        Ok(())
    }

    fn add_csr_bank(&mut self, bank: &str, owner: &str) -> Result<()> {
        let slot = csr_slot(bank).ok_or_else(|| SocError::InvalidPeripheral {
            peripheral: owner.to_string(),
            detail: format!("no CSR slot for bank '{bank}'"),
        })?;
        let origin = self.cpu.origin("csr")? + slot as u64 * CSR_BANK_SIZE;
        debug!("CSR bank {bank} -> slot {slot} @ 0x{origin:08x}");
        self.csr_banks.push(CsrBank {
            name: bank.to_string(),
            slot,
            origin,
        });
        Ok(())
    }

    /// Resolve peripheral clocks into the graph, freeze it, and check the
    /// whole description.
    pub fn finalize(self, mut crg: ClockResetGraph) -> Result<Soc> {
        for p in &self.peripherals {
            if let Some(clock) = p.exported_clock() {
                crg.provide_peripheral(clock)?;
            }
        }
        let clock = crg.finalize()?;

        for p in &self.peripherals {
            let domain = clock
                .domain(p.clock_domain())
                .ok_or_else(|| SocError::UnknownDomain {
                    peripheral: p.name().to_string(),
                    domain: p.clock_domain().to_string(),
                })?;
            if let PeripheralKind::VideoTerminal(v) = p {
                let pixel_hz = v.pixel_clock_hz().unwrap_or_default();
                let error = (domain.frequency_hz as f64 - pixel_hz as f64).abs();
                if error > pixel_hz as f64 * PIXEL_CLOCK_TOLERANCE {
                    return Err(SocError::InvalidPeripheral {
                        peripheral: p.name().to_string(),
                        detail: format!(
                            "{} needs a {pixel_hz} Hz pixel clock, domain '{}' runs at {} Hz",
                            v.timings, domain.name, domain.frequency_hz
                        ),
                    });
                }
            }
        }

        self.space.validate()?;
        let reset_vector = self.cpu.reset_vector();
        if !self.space.regions().iter().any(|r| r.contains(reset_vector)) {
            return Err(SocError::ResetVectorUnmapped(reset_vector));
        }

        info!(
            "SoC '{}' finalized: {} region(s), {} peripheral(s), sys {} Hz",
            self.ident,
            self.space.len(),
            self.peripherals.len(),
            clock.sys_frequency_hz()
        );
        Ok(Soc {
            ident: self.ident,
            build_name: self.build_name,
            cpu: self.cpu,
            clock,
            address_space: self.space,
            peripherals: self.peripherals,
            csr_banks: self.csr_banks,
        })
    }
}
