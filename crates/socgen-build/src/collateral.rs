//! Generated collateral: linker regions, C headers and timing constraints.
//!
//! Every generator is a pure function of the [`Soc`], so identical
//! descriptions always produce byte-identical files.

use std::fmt::Write;

use socgen_clock::TimingException;
use socgen_soc::{PeripheralKind, RegionKind, Soc};

const HEADER_NOTE: &str = "Generated by socgen. Do not edit.";

fn guard(name: &str) -> (String, String) {
    let guard = format!("__GENERATED_{}_H", name.to_ascii_uppercase());
    (
        format!("// {HEADER_NOTE}\n#ifndef {guard}\n#define {guard}\n\n"),
        format!("\n#endif /* {guard} */\n"),
    )
}

fn ident(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// GNU ld `MEMORY` block with one entry per region.
pub fn regions_ld(soc: &Soc) -> String {
    let mut out = format!("/* {HEADER_NOTE} */\nMEMORY {{\n");
    for r in soc.address_space.regions() {
        let _ = writeln!(
            out,
            "\t{} : ORIGIN = 0x{:08x}, LENGTH = 0x{:08x}",
            r.name, r.origin, r.size
        );
    }
    out.push_str("}\n");
    out
}

/// `<NAME>_BASE` / `<NAME>_SIZE` for every memory region.
pub fn mem_h(soc: &Soc) -> String {
    let (head, tail) = guard("mem");
    let mut out = head;
    for r in soc.address_space.regions() {
        if r.kind == RegionKind::Io && r.name == "csr" {
            continue;
        }
        let name = ident(&r.name);
        let _ = writeln!(out, "#ifndef {name}_BASE");
        let _ = writeln!(out, "#define {name}_BASE 0x{:08x}L", r.origin);
        let _ = writeln!(out, "#define {name}_SIZE 0x{:08x}", r.size);
        let _ = writeln!(out, "#endif\n");
    }
    out.push_str(&tail);
    out
}

/// SoC configuration: clock, CPU and attached peripherals.
pub fn soc_h(soc: &Soc) -> String {
    let (head, tail) = guard("soc");
    let mut out = head;
    let _ = writeln!(out, "#define CONFIG_IDENT \"{}\"", soc.ident);
    let _ = writeln!(out, "#define CONFIG_CLOCK_FREQUENCY {}", soc.sys_clk_freq());
    let _ = writeln!(out, "#define CONFIG_CPU_TYPE_{}", ident(&soc.cpu.name));
    let _ = writeln!(out, "#define CONFIG_CPU_VARIANT_{}", ident(&soc.cpu.variant));
    let _ = writeln!(out, "#define CONFIG_CPU_RESET_ADDR 0x{:08x}", soc.reset_vector());
    if soc.address_space.get("rom").is_some_and(|r| r.is_alias()) {
        out.push_str("#define CONFIG_BIOS_IN_FLASH\n");
    }
    for domain in soc.clock.domains() {
        if domain.name != socgen_clock::SYS_DOMAIN {
            let _ = writeln!(
                out,
                "#define CONFIG_{}_CLOCK_FREQUENCY {}",
                ident(&domain.name),
                domain.frequency_hz
            );
        }
    }
    for p in &soc.peripherals {
        let _ = writeln!(out, "\n#define CONFIG_HAS_{}", ident(p.name()));
        match p {
            PeripheralKind::Pcie(pcie) => {
                let _ = writeln!(out, "#define PCIE_LANES {}", pcie.lanes);
                let _ = writeln!(out, "#define PCIE_DATA_WIDTH {}", pcie.data_width);
                let _ = writeln!(out, "#define PCIE_BAR0_SIZE 0x{:x}", pcie.bar0_size);
                let _ = writeln!(out, "#define PCIE_DMA_CHANNELS {}", pcie.ndmas);
            }
            PeripheralKind::SpiFlash(f) => {
                let _ = writeln!(out, "#define SPIFLASH_MODULE_NAME \"{}\"", f.module.name);
                let _ = writeln!(out, "#define SPIFLASH_SIZE 0x{:x}", f.module.size);
                let mode = serde_json::to_value(f.mode)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                let _ = writeln!(out, "#define SPIFLASH_MODE \"{mode}\"");
                if f.with_master {
                    out.push_str("#define SPIFLASH_HAS_MASTER\n");
                }
            }
            PeripheralKind::LedChaser(l) => {
                let _ = writeln!(out, "#define LEDS_COUNT {}", l.pads.len());
                let _ = writeln!(
                    out,
                    "#define LEDS_TICKS_PER_STEP {}",
                    l.ticks_per_step(soc.sys_clk_freq())
                );
            }
            PeripheralKind::VideoTerminal(v) => {
                let _ = writeln!(out, "#define VIDEO_TERMINAL_TIMINGS \"{}\"", v.timings);
            }
        }
    }
    out.push_str(&tail);
    out
}

/// CSR bank base addresses.
pub fn csr_h(soc: &Soc) -> String {
    let (head, tail) = guard("csr");
    let mut out = head;
    let base = soc.address_space.get("csr").map(|r| r.origin).unwrap_or_default();
    let _ = writeln!(out, "#ifndef CSR_BASE\n#define CSR_BASE 0x{base:08x}L\n#endif\n");
    for bank in &soc.csr_banks {
        let _ = writeln!(
            out,
            "#define CSR_{}_BASE (CSR_BASE + 0x{:x}L)",
            ident(&bank.name),
            bank.origin - base
        );
    }
    out.push_str(&tail);
    out
}

/// SDC timing constraints: input clock periods and false paths.
pub fn sdc(soc: &Soc) -> String {
    let mut out = format!("# {HEADER_NOTE}\n");
    for c in soc.clock.period_constraints() {
        let _ = writeln!(
            out,
            "create_clock -name {net} -period {:.3} [get_nets {net}]",
            c.period_ns,
            net = c.signal
        );
    }
    for e in soc.clock.timing_exceptions() {
        match e {
            TimingException::FalsePath { from, to } => {
                let _ = writeln!(out, "set_false_path -from [get_nets {from}] -to [get_nets {to}]");
            }
        }
    }
    out
}

/// PCIe host driver configuration.
pub fn driver_config_h(soc: &Soc) -> Option<String> {
    let pcie = soc.peripherals.iter().find_map(|p| match p {
        PeripheralKind::Pcie(pcie) => Some(pcie),
        _ => None,
    })?;
    let (head, tail) = guard("config");
    let mut out = head;
    let _ = writeln!(out, "#define PCIE_LANES {}", pcie.lanes);
    let _ = writeln!(out, "#define DMA_CHANNELS {}", pcie.ndmas);
    let _ = writeln!(out, "#define DMA_ADDR_WIDTH {}", soc.cpu.address_width);
    let _ = writeln!(out, "#define DMA_DATA_WIDTH {}", pcie.data_width);
    let _ = writeln!(out, "#define BAR0_SIZE 0x{:x}", pcie.bar0_size);
    let _ = writeln!(out, "#define DMA_BUFFER_COUNT 256");
    out.push_str(&tail);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use socgen_boards::{assemble_soc, find_builtin, BoardPlatform, BuildOptions};

    fn soc(board: &str, options: BuildOptions) -> Soc {
        let board = find_builtin(board).unwrap();
        let mut platform = BoardPlatform::new(&board);
        assemble_soc(&board, &mut platform, &options).unwrap()
    }

    #[test]
    fn linker_regions_for_flash_boot() {
        let soc = soc("tinyfpga_bx", BuildOptions::default());
        let ld = regions_ld(&soc);
        assert!(ld.contains("\trom : ORIGIN = 0x20050000, LENGTH = 0x00008000"), "{ld}");
        assert!(ld.contains("spiflash : ORIGIN = 0x20000000, LENGTH = 0x00100000"));
        let h = soc_h(&soc);
        assert!(h.contains("CONFIG_CPU_RESET_ADDR 0x20050000"));
        assert!(h.contains("CONFIG_BIOS_IN_FLASH"));
        assert!(h.contains("SPIFLASH_MODE \"1x\""));
    }

    #[test]
    fn csr_offsets() {
        let soc = soc("ego1", BuildOptions::default());
        let h = csr_h(&soc);
        assert!(h.contains("#define CSR_BASE 0xf0000000L"));
        assert!(h.contains("#define CSR_LEDS_BASE (CSR_BASE + 0x2000L)"), "{h}");
        assert!(!mem_h(&soc).contains("CSR_BASE"));
    }

    #[test]
    fn sdc_false_path() {
        let soc = soc(
            "decklink_intensity_pro_4k",
            BuildOptions {
                with_pcie: true,
                ..BuildOptions::default()
            },
        );
        let sdc = sdc(&soc);
        assert!(sdc.contains("create_clock -name pcie_clk -period 8.000"), "{sdc}");
        assert!(sdc.contains("set_false_path -from [get_nets sys_clk] -to [get_nets pll.clkin]"));
        assert!(driver_config_h(&soc).unwrap().contains("DMA_CHANNELS 1"));
    }

    #[test]
    fn no_driver_without_pcie() {
        let soc = soc("ego1", BuildOptions::default());
        assert!(driver_config_h(&soc).is_none());
        assert!(soc_h(&soc).contains("CONFIG_VGA_CLOCK_FREQUENCY 25000000"));
    }
}
