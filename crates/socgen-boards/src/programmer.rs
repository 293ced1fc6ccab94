//! Bitstream programmers.
//!
//! Programmers are external tools. Their diagnostics are passed back to the
//! operator unmodified.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;
use serde::{Deserialize, Serialize};

use crate::board::{ProgrammerConfig, ProgrammerKind};

/// Errors from a programmer invocation.
#[derive(Debug, thiserror::Error)]
pub enum ProgrammerError {
    #[error("programmer '{programmer}' cannot {operation}")]
    Unsupported {
        programmer: String,
        operation: &'static str,
    },

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and failed; `diagnostic` is its output, untouched.
    #[error("'{program}' exited with {status}:\n{diagnostic}")]
    Failed {
        program: String,
        status: String,
        diagnostic: String,
    },

    #[error("cannot derive size and interface of flash part '{0}'")]
    UnknownFlashPart(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads bitstreams into volatile configuration memory or writes flash.
pub trait Programmer {
    fn name(&self) -> &str;

    /// Whether [`Programmer::flash`] is available.
    fn can_flash(&self) -> bool;

    fn load_bitstream(&self, bitstream: &Path) -> Result<(), ProgrammerError>;

    fn flash(&self, offset: u64, image: &Path) -> Result<(), ProgrammerError>;
}

/// Per-tool command overrides from project configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProgrammerOverride {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub load_args: Option<Vec<String>>,
    #[serde(default)]
    pub flash_args: Option<Vec<String>>,
}

/// A programmer that shells out to a command-line tool.
///
/// Arguments may reference `{bitstream}`, `{offset}`, `{device}`, `{board}`
/// and, for Vivado, `{script}` (a generated Tcl file next to the bitstream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandProgrammer {
    kind: ProgrammerKind,
    program: String,
    load_args: Vec<String>,
    flash_args: Option<Vec<String>>,
    vars: BTreeMap<String, String>,
    flash_part: Option<String>,
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl CommandProgrammer {
    /// Default invocation for the configured tool.
    pub fn new(config: &ProgrammerConfig, device: &str) -> Self {
        let board_args = match &config.board {
            Some(_) => args(&["-b", "{board}"]),
            None => Vec::new(),
        };
        let (program, load_args, flash_args) = match config.kind {
            ProgrammerKind::Vivado => {
                let batch = args(&["-mode", "batch", "-nolog", "-nojournal", "-source", "{script}"]);
                let flash = config.flash_part.as_ref().map(|_| batch.clone());
                ("vivado", batch, flash)
            }
            ProgrammerKind::OpenFpgaLoader => {
                let mut load = board_args.clone();
                load.push("{bitstream}".into());
                let mut flash = board_args;
                flash.extend(args(&["-f", "-o", "{offset}", "{bitstream}"]));
                ("openFPGALoader", load, Some(flash))
            }
            ProgrammerKind::Efinity => ("ftdi_program.py", args(&["{bitstream}", "-m", "jtag"]), None),
            ProgrammerKind::Tinyprog => (
                "tinyprog",
                args(&["-p", "{bitstream}"]),
                Some(args(&["-p", "{bitstream}", "-a", "{offset}"])),
            ),
        };

        let mut vars = BTreeMap::new();
        vars.insert("device".to_string(), device.to_string());
        if let Some(board) = &config.board {
            vars.insert("board".to_string(), board.clone());
        }
        Self {
            kind: config.kind,
            program: program.into(),
            load_args,
            flash_args,
            vars,
            flash_part: config.flash_part.clone(),
        }
    }

    /// Apply project overrides on top of the defaults.
    pub fn with_override(mut self, o: &ProgrammerOverride) -> Self {
        if let Some(program) = &o.program {
            self.program = program.clone();
        }
        if let Some(load_args) = &o.load_args {
            self.load_args = load_args.clone();
        }
        if let Some(flash_args) = &o.flash_args {
            self.flash_args = Some(flash_args.clone());
        }
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with every `{var}` replaced.
    pub fn expand(&self, template: &[String], extra: &[(&str, String)]) -> Vec<String> {
        template
            .iter()
            .map(|arg| {
                let mut out = arg.clone();
                let vars = self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()));
                let extra = extra.iter().map(|(k, v)| (*k, v.as_str()));
                for (key, value) in vars.chain(extra) {
                    out = out.replace(&format!("{{{key}}}"), value);
                }
                out
            })
            .collect()
    }

    fn run(&self, args: Vec<String>) -> Result<(), ProgrammerError> {
        info!("running {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ProgrammerError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        let diagnostic = if output.stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            String::from_utf8_lossy(&output.stderr).into_owned()
        };
        Err(ProgrammerError::Failed {
            program: self.program.clone(),
            status: output.status.to_string(),
            diagnostic,
        })
    }

    fn write_script(&self, path: &Path, suffix: &str, body: String) -> Result<PathBuf, ProgrammerError> {
        let mut script = path.as_os_str().to_owned();
        script.push(suffix);
        let script = PathBuf::from(script);
        fs::write(&script, body)?;
        Ok(script)
    }
}

fn vivado_load_tcl(bitstream: &Path) -> String {
    format!(
        "open_hw_manager\n\
         connect_hw_server\n\
         open_hw_target\n\
         set dev [lindex [get_hw_devices] 0]\n\
         set_property PROGRAM.FILE {{{}}} $dev\n\
         program_hw_devices $dev\n\
         quit\n",
        bitstream.display()
    )
}

/// `write_cfgmem` geometry of a Vivado cfgmem part name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CfgmemGeometry {
    size_mbytes: u64,
    interface: &'static str,
}

/// Density comes from the last digit run of the part number (Mbit), the
/// interface from the widest `xN` in the suffix: `s25fl032p-spi-x1_x2_x4`
/// is 4 MB on SPIx4.
fn cfgmem_geometry(part: &str) -> Result<CfgmemGeometry, ProgrammerError> {
    let unknown = || ProgrammerError::UnknownFlashPart(part.to_string());
    let (number, suffix) = part.split_once('-').unwrap_or((part, ""));
    let digits = number
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .last()
        .ok_or_else(unknown)?;
    let mbit: u64 = digits.parse().map_err(|_| unknown())?;
    if mbit == 0 {
        return Err(unknown());
    }
    let interface = if suffix.contains("x8") {
        "SPIx8"
    } else if suffix.contains("x4") {
        "SPIx4"
    } else if suffix.contains("x2") {
        "SPIx2"
    } else {
        "SPIx1"
    };
    Ok(CfgmemGeometry {
        size_mbytes: mbit.div_ceil(8),
        interface,
    })
}

fn vivado_flash_tcl(part: &str, offset: u64, image: &Path) -> Result<String, ProgrammerError> {
    let geometry = cfgmem_geometry(part)?;
    let mcs = image.with_extension("mcs");
    let load = match image.extension().and_then(|e| e.to_str()) {
        Some("bit") => "-loadbit",
        _ => "-loaddata",
    };
    Ok(format!(
        "write_cfgmem -force -format mcs -interface {interface} -size {size} \
         {load} {{up 0x{offset:x} {image}}} -file {{{mcs}}}\n\
         open_hw_manager\n\
         connect_hw_server\n\
         open_hw_target\n\
         set dev [lindex [get_hw_devices] 0]\n\
         create_hw_cfgmem -hw_device $dev [lindex [get_cfgmem_parts {{{part}}}] 0]\n\
         set cfgmem [get_property PROGRAM.HW_CFGMEM $dev]\n\
         set_property PROGRAM.FILES [list {{{mcs}}}] $cfgmem\n\
         set_property PROGRAM.ADDRESS_RANGE {{use_file}} $cfgmem\n\
         set_property PROGRAM.ERASE 1 $cfgmem\n\
         set_property PROGRAM.VERIFY 1 $cfgmem\n\
         create_hw_bitstream -hw_device $dev [get_property PROGRAM.HW_CFGMEM_BITFILE $dev]\n\
         program_hw_devices $dev\n\
         program_hw_cfgmem -hw_cfgmem $cfgmem\n\
         quit\n",
        interface = geometry.interface,
        size = geometry.size_mbytes,
        image = image.display(),
        mcs = mcs.display(),
    ))
}

impl Programmer for CommandProgrammer {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn can_flash(&self) -> bool {
        self.kind.can_flash() && self.flash_args.is_some()
    }

    fn load_bitstream(&self, bitstream: &Path) -> Result<(), ProgrammerError> {
        let mut extra = vec![("bitstream", bitstream.display().to_string())];
        if self.kind == ProgrammerKind::Vivado {
            let script = self.write_script(bitstream, ".load.tcl", vivado_load_tcl(bitstream))?;
            extra.push(("script", script.display().to_string()));
        }
        self.run(self.expand(&self.load_args, &extra))
    }

    fn flash(&self, offset: u64, image: &Path) -> Result<(), ProgrammerError> {
        let template = match (&self.flash_args, self.can_flash()) {
            (Some(template), true) => template,
            _ => {
                return Err(ProgrammerError::Unsupported {
                    programmer: self.name().to_string(),
                    operation: "flash",
                })
            }
        };
        let mut extra = vec![
            ("bitstream", image.display().to_string()),
            ("offset", format!("0x{offset:x}")),
        ];
        if let (ProgrammerKind::Vivado, Some(part)) = (self.kind, &self.flash_part) {
            let script = self.write_script(image, ".flash.tcl", vivado_flash_tcl(part, offset, image)?)?;
            extra.push(("script", script.display().to_string()));
        }
        self.run(self.expand(template, &extra))
    }
}
