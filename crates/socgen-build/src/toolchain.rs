//! Synthesis toolchain invocation.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use socgen_boards::ToolchainKind;

use crate::error::{BuildError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag a caller sets to abandon a running build.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One synthesis run.
#[derive(Debug, Clone)]
pub struct ToolchainJob {
    pub board: String,
    pub device: String,
    pub build_name: String,
    /// Working directory holding the generated inputs.
    pub gateware_dir: PathBuf,
    /// Where the bitstream must appear on success.
    pub bitstream: PathBuf,
    pub cancel: CancelToken,
}

impl ToolchainJob {
    /// Combined stdout/stderr of the toolchain.
    pub fn log_path(&self) -> PathBuf {
        self.gateware_dir.join(format!("{}.log", self.build_name))
    }

    fn vars(&self) -> [(&'static str, String); 5] {
        [
            ("board", self.board.clone()),
            ("device", self.device.clone()),
            ("build_name", self.build_name.clone()),
            ("gateware_dir", self.gateware_dir.display().to_string()),
            ("bitstream", self.bitstream.display().to_string()),
        ]
    }
}

/// Turns generated inputs into a bitstream.
pub trait Toolchain {
    fn name(&self) -> &str;

    /// Run synthesis to completion, honouring `job.cancel`.
    fn run(&self, job: &ToolchainJob) -> Result<()>;
}

/// Per-toolchain command override from project configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolchainOverride {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

/// Runs a vendor tool as a child process inside the gateware directory.
///
/// Arguments may reference `{board}`, `{device}`, `{build_name}`,
/// `{gateware_dir}` and `{bitstream}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandToolchain {
    kind: ToolchainKind,
    program: String,
    args: Vec<String>,
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl CommandToolchain {
    /// Default invocation: each vendor flow is driven by a script named
    /// after the build.
    pub fn new(kind: ToolchainKind) -> Self {
        let (program, args) = match kind {
            ToolchainKind::Vivado => (
                "vivado",
                args(&["-mode", "batch", "-nolog", "-nojournal", "-source", "{build_name}.tcl"]),
            ),
            ToolchainKind::Efinity => (
                "efx_run.py",
                args(&["{build_name}.xml", "--flow", "compile", "--family", "Trion"]),
            ),
            ToolchainKind::Icestorm => ("sh", args(&["build_{build_name}.sh"])),
            ToolchainKind::Td => ("td", args(&["build_{build_name}.tcl"])),
        };
        Self {
            kind,
            program: program.into(),
            args,
        }
    }

    pub fn with_override(mut self, o: &ToolchainOverride) -> Self {
        if let Some(program) = &o.program {
            self.program = program.clone();
        }
        if let Some(args) = &o.args {
            self.args = args.clone();
        }
        self
    }

    pub fn kind(&self) -> ToolchainKind {
        self.kind
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for `job` with every `{var}` replaced.
    pub fn expand(&self, job: &ToolchainJob) -> Vec<String> {
        let vars = job.vars();
        self.args
            .iter()
            .map(|arg| {
                vars.iter()
                    .fold(arg.clone(), |out, (key, value)| out.replace(&format!("{{{key}}}"), value))
            })
            .collect()
    }
}

fn read_log(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

impl Toolchain for CommandToolchain {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn run(&self, job: &ToolchainJob) -> Result<()> {
        let args = self.expand(job);
        let log_path = job.log_path();
        let stdout = File::create(&log_path)?;
        let stderr = stdout.try_clone()?;

        log::info!("running {} {} in {}", self.program, args.join(" "), job.gateware_dir.display());
        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&job.gateware_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|source| BuildError::ToolchainSpawn {
                program: self.program.clone(),
                source,
            })?;

        let status = loop {
            if job.cancel.is_cancelled() {
                log::warn!("cancelling {} (pid {})", self.program, child.id());
                if let Err(e) = child.kill() {
                    log::warn!("failed to kill {}: {e}", self.program);
                }
                let _ = child.wait();
                return Err(BuildError::Cancelled);
            }
            match child.try_wait()? {
                Some(status) => break status,
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::Toolchain {
                program: self.program.clone(),
                status: status.to_string(),
                diagnostic: read_log(&log_path),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(dir: &Path) -> ToolchainJob {
        ToolchainJob {
            board: "ego1".into(),
            device: "xc7a35tcsg324-1".into(),
            build_name: "ego1".into(),
            gateware_dir: dir.to_path_buf(),
            bitstream: dir.join("ego1.bit"),
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn default_vivado_args() {
        let dir = tempfile::tempdir().unwrap();
        let tc = CommandToolchain::new(ToolchainKind::Vivado);
        assert_eq!(tc.program(), "vivado");
        let args = tc.expand(&job(dir.path()));
        assert_eq!(args.last().map(String::as_str), Some("ego1.tcl"));
    }

    #[test]
    fn override_expands_vars() {
        let dir = tempfile::tempdir().unwrap();
        let tc = CommandToolchain::new(ToolchainKind::Icestorm).with_override(&ToolchainOverride {
            program: Some("make".into()),
            args: Some(vec!["DEVICE={device}".into(), "OUT={bitstream}".into()]),
        });
        assert_eq!(tc.program(), "make");
        let args = tc.expand(&job(dir.path()));
        assert_eq!(args[0], "DEVICE=xc7a35tcsg324-1");
        assert_eq!(args[1], format!("OUT={}", dir.path().join("ego1.bit").display()));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let tc = CommandToolchain::new(ToolchainKind::Td).with_override(&ToolchainOverride {
            program: Some("socgen-no-such-toolchain".into()),
            args: None,
        });
        assert!(matches!(tc.run(&job(dir.path())), Err(BuildError::ToolchainSpawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn failure_carries_log() {
        let dir = tempfile::tempdir().unwrap();
        let tc = CommandToolchain::new(ToolchainKind::Icestorm).with_override(&ToolchainOverride {
            program: Some("sh".into()),
            args: Some(vec!["-c".into(), "echo 'ERROR: timing not met' >&2; exit 2".into()]),
        });
        match tc.run(&job(dir.path())) {
            Err(BuildError::Toolchain { diagnostic, .. }) => {
                assert!(diagnostic.contains("ERROR: timing not met"));
            }
            other => panic!("expected toolchain failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn cancel_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let tc = CommandToolchain::new(ToolchainKind::Icestorm).with_override(&ToolchainOverride {
            program: Some("sleep".into()),
            args: Some(vec!["30".into()]),
        });
        let job = job(dir.path());
        let cancel = job.cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            cancel.cancel();
        });
        let start = std::time::Instant::now();
        assert!(matches!(tc.run(&job), Err(BuildError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(10));
        canceller.join().unwrap();
    }
}
