//! Build, load, flash and driver generation for one output directory.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use socgen_boards::Programmer;

use crate::describe::BuildArtifactSpec;
use crate::error::{BuildError, Result};
use crate::layout::ArtifactLayout;
use crate::lock::BuildLock;
use crate::report::BuildReport;
use crate::stamp::BuildStamp;
use crate::toolchain::{CancelToken, Toolchain, ToolchainJob};

/// Requested actions. Generated inputs are always written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actions {
    pub build: bool,
    pub load: bool,
    pub flash: bool,
    pub driver: bool,
}

/// Runs the requested actions against one output directory.
///
/// The whole invocation holds the directory's [`BuildLock`], so two
/// invocations on the same directory never interleave.
pub struct BuildOrchestrator {
    layout: ArtifactLayout,
    toolchain: Option<Box<dyn Toolchain>>,
    programmer: Option<Box<dyn Programmer>>,
    lock_timeout: Option<Duration>,
    cancel: CancelToken,
}

impl BuildOrchestrator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: ArtifactLayout::new(output_dir),
            toolchain: None,
            programmer: None,
            lock_timeout: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_toolchain(mut self, toolchain: impl Toolchain + 'static) -> Self {
        self.toolchain = Some(Box::new(toolchain));
        self
    }

    pub fn with_programmer(mut self, programmer: Box<dyn Programmer>) -> Self {
        self.programmer = Some(programmer);
        self
    }

    /// Wait up to `timeout` for a busy directory instead of failing at once.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run `actions` for `spec`.
    ///
    /// Every capability check happens before the toolchain starts, so an
    /// unsupported `flash` never costs a synthesis run.
    pub fn invoke(&self, spec: &BuildArtifactSpec, actions: Actions) -> Result<BuildReport> {
        let start = Instant::now();
        self.check(spec, actions)?;

        self.layout.ensure_root()?;
        let _lock = match self.lock_timeout {
            Some(timeout) => BuildLock::acquire(self.layout.lock_path(), timeout, &self.cancel)?,
            None => BuildLock::try_acquire(self.layout.lock_path())?,
        };
        if self.cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        let mut report = BuildReport {
            board: spec.board.clone(),
            build_name: spec.build_name.clone(),
            device: spec.device.clone(),
            digest: spec.digest.clone(),
            output_dir: self.layout.root().to_path_buf(),
            files_written: 0,
            build_id: None,
            bitstream: None,
            loaded: false,
            flashed_at: None,
            driver_dir: None,
            duration_ms: 0,
        };

        report.files_written += self.layout.write_files(&spec.gateware)?;
        report.files_written += self.layout.write_files(&spec.software)?;
        log::info!(
            "generated inputs for {} in {} (digest {})",
            spec.build_name,
            self.layout.root().display(),
            spec.short_digest()
        );

        if actions.driver {
            report.files_written += self.layout.write_files(&spec.driver)?;
            report.driver_dir = Some(self.layout.driver_dir());
            log::info!("wrote driver headers to {}", self.layout.driver_dir().display());
        }

        if actions.build {
            let stamp = self.build(spec)?;
            report.build_id = Some(stamp.build_id);
            report.bitstream = Some(self.layout.gateware_file(&stamp.bitstream));
        }

        if actions.load {
            let bitstream = self.require_artifact(spec, &spec.bitstream_name())?;
            if let Some(programmer) = &self.programmer {
                log::info!("loading {} with {}", bitstream.display(), programmer.name());
                programmer.load_bitstream(&bitstream)?;
                report.loaded = true;
            }
        }

        if actions.flash {
            if let (Some(target), Some(image), Some(programmer)) =
                (&spec.flash, spec.flash_image_name(), &self.programmer)
            {
                let image = self.require_artifact(spec, &image)?;
                log::info!(
                    "flashing {} at 0x{:x} with {}",
                    image.display(),
                    target.offset,
                    programmer.name()
                );
                programmer.flash(target.offset, &image)?;
                report.flashed_at = Some(target.offset);
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    fn check(&self, spec: &BuildArtifactSpec, actions: Actions) -> Result<()> {
        if actions.driver && !spec.has_pcie {
            return Err(BuildError::UnsupportedOperation {
                operation: "driver",
                reason: format!("{} has no PCIe peripheral attached", spec.build_name),
            });
        }
        if actions.build && self.toolchain.is_none() {
            return Err(BuildError::UnsupportedOperation {
                operation: "build",
                reason: "no toolchain configured".into(),
            });
        }
        if actions.load && self.programmer.is_none() {
            return Err(BuildError::UnsupportedOperation {
                operation: "load",
                reason: format!("board {} has no programmer", spec.board),
            });
        }
        if actions.flash {
            if spec.flash.is_none() {
                return Err(BuildError::UnsupportedOperation {
                    operation: "flash",
                    reason: format!("board {} has no flash target", spec.board),
                });
            }
            match &self.programmer {
                None => {
                    return Err(BuildError::UnsupportedOperation {
                        operation: "flash",
                        reason: format!("board {} has no programmer", spec.board),
                    })
                }
                Some(p) if !p.can_flash() => {
                    return Err(BuildError::UnsupportedOperation {
                        operation: "flash",
                        reason: format!("programmer {} cannot write flash", p.name()),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn build(&self, spec: &BuildArtifactSpec) -> Result<BuildStamp> {
        let toolchain = self.toolchain.as_ref().ok_or_else(|| BuildError::UnsupportedOperation {
            operation: "build",
            reason: "no toolchain configured".into(),
        })?;
        let stamp_path = self.layout.stamp_path();
        BuildStamp::clear(&stamp_path)?;

        let bitstream_name = spec.bitstream_name();
        let job = ToolchainJob {
            board: spec.board.clone(),
            device: spec.device.clone(),
            build_name: spec.build_name.clone(),
            gateware_dir: self.layout.gateware_dir(),
            bitstream: self.layout.gateware_file(&bitstream_name),
            cancel: self.cancel.clone(),
        };
        log::info!("synthesizing {} for {} with {}", spec.build_name, spec.device, toolchain.name());
        toolchain.run(&job)?;

        if !job.bitstream.is_file() {
            return Err(BuildError::ArtifactNotFound {
                path: job.bitstream,
                reason: format!("{} finished without writing a bitstream", toolchain.name()),
            });
        }
        let stamp = BuildStamp::new(&spec.digest, &bitstream_name, toolchain.name());
        stamp.write(&stamp_path)?;
        log::info!("build {} complete: {}", stamp.build_id, job.bitstream.display());
        Ok(stamp)
    }

    /// `file_name` under the gateware directory, built from this description.
    fn require_artifact(&self, spec: &BuildArtifactSpec, file_name: &str) -> Result<PathBuf> {
        let path = self.layout.gateware_file(file_name);
        if !path.is_file() {
            return Err(not_found(&path, "no build has produced it"));
        }
        match BuildStamp::read(&self.layout.stamp_path())? {
            Some(stamp) if stamp.digest == spec.digest => Ok(path),
            Some(stamp) => Err(not_found(
                &path,
                &format!(
                    "built from a different description (build {}); rebuild first",
                    stamp.build_id
                ),
            )),
            None => Err(not_found(&path, "no completed build recorded")),
        }
    }
}

fn not_found(path: &Path, reason: &str) -> BuildError {
    BuildError::ArtifactNotFound {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
