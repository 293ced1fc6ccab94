//! End-to-end orchestration against in-test toolchain and programmer.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use socgen_boards::{
    assemble_soc, find_builtin, BoardPlatform, BuildOptions, Programmer, ProgrammerError,
};
use socgen_build::{
    describe, Actions, BuildArtifactSpec, BuildError, BuildOrchestrator, CancelToken, Toolchain,
    ToolchainJob,
};

fn spec(board: &str, options: BuildOptions) -> BuildArtifactSpec {
    let board = find_builtin(board).unwrap();
    let mut platform = BoardPlatform::new(&board);
    let soc = assemble_soc(&board, &mut platform, &options).unwrap();
    describe(&soc, &board, options.variant.as_deref()).unwrap()
}

#[derive(Default, Clone)]
struct Counters {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    runs: Arc<AtomicUsize>,
}

/// Writes the bitstream and a `.bin` image after an optional delay.
struct FakeToolchain {
    delay: Duration,
    write_bitstream: bool,
    counters: Counters,
}

impl FakeToolchain {
    fn new(counters: &Counters) -> Self {
        Self {
            delay: Duration::ZERO,
            write_bitstream: true,
            counters: counters.clone(),
        }
    }
}

impl Toolchain for FakeToolchain {
    fn name(&self) -> &str {
        "fake"
    }

    fn run(&self, job: &ToolchainJob) -> socgen_build::Result<()> {
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        assert!(job.gateware_dir.join(format!("{}.json", job.build_name)).is_file());
        thread::sleep(self.delay);
        if self.write_bitstream {
            fs::write(&job.bitstream, b"bitstream").unwrap();
            fs::write(job.gateware_dir.join(format!("{}.bin", job.build_name)), b"image").unwrap();
        }
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Runs until cancelled.
struct HangingToolchain;

impl Toolchain for HangingToolchain {
    fn name(&self) -> &str {
        "hanging"
    }

    fn run(&self, job: &ToolchainJob) -> socgen_build::Result<()> {
        while !job.cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(10));
        }
        Err(BuildError::Cancelled)
    }
}

struct FakeProgrammer {
    can_flash: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeProgrammer {
    fn boxed(can_flash: bool, calls: &Arc<Mutex<Vec<String>>>) -> Box<dyn Programmer> {
        Box::new(Self {
            can_flash,
            calls: calls.clone(),
        })
    }
}

impl Programmer for FakeProgrammer {
    fn name(&self) -> &str {
        "fake"
    }

    fn can_flash(&self) -> bool {
        self.can_flash
    }

    fn load_bitstream(&self, bitstream: &Path) -> Result<(), ProgrammerError> {
        let name = bitstream.file_name().unwrap().to_string_lossy().into_owned();
        self.calls.lock().unwrap().push(format!("load {name}"));
        Ok(())
    }

    fn flash(&self, offset: u64, image: &Path) -> Result<(), ProgrammerError> {
        let name = image.file_name().unwrap().to_string_lossy().into_owned();
        self.calls.lock().unwrap().push(format!("flash 0x{offset:x} {name}"));
        Ok(())
    }
}

fn actions(build: bool, load: bool, flash: bool, driver: bool) -> Actions {
    Actions {
        build,
        load,
        flash,
        driver,
    }
}

#[test]
fn build_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let spec = spec("ego1", BuildOptions::default());
    let orchestrator = BuildOrchestrator::new(dir.path())
        .with_toolchain(FakeToolchain::new(&counters))
        .with_programmer(FakeProgrammer::boxed(true, &calls));

    let report = orchestrator.invoke(&spec, actions(true, true, false, false)).unwrap();
    assert!(report.loaded);
    assert!(report.build_id.is_some());
    assert_eq!(report.bitstream, Some(dir.path().join("gateware/ego1.bit")));
    assert_eq!(*calls.lock().unwrap(), vec!["load ego1.bit".to_string()]);
    assert!(dir.path().join("software/regions.ld").is_file());
    assert!(dir.path().join("gateware/ego1.sdc").is_file());
    assert!(!dir.path().join(".socgen.lock").exists());

    // A later load of the same description reuses the bitstream.
    let report = orchestrator.invoke(&spec, actions(false, true, false, false)).unwrap();
    assert!(report.loaded);
    assert_eq!(report.files_written, 0);
    assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
}

#[test]
fn load_without_build_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let spec = spec("ego1", BuildOptions::default());
    let orchestrator =
        BuildOrchestrator::new(dir.path()).with_programmer(FakeProgrammer::boxed(true, &calls));

    match orchestrator.invoke(&spec, actions(false, true, false, false)) {
        Err(BuildError::ArtifactNotFound { path, .. }) => {
            assert_eq!(path, dir.path().join("gateware/ego1.bit"));
        }
        other => panic!("expected ArtifactNotFound, got {other:?}"),
    }
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn stale_bitstream_is_not_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let orchestrator = BuildOrchestrator::new(dir.path())
        .with_toolchain(FakeToolchain::new(&counters))
        .with_programmer(FakeProgrammer::boxed(true, &calls));

    let built = spec("ego1", BuildOptions::default());
    orchestrator.invoke(&built, actions(true, false, false, false)).unwrap();

    let changed = spec(
        "ego1",
        BuildOptions {
            sys_clk_freq: Some(50_000_000),
            ..BuildOptions::default()
        },
    );
    match orchestrator.invoke(&changed, actions(false, true, false, false)) {
        Err(BuildError::ArtifactNotFound { reason, .. }) => {
            assert!(reason.contains("different description"), "{reason}");
        }
        other => panic!("expected ArtifactNotFound, got {other:?}"),
    }
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn flash_writes_image_at_board_offset() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let spec = spec("ego1", BuildOptions::default());
    let orchestrator = BuildOrchestrator::new(dir.path())
        .with_toolchain(FakeToolchain::new(&counters))
        .with_programmer(FakeProgrammer::boxed(true, &calls));

    let report = orchestrator.invoke(&spec, actions(true, false, true, false)).unwrap();
    assert_eq!(report.flashed_at, Some(0));
    assert_eq!(*calls.lock().unwrap(), vec!["flash 0x0 ego1.bin".to_string()]);
}

#[test]
fn flash_unsupported_without_target() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let spec = spec("tinyfpga_bx", BuildOptions::default());
    let orchestrator = BuildOrchestrator::new(dir.path())
        .with_toolchain(FakeToolchain::new(&counters))
        .with_programmer(FakeProgrammer::boxed(true, &calls));

    let result = orchestrator.invoke(&spec, actions(true, false, true, false));
    assert!(matches!(
        result,
        Err(BuildError::UnsupportedOperation { operation: "flash", .. })
    ));
    // Rejected before synthesis.
    assert_eq!(counters.runs.load(Ordering::SeqCst), 0);
}

#[test]
fn flash_unsupported_by_programmer() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let spec = spec("ego1", BuildOptions::default());
    let orchestrator =
        BuildOrchestrator::new(dir.path()).with_programmer(FakeProgrammer::boxed(false, &calls));

    match orchestrator.invoke(&spec, actions(false, false, true, false)) {
        Err(BuildError::UnsupportedOperation { operation, reason }) => {
            assert_eq!(operation, "flash");
            assert!(reason.contains("cannot write flash"));
        }
        other => panic!("expected UnsupportedOperation, got {other:?}"),
    }
}

#[test]
fn driver_requires_pcie() {
    let dir = tempfile::tempdir().unwrap();
    let spec = spec("ego1", BuildOptions::default());
    let orchestrator = BuildOrchestrator::new(dir.path());
    assert!(matches!(
        orchestrator.invoke(&spec, actions(false, false, false, true)),
        Err(BuildError::UnsupportedOperation { operation: "driver", .. })
    ));
    assert!(!dir.path().join("driver").exists());
}

#[test]
fn driver_headers_for_pcie_board() {
    let dir = tempfile::tempdir().unwrap();
    let spec = spec(
        "decklink_intensity_pro_4k",
        BuildOptions {
            with_pcie: true,
            ..BuildOptions::default()
        },
    );
    let report = BuildOrchestrator::new(dir.path())
        .invoke(&spec, actions(false, false, false, true))
        .unwrap();
    assert_eq!(report.driver_dir, Some(dir.path().join("driver")));
    let config = fs::read_to_string(dir.path().join("driver/config.h")).unwrap();
    assert!(config.contains("#define PCIE_LANES 4"));
    assert!(dir.path().join("driver/csr.h").is_file());
}

#[test]
fn missing_bitstream_after_build() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let spec = spec("ego1", BuildOptions::default());
    let toolchain = FakeToolchain {
        write_bitstream: false,
        ..FakeToolchain::new(&counters)
    };
    let orchestrator = BuildOrchestrator::new(dir.path()).with_toolchain(toolchain);
    assert!(matches!(
        orchestrator.invoke(&spec, actions(true, false, false, false)),
        Err(BuildError::ArtifactNotFound { .. })
    ));
    assert!(!dir.path().join("gateware/.socgen-stamp.json").exists());
}

#[test]
fn concurrent_builds_contend() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let spec = spec("ego1", BuildOptions::default());
    let barrier = Arc::new(Barrier::new(2));

    let results: Vec<_> = (0..2)
        .map(|_| {
            let root = dir.path().to_path_buf();
            let counters = counters.clone();
            let spec = spec.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let toolchain = FakeToolchain {
                    delay: Duration::from_millis(300),
                    ..FakeToolchain::new(&counters)
                };
                let orchestrator = BuildOrchestrator::new(root).with_toolchain(toolchain);
                barrier.wait();
                orchestrator.invoke(&spec, actions(true, false, false, false))
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let contended = results
        .iter()
        .filter(|r| matches!(r, Err(BuildError::LockContention { .. })))
        .count();
    assert_eq!((ok, contended), (1, 1));
    assert_eq!(counters.max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_builds_wait_and_never_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let spec = spec("ego1", BuildOptions::default());

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let root = dir.path().to_path_buf();
            let counters = counters.clone();
            let spec = spec.clone();
            thread::spawn(move || {
                let toolchain = FakeToolchain {
                    delay: Duration::from_millis(100),
                    ..FakeToolchain::new(&counters)
                };
                BuildOrchestrator::new(root)
                    .with_toolchain(toolchain)
                    .with_lock_timeout(Duration::from_secs(30))
                    .invoke(&spec, actions(true, false, false, false))
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(counters.runs.load(Ordering::SeqCst), 3);
    assert_eq!(counters.max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn cancellation_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let spec = spec("ego1", BuildOptions::default());
    let cancel = CancelToken::new();
    let orchestrator = BuildOrchestrator::new(dir.path())
        .with_toolchain(HangingToolchain)
        .with_cancel_token(cancel.clone());

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        cancel.cancel();
    });
    assert!(matches!(
        orchestrator.invoke(&spec, actions(true, false, false, false)),
        Err(BuildError::Cancelled)
    ));
    canceller.join().unwrap();
    assert!(!dir.path().join(".socgen.lock").exists());
    assert!(!dir.path().join("gateware/.socgen-stamp.json").exists());
}

#[test]
fn identical_description_identical_inputs() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let spec = spec("tinyfpga_bx", BuildOptions::default());
    BuildOrchestrator::new(a.path()).invoke(&spec, Actions::default()).unwrap();
    BuildOrchestrator::new(b.path()).invoke(&spec, Actions::default()).unwrap();
    for file in spec.gateware.iter().chain(&spec.software) {
        let left = fs::read(a.path().join(&file.path)).unwrap();
        let right = fs::read(b.path().join(&file.path)).unwrap();
        assert_eq!(left, right, "{}", file.path.display());
    }
}
