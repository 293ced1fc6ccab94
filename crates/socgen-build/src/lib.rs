//! Build orchestration for socgen.
//!
//! [`describe`] turns a finalized [`socgen_soc::Soc`] into a
//! [`BuildArtifactSpec`]: the toolchain inputs, software collateral and
//! driver headers, plus a digest of the description. A
//! [`BuildOrchestrator`] then writes those files and runs the requested
//! [`Actions`] against an output directory held under a [`BuildLock`].

pub mod collateral;
pub mod describe;
pub mod error;
pub mod layout;
pub mod lock;
pub mod orchestrator;
pub mod report;
pub mod stamp;
pub mod toolchain;

pub use describe::{describe, BuildArtifactSpec, GeneratedFile};
pub use error::{BuildError, Result};
pub use layout::ArtifactLayout;
pub use lock::BuildLock;
pub use orchestrator::{Actions, BuildOrchestrator};
pub use report::BuildReport;
pub use stamp::BuildStamp;
pub use toolchain::{CancelToken, CommandToolchain, Toolchain, ToolchainJob, ToolchainOverride};
