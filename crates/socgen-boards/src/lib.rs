//! Board descriptors and SoC assembly for socgen.
//!
//! A board is declarative data. Everything board-specific lives in a
//! [`BoardDescriptor`]:
//! - **Pins:** clock, reset, LED and peripheral pins with their polarity
//! - **Clock recipe:** passthrough or PLL, with extra outputs and resets
//! - **Peripherals:** which optional cores the board can carry
//! - **Tooling:** toolchain, programmer and flash target
//!
//! [`assemble_soc`] turns a descriptor plus [`BuildOptions`] into a finalized
//! [`socgen_soc::Soc`].

pub mod assemble;
pub mod board;
pub mod boards;
pub mod error;
pub mod options;
pub mod parse;
pub mod platform;
pub mod programmer;

pub use assemble::{assemble_soc, PLL_NAME};
pub use board::{
    BoardDescriptor, BootRomConfig, ClockInput, ClockRecipe, ExtraOutput, FlashTarget,
    PeripheralDefaults, PinDef, ProgrammerConfig, ProgrammerKind, ResetSource, SpiFlashConfig,
    ToolchainKind,
};
pub use boards::{builtin_boards, find_builtin};
pub use error::{BoardError, Result};
pub use options::{parse_address, parse_frequency, BuildOptions};
pub use parse::{
    board_to_toml, discover_boards, generate_template, load_board_toml, parse_board_toml,
    validate_board, ValidationIssue, BOARD_FILE_SUFFIX,
};
pub use platform::{BoardPlatform, Platform};
pub use programmer::{CommandProgrammer, Programmer, ProgrammerError, ProgrammerOverride};
