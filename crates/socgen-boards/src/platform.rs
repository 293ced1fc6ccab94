//! Pin allocation and programmer creation for a concrete board.

use std::collections::BTreeSet;

use log::debug;
use socgen_clock::Signal;

use crate::board::BoardDescriptor;
use crate::error::{BoardError, Result};
use crate::programmer::{CommandProgrammer, Programmer, ProgrammerOverride};

/// Hands out board pins and builds the board's programmer.
///
/// Every pin can be requested at most once per platform.
pub trait Platform {
    fn name(&self) -> &str;

    fn request(&mut self, name: &str, index: usize) -> Result<Signal>;

    /// Every pin named `name`, in index order.
    fn request_all(&mut self, name: &str) -> Result<Vec<Signal>>;

    /// The board's programmer, if it has one.
    fn create_programmer(&self) -> Option<Box<dyn Programmer>>;
}

/// [`Platform`] backed by a [`BoardDescriptor`].
#[derive(Debug, Clone)]
pub struct BoardPlatform<'a> {
    board: &'a BoardDescriptor,
    device: String,
    requested: BTreeSet<(String, usize)>,
    programmer_override: Option<ProgrammerOverride>,
}

impl<'a> BoardPlatform<'a> {
    pub fn new(board: &'a BoardDescriptor) -> Self {
        Self {
            board,
            device: board.device.clone(),
            requested: BTreeSet::new(),
            programmer_override: None,
        }
    }

    /// Select a device variant; unknown variants are rejected.
    pub fn with_variant(mut self, variant: Option<&str>) -> Result<Self> {
        self.device = self.board.resolve_device(variant)?.to_string();
        Ok(self)
    }

    pub fn with_programmer_override(mut self, o: Option<ProgrammerOverride>) -> Self {
        self.programmer_override = o;
        self
    }

    pub fn board(&self) -> &BoardDescriptor {
        self.board
    }

    /// FPGA part after variant selection.
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_requested(&self, name: &str, index: usize) -> bool {
        self.requested.contains(&(name.to_string(), index))
    }
}

impl Platform for BoardPlatform<'_> {
    fn name(&self) -> &str {
        &self.board.name
    }

    fn request(&mut self, name: &str, index: usize) -> Result<Signal> {
        let pin = self.board.pin(name, index).ok_or_else(|| BoardError::UnknownPin {
            name: name.to_string(),
            index,
        })?;
        if !self.requested.insert((name.to_string(), index)) {
            return Err(BoardError::PinAlreadyRequested {
                name: name.to_string(),
                index,
            });
        }
        debug!("{}: requested {name}{index}", self.board.name);
        Ok(Signal::new(name, index, pin.polarity))
    }

    fn request_all(&mut self, name: &str) -> Result<Vec<Signal>> {
        let indices: Vec<usize> = self.board.pins_named(name).iter().map(|p| p.index).collect();
        if indices.is_empty() {
            return Err(BoardError::UnknownPin {
                name: name.to_string(),
                index: 0,
            });
        }
        if let Some(&index) = indices.iter().find(|&&i| self.is_requested(name, i)) {
            return Err(BoardError::PinAlreadyRequested {
                name: name.to_string(),
                index,
            });
        }
        indices.into_iter().map(|i| self.request(name, i)).collect()
    }

    fn create_programmer(&self) -> Option<Box<dyn Programmer>> {
        let config = self.board.programmer.as_ref()?;
        let mut programmer = CommandProgrammer::new(config, &self.device);
        if let Some(o) = &self.programmer_override {
            programmer = programmer.with_override(o);
        }
        Some(Box::new(programmer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards;
    use socgen_clock::Polarity;

    #[test]
    fn request_once() {
        let board = boards::ego1::descriptor();
        let mut platform = BoardPlatform::new(&board);
        let btn = platform.request("cpu_reset", 0).unwrap();
        assert_eq!(btn.polarity, Polarity::ActiveLow);
        assert!(matches!(
            platform.request("cpu_reset", 0),
            Err(BoardError::PinAlreadyRequested { .. })
        ));
        assert!(matches!(
            platform.request("nope", 0),
            Err(BoardError::UnknownPin { .. })
        ));
    }

    #[test]
    fn request_all_leds() {
        let board = boards::ego1::descriptor();
        let mut platform = BoardPlatform::new(&board);
        let leds = platform.request_all("user_led").unwrap();
        assert_eq!(leds.len(), 16);
        assert_eq!(leds[15].index, 15);
        assert!(platform.request("user_led", 3).is_err());
        assert!(platform.request_all("user_led").is_err());
    }

    #[test]
    fn request_all_after_single_request() {
        let board = boards::xilinx_zcu106::descriptor();
        let mut platform = BoardPlatform::new(&board);
        platform.request("user_led", 2).unwrap();
        match platform.request_all("user_led") {
            Err(BoardError::PinAlreadyRequested { index, .. }) => assert_eq!(index, 2),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!platform.is_requested("user_led", 0));
    }

    #[test]
    fn variant_selects_device() {
        let board = boards::krtkl_snickerdoodle::descriptor();
        let platform = BoardPlatform::new(&board).with_variant(None).unwrap();
        assert_eq!(platform.device(), "xc7z010clg400-3");
        let platform = BoardPlatform::new(&board).with_variant(Some("z7-20")).unwrap();
        assert_eq!(platform.device(), "xc7z020clg400-3");
        assert!(matches!(
            BoardPlatform::new(&board).with_variant(Some("z7-30")),
            Err(BoardError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn programmer_from_board() {
        let board = boards::sipeed_tang_primer::descriptor();
        let platform = BoardPlatform::new(&board);
        let programmer = platform.create_programmer().unwrap();
        assert_eq!(programmer.name(), "openfpgaloader");
        assert!(programmer.can_flash());

        let board = boards::efinix_trion_t20_mipi_dev_kit::descriptor();
        let programmer = BoardPlatform::new(&board).create_programmer().unwrap();
        assert!(!programmer.can_flash());
    }
}
