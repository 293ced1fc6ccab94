//! Built-in board catalogue.

pub mod decklink_intensity_pro_4k;
pub mod efinix_trion_t20_mipi_dev_kit;
pub mod ego1;
pub mod krtkl_snickerdoodle;
pub mod sipeed_tang_primer;
pub mod tinyfpga_bx;
pub mod xilinx_zcu106;

use crate::board::BoardDescriptor;

/// Every built-in board, sorted by name.
pub fn builtin_boards() -> Vec<BoardDescriptor> {
    vec![
        decklink_intensity_pro_4k::descriptor(),
        efinix_trion_t20_mipi_dev_kit::descriptor(),
        ego1::descriptor(),
        krtkl_snickerdoodle::descriptor(),
        sipeed_tang_primer::descriptor(),
        tinyfpga_bx::descriptor(),
        xilinx_zcu106::descriptor(),
    ]
}

pub fn find_builtin(name: &str) -> Option<BoardDescriptor> {
    builtin_boards().into_iter().find(|b| b.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{board_to_toml, parse_board_toml};

    #[test]
    fn names_are_sorted_and_unique() {
        let names: Vec<_> = builtin_boards().into_iter().map(|b| b.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn find_by_name() {
        assert_eq!(find_builtin("ego1").unwrap().device, "xc7a35tcsg324-1");
        assert!(find_builtin("arty").is_none());
    }

    #[test]
    fn round_trip_every_board() {
        for board in builtin_boards() {
            let text = board_to_toml(&board).unwrap();
            let parsed = parse_board_toml(&text).unwrap();
            assert_eq!(board, parsed, "{}", board.name);
        }
    }
}
