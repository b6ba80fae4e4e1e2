//! Chain index arithmetic.
//!
//! The shift register clocks the last chip's last channel out first, so the
//! wire buffer is the reverse of both chip order and channel order:
//!
//! ```text
//! chip:      0 (nearest)   1            ...   C-1 (farthest)
//! channel:   0  1  2       0  1  2            0  1  2
//! logical:   0  1  2       3  4  5            3C-3 ...
//! physical:  3C-1 ..                          2  1  0
//! ```

use crate::Error;

/// Number of LED channels on one NU801 chip.
pub const CHANNELS_PER_CHIP: usize = 3;

/// Where one LED lives, seen from the caller and from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChainIndex {
    /// Index used by external callers, counted from the chip nearest the controller
    pub logical: usize,
    /// Position of the LED's word in the transmission order
    pub physical: usize,
}

/// Total number of LEDs on a chain of `chip_count` chips.
pub const fn led_count(chip_count: usize) -> usize {
    CHANNELS_PER_CHIP * chip_count
}

/// Map a chip position and a channel position to logical and physical indices.
///
/// `physical = 3 × (chip_count − chip − 1) + (2 − channel)`
pub const fn map_channel(chip_count: usize, chip: usize, channel: usize) -> Result<ChainIndex, Error> {
    if chip >= chip_count {
        return Err(Error::ChipOutOfRange { chip, chip_count });
    }
    if channel >= CHANNELS_PER_CHIP {
        return Err(Error::ChannelOutOfRange { channel });
    }
    let block_start = CHANNELS_PER_CHIP * (chip_count - chip - 1);
    Ok(ChainIndex {
        logical: CHANNELS_PER_CHIP * chip + channel,
        physical: block_start + (CHANNELS_PER_CHIP - channel - 1),
    })
}

/// Convert a logical index to its physical index.
///
/// Returns `None` if `logical` is outside the chain.
pub const fn logical_to_physical(chip_count: usize, logical: usize) -> Option<usize> {
    let count = led_count(chip_count);
    if logical >= count {
        return None;
    }
    Some(count - 1 - logical)
}

/// Convert a physical index back to its logical index.
///
/// The mapping reverses the whole chain, so it is its own inverse.
pub const fn physical_to_logical(chip_count: usize, physical: usize) -> Option<usize> {
    logical_to_physical(chip_count, physical)
}
