use derive_more::{Display, Error};

use crate::topology::ChannelSource;

/// Errors reported by chain construction and LED control.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The topology declares no chips
    #[display("no chips defined")]
    NoChips,
    /// A chip declares no channels
    #[display("no channels defined on chip {chip}")]
    NoChannels { chip: usize },
    /// A chip declares more channels than the hardware has
    #[display("too many channels ({count}) defined on chip {chip}")]
    TooManyChannels { chip: usize, count: usize },
    /// A chip or channel node lacks its index property
    #[display("missing index property")]
    MissingIndex,
    /// A chip index is not below the chip count
    #[display("chip index {chip} over the chip count {chip_count}")]
    ChipOutOfRange { chip: usize, chip_count: usize },
    /// A channel index is not below the per-chip channel count
    #[display("channel index {channel} over the channel count")]
    ChannelOutOfRange { channel: usize },
    /// Two declared channels resolve to the same wire position
    #[display("LED at physical index {physical_index} declared twice ({first}, {second})")]
    DuplicateChannel {
        physical_index: usize,
        first: ChannelSource,
        second: ChannelSource,
    },
    /// The chain does not fit the buffer capacity
    #[display("chain of {leds} LEDs exceeds capacity {capacity}")]
    CapacityExceeded { leds: usize, capacity: usize },
    /// The LED was deregistered by chain teardown
    #[display("LED at physical index {physical_index} has been removed")]
    LedRemoved { physical_index: usize },
    /// The chain has been torn down
    #[display("chain stopped")]
    ChainStopped,
}
