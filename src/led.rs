use crate::Error;
use crate::chain::Nu801Chain;
use crate::index::ChainIndex;
use crate::topology::ChannelSource;

/// Handle of one LED channel on a chain.
///
/// Handles are cheap to copy and can be driven from any thread; all of them
/// write into the chain's shared buffer.
#[derive(Clone, Copy)]
pub struct Led<'a, const MAX_LEDS: usize> {
    chain: &'a Nu801Chain<MAX_LEDS>,
    index: ChainIndex,
}

impl<'a, const MAX_LEDS: usize> Led<'a, MAX_LEDS> {
    pub(crate) const fn new(chain: &'a Nu801Chain<MAX_LEDS>, index: ChainIndex) -> Self {
        Self { chain, index }
    }

    pub const fn index(&self) -> ChainIndex {
        self.index
    }

    /// Position of this LED's word on the wire
    pub const fn physical_index(&self) -> usize {
        self.index.physical
    }

    /// Chip and channel this LED was declared as
    pub fn source(&self) -> Option<ChannelSource> {
        self.chain.source(self.index.physical)
    }

    /// Last requested brightness
    pub fn brightness(&self) -> u8 {
        self.chain.level(self.index.physical).unwrap_or_default()
    }

    /// `false` once the chain has been removed
    pub fn is_registered(&self) -> bool {
        self.chain.is_registered(self.index.physical)
    }

    /// Set the brightness and schedule a transmission if it changed.
    ///
    /// Fails only after the chain has been removed.
    pub fn set_brightness(&self, level: u8) -> Result<(), Error> {
        self.chain.set_level(self.index.physical, level)
    }
}
