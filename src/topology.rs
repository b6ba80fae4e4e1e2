//! Chain topology descriptors.
//!
//! Descriptors are what a configuration source (device tree or similar) hands
//! to the chain at construction. They are consumed once to compute wire
//! positions; only [`ChannelSource`] is kept afterwards for diagnostics.

use derive_more::Display;

use crate::Error;
use crate::index::CHANNELS_PER_CHIP;

/// Brightness of a fully lit channel.
pub const LEVEL_FULL: u8 = u8::MAX;

/// Brightness of a dark channel.
pub const LEVEL_OFF: u8 = 0;

/// Declared chip and channel of an LED.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[display("chip {chip} channel {channel} (declaration #{declaration})")]
pub struct ChannelSource {
    pub chip: usize,
    pub channel: usize,
    /// Position of the channel descriptor among all declared channels
    pub declaration: usize,
}

/// Initial state of a channel as declared by the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DefaultState {
    #[default]
    Off,
    On,
}

impl DefaultState {
    /// Parse a `default-state` property value.
    ///
    /// Unsupported values (including `keep`) fall back to `Off` with a warning.
    pub fn parse(value: &str) -> Self {
        match value {
            "on" => Self::On,
            "off" => Self::Off,
            _ => {
                warn!("Unsupported default-state value {}", value);
                Self::Off
            }
        }
    }

    /// Brightness level the channel starts at
    pub const fn level(self) -> u8 {
        match self {
            Self::On => LEVEL_FULL,
            Self::Off => LEVEL_OFF,
        }
    }
}

/// One declared channel of a chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// Channel position within its chip (0..3)
    pub position: usize,
    /// Level written to the buffer at construction
    pub initial_level: u8,
    /// Keep the current level when the chain is removed
    pub retain_at_shutdown: bool,
}

impl ChannelDescriptor {
    pub const fn new(position: usize, initial_level: u8) -> Self {
        Self {
            position,
            initial_level,
            retain_at_shutdown: false,
        }
    }

    /// Keep this channel lit through chain teardown
    #[must_use]
    pub const fn retained(mut self) -> Self {
        self.retain_at_shutdown = true;
        self
    }

    /// Build a descriptor from raw configuration properties.
    ///
    /// `reg` is the channel index property and `default_state` the optional
    /// `default-state` string.
    pub fn from_properties(
        reg: Option<u32>,
        default_state: Option<&str>,
        retain_at_shutdown: bool,
    ) -> Result<Self, Error> {
        let Some(reg) = reg else {
            warn!("Missing index property in channel node");
            return Err(Error::MissingIndex);
        };
        let position = usize::try_from(reg).unwrap_or(usize::MAX);
        if position >= CHANNELS_PER_CHIP {
            warn!("Channel index {} over the channel count", reg);
            return Err(Error::ChannelOutOfRange { channel: position });
        }
        let state = default_state.map(DefaultState::parse).unwrap_or_default();

        Ok(Self {
            position,
            initial_level: state.level(),
            retain_at_shutdown,
        })
    }
}

/// One declared chip and its channels.
#[derive(Debug, Clone, Copy)]
pub struct ChipDescriptor<'a> {
    /// Chip position in the chain, 0 is nearest the controller
    pub position: usize,
    /// Declared channels, undeclared channels stay dark and unregistered
    pub channels: &'a [ChannelDescriptor],
}

impl<'a> ChipDescriptor<'a> {
    pub const fn new(position: usize, channels: &'a [ChannelDescriptor]) -> Self {
        Self { position, channels }
    }

    /// Build a descriptor from raw configuration properties.
    pub fn from_properties(
        reg: Option<u32>,
        chip_count: usize,
        channels: &'a [ChannelDescriptor],
    ) -> Result<Self, Error> {
        let Some(reg) = reg else {
            warn!("Missing index property in chip node");
            return Err(Error::MissingIndex);
        };
        let chip = Self::new(usize::try_from(reg).unwrap_or(usize::MAX), channels);
        chip.validate(chip_count)?;
        Ok(chip)
    }

    /// Check the chip index and channel list against the chain shape
    pub fn validate(&self, chip_count: usize) -> Result<(), Error> {
        if self.position >= chip_count {
            warn!("Chip index {} over the chip count {}", self.position, chip_count);
            return Err(Error::ChipOutOfRange {
                chip: self.position,
                chip_count,
            });
        }
        match self.channels.len() {
            0 => Err(Error::NoChannels { chip: self.position }),
            count if count > CHANNELS_PER_CHIP => Err(Error::TooManyChannels {
                chip: self.position,
                count,
            }),
            _ => self
                .channels
                .iter()
                .find(|channel| channel.position >= CHANNELS_PER_CHIP)
                .map_or(Ok(()), |channel| {
                    Err(Error::ChannelOutOfRange {
                        channel: channel.position,
                    })
                }),
        }
    }
}
