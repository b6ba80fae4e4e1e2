#![no_std]

mod fmt;

pub mod buffer;
pub mod chain;
pub mod error;
pub mod index;
pub mod led;
pub mod scheduler;
pub mod topology;
pub mod transmitter;
pub mod worker;

pub use buffer::{ChainBuffer, decode_word, encode_level};
pub use chain::{ChainOptions, Nu801Chain};
pub use error::Error;
pub use index::{CHANNELS_PER_CHIP, ChainIndex, map_channel};
pub use led::Led;
pub use scheduler::{Begin, SchedulerPhase, TransmitScheduler};
pub use topology::{ChannelDescriptor, ChannelSource, ChipDescriptor, DefaultState};
pub use transmitter::{ChainLines, ChainTransmitter, NoLatch, TransmitReport};
pub use worker::{TickResult, TransmitWorker};

pub use embassy_time::{Duration, Instant};

use embedded_hal::digital::{OutputPin, PinState};

/// Abstract digital output line
///
/// Implement this trait to drive the chain from any GPIO source.
/// Writes are treated as infallible.
pub trait GpioLine {
    /// Drive the line high or low
    fn set(&mut self, high: bool);
}

/// [`GpioLine`] over an `embedded-hal` output pin.
///
/// Pin errors are ignored; a failing pin driver is a board-level fault.
pub struct HalLine<P>(pub P);

impl<P: OutputPin> GpioLine for HalLine<P> {
    fn set(&mut self, high: bool) {
        let _ = self.0.set_state(PinState::from(high));
    }
}
