//! NU801 chain controller.
//!
//! Owns the brightness buffer, the per-LED state and the transmission
//! scheduler. LEDs are driven through [`Led`] handles from any number of
//! callers; a single [`TransmitWorker`](crate::TransmitWorker) owns the GPIO
//! lines and performs the transmissions.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::Error;
use crate::buffer::{ChainBuffer, encode_level};
use crate::index::{
    CHANNELS_PER_CHIP, ChainIndex, led_count, logical_to_physical, map_channel, physical_to_logical,
};
use crate::led::Led;
use crate::scheduler::{DEFAULT_SCHEDULE_DELAY, SchedulerPhase, TransmitScheduler};
use crate::topology::{ChannelSource, ChipDescriptor, LEVEL_OFF};
use crate::transmitter::DEFAULT_CLOCK_DELAY_NS;

/// Poll period of [`Nu801Chain::remove`] while the worker flushes.
const STOP_POLL_US: u32 = 100;

/// Chain-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainOptions {
    /// Half period of the serial clock
    pub clock_delay_ns: u32,
    /// Deferral between a change and the transmission it triggers
    pub schedule_delay: Duration,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            clock_delay_ns: DEFAULT_CLOCK_DELAY_NS,
            schedule_delay: DEFAULT_SCHEDULE_DELAY,
        }
    }
}

impl ChainOptions {
    /// Build options from the raw `clock-delay-ns` property.
    ///
    /// A missing value falls back to the default with a warning.
    pub fn from_properties(clock_delay_ns: Option<u32>) -> Self {
        let clock_delay_ns = clock_delay_ns.unwrap_or_else(|| {
            warn!(
                "Error getting clock-delay-ns property, defaulting to {}ns",
                DEFAULT_CLOCK_DELAY_NS
            );
            DEFAULT_CLOCK_DELAY_NS
        });
        Self {
            clock_delay_ns,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_schedule_delay(mut self, schedule_delay: Duration) -> Self {
        self.schedule_delay = schedule_delay;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct LedSlot {
    level: u8,
    registered: bool,
    retain_at_shutdown: bool,
    source: Option<ChannelSource>,
}

impl LedSlot {
    const VACANT: Self = Self {
        level: LEVEL_OFF,
        registered: false,
        retain_at_shutdown: false,
        source: None,
    };
}

/// A daisy chain of NU801 chips.
///
/// `MAX_LEDS` is the buffer capacity; the chain itself holds
/// `3 × chip_count` LEDs.
pub struct Nu801Chain<const MAX_LEDS: usize> {
    buffer: ChainBuffer<MAX_LEDS>,
    slots: Mutex<RefCell<Vec<LedSlot, MAX_LEDS>>>,
    scheduler: TransmitScheduler,
    chip_count: usize,
    clock_delay_ns: u32,
}

impl<const MAX_LEDS: usize> Nu801Chain<MAX_LEDS> {
    /// Build the chain from its topology.
    ///
    /// Every declared channel is registered at its initial level and an
    /// immediate transmission is armed. Nothing is armed if validation fails.
    pub fn new(chips: &[ChipDescriptor<'_>], options: ChainOptions) -> Result<Self, Error> {
        let chip_count = chips.len();
        if chip_count == 0 {
            return Err(Error::NoChips);
        }
        let len = led_count(chip_count);
        let capacity_exceeded = Error::CapacityExceeded {
            leds: len,
            capacity: MAX_LEDS,
        };
        let buffer = ChainBuffer::new(len).ok_or(capacity_exceeded)?;
        let mut slots: Vec<LedSlot, MAX_LEDS> = Vec::new();
        slots
            .resize(len, LedSlot::VACANT)
            .map_err(|()| capacity_exceeded)?;

        let mut declaration = 0;
        for chip in chips {
            chip.validate(chip_count)?;
            for channel in chip.channels {
                let index = map_channel(chip_count, chip.position, channel.position)?;
                let source = ChannelSource {
                    chip: chip.position,
                    channel: channel.position,
                    declaration,
                };
                declaration += 1;

                let slot = &mut slots[index.physical];
                if let Some(first) = slot.source {
                    warn!(
                        "LED channel at index {} already registered, duplicate declaration #{}",
                        index.physical, source.declaration
                    );
                    return Err(Error::DuplicateChannel {
                        physical_index: index.physical,
                        first,
                        second: source,
                    });
                }
                *slot = LedSlot {
                    level: channel.initial_level,
                    registered: true,
                    retain_at_shutdown: channel.retain_at_shutdown,
                    source: Some(source),
                };
                buffer.write_word(index.physical, encode_level(channel.initial_level));
            }
        }

        let chain = Self {
            buffer,
            slots: Mutex::new(RefCell::new(slots)),
            scheduler: TransmitScheduler::new(options.schedule_delay),
            chip_count,
            clock_delay_ns: options.clock_delay_ns,
        };
        chain.scheduler.arm_now(Instant::now())?;
        info!(
            "NU801 chain ready: {} chips, {} LEDs registered, clock delay {}ns",
            chip_count, declaration, options.clock_delay_ns
        );

        Ok(chain)
    }

    pub const fn chip_count(&self) -> usize {
        self.chip_count
    }

    /// Number of LED positions on the wire
    pub const fn len(&self) -> usize {
        self.chip_count * CHANNELS_PER_CHIP
    }

    pub const fn is_empty(&self) -> bool {
        self.chip_count == 0
    }

    pub const fn clock_delay_ns(&self) -> u32 {
        self.clock_delay_ns
    }

    pub(crate) const fn scheduler(&self) -> &TransmitScheduler {
        &self.scheduler
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.scheduler.phase()
    }

    /// `true` when no transmission is armed or running
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn is_stopped(&self) -> bool {
        self.scheduler.is_stopped()
    }

    /// Copy of the buffer in wire order
    pub fn snapshot(&self) -> Vec<u16, MAX_LEDS> {
        self.buffer.snapshot()
    }

    /// Handle of the LED at a logical index, if it is registered
    pub fn led(&self, logical: usize) -> Option<Led<'_, MAX_LEDS>> {
        let physical = logical_to_physical(self.chip_count, logical)?;
        self.registered_led(physical)
    }

    /// Handle of the LED on `chip`'s `channel`, if it is registered
    pub fn led_at(&self, chip: usize, channel: usize) -> Option<Led<'_, MAX_LEDS>> {
        let index = map_channel(self.chip_count, chip, channel).ok()?;
        self.registered_led(index.physical)
    }

    /// Registered LEDs in logical order
    pub fn leds(&self) -> impl Iterator<Item = Led<'_, MAX_LEDS>> + '_ {
        (0..self.len()).filter_map(|logical| self.led(logical))
    }

    /// Tear the chain down, blocking until the worker has stopped.
    ///
    /// LEDs not marked `retain_at_shutdown` are switched off and every LED
    /// is deregistered. A frame already on the wire completes, the final
    /// state is flushed and the scheduler stops. Without an attached worker
    /// nothing is transmitted and the scheduler stops at once.
    ///
    /// Must not be called from the worker's own thread; a caller ticking the
    /// worker itself uses [`TransmitWorker::shutdown`](crate::TransmitWorker::shutdown).
    /// A second call returns [`Error::ChainStopped`].
    pub fn remove(&self, delay: &mut impl DelayNs) -> Result<(), Error> {
        self.begin_removal()?;
        if !self.scheduler.is_attached() {
            self.scheduler.stop();
            return Ok(());
        }
        while !self.scheduler.is_stopped() {
            delay.delay_us(STOP_POLL_US);
        }
        Ok(())
    }

    /// Switch off, deregister and close the scheduler without waiting.
    pub(crate) fn begin_removal(&self) -> Result<(), Error> {
        critical_section::with(|cs| {
            if self.scheduler.is_closing() {
                return Err(Error::ChainStopped);
            }
            let mut changed = false;
            let mut slots = self.slots.borrow_ref_mut(cs);
            for (physical, slot) in slots.iter_mut().enumerate() {
                if !slot.registered {
                    continue;
                }
                if !slot.retain_at_shutdown && slot.level != LEVEL_OFF {
                    slot.level = LEVEL_OFF;
                    self.buffer.write_word(physical, encode_level(LEVEL_OFF));
                    changed = true;
                }
                slot.registered = false;
            }
            if changed {
                self.scheduler.request(Instant::now())?;
            }
            self.scheduler.close();
            Ok(())
        })?;
        info!("NU801 chain removed");
        Ok(())
    }

    pub(crate) fn level(&self, physical: usize) -> Option<u8> {
        critical_section::with(|cs| self.slots.borrow_ref(cs).get(physical).map(|slot| slot.level))
    }

    pub(crate) fn is_registered(&self, physical: usize) -> bool {
        critical_section::with(|cs| {
            self.slots
                .borrow_ref(cs)
                .get(physical)
                .is_some_and(|slot| slot.registered)
        })
    }

    pub(crate) fn source(&self, physical: usize) -> Option<ChannelSource> {
        critical_section::with(|cs| {
            self.slots
                .borrow_ref(cs)
                .get(physical)
                .and_then(|slot| slot.source)
        })
    }

    /// Store a new level and request a transmission if it changed.
    pub(crate) fn set_level(&self, physical: usize, level: u8) -> Result<(), Error> {
        let changed = critical_section::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            let slot = slots
                .get_mut(physical)
                .filter(|slot| slot.registered)
                .ok_or(Error::LedRemoved {
                    physical_index: physical,
                })?;
            if slot.level == level {
                return Ok(false);
            }
            slot.level = level;
            self.buffer.write_word(physical, encode_level(level));
            Ok(true)
        })?;

        if changed && self.scheduler.request(Instant::now())? {
            trace!("Transmission armed by LED {}", physical);
        }
        Ok(())
    }

    fn registered_led(&self, physical: usize) -> Option<Led<'_, MAX_LEDS>> {
        let logical = physical_to_logical(self.chip_count, physical)?;
        self.is_registered(physical)
            .then(|| Led::new(self, ChainIndex { logical, physical }))
    }
}
