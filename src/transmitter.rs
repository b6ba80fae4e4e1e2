//! NU801 serial wire protocol.
//!
//! Every LED takes a 16-bit word, shifted MSB first: data is set, clock goes
//! high, hold, clock goes low, hold. With a latch line the frame ends with a
//! latch pulse. Without one the final clock high phase is stretched to
//! [`LATCH_SETTLE_US`], which the chip treats as the latch.

use embedded_hal::delay::DelayNs;

use crate::GpioLine;

/// Settle time that stands in for the latch pulse on chains without a latch line.
pub const LATCH_SETTLE_US: u32 = 600;

/// Default half period of the clock.
pub const DEFAULT_CLOCK_DELAY_NS: u32 = 500;

/// Bits clocked out per LED.
pub const BITS_PER_WORD: usize = 16;

const MSB: u16 = 1 << (BITS_PER_WORD - 1);

/// Latch placeholder for chains wired without a latch-enable line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLatch;

impl GpioLine for NoLatch {
    fn set(&mut self, _high: bool) {}
}

/// GPIO lines of one chain.
pub struct ChainLines<C, D, L = NoLatch> {
    pub clock: C,
    pub data: D,
    pub latch: Option<L>,
}

impl<C, D> ChainLines<C, D, NoLatch> {
    pub const fn without_latch(clock: C, data: D) -> Self {
        Self {
            clock,
            data,
            latch: None,
        }
    }
}

impl<C, D, L> ChainLines<C, D, L> {
    pub const fn with_latch(clock: C, data: D, latch: L) -> Self {
        Self {
            clock,
            data,
            latch: Some(latch),
        }
    }

    pub const fn has_latch(&self) -> bool {
        self.latch.is_some()
    }
}

/// Summary of one transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransmitReport {
    /// Words clocked out
    pub words: usize,
    /// Clock pulses issued
    pub clock_pulses: usize,
    /// Whether a latch pulse closed the frame
    pub latched: bool,
}

/// Bit-banging driver for a chain's lines.
pub struct ChainTransmitter<C, D, L, T> {
    lines: ChainLines<C, D, L>,
    delay: T,
    clock_delay_ns: u32,
}

impl<C, D, L, T> ChainTransmitter<C, D, L, T>
where
    C: GpioLine,
    D: GpioLine,
    L: GpioLine,
    T: DelayNs,
{
    /// Take ownership of the lines and drive them all low.
    pub fn new(mut lines: ChainLines<C, D, L>, delay: T, clock_delay_ns: u32) -> Self {
        lines.clock.set(false);
        lines.data.set(false);
        if let Some(latch) = lines.latch.as_mut() {
            latch.set(false);
        }
        Self {
            lines,
            delay,
            clock_delay_ns,
        }
    }

    pub const fn clock_delay_ns(&self) -> u32 {
        self.clock_delay_ns
    }

    pub const fn has_latch(&self) -> bool {
        self.lines.has_latch()
    }

    /// Delay source used for wire pacing
    pub fn delay_mut(&mut self) -> &mut T {
        &mut self.delay
    }

    /// Clock `words` out, index 0 first, then latch.
    ///
    /// Blocks for the whole frame.
    pub fn transmit(&mut self, words: &[u16]) -> TransmitReport {
        let last = words.len().saturating_sub(1);
        let settle_last_bit = !self.lines.has_latch();
        let mut clock_pulses = 0;

        for (index, &word) in words.iter().enumerate() {
            let mut bit = MSB;
            while bit != 0 {
                self.lines.data.set(word & bit != 0);
                self.lines.clock.set(true);

                if settle_last_bit && index == last && bit == 1 {
                    self.delay.delay_us(LATCH_SETTLE_US);
                } else {
                    self.delay.delay_ns(self.clock_delay_ns);
                }

                self.lines.clock.set(false);
                self.delay.delay_ns(self.clock_delay_ns);

                clock_pulses += 1;
                bit >>= 1;
            }
        }

        let latched = if let Some(latch) = self.lines.latch.as_mut() {
            latch.set(true);
            self.delay.delay_ns(self.clock_delay_ns);
            latch.set(false);
            true
        } else {
            false
        };

        TransmitReport {
            words: words.len(),
            clock_pulses,
            latched,
        }
    }

    /// Give the lines and the delay back
    pub fn release(self) -> (ChainLines<C, D, L>, T) {
        (self.lines, self.delay)
    }
}
