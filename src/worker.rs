//! Transmission worker.
//!
//! The worker is the only owner of the chain's GPIO lines. Like a frame
//! scheduler it is ticked by the caller and reports how long it can sleep;
//! [`TransmitWorker::run`] wraps that in a blocking loop for a dedicated
//! thread or task.
//!
//! # Usage
//!
//! ```ignore
//! let chain: Nu801Chain<12> = Nu801Chain::new(&chips, ChainOptions::default())?;
//! let lines = ChainLines::with_latch(HalLine(cki), HalLine(sdi), HalLine(lei));
//! let worker = TransmitWorker::new(&chain, lines, delay);
//!
//! // on the worker thread
//! let lines = worker.run();
//!
//! // anywhere else
//! chain.led(0).unwrap().set_brightness(128)?;
//! chain.remove(&mut delay)?;
//! ```

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;

use crate::GpioLine;
use crate::chain::Nu801Chain;
use crate::scheduler::Begin;
use crate::transmitter::{ChainLines, ChainTransmitter, TransmitReport};

/// Sleep between polls while nothing is armed.
pub const IDLE_POLL: Duration = Duration::from_micros(500);

/// Result of one worker tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// A frame was clocked out
    Transmitted(TransmitReport),
    /// A transmission is armed but not due yet
    Waiting { sleep_duration: Duration },
    /// Nothing to do
    Idle,
    /// The chain was removed and the final state flushed
    Stopped,
}

/// Owner of a chain's lines, performing its transmissions.
pub struct TransmitWorker<'a, C, D, L, T, const MAX_LEDS: usize> {
    chain: &'a Nu801Chain<MAX_LEDS>,
    transmitter: ChainTransmitter<C, D, L, T>,
    transmissions: u32,
}

impl<'a, C, D, L, T, const MAX_LEDS: usize> TransmitWorker<'a, C, D, L, T, MAX_LEDS>
where
    C: GpioLine,
    D: GpioLine,
    L: GpioLine,
    T: DelayNs,
{
    /// Take the lines, driving them low.
    ///
    /// A chain without a latch line stretches the final clock pulse instead.
    pub fn new(chain: &'a Nu801Chain<MAX_LEDS>, lines: ChainLines<C, D, L>, delay: T) -> Self {
        let transmitter = ChainTransmitter::new(lines, delay, chain.clock_delay_ns());
        chain.scheduler().attach();
        debug!(
            "NU801 worker started, latch line: {}",
            transmitter.has_latch()
        );
        Self {
            chain,
            transmitter,
            transmissions: 0,
        }
    }

    /// Number of frames clocked out so far
    pub const fn transmissions(&self) -> u32 {
        self.transmissions
    }

    /// Run the armed transmission if it is due.
    ///
    /// After [`Nu801Chain::remove`] the pending state is flushed immediately
    /// and the scheduler stops. While another worker still has a frame on
    /// the wire the tick reports [`TickResult::Idle`] and the stop waits.
    pub fn tick(&mut self, now: Instant) -> TickResult {
        if self.chain.scheduler().is_closing() {
            return self.flush_and_stop();
        }

        match self.chain.scheduler().begin(now) {
            Begin::Claimed => TickResult::Transmitted(self.transmit_claimed(now)),
            Begin::NotDue(deadline) => TickResult::Waiting {
                sleep_duration: deadline.saturating_duration_since(now),
            },
            Begin::Idle | Begin::Busy => TickResult::Idle,
            Begin::Stopped => TickResult::Stopped,
        }
    }

    /// Transmit whatever is armed, ignoring its deadline.
    ///
    /// Returns the report of the last frame sent, if any.
    pub fn flush(&mut self) -> Option<TransmitReport> {
        let mut last = None;
        while self.chain.scheduler().begin_flush() == Begin::Claimed {
            last = Some(self.transmit_claimed(Instant::now()));
        }
        last
    }

    /// Tick until the chain stops, then hand the lines back.
    pub fn run(mut self) -> ChainLines<C, D, L> {
        loop {
            match self.tick(Instant::now()) {
                TickResult::Transmitted(_) => {}
                TickResult::Waiting { sleep_duration } => self.sleep(sleep_duration),
                TickResult::Idle => self.sleep(IDLE_POLL),
                TickResult::Stopped => return self.release(),
            }
        }
    }

    /// Remove the chain, flush its final state and hand the lines back.
    pub fn shutdown(mut self) -> ChainLines<C, D, L> {
        if let Err(err) = self.chain.begin_removal() {
            debug!("Chain already removed: {}", err);
        }
        while self.flush_and_stop() != TickResult::Stopped {
            self.sleep(IDLE_POLL);
        }
        self.release()
    }

    fn transmit_claimed(&mut self, now: Instant) -> TransmitReport {
        let words = self.chain.snapshot();
        let report = self.transmitter.transmit(&words);
        self.chain.scheduler().finish(now);
        self.transmissions = self.transmissions.wrapping_add(1);
        trace!(
            "Transmitted {} words, {} clock pulses, latched: {}",
            report.words, report.clock_pulses, report.latched
        );
        report
    }

    fn flush_and_stop(&mut self) -> TickResult {
        self.flush();
        if !self.chain.scheduler().try_stop() {
            return TickResult::Idle;
        }
        info!(
            "NU801 worker stopped after {} transmissions",
            self.transmissions
        );
        TickResult::Stopped
    }

    fn sleep(&mut self, duration: Duration) {
        let micros = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
        self.transmitter.delay_mut().delay_us(micros);
    }

    fn release(self) -> ChainLines<C, D, L> {
        let (lines, _delay) = self.transmitter.release();
        lines
    }
}
