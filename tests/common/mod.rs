//! Simulated chain wire shared by the integration tests.
//!
//! Lines and delays append to one event log. [`Wire::frames`] replays the
//! log the way the chip's shift register sees it: a bit is sampled on every
//! rising clock edge, and a frame ends on a latch pulse or on a clock high
//! phase long enough to act as one.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration as StdDuration;

use embedded_hal::delay::DelayNs;
use myrtio_nu801::transmitter::LATCH_SETTLE_US;
use myrtio_nu801::{ChainLines, GpioLine};

/// Delays at or above this are really slept.
const SLEEP_THRESHOLD_NS: u32 = 10_000;

const SETTLE_NS: u64 = LATCH_SETTLE_US as u64 * 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Clock,
    Data,
    Latch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Set(Line, bool),
    Delay(u64),
}

/// One frame as received by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub words: Vec<u16>,
    pub latched: bool,
    /// Clock high-phase duration of every bit, in nanoseconds
    pub high_holds: Vec<u64>,
}

impl Frame {
    fn from_bits(bits: &[bool], latched: bool, high_holds: Vec<u64>) -> Self {
        let words = bits
            .chunks(16)
            .map(|chunk| chunk.iter().fold(0u16, |word, &bit| word << 1 | u16::from(bit)))
            .collect();
        Self {
            words,
            latched,
            high_holds,
        }
    }

    pub fn last_hold(&self) -> u64 {
        *self.high_holds.last().expect("frame has no bits")
    }
}

#[derive(Clone, Default)]
pub struct Wire {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Wire {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self, line: Line) -> SimLine {
        SimLine {
            wire: self.clone(),
            line,
        }
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay { wire: self.clone() }
    }

    pub fn lines_with_latch(&self) -> ChainLines<SimLine, SimLine, SimLine> {
        ChainLines::with_latch(
            self.line(Line::Clock),
            self.line(Line::Data),
            self.line(Line::Latch),
        )
    }

    pub fn lines_without_latch(&self) -> ChainLines<SimLine, SimLine> {
        ChainLines::without_latch(self.line(Line::Clock), self.line(Line::Data))
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Number of GPIO writes so far
    pub fn gpio_writes(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::Set(..)))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Rising clock edges so far
    pub fn clock_pulses(&self) -> usize {
        let mut clock = false;
        let mut pulses = 0;
        for event in self.events() {
            if let Event::Set(Line::Clock, level) = event {
                if level && !clock {
                    pulses += 1;
                }
                clock = level;
            }
        }
        pulses
    }

    /// Complete frames received so far
    pub fn frames(&self) -> Vec<Frame> {
        self.decode().0
    }

    /// Bits shifted in but not yet latched
    pub fn pending_bits(&self) -> usize {
        self.decode().1
    }

    fn decode(&self) -> (Vec<Frame>, usize) {
        let mut frames = Vec::new();
        let mut bits = Vec::new();
        let mut holds = Vec::new();
        let mut data = false;
        let mut clock = false;
        let mut hold = 0;

        for event in self.events() {
            match event {
                Event::Set(Line::Data, level) => data = level,
                Event::Set(Line::Clock, true) => {
                    if !clock {
                        bits.push(data);
                        hold = 0;
                    }
                    clock = true;
                }
                Event::Set(Line::Clock, false) => {
                    if clock {
                        holds.push(hold);
                        if hold >= SETTLE_NS {
                            frames.push(Frame::from_bits(&bits, false, std::mem::take(&mut holds)));
                            bits.clear();
                        }
                    }
                    clock = false;
                }
                Event::Set(Line::Latch, true) => {
                    frames.push(Frame::from_bits(&bits, true, std::mem::take(&mut holds)));
                    bits.clear();
                }
                Event::Set(Line::Latch, false) => {}
                Event::Delay(ns) => {
                    if clock {
                        hold += ns;
                    }
                }
            }
        }
        (frames, bits.len())
    }
}

pub struct SimLine {
    wire: Wire,
    line: Line,
}

impl GpioLine for SimLine {
    fn set(&mut self, high: bool) {
        self.wire.push(Event::Set(self.line, high));
    }
}

/// Recording delay; long delays also sleep so worker loops do not spin.
pub struct SimDelay {
    wire: Wire,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.wire.push(Event::Delay(u64::from(ns)));
        if ns >= SLEEP_THRESHOLD_NS {
            thread::sleep(StdDuration::from_nanos(u64::from(ns)));
        }
    }
}

/// Plain sleeping delay for callers outside the wire.
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(StdDuration::from_nanos(u64::from(ns)));
    }
}

/// Poll `condition` every millisecond for up to two seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..2_000 {
        if condition() {
            return true;
        }
        thread::sleep(StdDuration::from_millis(1));
    }
    condition()
}
