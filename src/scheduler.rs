//! Transmission coalescing.
//!
//! Brightness writes go straight into the shared buffer; the scheduler only
//! decides *whether* a transmission still has to happen. Because every
//! transmission snapshots the whole buffer when it starts, any number of
//! writes collapse into one transmission, and a write that lands after the
//! snapshot re-arms the scheduler instead of being dropped.
//!
//! ```text
//!          request             begin (due)
//!   Idle ----------> Armed ---------------> Running { rearm: false }
//!    ^                 ^                      |  request -> rearm = true
//!    |   finish        |  finish (rearm)      |
//!    +-----------------+----------------------+
//! ```

use core::cell::Cell;

use critical_section::Mutex;
use embassy_time::{Duration, Instant};

use crate::Error;

/// Delay between the first change and the transmission it triggers.
pub const DEFAULT_SCHEDULE_DELAY: Duration = Duration::from_millis(2);

/// Where the scheduler currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Nothing pending
    Idle,
    /// A transmission will start once `deadline` has passed
    Armed { deadline: Instant },
    /// A transmission is on the wire; `rearm` records changes made since it started
    Running { rearm: bool },
    /// Torn down, no further transmissions
    Stopped,
}

/// Outcome of trying to claim a transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// The caller now owns the transmission and must call [`TransmitScheduler::finish`]
    Claimed,
    /// Armed, but not before the given deadline
    NotDue(Instant),
    /// Nothing to send
    Idle,
    /// Another actor is transmitting
    Busy,
    /// The scheduler was stopped
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct State {
    phase: SchedulerPhase,
    closing: bool,
    attached: bool,
}

/// Idle/armed/running state machine shared by LED callers and the worker.
pub struct TransmitScheduler {
    state: Mutex<Cell<State>>,
    delay: Duration,
}

impl TransmitScheduler {
    /// Create an idle scheduler deferring transmissions by `delay`.
    pub const fn new(delay: Duration) -> Self {
        Self {
            state: Mutex::new(Cell::new(State {
                phase: SchedulerPhase::Idle,
                closing: false,
                attached: false,
            })),
            delay,
        }
    }

    /// Deferral applied to newly armed transmissions
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.transition(|state| state.phase)
    }

    /// `true` when nothing is armed or running
    pub fn is_idle(&self) -> bool {
        matches!(self.phase(), SchedulerPhase::Idle)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.phase(), SchedulerPhase::Stopped)
    }

    /// `true` once [`close`](Self::close) was called
    pub fn is_closing(&self) -> bool {
        self.transition(|state| state.closing)
    }

    /// Record that a worker drives this scheduler.
    pub fn attach(&self) {
        self.transition(|state| state.attached = true);
    }

    /// `true` once a worker was attached
    pub fn is_attached(&self) -> bool {
        self.transition(|state| state.attached)
    }

    /// Signal that the buffer changed.
    ///
    /// Returns `true` if this call armed a new transmission. `false` means a
    /// transmission is already armed or running and will carry the change.
    pub fn request(&self, now: Instant) -> Result<bool, Error> {
        let delay = self.delay;
        self.transition(|state| {
            if state.closing {
                return Err(Error::ChainStopped);
            }
            match state.phase {
                SchedulerPhase::Idle => {
                    state.phase = SchedulerPhase::Armed {
                        deadline: now + delay,
                    };
                    Ok(true)
                }
                SchedulerPhase::Armed { .. } => Ok(false),
                SchedulerPhase::Running { .. } => {
                    state.phase = SchedulerPhase::Running { rearm: true };
                    Ok(false)
                }
                SchedulerPhase::Stopped => Err(Error::ChainStopped),
            }
        })
    }

    /// Arm a transmission that is due immediately.
    pub fn arm_now(&self, now: Instant) -> Result<(), Error> {
        self.transition(|state| match state.phase {
            SchedulerPhase::Idle | SchedulerPhase::Armed { .. } => {
                state.phase = SchedulerPhase::Armed { deadline: now };
                Ok(())
            }
            SchedulerPhase::Running { .. } => {
                state.phase = SchedulerPhase::Running { rearm: true };
                Ok(())
            }
            SchedulerPhase::Stopped => Err(Error::ChainStopped),
        })
    }

    /// Claim the armed transmission if its deadline has passed.
    pub fn begin(&self, now: Instant) -> Begin {
        self.claim(Some(now))
    }

    /// Claim the armed transmission regardless of its deadline.
    pub fn begin_flush(&self) -> Begin {
        self.claim(None)
    }

    /// Release a claimed transmission.
    ///
    /// Re-arms when changes arrived while it was running.
    pub fn finish(&self, now: Instant) {
        let delay = self.delay;
        self.transition(|state| {
            state.phase = match state.phase {
                SchedulerPhase::Running { rearm: true } => SchedulerPhase::Armed {
                    deadline: now + delay,
                },
                SchedulerPhase::Running { rearm: false } => SchedulerPhase::Idle,
                other => other,
            };
        });
    }

    /// Refuse further requests; the worker flushes and stops next.
    pub fn close(&self) {
        self.transition(|state| state.closing = true);
    }

    /// Enter the terminal state if nothing is armed or running.
    ///
    /// Returns `true` when the scheduler is stopped afterwards.
    pub fn try_stop(&self) -> bool {
        self.transition(|state| match state.phase {
            SchedulerPhase::Idle | SchedulerPhase::Stopped => {
                state.closing = true;
                state.phase = SchedulerPhase::Stopped;
                true
            }
            SchedulerPhase::Armed { .. } | SchedulerPhase::Running { .. } => false,
        })
    }

    /// Enter the terminal state unconditionally
    pub fn stop(&self) {
        self.transition(|state| {
            state.closing = true;
            state.phase = SchedulerPhase::Stopped;
        });
    }

    fn claim(&self, now: Option<Instant>) -> Begin {
        self.transition(|state| match state.phase {
            SchedulerPhase::Idle => Begin::Idle,
            SchedulerPhase::Running { .. } => Begin::Busy,
            SchedulerPhase::Stopped => Begin::Stopped,
            SchedulerPhase::Armed { deadline } => match now {
                Some(now) if now < deadline => Begin::NotDue(deadline),
                _ => {
                    state.phase = SchedulerPhase::Running { rearm: false };
                    Begin::Claimed
                }
            },
        })
    }

    fn transition<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            let result = f(&mut state);
            cell.set(state);
            result
        })
    }
}
