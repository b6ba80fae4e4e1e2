//! Shared brightness buffer of the whole chain.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;

/// Encode an 8-bit level into the chip's 16-bit PWM word.
///
/// The level is duplicated into both bytes.
pub const fn encode_level(level: u8) -> u16 {
    let level = level as u16;
    (level << 8) | level
}

/// Extract the 8-bit level from a PWM word.
pub const fn decode_word(word: u16) -> u8 {
    word.to_be_bytes()[0]
}

/// Per-LED PWM words in wire order, guarded by one lock.
///
/// Position 0 is the first word clocked out, the LED farthest from the
/// controller. The length is fixed when the buffer is created.
pub struct ChainBuffer<const MAX_LEDS: usize> {
    words: Mutex<RefCell<Vec<u16, MAX_LEDS>>>,
}

impl<const MAX_LEDS: usize> ChainBuffer<MAX_LEDS> {
    /// Create a zeroed buffer of `len` words.
    ///
    /// Returns `None` if `len` exceeds `MAX_LEDS`.
    pub fn new(len: usize) -> Option<Self> {
        let mut words = Vec::new();
        words.resize(len, 0).ok()?;
        Some(Self {
            words: Mutex::new(RefCell::new(words)),
        })
    }

    /// Number of words in the chain
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.words.borrow_ref(cs).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store one word.
    ///
    /// Indices are validated at construction; an out-of-range index is ignored.
    pub fn write_word(&self, physical_index: usize, value: u16) {
        critical_section::with(|cs| {
            if let Some(word) = self.words.borrow_ref_mut(cs).get_mut(physical_index) {
                *word = value;
            }
        });
    }

    /// Read one word
    pub fn word(&self, physical_index: usize) -> Option<u16> {
        critical_section::with(|cs| self.words.borrow_ref(cs).get(physical_index).copied())
    }

    /// Copy the whole buffer in one critical section.
    ///
    /// The copy is what gets clocked out, so the lock is never held while
    /// the wire is driven.
    pub fn snapshot(&self) -> Vec<u16, MAX_LEDS> {
        critical_section::with(|cs| self.words.borrow_ref(cs).clone())
    }
}
