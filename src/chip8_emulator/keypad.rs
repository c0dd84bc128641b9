use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::chip8_emulator::config::KEY_COUNT;

/// Hex keypad state shared between the machine and an input layer.
///
/// Clones share the same keys, so a clone can be handed to another thread. A write is visible
/// to the next instruction that reads the keypad.
#[derive(Debug, Clone, Default)]
pub struct Keypad {
    keys: Arc<Mutex<[bool; KEY_COUNT]>>,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, [bool; KEY_COUNT]> {
        // The array has no invariant a panicking writer could break.
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Out-of-range indices are ignored.
    pub fn set(&self, key_index: usize, is_pressed: bool) {
        if key_index >= KEY_COUNT {
            return;
        }
        self.lock()[key_index] = is_pressed;
    }

    /// Out-of-range indices read as released.
    pub fn is_pressed(&self, key_index: usize) -> bool {
        self.lock().get(key_index).copied().unwrap_or(false)
    }

    pub fn first_pressed(&self) -> Option<u8> {
        self.lock()
            .iter()
            .position(|pressed| *pressed)
            .map(|index| index as u8)
    }

    pub fn release_all(&self) {
        *self.lock() = [false; KEY_COUNT];
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> [bool; KEY_COUNT] {
        *self.lock()
    }
}
