use std::path::Path;
use std::time::Duration;

use log::warn;

use crate::chip8_emulator::config::FrameBuffer;
use crate::chip8_emulator::cpu::execute_cycle;
use crate::chip8_emulator::error::Chip8Error;
use crate::chip8_emulator::io::{Chip8Io, OpcodeObserver};
use crate::chip8_emulator::keypad::Keypad;
use crate::chip8_emulator::opcode::Opcode;
use crate::chip8_emulator::quirks::Chip8Quirks;
use crate::chip8_emulator::state::{
    create_seeded_state, load_rom, load_rom_file, reset_state, EmulatorState,
};
use crate::chip8_emulator::timing::{update_machine, TickReport};

/// A running machine bound to its host collaborators.
///
/// The display/sound sink is fixed at construction. `update` is the steady-state entry point;
/// `step` runs a single instruction without touching the clocks.
pub struct Chip8Emulator {
    state: EmulatorState,
    quirks: Chip8Quirks,
    io: Box<dyn Chip8Io>,
    observer: Option<Box<dyn OpcodeObserver>>,
    last_fault: Option<String>,
}

impl Chip8Emulator {
    pub fn new(io: Box<dyn Chip8Io>, quirks: Chip8Quirks) -> Self {
        Self::with_state(EmulatorState::default(), io, quirks)
    }

    /// Same as `new`, with Cxkk drawing from a seeded generator.
    pub fn with_seed(io: Box<dyn Chip8Io>, quirks: Chip8Quirks, seed: u64) -> Self {
        Self::with_state(create_seeded_state(seed), io, quirks)
    }

    fn with_state(state: EmulatorState, io: Box<dyn Chip8Io>, quirks: Chip8Quirks) -> Self {
        let mut emulator = Self {
            state,
            quirks,
            io,
            observer: None,
            last_fault: None,
        };
        emulator.reset();
        emulator
    }

    pub fn set_observer(&mut self, observer: Box<dyn OpcodeObserver>) {
        self.observer = Some(observer);
    }

    pub fn state(&self) -> &EmulatorState {
        &self.state
    }

    /// Direct access for hosts and tests that need to poke at the machine.
    pub fn state_mut(&mut self) -> &mut EmulatorState {
        &mut self.state
    }

    pub fn quirks(&self) -> Chip8Quirks {
        self.quirks
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.state.screen_buffer
    }

    /// Handle an input layer can keep, possibly on another thread.
    pub fn keypad(&self) -> Keypad {
        self.state.keypad.clone()
    }

    pub fn set_key(&self, key_index: usize, is_pressed: bool) {
        self.state.keypad.set(key_index, is_pressed);
    }

    pub fn reset(&mut self) {
        reset_state(&mut self.state, self.io.as_mut());
        self.last_fault = None;
    }

    /// Resets the machine to empty memory and loads `rom_bytes`. A rejected ROM leaves the
    /// machine reset with no program.
    pub fn load_rom(&mut self, rom_bytes: &[u8]) -> Result<(), Chip8Error> {
        self.unload();
        load_rom(&mut self.state, rom_bytes)
    }

    pub fn load_rom_file(&mut self, path: &Path) -> Result<(), Chip8Error> {
        self.unload();
        load_rom_file(&mut self.state, path)
    }

    fn unload(&mut self) {
        self.state.rom = None;
        self.reset();
    }

    pub fn step(&mut self) -> Result<Opcode, Chip8Error> {
        let pc = self.state.pc;
        let result = execute_cycle(&mut self.state, self.quirks, self.io.as_mut());
        match &result {
            Ok(opcode) => {
                if let Some(observer) = self.observer.as_mut() {
                    observer.observe(pc, *opcode);
                }
            }
            Err(error) => report_fault(&mut self.last_fault, error),
        }
        result
    }

    pub fn update(&mut self, elapsed: Duration) -> TickReport {
        let last_fault = &mut self.last_fault;
        let mut on_fault = |error: Chip8Error| report_fault(last_fault, &error);

        update_machine(
            &mut self.state,
            self.quirks,
            self.io.as_mut(),
            self.observer.as_deref_mut(),
            elapsed,
            &mut on_fault,
        )
    }

    /// `update` taking seconds; negative or non-finite intervals count as no time.
    pub fn update_seconds(&mut self, elapsed_seconds: f64) -> TickReport {
        let elapsed = Duration::try_from_secs_f64(elapsed_seconds).unwrap_or(Duration::ZERO);
        self.update(elapsed)
    }
}

/// Logs a fault unless it repeats the previous one, which is what a program stuck on a bad
/// instruction produces every tick.
fn report_fault(last_fault: &mut Option<String>, error: &Chip8Error) {
    let message = error.to_string();
    if last_fault.as_deref() != Some(message.as_str()) {
        warn!("{message}");
        *last_fault = Some(message);
    }
}
