use std::fs;
use std::path::Path;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::chip8_emulator::config::{
    FrameBuffer, FONT_BYTES, FONT_START, MEMORY_SIZE, PROGRAM_START, REGISTER_COUNT, SCREEN_SIZE,
    STACK_SIZE,
};
use crate::chip8_emulator::error::Chip8Error;
use crate::chip8_emulator::io::Chip8Io;
use crate::chip8_emulator::keypad::Keypad;
use crate::chip8_emulator::timing::TickAccumulator;

#[derive(Debug)]
pub struct EmulatorState {
    pub memory: [u8; MEMORY_SIZE],
    pub registers: [u8; REGISTER_COUNT],
    pub index: usize,
    pub pc: usize,
    pub stack: [u16; STACK_SIZE],
    pub sp: usize,
    pub screen_buffer: FrameBuffer,
    pub keypad: Keypad,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub sound_playing: bool,
    pub cpu_clock: TickAccumulator,
    pub timer_clock: TickAccumulator,
    pub op: u16,
    pub rng: StdRng,
    /// Last ROM loaded successfully; reloaded on reset.
    pub rom: Option<Vec<u8>>,
}

impl Default for EmulatorState {
    fn default() -> Self {
        let mut state = Self {
            memory: [0; MEMORY_SIZE],
            registers: [0; REGISTER_COUNT],
            index: 0,
            pc: PROGRAM_START,
            stack: [0; STACK_SIZE],
            sp: 0,
            screen_buffer: [0; SCREEN_SIZE],
            keypad: Keypad::new(),
            delay_timer: 0,
            sound_timer: 0,
            sound_playing: false,
            cpu_clock: TickAccumulator::cpu(),
            timer_clock: TickAccumulator::timers(),
            op: 0,
            rng: StdRng::from_entropy(),
            rom: None,
        };
        load_font(&mut state);
        state
    }
}

pub fn create_state(rom: Option<&[u8]>) -> Result<EmulatorState, Chip8Error> {
    let mut state = EmulatorState::default();
    if let Some(bytes) = rom {
        load_rom(&mut state, bytes)?;
    }
    Ok(state)
}

pub fn create_seeded_state(seed: u64) -> EmulatorState {
    EmulatorState {
        rng: StdRng::seed_from_u64(seed),
        ..EmulatorState::default()
    }
}

/// Zeroes the machine, reseeds the fontset and reloads the last ROM. The keypad handle and the
/// random source survive so that input layers and seeded runs stay attached.
pub fn reset_state(state: &mut EmulatorState, io: &mut dyn Chip8Io) {
    stop_sound(state, io);
    state.memory = [0; MEMORY_SIZE];
    state.registers = [0; REGISTER_COUNT];
    state.index = 0;
    state.pc = PROGRAM_START;
    state.stack = [0; STACK_SIZE];
    state.sp = 0;
    clear_display(state);
    state.keypad.release_all();
    state.delay_timer = 0;
    state.sound_timer = 0;
    state.cpu_clock.reset();
    state.timer_clock.reset();
    state.op = 0;

    load_font(state);

    if let Some(rom) = state.rom.take() {
        copy_program(state, &rom);
        state.rom = Some(rom);
    }

    io.notify_display(&state.screen_buffer);
}

pub fn start_sound(state: &mut EmulatorState, io: &mut dyn Chip8Io) {
    if !state.sound_playing {
        state.sound_playing = true;
        debug!("sound on");
        io.notify_sound(true);
    }
}

pub fn stop_sound(state: &mut EmulatorState, io: &mut dyn Chip8Io) {
    if state.sound_playing {
        state.sound_playing = false;
        debug!("sound off");
        io.notify_sound(false);
    }
}

pub fn clear_display(state: &mut EmulatorState) {
    state.screen_buffer = [0; SCREEN_SIZE];
}

pub fn load_font(state: &mut EmulatorState) {
    state.memory[FONT_START..FONT_START + FONT_BYTES.len()].copy_from_slice(&FONT_BYTES);
}

/// Copies a program to 0x200. Oversized programs are rejected and leave memory untouched.
pub fn load_rom(state: &mut EmulatorState, rom_bytes: &[u8]) -> Result<(), Chip8Error> {
    let max_size = MEMORY_SIZE - PROGRAM_START;

    if rom_bytes.len() > max_size {
        return Err(Chip8Error::RomTooLarge {
            size: rom_bytes.len(),
            max: max_size,
        });
    }

    copy_program(state, rom_bytes);
    state.rom = Some(rom_bytes.to_vec());
    info!(
        "loaded {} byte ROM at 0x{:03x}..0x{:03x}",
        rom_bytes.len(),
        PROGRAM_START,
        PROGRAM_START + rom_bytes.len()
    );

    Ok(())
}

pub fn load_rom_file(state: &mut EmulatorState, path: &Path) -> Result<(), Chip8Error> {
    let rom_bytes = fs::read(path)?;
    load_rom(state, &rom_bytes)
}

fn copy_program(state: &mut EmulatorState, rom_bytes: &[u8]) {
    let end = PROGRAM_START + rom_bytes.len();
    state.memory[PROGRAM_START..end].copy_from_slice(rom_bytes);
}

pub fn first_pressed_key(state: &EmulatorState) -> Option<u8> {
    state.keypad.first_pressed()
}

pub fn set_key_state(state: &EmulatorState, key_index: usize, is_pressed: bool) {
    state.keypad.set(key_index, is_pressed);
}
