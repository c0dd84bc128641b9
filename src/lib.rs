pub mod chip8_emulator;

pub use chip8_emulator::app::{run_emulator_app, run_emulator_headless};
pub use chip8_emulator::config::{
    FrameBuffer, CPU_HZ, FONT_START, MEMORY_SIZE, PROGRAM_START, SCREEN_HEIGHT, SCREEN_WIDTH,
    TIMER_HZ,
};
pub use chip8_emulator::cpu::{execute_cycle, execute_opcode, tick_timers};
pub use chip8_emulator::emulator::Chip8Emulator;
pub use chip8_emulator::error::Chip8Error;
pub use chip8_emulator::io::{Chip8Io, NullIo, OpcodeHistogram, OpcodeObserver};
pub use chip8_emulator::keypad::Keypad;
pub use chip8_emulator::opcode::{fetch_opcode, Opcode};
pub use chip8_emulator::quirks::{
    load_quirks_profile, load_quirks_profile_from_env, resolve_quirks_profile, Chip8Quirks,
    MODERN_QUIRKS, ORIGINAL_QUIRKS, STANDARD_QUIRKS,
};
pub use chip8_emulator::state::{
    clear_display, create_seeded_state, create_state, first_pressed_key, load_rom, load_rom_file,
    reset_state, set_key_state, EmulatorState,
};
pub use chip8_emulator::timing::{update_machine, TickAccumulator, TickReport};
