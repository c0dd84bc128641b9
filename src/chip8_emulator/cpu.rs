use log::trace;
use rand::Rng;

use crate::chip8_emulator::config::{
    FLAG_REGISTER, FONT_GLYPH_BYTES, FONT_START, MEMORY_SIZE, PROGRAM_START, SCREEN_HEIGHT,
    SCREEN_WIDTH, STACK_SIZE,
};
use crate::chip8_emulator::error::Chip8Error;
use crate::chip8_emulator::io::Chip8Io;
use crate::chip8_emulator::opcode::{fetch_opcode, Opcode};
use crate::chip8_emulator::quirks::Chip8Quirks;
use crate::chip8_emulator::state::{
    clear_display, first_pressed_key, start_sound, stop_sound, EmulatorState,
};

const ADDRESS_MASK: usize = 0x0FFF;

/// Fetches, decodes and executes the instruction at PC.
///
/// On error the program counter is left on the faulting instruction and nothing else changes, so
/// the next call faults again on the same opcode.
pub fn execute_cycle(
    state: &mut EmulatorState,
    quirks: Chip8Quirks,
    io: &mut dyn Chip8Io,
) -> Result<Opcode, Chip8Error> {
    let pc = state.pc;
    if pc < PROGRAM_START {
        return Err(Chip8Error::ProgramCounterOutOfBounds(pc));
    }
    let opcode =
        fetch_opcode(&state.memory, pc).ok_or(Chip8Error::ProgramCounterOutOfBounds(pc))?;
    trace!("0x{pc:03x}: {:04x}", opcode.raw);

    state.pc += 2;
    if let Err(error) = execute_opcode(state, opcode.raw, quirks, io) {
        state.pc = pc;
        return Err(error);
    }

    Ok(opcode)
}

/// One 60 Hz tick of the delay and sound timers.
pub fn tick_timers(state: &mut EmulatorState, io: &mut dyn Chip8Io) {
    state.delay_timer = state.delay_timer.saturating_sub(1);

    if state.sound_timer > 0 {
        state.sound_timer -= 1;
        if state.sound_timer == 0 {
            stop_sound(state, io);
        }
    }
}

/// Executes `raw` as though it was just fetched: PC already points past it.
///
/// `state.op` records `raw` only once the instruction has completed.
pub fn execute_opcode(
    state: &mut EmulatorState,
    raw: u16,
    quirks: Chip8Quirks,
    io: &mut dyn Chip8Io,
) -> Result<(), Chip8Error> {
    dispatch_opcode(state, Opcode::decode(raw), quirks, io)?;
    state.op = raw;
    Ok(())
}

fn dispatch_opcode(
    state: &mut EmulatorState,
    opcode: Opcode,
    quirks: Chip8Quirks,
    io: &mut dyn Chip8Io,
) -> Result<(), Chip8Error> {
    let raw = opcode.raw;
    match opcode.class() {
        0x0 => handle_family_0(state, opcode, io),
        0x1 => {
            state.pc = opcode.nnn;
            Ok(())
        }
        0x2 => {
            if state.sp >= STACK_SIZE {
                return Err(Chip8Error::StackOverflow {
                    pc: instruction_address(state),
                });
            }
            state.stack[state.sp] = state.pc as u16;
            state.sp += 1;
            state.pc = opcode.nnn;
            Ok(())
        }
        0x3 => {
            let equal = state.registers[opcode.x] == opcode.kk;
            skip_if(state, equal);
            Ok(())
        }
        0x4 => {
            let equal = state.registers[opcode.x] == opcode.kk;
            skip_if(state, !equal);
            Ok(())
        }
        0x5 => {
            if opcode.n != 0 {
                return Err(invalid_opcode(state, raw));
            }
            let equal = state.registers[opcode.x] == state.registers[opcode.y];
            skip_if(state, equal);
            Ok(())
        }
        0x6 => {
            state.registers[opcode.x] = opcode.kk;
            Ok(())
        }
        0x7 => {
            state.registers[opcode.x] = state.registers[opcode.x].wrapping_add(opcode.kk);
            Ok(())
        }
        0x8 => handle_family_8(state, opcode, quirks),
        0x9 => {
            if opcode.n != 0 {
                return Err(invalid_opcode(state, raw));
            }
            let equal = state.registers[opcode.x] == state.registers[opcode.y];
            skip_if(state, !equal);
            Ok(())
        }
        0xA => {
            state.index = opcode.nnn;
            Ok(())
        }
        0xB => {
            let jump_register = if quirks.jump_with_vx { opcode.x } else { 0 };
            state.pc = opcode.nnn + state.registers[jump_register] as usize;
            Ok(())
        }
        0xC => {
            state.registers[opcode.x] = state.rng.gen::<u8>() & opcode.kk;
            Ok(())
        }
        0xD => {
            handle_opcode_dxyn_draw(state, opcode, quirks);
            io.notify_display(&state.screen_buffer);
            Ok(())
        }
        0xE => handle_family_e(state, opcode),
        _ => handle_family_f(state, opcode, quirks, io),
    }
}

fn instruction_address(state: &EmulatorState) -> usize {
    state.pc.saturating_sub(2)
}

fn invalid_opcode(state: &EmulatorState, opcode: u16) -> Chip8Error {
    Chip8Error::InvalidOpcode {
        pc: instruction_address(state),
        opcode,
    }
}

fn skip_if(state: &mut EmulatorState, condition: bool) {
    if condition {
        state.pc += 2;
    }
}

fn memory_address(base: usize, offset: usize) -> usize {
    (base + offset) % MEMORY_SIZE
}

fn handle_family_0(
    state: &mut EmulatorState,
    opcode: Opcode,
    io: &mut dyn Chip8Io,
) -> Result<(), Chip8Error> {
    match opcode.raw {
        0x00E0 => {
            clear_display(state);
            io.notify_display(&state.screen_buffer);
            Ok(())
        }
        0x00EE => {
            if state.sp == 0 {
                return Err(Chip8Error::StackUnderflow {
                    pc: instruction_address(state),
                });
            }
            state.sp -= 1;
            state.pc = state.stack[state.sp] as usize;
            Ok(())
        }
        // 0nnn calls native COSMAC routines; there is nothing to run them on.
        _ => {
            trace!("ignoring machine routine call 0x{:04x}", opcode.raw);
            Ok(())
        }
    }
}

fn handle_family_8(
    state: &mut EmulatorState,
    opcode: Opcode,
    quirks: Chip8Quirks,
) -> Result<(), Chip8Error> {
    let x_reg = opcode.x;
    let vx = state.registers[x_reg];
    let vy = state.registers[opcode.y];
    let shift_source = if quirks.shift_uses_vy { vy } else { vx };

    // VF is written after Vx so that it holds the flag even when x is 0xF.
    let (result, flag) = match opcode.n {
        0x0 => (vy, None),
        0x1 => (vx | vy, None),
        0x2 => (vx & vy, None),
        0x3 => (vx ^ vy, None),
        0x4 => {
            let (sum, carry) = vx.overflowing_add(vy);
            (sum, Some(u8::from(carry)))
        }
        0x5 => (vx.wrapping_sub(vy), Some(u8::from(vx > vy))),
        0x6 => (shift_source >> 1, Some(shift_source & 0x1)),
        0x7 => (vy.wrapping_sub(vx), Some(u8::from(vy > vx))),
        0xE => (shift_source << 1, Some((shift_source >> 7) & 0x1)),
        _ => return Err(invalid_opcode(state, opcode.raw)),
    };

    state.registers[x_reg] = result;
    if let Some(flag) = flag {
        state.registers[FLAG_REGISTER] = flag;
    }
    Ok(())
}

/// XOR-blits an n-row sprite from I at (Vx, Vy).
///
/// The start position wraps onto the screen. Pixels running past the right or bottom edge are
/// clipped, or wrap when `draw_wrap` is set. Sprite bytes are read with addresses wrapping at the
/// end of memory.
fn handle_opcode_dxyn_draw(state: &mut EmulatorState, opcode: Opcode, quirks: Chip8Quirks) {
    let x_start = (state.registers[opcode.x] as usize) % SCREEN_WIDTH;
    let y_start = (state.registers[opcode.y] as usize) % SCREEN_HEIGHT;
    let height = opcode.n as usize;

    let mut collision = 0;

    for row in 0..height {
        let mut y_pos = y_start + row;
        if quirks.draw_wrap {
            y_pos %= SCREEN_HEIGHT;
        } else if y_pos >= SCREEN_HEIGHT {
            break;
        }

        let sprite_row = state.memory[memory_address(state.index, row)];

        for bit in 0..8 {
            let mut x_pos = x_start + bit;
            if quirks.draw_wrap {
                x_pos %= SCREEN_WIDTH;
            } else if x_pos >= SCREEN_WIDTH {
                break;
            }

            if (sprite_row >> (7 - bit)) & 0x1 == 0 {
                continue;
            }

            let location = x_pos + (y_pos * SCREEN_WIDTH);
            if state.screen_buffer[location] == 1 {
                collision = 1;
            }
            state.screen_buffer[location] ^= 1;
        }
    }

    state.registers[FLAG_REGISTER] = collision;
}

fn handle_family_e(state: &mut EmulatorState, opcode: Opcode) -> Result<(), Chip8Error> {
    let pressed = state.keypad.is_pressed(state.registers[opcode.x] as usize);

    match opcode.kk {
        0x9E => {
            skip_if(state, pressed);
            Ok(())
        }
        0xA1 => {
            skip_if(state, !pressed);
            Ok(())
        }
        _ => Err(invalid_opcode(state, opcode.raw)),
    }
}

fn handle_family_f(
    state: &mut EmulatorState,
    opcode: Opcode,
    quirks: Chip8Quirks,
    io: &mut dyn Chip8Io,
) -> Result<(), Chip8Error> {
    let x_reg = opcode.x;

    match opcode.kk {
        0x07 => {
            state.registers[x_reg] = state.delay_timer;
            Ok(())
        }
        0x0A => {
            // No key held: rewind so the same instruction runs again next cycle.
            match first_pressed_key(state) {
                Some(key) => state.registers[x_reg] = key,
                None => state.pc = state.pc.saturating_sub(2),
            }
            Ok(())
        }
        0x15 => {
            state.delay_timer = state.registers[x_reg];
            Ok(())
        }
        0x18 => {
            state.sound_timer = state.registers[x_reg];
            if state.sound_timer > 0 {
                start_sound(state, io);
            } else {
                stop_sound(state, io);
            }
            Ok(())
        }
        0x1E => {
            let sum = state.index + state.registers[x_reg] as usize;
            state.index = sum & ADDRESS_MASK;
            state.registers[FLAG_REGISTER] = u8::from(sum > ADDRESS_MASK);
            Ok(())
        }
        0x29 => {
            state.index = FONT_START + (state.registers[x_reg] as usize) * FONT_GLYPH_BYTES;
            Ok(())
        }
        0x33 => {
            let value = state.registers[x_reg];
            let digits = [value / 100, (value % 100) / 10, value % 10];
            for (offset, digit) in digits.into_iter().enumerate() {
                state.memory[memory_address(state.index, offset)] = digit;
            }
            Ok(())
        }
        0x55 => {
            for register in 0..=x_reg {
                state.memory[memory_address(state.index, register)] = state.registers[register];
            }
            if quirks.load_store_increment_i {
                state.index = (state.index + x_reg + 1) & ADDRESS_MASK;
            }
            Ok(())
        }
        0x65 => {
            for register in 0..=x_reg {
                state.registers[register] = state.memory[memory_address(state.index, register)];
            }
            if quirks.load_store_increment_i {
                state.index = (state.index + x_reg + 1) & ADDRESS_MASK;
            }
            Ok(())
        }
        _ => Err(invalid_opcode(state, opcode.raw)),
    }
}
