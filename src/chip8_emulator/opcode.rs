use crate::chip8_emulator::config::MEMORY_SIZE;

/// A fetched 16-bit instruction word with its operand fields split out.
///
/// `x`, `y` and `n` are nibbles, so they are always valid register indices / row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub raw: u16,
    pub x: usize,
    pub y: usize,
    pub n: u8,
    pub kk: u8,
    pub nnn: usize,
}

impl Opcode {
    pub fn decode(raw: u16) -> Self {
        Self {
            raw,
            x: ((raw & 0x0F00) >> 8) as usize,
            y: ((raw & 0x00F0) >> 4) as usize,
            n: (raw & 0x000F) as u8,
            kk: (raw & 0x00FF) as u8,
            nnn: (raw & 0x0FFF) as usize,
        }
    }

    /// Top nibble.
    pub fn class(&self) -> u8 {
        (self.raw >> 12) as u8
    }

    /// The instruction with its operands masked out, e.g. `0xD123 -> 0xD000`,
    /// `0x8AB4 -> 0x8004`, `0xF533 -> 0xF033`.
    pub fn pattern(&self) -> u16 {
        match self.class() {
            0x0 => self.raw,
            0x5 | 0x8 | 0x9 => self.raw & 0xF00F,
            0xE | 0xF => self.raw & 0xF0FF,
            _ => self.raw & 0xF000,
        }
    }
}

/// Reads the big-endian opcode at `pc`. `None` when the word would run past memory.
pub fn fetch_opcode(memory: &[u8; MEMORY_SIZE], pc: usize) -> Option<Opcode> {
    let high = *memory.get(pc)?;
    let low = *memory.get(pc.checked_add(1)?)?;
    Some(Opcode::decode(u16::from_be_bytes([high, low])))
}
