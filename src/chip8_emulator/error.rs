use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum Chip8Error {
    Io(std::io::Error),
    RomTooLarge { size: usize, max: usize },
    ProgramCounterOutOfBounds(usize),
    InvalidOpcode { pc: usize, opcode: u16 },
    StackOverflow { pc: usize },
    StackUnderflow { pc: usize },
    InvalidArgument(&'static str),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::RomTooLarge { size, max } => {
                write!(f, "ROM too large: {size} bytes (max {max})")
            }
            Self::ProgramCounterOutOfBounds(pc) => {
                write!(f, "program counter outside program memory: 0x{pc:03x}")
            }
            Self::InvalidOpcode { pc, opcode } => {
                write!(f, "invalid opcode 0x{opcode:04x} at 0x{pc:03x}")
            }
            Self::StackOverflow { pc } => {
                write!(f, "call at 0x{pc:03x} with a full stack")
            }
            Self::StackUnderflow { pc } => {
                write!(f, "return at 0x{pc:03x} with an empty stack")
            }
            Self::InvalidArgument(argument) => write!(f, "invalid argument: {argument}"),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
