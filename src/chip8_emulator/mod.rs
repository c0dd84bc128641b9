pub mod app;
pub mod config;
pub mod cpu;
pub mod emulator;
pub mod error;
pub mod io;
pub mod keypad;
pub mod opcode;
pub mod quirks;
pub mod state;
pub mod timing;
