use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::info;

use crate::chip8_emulator::config::{FrameBuffer, SCREEN_HEIGHT, SCREEN_SIZE, SCREEN_WIDTH};
use crate::chip8_emulator::emulator::Chip8Emulator;
use crate::chip8_emulator::error::Chip8Error;
use crate::chip8_emulator::io::{Chip8Io, OpcodeObserver};
use crate::chip8_emulator::quirks::Chip8Quirks;

/// Longest frame fed to the emulator; a stalled window must not trigger a burst of catch-up.
const MAX_FRAME_TIME: Duration = Duration::from_millis(100);

/// Host sink without speakers or a window: sound changes are logged, frames dropped.
#[derive(Debug, Default)]
struct LogIo;

impl Chip8Io for LogIo {
    fn notify_display(&mut self, _frame: &FrameBuffer) {}

    fn notify_sound(&mut self, active: bool) {
        info!("sound {}", if active { "start" } else { "stop" });
    }
}

/// Publishes every notified frame to the render loop.
struct WindowIo {
    front_buffer: Rc<RefCell<FrameBuffer>>,
}

impl Chip8Io for WindowIo {
    fn notify_display(&mut self, frame: &FrameBuffer) {
        self.front_buffer.borrow_mut().copy_from_slice(frame);
    }

    fn notify_sound(&mut self, active: bool) {
        LogIo.notify_sound(active);
    }
}

fn build_emulator(
    io: Box<dyn Chip8Io>,
    quirks: Chip8Quirks,
    seed: Option<u64>,
    observer: Option<Box<dyn OpcodeObserver>>,
) -> Chip8Emulator {
    let mut emulator = match seed {
        Some(seed) => Chip8Emulator::with_seed(io, quirks, seed),
        None => Chip8Emulator::new(io, quirks),
    };
    if let Some(observer) = observer {
        emulator.set_observer(observer);
    }
    emulator
}

/// Runs `seconds` of simulated time in fixed `1/fps` frames without opening a window.
pub fn run_emulator_headless(
    quirks: Chip8Quirks,
    rom_path: &Path,
    seconds: f64,
    fps: usize,
    seed: Option<u64>,
    observer: Option<Box<dyn OpcodeObserver>>,
) -> Result<Chip8Emulator, Chip8Error> {
    if fps == 0 {
        return Err(Chip8Error::InvalidArgument("fps must be > 0"));
    }
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Chip8Error::InvalidArgument("seconds must be >= 0"));
    }

    let mut emulator = build_emulator(Box::new(LogIo), quirks, seed, observer);
    emulator.load_rom_file(rom_path)?;

    // Frame boundaries are computed from the frame number so the total stays exact.
    let frame_start = |frame: u64| frame * 1_000_000_000 / fps as u64;
    let frames = (seconds * fps as f64).round() as u64;
    for frame in 0..frames {
        emulator.update(Duration::from_nanos(frame_start(frame + 1) - frame_start(frame)));
    }

    Ok(emulator)
}

pub fn run_emulator_app(
    quirks: Chip8Quirks,
    rom_path: &Path,
    scale: usize,
    target_fps: usize,
    seed: Option<u64>,
    observer: Option<Box<dyn OpcodeObserver>>,
) -> Result<Chip8Emulator, Chip8Error> {
    use raylib::prelude::{Color, KeyboardKey, RaylibDraw};

    if scale == 0 {
        return Err(Chip8Error::InvalidArgument("scale must be > 0"));
    }
    if target_fps == 0 {
        return Err(Chip8Error::InvalidArgument("target_fps must be > 0"));
    }

    let front_buffer = Rc::new(RefCell::new([0u8; SCREEN_SIZE]));
    let io = WindowIo {
        front_buffer: Rc::clone(&front_buffer),
    };
    let mut emulator = build_emulator(Box::new(io), quirks, seed, observer);
    emulator.load_rom_file(rom_path)?;
    let keypad = emulator.keypad();

    let width = (SCREEN_WIDTH * scale) as i32;
    let height = (SCREEN_HEIGHT * scale) as i32;
    let (mut rl, thread) = raylib::init()
        .size(width, height)
        .title("chip8-timed")
        .build();
    rl.set_target_fps(target_fps as u32);

    let key_map = [
        (KeyboardKey::KEY_ONE, 0x1usize),
        (KeyboardKey::KEY_TWO, 0x2),
        (KeyboardKey::KEY_THREE, 0x3),
        (KeyboardKey::KEY_FOUR, 0xC),
        (KeyboardKey::KEY_Q, 0x4),
        (KeyboardKey::KEY_W, 0x5),
        (KeyboardKey::KEY_E, 0x6),
        (KeyboardKey::KEY_R, 0xD),
        (KeyboardKey::KEY_A, 0x7),
        (KeyboardKey::KEY_S, 0x8),
        (KeyboardKey::KEY_D, 0x9),
        (KeyboardKey::KEY_F, 0xE),
        (KeyboardKey::KEY_Z, 0xA),
        (KeyboardKey::KEY_X, 0x0),
        (KeyboardKey::KEY_C, 0xB),
        (KeyboardKey::KEY_V, 0xF),
    ];

    let mut previous_tick = Instant::now();

    while !rl.window_should_close() {
        if rl.is_key_pressed(KeyboardKey::KEY_ESCAPE) {
            break;
        }
        if rl.is_key_pressed(KeyboardKey::KEY_F5) {
            emulator.reset();
        }

        for (key, mapped) in key_map {
            keypad.set(mapped, rl.is_key_down(key));
        }

        let now = Instant::now();
        let frame_dt = (now - previous_tick).min(MAX_FRAME_TIME);
        previous_tick = now;
        emulator.update(frame_dt);

        let mut d = rl.begin_drawing(&thread);
        d.clear_background(Color::BLACK);
        for (index, value) in front_buffer.borrow().iter().enumerate() {
            if *value == 0 {
                continue;
            }
            let x = (index % SCREEN_WIDTH) as i32;
            let y = (index / SCREEN_WIDTH) as i32;
            d.draw_rectangle(
                x * scale as i32,
                y * scale as i32,
                scale as i32,
                scale as i32,
                Color::WHITE,
            );
        }
    }

    Ok(emulator)
}
