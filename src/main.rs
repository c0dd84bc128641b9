use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use log::info;

use chip8_timed::{
    load_quirks_profile_from_env, resolve_quirks_profile, run_emulator_app, run_emulator_headless,
    Chip8Error, OpcodeHistogram, OpcodeObserver,
};

#[derive(Debug, Parser)]
#[command(name = "chip8-timed")]
#[command(about = "Run a CHIP-8 program at 1000 instructions per second with 60 Hz timers")]
struct Args {
    #[arg(long)]
    rom: PathBuf,

    /// Quirk profile; falls back to CHIP8_QUIRKS, then "standard".
    #[arg(long, value_parser = ["standard", "original", "modern"])]
    quirks: Option<String>,

    #[arg(long, default_value_t = 10)]
    scale: usize,

    #[arg(long, default_value_t = 60)]
    fps: usize,

    #[arg(long)]
    headless: bool,

    /// Simulated run time for --headless.
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,

    /// Seed for the random-number instruction.
    #[arg(long)]
    seed: Option<u64>,

    /// Print per-instruction execution counts on exit.
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<(), Chip8Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let (profile, quirks) = match args.quirks.as_deref() {
        Some(name) => resolve_quirks_profile(Some(name)),
        None => load_quirks_profile_from_env(),
    }
    .map_err(|_| Chip8Error::InvalidArgument("quirks must be standard, original or modern"))?;
    info!("quirks profile: {profile}");

    let histogram = Rc::new(RefCell::new(OpcodeHistogram::new()));
    let observer = args
        .stats
        .then(|| Box::new(Rc::clone(&histogram)) as Box<dyn OpcodeObserver>);

    let emulator = if args.headless {
        run_emulator_headless(quirks, &args.rom, args.seconds, args.fps, args.seed, observer)?
    } else {
        run_emulator_app(quirks, &args.rom, args.scale, args.fps, args.seed, observer)?
    };

    let state = emulator.state();
    info!(
        "finished: pc=0x{:03x} i=0x{:03x} sp={}",
        state.pc, state.index, state.sp
    );
    if args.stats {
        println!("{}", histogram.borrow());
    }
    Ok(())
}
