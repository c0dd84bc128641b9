use std::time::Duration;

use crate::chip8_emulator::config::{CPU_HZ, TIMER_HZ};
use crate::chip8_emulator::cpu::{execute_cycle, tick_timers};
use crate::chip8_emulator::error::Chip8Error;
use crate::chip8_emulator::io::{Chip8Io, OpcodeObserver};
use crate::chip8_emulator::quirks::Chip8Quirks;
use crate::chip8_emulator::state::EmulatorState;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Converts wall-clock time into whole ticks at a fixed rate.
///
/// Elapsed time is stored as nanoseconds multiplied by the rate, so one tick is exactly
/// `NANOS_PER_SEC` units and the carried remainder never accumulates rounding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickAccumulator {
    rate_hz: u64,
    carried: u128,
}

impl TickAccumulator {
    pub const fn new(rate_hz: u64) -> Self {
        Self {
            rate_hz,
            carried: 0,
        }
    }

    pub const fn cpu() -> Self {
        Self::new(CPU_HZ)
    }

    pub const fn timers() -> Self {
        Self::new(TIMER_HZ)
    }

    pub fn advance(&mut self, elapsed: Duration) {
        self.carried += elapsed.as_nanos() * self.rate_hz as u128;
    }

    /// Consumes one period if a whole one has accumulated.
    pub fn take_tick(&mut self) -> bool {
        if self.carried >= NANOS_PER_SEC {
            self.carried -= NANOS_PER_SEC;
            true
        } else {
            false
        }
    }

    /// Time still carried towards the next tick.
    #[cfg(test)]
    pub fn remainder(&self) -> Duration {
        let nanos = self.carried / self.rate_hz.max(1) as u128;
        Duration::from_nanos(nanos as u64)
    }

    pub fn reset(&mut self) {
        self.carried = 0;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub cycles: u64,
    pub timer_ticks: u64,
    pub faults: u64,
}

/// Runs every instruction tick and then every timer tick that `elapsed` releases.
///
/// A faulting instruction still consumes its tick; the fault is handed to `on_fault` and the
/// remaining ticks keep running.
pub fn update_machine<O>(
    state: &mut EmulatorState,
    quirks: Chip8Quirks,
    io: &mut dyn Chip8Io,
    mut observer: Option<&mut O>,
    elapsed: Duration,
    on_fault: &mut dyn FnMut(Chip8Error),
) -> TickReport
where
    O: OpcodeObserver + ?Sized,
{
    let mut report = TickReport::default();

    state.cpu_clock.advance(elapsed);
    while state.cpu_clock.take_tick() {
        let pc = state.pc;
        match execute_cycle(state, quirks, io) {
            Ok(opcode) => {
                if let Some(observer) = observer.as_mut() {
                    observer.observe(pc, opcode);
                }
            }
            Err(error) => {
                report.faults += 1;
                on_fault(error);
            }
        }
        report.cycles += 1;
    }

    state.timer_clock.advance(elapsed);
    while state.timer_clock.take_tick() {
        tick_timers(state, io);
        report.timer_ticks += 1;
    }

    report
}
