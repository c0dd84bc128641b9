use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::chip8_emulator::config::FrameBuffer;
use crate::chip8_emulator::opcode::Opcode;

/// Host-side collaborators notified by the machine.
///
/// Both calls are made synchronously from inside a step or timer tick and must not call back
/// into the emulator.
pub trait Chip8Io {
    /// Called with the whole 64x32 buffer after every clear and every draw.
    fn notify_display(&mut self, frame: &FrameBuffer);

    /// Called only when the sound timer moves between zero and nonzero.
    fn notify_sound(&mut self, active: bool);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIo;

impl Chip8Io for NullIo {
    fn notify_display(&mut self, _frame: &FrameBuffer) {}

    fn notify_sound(&mut self, _active: bool) {}
}

/// Diagnostic hook run after each instruction that executed successfully.
pub trait OpcodeObserver {
    fn observe(&mut self, pc: usize, opcode: Opcode);
}

/// Lets a host keep a handle on an observer it has given to the emulator.
impl<T: OpcodeObserver> OpcodeObserver for Rc<RefCell<T>> {
    fn observe(&mut self, pc: usize, opcode: Opcode) {
        self.borrow_mut().observe(pc, opcode);
    }
}

/// Execution counts per instruction pattern (`0x8004`, `0xF033`, ...).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OpcodeHistogram {
    counts: BTreeMap<u16, u64>,
}

impl OpcodeHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pattern: u16) -> u64 {
        self.counts.get(&pattern).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, u64)> + '_ {
        self.counts.iter().map(|(pattern, count)| (*pattern, *count))
    }
}

impl OpcodeObserver for OpcodeHistogram {
    fn observe(&mut self, _pc: usize, opcode: Opcode) {
        *self.counts.entry(opcode.pattern()).or_insert(0) += 1;
    }
}

impl Display for OpcodeHistogram {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (pattern, count) in self.iter() {
            writeln!(f, "0x{pattern:04X}: {count}")?;
        }
        write!(f, "total: {}", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_groups_by_pattern() {
        let mut histogram = OpcodeHistogram::new();
        histogram.observe(0x200, Opcode::decode(0x8124));
        histogram.observe(0x202, Opcode::decode(0x8AB4));
        histogram.observe(0x204, Opcode::decode(0x6001));

        assert_eq!(histogram.count(0x8004), 2);
        assert_eq!(histogram.count(0x6000), 1);
        assert_eq!(histogram.total(), 3);
        assert_eq!(histogram.to_string(), "0x6000: 1\n0x8004: 2\ntotal: 3");
    }

    #[test]
    fn shared_histogram_is_visible_to_its_owner() {
        let shared = Rc::new(RefCell::new(OpcodeHistogram::new()));
        let mut handed_out: Box<dyn OpcodeObserver> = Box::new(Rc::clone(&shared));

        handed_out.observe(0x200, Opcode::decode(0x00E0));

        assert_eq!(shared.borrow().count(0x00E0), 1);
    }
}
