use crate::definitions::{Address, Word, KBD, RAM_SIZE, ROM_SIZE, SCREEN_END, SCREEN_START};
use crate::hack::instruction::{Destination, Jump};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashSet;

pub use alu::alu;
pub use error::EmulatorFault;

pub mod alu;
pub mod error;

pub type CpuResult<T = ()> = Result<T, EmulatorFault>;

const C_INSTRUCTION: u16 = 0b1000_0000_0000_0000;
const A_BIT: u16 = 0b0001_0000_0000_0000;
// addresses wrap around, the top bit of A is ignored
const ADDRESS_MASK: u16 = (RAM_SIZE - 1) as u16;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub struct Registers {
    pub a: Word,
    pub d: Word,
    pub pc: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunOutcome {
    Breakpoint { pc: usize, steps: usize },
    StepLimit { steps: usize },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DisplayBase {
    Binary,
    Decimal,
    GroupedBinary,
}

pub fn format_word(word: Word, base: DisplayBase) -> String {
    match base {
        DisplayBase::Decimal => word.to_string(),
        DisplayBase::Binary => format!("{:016b}", word as u16),
        DisplayBase::GroupedBinary => {
            let bits = format!("{:016b}", word as u16);
            bits.as_bytes()
                .chunks(4)
                .map(|group| String::from_utf8_lossy(group).into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

pub struct Computer {
    pc: usize,
    a: Word,
    d: Word,
    rom: Box<[u16]>,
    ram: Box<[Word]>,
}

impl Default for Computer {
    fn default() -> Self {
        Self {
            pc: 0,
            a: 0,
            d: 0,
            rom: vec![0; ROM_SIZE].into_boxed_slice(),
            ram: vec![0; RAM_SIZE].into_boxed_slice(),
        }
    }
}

impl Computer {
    pub fn new(rom: &[u16]) -> Self {
        let mut computer = Self::default();
        computer.reset(rom);
        computer
    }

    /// Loads a new program. Registers and ram are cleared, unused rom words are zero
    pub fn reset(&mut self, rom: &[u16]) {
        if rom.len() > ROM_SIZE {
            warn!(
                "the rom has {} words, everything after {} is ignored",
                rom.len(),
                ROM_SIZE
            );
        }
        let len = rom.len().min(ROM_SIZE);

        self.rom.fill(0);
        self.rom[..len].copy_from_slice(&rom[..len]);
        self.ram.fill(0);
        self.pc = 0;
        self.a = 0;
        self.d = 0;
    }

    #[inline]
    fn address(&self) -> Address {
        (self.a as u16 & ADDRESS_MASK) as Address
    }

    pub fn step(&mut self) -> CpuResult {
        macro_rules! jump_if {
            ($value:expr, $op:tt, $target:expr) => {
                if $value $op 0 {
                    $target
                } else {
                    self.pc + 1
                }
            }
        }

        let word = *self
            .rom
            .get(self.pc)
            .ok_or(EmulatorFault::ProgramCounterOutOfBounds(self.pc))?;

        if word & C_INSTRUCTION == 0 {
            self.a = word as Word;
            self.pc += 1;
            return Ok(());
        }

        let y = if word & A_BIT != 0 {
            self.ram[self.address()]
        } else {
            self.a
        };
        let value = alu(self.d, y, (word >> 6) & 0b111111);

        let (a, d, m) = Destination::decode((word >> 3) & 0b111).as_bools();
        // M and the jump target use A from before this instruction
        let target = self.a as u16 as usize;
        if m {
            let address = self.address();
            self.ram[address] = value;
        }
        if a {
            self.a = value;
        }
        if d {
            self.d = value;
        }

        self.pc = match Jump::decode(word & 0b111) {
            Jump::Next => self.pc + 1,
            Jump::Gt => jump_if!(value, >, target),
            Jump::Eq => jump_if!(value, ==, target),
            Jump::Ge => jump_if!(value, >=, target),
            Jump::Lt => jump_if!(value, <, target),
            Jump::Ne => jump_if!(value, !=, target),
            Jump::Le => jump_if!(value, <=, target),
            Jump::Unconditional => target,
        };

        Ok(())
    }

    /// Steps until the pc is one of the breakpoints or max_steps steps have been executed.
    ///
    /// At least one step is always executed, so this can continue from a breakpoint
    pub fn run_to_breakpoint(
        &mut self,
        breakpoints: &HashSet<usize>,
        max_steps: usize,
    ) -> CpuResult<RunOutcome> {
        let mut steps = 0;
        while steps < max_steps {
            self.step()?;
            steps += 1;

            if breakpoints.contains(&self.pc) {
                debug!("hit breakpoint {} after {} steps", self.pc, steps);
                return Ok(RunOutcome::Breakpoint { pc: self.pc, steps });
            }
        }

        debug!("stopped after {} steps at pc {}", steps, self.pc);
        Ok(RunOutcome::StepLimit { steps })
    }

    pub fn ram(&self, address: Address) -> Word {
        self.ram[address % RAM_SIZE]
    }

    pub fn set_ram(&mut self, address: Address, value: Word) {
        self.ram[address % RAM_SIZE] = value;
    }

    pub fn read_ram_word(&self, address: Address, base: DisplayBase) -> String {
        format_word(self.ram(address), base)
    }

    pub fn rom(&self) -> &[u16] {
        &self.rom
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a,
            d: self.d,
            pc: self.pc,
        }
    }
}

// UI interaction
impl Computer {
    pub fn set_input_key(&mut self, key: Word) {
        self.ram[KBD] = key;
    }

    pub fn display(&self) -> &[Word] {
        &self.ram[SCREEN_START..=SCREEN_END]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hack::assembler::assemble;
    use crate::parse::assembly::parse_asm;

    fn load(src: &str) -> Computer {
        let program = assemble(&parse_asm(src).unwrap()).unwrap();
        Computer::new(&program.words)
    }

    #[test]
    fn test_a_then_c_instruction() {
        let mut computer = load("@5\nD=A");

        computer.step().unwrap();
        assert_eq!(Registers { a: 5, d: 0, pc: 1 }, computer.registers());

        computer.step().unwrap();
        assert_eq!(Registers { a: 5, d: 5, pc: 2 }, computer.registers());
    }

    #[test]
    fn test_sum_1_to_100() {
        let src = include_str!("../../../res/tests/Sum.asm");
        let mut computer = load(src);
        for _ in 0..10000 {
            computer.step().unwrap();
        }

        assert_eq!(5050, computer.ram(17));
    }

    #[test]
    fn test_jumps() {
        // every jump with a negative, zero and positive value
        for (jump, taken) in [
            ("JGT", [false, false, true]),
            ("JEQ", [false, true, false]),
            ("JGE", [false, true, true]),
            ("JLT", [true, false, false]),
            ("JNE", [true, false, true]),
            ("JLE", [true, true, false]),
            ("JMP", [true, true, true]),
        ] {
            for (comp, taken) in ["-1", "0", "1"].into_iter().zip(taken) {
                let mut computer = load(&format!("@100\n{};{}", comp, jump));
                computer.step().unwrap();
                computer.step().unwrap();
                let expected = if taken { 100 } else { 2 };
                assert_eq!(expected, computer.pc(), "{};{}", comp, jump);
            }
        }
    }

    #[test]
    fn test_m_uses_the_old_address() {
        let mut computer = load("@7\nAM=A+1\n@9\nMD=A-1");
        computer.run_to_breakpoint(&HashSet::new(), 4).unwrap();
        // AM=A+1 writes to RAM[7], not RAM[8]
        assert_eq!(8, computer.ram(7));
        assert_eq!(0, computer.ram(8));
        assert_eq!(8, computer.ram(9));
        assert_eq!(8, computer.registers().d);
    }

    #[test]
    fn test_jumps_use_the_old_a() {
        let mut computer = load("@10\nD=A\n@20\nA=D;JMP");
        computer.run_to_breakpoint(&HashSet::new(), 4).unwrap();
        assert_eq!(Registers { a: 10, d: 10, pc: 20 }, computer.registers());

        let mut computer = load("@3\nD=A\n@7\nM=D\nAM=M-1;JNE");
        computer.run_to_breakpoint(&HashSet::new(), 5).unwrap();
        assert_eq!(2, computer.ram(7));
        assert_eq!(7, computer.pc());
    }

    #[test]
    fn test_addresses_wrap() {
        let mut computer = load("@32767\nA=A+1\nA=A+1\nM=-1");
        computer.run_to_breakpoint(&HashSet::new(), 4).unwrap();
        // A is 0x8001, which is address 1
        assert_eq!(-1, computer.ram(1));
    }

    #[test]
    fn test_run_to_breakpoint() {
        let mut computer = load("(LOOP)\n@LOOP\n0;JMP");
        let breakpoints = HashSet::from([0]);

        assert_eq!(
            Ok(RunOutcome::Breakpoint { pc: 0, steps: 2 }),
            computer.run_to_breakpoint(&breakpoints, 100)
        );
        // continues from the breakpoint instead of stopping immediately
        assert_eq!(
            Ok(RunOutcome::Breakpoint { pc: 0, steps: 2 }),
            computer.run_to_breakpoint(&breakpoints, 100)
        );
        assert_eq!(
            Ok(RunOutcome::StepLimit { steps: 7 }),
            computer.run_to_breakpoint(&HashSet::new(), 7)
        );
        assert_eq!(
            Ok(RunOutcome::StepLimit { steps: 0 }),
            computer.run_to_breakpoint(&breakpoints, 0)
        );
    }

    #[test]
    fn test_pc_out_of_bounds() {
        let mut computer = load("@32767\n0;JMP");
        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(32767, computer.pc());
        // rom[32767] is zero, @0
        computer.step().unwrap();
        assert_eq!(
            Err(EmulatorFault::ProgramCounterOutOfBounds(32768)),
            computer.step()
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut computer = load("@5\nD=A\n@3\nM=D");
        computer.run_to_breakpoint(&HashSet::new(), 4).unwrap();
        assert_eq!(5, computer.ram(3));

        computer.reset(&[0b1110111111010000]);
        assert_eq!(Registers { a: 0, d: 0, pc: 0 }, computer.registers());
        assert_eq!(0, computer.ram(3));
        assert_eq!(0, computer.rom()[1]);
        computer.step().unwrap();
        assert_eq!(1, computer.registers().d);
    }

    #[test]
    fn test_keyboard_and_screen() {
        let mut computer = load("@KBD\nD=M\n@SCREEN\nM=D");
        computer.set_input_key(65);
        computer.run_to_breakpoint(&HashSet::new(), 4).unwrap();
        assert_eq!(65, computer.display()[0]);
        assert_eq!(8192, computer.display().len());
    }

    #[test]
    fn test_format_word() {
        assert_eq!("-2", format_word(-2, DisplayBase::Decimal));
        assert_eq!("0000000000000101", format_word(5, DisplayBase::Binary));
        assert_eq!(
            "1111 1111 1111 1110",
            format_word(-2, DisplayBase::GroupedBinary)
        );
    }
}
