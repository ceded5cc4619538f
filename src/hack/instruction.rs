use crate::definitions::MAX_CONSTANT;
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize)]
pub enum Register {
    A,
    D,
    M,
}

impl TryFrom<&str> for Register {
    type Error = ();
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "A" => Ok(Register::A),
            "D" => Ok(Register::D),
            "M" => Ok(Register::M),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::D => write!(f, "D"),
            Self::M => write!(f, "M"),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize)]
pub enum Computation {
    /// 0
    ConstZero,
    /// 1
    ConstOne,
    /// -1
    ConstNegOne,

    /// R
    UnaryNone(Register),
    /// !R
    UnaryBoolNeg(Register),
    /// -R
    UnaryIntNeg(Register),

    /// R + 1
    BinaryInc(Register),
    /// R - 1
    BinaryDec(Register),
    /// R1 + R2
    BinaryAdd(Register, Register),
    /// R1 - R2
    BinarySub(Register, Register),
    /// R1 & R2
    BinaryAnd(Register, Register),
    /// R1 | R2
    BinaryOr(Register, Register),
}

// the a bit selects M instead of A as the second alu input
fn a_bit(register: Register) -> u16 {
    if register == Register::M {
        1
    } else {
        0
    }
}

impl Computation {
    /// The hardware only knows the D-first form of the commutative operations
    pub fn canonical(self) -> Self {
        use Register::D;
        match self {
            Self::BinaryAdd(x, D) if x != D => Self::BinaryAdd(D, x),
            Self::BinaryAnd(x, D) if x != D => Self::BinaryAnd(D, x),
            Self::BinaryOr(x, D) if x != D => Self::BinaryOr(D, x),
            other => other,
        }
    }

    /// The 7 bits `a c1 c2 c3 c4 c5 c6`, or None if the alu can't compute this
    pub fn encode(&self) -> Option<u16> {
        use Computation::*;
        use Register::D;

        let (a, bits) = match self.canonical() {
            ConstZero => (0, 0b101010),
            ConstOne => (0, 0b111111),
            ConstNegOne => (0, 0b111010),
            UnaryNone(D) => (0, 0b001100),
            UnaryNone(x) => (a_bit(x), 0b110000),
            UnaryBoolNeg(D) => (0, 0b001101),
            UnaryBoolNeg(x) => (a_bit(x), 0b110001),
            UnaryIntNeg(D) => (0, 0b001111),
            UnaryIntNeg(x) => (a_bit(x), 0b110011),
            BinaryInc(D) => (0, 0b011111),
            BinaryInc(x) => (a_bit(x), 0b110111),
            BinaryDec(D) => (0, 0b001110),
            BinaryDec(x) => (a_bit(x), 0b110010),
            BinaryAdd(D, x) if x != D => (a_bit(x), 0b000010),
            BinarySub(D, x) if x != D => (a_bit(x), 0b010011),
            BinarySub(x, D) if x != D => (a_bit(x), 0b000111),
            BinaryAnd(D, x) if x != D => (a_bit(x), 0b000000),
            BinaryOr(D, x) if x != D => (a_bit(x), 0b010101),
            _ => return None,
        };

        Some(a << 6 | bits)
    }

    pub fn decode(bits: u16) -> Option<Self> {
        COMPUTATIONS.get(&(bits & 0b111_1111)).copied()
    }
}

lazy_static! {
    static ref COMPUTATIONS: HashMap<u16, Computation> = {
        use Computation::*;
        use Register::*;

        let mut all = vec![ConstZero, ConstOne, ConstNegOne];
        for x in [A, D, M] {
            all.extend([
                UnaryNone(x),
                UnaryBoolNeg(x),
                UnaryIntNeg(x),
                BinaryInc(x),
                BinaryDec(x),
            ]);
        }
        for x in [A, M] {
            all.extend([
                BinaryAdd(D, x),
                BinarySub(D, x),
                BinarySub(x, D),
                BinaryAnd(D, x),
                BinaryOr(D, x),
            ]);
        }

        all.into_iter()
            .filter_map(|comp| comp.encode().map(|bits| (bits, comp)))
            .collect()
    };
}

impl fmt::Display for Computation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConstZero => write!(f, "0"),
            Self::ConstOne => write!(f, "1"),
            Self::ConstNegOne => write!(f, "-1"),
            Self::UnaryNone(r) => write!(f, "{}", r),
            Self::UnaryBoolNeg(r) => write!(f, "!{}", r),
            Self::UnaryIntNeg(r) => write!(f, "-{}", r),
            Self::BinaryInc(r) => write!(f, "{}+1", r),
            Self::BinaryDec(r) => write!(f, "{}-1", r),
            Self::BinaryAdd(l, r) => write!(f, "{}+{}", l, r),
            Self::BinarySub(l, r) => write!(f, "{}-{}", l, r),
            Self::BinaryAnd(l, r) => write!(f, "{}&{}", l, r),
            Self::BinaryOr(l, r) => write!(f, "{}|{}", l, r),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Default, Serialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Destination {
    #[default]
    None,
    A,
    D,
    M,
    AD,
    AM,
    DM,
    ADM,
}

impl Destination {
    /// return the destination as a bool tuple (a, d, m)
    pub fn as_bools(&self) -> (bool, bool, bool) {
        match self {
            Self::None => (false, false, false),
            Self::A => (true, false, false),
            Self::D => (false, true, false),
            Self::M => (false, false, true),
            Self::AD => (true, true, false),
            Self::AM => (true, false, true),
            Self::DM => (false, true, true),
            Self::ADM => (true, true, true),
        }
    }

    fn from_bools(bools: (bool, bool, bool)) -> Self {
        match bools {
            (false, false, false) => Self::None,
            (false, false, true) => Self::M,
            (false, true, false) => Self::D,
            (false, true, true) => Self::DM,
            (true, false, false) => Self::A,
            (true, false, true) => Self::AM,
            (true, true, false) => Self::AD,
            (true, true, true) => Self::ADM,
        }
    }

    /// the bits `d1 d2 d3`
    pub fn encode(&self) -> u16 {
        let (a, d, m) = self.as_bools();
        (a as u16) << 2 | (d as u16) << 1 | m as u16
    }

    pub fn decode(bits: u16) -> Self {
        Self::from_bools((bits & 0b100 != 0, bits & 0b010 != 0, bits & 0b001 != 0))
    }
}

impl TryFrom<&str> for Destination {
    type Error = ();
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut a = false;
        let mut d = false;
        let mut m = false;
        for c in s.chars() {
            match c {
                'A' => a = true,
                'D' => d = true,
                'M' => m = true,
                _ => return Err(()),
            }
        }

        Ok(Self::from_bools((a, d, m)))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (a, d, m) = self.as_bools();
        for (set, name) in [(a, "A"), (d, "D"), (m, "M")] {
            if set {
                f.write_str(name)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Default, Serialize)]
pub enum Jump {
    #[default]
    Next,
    Gt,
    Eq,
    Ge,
    Lt,
    Ne,
    Le,
    Unconditional,
}

const JUMPS: [Jump; 8] = [
    Jump::Next,
    Jump::Gt,
    Jump::Eq,
    Jump::Ge,
    Jump::Lt,
    Jump::Ne,
    Jump::Le,
    Jump::Unconditional,
];

impl Jump {
    /// the bits `j1 j2 j3`
    pub fn encode(&self) -> u16 {
        JUMPS.iter().position(|j| j == self).unwrap_or(0) as u16
    }

    pub fn decode(bits: u16) -> Self {
        JUMPS[(bits & 0b111) as usize]
    }

    pub fn mnemonic(&self) -> Option<&'static str> {
        match self {
            Self::Next => None,
            Self::Gt => Some("JGT"),
            Self::Eq => Some("JEQ"),
            Self::Ge => Some("JGE"),
            Self::Lt => Some("JLT"),
            Self::Ne => Some("JNE"),
            Self::Le => Some("JLE"),
            Self::Unconditional => Some("JMP"),
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        JUMPS.iter().copied().find(|j| j.mnemonic() == Some(s))
    }
}

fn fmt_c(f: &mut fmt::Formatter, dest: &Destination, comp: &Computation, jump: &Jump) -> fmt::Result {
    if *dest != Destination::None {
        write!(f, "{}=", dest)?;
    }
    write!(f, "{}", comp)?;
    if let Some(jump) = jump.mnemonic() {
        write!(f, ";{}", jump)?;
    }
    Ok(())
}

/// A resolved instruction, exactly what a single ROM word can hold
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
pub enum Instruction {
    /// The A-instruction is used to set the A register to a 15-bit value:
    A(u16),
    C(Destination, Computation, Jump),
}

const C_PREFIX: u16 = 0b111 << 13;

impl Instruction {
    /// None for constants above 15 bits and computations the alu doesn't support
    pub fn encode(&self) -> Option<u16> {
        match self {
            Self::A(value) if *value <= MAX_CONSTANT => Some(*value),
            Self::A(_) => None,
            Self::C(dest, comp, jump) => {
                Some(C_PREFIX | comp.encode()? << 6 | dest.encode() << 3 | jump.encode())
            }
        }
    }

    /// None if the word is a C-instruction with a computation that has no mnemonic
    pub fn decode(word: u16) -> Option<Self> {
        if word & 0x8000 == 0 {
            return Some(Self::A(word));
        }

        let comp = Computation::decode(word >> 6)?;
        let dest = Destination::decode(word >> 3);
        let jump = Jump::decode(word);
        Some(Self::C(dest, comp, jump))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::A(value) => write!(f, "@{}", value),
            Self::C(dest, comp, jump) => fmt_c(f, dest, comp, jump),
        }
    }
}

/// The operand of an A-instruction before symbol resolution
#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub enum AValue {
    Constant(u16),
    /// a predefined symbol, a label or a variable, whichever exists
    Symbol(String),
    /// has to be defined by a label somewhere in the program
    Label(String),
}

impl AValue {
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(name.into())
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub enum AsmInstruction {
    A(AValue),
    C(Destination, Computation, Jump),
    /// a (LABEL) pseudo instruction, which doesn't occupy a ROM address
    Label(String),
}

impl AsmInstruction {
    pub fn constant(value: u16) -> Self {
        Self::A(AValue::Constant(value))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::A(AValue::symbol(name))
    }

    pub fn label_ref(name: impl Into<String>) -> Self {
        Self::A(AValue::label(name))
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(name.into())
    }

    pub fn c(dest: Destination, comp: Computation, jump: Jump) -> Self {
        Self::C(dest, comp, jump)
    }
}

impl fmt::Display for AsmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::A(AValue::Constant(value)) => write!(f, "@{}", value),
            Self::A(AValue::Symbol(name) | AValue::Label(name)) => write!(f, "@{}", name),
            Self::C(dest, comp, jump) => fmt_c(f, dest, comp, jump),
            Self::Label(name) => write!(f, "({})", name),
        }
    }
}

/// Renders instructions the way they would appear in a .asm file
pub fn to_asm_text(instructions: &[AsmInstruction]) -> String {
    let mut text = String::new();
    for instruction in instructions {
        text.push_str(&instruction.to_string());
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use Register::*;

    #[test]
    fn test_encode_known_words() {
        // D=A
        assert_eq!(
            Some(0b1110110000010000),
            Instruction::C(Destination::D, Computation::UnaryNone(A), Jump::Next).encode()
        );
        // M=D+M
        assert_eq!(
            Some(0b1111000010001000),
            Instruction::C(Destination::M, Computation::BinaryAdd(D, M), Jump::Next).encode()
        );
        // 0;JMP
        assert_eq!(
            Some(0b1110101010000111),
            Instruction::C(Destination::None, Computation::ConstZero, Jump::Unconditional)
                .encode()
        );
        // AM=M-1
        assert_eq!(
            Some(0b1111110010101000),
            Instruction::C(Destination::AM, Computation::BinaryDec(M), Jump::Next).encode()
        );
        // D;JGT
        assert_eq!(
            Some(0b1110001100000001),
            Instruction::C(Destination::None, Computation::UnaryNone(D), Jump::Gt).encode()
        );
        assert_eq!(Some(32767), Instruction::A(32767).encode());
        assert_eq!(None, Instruction::A(32768).encode());
    }

    #[test]
    fn test_invalid_computations() {
        assert_eq!(None, Computation::BinaryAdd(A, M).encode());
        assert_eq!(None, Computation::BinarySub(D, D).encode());
        assert_eq!(None, Computation::BinaryOr(A, A).encode());
    }

    #[test]
    fn test_commutative_forms_encode_the_same() {
        assert_eq!(
            Computation::BinaryAdd(D, A).encode(),
            Computation::BinaryAdd(A, D).encode()
        );
        assert_eq!(
            Computation::BinaryAnd(D, M).encode(),
            Computation::BinaryAnd(M, D).encode()
        );
        assert_eq!(Computation::BinaryOr(D, M), Computation::BinaryOr(M, D).canonical());
        // subtraction is not commutative
        assert_ne!(
            Computation::BinarySub(D, A).encode(),
            Computation::BinarySub(A, D).encode()
        );
    }

    #[test]
    fn test_decode_encode_round_trip() {
        assert_eq!(28, COMPUTATIONS.len());

        for &comp in COMPUTATIONS.values() {
            for dest_bits in 0..8 {
                for jump_bits in 0..8 {
                    let instruction = Instruction::C(
                        Destination::decode(dest_bits),
                        comp,
                        Jump::decode(jump_bits),
                    );
                    let word = instruction.encode().unwrap();
                    assert_eq!(Some(instruction), Instruction::decode(word));
                }
            }
        }

        for value in [0, 1, 16, 16384, 24576, 32767] {
            let word = Instruction::A(value).encode().unwrap();
            assert_eq!(Some(Instruction::A(value)), Instruction::decode(word));
        }
    }

    #[test]
    fn test_decode_unknown_computation() {
        // zx alone with f=and is not one of the 28 mnemonics
        assert_eq!(None, Instruction::decode(0b1110_1000_0000_0000));
    }

    #[test]
    fn test_display() {
        let instructions = vec![
            AsmInstruction::constant(5),
            AsmInstruction::label("LOOP"),
            AsmInstruction::symbol("SP"),
            AsmInstruction::c(Destination::AM, Computation::BinaryDec(M), Jump::Next),
            AsmInstruction::c(Destination::None, Computation::UnaryNone(D), Jump::Ne),
            AsmInstruction::c(Destination::M, Computation::ConstNegOne, Jump::Next),
        ];
        assert_eq!(
            "@5\n(LOOP)\n@SP\nAM=M-1\nD;JNE\nM=-1\n",
            to_asm_text(&instructions)
        );
    }
}
