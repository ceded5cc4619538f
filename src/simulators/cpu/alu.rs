use crate::definitions::Word;

// the six control bits of a c-instruction, from bit 11 down to bit 6
const ZX: u16 = 0b100000;
const NX: u16 = 0b010000;
const ZY: u16 = 0b001000;
const NY: u16 = 0b000100;
const F: u16 = 0b000010;
const NO: u16 = 0b000001;

/// The Hack ALU. x is always D, y is either A or M.
///
/// Every combination of control bits computes something, not only the 28 documented ones
pub fn alu(x: Word, y: Word, control: u16) -> Word {
    let mut x = x;
    let mut y = y;

    if control & ZX != 0 {
        x = 0;
    }
    if control & NX != 0 {
        x = !x;
    }
    if control & ZY != 0 {
        y = 0;
    }
    if control & NY != 0 {
        y = !y;
    }

    let out = if control & F != 0 {
        x.wrapping_add(y)
    } else {
        x & y
    };

    if control & NO != 0 {
        !out
    } else {
        out
    }
}
