// see the Hack architecture chapter of the book
pub const RAM_SIZE: usize = 32768;
pub const ROM_SIZE: usize = 32768;
pub const SCREEN_START: usize = 16384;
pub const SCREEN_END: usize = 24575;
pub const KBD: usize = 24576;

pub const SP: usize = 0;
pub const LCL: usize = 1;
pub const ARG: usize = 2;
pub const THIS: usize = 3;
pub const THAT: usize = 4;
pub const TEMP_START: usize = 5;
pub const TEMP_SIZE: usize = 8;
pub const POINTER_SIZE: usize = 2;

// scratch registers used by the vm translator
pub const R13: usize = 13;
pub const R14: usize = 14;

// a position in the ROM
pub type Symbol = u16;
// an address in the simulated RAM
pub type Address = usize;
// a register/memory-cell value in the hack architecture
pub type Word = i16;

pub const INIT_SP: Word = 256;
// new assembler variables are allocated from here on
pub const VARIABLE_START: Symbol = 16;

// the largest value an A-instruction can load
pub const MAX_CONSTANT: u16 = 32767;
// a call loads n_args + 5 as a constant
pub const MAX_ARGS: u16 = MAX_CONSTANT - 5;

pub const SCREEN_WIDTH: usize = 512;
pub const SCREEN_HEIGHT: usize = 256;
pub const BITS_PER_WORD: usize = 16;
pub const SCREEN_WIDTH_IN_WORDS: usize = SCREEN_WIDTH / BITS_PER_WORD;

pub const NEWLINE_KEY: Word = 128;
pub const BACKSPACE_KEY: Word = 129;
