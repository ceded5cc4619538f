use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone, Copy)]
pub enum EmulatorFault {
    #[error("program counter out of bounds: {0}")]
    ProgramCounterOutOfBounds(usize),
}
