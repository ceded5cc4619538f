use super::instruction::{AValue, AsmInstruction, Instruction};
use crate::definitions::{Symbol, ROM_SIZE};
use crate::parse::symbols::SymbolTable;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AssembleError {
    #[error("instruction {idx}: invalid instruction '{instruction}'")]
    InvalidInstruction { instruction: String, idx: usize },
    #[error("instruction {idx}: reference to the undefined label '{label}'")]
    UndefinedLabelReference { label: String, idx: usize },
    #[error("instruction {idx}: '{label}' is already defined")]
    DuplicateLabel { label: String, idx: usize },
    #[error("the program needs {size} words, but the rom only has {}", ROM_SIZE)]
    ProgramTooLarge { size: usize },
}

pub type AssembleResult<T> = Result<T, AssembleError>;

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct AssembledProgram {
    pub instructions: Vec<Instruction>,
    pub words: Vec<u16>,
    pub symbols: SymbolTable,
    /// the rom address of every input instruction, None for label pseudo instructions
    pub rom_addresses: Vec<Option<usize>>,
}

/// Assembles against the predefined symbols (SP, R0-R15, SCREEN, ...)
pub fn assemble(instructions: &[AsmInstruction]) -> AssembleResult<AssembledProgram> {
    assemble_with(instructions, SymbolTable::default())
}

pub fn assemble_with(
    instructions: &[AsmInstruction],
    mut symbols: SymbolTable,
) -> AssembleResult<AssembledProgram> {
    // first pass: find the addresses of all labels
    let mut rom_addresses = Vec::with_capacity(instructions.len());
    let mut address = 0;
    for (idx, instruction) in instructions.iter().enumerate() {
        if let AsmInstruction::Label(label) = instruction {
            if symbols.contains(label) {
                return Err(AssembleError::DuplicateLabel {
                    label: label.clone(),
                    idx,
                });
            }
            symbols.set(label.as_str(), address as Symbol);
            rom_addresses.push(None);
        } else {
            rom_addresses.push(Some(address));
            address += 1;
        }
    }

    if address > ROM_SIZE {
        return Err(AssembleError::ProgramTooLarge { size: address });
    }

    // second pass: resolve the symbols and encode everything
    let mut resolved = Vec::with_capacity(address);
    let mut words = Vec::with_capacity(address);
    for (idx, instruction) in instructions.iter().enumerate() {
        let instruction = match instruction {
            AsmInstruction::Label(_) => continue,
            AsmInstruction::A(AValue::Constant(value)) => Instruction::A(*value),
            AsmInstruction::A(AValue::Symbol(name)) => {
                Instruction::A(symbols.lookup_or_insert(name.as_str()))
            }
            AsmInstruction::A(AValue::Label(label)) => {
                let value = symbols.lookup(label).ok_or_else(|| {
                    AssembleError::UndefinedLabelReference {
                        label: label.clone(),
                        idx,
                    }
                })?;
                Instruction::A(value)
            }
            AsmInstruction::C(dest, comp, jump) => Instruction::C(*dest, comp.canonical(), *jump),
        };

        let word = instruction
            .encode()
            .ok_or_else(|| AssembleError::InvalidInstruction {
                instruction: instruction.to_string(),
                idx,
            })?;
        resolved.push(instruction);
        words.push(word);
    }

    log::trace!(
        "assembled {} instructions into {} words",
        instructions.len(),
        words.len()
    );

    Ok(AssembledProgram {
        instructions: resolved,
        words,
        symbols,
        rom_addresses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hack::instruction::{Computation, Destination, Jump, Register};
    use crate::parse::assembly::parse_asm;

    #[test]
    fn test_numeric_program() {
        let instructions = parse_asm("@2\nD=A\n@3\nD=D+A\n@0\nM=D").unwrap();
        let program = assemble_with(&instructions, SymbolTable::empty()).unwrap();

        assert_eq!(
            program.words,
            vec![
                0b0000000000000010,
                0b1110110000010000,
                0b0000000000000011,
                0b1110000010010000,
                0b0000000000000000,
                0b1110001100001000,
            ]
        );
        let a_count = program
            .instructions
            .iter()
            .filter(|i| matches!(i, Instruction::A(_)))
            .count();
        assert_eq!(3, a_count);
        assert_eq!(SymbolTable::empty(), program.symbols);
    }

    #[test]
    fn test_labels_and_variables() {
        let src = r#"
            @i
            M=1
            @sum
            M=0
            (LOOP)
            @i
            D=M
            @100
            D=D-A
            @END
            D;JGT
            @i
            D=M
            @sum
            M=D+M
            @i
            M=M+1
            @LOOP
            0;JMP
            (END)
            @END
            0;JMP"#;

        let instructions = parse_asm(src).unwrap();
        let program = assemble(&instructions).unwrap();

        assert_eq!(20, program.words.len());
        assert_eq!(Some(16), program.symbols.lookup("i"));
        assert_eq!(Some(17), program.symbols.lookup("sum"));
        assert_eq!(Some(4), program.symbols.lookup("LOOP"));
        assert_eq!(Some(18), program.symbols.lookup("END"));

        assert_eq!(Instruction::A(18), program.instructions[8]);
        assert_eq!(Instruction::A(4), program.instructions[16]);
        assert_eq!(None, program.rom_addresses[4]);
        assert_eq!(Some(4), program.rom_addresses[5]);
    }

    #[test]
    fn test_assembling_is_deterministic() {
        let src = "@x\nM=0\n(A)\n@y\nM=M+1\n@z\nD=M\n@A\n0;JMP\n@SCREEN\nM=-1";
        let instructions = parse_asm(src).unwrap();
        let first = assemble(&instructions).unwrap();
        let second = assemble(&instructions).unwrap();
        assert_eq!(first.words, second.words);
        assert_eq!(first.symbols, second.symbols);
    }

    #[test]
    fn test_errors() {
        let duplicate = vec![AsmInstruction::label("X"), AsmInstruction::label("X")];
        assert_eq!(
            assemble(&duplicate),
            Err(AssembleError::DuplicateLabel {
                label: "X".to_owned(),
                idx: 1
            })
        );

        let undefined = vec![AsmInstruction::constant(1), AsmInstruction::label_ref("nowhere")];
        assert_eq!(
            assemble(&undefined),
            Err(AssembleError::UndefinedLabelReference {
                label: "nowhere".to_owned(),
                idx: 1
            })
        );

        let invalid = vec![AsmInstruction::c(
            Destination::D,
            Computation::BinaryAdd(Register::A, Register::M),
            Jump::Next,
        )];
        assert_eq!(
            assemble(&invalid),
            Err(AssembleError::InvalidInstruction {
                instruction: "D=A+M".to_owned(),
                idx: 0
            })
        );

        let too_large = vec![AsmInstruction::constant(0); ROM_SIZE + 1];
        assert_eq!(
            assemble(&too_large),
            Err(AssembleError::ProgramTooLarge { size: ROM_SIZE + 1 })
        );
    }
}
