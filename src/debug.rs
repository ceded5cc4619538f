use crate::compiler::{compile, CompileErrors, CompileOptions, CompileOutput, CompileResult, Mode, SourceFile};
use crate::jack::sourcemap::{
    all_vm_command_idxs, token_range_of_vm_command, CodegenSourceMap, ParserSourceMap,
};
use crate::parse::jack::token::Token;
use crate::vm::command::Command;
use crate::vm::sourcemap::{VmCommandId, VmSourceMap};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDebugInfo {
    pub filename: String,
    pub tokens: Vec<Token>,
    pub vm_commands: Vec<Command>,
    pub parser_sourcemap: ParserSourceMap,
    pub codegen_sourcemap: CodegenSourceMap,
}

/// A read only snapshot of one compiled program for the debugger ui.
///
/// Files are keyed by module name, which is also how the vm sourcemap refers to them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugBundle {
    pub files: BTreeMap<String, FileDebugInfo>,
    /// assembly text, one entry per instruction including labels
    pub assembly: Vec<String>,
    pub vm_sourcemap: VmSourceMap,
    /// the rom address of each assembly instruction, None for labels
    pub rom_addresses: Vec<Option<usize>>,
    /// the inverse of rom_addresses
    pub rom_address_to_asm_instruction_idx: Vec<usize>,
    pub words: Vec<u16>,
}

/// Compiles the program all the way and collects everything the debugger needs
pub fn debug_bundle(sources: &[SourceFile], bootstrap: bool) -> CompileResult<DebugBundle> {
    let options = CompileOptions {
        mode: Mode::Binary,
        bootstrap,
    };
    let output = compile(sources, &options)?;
    DebugBundle::from_output(output).ok_or_else(|| CompileErrors(Vec::new()))
}

impl DebugBundle {
    /// None unless the output went through every stage
    pub fn from_output(output: CompileOutput) -> Option<Self> {
        let translated = output.translated?;
        let program = output.program?;

        let mut files = BTreeMap::new();
        for file in output.files {
            let info = FileDebugInfo {
                filename: file.name,
                tokens: file.tokens,
                vm_commands: file.commands,
                parser_sourcemap: file.parser_sourcemap.unwrap_or_default(),
                codegen_sourcemap: file.codegen_sourcemap.unwrap_or_default(),
            };
            files.insert(file.module, info);
        }

        let mut rom_address_to_asm_instruction_idx = vec![0; program.words.len()];
        for (asm_idx, address) in program.rom_addresses.iter().enumerate() {
            if let Some(address) = address {
                rom_address_to_asm_instruction_idx[*address] = asm_idx;
            }
        }

        Some(Self {
            files,
            assembly: translated
                .instructions
                .iter()
                .map(ToString::to_string)
                .collect(),
            vm_sourcemap: translated.sourcemap,
            rom_addresses: program.rom_addresses,
            rom_address_to_asm_instruction_idx,
            words: program.words,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// The vm commands of the innermost node around the token that emitted any code at all
    pub fn vm_commands_of_token(&self, module: &str, token_idx: usize) -> Vec<usize> {
        let Some(file) = self.files.get(module) else {
            return Vec::new();
        };
        let Some(nodes) = file.parser_sourcemap.token_idx_to_jack_node_idxs.get(token_idx) else {
            return Vec::new();
        };

        nodes
            .iter()
            .rev()
            .map(|&node| all_vm_command_idxs(&file.parser_sourcemap, &file.codegen_sourcemap, node))
            .find(|commands| !commands.is_empty())
            .unwrap_or_default()
    }

    pub fn token_range_of_vm_command(&self, module: &str, vm_command_idx: usize) -> Option<Range<usize>> {
        let file = self.files.get(module)?;
        token_range_of_vm_command(&file.parser_sourcemap, &file.codegen_sourcemap, vm_command_idx)
    }

    pub fn asm_instructions_of_vm_command(&self, module: &str, vm_command_idx: usize) -> &[usize] {
        self.vm_sourcemap.asm_instruction_idxs(module, vm_command_idx)
    }

    /// The rom addresses to break on for a token, sorted
    pub fn rom_addresses_of_token(&self, module: &str, token_idx: usize) -> Vec<usize> {
        let addresses: BTreeSet<_> = self
            .vm_commands_of_token(module, token_idx)
            .into_iter()
            .flat_map(|vm_idx| self.asm_instructions_of_vm_command(module, vm_idx))
            .filter_map(|&asm_idx| self.rom_addresses.get(asm_idx).copied().flatten())
            .collect();
        addresses.into_iter().collect()
    }

    /// The vm command the instruction at a rom address was generated for, None inside of the
    /// bootstrap code or outside of the program
    pub fn vm_command_of_rom_address(&self, address: usize) -> Option<&VmCommandId> {
        let asm_idx = *self.rom_address_to_asm_instruction_idx.get(address)?;
        self.vm_sourcemap.vm_command_of(asm_idx)
    }

    /// The source token range that produced the instruction at a rom address
    pub fn token_range_of_rom_address(&self, address: usize) -> Option<(&str, Range<usize>)> {
        let command = self.vm_command_of_rom_address(address)?;
        let range = self.token_range_of_vm_command(&command.filename, command.vm_command_idx)?;
        Some((command.filename.as_str(), range))
    }
}
