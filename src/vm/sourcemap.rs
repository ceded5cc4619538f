use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
pub struct VmCommandId {
    pub filename: String,
    pub vm_command_idx: usize,
}

impl VmCommandId {
    pub fn new(filename: impl Into<String>, vm_command_idx: usize) -> Self {
        Self {
            filename: filename.into(),
            vm_command_idx,
        }
    }
}

/// Vm command <-> assembly instruction relations of one translated program.
///
/// Instructions that don't belong to any command (the bootstrap code) map to None
#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize)]
pub struct VmSourceMap {
    pub asm_instruction_idx_to_vm_cmd: Vec<Option<VmCommandId>>,
    pub vm_filename_and_idx_to_asm_instruction_idxs: BTreeMap<String, Vec<Vec<usize>>>,
}

impl VmSourceMap {
    /// Records the next assembly instruction
    pub fn record(&mut self, command: Option<&VmCommandId>) {
        let asm_idx = self.asm_instruction_idx_to_vm_cmd.len();
        self.asm_instruction_idx_to_vm_cmd.push(command.cloned());

        if let Some(command) = command {
            let by_idx = self
                .vm_filename_and_idx_to_asm_instruction_idxs
                .entry(command.filename.clone())
                .or_default();
            if by_idx.len() <= command.vm_command_idx {
                by_idx.resize(command.vm_command_idx + 1, Vec::new());
            }
            by_idx[command.vm_command_idx].push(asm_idx);
        }
    }

    pub fn vm_command_of(&self, asm_idx: usize) -> Option<&VmCommandId> {
        self.asm_instruction_idx_to_vm_cmd.get(asm_idx)?.as_ref()
    }

    pub fn asm_instruction_idxs(&self, filename: &str, vm_command_idx: usize) -> &[usize] {
        self.vm_filename_and_idx_to_asm_instruction_idxs
            .get(filename)
            .and_then(|by_idx| by_idx.get(vm_command_idx))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
