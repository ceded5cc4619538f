use super::call_graph::CallGraph;
use super::command::{Command, Segment};
use super::sourcemap::{VmCommandId, VmSourceMap};
use crate::definitions::{ARG, INIT_SP, LCL, R13, R14, SP, TEMP_START, THAT, THIS};
use crate::hack::instruction::{AValue, AsmInstruction, Computation, Destination, Jump, Register};
use log::{debug, warn};
use std::collections::HashSet;

use Computation::*;
use Register::{A, D, M};

/// One vm file. The name is the module part of static symbols (`Main` for `Main.3`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmFile {
    pub name: String,
    pub commands: Vec<Command>,
}

impl VmFile {
    pub fn new(name: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedProgram {
    pub instructions: Vec<AsmInstruction>,
    pub sourcemap: VmSourceMap,
}

const SYS_INIT: &str = "Sys.init";
const HALT: &str = "$halt";

/// Translates all files into one assembly program.
///
/// With bootstrap the program starts by setting SP to 256 and calling Sys.init. When Sys.init
/// returns, the program ends up in an endless loop. Functions that Sys.init can't reach are
/// left out, their commands keep their indices but map to no instructions
pub fn translate(files: &[VmFile], bootstrap: bool) -> TranslatedProgram {
    let defined_functions: HashSet<&str> = files
        .iter()
        .flat_map(|file| file.commands.iter())
        .filter_map(|command| match command {
            Command::Function { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();

    let live_functions = (bootstrap && defined_functions.contains(SYS_INIT))
        .then(|| CallGraph::new(files).reachable_from(SYS_INIT));

    let mut translator = Translator {
        instructions: Vec::new(),
        sourcemap: VmSourceMap::default(),
        defined_functions,
        warned: HashSet::new(),
        current: None,
        function: String::new(),
        filename: String::new(),
        return_counter: 0,
        comparison_counter: 0,
    };

    if bootstrap {
        translator.bootstrap();
    }

    for file in files {
        translator.filename = file.name.clone();
        // commands before the first function are scoped to the file
        translator.function = file.name.clone();
        let mut live = true;
        for (idx, command) in file.commands.iter().enumerate() {
            if let Command::Function { name, .. } = command {
                live = live_functions
                    .as_ref()
                    .map_or(true, |functions| functions.contains(name));
                if !live {
                    debug!("{} is never called, leaving it out", name);
                }
            }
            if !live {
                continue;
            }
            translator.current = Some(VmCommandId::new(file.name.as_str(), idx));
            translator.command(command);
        }
    }

    debug!(
        "translated {} vm files into {} assembly instructions",
        files.len(),
        translator.instructions.len()
    );

    TranslatedProgram {
        instructions: translator.instructions,
        sourcemap: translator.sourcemap,
    }
}

struct Translator<'f> {
    instructions: Vec<AsmInstruction>,
    sourcemap: VmSourceMap,
    defined_functions: HashSet<&'f str>,
    warned: HashSet<String>,
    /// the command that is currently translated, None inside of the bootstrap code
    current: Option<VmCommandId>,
    function: String,
    filename: String,
    return_counter: usize,
    comparison_counter: usize,
}

impl<'f> Translator<'f> {
    fn emit(&mut self, instruction: AsmInstruction) {
        self.sourcemap.record(self.current.as_ref());
        self.instructions.push(instruction);
    }

    fn at_constant(&mut self, value: u16) {
        self.emit(AsmInstruction::constant(value));
    }

    fn at_address(&mut self, address: usize) {
        self.emit(AsmInstruction::constant(address as u16));
    }

    fn at_label(&mut self, label: impl Into<String>) {
        self.emit(AsmInstruction::label_ref(label));
    }

    fn assign(&mut self, dest: Destination, comp: Computation) {
        self.emit(AsmInstruction::c(dest, comp, Jump::Next));
    }

    fn jump(&mut self, comp: Computation, jump: Jump) {
        self.emit(AsmInstruction::c(Destination::None, comp, jump));
    }

    fn define_label(&mut self, label: impl Into<String>) {
        self.emit(AsmInstruction::label(label));
    }

    /// *SP = D; SP++
    fn push_d(&mut self) {
        self.at_address(SP);
        self.assign(Destination::M, BinaryInc(M));
        self.assign(Destination::A, BinaryDec(M));
        self.assign(Destination::M, UnaryNone(D));
    }

    /// SP--; D = *SP
    fn pop_d(&mut self) {
        self.at_address(SP);
        self.assign(Destination::AM, BinaryDec(M));
        self.assign(Destination::D, UnaryNone(M));
    }

    /// A = address of the top of the stack, without changing SP
    fn top(&mut self) {
        self.at_address(SP);
        self.assign(Destination::A, BinaryDec(M));
    }

    fn bootstrap(&mut self) {
        if !self.defined_functions.contains(SYS_INIT) {
            warn!("bootstrapping a program without {}", SYS_INIT);
        }

        self.at_constant(INIT_SP as u16);
        self.assign(Destination::D, UnaryNone(A));
        self.at_address(SP);
        self.assign(Destination::M, UnaryNone(D));

        self.call_with_return(SYS_INIT, 0, HALT.to_owned());
        self.at_label(HALT);
        self.jump(ConstZero, Jump::Unconditional);
    }

    fn command(&mut self, command: &Command) {
        match command {
            Command::Add => self.binary(BinaryAdd(D, M)),
            Command::Sub => self.binary(BinarySub(M, D)),
            Command::And => self.binary(BinaryAnd(D, M)),
            Command::Or => self.binary(BinaryOr(D, M)),
            Command::Neg => self.unary(UnaryIntNeg(M)),
            Command::Not => self.unary(UnaryBoolNeg(M)),
            Command::Eq => self.comparison(Jump::Eq),
            Command::Gt => self.comparison(Jump::Gt),
            Command::Lt => self.comparison(Jump::Lt),
            Command::Push { segment, index } => self.push(*segment, *index),
            Command::Pop { segment, index } => self.pop(*segment, *index),
            Command::Label { name } => {
                let label = self.scoped(name);
                self.define_label(label);
            }
            Command::Goto { label } => {
                let label = self.scoped(label);
                self.at_label(label);
                self.jump(ConstZero, Jump::Unconditional);
            }
            Command::IfGoto { label } => {
                let label = self.scoped(label);
                self.pop_d();
                self.at_label(label);
                self.jump(UnaryNone(D), Jump::Ne);
            }
            Command::Function { name, n_locals } => self.function(name, *n_locals),
            Command::Call { name, n_args } => {
                let return_label = format!("{}$ret.{}", self.function, self.return_counter);
                self.return_counter += 1;
                self.call_with_return(name, *n_args, return_label);
            }
            Command::Return => self.ret(),
        }
    }

    fn scoped(&self, label: &str) -> String {
        format!("{}${}", self.function, label)
    }

    fn binary(&mut self, comp: Computation) {
        self.pop_d();
        self.top();
        self.assign(Destination::M, comp);
    }

    fn unary(&mut self, comp: Computation) {
        self.top();
        self.assign(Destination::M, comp);
    }

    fn comparison(&mut self, jump: Jump) {
        let k = self.comparison_counter;
        self.comparison_counter += 1;
        let if_true = format!("{}$CMP_TRUE.{}", self.function, k);
        let end = format!("{}$CMP_END.{}", self.function, k);

        // D = x - y
        self.pop_d();
        self.top();
        self.assign(Destination::D, BinarySub(M, D));
        self.at_label(if_true.as_str());
        self.jump(UnaryNone(D), jump);

        self.top();
        self.assign(Destination::M, ConstZero);
        self.at_label(end.as_str());
        self.jump(ConstZero, Jump::Unconditional);

        self.define_label(if_true);
        self.top();
        self.assign(Destination::M, ConstNegOne);
        self.define_label(end);
    }

    fn static_symbol(&self, index: u16) -> String {
        format!("{}.{}", self.filename, index)
    }

    /// Leaves the address of segment[index] in A, but only for segments accessed through a
    /// base pointer (local, argument, this, that)
    fn pointer_segment_address(&mut self, base: usize, index: u16) {
        self.at_address(base);
        if index == 0 {
            self.assign(Destination::A, UnaryNone(M));
        } else {
            self.assign(Destination::D, UnaryNone(M));
            self.at_constant(index);
            self.assign(Destination::A, BinaryAdd(D, A));
        }
    }

    fn push(&mut self, segment: Segment, index: u16) {
        match segment {
            Segment::Constant => {
                self.at_constant(index);
                self.assign(Destination::D, UnaryNone(A));
            }
            Segment::Static => {
                let symbol = self.static_symbol(index);
                self.emit(AsmInstruction::symbol(symbol));
                self.assign(Destination::D, UnaryNone(M));
            }
            Segment::Temp | Segment::Pointer => {
                self.at_address(fixed_base(segment) + index as usize);
                self.assign(Destination::D, UnaryNone(M));
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                self.pointer_segment_address(pointer_base(segment), index);
                self.assign(Destination::D, UnaryNone(M));
            }
        }
        self.push_d();
    }

    fn pop(&mut self, segment: Segment, index: u16) {
        match segment {
            // nothing to store, just drop the value
            Segment::Constant => {
                self.at_address(SP);
                self.assign(Destination::M, BinaryDec(M));
            }
            Segment::Static => {
                self.pop_d();
                let symbol = self.static_symbol(index);
                self.emit(AsmInstruction::symbol(symbol));
                self.assign(Destination::M, UnaryNone(D));
            }
            Segment::Temp | Segment::Pointer => {
                self.pop_d();
                self.at_address(fixed_base(segment) + index as usize);
                self.assign(Destination::M, UnaryNone(D));
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                // R13 = segment + index
                self.at_address(pointer_base(segment));
                self.assign(Destination::D, UnaryNone(M));
                if index != 0 {
                    self.at_constant(index);
                    self.assign(Destination::D, BinaryAdd(D, A));
                }
                self.at_address(R13);
                self.assign(Destination::M, UnaryNone(D));

                self.pop_d();
                self.at_address(R13);
                self.assign(Destination::A, UnaryNone(M));
                self.assign(Destination::M, UnaryNone(D));
            }
        }
    }

    fn function(&mut self, name: &str, n_locals: u16) {
        self.function = name.to_owned();
        self.define_label(name);
        for _ in 0..n_locals {
            self.at_address(SP);
            self.assign(Destination::M, BinaryInc(M));
            self.assign(Destination::A, BinaryDec(M));
            self.assign(Destination::M, ConstZero);
        }
    }

    fn call_with_return(&mut self, name: &str, n_args: u16, return_label: String) {
        self.at_label(return_label.as_str());
        self.assign(Destination::D, UnaryNone(A));
        self.push_d();

        for pointer in [
            LCL,
            ARG,
            THIS,
            THAT,
        ] {
            self.at_address(pointer);
            self.assign(Destination::D, UnaryNone(M));
            self.push_d();
        }

        // ARG = SP - 5 - n_args
        self.at_address(SP);
        self.assign(Destination::D, UnaryNone(M));
        // too many arguments end up as a constant the assembler rejects
        self.at_constant(n_args.saturating_add(5));
        self.assign(Destination::D, BinarySub(D, A));
        self.at_address(ARG);
        self.assign(Destination::M, UnaryNone(D));

        // LCL = SP
        self.at_address(SP);
        self.assign(Destination::D, UnaryNone(M));
        self.at_address(LCL);
        self.assign(Destination::M, UnaryNone(D));

        if self.defined_functions.contains(name) {
            self.at_label(name);
        } else {
            if self.warned.insert(name.to_owned()) {
                warn!("call to the undefined function {}", name);
            }
            self.emit(AsmInstruction::A(AValue::symbol(name)));
        }
        self.jump(ConstZero, Jump::Unconditional);

        self.define_label(return_label);
    }

    fn ret(&mut self) {
        // R13 = frame = LCL
        self.at_address(LCL);
        self.assign(Destination::D, UnaryNone(M));
        self.at_address(R13);
        self.assign(Destination::M, UnaryNone(D));

        // R14 = *(frame - 5), before *ARG can overwrite it
        self.at_constant(5);
        self.assign(Destination::A, BinarySub(D, A));
        self.assign(Destination::D, UnaryNone(M));
        self.at_address(R14);
        self.assign(Destination::M, UnaryNone(D));

        // *ARG = pop()
        self.pop_d();
        self.at_address(ARG);
        self.assign(Destination::A, UnaryNone(M));
        self.assign(Destination::M, UnaryNone(D));

        // SP = ARG + 1
        self.at_address(ARG);
        self.assign(Destination::D, BinaryInc(M));
        self.at_address(SP);
        self.assign(Destination::M, UnaryNone(D));

        for pointer in [
            THAT,
            THIS,
            ARG,
            LCL,
        ] {
            self.at_address(R13);
            self.assign(Destination::AM, BinaryDec(M));
            self.assign(Destination::D, UnaryNone(M));
            self.at_address(pointer);
            self.assign(Destination::M, UnaryNone(D));
        }

        self.at_address(R14);
        self.assign(Destination::A, UnaryNone(M));
        self.jump(ConstZero, Jump::Unconditional);
    }
}

fn pointer_base(segment: Segment) -> usize {
    match segment {
        Segment::Local => LCL,
        Segment::Argument => ARG,
        Segment::This => THIS,
        _ => THAT,
    }
}

fn fixed_base(segment: Segment) -> usize {
    match segment {
        Segment::Pointer => THIS,
        _ => TEMP_START,
    }
}
