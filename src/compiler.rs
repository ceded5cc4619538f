use crate::hack::assembler::{assemble, AssembleError, AssembledProgram};
use crate::jack::codegen::{compile_class, CodegenError, Signatures};
use crate::jack::sourcemap::{CodegenSourceMap, ParserSourceMap};
use crate::parse::assembly::{parse_asm, AsmParseError};
use crate::parse::bytecode::{parse_vm, VmParseError};
use crate::parse::jack::ast::Ast;
use crate::parse::jack::token::Token;
use crate::parse::jack::{parse_class, tokenize, LexError, ParseError};
use crate::vm::command::Command;
use crate::vm::translator::{translate, TranslatedProgram, VmFile};
use log::trace;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// the file name, the module name is the part before the extension
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// `Main` for `Main.jack` and `dir/Main.vm`
    pub fn module_name(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }
}

/// How far the pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mode {
    Tokens,
    Vm,
    Assembly,
    Binary,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown mode '{0}', expected one of tokens, vm, asm, hack")]
pub struct UnknownMode(String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tokens" => Ok(Self::Tokens),
            "vm" => Ok(Self::Vm),
            "asm" => Ok(Self::Assembly),
            "hack" => Ok(Self::Binary),
            _ => Err(UnknownMode(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub mode: Mode,
    /// set SP to 256 and call Sys.init before anything else
    pub bootstrap: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Binary,
            bootstrap: true,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StageError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    #[error(transparent)]
    VmParse(#[from] VmParseError),
    #[error(transparent)]
    AsmParse(#[from] AsmParseError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("{file}: {error}")]
pub struct CompileError {
    pub file: String,
    #[source]
    pub error: StageError,
}

impl CompileError {
    pub fn new(file: impl Into<String>, error: impl Into<StageError>) -> Self {
        Self {
            file: file.into(),
            error: error.into(),
        }
    }
}

/// Every error of a failed run, at most one per file
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CompileErrors(pub Vec<CompileError>);

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

impl From<CompileError> for CompileErrors {
    fn from(error: CompileError) -> Self {
        Self(vec![error])
    }
}

pub type CompileResult<T> = Result<T, CompileErrors>;

/// Everything the pipeline produced for a single file.
///
/// Files read as vm code have no tokens, ast or sourcemaps of their own
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompiledFile {
    pub name: String,
    pub module: String,
    pub tokens: Vec<Token>,
    pub ast: Option<Ast>,
    pub parser_sourcemap: Option<ParserSourceMap>,
    pub commands: Vec<Command>,
    pub codegen_sourcemap: Option<CodegenSourceMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileOutput {
    pub files: Vec<CompiledFile>,
    /// Mode::Assembly and above
    pub translated: Option<TranslatedProgram>,
    /// Mode::Binary only
    pub program: Option<AssembledProgram>,
}

/// Compiles jack classes as far as the mode says.
///
/// A failing file doesn't stop the other files, but nothing is translated when any of them fails
pub fn compile(sources: &[SourceFile], options: &CompileOptions) -> CompileResult<CompileOutput> {
    let mut errors = Vec::new();
    let mut files = Vec::with_capacity(sources.len());

    for source in sources {
        let tokens = match tokenize(&source.content) {
            Ok(tokens) => tokens,
            Err(error) => {
                errors.push(CompileError::new(&source.name, error));
                continue;
            }
        };
        trace!("{}: {} tokens", source.name, tokens.len());

        let mut file = CompiledFile {
            name: source.name.clone(),
            module: source.module_name().to_owned(),
            tokens,
            ..CompiledFile::default()
        };

        if options.mode > Mode::Tokens {
            match parse_class(&file.tokens) {
                Ok(ast) => {
                    file.parser_sourcemap = Some(ParserSourceMap::new(&ast, file.tokens.len()));
                    file.ast = Some(ast);
                }
                Err(error) => {
                    errors.push(CompileError::new(&source.name, error));
                    continue;
                }
            }
        }
        files.push(file);
    }

    if options.mode == Mode::Tokens {
        return finish(errors, CompileOutput {
            files,
            ..CompileOutput::default()
        });
    }

    let mut signatures = Signatures::default();
    for file in &files {
        if let Some(ast) = &file.ast {
            if let Err(error) = signatures.add_class(ast) {
                errors.push(CompileError::new(&file.name, error));
            }
        }
    }

    for file in &mut files {
        let Some(ast) = &file.ast else {
            continue;
        };
        match compile_class(ast, &signatures) {
            Ok(compiled) => {
                file.module = compiled.class_name;
                file.commands = compiled.commands;
                file.codegen_sourcemap = Some(compiled.sourcemap);
            }
            Err(error) => errors.push(CompileError::new(&file.name, error)),
        }
    }

    if !errors.is_empty() || options.mode == Mode::Vm {
        return finish(errors, CompileOutput {
            files,
            ..CompileOutput::default()
        });
    }

    lower(files, options)
}

/// Translates textual vm files as far as the mode says. Mode::Tokens behaves like Mode::Vm
pub fn translate_vm(sources: &[SourceFile], options: &CompileOptions) -> CompileResult<CompileOutput> {
    let mut errors = Vec::new();
    let mut files = Vec::with_capacity(sources.len());

    for source in sources {
        match parse_vm(&source.content) {
            Ok(commands) => files.push(CompiledFile {
                name: source.name.clone(),
                module: source.module_name().to_owned(),
                commands,
                ..CompiledFile::default()
            }),
            Err(error) => errors.push(CompileError::new(&source.name, error)),
        }
    }

    if !errors.is_empty() || options.mode <= Mode::Vm {
        return finish(errors, CompileOutput {
            files,
            ..CompileOutput::default()
        });
    }

    lower(files, options)
}

/// Assembles one textual assembly file
pub fn assemble_source(source: &SourceFile) -> Result<AssembledProgram, CompileError> {
    let instructions =
        parse_asm(&source.content).map_err(|error| CompileError::new(&source.name, error))?;
    assemble(&instructions).map_err(|error| CompileError::new(&source.name, error))
}

fn finish(errors: Vec<CompileError>, output: CompileOutput) -> CompileResult<CompileOutput> {
    if errors.is_empty() {
        Ok(output)
    } else {
        Err(CompileErrors(errors))
    }
}

fn lower(files: Vec<CompiledFile>, options: &CompileOptions) -> CompileResult<CompileOutput> {
    let vm_files: Vec<_> = files
        .iter()
        .map(|file| VmFile::new(file.module.as_str(), file.commands.clone()))
        .collect();
    let translated = translate(&vm_files, options.bootstrap);
    trace!(
        "translated into {} assembly instructions",
        translated.instructions.len()
    );

    let program = if options.mode == Mode::Binary {
        let program = assemble(&translated.instructions).map_err(|error| {
            let file = files
                .iter()
                .map(|file| file.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            CompileError::new(file, error)
        })?;
        Some(program)
    } else {
        None
    };

    Ok(CompileOutput {
        files,
        translated: Some(translated),
        program,
    })
}
