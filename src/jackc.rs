use hack_toolchain::hack::instruction::to_asm_text;
use hack_toolchain::hack::rom::{load_hack, rom_literal};
use hack_toolchain::vm::command::to_vm_text;
use hack_toolchain::{
    assemble_source, compile, debug_bundle, translate_vm, CompileOptions, CompileOutput, Mode,
    SourceFile,
};

use clap::{arg, command, value_parser, ArgAction, ArgMatches, Command};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;
use walkdir::WalkDir;

fn fail(message: impl Display) -> ! {
    eprintln!("error: {}", message);
    exit(1);
}

/// Every file with the extension, either the path itself or anything below it
fn find_files(paths: &[PathBuf], extension: &str) -> Vec<SourceFile> {
    let mut files = Vec::new();

    for path in paths {
        let mut found: Vec<_> = WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| !e.file_type().is_dir())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|x| x.to_str()) == Some(extension))
            .collect();
        // walkdir doesn't sort, but the output should not depend on the file system
        found.sort();

        for path in found {
            let content = fs::read_to_string(&path)
                .unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e)));
            files.push(SourceFile::new(path.display().to_string(), content));
        }
    }

    if files.is_empty() {
        fail(format!("no .{} files found", extension));
    }
    files
}

fn write_output(output: Option<&PathBuf>, content: &str) {
    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, content) {
                fail(format!("{}: {}", path.display(), e));
            }
        }
        None => println!("{}", content),
    }
}

fn render(output: &CompileOutput, mode: Mode) -> String {
    match mode {
        Mode::Tokens => output
            .files
            .iter()
            .map(|file| {
                let tokens: Vec<_> = file.tokens.iter().map(ToString::to_string).collect();
                format!("// {}\n{}", file.name, tokens.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n"),
        // comments keep the combined output a valid vm program
        Mode::Vm => output
            .files
            .iter()
            .map(|file| format!("// {}\n{}", file.name, to_vm_text(&file.commands)))
            .collect::<Vec<_>>()
            .join("\n"),
        Mode::Assembly => output
            .translated
            .as_ref()
            .map(|translated| to_asm_text(&translated.instructions))
            .unwrap_or_default(),
        Mode::Binary => output
            .program
            .as_ref()
            .map(|program| words_text(&program.words))
            .unwrap_or_default(),
    }
}

fn words_text(words: &[u16]) -> String {
    words
        .iter()
        .map(|word| format!("{:016b}", word))
        .collect::<Vec<_>>()
        .join("\n")
}

fn options(matches: &ArgMatches) -> CompileOptions {
    CompileOptions {
        mode: *matches.get_one::<Mode>("mode").unwrap_or(&Mode::Binary),
        bootstrap: !matches.get_flag("no-bootstrap"),
    }
}

fn paths(matches: &ArgMatches) -> Vec<PathBuf> {
    matches
        .get_many::<PathBuf>("paths")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default()
}

/// The rom words of a .hack, .asm or .jack program (for .jack a directory of classes)
fn rom_words(path: &Path) -> Vec<u16> {
    let extension = path.extension().and_then(|x| x.to_str());
    match extension {
        Some("hack") => {
            let text = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e)));
            load_hack(&text).unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e)))
        }
        Some("asm") => {
            let text = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e)));
            let source = SourceFile::new(path.display().to_string(), text);
            assemble_source(&source).unwrap_or_else(|e| fail(e)).words
        }
        _ => {
            let sources = find_files(&[path.to_path_buf()], "jack");
            let output = compile(&sources, &CompileOptions::default()).unwrap_or_else(|e| fail(e));
            output.program.map(|program| program.words).unwrap_or_default()
        }
    }
}

fn main() {
    env_logger::init();

    let paths_arg = || {
        arg!(<paths> ... "Files or directories")
            .value_parser(value_parser!(PathBuf))
    };
    let output_arg = || {
        arg!(-o --output <FILE> "Write to this file instead of stdout")
            .value_parser(value_parser!(PathBuf))
    };
    let mode_arg = || {
        arg!(-m --mode <MODE> "What to emit: tokens, vm, asm or hack")
            .value_parser(value_parser!(Mode))
            .default_value("hack")
    };
    let no_bootstrap_arg = || {
        arg!(--"no-bootstrap" "Don't set up the stack and call Sys.init first")
            .action(ArgAction::SetTrue)
    };

    let matches = command!()
        .subcommand_required(true)
        .subcommand(
            Command::new("compile")
                .about("Compile .jack files")
                .arg(paths_arg())
                .arg(mode_arg())
                .arg(no_bootstrap_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("translate")
                .about("Translate .vm files")
                .arg(paths_arg())
                .arg(mode_arg())
                .arg(no_bootstrap_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("assemble")
                .about("Assemble a .asm file")
                .arg(arg!(<file> "The .asm file").value_parser(value_parser!(PathBuf)))
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("rom")
                .about("Emit the full 32K rom image of a .hack, .asm or jack program")
                .arg(
                    arg!(<program> "A .hack/.asm file or a directory of .jack files")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("debug")
                .about("Emit the debug bundle of .jack files as json")
                .arg(paths_arg())
                .arg(no_bootstrap_arg())
                .arg(output_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("compile", sub)) => {
            let options = options(sub);
            let sources = find_files(&paths(sub), "jack");
            let output = compile(&sources, &options).unwrap_or_else(|e| fail(e));
            write_output(sub.get_one("output"), &render(&output, options.mode));
        }
        Some(("translate", sub)) => {
            let options = options(sub);
            let sources = find_files(&paths(sub), "vm");
            let output = translate_vm(&sources, &options).unwrap_or_else(|e| fail(e));
            write_output(sub.get_one("output"), &render(&output, options.mode));
        }
        Some(("assemble", sub)) => {
            let path = sub.get_one::<PathBuf>("file").unwrap_or_else(|| fail("missing file"));
            let text = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e)));
            let source = SourceFile::new(path.display().to_string(), text);
            let program = assemble_source(&source).unwrap_or_else(|e| fail(e));
            write_output(sub.get_one("output"), &words_text(&program.words));
        }
        Some(("rom", sub)) => {
            let path = sub
                .get_one::<PathBuf>("program")
                .unwrap_or_else(|| fail("missing program"));
            let literal = rom_literal(&rom_words(path)).unwrap_or_else(|e| fail(e));
            write_output(sub.get_one("output"), &literal);
        }
        Some(("debug", sub)) => {
            let sources = find_files(&paths(sub), "jack");
            let bootstrap = !sub.get_flag("no-bootstrap");
            let bundle = debug_bundle(&sources, bootstrap).unwrap_or_else(|e| fail(e));
            let json = bundle.to_json().unwrap_or_else(|e| fail(e));
            write_output(sub.get_one("output"), &json);
        }
        _ => unreachable!("clap requires a subcommand"),
    }
}
