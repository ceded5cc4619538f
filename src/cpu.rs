use hack_toolchain::hack::rom::load_hack;
use hack_toolchain::simulators::cpu::{format_word, Computer, DisplayBase, RunOutcome};
use hack_toolchain::{assemble_source, SourceFile};

use clap::{arg, command, value_parser, ArgAction};
use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::process::exit;

fn fail(message: impl Display) -> ! {
    eprintln!("error: {}", message);
    exit(1);
}

fn main() {
    env_logger::init();

    let rom_arg = arg!(<rom> "The program, either a .hack or a .asm file")
        .value_parser(value_parser!(PathBuf));

    let steps_arg = arg!(-s --steps <STEPS> "Stop after this many steps")
        .value_parser(value_parser!(usize))
        .default_value("1000000");

    let break_arg = arg!(-b --"break" <ADDRESS> "Stop when the pc reaches this rom address")
        .value_parser(value_parser!(usize))
        .action(ArgAction::Append);

    let dump_arg = arg!(-d --dump <ADDRESS> "Print this ram address when done")
        .value_parser(value_parser!(usize))
        .action(ArgAction::Append);

    let binary_arg = arg!(--binary "Print the dumped words in binary").action(ArgAction::SetTrue);

    let matches = command!()
        .arg(rom_arg)
        .arg(steps_arg)
        .arg(break_arg)
        .arg(dump_arg)
        .arg(binary_arg)
        .get_matches();

    let path = matches
        .get_one::<PathBuf>("rom")
        .unwrap_or_else(|| fail("missing rom"));
    let max_steps = *matches.get_one::<usize>("steps").unwrap_or(&1_000_000);
    let breakpoints: HashSet<usize> = matches
        .get_many::<usize>("break")
        .map(|addresses| addresses.copied().collect())
        .unwrap_or_default();
    let dumps: Vec<usize> = matches
        .get_many::<usize>("dump")
        .map(|addresses| addresses.copied().collect())
        .unwrap_or_default();
    let base = if matches.get_flag("binary") {
        DisplayBase::GroupedBinary
    } else {
        DisplayBase::Decimal
    };

    let content =
        fs::read_to_string(path).unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e)));
    let rom = if path.extension().and_then(|x| x.to_str()) == Some("asm") {
        let source = SourceFile::new(path.display().to_string(), content);
        assemble_source(&source).unwrap_or_else(|e| fail(e)).words
    } else {
        load_hack(&content).unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e)))
    };

    let mut computer = Computer::new(&rom);
    let outcome = computer
        .run_to_breakpoint(&breakpoints, max_steps)
        .unwrap_or_else(|e| fail(e));

    match outcome {
        RunOutcome::Breakpoint { pc, steps } => {
            println!("hit breakpoint {} after {} steps", pc, steps)
        }
        RunOutcome::StepLimit { steps } => println!("stopped after {} steps", steps),
    }

    let registers = computer.registers();
    println!(
        "A = {}, D = {}, PC = {}",
        format_word(registers.a, base),
        format_word(registers.d, base),
        registers.pc
    );
    for address in dumps {
        println!("RAM[{}] = {}", address, computer.read_ram_word(address, base));
    }
}
