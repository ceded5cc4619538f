use crate::definitions::{Word, BITS_PER_WORD, SCREEN_HEIGHT, SCREEN_WIDTH, SCREEN_WIDTH_IN_WORDS};
use std::collections::{BTreeMap, HashSet};
use wasm_bindgen::prelude::*;

pub mod compiler;
pub mod debug;
pub mod definitions;
pub mod hack;
pub mod jack;
pub mod keyboard;
pub mod parse;
pub mod simulators;
pub mod vm;

pub use compiler::{
    assemble_source, compile, translate_vm, CompileError, CompileErrors, CompileOptions,
    CompileOutput, Mode, SourceFile,
};
pub use debug::{debug_bundle, DebugBundle};
pub use simulators::cpu::{Computer, DisplayBase, EmulatorFault, RunOutcome};

use wasm_bindgen::Clamped;
use web_sys::ImageData;

#[wasm_bindgen]
pub fn get_key_code(letter: &str) -> Option<Word> {
    keyboard::get_key_code(letter)
}

/// Compiles a json object of file name to jack source and returns the debug bundle as json
#[wasm_bindgen]
pub fn compile_to_json(sources: &str, bootstrap: bool) -> Result<String, String> {
    let sources: BTreeMap<String, String> =
        serde_json::from_str(sources).map_err(|e| e.to_string())?;
    let sources: Vec<_> = sources
        .into_iter()
        .map(|(name, content)| SourceFile::new(name, content))
        .collect();

    let bundle = debug_bundle(&sources, bootstrap).map_err(|e| e.to_string())?;
    bundle.to_json().map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub struct App {
    computer: Computer,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

fn display_base(name: &str) -> DisplayBase {
    match name {
        "binary" => DisplayBase::Binary,
        "grouped" => DisplayBase::GroupedBinary,
        _ => DisplayBase::Decimal,
    }
}

#[wasm_bindgen]
impl App {
    pub fn new() -> Self {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        Self {
            computer: Computer::default(),
        }
    }

    pub fn reset(&mut self, rom: &[u16]) {
        self.computer.reset(rom);
    }

    pub fn step_times(&mut self, times: u32) -> Result<(), String> {
        for _ in 0..times {
            self.step()?;
        }
        Ok(())
    }

    pub fn step(&mut self) -> Result<(), String> {
        self.computer.step().map_err(|e| e.to_string())
    }

    /// Returns the outcome as json
    pub fn run_to_breakpoint(&mut self, breakpoints: &[u32], max_steps: u32) -> Result<String, String> {
        let breakpoints: HashSet<_> = breakpoints.iter().map(|&b| b as usize).collect();
        let outcome = self
            .computer
            .run_to_breakpoint(&breakpoints, max_steps as usize)
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&outcome).map_err(|e| e.to_string())
    }

    pub fn read_ram_word(&self, address: usize, base: &str) -> String {
        self.computer.read_ram_word(address, display_base(base))
    }

    /// Returns the registers as json
    pub fn registers(&self) -> Result<String, String> {
        serde_json::to_string(&self.computer.registers()).map_err(|e| e.to_string())
    }

    pub fn set_input_key(&mut self, key: Word) {
        self.computer.set_input_key(key);
    }

    pub fn data_buffer_size() -> usize {
        const BYTES_PER_PIXEL: usize = 4; // rgba
        BYTES_PER_PIXEL * SCREEN_WIDTH * SCREEN_HEIGHT
    }

    pub fn display_data(&self) -> Result<ImageData, JsValue> {
        let display = self.computer.display();
        let mut data = Vec::with_capacity(Self::data_buffer_size());
        for row_idx in 0..SCREEN_HEIGHT {
            for word_idx in 0..SCREEN_WIDTH_IN_WORDS {
                let word = display[row_idx * SCREEN_WIDTH_IN_WORDS + word_idx];
                for pixel_idx in 0..BITS_PER_WORD {
                    let mask = 1 << pixel_idx;
                    let value = word & mask;
                    let color = if value == 0 { 255 } else { 0 };

                    data.push(color);
                    data.push(color);
                    data.push(color);
                    data.push(255);
                }
            }
        }

        ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(data.as_slice()),
            SCREEN_WIDTH as u32,
            SCREEN_HEIGHT as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_to_json() {
        let sources = r#"{"Sys.jack": "class Sys { function void init() { return; } }"}"#;
        let json = compile_to_json(sources, true).unwrap();
        let bundle: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(!bundle["words"].as_array().unwrap().is_empty());

        let error = compile_to_json(r#"{"Sys.jack": "class"}"#, true).unwrap_err();
        assert!(error.starts_with("Sys.jack: "), "{}", error);
        assert!(compile_to_json("[]", true).is_err());
    }

    #[test]
    fn test_app() {
        let mut app = App::new();
        // @5, D=A, @3, M=D
        app.reset(&[5, 0b1110110000010000, 3, 0b1110001100001000]);
        let outcome = app.run_to_breakpoint(&[3], 100).unwrap();
        assert_eq!(r#"{"type":"breakpoint","pc":3,"steps":3}"#, outcome);
        app.step().unwrap();

        assert_eq!("5", app.read_ram_word(3, "decimal"));
        assert_eq!("0000 0000 0000 0101", app.read_ram_word(3, "grouped"));
        assert_eq!(r#"{"a":3,"d":5,"pc":4}"#, app.registers().unwrap());
    }
}
