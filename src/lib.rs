use wasm_bindgen::prelude::*;
use std::io::Cursor;

pub mod codes;
pub mod console;
pub mod demo;
pub mod error;

pub use codes::HostCodes;
pub use console::{Console, READ_FAILED};
pub use demo::{run_greeting, Greeting, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
pub use error::HostError;

/// Answers fed to the greeting when it runs without a terminal.
pub const SCRIPTED_ANSWERS: &str = "Ada\nLondon\n";

/// Runs the greeting against `answers` and returns everything it printed.
pub fn run_scripted(answers: &str, codes: &HostCodes) -> Result<String, HostError> {
    let console = Console::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new());
    run_greeting(&console, codes, DEFAULT_BUFFER_SIZE)?;
    Ok(String::from_utf8_lossy(&console.take_output()).into_owned())
}

#[wasm_bindgen]
pub fn init_shell() -> String {
    match run_scripted(SCRIPTED_ANSWERS, &HostCodes::default()) {
        Ok(transcript) => transcript,
        Err(err) => err.to_string(),
    }
}
