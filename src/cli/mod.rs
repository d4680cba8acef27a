pub mod decode;
pub mod eval;
pub mod hash;

use std::path::Path;
use std::process;

use uplc::Program;

/// Read a Flat program from `input`, as raw bytes or as hex text.
pub fn load_program(input: &Path, hex: bool) -> Program {
    let raw = match std::fs::read(input) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", input.display(), e);
            process::exit(1);
        }
    };
    let bytes = if hex {
        match parse_hex(&raw) {
            Some(bytes) => bytes,
            None => {
                eprintln!("error: '{}' is not valid hex", input.display());
                process::exit(1);
            }
        }
    } else {
        raw
    };
    match uplc::decode(&bytes) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

/// Decode hex text, ignoring ASCII whitespace.
fn parse_hex(text: &[u8]) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| Some(hex_digit(pair[0])? << 4 | hex_digit(pair[1])?))
        .collect()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
