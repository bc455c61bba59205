//! Random password generator
//!
//! Lowercase letters are always part of the alphabet, so the alphabet is
//! never empty. Characters are drawn uniformly via `gen_range` (no modulo
//! bias) from the thread-local CSPRNG.

use rand::Rng;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMBERS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+~`|}{[]:;?><,./-=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    pub length: usize,
    pub upper: bool,
    pub numbers: bool,
    pub symbols: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: 16,
            upper: true,
            numbers: true,
            symbols: true,
        }
    }
}

/// The alphabet selected by `options`.
pub fn charset(options: &GeneratorOptions) -> Vec<char> {
    let mut chars: Vec<char> = LOWER.chars().collect();
    if options.upper {
        chars.extend(UPPER.chars());
    }
    if options.numbers {
        chars.extend(NUMBERS.chars());
    }
    if options.symbols {
        chars.extend(SYMBOLS.chars());
    }
    chars
}

/// Generate a password of `options.length` characters.
pub fn generate_password(options: &GeneratorOptions) -> String {
    let chars = charset(options);
    let mut rng = rand::thread_rng();
    (0..options.length)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect()
}
