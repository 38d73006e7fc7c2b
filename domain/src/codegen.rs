//! Code generation strategies.

use rand::Rng;

use crate::alphabet::Alphabet;
use crate::{Code, CodeGenerator};

/// Uniform random code generator over a fixed alphabet.
///
/// Uses the thread-local RNG, which is seeded once per thread rather than per
/// call, so repeated calls within a process are uncorrelated. Determinism is
/// neither required nor provided.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomCodeGenerator {
    alphabet: Alphabet,
}

impl RandomCodeGenerator {
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: usize) -> Code {
        let symbols = self.alphabet.symbols();
        let mut rng = rand::rng();
        let mut buf = String::with_capacity(length);
        for _ in 0..length {
            let idx = rng.random_range(0..symbols.len());
            buf.push(symbols[idx] as char);
        }
        // Valid by construction — every alphabet symbol parses as a Code.
        // If this fails (shouldn't), fall back to a safe minimal code.
        Code::new(buf).unwrap_or_else(|_| Code::new("0").expect("'0' is valid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_length() {
        let g = RandomCodeGenerator::new(Alphabet::BASE62);
        for len in [3, 4, 5, 6] {
            assert_eq!(g.generate(len).len(), len);
        }
    }

    #[test]
    fn draws_only_from_configured_alphabet() {
        let g = RandomCodeGenerator::new(Alphabet::BASE62);
        for _ in 0..100 {
            let code = g.generate(6);
            assert!(code.as_str().chars().all(|c| Alphabet::BASE62.contains(c)));
        }
    }

    #[test]
    fn extended_alphabet_codes_parse() {
        let g = RandomCodeGenerator::new(Alphabet::BASE65);
        for _ in 0..100 {
            let code = g.generate(6);
            assert!(Code::new(code.as_str()).is_ok());
        }
    }

    #[test]
    fn consecutive_codes_differ() {
        // 62^6 keyspace; a repeat here would be a broken RNG, not bad luck.
        let g = RandomCodeGenerator::new(Alphabet::BASE62);
        let a = g.generate(6);
        let b = g.generate(6);
        assert_ne!(a, b);
    }
}
