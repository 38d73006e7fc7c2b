//! Fixed alphabets for code generation.

const BASE62_SYMBOLS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE65_SYMBOLS: &[u8; 65] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_~";

/// A fixed symbol set codes are drawn from. Pick one per deployment and keep
/// it fixed: switching later does not invalidate existing codes but changes
/// the collision odds for new ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Alphabet(&'static [u8]);

impl Alphabet {
    /// Alphanumeric alphabet, 62 symbols (the default).
    pub const BASE62: Alphabet = Alphabet(BASE62_SYMBOLS);
    /// Extended alphabet adding the URL-safe `-`, `_`, `~`, 65 symbols.
    pub const BASE65: Alphabet = Alphabet(BASE65_SYMBOLS);

    pub fn symbols(&self) -> &'static [u8] {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, c: char) -> bool {
        c.is_ascii() && self.0.contains(&(c as u8))
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Alphabet::BASE62
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_sizes() {
        assert_eq!(Alphabet::BASE62.len(), 62);
        assert_eq!(Alphabet::BASE65.len(), 65);
    }

    #[test]
    fn base62_excludes_extended_symbols() {
        assert!(Alphabet::BASE62.contains('a'));
        assert!(Alphabet::BASE62.contains('Z'));
        assert!(Alphabet::BASE62.contains('0'));
        assert!(!Alphabet::BASE62.contains('-'));
        assert!(!Alphabet::BASE62.contains('~'));
    }

    #[test]
    fn base65_includes_extended_symbols() {
        assert!(Alphabet::BASE65.contains('-'));
        assert!(Alphabet::BASE65.contains('_'));
        assert!(Alphabet::BASE65.contains('~'));
        assert!(!Alphabet::BASE65.contains('/'));
    }
}
