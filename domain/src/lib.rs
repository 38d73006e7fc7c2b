//! Domain library for the link shortener.
//!
//! This crate holds the domain types, ports (traits), and error definitions,
//! plus the code-generation and link-service logic. Keep storage adapters and
//! IO concerns out of this crate; the only dependency is `rand` for code
//! generation.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

/// A short code identifying a link.
///
/// Parses any character the supported alphabets can produce (alphanumeric
/// plus `-`, `_`, `~`); which subset a deployment actually generates is
/// decided by the configured [`alphabet::Alphabet`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Code(String);

impl Code {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::InvalidCode("empty".into()));
        }
        if !val
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '~')
        {
            return Err(CoreError::InvalidCode("invalid characters".into()));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Stored link mapping a code to its redirect target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub code: Code,
    pub long_url: String,
    pub created_at: SystemTime,
    /// Opaque partition key used by storage layouts that key items by an
    /// execution identifier rather than by code. Carries no business meaning
    /// and must never appear in any external contract.
    pub owner_execution_id: Option<String>,
}

impl Link {
    pub fn new(code: Code, long_url: String, created_at: SystemTime) -> Self {
        Self {
            code,
            long_url,
            created_at,
            owner_execution_id: None,
        }
    }
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Code generator port. Implementations draw codes of the requested length
/// from a fixed alphabet; uniqueness is NOT their job — the service enforces
/// it through conditional writes.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, length: usize) -> Code;
}

/// Write precondition for [`LinkStore::put`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutMode {
    /// Fail with [`CoreError::AlreadyExists`] if a link with the same code
    /// is already stored. The check must be atomic with the write.
    IfAbsent,
    /// Unconditional write, replacing any existing link.
    Overwrite,
}

/// Storage port for persisting and loading links.
///
/// Physical layout is the adapter's business: simple backends key items by
/// code directly, partitioned backends key by execution id and reach codes
/// through a secondary index. Both must honor the `PutMode` contract.
pub trait LinkStore: Send + Sync {
    fn put(&self, link: Link, mode: PutMode) -> Result<(), CoreError>;
    fn get_by_code(&self, code: &Code) -> Result<Option<Link>, CoreError>;
}

/// Core domain errors (no external error crates to keep deps minimal).
#[derive(Debug)]
pub enum CoreError {
    InvalidUrl(String),
    InvalidCode(String),
    AlreadyExists,
    NotFound,
    /// Bounded random-code regeneration gave up without finding a free code.
    CollisionExhausted,
    Storage(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidUrl(msg) => write!(f, "invalid url: {}", msg),
            CoreError::InvalidCode(msg) => write!(f, "invalid code: {}", msg),
            CoreError::AlreadyExists => write!(f, "code already exists"),
            CoreError::NotFound => write!(f, "not found"),
            CoreError::CollisionExhausted => write!(f, "code generation retries exhausted"),
            CoreError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl Error for CoreError {}

pub mod adapters;
pub mod alphabet;
pub mod codegen;
pub mod service;
pub mod validate;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_new_accepts_simple_values() {
        let c = Code::new("abc123").expect("valid code");
        assert_eq!(c.as_str(), "abc123");
    }

    #[test]
    fn code_accepts_extended_alphabet_symbols() {
        assert!(Code::new("a-b_c~d").is_ok());
    }

    #[test]
    fn code_rejects_empty() {
        let err = Code::new("").unwrap_err();
        match err {
            CoreError::InvalidCode(_) => {}
            _ => panic!("expected InvalidCode"),
        }
    }

    #[test]
    fn code_rejects_path_characters() {
        assert!(Code::new("a/b").is_err());
        assert!(Code::new("a b").is_err());
        assert!(Code::new("abc!").is_err());
    }

    #[test]
    fn link_new_has_no_owner() {
        let link = Link::new(
            Code::new("abc").unwrap(),
            "https://example.com".into(),
            SystemTime::UNIX_EPOCH,
        );
        assert!(link.owner_execution_id.is_none());
    }
}
