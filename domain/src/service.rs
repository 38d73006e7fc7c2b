use crate::validate::{validate_custom_code, validate_long_url};
use crate::{Clock, Code, CodeGenerator, CoreError, Link, LinkStore, PutMode};

/// Tunables for [`LinkService`], injected at construction — no ambient
/// globals. `base_url` is the host the short URL is formed from.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Length of auto-generated codes (3–6 depending on deployment).
    pub code_length: usize,
    /// Minimum length for caller-supplied custom codes; kept above
    /// `code_length` so the two populations cannot collide in practice.
    pub custom_min_length: usize,
    /// Bound on code regeneration when a random candidate is already taken.
    pub max_attempts: usize,
}

impl ServiceConfig {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            code_length: 6,
            custom_min_length: 8,
            max_attempts: 5,
        }
    }

    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }
}

/// Application service orchestrating creation and resolution of short links.
///
/// Generic over store, code generator, and clock so the domain stays testable
/// without external dependencies. Stateless between calls; the store is the
/// single arbiter of which concurrent write wins a code.
pub struct LinkService<S: LinkStore, G: CodeGenerator, C: Clock> {
    store: S,
    generator: G,
    clock: C,
    config: ServiceConfig,
}

impl<S: LinkStore, G: CodeGenerator, C: Clock> LinkService<S, G, C> {
    pub fn new(store: S, generator: G, clock: C, config: ServiceConfig) -> Self {
        Self {
            store,
            generator,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Create a link under a freshly generated code.
    ///
    /// The write is conditional on code absence; a taken code triggers
    /// regeneration, bounded by `max_attempts`. A collision can never
    /// silently overwrite an existing link.
    pub fn create(&self, long_url: &str) -> Result<Link, CoreError> {
        validate_long_url(long_url)?;
        for _ in 0..self.config.max_attempts {
            let code = self.generator.generate(self.config.code_length);
            let link = Link::new(code, long_url.to_string(), self.clock.now());
            match self.store.put(link.clone(), PutMode::IfAbsent) {
                Ok(()) => return Ok(link),
                Err(CoreError::AlreadyExists) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CoreError::CollisionExhausted)
    }

    /// Create a link under a caller-supplied custom code.
    ///
    /// Uniqueness rides on the store's conditional write rather than a
    /// separate existence check, so there is no window between check and
    /// write. A taken code surfaces as [`CoreError::AlreadyExists`].
    pub fn create_custom(&self, long_url: &str, code: &str) -> Result<Link, CoreError> {
        validate_long_url(long_url)?;
        let code = validate_custom_code(code, self.config.custom_min_length)?;
        let link = Link::new(code, long_url.to_string(), self.clock.now());
        self.store.put(link.clone(), PutMode::IfAbsent)?;
        Ok(link)
    }

    /// Resolve a code to its stored URL, byte-for-byte.
    ///
    /// A stored link whose URL is empty (corrupted record) resolves the same
    /// as an absent one.
    pub fn resolve(&self, code: &str) -> Result<String, CoreError> {
        if code.is_empty() {
            return Err(CoreError::InvalidCode("empty".into()));
        }
        let code = Code::new(code)?;
        match self.store.get_by_code(&code)? {
            Some(link) if !link.long_url.is_empty() => Ok(link.long_url),
            Some(_) | None => Err(CoreError::NotFound),
        }
    }

    /// Full short URL for a code: configured base host + `/` + code.
    pub fn short_url(&self, code: &Code) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            code.as_str()
        )
    }
}
