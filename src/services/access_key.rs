//! Public access keys for anonymous request tracking.

use rand::{Rng, distr::Alphanumeric};

/// Source of candidate access keys.
///
/// Uniqueness is enforced by the store, not the generator; callers retry on
/// collision.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws keys uniformly from `[A-Za-z0-9]`, which never needs URL-encoding.
#[derive(Debug, Clone, Copy)]
pub struct AlphanumericKeyGenerator {
    length: usize,
}

impl AlphanumericKeyGenerator {
    #[must_use]
    pub const fn new(length: usize) -> Self {
        Self { length }
    }
}

impl KeyGenerator for AlphanumericKeyGenerator {
    fn generate(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}
