//! The extractor seam.
//!
//! The pipeline never knows which categories exist. It hands each document's
//! content and kind to an [`Extractor`] and treats the returned [`Fragments`]
//! as opaque. Extractors must be deterministic and free of side effects:
//! whether one runs for a given document depends on cache state.
//!
//! The built-in implementation is [`RuleSet`](crate::rules::RuleSet). Tests
//! and embedders can wrap a closure with [`FnExtractor`].

use crate::error::ExtractError;
use crate::models::{DocumentKind, Fragments};

pub trait Extractor: Send + Sync {
    /// Classifies one document's content into category → fragment sets.
    fn classify(&self, content: &str, kind: &DocumentKind) -> Result<Fragments, ExtractError>;
}

/// Adapts a closure into an [`Extractor`].
///
/// ```rust
/// use i18n_harvest::extract::{Extractor, FnExtractor};
/// use i18n_harvest::models::{DocumentKind, Fragments};
///
/// let lines = FnExtractor::new(|content: &str, _kind: &DocumentKind| {
///     content.lines().map(|l| ("lines", l.trim())).collect::<Fragments>()
/// });
/// let found = lines.classify("Save\nCancel", &DocumentKind::new("txt")).unwrap();
/// assert_eq!(found.fragment_count(), 2);
/// ```
pub struct FnExtractor<F>(F);

impl<F> FnExtractor<F>
where
    F: Fn(&str, &DocumentKind) -> Fragments + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Extractor for FnExtractor<F>
where
    F: Fn(&str, &DocumentKind) -> Fragments + Send + Sync,
{
    fn classify(&self, content: &str, kind: &DocumentKind) -> Result<Fragments, ExtractError> {
        Ok((self.0)(content, kind))
    }
}
