// Request-scoped label context
// Carries ambient label key/value pairs that apply to every measurement made
// on behalf of one logical request or operation.
//
// Numan Thabit 2025 Nov

use std::sync::Arc;

/// Immutable handle with a flat `key, value, key, value, ...` label list.
///
/// Cloning is cheap. [`Context::with_labels`] never mutates the receiver: it
/// returns a new context holding an independent copy with the pairs appended,
/// so sibling contexts derived from one parent never observe each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    labels: Option<Arc<[String]>>,
}

impl Context {
    /// Empty context without ambient labels.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a derived context with `keys_and_values` appended.
    ///
    /// Pairs appended later override earlier pairs with the same key when a
    /// measurement is recorded.
    pub fn with_labels<S: AsRef<str>>(&self, keys_and_values: &[S]) -> Self {
        if keys_and_values.is_empty() {
            return self.clone();
        }
        let current = self.labels();
        let mut labels = Vec::with_capacity(current.len() + keys_and_values.len());
        labels.extend(current.iter().cloned());
        labels.extend(keys_and_values.iter().map(|s| s.as_ref().to_owned()));
        Self {
            labels: Some(labels.into()),
        }
    }

    /// Ambient label pairs, empty for a background context.
    pub fn labels(&self) -> &[String] {
        self.labels.as_deref().unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.labels().is_empty()
    }
}
