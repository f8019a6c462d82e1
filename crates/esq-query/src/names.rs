//! Clause names.
//!
//! Every clause the builders emit carries a `_name` such as
//! `filters:permissions:global:project_visibility_level:public_and_internal`. Search responses
//! report matched names per hit, so these strings are part of the output contract.

use std::fmt;

/// Separator between name segments.
const SEPARATOR: &str = ":";

/// An immutable path of name segments.
///
/// Scopes nest by value: `scope` returns a child and leaves the parent untouched, so helpers can
/// hand a narrower scope to a sub-builder without any push/pop bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameScope {
    /// Segments from the outermost scope inwards.
    segments: Vec<String>,
}

impl NameScope {
    /// Returns the empty root scope.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a child scope with `parts` appended.
    pub fn scope<S: AsRef<str>>(&self, parts: &[S]) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(parts.iter().map(|p| p.as_ref().to_string()));
        Self { segments }
    }

    /// Renders the name of a clause inside this scope.
    pub fn name<S: AsRef<str>>(&self, parts: &[S]) -> String {
        self.segments
            .iter()
            .map(String::as_str)
            .chain(parts.iter().map(AsRef::as_ref))
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    /// Returns true for the root scope.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for NameScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(SEPARATOR))
    }
}
