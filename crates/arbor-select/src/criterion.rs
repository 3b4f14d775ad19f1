//! Selection criteria
//!
//! One [`Criterion`] describes which children of the current nesting level a
//! selection steps into. Name, index, pattern, and wildcard criteria consume
//! one level of nesting; a boolean mask criterion binds a leaf-level filter
//! at the level it appears.

use arbor_tree::Tree;
use regex::Regex;

use crate::error::SelectError;

/// One level of a selection chain
#[derive(Debug, Clone)]
pub enum Criterion {
    /// Attribute names at the current level (OR among them)
    Names(Vec<String>),
    /// Sequence positions at the current level (OR among them)
    Indices(Vec<usize>),
    /// Attribute names matching a pattern at the current level
    ///
    /// The pattern must match the entire name.
    Pattern(Regex),
    /// Boolean mask tree mirroring the subtree at the current level
    Mask(Tree),
    /// Every child at the current level
    All,
}

impl Criterion {
    /// Select a single attribute name
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Names(vec![name.into()])
    }

    /// Select any of the given attribute names
    #[must_use]
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    /// Select a single sequence position
    #[must_use]
    pub fn index(index: usize) -> Self {
        Self::Indices(vec![index])
    }

    /// Select any of the given sequence positions
    #[must_use]
    pub fn indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self::Indices(indices.into_iter().collect())
    }

    /// Select attribute names matching a regular expression
    ///
    /// The pattern is anchored: it must match the entire name.
    ///
    /// # Errors
    /// Fails with [`SelectError::Pattern`] on an invalid expression.
    pub fn pattern(pattern: &str) -> Result<Self, SelectError> {
        let anchored = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self::Pattern(anchored))
    }

    /// Select leaves wherever the mirrored mask leaf is true
    #[must_use]
    pub fn mask(mask: Tree) -> Self {
        Self::Mask(mask)
    }

    /// Select every child at the current level
    #[must_use]
    pub fn all() -> Self {
        Self::All
    }

    pub(crate) fn matches_name(&self, name: &str) -> bool {
        match self {
            Self::Names(names) => names.iter().any(|n| n == name),
            Self::Pattern(regex) => regex.is_match(name),
            Self::All => true,
            Self::Indices(_) | Self::Mask(_) => false,
        }
    }

    pub(crate) fn matches_index(&self, index: usize) -> bool {
        match self {
            Self::Indices(indices) => indices.contains(&index),
            Self::All => true,
            Self::Names(_) | Self::Pattern(_) | Self::Mask(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_any_given() {
        let criterion = Criterion::names(["a", "b"]);
        assert!(criterion.matches_name("a"));
        assert!(criterion.matches_name("b"));
        assert!(!criterion.matches_name("c"));
    }

    #[test]
    fn names_never_match_indices() {
        let criterion = Criterion::name("a");
        assert!(!criterion.matches_index(0));
    }

    #[test]
    fn indices_match_positions() {
        let criterion = Criterion::indices([0, 2]);
        assert!(criterion.matches_index(0));
        assert!(!criterion.matches_index(1));
        assert!(criterion.matches_index(2));
        assert!(!criterion.matches_name("0"));
    }

    #[test]
    fn pattern_is_anchored() {
        let criterion = Criterion::pattern("linear[0-9]+").unwrap();
        assert!(criterion.matches_name("linear1"));
        assert!(criterion.matches_name("linear23"));
        assert!(!criterion.matches_name("linear"));
        assert!(!criterion.matches_name("sublinear1"));
    }

    #[test]
    fn pattern_rejects_invalid_regex() {
        assert!(matches!(
            Criterion::pattern("("),
            Err(SelectError::Pattern(_))
        ));
    }

    #[test]
    fn wildcard_matches_everything() {
        let criterion = Criterion::all();
        assert!(criterion.matches_name("anything"));
        assert!(criterion.matches_index(7));
    }
}
