//! Paths for addressing nodes within a tree
//!
//! Provides [`TreePath`] for hierarchical addressing of leaves and subtrees.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One step of a path: a named field or a sequence position
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    /// Named field of a tree level
    Name(String),
    /// Position within a sequence level
    Index(usize),
}

impl Token {
    /// Create a name token
    #[inline]
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create an index token
    #[inline]
    #[must_use]
    pub fn index(index: usize) -> Self {
        Self::Index(index)
    }

    /// Field name, if this is a name token
    #[inline]
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }

    /// Sequence position, if this is an index token
    #[inline]
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Name(_) => None,
            Self::Index(index) => Some(*index),
        }
    }
}

/// Path within a container tree
///
/// Ordered sequence of name/index tokens locating a node.
///
/// # Examples
/// - `["encoder", "weight"]` → `encoder.weight`
/// - `["layers", 2, "bias"]` → `layers[2].bias`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TreePath(Vec<Token>);

impl TreePath {
    /// Create new path from tokens
    #[inline]
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path with a single name token
    #[inline]
    #[must_use]
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![Token::Name(name.into())])
    }

    /// Get path tokens
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    /// Get number of tokens
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last token (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Token> {
        self.0.last()
    }

    /// Append a token, returning a new path
    #[inline]
    #[must_use]
    pub fn child(&self, token: Token) -> Self {
        let mut new = self.clone();
        new.0.push(token);
        new
    }

    /// Append a name token, returning a new path
    #[inline]
    #[must_use]
    pub fn child_name(&self, name: impl Into<String>) -> Self {
        self.child(Token::Name(name.into()))
    }

    /// Append an index token, returning a new path
    #[inline]
    #[must_use]
    pub fn child_index(&self, index: usize) -> Self {
        self.child(Token::Index(index))
    }

    /// Push a token in place (used by tree walks)
    #[inline]
    pub fn push(&mut self, token: Token) {
        self.0.push(token);
    }

    /// Pop the last token in place (used by tree walks)
    #[inline]
    pub fn pop(&mut self) -> Option<Token> {
        self.0.pop()
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Iterator over tokens from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.0.iter()
    }
}

impl Display for TreePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            match token {
                Token::Name(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                Token::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for TreePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let mut tokens = Vec::new();
        for segment in s.split('.') {
            parse_segment(segment, &mut tokens)?;
        }
        Ok(Self(tokens))
    }
}

fn parse_segment(segment: &str, tokens: &mut Vec<Token>) -> Result<(), PathError> {
    let (name, mut rest) = match segment.find('[') {
        Some(at) => (&segment[..at], &segment[at..]),
        None => (segment, ""),
    };

    if name.is_empty() && rest.is_empty() {
        return Err(PathError::EmptySegment);
    }

    if !name.is_empty() {
        if name.contains(|c: char| !c.is_alphanumeric() && c != '_') {
            return Err(PathError::InvalidSegment(name.to_string()));
        }
        tokens.push(Token::Name(name.to_string()));
    }

    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return Err(PathError::InvalidSegment(segment.to_string()));
        };
        let Some(close) = inner.find(']') else {
            return Err(PathError::UnclosedIndex(segment.to_string()));
        };
        let index: usize = inner[..close]
            .parse()
            .map_err(|_| PathError::InvalidIndex(inner[..close].to_string()))?;
        tokens.push(Token::Index(index));
        rest = &inner[close + 1..];
    }

    Ok(())
}

impl From<Vec<Token>> for TreePath {
    fn from(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }
}

/// Errors related to tree paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid segment: {0} (must be alphanumeric or underscore)")]
    InvalidSegment(String),

    /// Index bracket without closing bracket
    #[error("unclosed index bracket in segment: {0}")]
    UnclosedIndex(String),

    /// Index is not a valid position
    #[error("invalid index: {0}")]
    InvalidIndex(String),
}
