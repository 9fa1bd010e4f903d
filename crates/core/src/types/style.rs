//! Free-text style prompt submitted for outfit recommendations.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`StylePrompt`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StylePromptError {
    /// The prompt is shorter than the minimum once surrounding whitespace is removed.
    #[error("style description must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
}

/// A style description such as `"minimalist office"`.
///
/// Keeps the text exactly as submitted (it is what gets persisted on the
/// outfit) alongside a normalized form used for matching and cache keys.
///
/// ## Constraints
///
/// - At least 3 characters after trimming surrounding whitespace
///
/// ## Examples
///
/// ```
/// use aistylehub_core::StylePrompt;
///
/// let prompt = StylePrompt::parse("  Elegant Office ").unwrap();
/// assert_eq!(prompt.normalized(), "elegant office");
/// assert_eq!(prompt.as_str(), "  Elegant Office ");
///
/// assert!(StylePrompt::parse(" ab ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StylePrompt {
    original: String,
    normalized: String,
}

impl StylePrompt {
    /// Minimum number of characters after trimming.
    pub const MIN_LENGTH: usize = 3;

    /// Parse a `StylePrompt` from user input.
    ///
    /// # Errors
    ///
    /// Returns `StylePromptError::TooShort` if the trimmed input has fewer
    /// than [`Self::MIN_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, StylePromptError> {
        let trimmed = s.trim();
        if trimmed.chars().count() < Self::MIN_LENGTH {
            return Err(StylePromptError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        Ok(Self {
            original: s.to_owned(),
            normalized: trimmed.to_lowercase(),
        })
    }

    /// Returns the prompt exactly as submitted.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Returns the trimmed, lowercased prompt.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Returns true if `tag` appears in the normalized prompt, ignoring case.
    #[must_use]
    pub fn mentions(&self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        !tag.is_empty() && self.normalized.contains(&tag)
    }
}

impl fmt::Display for StylePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl TryFrom<String> for StylePrompt {
    type Error = StylePromptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StylePrompt> for String {
    fn from(prompt: StylePrompt) -> Self {
        prompt.original
    }
}
