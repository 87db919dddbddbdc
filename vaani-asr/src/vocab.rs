//! Vocabulary table mapping model output indices to token strings.

use crate::error::{ConfigError, Result};
use std::path::Path;

/// Reserved CTC blank id.
pub const BLANK_ID: usize = 0;

/// Ordered token table, index-addressed by model output id.
///
/// Id 0 is the CTC blank. The table may be padded with empty-string entries
/// so every model output index resolves to some string; padding entries are
/// never emitted since empty strings contribute nothing to a transcription.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    tokens: Vec<String>,
}

impl Vocabulary {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// Load a vocabulary from a text file, one token per line.
    ///
    /// Line order defines token ids. Lines are taken verbatim apart from the
    /// trailing newline, since sub-word markers are significant characters.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::VocabularyNotFound(path.display().to_string()))?;

        let tokens: Vec<String> = content.lines().map(str::to_string).collect();

        tracing::debug!(tokens = tokens.len(), "vocabulary loaded");

        Ok(Self::new(tokens))
    }

    /// Token string for an id, or `None` when the id is out of range.
    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Append empty-string entries until the table is `width` entries long.
    ///
    /// Reconciles the vocabulary with a model whose output is wider than the
    /// natural token table (e.g. a trailing padded row in the export). Never
    /// truncates.
    pub fn pad_to_width(&mut self, width: usize) {
        if self.tokens.len() < width {
            tracing::debug!(
                from = self.tokens.len(),
                to = width,
                "padding vocabulary to model output width"
            );
            self.tokens.resize(width, String::new());
        }
    }
}
