//! Token vocabulary and CTC detokenization.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::AppError;

/// Decodes model output IDs into text.
///
/// Vocabulary file format: one token per line, line number is the token ID.
/// Sentencepiece-style tokens use `▁` as the word-boundary marker.
pub struct TokenDecoder {
    tokens: Vec<String>,
    blank_id: usize,
}

impl TokenDecoder {
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::ModelError(format!("Failed to open tokens file: {}", e)))?;

        let reader = BufReader::new(file);
        let mut tokens = Vec::new();

        for (id, line) in reader.lines().enumerate() {
            let token = line.map_err(|e| {
                AppError::ModelError(format!("Failed to read token line {}: {}", id, e))
            })?;
            tokens.push(token);
        }

        if tokens.is_empty() {
            return Err(AppError::ModelError("Token file is empty".into()));
        }

        // Blank is ID 0 for CTC vocabularies
        Ok(Self {
            tokens,
            blank_id: 0,
        })
    }

    /// Collapse a CTC frame-level ID sequence into text.
    ///
    /// Repeated IDs are merged, blanks dropped, and word-boundary markers
    /// turned into spaces.
    pub fn decode(&self, ids: &[usize]) -> Result<String, AppError> {
        let mut text = String::new();
        let mut prev = self.blank_id;

        for &id in ids {
            if id == self.blank_id {
                prev = id;
                continue;
            }
            if id == prev {
                continue;
            }

            let token = self
                .tokens
                .get(id)
                .ok_or_else(|| AppError::InferenceError(format!("Invalid token ID: {}", id)))?;

            text.push_str(token);
            prev = id;
        }

        Ok(text.replace('▁', " ").trim().to_string())
    }

    pub fn vocab_size(&self) -> usize {
        self.tokens.len()
    }
}
