use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{RagError, Result};
use crate::model::Chunk;
use crate::persist::load_txt;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n").expect("paragraph regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

const DEFAULT_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub max_chars: usize,
    pub min_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 600,
            min_chars: 20,
        }
    }
}

pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Splits `text` into paragraph-aligned chunks no longer than `max_chars`.
    pub fn chunk_text(&self, source_file: &str, text: &str) -> Vec<Chunk> {
        let max_chars = self.config.max_chars.max(1);
        let stem = Path::new(source_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(source_file);
        let mut pieces = Vec::new();
        let mut current = String::new();
        for paragraph in PARAGRAPH_BREAK.split(text) {
            let paragraph = WHITESPACE.replace_all(paragraph.trim(), " ");
            if paragraph.is_empty() {
                continue;
            }
            for part in split_long(&paragraph, max_chars) {
                let joined_len = current.chars().count() + part.chars().count() + 1;
                if !current.is_empty() && joined_len > max_chars {
                    pieces.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&part);
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
            .into_iter()
            .filter(|piece| piece.chars().count() >= self.config.min_chars)
            .enumerate()
            .map(|(idx, piece)| Chunk::new(format!("{stem}_chunk_{idx:03}"), source_file, piece))
            .collect()
    }

    /// Chunks every text document under `dir`, in path order.
    pub fn chunk_dir(&self, dir: &Path) -> Result<Vec<Chunk>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|err| RagError::Other(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_text = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| DEFAULT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false);
            if is_text {
                files.push(entry.into_path());
            }
        }
        let mut chunks = Vec::new();
        for path in files {
            let text = load_txt(&path)?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            chunks.extend(self.chunk_text(&name, &text));
        }
        Ok(chunks)
    }
}

fn split_long(paragraph: &str, max_chars: usize) -> Vec<String> {
    if paragraph.chars().count() <= max_chars {
        return vec![paragraph.to_string()];
    }
    let mut parts = Vec::new();
    let mut current = String::new();
    for word in paragraph.split(' ') {
        let next_len = current.chars().count() + word.chars().count() + 1;
        if !current.is_empty() && next_len > max_chars {
            parts.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
