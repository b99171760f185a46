use crate::config::{ChunkerConfig, SeparatorPlacement};
use crate::error::Result;
use crate::types::TextChunk;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// Main chunker interface for splitting documents
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker, rejecting invalid configurations
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split an anonymous document
    #[must_use]
    pub fn split(&self, document: &str) -> Vec<TextChunk> {
        self.split_document(document, None)
    }

    /// Split a document read from disk, labelling chunks with its path
    pub fn split_file(&self, path: impl AsRef<Path>) -> Result<Vec<TextChunk>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let source = path.display().to_string();
        Ok(self.split_document(&content, Some(&source)))
    }

    /// Split a document, tagging every chunk with `source`
    #[must_use]
    pub fn split_document(&self, document: &str, source: Option<&str>) -> Vec<TextChunk> {
        let pieces = self.pieces(document);

        let mut chunks = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let text = &document[piece.start..piece.end];
            let segments = match self.config.max_chunk_chars {
                Some(cap) => cap_graphemes(text, cap),
                None => vec![(0, text)],
            };
            let last = segments.len().saturating_sub(1);

            for (i, (rel, segment)) in segments.into_iter().enumerate() {
                let separator = if i == last {
                    piece.separator.map(str::to_string)
                } else {
                    None
                };
                chunks.push(TextChunk::new(
                    source.map(str::to_string),
                    piece.start + rel,
                    chunks.len(),
                    segment.to_string(),
                    separator,
                ));
            }
        }

        log::debug!(
            "Split {} bytes into {} chunks (source: {})",
            document.len(),
            chunks.len(),
            source.unwrap_or("<inline>")
        );
        chunks
    }

    /// Compute raw piece boundaries before the grapheme cap is applied
    fn pieces<'a>(&'a self, document: &str) -> Vec<Piece<'a>> {
        let mut scanner = SeparatorScanner::new(document, &self.config.separators);
        let mut pieces = Vec::new();
        let mut start = 0;
        let mut search = 0;

        while let Some((at, separator)) = scanner.next_from(search) {
            match self.config.separator_placement {
                SeparatorPlacement::End => {
                    let end = at + separator.len();
                    pieces.push(Piece::new(start, end, None));
                    start = end;
                    search = end;
                }
                SeparatorPlacement::Discard => {
                    pieces.push(Piece::new(start, at, Some(separator)));
                    start = at + separator.len();
                    search = start;
                }
                SeparatorPlacement::Start => {
                    if at > start {
                        pieces.push(Piece::new(start, at, None));
                    }
                    start = at;
                    search = at + separator.len();
                }
            }
        }

        if start < document.len() {
            pieces.push(Piece::new(start, document.len(), None));
        }

        pieces
    }
}

/// Rebuild the source document from its chunks, re-inserting consumed separators
#[must_use]
pub fn reassemble(chunks: &[TextChunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        out.push_str(&chunk.text);
        if let Some(separator) = &chunk.separator {
            out.push_str(separator);
        }
    }
    out
}

struct Piece<'a> {
    start: usize,
    end: usize,
    separator: Option<&'a str>,
}

impl<'a> Piece<'a> {
    const fn new(start: usize, end: usize, separator: Option<&'a str>) -> Self {
        Self {
            start,
            end,
            separator,
        }
    }
}

/// Tracks the next occurrence of every separator so each is searched
/// at most once per match it produces.
struct SeparatorScanner<'a, 'd> {
    document: &'d str,
    separators: &'a [String],
    next: Vec<Option<usize>>,
}

impl<'a, 'd> SeparatorScanner<'a, 'd> {
    fn new(document: &'d str, separators: &'a [String]) -> Self {
        let next = separators
            .iter()
            .map(|sep| document.find(sep.as_str()))
            .collect();
        Self {
            document,
            separators,
            next,
        }
    }

    /// Earliest separator at or after `from`; on a tie the longest one wins.
    fn next_from(&mut self, from: usize) -> Option<(usize, &'a str)> {
        let mut best: Option<(usize, &'a str)> = None;
        for (slot, separator) in self.next.iter_mut().zip(self.separators) {
            if matches!(*slot, Some(pos) if pos < from) {
                *slot = self.document[from..]
                    .find(separator.as_str())
                    .map(|i| from + i);
            }
            let Some(pos) = *slot else {
                continue;
            };
            let better = match best {
                None => true,
                Some((best_pos, best_sep)) => {
                    pos < best_pos || (pos == best_pos && separator.len() > best_sep.len())
                }
            };
            if better {
                best = Some((pos, separator.as_str()));
            }
        }
        best
    }
}

/// Cut `text` into runs of at most `cap` grapheme clusters.
/// Returns `(relative byte offset, segment)` pairs; never empty.
fn cap_graphemes(text: &str, cap: usize) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut segment_start = 0;
    let mut count = 0;
    for (idx, _) in text.grapheme_indices(true) {
        if count == cap {
            out.push((segment_start, &text[segment_start..idx]));
            segment_start = idx;
            count = 0;
        }
        count += 1;
    }
    if segment_start < text.len() || out.is_empty() {
        out.push((segment_start, &text[segment_start..]));
    }
    out
}
