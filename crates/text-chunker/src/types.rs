use serde::{Deserialize, Serialize};

/// One retrievable slice of a source document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    /// Source document path or label, if known
    pub source: Option<String>,

    /// Byte offset of `text` in the source document
    pub offset: usize,

    /// Position in the chunk sequence (0-indexed)
    pub index: usize,

    /// The chunk content
    pub text: String,

    /// Separator consumed directly after this chunk (discard placement only)
    #[serde(default)]
    pub separator: Option<String>,
}

impl TextChunk {
    /// Create a new chunk
    #[must_use]
    pub const fn new(
        source: Option<String>,
        offset: usize,
        index: usize,
        text: String,
        separator: Option<String>,
    ) -> Self {
        Self {
            source,
            offset,
            index,
            text,
            separator,
        }
    }

    /// Byte offset one past the end of `text` in the source document
    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.offset + self.text.len()
    }

    /// True when the chunk carries no visible content
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Estimate tokens from content (rough heuristic: ~4 chars per token)
    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        (self.text.len() / 4).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_and_blankness() {
        let chunk = TextChunk::new(None, 10, 0, "hello".to_string(), None);
        assert_eq!(chunk.end_offset(), 15);
        assert!(!chunk.is_blank());

        let blank = TextChunk::new(None, 0, 1, " \n".to_string(), Some(". ".to_string()));
        assert!(blank.is_blank());
        assert_eq!(blank.estimated_tokens(), 1);

        let sentence = TextChunk::new(None, 0, 2, "Don likes to eat pizza. ".to_string(), None);
        assert_eq!(sentence.estimated_tokens(), 6);
    }
}
