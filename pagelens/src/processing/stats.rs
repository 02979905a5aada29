use serde::Serialize;

/// Line, word and character counts for a block of extracted text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextStatistics {
    pub lines: usize,
    pub words: usize,
    pub characters: usize,
}

/// Count lines (`'\n'` separated, so empty text is one line), whitespace
/// separated words and Unicode scalar values.
pub fn text_statistics(text: &str) -> TextStatistics {
    TextStatistics {
        lines: text.split('\n').count(),
        words: text.split_whitespace().count(),
        characters: text.chars().count(),
    }
}
