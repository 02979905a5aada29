use crate::config::{MessageConfig, DEFAULT_MAX_MESSAGE_LENGTH};

/// Splits long text into chunks that fit a message length limit.
#[derive(Debug, Clone, Copy)]
pub struct MessageSplitter {
    max_length: usize,
}

impl MessageSplitter {
    pub fn new(config: &MessageConfig) -> Self {
        Self {
            max_length: config.max_message_length,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        split_message(text, self.max_length)
    }
}

impl Default for MessageSplitter {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

/// Accumulates one chunk, tracking its length in characters.
#[derive(Default)]
struct Chunk {
    text: String,
    len: usize,
}

impl Chunk {
    fn push(&mut self, piece: &str, piece_len: usize, separator: char) {
        self.text.push_str(piece);
        self.text.push(separator);
        self.len += piece_len + 1;
    }

    /// Move the trimmed contents into `out`, leaving the chunk empty.
    /// Chunks with nothing but whitespace are dropped.
    fn flush_into(&mut self, out: &mut Vec<String>) {
        let trimmed = self.text.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        self.text.clear();
        self.len = 0;
    }
}

/// Split text into chunks of at most `max_length` characters.
///
/// Lines are packed greedily. A line too long to fit on its own is broken on
/// whitespace and its words packed greedily instead; a single word longer
/// than `max_length` is emitted whole. Lengths are counted in `char`s.
/// Never returns an empty vector: text with no content yields `[""]`.
pub fn split_message(text: &str, max_length: usize) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = Chunk::default();

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if current.len + line_len + 1 <= max_length {
            current.push(line, line_len, '\n');
            continue;
        }

        current.flush_into(&mut messages);

        if line_len > max_length {
            for word in line.split_whitespace() {
                let word_len = word.chars().count();
                if current.len + word_len + 1 > max_length {
                    current.flush_into(&mut messages);
                }
                current.push(word, word_len, ' ');
            }
        } else {
            current.push(line, line_len, '\n');
        }
    }

    current.flush_into(&mut messages);

    if messages.is_empty() {
        messages.push(String::new());
    }
    messages
}
