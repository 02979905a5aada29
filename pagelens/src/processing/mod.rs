mod splitter;
mod stats;

pub use splitter::{split_message, MessageSplitter};
pub use stats::{text_statistics, TextStatistics};
