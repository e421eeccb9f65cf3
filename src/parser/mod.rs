//! Answer extraction and reply parsing

pub mod extract;
pub mod reply;

pub use extract::{extract_answer, Answer};
pub use reply::{parse_reply, ParserMode};
