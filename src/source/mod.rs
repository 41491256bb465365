pub mod tail;
pub mod timestamp;

pub use tail::{tail_lines, TailReader};
pub use timestamp::TimestampParser;
