pub mod merge;

pub use merge::{merge_blocks, LogLine, LogMerger, MergeResult, SourceBlock};
