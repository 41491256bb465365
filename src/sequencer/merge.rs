use crate::source::tail::TailReader;
use crate::source::timestamp::TimestampParser;
use crate::upstream::{LogFetcher, UpstreamError};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// One line considered by a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub timestamp: Option<NaiveDateTime>,
    /// Position in which the merge first saw this line; breaks timestamp ties.
    pub origin: usize,
}

/// Contiguous lines from a single origin, in the order that origin emitted them.
#[derive(Debug, Clone, Default)]
pub struct SourceBlock {
    pub lines: Vec<LogLine>,
}

impl SourceBlock {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Hands out origin indexes and parses timestamps while blocks are built, so
/// every line in one merge gets a unique, increasing origin.
struct BlockBuilder<'a> {
    parser: &'a TimestampParser,
    next_origin: usize,
}

impl<'a> BlockBuilder<'a> {
    fn new(parser: &'a TimestampParser) -> Self {
        Self {
            parser,
            next_origin: 0,
        }
    }

    fn block<I, S>(&mut self, lines: I) -> SourceBlock
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = lines
            .into_iter()
            .map(|text| {
                let text = text.into();
                let line = LogLine {
                    timestamp: self.parser.parse(&text),
                    text,
                    origin: self.next_origin,
                };
                self.next_origin += 1;
                line
            })
            .collect();
        SourceBlock { lines }
    }
}

/// The most recent lines across all sources, best-effort chronological.
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    pub lines: Vec<LogLine>,
}

impl MergeResult {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined by `\n`, without a trailing newline.
    pub fn to_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Orders `blocks` and keeps the last `requested` lines.
///
/// Timestamped lines are sorted by `(timestamp, origin)`. Lines without a
/// timestamp follow all of them in origin order, even when they originally
/// sat between timestamped lines.
pub fn merge_blocks(blocks: Vec<SourceBlock>, requested: usize) -> MergeResult {
    let (mut timestamped, untimestamped): (Vec<LogLine>, Vec<LogLine>) = blocks
        .into_iter()
        .flat_map(|block| block.lines)
        .partition(|line| line.timestamp.is_some());

    timestamped.sort_by_key(|line| (line.timestamp, line.origin));

    let mut lines = timestamped;
    lines.extend(untimestamped);

    let start = lines.len().saturating_sub(requested);
    lines.drain(..start);
    MergeResult { lines }
}

/// Merges the remote container log with rotated local log files.
pub struct LogMerger<'a> {
    fetcher: &'a dyn LogFetcher,
    remote_path: &'a str,
    local_candidates: &'a [PathBuf],
    tail_reader: TailReader,
    parser: TimestampParser,
}

impl<'a> LogMerger<'a> {
    /// `local_candidates` are consulted in order (newest file first).
    pub fn new(
        fetcher: &'a dyn LogFetcher,
        remote_path: &'a str,
        local_candidates: &'a [PathBuf],
    ) -> Self {
        Self {
            fetcher,
            remote_path,
            local_candidates,
            tail_reader: TailReader::new(),
            parser: TimestampParser::new(),
        }
    }

    pub fn with_tail_reader(mut self, tail_reader: TailReader) -> Self {
        self.tail_reader = tail_reader;
        self
    }

    pub async fn merge(&self, requested: usize) -> Result<MergeResult, UpstreamError> {
        let remote_text = self.fetcher.fetch_lines(self.remote_path, requested).await?;
        let local_lines = self.collect_local(requested);

        let mut builder = BlockBuilder::new(&self.parser);
        let remote = builder.block(remote_text.lines());
        let local = builder.block(local_lines);

        tracing::debug!(
            remote = remote.len(),
            local = local.len(),
            requested,
            "Merging log sources"
        );

        Ok(merge_blocks(vec![remote, local], requested))
    }

    /// Tails local candidates until `requested` lines are gathered.
    ///
    /// Each later (older) file's lines are placed before those already
    /// gathered. Files that can't be read contribute nothing.
    pub fn collect_local(&self, requested: usize) -> Vec<String> {
        let mut gathered: Vec<String> = Vec::new();
        let mut remaining = requested;

        for candidate in self.local_candidates {
            if remaining == 0 {
                break;
            }

            let mut chunk = match self.tail_local(candidate, remaining) {
                Some(chunk) if !chunk.is_empty() => chunk,
                _ => continue,
            };

            chunk.append(&mut gathered);
            gathered = chunk;
            remaining = requested.saturating_sub(gathered.len());
        }

        gathered
    }

    fn tail_local(&self, path: &Path, n: usize) -> Option<Vec<String>> {
        match self.tail_reader.tail(path, n) {
            Ok(lines) => Some(lines),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable log file");
                None
            }
        }
    }
}
