use super::classifier::LineClassifier;
use crate::upstream::{LogFetcher, UpstreamError};

/// Smallest window requested when filtering is enabled.
pub const MIN_INITIAL_FETCH: usize = 5000;
/// How many raw lines per wanted line the first request assumes.
pub const OVERFETCH_FACTOR: usize = 5;

/// Why a filter result falls short of what was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterWarning {
    /// Not enough lines passed the filter, so unfiltered lines were returned.
    MixedLines,
    /// The source doesn't have enough lines at all.
    InsufficientLines,
}

impl FilterWarning {
    pub fn message(&self) -> &'static str {
        match self {
            FilterWarning::MixedLines => {
                "Insufficient non-debug lines; returning mixed lines to satisfy target count."
            }
            FilterWarning::InsufficientLines => {
                "Insufficient lines available to satisfy target count."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub lines: Vec<String>,
    pub warning: Option<FilterWarning>,
    /// Upstream body served as-is, trailing newline included.
    verbatim: Option<String>,
}

impl FilterResult {
    fn from_lines(lines: Vec<String>, warning: Option<FilterWarning>) -> Self {
        Self {
            lines,
            warning,
            verbatim: None,
        }
    }

    pub fn to_text(&self) -> String {
        match &self.verbatim {
            Some(body) => body.clone(),
            None => self.lines.join("\n"),
        }
    }
}

/// Parameters of one filtered fetch.
pub struct FilterRequest<'a> {
    pub target: usize,
    /// Lines matching this are dropped.
    pub exclude: &'a dyn LineClassifier,
    pub initial_fetch: usize,
    pub cap: usize,
}

impl<'a> FilterRequest<'a> {
    /// Initial window is `max(5000, 5 * target)`; the cap never drops below it.
    pub fn new(target: usize, exclude: &'a dyn LineClassifier, configured_cap: usize) -> Self {
        let initial_fetch = MIN_INITIAL_FETCH.max(target.saturating_mul(OVERFETCH_FACTOR));
        Self {
            target,
            exclude,
            initial_fetch,
            cap: initial_fetch.max(configured_cap),
        }
    }
}

/// Fetches ever larger windows from a noisy source until enough lines survive
/// the filter or the cap is reached.
pub struct AdaptiveFilterFetcher<'a> {
    fetcher: &'a dyn LogFetcher,
    path: &'a str,
}

impl<'a> AdaptiveFilterFetcher<'a> {
    pub fn new(fetcher: &'a dyn LogFetcher, path: &'a str) -> Self {
        Self { fetcher, path }
    }

    /// Single fetch of `target` lines with no filtering.
    pub async fn fetch_unfiltered(&self, target: usize) -> Result<FilterResult, UpstreamError> {
        let content = self.fetcher.fetch_lines(self.path, target).await?;
        let lines = last_n(content.lines(), target);
        if content.lines().count() > target {
            return Ok(FilterResult::from_lines(lines, None));
        }

        Ok(FilterResult {
            lines,
            warning: None,
            verbatim: Some(content),
        })
    }

    pub async fn fetch_filtered(
        &self,
        request: &FilterRequest<'_>,
    ) -> Result<FilterResult, UpstreamError> {
        let target = request.target;
        let mut fetch_n = request.initial_fetch;
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            let content = self
                .fetcher
                .fetch_lines(self.path, fetch_n.min(request.cap))
                .await?;

            let raw: Vec<&str> = content.lines().collect();
            let kept: Vec<&str> = raw
                .iter()
                .copied()
                .filter(|line| !request.exclude.matches(line))
                .collect();

            tracing::debug!(
                path = self.path,
                fetched = raw.len(),
                kept = kept.len(),
                target,
                attempt = attempts,
                "Filtered upstream window"
            );

            if kept.len() >= target {
                return Ok(FilterResult::from_lines(last_n(kept, target), None));
            }

            if fetch_n >= request.cap {
                let (lines, warning) = if raw.len() >= target {
                    (last_n(raw, target), FilterWarning::MixedLines)
                } else {
                    (last_n(kept, target), FilterWarning::InsufficientLines)
                };
                tracing::info!(
                    path = self.path,
                    target,
                    returned = lines.len(),
                    attempts,
                    warning = warning.message(),
                    "Filter budget exhausted"
                );
                return Ok(FilterResult::from_lines(lines, Some(warning)));
            }

            fetch_n = request.cap.min(fetch_n.saturating_mul(2));
        }
    }
}

fn last_n<'s, I>(lines: I, n: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'s str>,
{
    let lines: Vec<&str> = lines.into_iter().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|line| line.to_string()).collect()
}
