//! What the result area shows, and the per-caption actions.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use url::form_urlencoded;

use crate::form::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionEntry {
    pub caption: String,
    pub hashtags: String,
}

impl CaptionEntry {
    pub fn new(caption: impl Into<String>, hashtags: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            hashtags: hashtags.into(),
        }
    }

    /// A bare caption, as returned by single-caption servers.
    pub fn plain(caption: impl Into<String>) -> Self {
        Self::new(caption, "")
    }
}

/// One batch of captions, in the order the server returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionResult(pub Vec<CaptionEntry>);

impl CaptionResult {
    pub fn entries(&self) -> &[CaptionEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A row in the result area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEntry<'a> {
    Caption(&'a CaptionEntry),
    Error(String),
}

/// Rows to render for `status`: captions on success, a single error row on
/// failure, nothing otherwise.
pub fn result_entries(status: &Status) -> Vec<ResultEntry<'_>> {
    match status {
        Status::Idle | Status::Submitting { .. } => Vec::new(),
        Status::Success(result) => result.entries().iter().map(ResultEntry::Caption).collect(),
        Status::Error(e) => vec![ResultEntry::Error(e.to_string())],
    }
}

/// Per-entry "Copied!" acknowledgments that expire after a fixed delay.
#[derive(Debug, Clone)]
pub struct CopyTracker {
    delay: Duration,
    marked: HashMap<usize, Instant>,
}

impl CopyTracker {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            marked: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn mark(&mut self, index: usize, now: Instant) {
        self.marked.retain(|_, at| now < *at + self.delay);
        self.marked.insert(index, now);
    }

    pub fn is_acknowledged(&self, index: usize, now: Instant) -> bool {
        self.marked
            .get(&index)
            .is_some_and(|at| now < *at + self.delay)
    }

    /// Time until the last acknowledgment visible at `now` expires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.marked
            .values()
            .map(|at| *at + self.delay)
            .filter(|expires| now < *expires)
            .max()
            .map(|expires| expires - now)
    }

    pub fn clear(&mut self) {
        self.marked.clear();
    }
}

/// Sequential download name: the first caption is `caption-1.txt`.
pub fn download_file_name(index: usize) -> String {
    format!("caption-{}.txt", index + 1)
}

pub fn download_body(entry: &CaptionEntry) -> String {
    if entry.hashtags.trim().is_empty() {
        format!("{}\n", entry.caption)
    } else {
        format!("{}\n\n{}\n", entry.caption, entry.hashtags)
    }
}

/// Text placed on the clipboard and in share links.
pub fn share_text(entry: &CaptionEntry) -> String {
    if entry.hashtags.trim().is_empty() {
        entry.caption.clone()
    } else {
        format!("{} {}", entry.caption, entry.hashtags)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub name: &'static str,
    pub url: String,
}

const SHARE_TARGETS: [(&str, &str); 2] = [
    ("X", "https://twitter.com/intent/tweet?text="),
    ("WhatsApp", "https://wa.me/?text="),
];

pub fn share_links(entry: &CaptionEntry) -> Vec<ShareLink> {
    let text: String = form_urlencoded::byte_serialize(share_text(entry).as_bytes()).collect();
    SHARE_TARGETS
        .iter()
        .map(|&(name, base)| ShareLink {
            name,
            url: format!("{}{}", base, text),
        })
        .collect()
}
