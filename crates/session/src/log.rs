use chrono::{DateTime, Local};
use extract::AnalysisTask;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

pub const DEFAULT_LOG_CAPACITY: usize = 10;

const PROMPT_PREVIEW: usize = 50;
const RESPONSE_PREVIEW: usize = 100;

/// One submission outcome, success or failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Local>,
    pub task: AnalysisTask,
    pub prompt_summary: String,
    pub response_summary: String,
    pub is_error: bool,
}

impl LogEntry {
    pub fn new(task: AnalysisTask, prompt_summary: String, response_summary: String, is_error: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Local::now(),
            task,
            prompt_summary,
            response_summary,
            is_error,
        }
    }
}

fn preview(text: &str, graphemes: usize) -> String {
    text.graphemes(true).take(graphemes).collect()
}

/// Web questions log the query alone; everything else also shows the start of the document.
pub fn prompt_summary(task: AnalysisTask, query: &str, document_text: &str) -> String {
    if task == AnalysisTask::WebAssistedInsight {
        return query.to_string();
    }
    let query = if query.is_empty() { "N/A" } else { query };
    format!("{} (doc: {}...)", query, preview(document_text, PROMPT_PREVIEW))
}

pub fn response_summary(text: &str) -> String {
    format!("{}...", preview(text, RESPONSE_PREVIEW))
}

/// Newest-first ring of recent submissions
#[derive(Debug, Clone)]
pub struct SessionLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl SessionLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_text(&self) -> String {
        if self.is_empty() {
            return "No analysis actions logged yet.".to_string();
        }
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "[{}] {}{}\n  Query: {}\n  Response: {}",
                    e.timestamp.format("%H:%M:%S"),
                    e.task,
                    if e.is_error { " (error)" } else { "" },
                    e.prompt_summary,
                    e.response_summary
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
