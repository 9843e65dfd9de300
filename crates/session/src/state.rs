use extract::{AiResponseData, AnalysisTask, Analyzer, ModelClient, ModelError};
use ingest::{LoadError, LoadedDocument};
use visualize::{ChartAvailability, ChartType, Panel};

use crate::error::{SessionError, ValidationError};
use crate::log::{LogEntry, SessionLog, prompt_summary, response_summary};
use crate::preferences::Preferences;

pub const NO_FILE_SELECTED: &str = "No file selected.";

/// Message shown in the document status area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStatus {
    pub message: String,
    pub is_error: bool,
}

/// Identifies one document load; only the newest token may update the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadToken(u64);

/// Everything a submission needs, captured when it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionTicket {
    pub id: u64,
    pub task: AnalysisTask,
    pub query: String,
    pub document_text: String,
    pub model: String,
    pub prompt_summary: String,
}

impl SubmissionTicket {
    pub async fn run<C: ModelClient>(&self, analyzer: &Analyzer<C>) -> Result<AiResponseData, ModelError> {
        analyzer
            .analyze_text(&self.document_text, &self.query, self.task, &self.model)
            .await
    }
}

/// Check a submission against the per-task input rules.
pub fn validate(task: AnalysisTask, query: &str, document_text: &str) -> Result<(), ValidationError> {
    let query_optional = matches!(task, AnalysisTask::SummarizeDocument | AnalysisTask::ThematicAnalysis);
    if query.is_empty() && !query_optional {
        return Err(ValidationError::QueryRequired);
    }

    let document_required = match task {
        AnalysisTask::FactExtraction | AnalysisTask::QueryDocument | AnalysisTask::ThematicAnalysis => true,
        AnalysisTask::SummarizeDocument => query.is_empty(),
        AnalysisTask::WebAssistedInsight => false,
    };
    if document_text.is_empty() && document_required {
        return Err(ValidationError::DocumentRequired);
    }
    Ok(())
}

/// In-memory state of one interactive session
pub struct AppState {
    document_text: String,
    document_status: Option<DocumentStatus>,
    active_load: Option<LoadToken>,
    next_load: u64,
    task: AnalysisTask,
    query: String,
    active_submission: Option<u64>,
    next_submission: u64,
    response: Option<AiResponseData>,
    analysis_error: Option<String>,
    chart: ChartType,
    log: SessionLog,
    preferences: Preferences,
}

impl AppState {
    pub fn new(log_capacity: usize, preferences: Preferences) -> Self {
        Self {
            document_text: String::new(),
            document_status: None,
            active_load: None,
            next_load: 0,
            task: AnalysisTask::default(),
            query: String::new(),
            active_submission: None,
            next_submission: 0,
            response: None,
            analysis_error: None,
            chart: ChartType::Bar,
            log: SessionLog::new(log_capacity),
            preferences,
        }
    }

    pub fn document_text(&self) -> &str {
        &self.document_text
    }

    pub fn document_status(&self) -> Option<&DocumentStatus> {
        self.document_status.as_ref()
    }

    pub fn is_document_loading(&self) -> bool {
        self.active_load.is_some()
    }

    pub fn task(&self) -> AnalysisTask {
        self.task
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_submitting(&self) -> bool {
        self.active_submission.is_some()
    }

    pub fn response(&self) -> Option<&AiResponseData> {
        self.response.as_ref()
    }

    pub fn analysis_error(&self) -> Option<&str> {
        self.analysis_error.as_deref()
    }

    pub fn chart(&self) -> ChartType {
        self.chart
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut SessionLog {
        &mut self.log
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
    }

    /// Pasted or typed text replaces the document outright
    pub fn set_document_text(&mut self, text: impl Into<String>) {
        self.document_text = text.into();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn select_task(&mut self, task: AnalysisTask) {
        self.task = task;
        if let Some(availability) = self.chart_availability() {
            self.chart = availability.reconcile(self.chart);
        }
    }

    /// Start a load: clears the current document and supersedes any load in flight.
    pub fn begin_document_load(&mut self) -> LoadToken {
        self.next_load += 1;
        let token = LoadToken(self.next_load);
        if let Some(previous) = self.active_load.replace(token) {
            tracing::debug!(superseded = previous.0, token = token.0, "Document load superseded");
        }
        self.document_text.clear();
        self.document_status = None;
        token
    }

    /// Apply a finished load. Returns `false` when the token is stale and the result was dropped.
    pub fn complete_document_load(&mut self, token: LoadToken, result: Result<LoadedDocument, LoadError>) -> bool {
        if self.active_load != Some(token) {
            tracing::debug!(token = token.0, "Discarding stale document load");
            return false;
        }
        self.active_load = None;

        match result {
            Ok(doc) => {
                self.document_text = doc.text;
                self.document_status = doc.notice.map(|message| DocumentStatus { message, is_error: false });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Document load failed");
                self.document_status = Some(DocumentStatus {
                    message: e.to_string(),
                    is_error: true,
                });
            }
        }
        true
    }

    pub fn no_file_selected(&mut self) {
        self.active_load = None;
        self.document_text.clear();
        self.document_status = Some(DocumentStatus {
            message: NO_FILE_SELECTED.to_string(),
            is_error: true,
        });
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self.task, &self.query, &self.document_text)
    }

    /// Validate and mark a submission in flight. Validation failures are shown inline.
    pub fn begin_submission(&mut self) -> Result<SubmissionTicket, SessionError> {
        if self.active_submission.is_some() {
            return Err(SessionError::Busy);
        }
        if let Err(e) = self.validate() {
            self.analysis_error = Some(e.to_string());
            return Err(e.into());
        }

        self.next_submission += 1;
        let id = self.next_submission;
        self.active_submission = Some(id);
        self.analysis_error = None;
        self.response = None;

        Ok(SubmissionTicket {
            id,
            task: self.task,
            query: self.query.clone(),
            document_text: self.document_text.clone(),
            model: self.preferences.model.clone(),
            prompt_summary: prompt_summary(self.task, &self.query, &self.document_text),
        })
    }

    /// Store the outcome, reset the chart selection and log the submission.
    pub fn complete_submission(
        &mut self,
        ticket: &SubmissionTicket,
        result: Result<AiResponseData, ModelError>,
    ) -> Result<&LogEntry, SessionError> {
        if self.active_submission != Some(ticket.id) {
            return Err(SessionError::StaleSubmission(ticket.id));
        }
        self.active_submission = None;

        let entry = match result {
            Ok(data) => {
                let entry = LogEntry::new(
                    ticket.task,
                    ticket.prompt_summary.clone(),
                    response_summary(&data.text),
                    false,
                );
                self.chart = ChartAvailability::from_response(self.task, &data).default_chart();
                self.response = Some(data);
                entry
            }
            Err(e) => {
                let message = e.to_string();
                self.analysis_error = Some(message.clone());
                LogEntry::new(ticket.task, ticket.prompt_summary.clone(), message, true)
            }
        };

        tracing::info!(
            submission = ticket.id,
            task = %ticket.task,
            is_error = entry.is_error,
            "Submission finished"
        );
        self.log.push(entry);
        self.log.latest().ok_or(SessionError::NoResponse)
    }

    pub fn chart_availability(&self) -> Option<ChartAvailability> {
        self.response
            .as_ref()
            .map(|data| ChartAvailability::from_response(self.task, data))
    }

    pub fn select_chart(&mut self, chart: ChartType) -> Result<(), SessionError> {
        let availability = self.chart_availability().ok_or(SessionError::NoResponse)?;
        if !availability.is_enabled(chart) {
            return Err(SessionError::ChartUnavailable { chart });
        }
        self.chart = chart;
        Ok(())
    }

    /// What the results panel shows right now
    pub fn panel(&self) -> Panel<'_> {
        if self.active_submission.is_some() {
            Panel::Loading
        } else if let Some(message) = &self.analysis_error {
            Panel::Error(message)
        } else if let Some(data) = &self.response {
            Panel::Response { task: self.task, data }
        } else {
            Panel::Empty
        }
    }
}
