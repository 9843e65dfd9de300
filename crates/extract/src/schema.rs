use serde::{Deserialize, Serialize};
use std::fmt;

/// The five analysis tasks a submission can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisTask {
    FactExtraction,
    #[default]
    QueryDocument,
    SummarizeDocument,
    WebAssistedInsight,
    ThematicAnalysis,
}

impl AnalysisTask {
    pub const ALL: [AnalysisTask; 5] = [
        AnalysisTask::FactExtraction,
        AnalysisTask::QueryDocument,
        AnalysisTask::SummarizeDocument,
        AnalysisTask::WebAssistedInsight,
        AnalysisTask::ThematicAnalysis,
    ];

    /// Human-readable label, also used inside parser warnings
    pub fn label(&self) -> &'static str {
        match self {
            Self::FactExtraction => "Fact Extraction (from provided text)",
            Self::QueryDocument => "Query Provided Text",
            Self::SummarizeDocument => "Summarize Provided Text",
            Self::WebAssistedInsight => "Web-Assisted Insight",
            Self::ThematicAnalysis => "Thematic Content Analysis",
        }
    }

    /// Short identifier used on the command line
    pub fn slug(&self) -> &'static str {
        match self {
            Self::FactExtraction => "facts",
            Self::QueryDocument => "query",
            Self::SummarizeDocument => "summarize",
            Self::WebAssistedInsight => "web",
            Self::ThematicAnalysis => "themes",
        }
    }

    /// Guidance shown next to the task selector
    pub fn description(&self) -> &'static str {
        match self {
            Self::FactExtraction => {
                "Input a document and specify facts to extract (e.g., 'Revenue, Net Profit, CEO'). AI will return JSON of facts and their values, which can be charted."
            }
            Self::QueryDocument => "Input a document and ask a specific question about its content.",
            Self::SummarizeDocument => {
                "Input a document to get a summary. Optionally, specify a focus for the summary in the query field."
            }
            Self::WebAssistedInsight => {
                "Ask a question requiring up-to-date information. The AI will use Google Search. Document input is optional context."
            }
            Self::ThematicAnalysis => {
                "Input a document. AI will identify key themes/topics and their estimated prominence. Results are returned as JSON and can be charted. Query input is optional for guidance."
            }
        }
    }

    /// Tasks whose reply must be a strict JSON object
    pub fn expects_json(&self) -> bool {
        matches!(self, Self::FactExtraction | Self::ThematicAnalysis)
    }

    pub fn uses_search(&self) -> bool {
        matches!(self, Self::WebAssistedInsight)
    }

    /// Resolve a display label back to a task
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.slug() == slug)
    }
}

impl fmt::Display for AnalysisTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single extracted value. Themes reuse this with a numeric prominence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FactValue {
    /// Nested arrays and objects are kept as their compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest decimal form: integral values print without a trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub name: String,
    pub value: FactValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRelationship {
    pub source: String,
    pub target: String,
    pub strength: f64,
}

/// A web citation supplied with search-grounded answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub uri: String,
    pub title: String,
}

impl GroundingChunk {
    /// Title when present, otherwise the URI
    pub fn display_name(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.uri
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiResponseData {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_facts: Option<Vec<Fact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_relationships: Option<Vec<ThemeRelationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_chunks: Option<Vec<GroundingChunk>>,
}

impl AiResponseData {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn facts(&self) -> &[Fact] {
        self.extracted_facts.as_deref().unwrap_or(&[])
    }

    pub fn relationships(&self) -> &[ThemeRelationship] {
        self.theme_relationships.as_deref().unwrap_or(&[])
    }

    pub fn citations(&self) -> &[GroundingChunk] {
        self.source_chunks.as_deref().unwrap_or(&[])
    }

    pub fn fact(&self, name: &str) -> Option<&FactValue> {
        self.facts().iter().find(|f| f.name == name).map(|f| &f.value)
    }
}
