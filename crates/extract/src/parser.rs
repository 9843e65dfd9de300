use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::schema::{AiResponseData, AnalysisTask, Fact, FactValue, GroundingChunk, ThemeRelationship};

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$").expect("fence pattern is valid"));

/// Outcome of reading a model reply as JSON. Callers must handle every branch.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    /// A JSON object, ready to be mapped into facts or themes
    Structured(Map<String, Value>),
    /// Valid JSON, but not an object
    NotAnObject(Value),
    /// Not JSON at all; the raw text must be preserved
    Unparseable,
}

impl ParsedReply {
    pub fn from_raw(raw: &str) -> Self {
        match parse_json_response(raw) {
            Some(Value::Object(map)) => Self::Structured(map),
            Some(other) => Self::NotAnObject(other),
            None => Self::Unparseable,
        }
    }
}

/// Remove a single fenced code block wrapper (language tag optional).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match FENCE.captures(trimmed).and_then(|caps| caps.get(2)) {
        Some(inner) if !inner.as_str().is_empty() => inner.as_str().trim(),
        _ => trimmed,
    }
}

/// Best-effort JSON parse. Never fails loudly: `None` means "keep the raw text".
pub fn parse_json_response(raw: &str) -> Option<Value> {
    match serde_json::from_str(strip_code_fence(raw)) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Model reply is not valid JSON");
            None
        }
    }
}

/// Turn a raw model reply into the response the renderer consumes.
pub fn interpret_reply(task: AnalysisTask, raw_text: &str, grounding: Vec<GroundingChunk>) -> AiResponseData {
    let mut data = AiResponseData::from_text(raw_text);

    if task.expects_json() {
        if raw_text.trim().is_empty() {
            tracing::warn!(task = %task, "Expected JSON but the model returned no text");
            data.text = format!(
                "AI Warning: Expected JSON for {} but received an empty response from the AI.",
                task.label()
            );
        } else {
            match ParsedReply::from_raw(raw_text) {
                ParsedReply::Structured(map) => apply_structured(task, &map, &mut data),
                ParsedReply::NotAnObject(value) => {
                    tracing::warn!(task = %task, kind = json_kind(&value), "Expected a JSON object");
                    data.text = format!(
                        "AI Warning: Expected a JSON object for {} but received a JSON {}. Raw AI output: {}",
                        task.label(),
                        json_kind(&value),
                        raw_text
                    );
                }
                ParsedReply::Unparseable => {
                    tracing::warn!(task = %task, "Expected JSON but parsing failed");
                    data.text = format!(
                        "AI Warning: Expected JSON for {} but parsing failed. Raw AI output: {}",
                        task.label(),
                        raw_text
                    );
                }
            }
        }
    }

    if task.uses_search() && !grounding.is_empty() {
        data.source_chunks = Some(grounding);
    }

    data
}

fn apply_structured(task: AnalysisTask, map: &Map<String, Value>, data: &mut AiResponseData) {
    match task {
        AnalysisTask::ThematicAnalysis => {
            let themes = match map.get("themes") {
                Some(Value::Object(themes)) => themes,
                _ => map,
            };
            data.extracted_facts = Some(facts_from_map(themes));
            data.theme_relationships = Some(relationships_from(map.get("relationships")));
        }
        _ => {
            data.extracted_facts = Some(facts_from_map(map));
        }
    }
}

fn facts_from_map(map: &Map<String, Value>) -> Vec<Fact> {
    map.iter()
        .map(|(name, value)| Fact {
            name: name.clone(),
            value: FactValue::from_json(value),
        })
        .collect()
}

/// Missing or malformed `relationships` becomes an empty list; bad entries are dropped.
fn relationships_from(value: Option<&Value>) -> Vec<ThemeRelationship> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    let mut relationships = Vec::with_capacity(items.len());
    for item in items {
        match relationship_from(item) {
            Some(rel) => relationships.push(rel),
            None => tracing::debug!(entry = %item, "Dropping malformed relationship"),
        }
    }
    relationships
}

fn relationship_from(item: &Value) -> Option<ThemeRelationship> {
    let source = item.get("source")?.as_str()?;
    let target = item.get("target")?.as_str()?;
    let strength = match item.get("strength")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    Some(ThemeRelationship {
        source: source.to_string(),
        target: target.to_string(),
        strength,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_json_matches_unwrapped() {
        let clean = r#"{"Revenue":"5000000","CEO":"Jane Doe"}"#;
        let fenced = format!("```json\n{clean}\n```");
        let untagged = format!("```\n{clean}\n```");

        assert_eq!(parse_json_response(&fenced), parse_json_response(clean));
        assert_eq!(parse_json_response(&untagged), parse_json_response(clean));
        assert!(parse_json_response(clean).is_some());
    }

    #[test]
    fn test_clean_json_is_left_alone() {
        let clean = r#"  {"a": 1}  "#;
        assert_eq!(strip_code_fence(clean), r#"{"a": 1}"#);
        assert_eq!(parse_json_response(clean), Some(json!({"a": 1})));
    }

    #[test]
    fn test_garbage_returns_none() {
        assert_eq!(parse_json_response("Sure! Here are the facts: Revenue is high."), None);
        assert_eq!(parse_json_response("```json\n{broken\n```"), None);
        assert_eq!(parse_json_response(""), None);
    }

    #[test]
    fn test_fact_extraction_keeps_order() {
        let data = interpret_reply(
            AnalysisTask::FactExtraction,
            r#"{"Revenue":"5000000","CEO":"Jane Doe","Profit":null}"#,
            Vec::new(),
        );
        let names: Vec<_> = data.facts().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Revenue", "CEO", "Profit"]);
        assert_eq!(data.fact("Profit"), Some(&FactValue::Null));
        assert!(data.theme_relationships.is_none());
    }

    #[test]
    fn test_unparseable_reply_keeps_raw_text_with_warning() {
        let raw = "Revenue: five million";
        let data = interpret_reply(AnalysisTask::FactExtraction, raw, Vec::new());
        assert!(data.extracted_facts.is_none());
        assert!(data.text.starts_with("AI Warning: Expected JSON for Fact Extraction (from provided text) but parsing failed."));
        assert!(data.text.ends_with(raw));
    }

    #[test]
    fn test_empty_reply_warns() {
        let data = interpret_reply(AnalysisTask::ThematicAnalysis, "   ", Vec::new());
        assert!(data.text.contains("received an empty response"));
        assert!(data.extracted_facts.is_none());
    }

    #[test]
    fn test_non_object_json_is_a_shape_warning() {
        let data = interpret_reply(AnalysisTask::FactExtraction, "[1, 2]", Vec::new());
        assert!(data.extracted_facts.is_none());
        assert!(data.text.contains("received a JSON array"));
        assert!(data.text.ends_with("[1, 2]"));
    }

    #[test]
    fn test_themes_without_relationships_yield_empty_list() {
        let data = interpret_reply(AnalysisTask::ThematicAnalysis, r#"{"themes":{"A":5,"B":3}}"#, Vec::new());
        assert_eq!(data.facts().len(), 2);
        assert_eq!(data.theme_relationships, Some(Vec::new()));
    }

    #[test]
    fn test_themes_fall_back_to_whole_object() {
        let data = interpret_reply(AnalysisTask::ThematicAnalysis, r#"{"Growth":7,"Risk":4}"#, Vec::new());
        assert_eq!(data.fact("Growth"), Some(&FactValue::Number(7.0)));
        assert_eq!(data.relationships(), &[]);
    }

    #[test]
    fn test_malformed_relationships_are_normalized() {
        let raw = r#"{
            "themes": {"A": 5, "B": 3},
            "relationships": [
                {"source": "A", "target": "B", "strength": 0.7},
                {"source": "A", "strength": 0.9},
                {"source": "B", "target": "B", "strength": "0.6"},
                "nonsense"
            ]
        }"#;
        let data = interpret_reply(AnalysisTask::ThematicAnalysis, raw, Vec::new());
        let rels = data.relationships();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0], ThemeRelationship { source: "A".into(), target: "B".into(), strength: 0.7 });
        assert_eq!(rels[1].source, rels[1].target);

        let not_array = interpret_reply(
            AnalysisTask::ThematicAnalysis,
            r#"{"themes":{"A":1},"relationships":"none"}"#,
            Vec::new(),
        );
        assert_eq!(not_array.theme_relationships, Some(Vec::new()));
    }

    #[test]
    fn test_prose_tasks_pass_text_through() {
        let data = interpret_reply(AnalysisTask::QueryDocument, "```json\n{}\n```", Vec::new());
        assert_eq!(data.text, "```json\n{}\n```");
        assert!(data.extracted_facts.is_none());
    }

    #[test]
    fn test_grounding_only_attached_for_web_task() {
        let chunk = GroundingChunk { uri: "https://a.example".into(), title: "A".into() };
        let web = interpret_reply(AnalysisTask::WebAssistedInsight, "answer", vec![chunk.clone()]);
        assert_eq!(web.citations(), &[chunk.clone()]);

        let query = interpret_reply(AnalysisTask::QueryDocument, "answer", vec![chunk]);
        assert!(query.source_chunks.is_none());
    }
}
