use anyhow::Result;
use extract::{AiResponseData, AnalysisTask, GroundingChunk};

use crate::charts::ChartSpec;
use crate::eligibility::{ChartAvailability, ChartType};
use crate::graph::RelationshipGraph;
use crate::matrix::AdjacencyMatrix;
use crate::palette::{Appearance, Surface};

pub const EMPTY_PROMPT: &str = "Enter your document and query, then run an analysis to see results.";
pub const LOADING_MESSAGE: &str = "Generating insights... This may take a moment.";
pub const CHART_NOTE: &str = "Note: Charts display items recognized as numerical or structured relationships. Complex values or non-standard formats might not be visualized accurately.";
const NO_FACTS: &str = "No facts or themes were extracted by the AI for this document, or the structure was not recognized.";
const NO_NUMBERS: &str = "No numerical data available to display this chart type for the current themes/facts. Check if themes have numerical prominence scores or if facts are numerical.";
const NO_MAP_DATA: &str = "Insufficient data for Relationship Map. AI might not have found significant relationships or themes.";
const EMPTY_MAP: &str = "No theme relationships to display, or data is insufficient for a map.";
const NO_MATRIX_DATA: &str = "Insufficient data for Adjacency Matrix. AI might not have found themes or relationships.";

/// Which of the two mutually exclusive result views a response gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultView {
    Structured,
    Prose,
}

/// Facts/themes view only for the JSON tasks, and only when something was extracted.
pub fn route(task: AnalysisTask, data: &AiResponseData) -> ResultView {
    if task.expects_json() && !data.facts().is_empty() {
        ResultView::Structured
    } else {
        ResultView::Prose
    }
}

/// What the results panel is currently showing
#[derive(Debug, Clone, Copy)]
pub enum Panel<'a> {
    Empty,
    Loading,
    Error(&'a str),
    Response { task: AnalysisTask, data: &'a AiResponseData },
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Requested chart; reconciled against what the data supports
    pub chart: Option<ChartType>,
    pub appearance: Appearance,
    pub hovered_theme: Option<String>,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            chart: None,
            appearance: Appearance::Light,
            hovered_theme: None,
            chart_width: 720,
            chart_height: 350,
        }
    }
}

impl ReportOptions {
    pub fn with_chart(mut self, chart: Option<ChartType>) -> Self {
        self.chart = chart;
        self
    }

    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Self-contained HTML page for the results panel
pub fn render_report(panel: &Panel<'_>, options: &ReportOptions) -> Result<String> {
    let body = match panel {
        Panel::Empty => format!("<p class=\"muted placeholder\">{}</p>", EMPTY_PROMPT),
        Panel::Loading => format!("<p class=\"muted placeholder\">{}</p>", LOADING_MESSAGE),
        Panel::Error(message) => format!(
            "<div class=\"error\" role=\"alert\"><p><strong>Error</strong></p><p>{}</p></div>",
            escape_html(message)
        ),
        Panel::Response { task, data } => render_response(*task, data, options)?,
    };

    Ok(format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"><title>Report Insights</title><style>{}</style></head><body>{}</body></html>\n",
        stylesheet(options.appearance),
        body
    ))
}

fn render_response(task: AnalysisTask, data: &AiResponseData, options: &ReportOptions) -> Result<String> {
    let mut html = match route(task, data) {
        ResultView::Structured => render_structured(task, data, options)?,
        ResultView::Prose => format!("<div class=\"prose\"><p>{}</p></div>", escape_html(&data.text)),
    };

    if !data.citations().is_empty() {
        html.push_str(&render_citations(data.citations()));
    }
    Ok(html)
}

fn render_structured(task: AnalysisTask, data: &AiResponseData, options: &ReportOptions) -> Result<String> {
    let thematic = task == AnalysisTask::ThematicAnalysis;
    let (title, key_header, value_header) = if thematic {
        ("Identified Themes &amp; Relationships", "Theme/Topic", "Prominence/Score")
    } else {
        ("Extracted Facts", "Fact", "Value")
    };

    let mut html = format!("<h4>{}:</h4>", title);
    if data.facts().is_empty() {
        html.push_str(&format!("<p class=\"muted\">{}</p>", NO_FACTS));
    } else {
        html.push_str(&format!(
            "<table class=\"facts\"><thead><tr><th>{}</th><th>{}</th></tr></thead><tbody>",
            key_header, value_header
        ));
        for fact in data.facts() {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape_html(&fact.name),
                escape_html(&fact.value.to_string())
            ));
        }
        html.push_str("</tbody></table>");
    }

    let availability = ChartAvailability::from_response(task, data);
    if !availability.any() {
        return Ok(html);
    }

    let selected = match options.chart {
        Some(chart) => availability.reconcile(chart),
        None => availability.default_chart(),
    };

    html.push_str("<section class=\"visualization\"><h5>Data Visualization</h5><select id=\"chartTypeSelect\" aria-label=\"Select chart type for visualization\">");
    for (chart, enabled) in availability.options() {
        html.push_str(&format!(
            "<option value=\"{}\"{}{}>{}</option>",
            chart.label(),
            if chart == selected { " selected" } else { "" },
            if enabled { "" } else { " disabled" },
            chart.option_label()
        ));
    }
    html.push_str("</select><div class=\"chart\">");
    html.push_str(&render_chart(selected, task, data, &availability, options)?);
    html.push_str(&format!("</div></section><p class=\"note\">{}</p>", CHART_NOTE));
    Ok(html)
}

fn render_chart(
    chart: ChartType,
    task: AnalysisTask,
    data: &AiResponseData,
    availability: &ChartAvailability,
    options: &ReportOptions,
) -> Result<String> {
    let muted = |msg: &str| format!("<p class=\"muted\">{}</p>", msg);

    match chart {
        ChartType::RelationshipMap => {
            if !availability.relationship {
                return Ok(muted(NO_MAP_DATA));
            }
            let graph = RelationshipGraph::build(data.facts(), data.relationships(), options.appearance);
            if graph.is_empty() {
                return Ok(muted(EMPTY_MAP));
            }
            graph.render_svg(options.hovered_theme.as_deref(), options.chart_width, options.chart_height)
        }
        ChartType::AdjacencyMatrix => {
            if !availability.relationship {
                return Ok(muted(NO_MATRIX_DATA));
            }
            Ok(AdjacencyMatrix::build(data.facts(), data.relationships(), options.appearance).to_html())
        }
        _ => match ChartSpec::build(chart, task, data.facts(), options.appearance) {
            Some(spec) => spec.render_svg(options.chart_width, options.chart_height),
            None => Ok(muted(NO_NUMBERS)),
        },
    }
}

fn render_citations(chunks: &[GroundingChunk]) -> String {
    let mut html = String::from("<div class=\"sources\"><h4>Sources (from Web Search):</h4><ul>");
    for chunk in chunks {
        html.push_str(&format!(
            "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></li>",
            escape_html(&chunk.uri),
            escape_html(chunk.display_name())
        ));
    }
    html.push_str("</ul></div>");
    html
}

fn stylesheet(appearance: Appearance) -> String {
    let s = Surface::for_appearance(appearance);
    format!(
        "body{{font-family:sans-serif;background:{panel};color:{text};margin:1.5rem}}\
         .muted{{color:{muted};text-align:center}}\
         .prose p{{white-space:pre-wrap;overflow-wrap:anywhere}}\
         .error{{border-left:4px solid rgb(239, 68, 68);padding:0.75rem;background:rgba(239, 68, 68, 0.12)}}\
         table{{border-collapse:collapse}}\
         th,td{{border:1px solid {border};padding:0.4rem 0.8rem;text-align:left}}\
         .facts td:last-child{{white-space:pre-wrap}}\
         .matrix td{{text-align:center}}\
         .matrix th.vertical{{writing-mode:vertical-rl;transform:rotate(180deg)}}\
         .chart{{min-height:300px}}\
         .note{{font-size:0.75rem;color:{muted};text-align:center}}\
         h4,h5{{color:{title}}}",
        panel = s.panel,
        text = s.text,
        muted = s.muted,
        border = s.border,
        title = s.title,
    )
}

/// Plain-text rendering for terminals
pub fn render_text(panel: &Panel<'_>) -> String {
    match panel {
        Panel::Empty => EMPTY_PROMPT.to_string(),
        Panel::Loading => LOADING_MESSAGE.to_string(),
        Panel::Error(message) => format!("Error\n{}", message),
        Panel::Response { task, data } => {
            let mut out = match route(*task, data) {
                ResultView::Prose => data.text.clone(),
                ResultView::Structured => structured_text(*task, data),
            };

            if !data.citations().is_empty() {
                out.push_str("\n\nSources (from Web Search):");
                for chunk in data.citations() {
                    if chunk.title.trim().is_empty() {
                        out.push_str(&format!("\n  - {}", chunk.uri));
                    } else {
                        out.push_str(&format!("\n  - {} <{}>", chunk.title, chunk.uri));
                    }
                }
            }
            out
        }
    }
}

fn structured_text(task: AnalysisTask, data: &AiResponseData) -> String {
    let thematic = task == AnalysisTask::ThematicAnalysis;
    let (title, key_header, value_header) = if thematic {
        ("Identified Themes & Relationships", "Theme/Topic", "Prominence/Score")
    } else {
        ("Extracted Facts", "Fact", "Value")
    };

    let width = data
        .facts()
        .iter()
        .map(|f| f.name.chars().count())
        .chain(std::iter::once(key_header.len()))
        .max()
        .unwrap_or(0);

    let mut out = format!("{}:\n\n{:width$}  {}\n", title, key_header, value_header, width = width);
    out.push_str(&format!("{}  {}\n", "-".repeat(width), "-".repeat(value_header.len())));
    for fact in data.facts() {
        out.push_str(&format!("{:width$}  {}\n", fact.name, fact.value, width = width));
    }

    if thematic && !data.relationships().is_empty() {
        out.push_str("\nRelationships:\n");
        for rel in data.relationships() {
            out.push_str(&format!("  {} -> {} ({:.2})\n", rel.source, rel.target, rel.strength));
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{Fact, FactValue, ThemeRelationship};

    fn facts_response() -> AiResponseData {
        AiResponseData {
            text: "{\"Revenue\":\"$5,000,000\",\"CEO\":\"Jane Doe\"}".into(),
            extracted_facts: Some(vec![
                Fact { name: "Revenue".into(), value: FactValue::Text("$5,000,000".into()) },
                Fact { name: "CEO".into(), value: FactValue::Text("Jane Doe".into()) },
            ]),
            ..Default::default()
        }
    }

    fn themes_response() -> AiResponseData {
        AiResponseData {
            text: String::new(),
            extracted_facts: Some(vec![
                Fact { name: "Rates".into(), value: FactValue::Number(9.0) },
                Fact { name: "Growth".into(), value: FactValue::Number(7.0) },
            ]),
            theme_relationships: Some(vec![ThemeRelationship {
                source: "Rates".into(),
                target: "Growth".into(),
                strength: 0.8,
            }]),
            source_chunks: None,
        }
    }

    #[test]
    fn test_default_options() {
        let options = ReportOptions { chart: Some(ChartType::Pie), ..Default::default() };
        assert_eq!(options.chart, Some(ChartType::Pie));
        assert_eq!(options.appearance, Appearance::Light);
        assert_eq!((options.chart_width, options.chart_height), (720, 350));
        assert!(options.hovered_theme.is_none());
    }

    #[test]
    fn test_route_requires_json_task_and_facts() {
        let data = facts_response();
        assert_eq!(route(AnalysisTask::FactExtraction, &data), ResultView::Structured);
        assert_eq!(route(AnalysisTask::ThematicAnalysis, &data), ResultView::Structured);
        assert_eq!(route(AnalysisTask::QueryDocument, &data), ResultView::Prose);
        assert_eq!(route(AnalysisTask::FactExtraction, &AiResponseData::from_text("x")), ResultView::Prose);

        let empty = AiResponseData { extracted_facts: Some(Vec::new()), ..Default::default() };
        assert_eq!(route(AnalysisTask::FactExtraction, &empty), ResultView::Prose);
    }

    #[test]
    fn test_fact_report_has_table_and_bar_chart() {
        let data = facts_response();
        let html = render_report(
            &Panel::Response { task: AnalysisTask::FactExtraction, data: &data },
            &ReportOptions::default(),
        )
        .unwrap();

        assert!(html.contains("<h4>Extracted Facts:</h4>"));
        assert!(html.contains("<th>Fact</th><th>Value</th>"));
        assert!(html.contains("<option value=\"Bar\" selected>Bar Chart</option>"));
        assert!(!html.contains("Relationship Map"));
        assert!(html.contains("<svg"));
        assert!(html.contains(CHART_NOTE));
    }

    #[test]
    fn test_thematic_report_defaults_to_map_and_reconciles_selection() {
        let data = themes_response();
        let panel = Panel::Response { task: AnalysisTask::ThematicAnalysis, data: &data };

        let html = render_report(&panel, &ReportOptions::default()).unwrap();
        assert!(html.contains("Identified Themes &amp; Relationships:"));
        assert!(html.contains("<th>Theme/Topic</th><th>Prominence/Score</th>"));
        assert!(html.contains("<option value=\"Relationship Map\" selected>"));

        let matrix = render_report(&panel, &ReportOptions::default().with_chart(Some(ChartType::AdjacencyMatrix))).unwrap();
        assert!(matrix.contains("<table class=\"matrix\">"));
        assert!(matrix.contains("0.80"));
    }

    #[test]
    fn test_prose_is_escaped() {
        let data = AiResponseData::from_text("<script>alert(1)</script> & more");
        let html = render_report(
            &Panel::Response { task: AnalysisTask::QueryDocument, data: &data },
            &ReportOptions::default(),
        )
        .unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; more"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_citations_rendered_in_both_views() {
        let chunk = GroundingChunk { uri: "https://example.com/a?b=1&c=2".into(), title: String::new() };
        let mut data = AiResponseData::from_text("answer");
        data.source_chunks = Some(vec![chunk]);

        let html = render_report(
            &Panel::Response { task: AnalysisTask::WebAssistedInsight, data: &data },
            &ReportOptions::default(),
        )
        .unwrap();
        assert!(html.contains("Sources (from Web Search):"));
        assert!(html.contains("href=\"https://example.com/a?b=1&amp;c=2\""));

        let text = render_text(&Panel::Response { task: AnalysisTask::WebAssistedInsight, data: &data });
        assert!(text.ends_with("  - https://example.com/a?b=1&c=2"));
    }

    #[test]
    fn test_placeholder_states() {
        let error = render_report(&Panel::Error("boom"), &ReportOptions::default()).unwrap();
        assert!(error.contains("role=\"alert\""));
        assert!(error.contains("boom"));
        assert_eq!(render_text(&Panel::Empty), EMPTY_PROMPT);
        assert_eq!(render_text(&Panel::Loading), LOADING_MESSAGE);
    }

    #[test]
    fn test_text_table() {
        let data = themes_response();
        let text = render_text(&Panel::Response { task: AnalysisTask::ThematicAnalysis, data: &data });
        assert!(text.starts_with("Identified Themes & Relationships:"));
        assert!(text.contains(&format!("{:11}  9", "Rates")));
        assert!(text.contains("Rates -> Growth (0.80)"));
    }
}
