use extract::{AiResponseData, AnalysisTask, Fact, FactValue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static CURRENCY_MARKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[$,€£%]").expect("currency pattern is valid"));
static LEADING_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("float pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Doughnut,
    RelationshipMap,
    AdjacencyMatrix,
}

impl ChartType {
    pub const ALL: [ChartType; 6] = [
        ChartType::Bar,
        ChartType::Line,
        ChartType::Pie,
        ChartType::Doughnut,
        ChartType::RelationshipMap,
        ChartType::AdjacencyMatrix,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Bar => "Bar",
            Self::Line => "Line",
            Self::Pie => "Pie",
            Self::Doughnut => "Doughnut",
            Self::RelationshipMap => "Relationship Map",
            Self::AdjacencyMatrix => "Adjacency Matrix",
        }
    }

    /// Text shown in the chart selector
    pub fn option_label(&self) -> String {
        if self.is_relationship() {
            self.label().to_string()
        } else {
            format!("{} Chart", self.label())
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Doughnut => "doughnut",
            Self::RelationshipMap => "map",
            Self::AdjacencyMatrix => "matrix",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.slug() == slug)
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self, Self::RelationshipMap | Self::AdjacencyMatrix)
    }

    /// Pie and doughnut colour each slice separately
    pub fn is_radial(&self) -> bool {
        matches!(self, Self::Pie | Self::Doughnut)
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read a chartable number out of a fact value.
///
/// Currency and percent marks and thousands separators are stripped, then the
/// longest leading decimal literal is parsed. Non-finite results are rejected.
pub fn parse_numeric(value: &FactValue) -> Option<f64> {
    let rendered = value.to_string();
    let cleaned = CURRENCY_MARKS.replace_all(rendered.trim(), "");
    let literal = LEADING_FLOAT.find(cleaned.trim_start())?;
    literal.as_str().parse::<f64>().ok().filter(|n| n.is_finite())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericFact {
    pub label: String,
    pub value: f64,
    pub original: FactValue,
}

/// Facts that parse as numbers, in their original order
pub fn numerical_facts(facts: &[Fact]) -> Vec<NumericFact> {
    facts
        .iter()
        .filter_map(|fact| {
            parse_numeric(&fact.value).map(|value| NumericFact {
                label: fact.name.clone(),
                value,
                original: fact.value.clone(),
            })
        })
        .collect()
}

/// Which chart families the current data can feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartAvailability {
    pub task: AnalysisTask,
    pub numerical: bool,
    pub relationship: bool,
}

impl ChartAvailability {
    pub fn new(task: AnalysisTask, facts: &[Fact]) -> Self {
        Self {
            task,
            numerical: !numerical_facts(facts).is_empty(),
            relationship: task == AnalysisTask::ThematicAnalysis && !facts.is_empty(),
        }
    }

    pub fn from_response(task: AnalysisTask, data: &AiResponseData) -> Self {
        Self::new(task, data.facts())
    }

    /// Whether a visualization section is shown at all
    pub fn any(&self) -> bool {
        self.numerical || self.relationship
    }

    pub fn is_enabled(&self, chart: ChartType) -> bool {
        if chart.is_relationship() {
            self.relationship
        } else {
            self.numerical
        }
    }

    /// Selector entries in display order, with their enabled flag
    pub fn options(&self) -> Vec<(ChartType, bool)> {
        let traditional = [ChartType::Bar, ChartType::Line, ChartType::Pie, ChartType::Doughnut];
        let mut options = Vec::with_capacity(6);
        if self.task == AnalysisTask::ThematicAnalysis {
            options.push((ChartType::RelationshipMap, self.relationship));
            options.push((ChartType::AdjacencyMatrix, self.relationship));
        }
        options.extend(traditional.into_iter().map(|c| (c, self.numerical)));
        options
    }

    pub fn enabled(&self) -> Vec<ChartType> {
        self.options().into_iter().filter(|(_, on)| *on).map(|(c, _)| c).collect()
    }

    pub fn default_chart(&self) -> ChartType {
        if self.task == AnalysisTask::ThematicAnalysis && self.relationship {
            ChartType::RelationshipMap
        } else {
            ChartType::Bar
        }
    }

    /// Keep a still-valid selection, otherwise fall back to the default
    pub fn reconcile(&self, current: ChartType) -> ChartType {
        if self.is_enabled(current) {
            current
        } else {
            self.default_chart()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(name: &str, value: FactValue) -> Fact {
        Fact { name: name.into(), value }
    }

    fn text(s: &str) -> FactValue {
        FactValue::Text(s.into())
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(&text("$5,000,000")), Some(5_000_000.0));
        assert_eq!(parse_numeric(&text("12.5%")), Some(12.5));
        assert_eq!(parse_numeric(&text("€1,234.50")), Some(1234.5));
        assert_eq!(parse_numeric(&text("  42 million")), Some(42.0));
        assert_eq!(parse_numeric(&text("-3.2e2")), Some(-320.0));
        assert_eq!(parse_numeric(&FactValue::Number(7.0)), Some(7.0));
        assert_eq!(parse_numeric(&text("Jane Doe")), None);
        assert_eq!(parse_numeric(&text("N/A")), None);
        assert_eq!(parse_numeric(&FactValue::Null), None);
        assert_eq!(parse_numeric(&FactValue::Bool(true)), None);
        assert_eq!(parse_numeric(&text("1e999")), None);
    }

    #[test]
    fn test_numerical_facts_keep_order() {
        let facts = vec![
            fact("Revenue", text("$5,000,000")),
            fact("CEO", text("Jane Doe")),
            fact("Margin", text("12%")),
        ];
        let numeric = numerical_facts(&facts);
        let labels: Vec<_> = numeric.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["Revenue", "Margin"]);
    }

    #[test]
    fn test_thematic_defaults_to_relationship_map() {
        let facts = vec![fact("A", FactValue::Number(5.0)), fact("B", FactValue::Number(3.0))];
        let availability = ChartAvailability::new(AnalysisTask::ThematicAnalysis, &facts);
        assert!(availability.relationship && availability.numerical);
        assert_eq!(availability.default_chart(), ChartType::RelationshipMap);
        assert_eq!(availability.options()[0], (ChartType::RelationshipMap, true));
        assert_eq!(availability.enabled().len(), 6);
    }

    #[test]
    fn test_fact_extraction_never_offers_relationship_charts() {
        let facts = vec![fact("Revenue", text("$5,000,000")), fact("CEO", text("Jane Doe"))];
        let availability = ChartAvailability::new(AnalysisTask::FactExtraction, &facts);
        assert!(!availability.relationship);
        assert!(availability.options().iter().all(|(c, _)| !c.is_relationship()));
        assert_eq!(availability.default_chart(), ChartType::Bar);
        assert_eq!(availability.reconcile(ChartType::AdjacencyMatrix), ChartType::Bar);
        assert_eq!(availability.reconcile(ChartType::Pie), ChartType::Pie);
    }

    #[test]
    fn test_non_numeric_facts_disable_traditional_charts() {
        let facts = vec![fact("CEO", text("Jane Doe"))];
        let availability = ChartAvailability::new(AnalysisTask::FactExtraction, &facts);
        assert!(!availability.any());
        assert!(availability.enabled().is_empty());

        let themes = vec![fact("Risk", text("high"))];
        let thematic = ChartAvailability::new(AnalysisTask::ThematicAnalysis, &themes);
        assert!(thematic.relationship && !thematic.numerical);
        assert_eq!(thematic.reconcile(ChartType::Line), ChartType::RelationshipMap);
    }

    #[test]
    fn test_chart_slugs() {
        for chart in ChartType::ALL {
            assert_eq!(ChartType::from_slug(chart.slug()), Some(chart));
        }
        assert_eq!(ChartType::from_slug("MAP"), Some(ChartType::RelationshipMap));
        assert_eq!(ChartType::Bar.option_label(), "Bar Chart");
        assert_eq!(ChartType::AdjacencyMatrix.option_label(), "Adjacency Matrix");
    }
}
