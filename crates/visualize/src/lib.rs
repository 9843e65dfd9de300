pub mod palette;
pub mod eligibility;
pub mod charts;
pub mod layout;
pub mod graph;
pub mod matrix;
pub mod report;

pub use palette::{Appearance, Rgb, Rgba};
pub use eligibility::{ChartAvailability, ChartType, NumericFact, numerical_facts, parse_numeric};
pub use charts::{ChartSpec, format_grouped};
pub use graph::{LinkStyle, RelationshipGraph};
pub use matrix::AdjacencyMatrix;
pub use report::{Panel, ReportOptions, ResultView, render_report, render_text, route};
