use extract::{Fact, FactValue, ThemeRelationship};

use crate::palette::{Appearance, Rgb, TextTone, text_tone_for};
use crate::report::escape_html;

const PROMINENCE_MAX: f64 = 10.0;
const STRENGTH_MAX: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Prominence,
    Strength,
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixCell {
    pub kind: CellKind,
    pub content: String,
    pub title: String,
    pub background: Rgb,
    pub text: TextTone,
}

/// Theme-by-theme grid: prominence on the diagonal, strongest recorded link elsewhere
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix {
    pub themes: Vec<String>,
    pub rows: Vec<Vec<MatrixCell>>,
}

fn scale_color(value: f64, kind: CellKind, appearance: Appearance) -> Rgb {
    let max = if kind == CellKind::Prominence { PROMINENCE_MAX } else { STRENGTH_MAX };
    let t = value / max;
    if t.is_nan() {
        return neutral(appearance);
    }

    let (base, target) = match (appearance, kind) {
        (Appearance::Dark, CellKind::Prominence) => (Rgb::new(22, 78, 99), Rgb::new(74, 222, 128)),
        (Appearance::Dark, _) => (Rgb::new(30, 58, 138), Rgb::new(96, 165, 250)),
        (Appearance::Light, CellKind::Prominence) => (Rgb::new(230, 245, 230), Rgb::new(34, 139, 34)),
        (Appearance::Light, _) => (Rgb::new(220, 235, 255), Rgb::new(54, 162, 235)),
    };
    base.interpolate(target, t)
}

fn neutral(appearance: Appearance) -> Rgb {
    match appearance {
        Appearance::Dark => Rgb::new(51, 65, 85),
        Appearance::Light => Rgb::new(248, 250, 252),
    }
}

impl AdjacencyMatrix {
    pub fn build(themes: &[Fact], relationships: &[ThemeRelationship], appearance: Appearance) -> Self {
        let mut names: Vec<String> = themes.iter().map(|t| t.name.clone()).collect();
        names.sort();

        let prominence = |name: &str| themes.iter().find(|t| t.name == name).map(|t| &t.value);

        let rows = names
            .iter()
            .map(|row| {
                names
                    .iter()
                    .map(|col| {
                        if row == col {
                            let value = prominence(row).cloned().unwrap_or(FactValue::Null);
                            let (content, numeric) = match value {
                                FactValue::Number(p) => (format!("{:.1}", p), p),
                                ref other => (other.to_string(), 0.0),
                            };
                            let background = scale_color(numeric, CellKind::Prominence, appearance);
                            MatrixCell {
                                kind: CellKind::Prominence,
                                title: format!("Prominence of {}: {}", row, content),
                                content,
                                background,
                                text: text_tone_for(background, appearance),
                            }
                        } else {
                            let link = relationships.iter().find(|r| {
                                (r.source == *row && r.target == *col) || (r.source == *col && r.target == *row)
                            });
                            match link {
                                Some(link) => {
                                    let content = format!("{:.2}", link.strength);
                                    let background = scale_color(link.strength, CellKind::Strength, appearance);
                                    MatrixCell {
                                        kind: CellKind::Strength,
                                        title: format!("Relationship between {} & {}: {}", row, col, content),
                                        content,
                                        background,
                                        text: text_tone_for(background, appearance),
                                    }
                                }
                                None => {
                                    let background = neutral(appearance);
                                    MatrixCell {
                                        kind: CellKind::Empty,
                                        content: "-".to_string(),
                                        title: format!("No direct relationship found between {} & {}", row, col),
                                        background,
                                        text: text_tone_for(background, appearance),
                                    }
                                }
                            }
                        }
                    })
                    .collect()
            })
            .collect();

        Self { themes: names, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    pub fn cell(&self, row: &str, col: &str) -> Option<&MatrixCell> {
        let r = self.themes.iter().position(|t| t == row)?;
        let c = self.themes.iter().position(|t| t == col)?;
        self.rows.get(r)?.get(c)
    }

    pub fn to_html(&self) -> String {
        if self.is_empty() {
            return "<p class=\"muted\">No themes available for Adjacency Matrix.</p>".to_string();
        }

        let mut html = String::from("<table class=\"matrix\"><thead><tr><th></th>");
        for theme in &self.themes {
            html.push_str(&format!(
                "<th class=\"vertical\" title=\"{0}\">{0}</th>",
                escape_html(theme)
            ));
        }
        html.push_str("</tr></thead><tbody>");

        for (theme, row) in self.themes.iter().zip(&self.rows) {
            html.push_str(&format!("<tr><th title=\"{0}\">{0}</th>", escape_html(theme)));
            for cell in row {
                html.push_str(&format!(
                    "<td style=\"background-color: {}; color: {}\" title=\"{}\">{}</td>",
                    cell.background,
                    cell.text.css(),
                    escape_html(&cell.title),
                    escape_html(&cell.content)
                ));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table>");
        html
    }

    /// Fixed-width grid for terminals
    pub fn to_text(&self) -> String {
        let width = self
            .themes
            .iter()
            .map(|t| t.chars().count())
            .max()
            .unwrap_or(0)
            .max(6);

        let mut out = format!("{:width$}", "", width = width);
        for theme in &self.themes {
            out.push_str(&format!(" | {:>width$}", theme, width = width));
        }
        out.push('\n');
        for (theme, row) in self.themes.iter().zip(&self.rows) {
            out.push_str(&format!("{:width$}", theme, width = width));
            for cell in row {
                out.push_str(&format!(" | {:>width$}", cell.content, width = width));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn themes() -> Vec<Fact> {
        vec![
            Fact { name: "Rates".into(), value: FactValue::Number(9.0) },
            Fact { name: "Growth".into(), value: FactValue::Number(7.0) },
            Fact { name: "Risk".into(), value: FactValue::Text("high".into()) },
        ]
    }

    fn rel(source: &str, target: &str, strength: f64) -> ThemeRelationship {
        ThemeRelationship { source: source.into(), target: target.into(), strength }
    }

    #[test]
    fn test_themes_are_sorted() {
        let matrix = AdjacencyMatrix::build(&themes(), &[], Appearance::Light);
        assert_eq!(matrix.themes, vec!["Growth", "Rates", "Risk"]);
        assert_eq!(matrix.rows.len(), 3);
        assert!(matrix.rows.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn test_diagonal_shows_prominence() {
        let matrix = AdjacencyMatrix::build(&themes(), &[], Appearance::Light);
        let rates = matrix.cell("Rates", "Rates").unwrap();
        assert_eq!(rates.kind, CellKind::Prominence);
        assert_eq!(rates.content, "9.0");
        assert_eq!(rates.background, Rgb::new(230, 245, 230).interpolate(Rgb::new(34, 139, 34), 0.9));

        let risk = matrix.cell("Risk", "Risk").unwrap();
        assert_eq!(risk.content, "high");
        assert_eq!(risk.background, Rgb::new(230, 245, 230));
    }

    #[test]
    fn test_strength_found_in_either_direction() {
        let matrix = AdjacencyMatrix::build(&themes(), &[rel("Rates", "Growth", 0.8)], Appearance::Dark);
        let forward = matrix.cell("Rates", "Growth").unwrap();
        let backward = matrix.cell("Growth", "Rates").unwrap();
        assert_eq!(forward.content, "0.80");
        assert_eq!(backward.content, "0.80");
        assert_eq!(forward.kind, CellKind::Strength);
        assert_eq!(forward.title, "Relationship between Rates & Growth: 0.80");
    }

    #[test]
    fn test_missing_relationship_is_neutral() {
        let matrix = AdjacencyMatrix::build(&themes(), &[], Appearance::Dark);
        let cell = matrix.cell("Rates", "Risk").unwrap();
        assert_eq!(cell.kind, CellKind::Empty);
        assert_eq!(cell.content, "-");
        assert_eq!(cell.background, Rgb::new(51, 65, 85));
        assert_eq!(cell.text, TextTone::Light);
    }

    #[test]
    fn test_color_saturates_above_max() {
        assert_eq!(
            scale_color(25.0, CellKind::Prominence, Appearance::Light),
            Rgb::new(34, 139, 34)
        );
        assert_eq!(scale_color(-1.0, CellKind::Strength, Appearance::Dark), Rgb::new(30, 58, 138));
    }

    #[test]
    fn test_html_escapes_theme_names() {
        let themes = vec![Fact { name: "R&D <core>".into(), value: FactValue::Number(4.0) }];
        let html = AdjacencyMatrix::build(&themes, &[], Appearance::Light).to_html();
        assert!(html.contains("R&amp;D &lt;core&gt;"));
        assert!(!html.contains("<core>"));
    }
}
