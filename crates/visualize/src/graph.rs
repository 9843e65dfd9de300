use anyhow::Result;
use extract::{Fact, FactValue, ThemeRelationship};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::HashMap;

use crate::layout::{FIT_PADDING, Point, layout_graph};
use crate::palette::{Appearance, Rgba, Surface, series_color};

const NON_NUMERIC_SIZE: f64 = 5.0;
const LABEL_CHAR_WIDTH: f64 = 6.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeNode {
    pub id: String,
    pub prominence: FactValue,
    pub size: f64,
    pub color: Rgba,
}

/// Visual treatment of one link, depending on the hovered theme
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStyle {
    pub color: Rgba,
    pub width: f64,
    pub particles: u8,
    pub particle_width: f64,
    pub particle_speed: f64,
}

/// Themes as nodes, relationships as directed weighted edges
pub struct RelationshipGraph {
    graph: DiGraph<ThemeNode, f64>,
    appearance: Appearance,
}

impl RelationshipGraph {
    /// Relationships naming an unknown theme are dropped; duplicates and self-links are kept.
    pub fn build(themes: &[Fact], relationships: &[ThemeRelationship], appearance: Appearance) -> Self {
        let mut graph = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for (i, theme) in themes.iter().enumerate() {
            let size = match theme.value {
                FactValue::Number(p) => p.max(1.0),
                _ => NON_NUMERIC_SIZE,
            };
            let node = graph.add_node(ThemeNode {
                id: theme.name.clone(),
                prominence: theme.value.clone(),
                size,
                color: series_color(appearance, i),
            });
            index.insert(theme.name.as_str(), node);
        }

        let mut dropped = 0;
        for rel in relationships {
            match (index.get(rel.source.as_str()), index.get(rel.target.as_str())) {
                (Some(&s), Some(&t)) => {
                    graph.add_edge(s, t, rel.strength);
                }
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Skipped relationships with unknown themes");
        }

        Self { graph, appearance }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ThemeNode> {
        self.graph.node_weights()
    }

    /// (source id, target id, strength) in insertion order
    pub fn links(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].id.as_str(),
                self.graph[e.target()].id.as_str(),
                *e.weight(),
            )
        })
    }

    fn touches(&self, edge: EdgeIndex, hovered: Option<&str>) -> bool {
        let Some(hovered) = hovered else {
            return false;
        };
        self.graph
            .edge_endpoints(edge)
            .is_some_and(|(s, t)| self.graph[s].id == hovered || self.graph[t].id == hovered)
    }

    pub fn link_style(&self, edge: EdgeIndex, hovered: Option<&str>) -> LinkStyle {
        let strength = self.graph.edge_weight(edge).copied().unwrap_or(0.0);
        link_style(strength, self.touches(edge, hovered), self.appearance)
    }

    /// Pixel radius: grows with size but always fits the label
    pub fn node_radius(node: &ThemeNode, hovered: bool) -> f64 {
        let base = (node.size.max(1.0) / 1.5).max(2.0);
        let label = node.id.chars().count() as f64 * LABEL_CHAR_WIDTH * if hovered { 14.0 / 12.0 } else { 1.0 };
        base.max(label / 2.0 + if hovered { 3.0 } else { 2.0 })
    }

    /// Clearance the fit needs so the largest node, even when hovered, stays on the canvas
    pub fn fit_padding(&self) -> f64 {
        let widest = self.nodes().map(|node| Self::node_radius(node, true)).fold(0.0, f64::max);
        FIT_PADDING.max(widest + 2.0)
    }

    /// Node centres in pixels, indexed like `nodes()`
    pub fn layout(&self, width: u32, height: u32) -> Vec<Point> {
        let links: Vec<(usize, usize)> = self
            .graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .collect();
        layout_graph(self.node_count(), links, width as f64, height as f64, self.fit_padding())
    }

    pub fn render_svg(&self, hovered: Option<&str>, width: u32, height: u32) -> Result<String> {
        let positions = self.layout(width, height);
        let surface = Surface::for_appearance(self.appearance);
        let at = |p: Point| (p.x.round() as i32, p.y.round() as i32);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
            root.fill(&surface.canvas.to_plotters())?;

            for edge in self.graph.edge_references() {
                let style = self.link_style(edge.id(), hovered);
                let from = positions[edge.source().index()];
                let to = positions[edge.target().index()];
                let stroke = style.color.to_plotters().stroke_width(style.width.round().max(1.0) as u32);
                root.draw(&PathElement::new(vec![at(from), at(to)], stroke))?;

                for k in 0..style.particles {
                    let t = (k as f64 + 1.0) / (style.particles as f64 + 1.0);
                    let p = Point {
                        x: from.x + (to.x - from.x) * t,
                        y: from.y + (to.y - from.y) * t,
                    };
                    root.draw(&Circle::new(
                        at(p),
                        style.particle_width.round().max(1.0) as u32,
                        style.color.opaque().to_plotters().filled(),
                    ))?;
                }
            }

            let ink = if self.appearance.is_dark() { Rgba::new(240, 240, 240, 1.0) } else { Rgba::new(17, 24, 39, 1.0) };
            let ring = if self.appearance.is_dark() { Rgba::new(255, 255, 255, 0.7) } else { Rgba::new(0, 0, 0, 0.7) };

            for index in self.graph.node_indices() {
                let node = &self.graph[index];
                let is_hovered = hovered == Some(node.id.as_str());
                let center = at(positions[index.index()]);
                let radius = Self::node_radius(node, is_hovered).round() as u32;

                root.draw(&Circle::new(center, radius, node.color.to_plotters().filled()))?;
                if is_hovered {
                    root.draw(&Circle::new(center, radius, ring.to_plotters().stroke_width(2)))?;
                }

                let font_size = if is_hovered { 14 } else { 12 };
                let style = ("sans-serif", font_size)
                    .into_font()
                    .color(&ink.to_plotters())
                    .pos(Pos::new(HPos::Center, VPos::Center));
                root.draw(&Text::new(node.id.clone(), center, style))?;
            }

            root.present()?;
        }

        tracing::debug!(nodes = self.node_count(), links = self.edge_count(), "Rendered relationship map");
        Ok(svg)
    }
}

/// Strength of 0 falls back to `fallback`, matching a falsy-default rule.
fn or_fallback(strength: f64, fallback: f64) -> f64 {
    if strength == 0.0 || strength.is_nan() { fallback } else { strength }
}

pub fn link_style(strength: f64, highlighted: bool, appearance: Appearance) -> LinkStyle {
    let color = match (highlighted, appearance) {
        (true, Appearance::Dark) => Rgba::new(255, 100, 100, 0.9),
        (true, Appearance::Light) => Rgba::new(255, 0, 0, 0.8),
        (false, Appearance::Dark) => Rgba::new(200, 200, 200, (or_fallback(strength, 0.2) * 0.6).max(0.2)),
        (false, Appearance::Light) => Rgba::new(0, 0, 0, (or_fallback(strength, 0.2) * 0.5).max(0.1)),
    };

    LinkStyle {
        color,
        width: if highlighted { 2.5 } else { 1.5 } * or_fallback(strength, 0.5).max(0.5),
        particles: if highlighted { 2 } else { 1 },
        particle_width: if highlighted { 2.5 } else { 1.5 },
        particle_speed: or_fallback(strength, 0.1) * 0.01,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn themes() -> Vec<Fact> {
        vec![
            Fact { name: "Rates".into(), value: FactValue::Number(9.0) },
            Fact { name: "Growth".into(), value: FactValue::Number(0.2) },
            Fact { name: "Risk".into(), value: FactValue::Text("high".into()) },
        ]
    }

    fn rel(source: &str, target: &str, strength: f64) -> ThemeRelationship {
        ThemeRelationship { source: source.into(), target: target.into(), strength }
    }

    #[test]
    fn test_node_sizes() {
        let graph = RelationshipGraph::build(&themes(), &[], Appearance::Light);
        let sizes: Vec<f64> = graph.nodes().map(|n| n.size).collect();
        assert_eq!(sizes, vec![9.0, 1.0, 5.0]);
        let colors: Vec<Rgba> = graph.nodes().map(|n| n.color).collect();
        assert_eq!(colors[1], series_color(Appearance::Light, 1));
    }

    #[test]
    fn test_edges_need_both_endpoints() {
        let relationships = vec![
            rel("Rates", "Growth", 0.8),
            rel("Rates", "Inflation", 0.9),
            rel("Rates", "Growth", 0.8),
            rel("Risk", "Risk", 0.6),
        ];
        let graph = RelationshipGraph::build(&themes(), &relationships, Appearance::Light);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.links().all(|(s, t, _)| s != "Inflation" && t != "Inflation"));
    }

    #[test]
    fn test_hover_highlights_connected_links() {
        let relationships = vec![rel("Rates", "Growth", 0.8), rel("Growth", "Risk", 0.6)];
        let graph = RelationshipGraph::build(&themes(), &relationships, Appearance::Light);
        let first = EdgeIndex::new(0);
        let second = EdgeIndex::new(1);

        let hot = graph.link_style(first, Some("Rates"));
        assert_eq!(hot.color, Rgba::new(255, 0, 0, 0.8));
        assert_eq!(hot.particles, 2);
        assert!((hot.width - 2.0).abs() < 1e-9);

        let cold = graph.link_style(second, Some("Rates"));
        assert_eq!(cold.particles, 1);
        assert!((cold.color.a - 0.3).abs() < 1e-9);
        assert!((cold.width - 0.9).abs() < 1e-9);

        assert_eq!(graph.link_style(first, None).particles, 1);
    }

    #[test]
    fn test_link_style_floors() {
        let faint = link_style(0.1, false, Appearance::Dark);
        assert!((faint.color.a - 0.2).abs() < 1e-9);
        assert!((faint.width - 0.75).abs() < 1e-9);
        assert!((faint.particle_speed - 0.001).abs() < 1e-12);

        let zero = link_style(0.0, true, Appearance::Dark);
        assert_eq!(zero.color, Rgba::new(255, 100, 100, 0.9));
        assert!((zero.width - 1.25).abs() < 1e-9);
        assert_eq!(zero.particle_width, 2.5);
    }

    #[test]
    fn test_radius_fits_label() {
        let node = ThemeNode {
            id: "Tech Sector Growth".into(),
            prominence: FactValue::Number(1.0),
            size: 1.0,
            color: series_color(Appearance::Light, 0),
        };
        let radius = RelationshipGraph::node_radius(&node, false);
        assert!(radius > 18.0 * LABEL_CHAR_WIDTH / 2.0);
        assert!(RelationshipGraph::node_radius(&node, true) > radius);
    }

    #[test]
    fn test_large_nodes_stay_on_canvas() {
        let themes = vec![
            Fact { name: "Inflation".into(), value: FactValue::Number(200.0) },
            Fact { name: "Rates".into(), value: FactValue::Number(9.0) },
            Fact { name: "Risk".into(), value: FactValue::Number(3.0) },
        ];
        let graph = RelationshipGraph::build(&themes, &[rel("Inflation", "Rates", 0.5), rel("Rates", "Risk", 0.5)], Appearance::Light);
        assert!(graph.fit_padding() > FIT_PADDING);

        let positions = graph.layout(800, 400);
        for (node, p) in graph.nodes().zip(&positions) {
            let r = RelationshipGraph::node_radius(node, true);
            assert!(p.x - r >= 0.0 && p.x + r <= 800.0, "{} overflows horizontally", node.id);
            assert!(p.y - r >= 0.0 && p.y + r <= 400.0, "{} overflows vertically", node.id);
        }
    }

    #[test]
    fn test_small_nodes_keep_default_padding() {
        let graph = RelationshipGraph::build(&themes(), &[], Appearance::Light);
        assert_eq!(graph.fit_padding(), FIT_PADDING);
    }

    #[test]
    fn test_render_svg_contains_labels() {
        let graph = RelationshipGraph::build(&themes(), &[rel("Rates", "Growth", 0.8)], Appearance::Dark);
        let svg = graph.render_svg(Some("Rates"), 600, 350).unwrap();
        assert!(svg.starts_with("<svg"));
        for name in ["Rates", "Growth", "Risk"] {
            assert!(svg.contains(name));
        }
    }
}
