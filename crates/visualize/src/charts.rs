use anyhow::Result;
use extract::{AnalysisTask, Fact};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::PI;

use crate::eligibility::{ChartType, numerical_facts};
use crate::palette::{Appearance, Rgba, Surface, series_color};

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    pub color: Rgba,
}

/// A bar, line, pie or doughnut chart over the numeric facts of a response
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub chart: ChartType,
    pub title: String,
    pub dataset_label: String,
    pub points: Vec<ChartPoint>,
    pub appearance: Appearance,
}

impl ChartSpec {
    /// `None` for relationship charts or when no fact is numeric
    pub fn build(chart: ChartType, task: AnalysisTask, facts: &[Fact], appearance: Appearance) -> Option<Self> {
        if chart.is_relationship() {
            return None;
        }

        let numeric = numerical_facts(facts);
        if numeric.is_empty() {
            return None;
        }

        let thematic = task == AnalysisTask::ThematicAnalysis;
        let subtitle = if thematic { "Visualized Themes & Prominence" } else { "Visualized Numerical Facts" };
        let dataset_label = if thematic { "Prominence Score" } else { "Extracted Numerical Value" };

        let points = numeric
            .into_iter()
            .enumerate()
            .map(|(i, fact)| ChartPoint {
                label: fact.label,
                value: fact.value,
                color: if chart.is_radial() { series_color(appearance, i) } else { series_color(appearance, 0) },
            })
            .collect();

        Some(Self {
            chart,
            title: format!("{} Chart: {}", chart.label(), subtitle),
            dataset_label: dataset_label.to_string(),
            points,
            appearance,
        })
    }

    /// Sum of all values; may be infinite for values near `f64::MAX`
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    /// Fraction of the total held by each point, or `None` when the total is not positive.
    /// Values are divided by the largest magnitude before summing so the sum stays finite.
    pub fn shares(&self) -> Option<Vec<f64>> {
        let scale = self.points.iter().map(|p| p.value.abs()).fold(0.0f64, f64::max);
        if scale == 0.0 || !scale.is_finite() {
            return None;
        }

        let total: f64 = self.points.iter().map(|p| p.value / scale).sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }
        Some(self.points.iter().map(|p| p.value / scale / total).collect())
    }

    /// Hover text for one point: grouped value, plus share of total on radial charts
    pub fn tooltip(&self, index: usize) -> Option<String> {
        let point = self.points.get(index)?;
        let mut label = format!("{}: {}", self.dataset_label, format_grouped(point.value));

        if self.chart.is_radial() {
            if let Some(share) = self.shares().and_then(|shares| shares.get(index).copied()) {
                label.push_str(&format!(" ({:.1}%)", share * 100.0));
            }
        }
        Some(label)
    }

    pub fn render_svg(&self, width: u32, height: u32) -> Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
            let surface = Surface::for_appearance(self.appearance);
            root.fill(&surface.panel.to_plotters())?;

            if self.chart.is_radial() {
                self.draw_radial(&root, &surface)?;
            } else {
                self.draw_cartesian(&root, &surface)?;
            }
            root.present()?;
        }
        tracing::debug!(chart = %self.chart, points = self.points.len(), bytes = svg.len(), "Rendered chart");
        Ok(svg)
    }

    fn draw_cartesian(&self, root: &DrawingArea<SVGBackend<'_>, Shift>, surface: &Surface) -> Result<()> {
        let n = self.points.len();
        let (low, high) = value_range(&self.points);

        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 16).into_font().color(&surface.title.to_plotters()))
            .margin(16)
            .x_label_area_size(48)
            .y_label_area_size(80)
            .build_cartesian_2d(0f64..n as f64, low..high)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .bold_line_style(surface.grid.to_plotters())
            .light_line_style(TRANSPARENT)
            .axis_style(surface.border.to_plotters())
            .label_style(("sans-serif", 12).into_font().color(&surface.muted.to_plotters()))
            .y_label_formatter(&|y| format_grouped(*y))
            .draw()?;

        // Category names sit under the bar or point centers, in the x label area
        let axis_style = ("sans-serif", 12)
            .into_font()
            .color(&surface.muted.to_plotters())
            .pos(Pos::new(HPos::Center, VPos::Top));
        for (i, point) in self.points.iter().enumerate() {
            let (x, y) = chart.backend_coord(&(i as f64 + 0.5, low));
            root.draw(&Text::new(point.label.as_str(), (x, y + 8), axis_style.clone()))?;
        }

        let series_color = self.points[0].color;
        let fill = series_color.to_plotters();
        let border = series_color.opaque().to_plotters();

        match self.chart {
            ChartType::Line => {
                chart
                    .draw_series(LineSeries::new(
                        self.points.iter().enumerate().map(|(i, p)| (i as f64 + 0.5, p.value)),
                        border.stroke_width(2),
                    ))?
                    .label(&self.dataset_label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], border.stroke_width(2)));
                chart.draw_series(
                    self.points
                        .iter()
                        .enumerate()
                        .map(|(i, p)| Circle::new((i as f64 + 0.5, p.value), 4, fill.filled())),
                )?;
            }
            _ => {
                chart
                    .draw_series(self.points.iter().enumerate().map(|(i, p)| {
                        Rectangle::new([(i as f64 + 0.15, 0.0), (i as f64 + 0.85, p.value)], fill.filled())
                    }))?
                    .label(&self.dataset_label)
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 16, y + 5)], fill.filled()));
                chart.draw_series(self.points.iter().enumerate().map(|(i, p)| {
                    Rectangle::new([(i as f64 + 0.15, 0.0), (i as f64 + 0.85, p.value)], border.stroke_width(1))
                }))?;
            }
        }

        let value_style = ("sans-serif", 11)
            .into_font()
            .color(&surface.text.to_plotters())
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        let bar_top = |value: f64| if self.chart == ChartType::Line { value } else { value.max(0.0) };
        chart.draw_series(self.points.iter().enumerate().filter_map(|(i, p)| {
            let tooltip = self.tooltip(i)?;
            Some(Text::new(tooltip, (i as f64 + 0.5, bar_top(p.value)), value_style.clone()))
        }))?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperMiddle)
            .label_font(("sans-serif", 12).into_font().color(&surface.text.to_plotters()))
            .background_style(surface.panel.with_alpha(0.8).to_plotters())
            .border_style(surface.border.to_plotters())
            .draw()?;

        Ok(())
    }

    fn draw_radial(&self, root: &DrawingArea<SVGBackend<'_>, Shift>, surface: &Surface) -> Result<()> {
        let body = root.titled(&self.title, ("sans-serif", 16).into_font().color(&surface.title.to_plotters()))?;
        let (width, _) = body.dim_in_pixel();
        let (pie_area, legend_area) = body.split_horizontally((width as f64 * 0.62) as i32);

        let (pw, ph) = pie_area.dim_in_pixel();
        let center = (pw as f64 / 2.0, ph as f64 / 2.0);
        let outer = (pw.min(ph) as f64 / 2.0 - 12.0).max(4.0);
        let inner = if self.chart == ChartType::Doughnut { outer * 0.5 } else { 0.0 };

        let shares = self.shares();
        match &shares {
            None => {
                pie_area.draw(&Text::new(
                    "No positive values to plot",
                    (12, (ph / 2) as i32),
                    ("sans-serif", 13).into_font().color(&surface.muted.to_plotters()),
                ))?;
            }
            Some(shares) => {
                let mut start = -PI / 2.0;
                for (point, share) in self.points.iter().zip(shares) {
                    if *share <= 0.0 {
                        continue;
                    }
                    let sweep = share * 2.0 * PI;
                    let outline = wedge(center, inner, outer, start, start + sweep);
                    pie_area.draw(&Polygon::new(outline.clone(), point.color.to_plotters().filled()))?;

                    let mut closed = outline;
                    if let Some(first) = closed.first().copied() {
                        closed.push(first);
                    }
                    pie_area.draw(&PathElement::new(closed, surface.panel.to_plotters().stroke_width(1)))?;
                    start += sweep;
                }
            }
        }

        for (i, point) in self.points.iter().enumerate() {
            let y = 24 + i as i32 * 22;
            legend_area.draw(&Rectangle::new([(8, y - 6), (20, y + 6)], point.color.to_plotters().filled()))?;
            let tooltip = self.tooltip(i).unwrap_or_default();
            legend_area.draw(&Text::new(
                format!("{} - {}", point.label, tooltip),
                (28, y - 7),
                ("sans-serif", 13).into_font().color(&surface.text.to_plotters()),
            ))?;
        }

        Ok(())
    }
}

/// Outline of a pie slice (`inner == 0`) or doughnut segment, in pixels
fn wedge(center: (f64, f64), inner: f64, outer: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = (((end - start) / 0.05).ceil() as usize).max(2);
    let at = |radius: f64, angle: f64| {
        (
            (center.0 + radius * angle.cos()).round() as i32,
            (center.1 + radius * angle.sin()).round() as i32,
        )
    };

    let mut points: Vec<(i32, i32)> = (0..=steps)
        .map(|s| at(outer, start + (end - start) * s as f64 / steps as f64))
        .collect();

    if inner > 0.0 {
        points.extend((0..=steps).rev().map(|s| at(inner, start + (end - start) * s as f64 / steps as f64)));
    } else {
        points.push(at(0.0, start));
    }
    points
}

/// Y range that always includes zero, with headroom above the tallest point.
/// Both ends and the span stay finite for values near `f64::MAX`.
fn value_range(points: &[ChartPoint]) -> (f64, f64) {
    let min = points.iter().map(|p| p.value).fold(0.0f64, f64::min);
    let max = points.iter().map(|p| p.value).fold(0.0f64, f64::max);
    let high = if max > 0.0 { (max * 1.1).min(f64::MAX) } else { 0.0 };
    let low = if min < 0.0 { (min * 1.1).max(f64::MIN) } else { 0.0 };

    if high - low <= f64::EPSILON {
        (low, low + 1.0)
    } else if !(high - low).is_finite() {
        (low / 2.0, high / 2.0)
    } else {
        (low, high)
    }
}

/// Thousands-separated rendering with at most three decimals (`1234567.891` -> `1,234,567.891`)
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}
