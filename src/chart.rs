// src/chart.rs
//! SVG pie chart for poll results.

use std::fmt::Write;

use crate::models::OptionResult;

pub const SIZE: f64 = 300.0;
pub const RADIUS: f64 = 120.0;

const COLORS: [&str; 10] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#06b6d4", "#84cc16",
    "#f97316", "#6366f1",
];

/// Slice angles are in degrees, measured clockwise from the positive x axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<'a> {
    pub start_angle: f64,
    pub end_angle: f64,
    pub color: &'static str,
    pub result: &'a OptionResult,
}

/// Lays out one slice per option with a non-zero percentage, starting at the top.
pub fn slices(results: &[OptionResult]) -> Vec<Slice<'_>> {
    let mut current = -90.0;
    results
        .iter()
        .filter(|r| r.percentage > 0)
        .enumerate()
        .map(|(i, result)| {
            let sweep = f64::from(result.percentage) / 100.0 * 360.0;
            let slice = Slice {
                start_angle: current,
                end_angle: current + sweep,
                color: COLORS[i % COLORS.len()],
                result,
            };
            current += sweep;
            slice
        })
        .collect()
}

pub fn pie_path(start_angle: f64, end_angle: f64, radius: f64, cx: f64, cy: f64) -> String {
    let start = start_angle.to_radians();
    let end = end_angle.to_radians();

    let x1 = cx + radius * start.cos();
    let y1 = cy + radius * start.sin();
    let x2 = cx + radius * end.cos();
    let y2 = cy + radius * end.sin();

    let large_arc = i32::from(end_angle - start_angle > 180.0);

    format!("M {cx} {cy} L {x1} {y1} A {radius} {radius} 0 {large_arc} 1 {x2} {y2} Z")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render(results: &[OptionResult]) -> String {
    let center = SIZE / 2.0;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{SIZE}" height="{SIZE}" viewBox="0 0 {SIZE} {SIZE}">"#
    );

    let slices = slices(results);
    if slices.is_empty() {
        let _ = write!(
            svg,
            r#"<text x="{center}" y="{center}" text-anchor="middle" dominant-baseline="middle">No votes to display</text>"#
        );
    }

    for slice in &slices {
        let label = format!(
            "{}: {}% ({} votes)",
            slice.result.option_text, slice.result.percentage, slice.result.vote_count
        );
        // A full sweep starts and ends on the same point, which an arc cannot draw.
        let (tag, geometry) = if slice.end_angle - slice.start_angle >= 360.0 {
            ("circle", format!(r#"cx="{center}" cy="{center}" r="{RADIUS}""#))
        } else {
            let d = pie_path(slice.start_angle, slice.end_angle, RADIUS, center, center);
            ("path", format!(r#"d="{d}""#))
        };
        let _ = write!(
            svg,
            r#"<g><{tag} {geometry} fill="{}" stroke="white" stroke-width="2"><title>{}</title></{tag}></g>"#,
            slice.color,
            escape(&label),
        );
    }

    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn result(text: &str, count: i64, percentage: u32) -> OptionResult {
        OptionResult {
            option_id: Uuid::new_v4(),
            option_text: text.to_string(),
            vote_count: count,
            percentage,
            voters: vec![],
        }
    }

    #[test]
    fn test_slices_skip_empty_options() {
        let results = vec![result("a", 1, 25), result("b", 0, 0), result("c", 3, 75)];
        let slices = slices(&results);

        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].start_angle, -90.0);
        assert_eq!(slices[0].end_angle, 0.0);
        assert_eq!(slices[1].start_angle, 0.0);
        assert_eq!(slices[1].end_angle, 270.0);
        assert_eq!(slices[1].color, COLORS[1]);
    }

    #[test]
    fn test_quarter_path() {
        let path = pie_path(-90.0, 0.0, 120.0, 150.0, 150.0);
        assert_eq!(path, "M 150 150 L 150 30 A 120 120 0 0 1 270 150 Z");
    }

    #[test]
    fn test_large_arc_flag() {
        assert!(pie_path(0.0, 270.0, 120.0, 150.0, 150.0).contains(" 0 1 1 "));
        assert!(pie_path(0.0, 180.0, 120.0, 150.0, 150.0).contains(" 0 0 1 "));
    }

    #[test]
    fn test_colors_cycle() {
        let results: Vec<_> = (0..12).map(|i| result(&i.to_string(), 1, 8)).collect();
        let slices = slices(&results);
        assert_eq!(slices[10].color, COLORS[0]);
        assert_eq!(slices[11].color, COLORS[1]);
    }

    #[test]
    fn test_render_empty() {
        let svg = render(&[result("a", 0, 0)]);
        assert!(svg.contains("No votes to display"));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn test_render_escapes_labels() {
        let svg = render(&[result("Fish & <Chips>", 1, 50), result("Pie", 1, 50)]);
        assert!(svg.contains("Fish &amp; &lt;Chips&gt;: 50% (1 votes)"));
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_render_single_winner_is_circle() {
        let svg = render(&[result("All", 4, 100), result("None", 0, 0)]);
        assert!(svg.contains("<circle"));
        assert!(svg.contains("</circle>"));
    }
}
