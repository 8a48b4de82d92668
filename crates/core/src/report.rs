//! Report rendering
//!
//! Turns a [`ReportSnapshot`] into the text lines emitted each cycle:
//! a timestamped separator, an uptime line, the meta-counter header and rows,
//! then gauge rows and counter rows. Each row goes through a
//! [`ReportTemplate`].

use std::fmt;

use tally_domain::constants::{DEFAULT_REPORT_TEMPLATE, IDENTITY_COLUMN_PADDING, VALUE_COLUMN_WIDTH};
use tally_domain::ReportSnapshot;

const SEPARATOR: &str = "--------------------------";
const META_HEADER: &str = "---M-E-T-A- -C-O-U-N-T----";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Row layout with `{name}`, `{value}` and `{delta}` placeholders.
///
/// `{name}` is left-aligned and padded to the longest identity plus a fixed
/// margin; `{value}` and `{delta}` are right-aligned in fixed-width columns.
/// Anything else, including unknown `{...}` tokens, is copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTemplate {
    template: String,
}

impl Default for ReportTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_TEMPLATE)
    }
}

impl ReportTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Renders one row; `name_width` is the padded width of the name column.
    pub fn render_row(&self, name_width: usize, name: &str, value: &str, delta: &str) -> String {
        let mut out =
            String::with_capacity(self.template.len() + name_width + 2 * VALUE_COLUMN_WIDTH);
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let Some(close) = tail.find('}') else {
                out.push_str(tail);
                return out;
            };
            match &tail[1..close] {
                "name" => out.push_str(&format!("{name:<name_width$}")),
                "value" => out.push_str(&format!("{value:>VALUE_COLUMN_WIDTH$}")),
                "delta" => out.push_str(&format!("{delta:>VALUE_COLUMN_WIDTH$}")),
                _ => out.push_str(&tail[..=close]),
            }
            rest = &tail[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for ReportTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl From<&str> for ReportTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

/// Renders a snapshot into report lines, in output order.
pub fn render_report(snapshot: &ReportSnapshot, template: &ReportTemplate) -> Vec<String> {
    let width = snapshot.longest_identity + IDENTITY_COLUMN_PADDING;
    let rows = snapshot.meta.len() + snapshot.gauges.len() + snapshot.counters.len();
    let mut lines = Vec::with_capacity(3 + rows);

    let timestamp = snapshot.generated_at.format(TIMESTAMP_FORMAT).to_string();
    lines.push(template.render_row(width, SEPARATOR, &timestamp, ""));
    lines.push(template.render_row(width, "Uptime", &format!("{:.3?}", snapshot.uptime), ""));
    lines.push(template.render_row(width, META_HEADER, "", ""));

    for row in &snapshot.meta {
        lines.push(template.render_row(width, &row.name, &fixed(row.total), &fixed(row.delta)));
    }
    for row in &snapshot.gauges {
        lines.push(template.render_row(width, &row.identity, &fixed(row.value), &fixed(row.delta)));
    }
    for row in &snapshot.counters {
        lines.push(template.render_row(
            width,
            &row.identity,
            &row.value.to_string(),
            &row.delta.to_string(),
        ));
    }
    lines
}

fn fixed(value: f64) -> String {
    format!("{value:.6}")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Local;
    use tally_domain::{CounterRow, GaugeRow, MetaRow};

    use super::*;

    fn snapshot() -> ReportSnapshot {
        ReportSnapshot {
            generated_at: Local::now(),
            uptime: Duration::from_millis(1_500),
            meta: vec![MetaRow { name: "hit_rate".into(), total: 0.97, delta: f64::NAN }],
            gauges: vec![GaugeRow { identity: "load".into(), value: 1.5, delta: -0.5 }],
            counters: vec![CounterRow { identity: "requests/api".into(), value: 7, delta: 2 }],
            longest_identity: "requests/api".len(),
        }
    }

    #[test]
    fn default_template_pads_columns() {
        let template = ReportTemplate::default();
        let row = template.render_row(10, "abc", "1", "2");
        assert_eq!(row, format!("{:<10}  {:>20} {:>20}", "abc", "1", "2"));
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let template = ReportTemplate::new("{name}|{unit}|{delta}|{oops");
        assert_eq!(template.render_row(2, "a", "1", "2"), format!("a |{{unit}}|{:>20}|{{oops", "2"));
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let template = ReportTemplate::new("{name}={value}");
        let row = template.render_row(0, "{value}", "9", "");
        assert_eq!(row, format!("{{value}}={:>20}", "9"));
    }

    #[test]
    fn report_lines_follow_section_order() {
        let lines = render_report(&snapshot(), &ReportTemplate::new("{name}|{value}|{delta}"));
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with(SEPARATOR));
        assert!(lines[1].starts_with("Uptime"));
        assert!(lines[1].contains("1.500s"));
        assert!(lines[2].starts_with(META_HEADER));
        assert!(lines[3].starts_with("hit_rate"));
        assert!(lines[3].contains("0.970000"));
        assert!(lines[3].contains("NaN"));
        assert!(lines[4].starts_with("load"));
        assert!(lines[4].contains("-0.500000"));
        assert!(lines[5].starts_with("requests/api"));
        assert!(lines[5].ends_with(&format!("{:>20}|{:>20}", 7, 2)));
    }

    #[test]
    fn name_column_is_longest_identity_plus_margin() {
        let lines = render_report(&snapshot(), &ReportTemplate::new("{name}|"));
        let width = "requests/api".len() + IDENTITY_COLUMN_PADDING;
        assert_eq!(lines[1].len(), width + 1);
        for line in &lines[3..] {
            assert_eq!(line.len(), width + 1, "{line}");
        }
    }
}
