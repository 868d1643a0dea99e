//! Human-readable reports over [`ComparisonResults`].

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use polars::prelude::{DataFrame, df};

use crate::error::CompareResult;
use crate::pipeline::ComparisonResults;

const RULE_WIDTH: usize = 60;
const SECTION_RULE_WIDTH: usize = 40;
const TITLE: &str = "DATA COMPARISON SUMMARY";

/// Text and HTML rendering of one comparison run.
#[derive(Debug, Clone, Copy)]
pub struct ComparisonReport<'a> {
    results: &'a ComparisonResults,
}

impl<'a> ComparisonReport<'a> {
    pub fn new(results: &'a ComparisonResults) -> Self {
        Self { results }
    }

    /// Banner with record counts, results, and percentages.
    pub fn summary_text(&self) -> String {
        let s = &self.results.summary;
        let rule = "=".repeat(RULE_WIDTH);
        let mut lines = vec![
            rule.clone(),
            TITLE.to_string(),
            rule.clone(),
            format!("Comparison Timestamp: {}", s.timestamp.format("%Y-%m-%d %H:%M:%S UTC")),
            String::new(),
            "RECORD COUNTS:".to_string(),
            format!("  Left dataset:  {} records", thousands(s.total_left as i64)),
            format!("  Right dataset: {} records", thousands(s.total_right as i64)),
            String::new(),
            "COMPARISON RESULTS:".to_string(),
            format!("  Matching Records:      {}", thousands(s.matching)),
            format!("  Value Differences:     {}", thousands(s.value_differences_count as i64)),
            format!("  Left-Only Records:     {}", thousands(s.left_only_count as i64)),
            format!("  Right-Only Records:    {}", thousands(s.right_only_count as i64)),
            String::new(),
        ];

        if s.total_left > 0 {
            let pct = |n: i64| n as f64 / s.total_left as f64 * 100.0;
            lines.push("PERCENTAGES (of left dataset):".to_string());
            lines.push(format!("  Matching:      {:.1}%", pct(s.matching)));
            lines.push(format!("  Differences:   {:.1}%", pct(s.value_differences_count as i64)));
            lines.push(format!("  Left-Only:     {:.1}%", pct(s.left_only_count as i64)));
            lines.push(String::new());
        }
        if s.total_right > 0 {
            let pct = s.right_only_count as f64 / s.total_right as f64 * 100.0;
            lines.push(format!("  Right-Only:    {pct:.1}% (of right dataset)"));
        }
        lines.push(rule);
        lines.join("\n")
    }

    /// Summary counts as a `Metric` / `Count` / `Percentage` frame.
    ///
    /// Percentages are of the left dataset, except right-only which is of the right dataset. They
    /// are null when the reference side is empty, and for the two dataset totals.
    pub fn summary_frame(&self) -> CompareResult<DataFrame> {
        let s = &self.results.summary;
        let of = |n: i64, total: usize| (total > 0).then(|| format!("{:.1}%", n as f64 / total as f64 * 100.0));
        let df = df!(
            "Metric" => [
                "Left dataset",
                "Right dataset",
                "Matching Records",
                "Value Differences",
                "Left-Only Records",
                "Right-Only Records",
            ],
            "Count" => [
                s.total_left as i64,
                s.total_right as i64,
                s.matching,
                s.value_differences_count as i64,
                s.left_only_count as i64,
                s.right_only_count as i64,
            ],
            "Percentage" => [
                None,
                None,
                of(s.matching, s.total_left),
                of(s.value_differences_count as i64, s.total_left),
                of(s.left_only_count as i64, s.total_left),
                of(s.right_only_count as i64, s.total_right),
            ]
        )?;
        Ok(df)
    }

    /// [`Self::summary_frame`] rendered with the Polars table formatter.
    pub fn summary_table(&self) -> CompareResult<String> {
        Ok(self.summary_frame()?.to_string())
    }

    /// Summary followed by up to `max_samples` rows of every non-empty partition.
    pub fn detailed_text(&self, max_samples: usize) -> CompareResult<String> {
        let mut out = self.summary_text();
        out.push('\n');
        for partition in self.results.partitions() {
            if partition.is_empty() {
                continue;
            }
            let sample = partition.sample(max_samples)?;
            let _ = writeln!(
                out,
                "\n{} SAMPLES:\n{}\n{sample}",
                partition.kind().title(),
                "-".repeat(SECTION_RULE_WIDTH)
            );
        }
        Ok(out)
    }

    /// Standalone HTML page with summary metrics and the configuration in use.
    pub fn html(&self) -> String {
        let s = &self.results.summary;
        let config = &self.results.config;

        let metrics = [
            ("Left Records", thousands(s.total_left as i64)),
            ("Right Records", thousands(s.total_right as i64)),
            ("Matching", thousands(s.matching)),
            ("Differences", thousands(s.value_differences_count as i64)),
            ("Left Only", thousands(s.left_only_count as i64)),
            ("Right Only", thousands(s.right_only_count as i64)),
        ];
        let mut metric_html = String::new();
        for (label, value) in metrics {
            let _ = writeln!(
                metric_html,
                "    <div class=\"metric\"><div class=\"metric-value\">{value}</div>\
                 <div class=\"metric-label\">{label}</div></div>"
            );
        }

        let mut mapping_rows = String::new();
        for m in config.mappings() {
            let _ = writeln!(
                mapping_rows,
                "      <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&m.comparison_name),
                escape_html(&m.left_name),
                escape_html(&m.right_name)
            );
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Data Comparison Report</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 20px; }}
    .header {{ background-color: #f0f0f0; padding: 10px; border-radius: 5px; }}
    .metric {{ display: inline-block; margin: 10px; padding: 10px; background-color: #e8f4f8; border-radius: 5px; }}
    .metric-value {{ font-size: 24px; font-weight: bold; color: #2c5aa0; }}
    .metric-label {{ font-size: 12px; color: #666; }}
    table {{ border-collapse: collapse; margin: 10px 0; }}
    th, td {{ border: 1px solid #ddd; padding: 6px; text-align: left; }}
  </style>
</head>
<body>
  <div class="header">
    <h1>Data Comparison Report</h1>
    <p>Generated on: {timestamp}</p>
  </div>
  <div class="summary">
    <h2>Summary</h2>
{metric_html}  </div>
  <div class="section">
    <h2>Configuration</h2>
    <p><strong>Primary Key Columns:</strong> {pk}</p>
    <p><strong>Column Mappings:</strong> {mapping_count} mappings</p>
    <table>
      <tr><th>Comparison</th><th>Left</th><th>Right</th></tr>
{mapping_rows}    </table>
    <p><strong>Null Equals Null:</strong> {null_equals_null}</p>
    <p><strong>Ignore Case:</strong> {ignore_case}</p>
  </div>
</body>
</html>
"#,
            timestamp = escape_html(&s.timestamp.to_rfc3339()),
            pk = escape_html(&config.pk_columns().join(", ")),
            mapping_count = config.mappings().len(),
            null_equals_null = config.null_equals_null(),
            ignore_case = config.ignore_case(),
        )
    }

    pub fn write_html(&self, path: impl AsRef<Path>) -> CompareResult<()> {
        fs::write(path, self.html())?;
        Ok(())
    }
}

/// `1234567` -> `1,234,567`.
fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn escape_html(s: &str) -> String {
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

#[cfg(test)]
mod tests {
    use super::{escape_html, thousands};

    #[test]
    fn groups_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_000), "1,000");
        assert_eq!(thousands(1_234_567), "1,234,567");
        assert_eq!(thousands(-1_234), "-1,234");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
