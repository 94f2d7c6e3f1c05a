//! Extraction of report counters from a downdetector-style status page.
//!
//! The page carries two counters, each a `span` inside a `div` whose class names the period
//! (`report-count-hour`, `report-count-day`), and a Highcharts chart whose `data: [...]` literal
//! holds the recent report series.

use std::sync::LazyLock;

use regex::Regex;

use crate::source::OutageSample;
use crate::source::error::SourceError;

static HOUR_BLOCK: LazyLock<Regex> = LazyLock::new(|| counter_open_tag("report-count-hour"));
static DAY_BLOCK: LazyLock<Regex> = LazyLock::new(|| counter_open_tag("report-count-day"));

static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)div\b[^>]*>").expect("valid div regex"));

static SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)<span\b[^>]*>(.*?)</span>").expect("valid span regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<script[^>]*>(.*?)</script>").expect("valid script regex")
});

static SERIES_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data:\s*\[([^\]]*)\]").expect("valid series regex"));

/// Opening `div` tag whose class list holds `class` as a whole, whitespace separated token.
fn counter_open_tag(class: &str) -> Regex {
    Regex::new(&format!(
        r#"<(?i:div)\s(?:[^>]*\s)?class\s*=\s*["'](?:[^"']*\s)?{class}(?:\s[^"']*)?["'][^>]*>"#
    ))
    .expect("valid counter regex")
}

/// Content of the element whose opening tag ends at `start`, up to its matching `</div>`.
///
/// An unclosed element runs to the end of the page.
fn div_content(html: &str, start: usize) -> &str {
    let rest = &html[start..];
    let mut depth = 1usize;
    for tag in DIV_TAG.captures_iter(rest) {
        let Some(whole) = tag.get(0) else { continue };
        if tag.get(1).is_some_and(|slash| !slash.as_str().is_empty()) {
            depth -= 1;
            if depth == 0 {
                return &rest[..whole.start()];
            }
        } else {
            depth += 1;
        }
    }
    rest
}

/// Parses a report page. Fails if any counter or the chart series is missing or malformed.
pub fn parse_report(html: &str) -> Result<OutageSample, SourceError> {
    Ok(OutageSample {
        hourly_count: parse_counter(html, &HOUR_BLOCK, "report-count-hour")?,
        daily_count: parse_counter(html, &DAY_BLOCK, "report-count-day")?,
        series: parse_series(html)?,
    })
}

fn parse_counter(html: &str, block: &Regex, field: &str) -> Result<u32, SourceError> {
    // First matching element that has a span anywhere inside it
    let text = block
        .find_iter(html)
        .map(|open| div_content(html, open.end()))
        .find_map(|content| SPAN.captures(content).and_then(|c| c.get(1)))
        .ok_or_else(|| SourceError::MissingField {
            field: format!("div.{field} span"),
        })?
        .as_str();
    parse_count(&TAG.replace_all(text, ""), field)
}

fn parse_series(html: &str) -> Result<Vec<u32>, SourceError> {
    let script = SCRIPT
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|s| s.contains("Highcharts.chart"))
        .ok_or_else(|| SourceError::MissingField {
            field: "script with Highcharts.chart".to_string(),
        })?;
    let data = SERIES_DATA
        .captures(script)
        .and_then(|c| c.get(1))
        .ok_or_else(|| SourceError::MissingField {
            field: "chart data".to_string(),
        })?
        .as_str();

    data.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_count(s, "chart data"))
        .collect()
}

/// Parses a non-negative count, tolerating thousands separators.
fn parse_count(text: &str, field: &str) -> Result<u32, SourceError> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '\u{a0}')
        .collect();
    digits
        .parse::<u32>()
        .map_err(|_| SourceError::MalformedValue {
            field: field.to_string(),
            value: text.trim().to_string(),
        })
}
