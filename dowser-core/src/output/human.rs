use colored::Colorize;

use super::OutputFormatter;
use crate::checker::DocumentReport;
use crate::colors::CatppuccinExt;
use crate::status::{reason_phrase, LinkStatus};

pub struct HumanFormatter {
    use_colors: bool,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.sky().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_white().to_string()
        } else {
            text.to_string()
        }
    }

    fn success(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_green().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_yellow().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_colors {
            text.overlay1().to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_colors {
            format!(
                "\n{}\n{}",
                text.lavender().bold(),
                "─".repeat(text.len()).subtext0()
            )
        } else {
            format!("\n{}\n{}", text, "-".repeat(text.len()))
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_status(&self, status: &LinkStatus) -> String {
        let mut output = Vec::new();

        output.push(self.header(&format!("Link: {}", status.url)));

        let code = status.http_code();
        if code > 0 {
            let reason = reason_phrase(code).unwrap_or("Unknown");
            let status_display = if (200..300).contains(&code) {
                self.success(&format!("{} ({})", code, reason))
            } else if (300..400).contains(&code) {
                self.warning(&format!("{} ({})", code, reason))
            } else {
                self.error(&format!("{} ({})", code, reason))
            };
            output.push(format!(
                "  {}: {}",
                self.label("HTTP Status"),
                status_display
            ));
        } else {
            output.push(format!(
                "  {}: {}",
                self.label("HTTP Status"),
                self.error("request failed")
            ));
        }

        if let Some(ref title) = status.title {
            output.push(format!("  {}: {}", self.label("Title"), self.value(title)));
        }

        if status.redirected() {
            output.push(format!(
                "  {}: {}",
                self.label("Redirected to"),
                self.value(&status.actual_url)
            ));
        }

        if let Some(error) = status.transport_error() {
            output.push(format!(
                "  {}: {}",
                self.label("Failure"),
                self.error(&error.message)
            ));
        }

        output.push(format!(
            "  {}: {}",
            self.label("Summary"),
            self.value(&status.describe())
        ));

        output.join("\n")
    }

    fn format_report(&self, report: &DocumentReport) -> String {
        let mut output = Vec::new();

        output.push(self.header(&format!("Checked: {}", report.source)));

        for status in &report.statuses {
            let (glyph, description) = if status.good() {
                (self.success("✓"), self.dim(&status.describe()))
            } else {
                (self.error("✗"), self.error(&status.describe()))
            };
            output.push(format!(
                "  {} {} {}",
                glyph,
                self.value(&status.url),
                description
            ));
        }

        let summary = format!(
            "{} links, {} good, {} broken",
            report.link_count(),
            report.good_count(),
            report.broken_count()
        );
        output.push(String::new());
        output.push(format!(
            "  {}",
            if report.all_good() {
                self.success(&summary)
            } else {
                self.warning(&summary)
            }
        ));

        output.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{TransportError, TransportKind};

    #[test]
    fn test_format_status_plain() {
        let formatter = HumanFormatter::new().without_colors();
        let status = LinkStatus::http(
            "https://a.test/x",
            "https://a.test/y",
            200,
            Some("A Page".to_string()),
        );

        let text = formatter.format_status(&status);
        assert!(text.contains("Link: https://a.test/x"));
        assert!(text.contains("HTTP Status: 200 (OK)"));
        assert!(text.contains("Title: A Page"));
        assert!(text.contains("Redirected to: https://a.test/y"));
        assert!(text.contains("Summary: OK (A Page) (redirected to https://a.test/y)"));
    }

    #[test]
    fn test_format_status_unmapped_code() {
        let formatter = HumanFormatter::new().without_colors();
        let status = LinkStatus::http("https://a.test/", "https://a.test/", 418, None);

        let text = formatter.format_status(&status);
        assert!(text.contains("HTTP Status: 418 (Unknown)"));
        assert!(text.contains("Summary: Unknown status."));
    }

    #[test]
    fn test_format_status_transport_failure() {
        let formatter = HumanFormatter::new().without_colors();
        let status = LinkStatus::failed(
            "https://a.test/",
            TransportError::new(TransportKind::Connection, "connection refused"),
        );

        let text = formatter.format_status(&status);
        assert!(text.contains("HTTP Status: request failed"));
        assert!(text.contains("Failure: connection refused"));
        assert!(text.contains("Summary: Error: connection refused"));
    }

    #[test]
    fn test_format_report_lists_links_and_summary() {
        let formatter = HumanFormatter::new().without_colors();
        let report = DocumentReport::new(
            "post.md",
            vec![
                LinkStatus::http("https://a.test/", "https://a.test/", 200, None),
                LinkStatus::http("https://b.test/", "https://b.test/", 404, None),
            ],
        );

        let text = formatter.format_report(&report);
        assert!(text.contains("Checked: post.md"));
        assert!(text.contains("✓ https://a.test/ OK"));
        assert!(text.contains("✗ https://b.test/ No page under this URL."));
        assert!(text.contains("2 links, 1 good, 1 broken"));
    }
}
