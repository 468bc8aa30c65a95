use serde::Serialize;

use super::OutputFormatter;
use crate::checker::DocumentReport;
use crate::status::{LinkRecord, LinkStatus};

pub struct JsonFormatter {
    pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
    }
}

#[derive(Serialize)]
struct ReportBody<'a> {
    source: &'a str,
    links: Vec<LinkRecord>,
}

impl OutputFormatter for JsonFormatter {
    fn format_status(&self, status: &LinkStatus) -> String {
        self.to_json(&status.to_record())
    }

    fn format_report(&self, report: &DocumentReport) -> String {
        self.to_json(&ReportBody {
            source: &report.source,
            links: report.records(),
        })
    }
}
