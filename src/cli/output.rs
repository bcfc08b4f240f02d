use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{OutputFormat, RunReport};

pub trait Formatter {
    fn format_report(&self, report: &RunReport) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub embedding_model: String,
    pub embedding_url: String,
    pub archive_driver: String,
    pub archive_healthy: bool,
    pub archive_error: Option<String>,
    pub vector_store_driver: String,
    pub vector_store_connected: bool,
    pub vector_store_error: Option<String>,
    pub collection: String,
    /// `None` when the collection does not exist yet.
    pub vector_store_points: Option<u64>,
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_report(&self, report: &RunReport) -> String {
        let mut output = String::new();
        if report.dry_run {
            writeln!(output, "Dry Run").unwrap();
            writeln!(output, "-------").unwrap();
        } else {
            writeln!(output, "Ingestion Complete").unwrap();
            writeln!(output, "------------------").unwrap();
        }
        writeln!(output, "Documents found:    {}", report.documents_discovered).unwrap();
        writeln!(output, "Documents ingested: {}", report.documents_ingested).unwrap();
        writeln!(output, "Documents skipped:  {}", report.documents_skipped).unwrap();
        writeln!(output, "Chunks created:     {}", report.chunks_created).unwrap();
        if let Some(ref store) = report.store {
            writeln!(
                output,
                "Records written:    {} ({}/{})",
                store.records_written, store.driver, store.collection
            )
            .unwrap();
        }
        writeln!(output, "Duration:           {}ms", report.duration_ms).unwrap();

        if report.dry_run && !report.documents.is_empty() {
            writeln!(output).unwrap();
            for doc in &report.documents {
                writeln!(
                    output,
                    "  {} [{}] {} chars, {} chunks",
                    doc.name, doc.format, doc.characters, doc.chunks
                )
                .unwrap();
            }
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();
        writeln!(output, "Embedding:     {}", status.embedding_model).unwrap();
        writeln!(output, "  URL:         {}", status.embedding_url).unwrap();
        writeln!(output).unwrap();

        let archive_status = if status.archive_healthy {
            "[OK]"
        } else {
            "[UNAVAILABLE]"
        };
        writeln!(
            output,
            "Archive:       {} ({})",
            status.archive_driver, archive_status
        )
        .unwrap();
        if let Some(ref error) = status.archive_error {
            writeln!(output, "  Error:       {}", error).unwrap();
        }
        writeln!(output).unwrap();

        let vector_status = if status.vector_store_connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        writeln!(
            output,
            "Vector Store:  {} ({})",
            status.vector_store_driver, vector_status
        )
        .unwrap();
        writeln!(output, "  Collection:  {}", status.collection).unwrap();
        match status.vector_store_points {
            Some(points) => writeln!(output, "  Records:     {}", points).unwrap(),
            None if status.vector_store_connected => {
                writeln!(output, "  Records:     (collection not created)").unwrap()
            }
            None => {}
        }
        if let Some(ref error) = status.vector_store_error {
            writeln!(output, "  Error:       {}", error).unwrap();
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_report(&self, report: &RunReport) -> String {
        format!("{}\n", self.render(report))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let json = serde_json::json!({
            "embedding": {
                "model": status.embedding_model,
                "url": status.embedding_url,
            },
            "archive": {
                "driver": status.archive_driver,
                "healthy": status.archive_healthy,
                "error": status.archive_error,
            },
            "vector_store": {
                "driver": status.vector_store_driver,
                "connected": status.vector_store_connected,
                "collection": status.collection,
                "records": status.vector_store_points,
                "error": status.vector_store_error,
            }
        });
        format!("{}\n", self.render(&json))
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({"message": message}))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{}\n", serde_json::json!({"error": error}))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_report(&self, report: &RunReport) -> String {
        let mut output = String::new();
        let title = if report.dry_run {
            "Dry Run"
        } else {
            "Ingestion Complete"
        };
        writeln!(output, "## {}\n", title).unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Documents found | {} |", report.documents_discovered).unwrap();
        writeln!(output, "| Documents ingested | {} |", report.documents_ingested).unwrap();
        writeln!(output, "| Documents skipped | {} |", report.documents_skipped).unwrap();
        writeln!(output, "| Chunks created | {} |", report.chunks_created).unwrap();
        if let Some(ref store) = report.store {
            writeln!(output, "| Records written | {} |", store.records_written).unwrap();
            writeln!(
                output,
                "| Collection | `{}` ({}) |",
                store.collection, store.driver
            )
            .unwrap();
        }
        writeln!(output, "| Duration | {}ms |", report.duration_ms).unwrap();

        if !report.documents.is_empty() {
            writeln!(output, "\n### Documents\n").unwrap();
            writeln!(output, "| Document | Format | Characters | Chunks |").unwrap();
            writeln!(output, "|----------|--------|------------|--------|").unwrap();
            for doc in &report.documents {
                let name = match doc.locator {
                    Some(ref locator) => format!("[`{}`]({})", doc.name, locator),
                    None => format!("`{}`", doc.name),
                };
                writeln!(
                    output,
                    "| {} | {} | {} | {} |",
                    name, doc.format, doc.characters, doc.chunks
                )
                .unwrap();
            }
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mark = |ok: bool| if ok { "✅" } else { "❌" };
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        writeln!(output, "### Embedding\n").unwrap();
        writeln!(output, "- **Model:** {}", status.embedding_model).unwrap();
        writeln!(output, "- **URL:** `{}`\n", status.embedding_url).unwrap();

        writeln!(
            output,
            "### Archive ({}) {}\n",
            status.archive_driver,
            mark(status.archive_healthy)
        )
        .unwrap();
        if let Some(ref error) = status.archive_error {
            writeln!(output, "- **Error:** {}\n", error).unwrap();
        }

        writeln!(
            output,
            "### Vector Store ({}) {}\n",
            status.vector_store_driver,
            mark(status.vector_store_connected)
        )
        .unwrap();
        writeln!(output, "- **Collection:** {}", status.collection).unwrap();
        if let Some(points) = status.vector_store_points {
            writeln!(output, "- **Records:** {}", points).unwrap();
        }
        if let Some(ref error) = status.vector_store_error {
            writeln!(output, "- **Error:** {}", error).unwrap();
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
