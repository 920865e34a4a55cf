//! Probe outcomes and how they are rendered

use std::io::{self, Write};

use clap::ValueEnum;
use comfy_table::{Table, presets::UTF8_FULL};
use serde::Serialize;
use tinyprobe_core::ProbeError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Failed,
}

/// One line of a probe's output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub label: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// `ProbeError::kind` of the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

/// Rows of an ad-hoc query, already formatted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub name: String,
    pub title: String,
    pub steps: Vec<StepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableData>,
}

impl ProbeReport {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            steps: Vec::new(),
            table: None,
        }
    }

    pub fn ok(&mut self, label: impl Into<String>) {
        self.push(label.into(), StepStatus::Ok, None, None);
    }

    pub fn ok_with(&mut self, label: impl Into<String>, detail: impl ToString) {
        self.push(label.into(), StepStatus::Ok, Some(detail.to_string()), None);
    }

    /// Record a failed step carrying the driver's message
    pub fn fail(&mut self, label: impl Into<String>, error: &ProbeError) {
        self.fail_with(label, error.kind(), error.to_string());
    }

    pub fn fail_with(&mut self, label: impl Into<String>, kind: &str, message: impl ToString) {
        self.push(
            label.into(),
            StepStatus::Failed,
            Some(message.to_string()),
            Some(kind.to_string()),
        );
    }

    fn push(
        &mut self,
        label: String,
        status: StepStatus,
        detail: Option<String>,
        error_kind: Option<String>,
    ) {
        if status == StepStatus::Failed {
            tracing::debug!(probe = %self.name, step = %label, ?detail, "step failed");
        }
        self.steps.push(StepOutcome {
            label,
            status,
            detail,
            error_kind,
        });
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Failed)
    }

    /// First step with the given label
    pub fn step(&self, label: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|step| step.label == label)
    }
}

/// Render one report as text. Successes go to `out`, failures to `err`.
pub fn render_text<O: Write, E: Write>(report: &ProbeReport, out: &mut O, err: &mut E) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", report.title)?;
    writeln!(out, "{}", "=".repeat(50))?;

    for step in &report.steps {
        match (step.status, &step.detail) {
            (StepStatus::Ok, Some(detail)) => writeln!(out, "✓ {}: {}", step.label, detail)?,
            (StepStatus::Ok, None) => writeln!(out, "✓ {}", step.label)?,
            (StepStatus::Failed, Some(detail)) => writeln!(err, "✗ {}: {}", step.label, detail)?,
            (StepStatus::Failed, None) => writeln!(err, "✗ {}", step.label)?,
        }
    }

    if let Some(data) = &report.table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(&data.columns);
        for row in &data.rows {
            table.add_row(row);
        }
        writeln!(out, "{table}")?;
    }

    out.flush()?;
    err.flush()
}

/// Render every report as one JSON array
pub fn render_json<O: Write>(reports: &[ProbeReport], out: &mut O) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, reports)?;
    writeln!(out)?;
    Ok(())
}
