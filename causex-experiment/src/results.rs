use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use causex_core::{ExportError, ResultRecord};
use tracing::{info, warn};

pub const CSV_HEADER: &str = "ParticipantID,Trial,Block,CollisionType,WhichChanges,Lag,O1Start,O2Start,Score,T1Value,T2Value,T1Object,T2Object,T1Response,T2Response,AttentionPrompt,IsTraining,Burst,NumTargets";

/// Legacy exports left `false` and a zero score as empty cells
pub const CSV_VALUE_ENCODING: &str =
    "booleans are written as true/false and a zero score as 0, never as empty cells";

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    /// The log was empty; no file was created
    NothingToExport,
}

/// Append-only log of every completed trial, in completion order
#[derive(Debug, Clone, Default)]
pub struct ResultsLog {
    records: Vec<ResultRecord>,
}

impl ResultsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(CSV_HEADER.len() + 1 + self.records.len() * 96);
        out.push_str(CSV_HEADER);
        out.push('\n');
        for record in &self.records {
            out.push_str(&csv_row(record));
            out.push('\n');
        }
        out
    }

    /// Writes `experiment_results_<participant>.csv` into `dir`.
    pub fn export_csv(&self, dir: &Path, participant_id: &str) -> Result<ExportOutcome, ExportError> {
        if self.is_empty() {
            warn!("no results to export");
            return Ok(ExportOutcome::NothingToExport);
        }
        let path = dir.join(format!("experiment_results_{participant_id}.csv"));
        std::fs::write(&path, self.to_csv()).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), rows = self.len(), "results exported as csv");
        Ok(ExportOutcome::Written {
            path,
            rows: self.len(),
        })
    }

    pub fn export_json(&self, dir: &Path, participant_id: &str) -> Result<ExportOutcome, ExportError> {
        if self.is_empty() {
            warn!("no results to export");
            return Ok(ExportOutcome::NothingToExport);
        }
        let path = dir.join(format!("experiment_results_{participant_id}.json"));
        let io_err = |source| ExportError::Io {
            path: path.clone(),
            source,
        };
        let file = File::create(&path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.records)
            .map_err(|e| ExportError::Json(e.to_string()))?;
        writer.flush().map_err(io_err)?;
        info!(path = %path.display(), rows = self.len(), "results exported as json");
        Ok(ExportOutcome::Written {
            path,
            rows: self.len(),
        })
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Quotes a cell only when it would break the row
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn csv_row(r: &ResultRecord) -> String {
    let cells = [
        csv_field(&r.participant_id).into_owned(),
        r.trial.to_string(),
        r.block.to_string(),
        r.collision_type.to_string(),
        r.which_changes.to_string(),
        r.lag_ms.to_string(),
        opt(r.o1_start),
        opt(r.o2_start),
        opt(r.score),
        opt(r.t1_value),
        opt(r.t2_value),
        opt(r.t1_object),
        opt(r.t2_object),
        r.t1_response.map(|x| x.as_export()).unwrap_or_default(),
        r.t2_response.map(|x| x.as_export()).unwrap_or_default(),
        r.attention_prompt
            .as_deref()
            .map(|p| csv_field(p).into_owned())
            .unwrap_or_default(),
        r.is_training.to_string(),
        r.burst.to_string(),
        r.num_targets.to_string(),
    ];
    cells.join(",")
}
