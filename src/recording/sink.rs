//! Persistence sinks a finished session is flushed to.
//!
//! Every sink writes one new file per session, named by `naming`. The sink
//! never clears the caller's buffer; on error the rows stay in memory so the
//! operator can retry the flush.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use rust_xlsxwriter::Workbook;

use crate::recording::binary::pack_channels;
use crate::recording::naming::next_session_path;
use crate::recording::session::RecordedRow;
use crate::sampling::error::RigError;

const FULL_HEADER: [&str; 14] = [
    "timestamp", "C1", "C2", "C3", "C4", "F1", "F2", "F3", "P1", "P2", "P3", "R1", "R2", "R3",
];

/// Column layouts used by the rig's CSV consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvColumns {
    /// The raw capture layout: `timestamp,C1..C4,F1..F3`.
    Raw,
    /// Everything, ready for the downstream resistance consumers:
    /// `timestamp,C1..C4,F1..F3,P1..P3,R1..R3`.
    Full,
}

pub trait RecordSink {
    /// Write one session's rows to a fresh file, returning its path.
    fn write_session(&self, rows: &[RecordedRow]) -> Result<PathBuf, RigError>;

    /// Short name for log lines.
    fn kind(&self) -> &'static str;
}

pub struct CsvSink {
    dir: PathBuf,
    label: String,
    columns: CsvColumns,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>, label: impl Into<String>, columns: CsvColumns) -> Self {
        Self {
            dir: dir.into(),
            label: label.into(),
            columns,
        }
    }

    fn write_to(&self, path: &Path, rows: &[RecordedRow]) -> Result<(), RigError> {
        let mut writer = csv::Writer::from_path(path)?;
        match self.columns {
            CsvColumns::Raw => writer.write_record(&FULL_HEADER[..8])?,
            CsvColumns::Full => writer.write_record(FULL_HEADER)?,
        }
        for row in rows {
            let mut record: Vec<String> = Vec::with_capacity(14);
            record.push(row.timestamp.to_string());
            record.extend(row.channels.iter().map(|c| c.to_string()));
            record.extend(row.flags.iter().map(|f| f.to_string()));
            if self.columns == CsvColumns::Full {
                record.extend(row.positions.iter().map(|p| p.to_string()));
                record.extend(row.resistances.iter().map(|r| r.to_string()));
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl RecordSink for CsvSink {
    fn write_session(&self, rows: &[RecordedRow]) -> Result<PathBuf, RigError> {
        let path = next_session_path(&self.dir, Local::now().date_naive(), &self.label, "csv")?;
        self.write_to(&path, rows)?;
        Ok(path)
    }

    fn kind(&self) -> &'static str {
        "csv"
    }
}

/// Packed-record sink: 4 native-endian `i32` per row, nothing else.
pub struct BinarySink {
    dir: PathBuf,
    label: String,
}

impl BinarySink {
    pub fn new(dir: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            label: label.into(),
        }
    }
}

impl RecordSink for BinarySink {
    fn write_session(&self, rows: &[RecordedRow]) -> Result<PathBuf, RigError> {
        let path = next_session_path(&self.dir, Local::now().date_naive(), &self.label, "bin")?;
        let mut writer = BufWriter::new(File::create(&path)?);
        for row in rows {
            writer.write_all(&pack_channels(&row.channels))?;
        }
        writer.flush()?;
        Ok(path)
    }

    fn kind(&self) -> &'static str {
        "bin"
    }
}

/// Workbook sink for the operators who open sessions straight in a
/// spreadsheet. Always carries the full column layout; everything is written
/// as numbers so the columns chart without coercion.
pub struct XlsxSink {
    dir: PathBuf,
    label: String,
}

impl XlsxSink {
    pub fn new(dir: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            label: label.into(),
        }
    }
}

impl RecordSink for XlsxSink {
    fn write_session(&self, rows: &[RecordedRow]) -> Result<PathBuf, RigError> {
        let path = next_session_path(&self.dir, Local::now().date_naive(), &self.label, "xlsx")?;
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Data")?;
        for (col, header) in FULL_HEADER.iter().enumerate() {
            sheet.write_string(0, col as u16, *header)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            sheet.write_number(r, 0, row.timestamp)?;
            for (j, c) in row.channels.iter().enumerate() {
                sheet.write_number(r, (1 + j) as u16, *c)?;
            }
            for (j, f) in row.flags.iter().enumerate() {
                sheet.write_number(r, (5 + j) as u16, *f)?;
            }
            for (j, p) in row.positions.iter().enumerate() {
                sheet.write_number(r, (8 + j) as u16, *p)?;
            }
            for (j, res) in row.resistances.iter().enumerate() {
                sheet.write_number(r, (11 + j) as u16, *res)?;
            }
        }
        workbook.save(&path)?;
        Ok(path)
    }

    fn kind(&self) -> &'static str {
        "xlsx"
    }
}
