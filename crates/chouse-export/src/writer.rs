//! Encode the export table as CSV or xlsx, in memory or to a file.

use std::io::Write;
use std::path::{Path, PathBuf};

use arrow::array::{Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use chouse_core::{ExportFormat, NormalizedRecord};
use rust_xlsxwriter::{Format, Workbook};
use tempfile::NamedTempFile;
use tracing::info;

use crate::ExportError;
use crate::table::to_record_batch;

const SHEET_NAME: &str = "Companies";

/// Encode `records` in `format`. Empty input is [`ExportError::NothingToExport`].
pub fn export(records: &[NormalizedRecord], format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let batch = to_record_batch(records)?;
    match format {
        ExportFormat::Csv => csv_bytes(&batch),
        ExportFormat::Xlsx => xlsx_bytes(&batch),
    }
}

fn csv_bytes(batch: &RecordBatch) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new().with_header(true).build(Vec::new());
    writer.write(batch)?;
    Ok(writer.into_inner())
}

fn xlsx_bytes(batch: &RecordBatch) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    for (col, field) in batch.schema_ref().fields().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, field.name(), &header)?;
    }

    for (col, column) in batch.columns().iter().enumerate() {
        let values = column
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| ExportError::Other(format!("column {col} is not Utf8")))?;
        for row in 0..values.len() {
            sheet.write_string(row as u32 + 1, col as u16, values.value(row))?;
        }
    }
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

/// File name stem for an export of `query`: lowercase alphanumerics with
/// every other run of characters collapsed to `_`.
pub fn file_stem_for(query: &str) -> String {
    let mut slug = String::with_capacity(query.len());
    for ch in query.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "exported_companies".to_string()
    } else {
        format!("exported_companies_{slug}")
    }
}

/// An export request: records, target format, and output file name.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub records: Vec<NormalizedRecord>,
    pub format: ExportFormat,
    pub file_name: String,
}

/// A rendered export persisted to disk.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportJob {
    /// `file_name` is `stem` plus the format's extension.
    pub fn new(records: Vec<NormalizedRecord>, format: ExportFormat, stem: &str) -> Self {
        Self {
            file_name: format!("{stem}.{}", format.extension()),
            records,
            format,
        }
    }

    pub fn render(&self) -> Result<Vec<u8>, ExportError> {
        export(&self.records, self.format)
    }

    /// Render and write to `dir/file_name`, replacing any earlier file of the
    /// same name. The file appears complete or not at all.
    pub fn write_to(&self, dir: &Path) -> Result<ExportedFile, ExportError> {
        let bytes = self.render()?;
        std::fs::create_dir_all(dir).map_err(|e| ExportError::io(dir, e))?;

        let path = dir.join(&self.file_name);
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ExportError::io(dir, e))?;
        tmp.write_all(&bytes).map_err(|e| ExportError::io(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| ExportError::io(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| ExportError::io(&path, e.error))?;

        info!(
            path = %path.display(),
            rows = self.records.len(),
            format = %self.format,
            bytes = bytes.len(),
            "export written"
        );
        Ok(ExportedFile {
            path,
            file_name: self.file_name.clone(),
            format: self.format,
            bytes,
        })
    }
}
