//! Pipeline tuning knobs shared by the server and the CLI.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_MAX_PAGES: usize = 500;

/// Parameters for one search → detail → export run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `items_per_page` sent to the registry; also the last-page threshold.
    pub page_size: usize,
    /// Maximum concurrent detail lookups.
    pub workers: usize,
    /// Upper bound on search pages fetched for one query.
    pub max_pages: usize,
    /// Raw search-page cache directory; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Where exported files are written before being streamed back.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            workers: DEFAULT_WORKERS,
            max_pages: DEFAULT_MAX_PAGES,
            cache_dir: None,
            output_dir: PathBuf::from("exports"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown export format {0:?} (expected excel, xlsx or csv)")]
pub struct UnknownFormat(pub String);

/// Output file format for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "excel" | "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_aliases() {
        assert_eq!("excel".parse::<ExportFormat>(), Ok(ExportFormat::Xlsx));
        assert_eq!("XLSX".parse::<ExportFormat>(), Ok(ExportFormat::Xlsx));
        assert_eq!(" csv ".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("".parse::<ExportFormat>(), Ok(ExportFormat::Xlsx));
    }

    #[test]
    fn unknown_format_rejected() {
        let err = "pdf".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err, UnknownFormat("pdf".into()));
    }

    #[test]
    fn defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.page_size, 20);
        assert_eq!(cfg.workers, 10);
        assert!(cfg.cache_dir.is_none());
        assert_eq!(ExportFormat::default().extension(), "xlsx");
    }
}
