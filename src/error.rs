use std::path::PathBuf;
use thiserror::Error;

pub type PackResult<T> = Result<T, PackError>;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Layout config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read workbook {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("Missing required column '{column}' in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("Unsupported file format '{extension}': {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Unsupported template format: {} (save the template as .xlsx)", path.display())]
    UnsupportedTemplate { path: PathBuf },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{stage} failed for {}: {source}", path.display())]
    Stage {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: Box<PackError>,
    },
}

impl PackError {
    /// Wrap an error with the pipeline stage and file it happened in.
    pub fn at_stage(self, stage: &'static str, path: impl Into<PathBuf>) -> Self {
        PackError::Stage {
            stage,
            path: path.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn workbook(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        PackError::Workbook {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for PackError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        PackError::Export(e.to_string())
    }
}
