use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("first order page carries no usable x-pages header")]
    PageCount,

    #[error("failed to decode body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A single order or history record that could not be used.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("unexpected record shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid price: {0}")]
    InvalidPrice(f64),

    #[error("invalid {field}: {value}")]
    InvalidNumber { field: &'static str, value: f64 },

    #[error("negative volume: {0}")]
    NegativeVolume(i64),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value} (expected a finite, non-negative fraction)")]
    InvalidRate { field: &'static str, value: f64 },
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to read name file: {0}")]
    ReadNames(#[source] std::io::Error),

    #[error("failed to parse name file: {0}")]
    ParseNames(#[source] serde_json::Error),

    #[error("failed to encode report: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to build spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}
