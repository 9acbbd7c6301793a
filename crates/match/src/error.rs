use std::fmt;

#[derive(Debug)]
pub enum MatchError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, overlapping columns, etc.).
    ConfigValidation(String),
    /// CSV parse error while loading a raw table.
    Csv(String),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
        }
    }
}

impl std::error::Error for MatchError {}
