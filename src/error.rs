use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Result type for the parts of the library that touch the outside world.
pub type EpiClusterResult<T> = Result<T, Box<dyn Error>>;

/// A [ClusterConfig](crate::ClusterConfig) value that the engine can't sensibly work with.
#[derive(Debug, Clone, Copy)]
pub struct ConfigError {
    pub msg: &'static str,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.msg)
    }
}

impl Error for ConfigError {}

/// A row of case record input that couldn't be understood.
#[derive(Debug, Clone)]
pub struct RecordError {
    /// Where the bad row came from, usually a file name.
    pub origin: String,
    /// The 1-based line number of the row, if known.
    pub line: Option<u64>,
    pub msg: String,
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match self.line {
            Some(line) => write!(f, "{} line {}: {}", self.origin, line, self.msg),
            None => write!(f, "{}: {}", self.origin, self.msg),
        }
    }
}

impl Error for RecordError {}
