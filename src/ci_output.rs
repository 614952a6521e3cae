//! Key/value outputs for the automation pipeline that drives `check`.

use std::io::{self, Write};
use std::path::PathBuf;

/// Destination for step outputs.
///
/// With a target file (the pipeline's `GITHUB_OUTPUT`) each value is
/// appended as `name=value`; without one, the legacy `::set-output`
/// command is printed to stdout so local runs stay readable.
#[derive(Debug, Clone, Default)]
pub struct CiOutput {
    target: Option<PathBuf>,
}

impl CiOutput {
    pub fn new(target: Option<PathBuf>) -> Self {
        Self { target }
    }

    pub fn set(&self, name: &str, value: &str) -> io::Result<()> {
        match &self.target {
            Some(path) => {
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                writeln!(file, "{}={}", name, value)
            }
            None => {
                println!("::set-output name={}::{}", name, value);
                Ok(())
            }
        }
    }
}
