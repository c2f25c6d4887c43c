//! File utilities.

use serde::de::DeserializeOwned;
use serde_json::from_reader;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::path::Path;

/// Reads a JSON-encoded type from a given file `path`.
pub fn read_json<D: DeserializeOwned>(path: impl AsRef<Path>) -> Result<D, io::Error> {
    let file = File::open(path)?;
    Ok(from_reader(BufReader::new(file))?)
}
