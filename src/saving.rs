use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::spreadsheet::Spreadsheet;

/// Writes the whole workbook as gzip-compressed bincode (`.bin.gz`).
pub fn save_spreadsheet(spreadsheet: &Spreadsheet, filename: impl AsRef<Path>) -> Result<()> {
    let path = filename.as_ref();
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, spreadsheet)?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .finish()?
        .flush()?;

    info!("saved {} sheets to {}", spreadsheet.sheets.len(), path.display());
    Ok(())
}

pub fn load_spreadsheet(filename: impl AsRef<Path>) -> Result<Spreadsheet> {
    let path = filename.as_ref();
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    let spreadsheet: Spreadsheet = deserialize_from(&mut reader)?;
    info!("loaded {} sheets from {}", spreadsheet.sheets.len(), path.display());
    Ok(spreadsheet)
}

/// Loads the workbook at `filename`, or an empty one when the file does not exist yet.
pub fn load_or_default(filename: impl AsRef<Path>) -> Result<Spreadsheet> {
    if filename.as_ref().exists() {
        load_spreadsheet(filename)
    } else {
        Ok(Spreadsheet::new())
    }
}
