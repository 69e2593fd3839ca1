//! Optional CSV snapshot of free numbers
//!
//! Offline mode only. The file holds live inventory in clear text, so a
//! successful live fetch removes it unless the operator asks to keep one.
//!
//! Layout: a single `phone_number` column, one value per row.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::phone::PhoneNumberSet;

/// Column header; no variation is accepted
pub const CSV_HEADER: &str = "phone_number";

/// Default snapshot file name
pub const DEFAULT_CSV_FILE: &str = "available_phone_numbers.csv";

/// Write `numbers` to `path` in display order, replacing any existing file
pub fn save(numbers: &PhoneNumberSet, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record([CSV_HEADER])?;
    for number in numbers.iter() {
        writer.write_record([number])?;
    }
    writer.flush()?;
    info!("Saved {} numbers to {}", numbers.len(), path.display());
    Ok(())
}

/// Read a snapshot. A missing file is an empty set.
pub fn load(path: &Path) -> Result<PhoneNumberSet> {
    if !path.exists() {
        debug!("No snapshot at {}", path.display());
        return Ok(PhoneNumberSet::new());
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = reader.headers()?.clone();
    if headers.len() != 1 || &headers[0] != CSV_HEADER {
        bail!(
            "{} is not a phone number snapshot (expected a single '{}' column)",
            path.display(),
            CSV_HEADER
        );
    }

    let mut numbers = PhoneNumberSet::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed row in {}", path.display()))?;
        if let Some(value) = record.get(0).filter(|v| !v.trim().is_empty()) {
            numbers.insert(value);
        }
    }
    debug!("Loaded {} numbers from {}", numbers.len(), path.display());
    Ok(numbers)
}

/// Remove the snapshot if it exists. Returns true if a file was deleted.
pub fn discard(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    info!("Removed snapshot {}", path.display());
    Ok(true)
}
