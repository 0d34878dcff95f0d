//! # File Record Source
//!
//! Student records from JSON files.
//!
//! A single record is a flat object of raw fields. A records file maps
//! enrollment ids to such objects:
//!
//! ```json
//! { "E-1001": { "subject_code": "MATH201", "Quiz 2": 80, "Midterm_Marks": null } }
//! ```

use crate::error::{AppError, read_json};
use gradecast_core::{InMemoryRecordSource, StudentRecord};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Read one record from a JSON file.
pub fn read_record(path: &Path) -> Result<StudentRecord, AppError> {
    read_json(path)
}

/// Load a records file into an in-memory source.
pub fn load_records(path: &Path) -> Result<InMemoryRecordSource, AppError> {
    let entries: BTreeMap<String, StudentRecord> = read_json(path)?;
    let mut source = InMemoryRecordSource::new();
    for (enrollment_id, record) in entries {
        source.insert(enrollment_id, record);
    }
    info!(path = %path.display(), records = source.len(), "records loaded");
    Ok(source)
}
