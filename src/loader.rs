// 📂 Record Loader - CSV → typed in-memory tables
//
// No transformation happens here. Missing columns are filled with nulls
// (serde defaults) and reported; unreadable rows are skipped and reported.
// The three raw byte streams are hashed into a SnapshotId so identical
// inputs are recognized as the same snapshot.

use crate::diagnostics::PipelineWarning;
use crate::entities::{Deal, Founder, SourceRecord, Startup};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// SNAPSHOT IDENTITY
// ============================================================================

/// SHA-256 over the three raw sources (founders, startups, deals).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn of_sources(founders: &[u8], startups: &[u8], deals: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        for source in [founders, startups, deals] {
            // length prefix keeps ("ab", "c") distinct from ("a", "bc")
            hasher.update((source.len() as u64).to_le_bytes());
            hasher.update(source);
        }
        SnapshotId(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for logs
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// LOADED TABLES
// ============================================================================

#[derive(Debug, Clone)]
pub struct LoadedTable<T> {
    pub records: Vec<T>,
    pub warnings: Vec<PipelineWarning>,
}

/// Read-only raw snapshot of the three sources.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    pub id: SnapshotId,
    /// Provenance only; never part of aggregation output
    pub loaded_at: DateTime<Utc>,
    pub founders: Vec<Founder>,
    pub startups: Vec<Startup>,
    pub deals: Vec<Deal>,
    pub warnings: Vec<PipelineWarning>,
}

impl SourceSnapshot {
    /// Load the three CSV files
    pub fn load(founders: &Path, startups: &Path, deals: &Path) -> Result<Self> {
        let founders_bytes = fs::read(founders)
            .with_context(|| format!("Failed to read founders file: {}", founders.display()))?;
        let startups_bytes = fs::read(startups)
            .with_context(|| format!("Failed to read startups file: {}", startups.display()))?;
        let deals_bytes = fs::read(deals)
            .with_context(|| format!("Failed to read deals file: {}", deals.display()))?;

        Self::from_bytes(&founders_bytes, &startups_bytes, &deals_bytes)
    }

    /// Parse three in-memory CSV documents
    pub fn from_bytes(founders: &[u8], startups: &[u8], deals: &[u8]) -> Result<Self> {
        let id = SnapshotId::of_sources(founders, startups, deals);

        let founders = read_table::<Founder, _>(founders)?;
        let startups = read_table::<Startup, _>(startups)?;
        let deals = read_table::<Deal, _>(deals)?;

        let mut warnings = founders.warnings;
        warnings.extend(startups.warnings);
        warnings.extend(deals.warnings);

        info!(
            snapshot = %id.short(),
            founders = founders.records.len(),
            startups = startups.records.len(),
            deals = deals.records.len(),
            warnings = warnings.len(),
            "loaded source snapshot"
        );

        Ok(SourceSnapshot {
            id,
            loaded_at: Utc::now(),
            founders: founders.records,
            startups: startups.records,
            deals: deals.records,
            warnings,
        })
    }

    /// Build a snapshot from records already in memory.
    ///
    /// The id hashes the records' JSON form, so equal tables share an id.
    pub fn from_records(founders: Vec<Founder>, startups: Vec<Startup>, deals: Vec<Deal>) -> Result<Self> {
        let id = SnapshotId::of_sources(
            &serde_json::to_vec(&founders).context("Failed to encode founders")?,
            &serde_json::to_vec(&startups).context("Failed to encode startups")?,
            &serde_json::to_vec(&deals).context("Failed to encode deals")?,
        );

        Ok(SourceSnapshot {
            id,
            loaded_at: Utc::now(),
            founders,
            startups,
            deals,
            warnings: Vec::new(),
        })
    }
}

// ============================================================================
// TABLE READER
// ============================================================================

/// Read one CSV source into typed records.
///
/// Only I/O failures are errors. Absent columns and undecodable rows become
/// warnings and the read continues.
pub fn read_table<T, R>(reader: R) -> Result<LoadedTable<T>>
where
    T: SourceRecord,
    R: Read,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let raw_headers = rdr
        .byte_headers()
        .with_context(|| format!("Failed to read {} header", T::ENTITY))?
        .clone();

    let mut warnings = Vec::new();
    let headers = match StringRecord::from_byte_record(raw_headers) {
        Ok(headers) => headers,
        Err(err) => {
            let lossy: Vec<String> = err
                .into_byte_record()
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect();
            let headers = StringRecord::from(lossy);
            warn!(source = T::ENTITY, "header is not valid UTF-8; decoding lossily");
            warnings.push(PipelineWarning::malformed_header(T::ENTITY));
            rdr.set_headers(headers.clone());
            headers
        }
    };

    for column in T::COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            let is_key = *column == T::KEY_COLUMN;
            warn!(source = T::ENTITY, column = *column, key = is_key, "column missing; filling with nulls");
            warnings.push(PipelineWarning::missing_column(T::ENTITY, column, is_key));
        }
    }

    let mut records = Vec::new();
    for result in rdr.deserialize::<T>() {
        match result {
            Ok(record) => records.push(record),
            Err(err) if err.is_io_error() => {
                return Err(err).with_context(|| format!("Failed to read {} source", T::ENTITY));
            }
            Err(err) => {
                let line = err.position().map(|p| p.line());
                warn!(source = T::ENTITY, line = ?line, error = %err, "skipping unreadable row");
                warnings.push(PipelineWarning::malformed_row(T::ENTITY, line, &err.to_string()));
            }
        }
    }

    Ok(LoadedTable { records, warnings })
}

// ============================================================================
// TESTS
// ============================================================================
