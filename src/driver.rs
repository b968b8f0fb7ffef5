//! Placement driver: runs extraction and injection passes over a script.
//!
//! # Extraction
//! For every record, the raw block at `address` is copied verbatim to
//! `<output>/clean/<dir>/<name>.bin` and decoded to `<output>/<dir>/<name>.png`.
//!
//! # Injection
//! For every record with a `<images>/<dir>/<name>.png`, the image is
//! converted, resized to the record's dimensions, encoded, and written over
//! the original block.  The container's length never changes.
//!
//! # Failure isolation
//! A bad record (unknown format, out-of-range address, unreadable image)
//! becomes [`Outcome::Failed`] in the [`BatchReport`] and the pass moves
//! on.  Only failures to open or write the container itself abort a pass.
//!
//! # Existing output
//! [`extract_file`] refuses a non-empty output directory unless
//! [`ExtractOptions::overwrite`] is set, so earlier backups are never
//! replaced by accident.

use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::codec::{decode, encode, CodecError};
use crate::container::{ContainerError, ContainerImage, ContainerWriter};
use crate::image_io::{load_for_format, save_png, ImageIoError, ResizeFilter};
use crate::report::{BatchReport, Operation, Outcome, RecordReport};
use crate::script::PlacementRecord;

/// Sub-directory of the output root holding raw backup artifacts.
pub const DEFAULT_BACKUP_DIR: &str = "clean";

// ── Errors ───────────────────────────────────────────────────────────────────

/// Aborts a whole pass.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
    #[error("Output directory {0:?} is not empty (pass --force to overwrite)")]
    OutputNotEmpty(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Fails a single record.
#[derive(Error, Debug)]
enum RecordError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Image(#[from] ImageIoError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Options ──────────────────────────────────────────────────────────────────

/// Configuration for [`extract`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub output_dir:   PathBuf,
    /// Where backups go; relative paths are resolved against `output_dir`.
    pub backup_dir:   PathBuf,
    pub write_backup: bool,
    /// Allow writing into a directory that already has files in it.
    pub overwrite:    bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir:   PathBuf::from("."),
            backup_dir:   PathBuf::from(DEFAULT_BACKUP_DIR),
            write_backup: true,
            overwrite:    false,
        }
    }
}

impl ExtractOptions {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self { output_dir: output_dir.as_ref().to_owned(), ..Self::default() }
    }

    pub fn image_path(&self, record: &PlacementRecord) -> PathBuf {
        self.output_dir.join(record.relative_path("png"))
    }

    pub fn backup_path(&self, record: &PlacementRecord) -> PathBuf {
        self.output_dir.join(&self.backup_dir).join(record.relative_path("bin"))
    }
}

/// Configuration for [`inject`].
#[derive(Debug, Clone)]
pub struct InjectOptions {
    /// Root of the `<dir>/<name>.png` replacement images.
    pub image_dir: PathBuf,
    pub filter:    ResizeFilter,
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self { image_dir: PathBuf::from("."), filter: ResizeFilter::default() }
    }
}

impl InjectOptions {
    pub fn new<P: AsRef<Path>>(image_dir: P) -> Self {
        Self { image_dir: image_dir.as_ref().to_owned(), ..Self::default() }
    }

    pub fn image_path(&self, record: &PlacementRecord) -> PathBuf {
        self.image_dir.join(record.relative_path("png"))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn content_hash(raw: &[u8]) -> String {
    hex::encode(blake3::hash(raw).as_bytes())
}

fn record_report(record: &PlacementRecord, outcome: Outcome) -> RecordReport {
    RecordReport {
        directory: record.directory.clone(),
        name:      record.name.clone(),
        format:    record.format.clone(),
        address:   record.address,
        outcome,
    }
}

fn failed(record: &PlacementRecord, err: impl std::fmt::Display) -> Outcome {
    tracing::warn!("{} @ 0x{:X}: {}", record.name, record.address, err);
    Outcome::Failed { reason: err.to_string() }
}

fn is_populated(dir: &Path) -> io::Result<bool> {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

// ── Extract ──────────────────────────────────────────────────────────────────

/// Open the container read-only and run [`extract`].
///
/// Fails with [`DriverError::OutputNotEmpty`] before reading anything if
/// `output_dir` already has entries and `overwrite` is off.
pub fn extract_file<P: AsRef<Path>>(
    container: P,
    records:   &[PlacementRecord],
    opts:      &ExtractOptions,
) -> Result<BatchReport, DriverError> {
    if !opts.overwrite && is_populated(&opts.output_dir)? {
        return Err(DriverError::OutputNotEmpty(opts.output_dir.clone()));
    }
    let image = ContainerImage::open(container)?;
    Ok(extract(&image, records, opts))
}

/// Extract every record.  Never aborts; see the report for failures.
pub fn extract(
    image:   &ContainerImage,
    records: &[PlacementRecord],
    opts:    &ExtractOptions,
) -> BatchReport {
    tracing::info!(
        "Extracting {} record(s) into {:?}",
        records.len(),
        opts.output_dir,
    );

    let run = |record: &PlacementRecord| {
        let outcome = match extract_record(image, record, opts) {
            Ok((bytes, content_hash)) => {
                tracing::debug!("extracted {} ({} bytes)", record.name, bytes);
                Outcome::Processed { bytes, content_hash }
            }
            Err(e) => failed(record, e),
        };
        record_report(record, outcome)
    };

    // Records read disjoint ranges of an immutable image, so they can run
    // on the rayon pool; collect keeps script order either way.
    #[cfg(feature = "parallel")]
    let reports: Vec<RecordReport> = {
        use rayon::prelude::*;
        records.par_iter().map(run).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let reports: Vec<RecordReport> = records.iter().map(run).collect();

    let report = BatchReport::new(Operation::Extract, reports);
    tracing::info!("{}", report.summary());
    report
}

fn extract_record(
    image:  &ContainerImage,
    record: &PlacementRecord,
    opts:   &ExtractOptions,
) -> Result<(usize, String), RecordError> {
    let format = record.format()?;
    let len    = format.byte_len(record.width, record.height)?;
    let raw    = image.block(record.address, len)?;

    if opts.write_backup {
        let backup = opts.backup_path(record);
        create_parent(&backup)?;
        std::fs::write(&backup, raw)?;
    }

    let pixels = decode(raw, record.width, record.height, format)?;
    let png = opts.image_path(record);
    create_parent(&png)?;
    save_png(&pixels, &png)?;

    Ok((len, content_hash(raw)))
}

// ── Inject ───────────────────────────────────────────────────────────────────

/// Open the container for in-place writing and run [`inject`].
pub fn inject_file<P: AsRef<Path>>(
    container: P,
    records:   &[PlacementRecord],
    opts:      &InjectOptions,
) -> Result<BatchReport, DriverError> {
    let mut writer = ContainerWriter::open(container)?;
    inject(&mut writer, records, opts)
}

/// Inject every record that has a replacement image, one at a time.
///
/// Returns `Err` only when writing to the container fails; records already
/// written stay written.
pub fn inject<W: Read + Write + Seek>(
    writer:  &mut ContainerWriter<W>,
    records: &[PlacementRecord],
    opts:    &InjectOptions,
) -> Result<BatchReport, DriverError> {
    tracing::info!(
        "Injecting up to {} record(s) from {:?}",
        records.len(),
        opts.image_dir,
    );

    let mut reports = Vec::with_capacity(records.len());
    for record in records {
        let outcome = inject_record(writer, record, opts)?;
        reports.push(record_report(record, outcome));
    }
    writer.flush()?;

    let report = BatchReport::new(Operation::Inject, reports);
    tracing::info!("{}", report.summary());
    Ok(report)
}

fn inject_record<W: Read + Write + Seek>(
    writer: &mut ContainerWriter<W>,
    record: &PlacementRecord,
    opts:   &InjectOptions,
) -> Result<Outcome, DriverError> {
    let path = opts.image_path(record);
    if !path.is_file() {
        tracing::warn!("{}: no replacement image at {:?}, skipping", record.name, path);
        return Ok(Outcome::Skipped { reason: format!("no image at {}", path.display()) });
    }

    // Range is checked before the image is loaded or resized.
    let expected = match record.byte_len() {
        Ok(len) => len,
        Err(e)  => return Ok(failed(record, e)),
    };
    if let Err(e) = writer.check_range(record.address, expected) {
        return Ok(failed(record, e));
    }

    let raw = match encode_replacement(&path, record, expected, opts) {
        Ok(raw) => raw,
        Err(e)  => return Ok(failed(record, e)),
    };

    match writer.write_block(record.address, &raw) {
        Ok(()) => {
            tracing::debug!("injected {} at 0x{:X} ({} bytes)", record.name, record.address, raw.len());
            Ok(Outcome::Processed { bytes: raw.len(), content_hash: content_hash(&raw) })
        }
        Err(e @ ContainerError::OutOfRange { .. }) => Ok(failed(record, e)),
        Err(e) => Err(e.into()),
    }
}

fn encode_replacement(
    path:     &Path,
    record:   &PlacementRecord,
    expected: usize,
    opts:     &InjectOptions,
) -> Result<Vec<u8>, RecordError> {
    let format = record.format()?;
    let pixels = load_for_format(path, format, record.width, record.height, opts.filter)?;
    let raw = encode(&pixels, format)?;
    if raw.len() != expected {
        return Err(CodecError::ShortInput { expected, actual: raw.len() }.into());
    }
    Ok(raw)
}
