//! Linear byte-sequence search for backup artifacts.
//!
//! # How it works
//!
//! Each artifact is searched for independently over the whole container,
//! and every occurrence is reported, overlapping ones included.  Candidate
//! positions are found by scanning for the artifact's first byte and then
//! comparing the full slice.  Artifacts are independent, so with the
//! `parallel` feature they are searched on the rayon pool.
//!
//! ## Progress
//!
//! `scan()` accepts an optional callback called after every artifact with
//! `(artifacts_done, artifacts_total)`.  Pass `None` to disable progress
//! reporting.

use std::path::Path;

use super::{load_backups, ArtifactMatch, BackupArtifact, RelocateError, ScanReport};

/// Every offset at which `needle` occurs in `haystack`, ascending.
///
/// Overlapping matches are all reported.  An empty needle matches nowhere.
pub fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<u64> {
    let mut out = Vec::new();
    let Some(&first) = needle.first() else { return out };
    if needle.len() > haystack.len() {
        return out;
    }
    let last_start = haystack.len() - needle.len();

    let mut pos = 0usize;
    while pos <= last_start {
        match haystack[pos..=last_start].iter().position(|&b| b == first) {
            Some(i) => {
                let at = pos + i;
                if &haystack[at..at + needle.len()] == needle {
                    out.push(at as u64);
                }
                pos = at + 1;
            }
            None => break,
        }
    }
    out
}

fn match_artifact(container: &[u8], artifact: &BackupArtifact) -> ArtifactMatch {
    if artifact.bytes.is_empty() {
        tracing::warn!("{:?} is empty; nothing to search for", artifact.relative_path);
    }
    let occurrences = find_all(container, &artifact.bytes);
    tracing::debug!("{}: {} occurrence(s)", artifact.name, occurrences.len());
    ArtifactMatch {
        name:          artifact.name.clone(),
        relative_path: artifact.relative_path.clone(),
        size:          artifact.bytes.len(),
        occurrences,
    }
}

/// Search `container` for every artifact.
///
/// # Arguments
/// * `container`: the image to search.
/// * `artifacts`: raw blocks from an earlier extraction.
/// * `progress` : optional progress callback; called after each artifact.
///
/// # Returns
/// A [`ScanReport`] with one [`ArtifactMatch`] per artifact, in input
/// order.  Artifacts that were not found have no occurrences.
pub fn scan<F>(
    container:    &[u8],
    artifacts:    &[BackupArtifact],
    mut progress: Option<&mut F>,
) -> ScanReport
where
    F: FnMut(usize, usize),
{
    let total = artifacts.len();

    #[cfg(feature = "parallel")]
    let matches: Vec<ArtifactMatch> = {
        use rayon::prelude::*;
        let out: Vec<ArtifactMatch> = artifacts
            .par_iter()
            .map(|a| match_artifact(container, a))
            .collect();
        if let Some(cb) = progress.as_mut() {
            cb(total, total);
        }
        out
    };

    #[cfg(not(feature = "parallel"))]
    let matches: Vec<ArtifactMatch> = artifacts
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let m = match_artifact(container, a);
            if let Some(cb) = progress.as_mut() {
                cb(i + 1, total);
            }
            m
        })
        .collect();

    let report = ScanReport { container_size: container.len() as u64, matches };
    tracing::info!("{}", report.summary());
    report
}

/// Convenience: load backups under `backup_dir`, read `container`, scan.
pub fn scan_file(container: &Path, backup_dir: &Path) -> Result<ScanReport, RelocateError> {
    let artifacts = load_backups(backup_dir)?;
    let bytes     = std::fs::read(container)?;
    Ok(scan::<fn(usize, usize)>(&bytes, &artifacts, None))
}
