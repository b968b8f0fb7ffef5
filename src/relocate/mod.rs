//! Re-anchoring placement scripts to a different build of the container.
//!
//! Backup artifacts from an earlier extraction are searched for verbatim in
//! another container image (a different region or revision of the same
//! game).  Every record whose artifact is found gets the address of the
//! first occurrence; the rest are flagged so the script can list them for
//! manual search.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::script::{Entry, PlacementRecord};

pub mod scanner;

pub use scanner::{find_all, scan, scan_file};

#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("Cannot walk backup directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Offsets listed individually in the text report before eliding.
pub const MAX_LISTED_OFFSETS: usize = 5;

// ── Backup artifacts ─────────────────────────────────────────────────────────

/// One raw `.bin` block written by an earlier extraction.
#[derive(Debug, Clone)]
pub struct BackupArtifact {
    /// File stem, which is the record name.
    pub name:          String,
    /// Path relative to the backup root, e.g. `object_link/eye_open.bin`.
    pub relative_path: PathBuf,
    pub bytes:         Vec<u8>,
}

/// Load every `*.bin` under `root`, sorted by relative path.
pub fn load_backups<P: AsRef<Path>>(root: P) -> Result<Vec<BackupArtifact>, RelocateError> {
    let root = root.as_ref();
    let mut out = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "bin") {
            continue;
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative_path = path.strip_prefix(root).unwrap_or(path).to_owned();
        out.push(BackupArtifact { name, relative_path, bytes: std::fs::read(path)? });
    }
    tracing::info!("Loaded {} backup artifact(s) from {:?}", out.len(), root);
    Ok(out)
}

// ── Scan results ─────────────────────────────────────────────────────────────

/// Where one artifact occurs in the scanned container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMatch {
    pub name:          String,
    pub relative_path: PathBuf,
    pub size:          usize,
    pub occurrences:   Vec<u64>,
}

impl ArtifactMatch {
    pub fn first(&self) -> Option<u64> { self.occurrences.first().copied() }

    pub fn directory(&self) -> String {
        self.relative_path
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    }
}

/// Result of [`scan`]: one entry per artifact, in load order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub container_size: u64,
    pub matches:        Vec<ArtifactMatch>,
}

impl ScanReport {
    pub fn found(&self) -> usize {
        self.matches.iter().filter(|m| !m.occurrences.is_empty()).count()
    }

    pub fn missing(&self) -> usize {
        self.matches.iter().filter(|m| m.occurrences.is_empty()).count()
    }

    /// Occurrences beyond the first, summed over all artifacts.
    pub fn duplicates(&self) -> usize {
        self.matches.iter().map(|m| m.occurrences.len().saturating_sub(1)).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} artifact(s): {} found, {} missing, {} duplicate occurrence(s)",
            self.matches.len(),
            self.found(),
            self.missing(),
            self.duplicates(),
        )
    }

    /// Human-readable report: totals, then one block per artifact sorted
    /// by path.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(80);
        let _ = writeln!(out, "{rule}\nBACKUP ARTIFACT SCAN\n{rule}\n");
        let _ = writeln!(out, "Total artifacts: {}", self.matches.len());
        let _ = writeln!(out, "Found: {}", self.found());
        let _ = writeln!(out, "Missing: {}", self.missing());
        let _ = writeln!(out, "Duplicates: {}", self.duplicates());
        let _ = writeln!(out, "\n{rule}\n");

        let mut sorted: Vec<&ArtifactMatch> = self.matches.iter().collect();
        sorted.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        for m in sorted {
            let _ = writeln!(out, "Name: {}", m.name);
            let _ = writeln!(out, "Size: {} bytes", m.size);
            let _ = writeln!(out, "Occurrences: {}", m.occurrences.len());
            match m.occurrences.len() {
                0 => { let _ = writeln!(out, "Status: MISSING"); }
                n if n <= MAX_LISTED_OFFSETS => {
                    let list: Vec<String> = m.occurrences.iter().map(|o| format!("0x{o:X}")).collect();
                    let _ = writeln!(out, "Offsets: {}", list.join(", "));
                }
                n => {
                    let _ = writeln!(out, "Offsets: ({n} occurrences, too many to list)");
                    let _ = writeln!(out, "First offset: 0x{:X}", m.occurrences[0]);
                }
            }
            out.push('\n');
        }
        out
    }

    /// Best match for `record`: same name, preferring the same directory,
    /// and only if it was actually found.
    pub fn lookup(&self, record: &PlacementRecord) -> Option<&ArtifactMatch> {
        let mut fallback = None;
        for m in self.matches.iter().filter(|m| m.name == record.name && !m.occurrences.is_empty()) {
            if m.directory() == record.directory {
                return Some(m);
            }
            fallback.get_or_insert(m);
        }
        fallback
    }
}

// ── Relocation ───────────────────────────────────────────────────────────────

/// A record after relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    /// Address replaced with the first occurrence in the scanned container.
    Placed(PlacementRecord),
    /// Artifact missing or never found.
    Missing(PlacementRecord),
}

impl Relocation {
    pub fn entry(&self) -> Entry<'_> {
        match self {
            Relocation::Placed(r)  => Entry::Placed(r),
            Relocation::Missing(r) => Entry::Missing(r),
        }
    }
}

/// Re-anchor `records` against `report`, preserving order.
pub fn relocate_records(records: &[PlacementRecord], report: &ScanReport) -> Vec<Relocation> {
    records
        .iter()
        .map(|r| match report.lookup(r).and_then(ArtifactMatch::first) {
            Some(address) => Relocation::Placed(PlacementRecord { address, ..r.clone() }),
            None => {
                tracing::warn!("{}/{}: no match in scanned container", r.directory, r.name);
                Relocation::Missing(r.clone())
            }
        })
        .collect()
}

/// Relocated script text; missing records become commented-out lines.
pub fn render_relocated(relocations: &[Relocation]) -> String {
    crate::script::render_entries(relocations.iter().map(Relocation::entry))
}

/// Count of records per outcome: `(placed, missing)`.
pub fn tally(relocations: &[Relocation]) -> (usize, usize) {
    let placed = relocations.iter().filter(|r| matches!(r, Relocation::Placed(_))).count();
    (placed, relocations.len() - placed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(dir: &str, name: &str, address: u64) -> PlacementRecord {
        PlacementRecord {
            directory: dir.into(),
            width:     2,
            height:    1,
            format:    "I8".into(),
            address,
            name:      name.into(),
        }
    }

    fn matched(path: &str, occurrences: Vec<u64>) -> ArtifactMatch {
        let p = PathBuf::from(path);
        ArtifactMatch {
            name:          p.file_stem().unwrap().to_string_lossy().into_owned(),
            relative_path: p,
            size:          2,
            occurrences,
        }
    }

    #[test]
    fn totals() {
        let report = ScanReport {
            container_size: 100,
            matches: vec![
                matched("a/x.bin", vec![1, 5, 9]),
                matched("a/y.bin", vec![]),
                matched("b/z.bin", vec![3]),
            ],
        };
        assert_eq!((report.found(), report.missing(), report.duplicates()), (2, 1, 2));
        assert_eq!(
            report.summary(),
            "3 artifact(s): 2 found, 1 missing, 2 duplicate occurrence(s)"
        );
    }

    #[test]
    fn text_report_elides_long_offset_lists() {
        let report = ScanReport {
            container_size: 100,
            matches: vec![
                matched("many.bin", (0..7).collect()),
                matched("few.bin", vec![0x10, 0x20]),
                matched("none.bin", vec![]),
            ],
        };
        let text = report.render_text();
        assert!(text.contains("Offsets: 0x10, 0x20"));
        assert!(text.contains("Offsets: (7 occurrences, too many to list)"));
        assert!(text.contains("First offset: 0x0"));
        assert!(text.contains("Status: MISSING"));
        assert!(text.find("few").unwrap() < text.find("many").unwrap());
    }

    #[test]
    fn lookup_prefers_same_directory() {
        let report = ScanReport {
            container_size: 100,
            matches: vec![
                matched("a/tex.bin", vec![0x40]),
                matched("b/tex.bin", vec![0x80]),
                matched("c/tex.bin", vec![]),
            ],
        };
        assert_eq!(report.lookup(&record("b", "tex", 0)).unwrap().first(), Some(0x80));
        assert_eq!(report.lookup(&record("c", "tex", 0)).unwrap().first(), Some(0x40));
        assert!(report.lookup(&record("a", "other", 0)).is_none());
    }

    #[test]
    fn relocation_rewrites_addresses_and_flags_missing() {
        let report = ScanReport {
            container_size: 100,
            matches: vec![matched("d/a.bin", vec![0x20, 0x60]), matched("d/b.bin", vec![])],
        };
        let records = vec![record("d", "a", 0x1000), record("d", "b", 0x2000)];
        let out = relocate_records(&records, &report);
        assert_eq!(out[0], Relocation::Placed(record("d", "a", 0x20)));
        assert_eq!(out[1], Relocation::Missing(record("d", "b", 0x2000)));
        assert_eq!(tally(&out), (1, 1));

        let text = render_relocated(&out);
        assert!(text.contains("Exp I8 20 a"));
        assert!(text.contains("# Exp I8 XXXX b"));
    }
}
