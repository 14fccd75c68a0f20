use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sgp4::{Constants, Elements};

use super::error::EphemerisError;
use super::types::SatelliteInfo;

pub struct TleEntry {
    pub info: SatelliteInfo,
    pub elements: Elements,
    pub constants: Constants,
}

/// Satellites read from every `.tle`/`.txt` file in one folder, keyed by
/// NORAD id. A later file wins when two carry the same satellite.
pub struct TleLoader {
    folder: PathBuf,
    satellites: BTreeMap<u32, TleEntry>,
}

impl TleLoader {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            satellites: BTreeMap::new(),
        }
    }

    /// Re-reads the folder. Files that fail to parse are skipped with a
    /// warning; returns the number of satellites loaded.
    pub fn load(&mut self) -> Result<usize, EphemerisError> {
        if !self.folder.is_dir() {
            return Err(EphemerisError::DirectoryNotFound(
                self.folder.display().to_string(),
            ));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.folder)? {
            let path = entry?.path();
            let is_tle = path
                .extension()
                .is_some_and(|ext| ext == "tle" || ext == "txt");
            if path.is_file() && is_tle {
                paths.push(path);
            }
        }
        paths.sort();

        self.satellites.clear();
        for path in paths {
            match read_tle_file(&path) {
                Ok(entries) => {
                    for entry in entries {
                        self.satellites.insert(entry.info.norad_id, entry);
                    }
                }
                Err(e) => log::warn!("Skipping TLE file {}: {}", path.display(), e),
            }
        }

        log::info!(
            "Loaded {} satellites from {}",
            self.satellites.len(),
            self.folder.display()
        );
        Ok(self.satellites.len())
    }

    pub fn satellites(&self) -> impl Iterator<Item = &TleEntry> {
        self.satellites.values()
    }

    pub fn get(&self, norad_id: u32) -> Option<&TleEntry> {
        self.satellites.get(&norad_id)
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}

fn read_tle_file(path: &Path) -> Result<Vec<TleEntry>, EphemerisError> {
    let content = fs::read_to_string(path)?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    split_records(&content)
        .into_iter()
        .map(|(name, line1, line2)| {
            let invalid = |message: String| EphemerisError::InvalidTle {
                file: source.clone(),
                message,
            };
            let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
                .map_err(|e| invalid(e.to_string()))?;
            let constants =
                Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;

            Ok(TleEntry {
                info: SatelliteInfo {
                    name: name.unwrap_or_else(|| format!("NORAD {}", elements.norad_id)),
                    norad_id: elements.norad_id as u32,
                    tle_source: source.clone(),
                },
                elements,
                constants,
            })
        })
        .collect()
}

/// Splits a file into `(name, line1, line2)` records. Both the two-line and
/// the named three-line layouts are accepted; stray lines are ignored.
fn split_records(content: &str) -> Vec<(Option<String>, &str, &str)> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut records = Vec::new();
    let mut rest = lines.as_slice();
    loop {
        match rest {
            [l1, l2, tail @ ..] if l1.starts_with("1 ") && l2.starts_with("2 ") => {
                records.push((None, *l1, *l2));
                rest = tail;
            }
            [name, l1, l2, tail @ ..]
                if is_name_line(name) && l1.starts_with("1 ") && l2.starts_with("2 ") =>
            {
                records.push((Some(name.to_string()), *l1, *l2));
                rest = tail;
            }
            [_, tail @ ..] => rest = tail,
            [] => break,
        }
    }
    records
}

// Element lines and `#` comments never name a satellite.
fn is_name_line(line: &str) -> bool {
    !(line.starts_with('#') || line.starts_with("1 ") || line.starts_with("2 "))
}
