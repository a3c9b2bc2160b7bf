use std::{fmt, fs, path::Path, str::FromStr};

use ahash::AHashMap;

use super::AllocationError;

/// Reduction applied to one weight-layer attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationMode {
    Sum,              // "Aggregate": area-apportioned total
    Average,          // Area-weighted mean
    DiscreteOverlap,  // Value of the piece with the largest overlap
    DiscreteCentroid, // Value of the weight polygon containing the output centroid
    AreaPercent,      // Fraction of output area per category value
}

impl AllocationMode {
    pub fn to_str(&self) -> &'static str {
        match self {
            AllocationMode::Sum => "Aggregate",
            AllocationMode::Average => "Average",
            AllocationMode::DiscreteOverlap => "DiscreteOverlap",
            AllocationMode::DiscreteCentroid => "DiscreteCentroid",
            AllocationMode::AreaPercent => "AreaPercent",
        }
    }

    /// Sentinel accepted in place of a mode file, applying one mode to every attribute.
    pub fn from_global_sentinel(source: &str) -> Option<Self> {
        match source {
            "ALL_AGGREGATE" => Some(AllocationMode::Sum),
            "ALL_AVERAGE" => Some(AllocationMode::Average),
            "ALL_DISCRETEOVERLAP" => Some(AllocationMode::DiscreteOverlap),
            "ALL_DISCRETECENTROID" => Some(AllocationMode::DiscreteCentroid),
            "ALL_AREAPERCENT" => Some(AllocationMode::AreaPercent),
            _ => None,
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.to_str()) }
}

impl FromStr for AllocationMode {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AGGREGATE" | "SUM" => Ok(AllocationMode::Sum),
            "AVERAGE" => Ok(AllocationMode::Average),
            "DISCRETEOVERLAP" | "DISCRETE_OVERLAP" => Ok(AllocationMode::DiscreteOverlap),
            "DISCRETECENTROID" | "DISCRETE_CENTROID" => Ok(AllocationMode::DiscreteCentroid),
            "AREAPERCENT" | "AREA_PERCENT" => Ok(AllocationMode::AreaPercent),
            _ => Err(AllocationError::config(format!("unknown allocation mode {:?}", s.trim()))),
        }
    }
}

/// Per-attribute allocation modes, or one mode for every attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationModeTable {
    All(AllocationMode),
    PerAttribute(AHashMap<String, AllocationMode>),
}

impl AllocationModeTable {
    /// Build a table from `source`: either an `ALL_<MODE>` sentinel or the
    /// path of a mode file with `ATTRIBUTE=<name>:<mode>` lines.
    pub fn parse(source: &str) -> Result<Self, AllocationError> {
        if let Some(mode) = AllocationMode::from_global_sentinel(source.trim()) {
            return Ok(AllocationModeTable::All(mode));
        }
        let path = Path::new(source);
        let text = fs::read_to_string(path)
            .map_err(|source| AllocationError::Io { path: path.to_path_buf(), source })?;
        Self::from_str_source(&path.display().to_string(), &text)
    }

    /// Parse mode-file text. `origin` names the source in error messages.
    pub fn from_str_source(origin: &str, text: &str) -> Result<Self, AllocationError> {
        let mut modes = AHashMap::new();

        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') { continue }

            let line = line.to_uppercase();
            let (key, value) = line.split_once('=')
                .ok_or_else(|| AllocationError::config(format!(
                    "syntax error in {origin}, line {}: expected ATTRIBUTE=<name>:<mode>, got {raw:?}", n + 1
                )))?;
            if key.trim() != "ATTRIBUTE" {
                return Err(AllocationError::config(format!(
                    "syntax error in {origin}, line {}: unknown keyword {:?}", n + 1, key.trim()
                )));
            }
            let (name, mode) = value.split_once(':')
                .ok_or_else(|| AllocationError::config(format!(
                    "syntax error in {origin}, line {}: missing ':' between attribute name and mode in {raw:?}", n + 1
                )))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(AllocationError::config(format!(
                    "syntax error in {origin}, line {}: empty attribute name", n + 1
                )));
            }

            let mode = mode.parse::<AllocationMode>()
                .map_err(|err| AllocationError::config(format!("{origin}, line {}: {err}", n + 1)))?;

            if modes.insert(name.to_string(), mode).is_some() {
                return Err(AllocationError::config(format!(
                    "ATTRIBUTE={name} appears more than once in {origin} (line {})", n + 1
                )));
            }
        }

        Ok(AllocationModeTable::PerAttribute(modes))
    }

    /// Mode for `name`. A table in "ALL" form ignores the name; otherwise
    /// the match is exact against the stored (upper-cased) names.
    pub fn lookup(&self, name: &str) -> Option<AllocationMode> {
        match self {
            AllocationModeTable::All(mode) => Some(*mode),
            AllocationModeTable::PerAttribute(modes) => modes.get(name).copied(),
        }
    }

    /// Number of explicit entries (1 for the "ALL" form).
    pub fn len(&self) -> usize {
        match self {
            AllocationModeTable::All(_) => 1,
            AllocationModeTable::PerAttribute(modes) => modes.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
