//! Availability check between the paths a configuration marks as secret and
//! the paths a secrets tree actually provides.

use std::collections::HashSet;

use thiserror::Error;

use crate::tree::{Path, Segment};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoverageError {
    #[error("No plaintext available for these secrets: {{ {} }}.", join(.0))]
    Unavailable(Vec<Path>),
}

fn join(paths: &[Path]) -> String {
    paths.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Wanted paths that no available path covers. A wanted path is covered when
/// an available path equals it or lies beneath it, so marking a whole subtree
/// is satisfied by any leaf under it. Order follows `wanted`.
pub fn missing(wanted: &[Path], available: &[Path]) -> Vec<Path> {
    let covered: HashSet<&[Segment]> = available.iter().flat_map(|path| path.prefixes()).collect();
    wanted
        .iter()
        .filter(|path| !covered.contains(path.segments()))
        .cloned()
        .collect()
}

/// Fails with every uncovered path at once.
pub fn ensure_covered(wanted: &[Path], available: &[Path]) -> Result<(), CoverageError> {
    let uncovered = missing(wanted, available);
    if uncovered.is_empty() {
        Ok(())
    } else {
        Err(CoverageError::Unavailable(uncovered))
    }
}
