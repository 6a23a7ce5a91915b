//! Start-up check for the optional parts of the stack.
//!
//! The tabular engine is always linked in. Spreadsheet support lives behind the
//! `xlsx` cargo feature; a build without it must refuse to start rather than
//! offer a half-working tool.

use std::fmt;

use serde::Serialize;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Tabular,
    Spreadsheet,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::Tabular, Capability::Spreadsheet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Tabular => "tabular data",
            Capability::Spreadsheet => "spreadsheet",
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Capability::Tabular => true,
            Capability::Spreadsheet => cfg!(feature = "xlsx"),
        }
    }

    pub fn remedy(&self) -> &'static str {
        match self {
            Capability::Tabular => "rebuild sweeper with its default dependencies",
            Capability::Spreadsheet => {
                "rebuild with `cargo install sweeper --features xlsx` (or drop `--no-default-features`)"
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn missing() -> Vec<Capability> {
    Capability::ALL
        .into_iter()
        .filter(|capability| !capability.is_available())
        .collect()
}

pub fn ensure_available() -> Result<()> {
    match missing().first() {
        Some(&capability) => Err(unavailable(capability)),
        None => Ok(()),
    }
}

/// Error returned when a code path needs a capability this build lacks.
pub(crate) fn unavailable(capability: Capability) -> PipelineError {
    PipelineError::MissingCapability {
        capability,
        remedy: capability.remedy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabular_capability_is_always_present() {
        assert!(Capability::Tabular.is_available());
        assert!(!missing().contains(&Capability::Tabular));
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn default_build_has_everything() {
        assert!(missing().is_empty());
        assert!(ensure_available().is_ok());
    }

    #[cfg(not(feature = "xlsx"))]
    #[test]
    fn spreadsheet_build_without_feature_refuses_to_start() {
        let err = ensure_available().expect_err("spreadsheet capability should be missing");
        assert!(err.to_string().contains("--features xlsx"));
    }
}
