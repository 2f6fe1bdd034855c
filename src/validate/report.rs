use serde::Serialize;
use std::fmt;

use super::{
    category::{Category, ReportMode},
    unused::AuditOutcome,
};

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub mode: ReportMode,
    #[serde(flatten)]
    pub outcome: AuditOutcome,
    /// Used identifiers declared only in files left out of the pk4.
    pub excluded_but_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub mission: String,
    pub maps: Vec<String>,
    pub categories: Vec<CategoryReport>,
    pub warnings: Vec<String>,
}

impl fmt::Display for CategoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.category.name();
        match &self.outcome {
            AuditOutcome::NothingDeclared => writeln!(f, "{}: nothing to check", name)?,
            outcome if outcome.is_ok() => writeln!(f, "{}: all Ok", name)?,
            AuditOutcome::UnusedDefinitions(unused) => {
                let count: usize = unused.values().map(|identifiers| identifiers.len()).sum();
                writeln!(f, "{}: {} unused definition(s)", name, count)?;
                for (path, identifiers) in unused.iter() {
                    writeln!(f, "  {}", path)?;
                    for identifier in identifiers {
                        writeln!(f, "    {}", identifier)?;
                    }
                }
            }
            AuditOutcome::UnusedFiles(unused) => {
                writeln!(f, "{}: {} unused file(s)", name, unused.len())?;
                for path in unused {
                    writeln!(f, "  {}", path)?;
                }
            }
        }

        if !self.excluded_but_used.is_empty() {
            writeln!(f, "{}: used but only declared in excluded files", name)?;
            for identifier in self.excluded_but_used.iter() {
                writeln!(f, "    {}", identifier)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validating {} ({})", self.mission, self.maps.join(", "))?;
        for category in self.categories.iter() {
            write!(f, "{}", category)?;
        }
        if !self.warnings.is_empty() {
            writeln!(f, "{} warning(s)", self.warnings.len())?;
        }
        Ok(())
    }
}
