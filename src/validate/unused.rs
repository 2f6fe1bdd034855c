use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::{category::ReportMode, used::UsedSet};

/// Definition file path to the identifiers it declares, in file order.
pub type Catalog = BTreeMap<String, Vec<String>>;

/// Files and identifiers which are allowed to stay unused.
#[derive(Debug, Default, Clone)]
pub struct Allowlist {
    pub files: HashSet<String>,
    pub identifiers: HashSet<String>,
}

impl Allowlist {
    pub fn new<'a>(
        files: impl IntoIterator<Item = &'a String>,
        identifiers: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        Self {
            files: files.into_iter().cloned().collect(),
            identifiers: identifiers.into_iter().cloned().collect(),
        }
    }

    fn candidates<'a>(&'a self, identifiers: &'a [String]) -> impl Iterator<Item = &'a String> {
        identifiers
            .iter()
            .filter(move |identifier| !self.identifiers.contains(identifier.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome", content = "unused")]
pub enum AuditOutcome {
    NothingDeclared,
    UnusedDefinitions(BTreeMap<String, Vec<String>>),
    UnusedFiles(Vec<String>),
}

impl AuditOutcome {
    pub fn is_ok(&self) -> bool {
        match self {
            AuditOutcome::NothingDeclared => true,
            AuditOutcome::UnusedDefinitions(unused) => unused.is_empty(),
            AuditOutcome::UnusedFiles(unused) => unused.is_empty(),
        }
    }
}

pub fn unused_definitions(
    catalog: &Catalog,
    used: &UsedSet,
    allowlist: &Allowlist,
) -> BTreeMap<String, Vec<String>> {
    let mut unused = BTreeMap::new();
    for (path, identifiers) in catalog.iter() {
        if allowlist.files.contains(path) {
            continue;
        }

        let unused_identifiers: Vec<String> = allowlist
            .candidates(identifiers)
            .filter(|identifier| !used.contains(identifier))
            .cloned()
            .collect();
        if !unused_identifiers.is_empty() {
            unused.insert(path.clone(), unused_identifiers);
        }
    }
    unused
}

/// Files whose every identifier is unused. A file with nothing left to check
/// after the allowlist is never flagged.
pub fn unused_files(catalog: &Catalog, used: &UsedSet, allowlist: &Allowlist) -> Vec<String> {
    catalog
        .iter()
        .filter(|(path, _)| !allowlist.files.contains(path.as_str()))
        .filter(|(_, identifiers)| {
            let mut candidates = allowlist.candidates(identifiers).peekable();
            candidates.peek().is_some() && candidates.all(|identifier| !used.contains(identifier))
        })
        .map(|(path, _)| path.clone())
        .collect()
}

pub fn audit_catalog(
    catalog: &Catalog,
    used: &UsedSet,
    allowlist: &Allowlist,
    mode: ReportMode,
) -> AuditOutcome {
    if catalog.values().all(|identifiers| identifiers.is_empty()) {
        return AuditOutcome::NothingDeclared;
    }

    match mode {
        ReportMode::PerDefinition => {
            AuditOutcome::UnusedDefinitions(unused_definitions(catalog, used, allowlist))
        }
        ReportMode::PerFile => AuditOutcome::UnusedFiles(unused_files(catalog, used, allowlist)),
    }
}

/// Used identifiers which only excluded files declare.
pub fn declared_only_in_excluded(
    included: &Catalog,
    excluded: &Catalog,
    used: &UsedSet,
) -> Vec<String> {
    let shipped: HashSet<&str> = included
        .values()
        .flatten()
        .map(|identifier| identifier.as_str())
        .collect();

    excluded
        .values()
        .flatten()
        .filter(|identifier| !shipped.contains(identifier.as_str()))
        .filter(|identifier| used.contains(identifier))
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
