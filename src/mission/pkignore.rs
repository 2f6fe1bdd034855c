use anyhow::Context;
use std::{collections::BTreeSet, path::Path};

pub const PKIGNORE_FILENAME: &str = ".pkignore";

const DEFAULT_IGNORED_FOLDERS: [&str; 2] = ["__pycache__", ".git"];

const DEFAULT_IGNORED_FILES: [&str; 14] = [
    PKIGNORE_FILENAME,
    crate::config::CONFIG_FILENAME,
    ".lin",
    "bak",
    ".log",
    ".dat",
    ".py",
    ".pyc",
    ".pk4",
    ".zip",
    ".7z",
    ".rar",
    ".gitignore",
    ".gitattributes",
];

/// Substring filters deciding which mission files stay out of the pk4.
#[derive(Debug, Clone)]
pub struct IgnoreList {
    pub folders: BTreeSet<String>,
    pub files: BTreeSet<String>,
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self {
            folders: DEFAULT_IGNORED_FOLDERS.iter().map(|s| s.to_string()).collect(),
            files: DEFAULT_IGNORED_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn filter_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| match line.find('#') {
            Some(index) => &line[..index],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

impl IgnoreList {
    /// Default filters plus the mission's `.pkignore`, when it has one.
    pub fn load(mission_path: &Path) -> Result<Self, anyhow::Error> {
        let mut ignore_list = IgnoreList::default();
        let path = mission_path.join(PKIGNORE_FILENAME);
        if path.is_file() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            ignore_list.add_filters(&text);
            log::debug!(
                "Loaded {}: folders {:?}, files {:?}",
                PKIGNORE_FILENAME,
                ignore_list.folders,
                ignore_list.files
            );
        }
        Ok(ignore_list)
    }

    pub fn add_filters(&mut self, text: &str) {
        for line in filter_lines(text) {
            if let Some(folder) = line.strip_prefix("./") {
                self.folders.insert(folder.to_lowercase());
            } else if let Some(folder) = line.strip_prefix('/') {
                self.folders.insert(folder.to_lowercase());
            } else if let Some(folder) = line.strip_suffix('/') {
                self.folders.insert(folder.to_lowercase());
            } else {
                self.files.insert(line.to_lowercase());
            }
        }
    }

    pub fn ignores_folder(&self, relative_path: &str) -> bool {
        let relative_path = relative_path.to_lowercase();
        self.folders
            .iter()
            .any(|filter| relative_path.contains(filter.as_str()))
    }

    pub fn ignores_file(&self, relative_path: &str) -> bool {
        let relative_path = relative_path.to_lowercase();
        self.files
            .iter()
            .any(|filter| relative_path.contains(filter.as_str()))
    }
}

/// The filters of the mission's `.pkignore` as a comma separated list.
pub fn read_filters_csv(mission_path: &Path) -> Result<String, anyhow::Error> {
    let path = mission_path.join(PKIGNORE_FILENAME);
    if !path.is_file() {
        return Ok(String::new());
    }

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(filter_lines(&text).collect::<Vec<_>>().join(", "))
}

/// Replace the mission's `.pkignore` with the given comma or whitespace
/// separated filters.
pub fn write_filters(mission_path: &Path, filters: &str) -> Result<(), anyhow::Error> {
    let filters: Vec<&str> = if filters.contains(',') {
        filters
            .split(',')
            .map(str::trim)
            .filter(|filter| !filter.is_empty())
            .collect()
    } else {
        filters.split_whitespace().collect()
    };

    let path = mission_path.join(PKIGNORE_FILENAME);
    std::fs::write(&path, filters.join("\n"))
        .with_context(|| format!("Failed to write {}", path.display()))
}
