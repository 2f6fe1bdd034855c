use anyhow::Context;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

use fmpak_file_readers::{FmPath, FmPathBuf, HostFilesystem};

mod pkignore;

pub use pkignore::{read_filters_csv, write_filters, IgnoreList, PKIGNORE_FILENAME};

pub const MODFILE_FILENAME: &str = "darkmod.txt";
pub const STARTING_MAP_FILENAME: &str = "startingmap.txt";
pub const MAP_SEQUENCE_FILENAME: &str = "tdm_mapsequence.txt";
pub const MAPS_DIRECTORY: &str = "maps";

#[derive(Error, Debug)]
pub enum MissionError {
    #[error("invalid path '{}'", .0.display())]
    InvalidPath(PathBuf),
    #[error("no 'darkmod.txt' found at path '{}'", .0.display())]
    MissingModFile(PathBuf),
    #[error("no 'startingmap.txt' or 'tdm_mapsequence.txt' found at path '{}'", .0.display())]
    NoMapsDeclared(PathBuf),
    #[error("invalid directory '{0}'")]
    InvalidDirectory(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionFile {
    pub absolute_path: PathBuf,
    pub relative_path: FmPathBuf,
}

impl MissionFile {
    pub fn is_map_file(&self) -> bool {
        self.relative_path
            .as_str()
            .starts_with(&format!("{}/", MAPS_DIRECTORY))
    }
}

/// Every file of the mission, split by whether it goes into the pk4.
#[derive(Debug, Default)]
pub struct MissionFileSet {
    pub included: Vec<MissionFile>,
    pub excluded: Vec<MissionFile>,
    pub dir_count: usize,
}

/// Files shown by `--check` and the directories they span.
#[derive(Debug, Default)]
pub struct FileListing<'a> {
    pub files: Vec<&'a str>,
    pub dir_count: usize,
}

pub struct Mission {
    pub name: String,
    pub root_path: PathBuf,
    pub ignore_list: IgnoreList,
}

impl Mission {
    /// `path` may be `.` or relative to the current directory.
    pub fn open(path: &Path) -> Result<Self, anyhow::Error> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        let root_path = if path == Path::new(".") {
            current_dir
        } else if path.is_absolute() {
            path.to_path_buf()
        } else {
            current_dir.join(path)
        };

        if !root_path.is_dir() {
            return Err(MissionError::InvalidPath(root_path).into());
        }

        if !root_path.join(MODFILE_FILENAME).is_file() {
            return Err(MissionError::MissingModFile(root_path).into());
        }

        let name = root_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| MissionError::InvalidPath(root_path.clone()))?;
        let ignore_list = IgnoreList::load(&root_path)?;

        Ok(Self {
            name,
            root_path,
            ignore_list,
        })
    }

    pub fn filesystem(&self) -> HostFilesystem {
        HostFilesystem::new(self.root_path.clone())
    }

    pub fn map_path(&self, map_name: &str) -> FmPathBuf {
        FmPathBuf::new(&format!("{}/{}.map", MAPS_DIRECTORY, map_name))
    }

    /// Map names from `startingmap.txt`, or else from `tdm_mapsequence.txt`.
    pub fn map_names(&self) -> Result<Vec<String>, anyhow::Error> {
        let starting_map = self.root_path.join(STARTING_MAP_FILENAME);
        if starting_map.is_file() {
            let text = std::fs::read_to_string(&starting_map)
                .with_context(|| format!("Failed to read {}", starting_map.display()))?;
            return Ok(text
                .lines()
                .next()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| vec![name.to_string()])
                .unwrap_or_default());
        }

        let map_sequence = self.root_path.join(MAP_SEQUENCE_FILENAME);
        if map_sequence.is_file() {
            let text = std::fs::read_to_string(&map_sequence)
                .with_context(|| format!("Failed to read {}", map_sequence.display()))?;
            return Ok(parse_map_sequence(&text));
        }

        Err(MissionError::NoMapsDeclared(self.root_path.clone()).into())
    }

    fn relative_path(&self, path: &Path) -> Option<FmPathBuf> {
        let relative = path.strip_prefix(&self.root_path).ok()?;
        let path: FmPath = relative.into();
        Some((&path).into())
    }

    /// Walk the mission directory and partition its files by the ignore list.
    /// Only the maps directory files belonging to `map_names` are included.
    pub fn collect_files(&self, map_names: &[String]) -> Result<MissionFileSet, anyhow::Error> {
        let mut file_set = MissionFileSet::default();
        let mut map_files = Vec::new();

        let walker = WalkDir::new(&self.root_path)
            .min_depth(1)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    log::warn!("Skipping unreadable directory entry: {}", error);
                    continue;
                }
            };

            let relative_path = match self.relative_path(entry.path()) {
                Some(relative_path) => relative_path,
                None => continue,
            };
            let path = FmPath::from(&relative_path);
            let mut components = path.components();
            let in_maps_directory = components.next() == Some(MAPS_DIRECTORY);
            let depth = entry.depth();

            if entry.file_type().is_dir() {
                if !in_maps_directory && !self.ignore_list.ignores_folder(path.as_str()) {
                    file_set.dir_count += 1;
                }
                continue;
            }

            let file = MissionFile {
                absolute_path: entry.path().to_path_buf(),
                relative_path: relative_path.clone(),
            };

            if in_maps_directory {
                let file_name = path.file_name();
                let is_map_file = depth == 2
                    && map_names.iter().any(|name| file_name.starts_with(name.as_str()))
                    && !self.ignore_list.ignores_file(file_name);
                if is_map_file {
                    map_files.push(file);
                } else {
                    file_set.excluded.push(file);
                }
                continue;
            }

            let parent = path
                .as_str()
                .rsplit_once('/')
                .map_or("", |(parent, _)| parent);
            if self.ignore_list.ignores_folder(parent)
                || self.ignore_list.ignores_file(path.as_str())
            {
                file_set.excluded.push(file);
            } else {
                file_set.included.push(file);
            }
        }

        if map_files.is_empty() {
            log::warn!("No map files found for maps {:?}", map_names);
        } else {
            file_set.dir_count += 1;
        }
        file_set.included.extend(map_files);

        Ok(file_set)
    }

    /// Included files to show for `--check`: everything, only the map files
    /// for `maps`, or the files below `directory` relative to it.
    pub fn list_files<'a>(
        &self,
        file_set: &'a MissionFileSet,
        directory: Option<&str>,
    ) -> Result<FileListing<'a>, MissionError> {
        let directory = directory.map(FmPathBuf::new);
        match directory
            .as_ref()
            .map(|directory| directory.as_str().trim_end_matches('/'))
        {
            None | Some("") | Some(".") => Ok(FileListing {
                files: file_set
                    .included
                    .iter()
                    .map(|file| file.relative_path.as_str())
                    .collect(),
                dir_count: file_set.dir_count,
            }),
            Some(MAPS_DIRECTORY) => Ok(FileListing {
                files: file_set
                    .included
                    .iter()
                    .filter(|file| file.is_map_file())
                    .map(|file| file.relative_path.as_str())
                    .collect(),
                dir_count: 0,
            }),
            Some(directory) => {
                if !self.root_path.join(directory).is_dir() {
                    return Err(MissionError::InvalidDirectory(directory.to_string()));
                }

                let prefix = format!("{}/", directory);
                let files: Vec<&str> = file_set
                    .included
                    .iter()
                    .filter_map(|file| file.relative_path.as_str().strip_prefix(&prefix))
                    .collect();

                // Every parent directory below `directory`
                let dir_count = files
                    .iter()
                    .flat_map(|path| path.match_indices('/').map(move |(index, _)| &path[..index]))
                    .collect::<BTreeSet<&str>>()
                    .len();

                Ok(FileListing { files, dir_count })
            }
        }
    }
}

/// `Mission 1: map_a map_b` lines, in order.
fn parse_map_sequence(text: &str) -> Vec<String> {
    let mut map_names = Vec::new();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line.starts_with("//") {
            continue;
        }

        match line.split_once(':') {
            Some((_, names)) => {
                map_names.extend(names.split_whitespace().map(|name| name.to_string()))
            }
            None => log::warn!("Skipping {} line '{}'", MAP_SEQUENCE_FILENAME, line),
        }
    }
    map_names
}
