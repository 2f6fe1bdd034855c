use anyhow::Context;
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use crate::{reader::FmFileReader, FmFile, ReadError};

/// A path relative to the mission root, always using forward slashes.
#[derive(Default, Debug, Hash, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FmPathBuf {
    path: String,
}

impl FmPathBuf {
    pub fn new(path: &str) -> Self {
        FmPathBuf {
            path: FmPath::normalise_path(path),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Hash, Clone)]
pub struct FmPath<'a> {
    path: Cow<'a, str>,
}

impl<'a> FmPath<'a> {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn normalise_path(path: &str) -> String {
        let path = path.trim().replace('\\', "/");
        let path = path.trim_start_matches("./").trim_start_matches('/');
        path.to_string()
    }

    /// File name component, everything after the final slash.
    pub fn file_name(&self) -> &str {
        let path: &str = &self.path;
        path.rsplit_once('/').map_or(path, |(_, name)| name)
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|component| !component.is_empty())
    }
}

impl<'a> From<&'a str> for FmPath<'_> {
    fn from(path: &'a str) -> Self {
        FmPath {
            path: Cow::Owned(FmPath::normalise_path(path)),
        }
    }
}

impl<'a> From<&'a Path> for FmPath<'_> {
    fn from(path: &'a Path) -> Self {
        FmPath {
            path: Cow::Owned(FmPath::normalise_path(path.to_string_lossy().as_ref())),
        }
    }
}

impl<'a> From<&'a FmPath<'a>> for FmPath<'a> {
    fn from(path: &'a FmPath<'a>) -> Self {
        FmPath {
            path: Cow::Borrowed(&path.path),
        }
    }
}

impl<'a> From<&'a FmPathBuf> for FmPath<'a> {
    fn from(path: &'a FmPathBuf) -> Self {
        FmPath {
            path: Cow::Borrowed(&path.path),
        }
    }
}

impl<'a> From<&FmPath<'a>> for FmPathBuf {
    fn from(path: &FmPath<'a>) -> Self {
        FmPathBuf {
            path: path.path.to_string(),
        }
    }
}

/// Mission directory on the host filesystem.
pub struct HostFilesystem {
    pub root_path: PathBuf,
}

impl HostFilesystem {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn host_path<'a>(&self, path: impl Into<FmPath<'a>>) -> PathBuf {
        let fm_path: FmPath = path.into();
        self.root_path.join(fm_path.as_str())
    }

    pub fn open_file<'a>(&self, path: impl Into<FmPath<'a>>) -> Result<Vec<u8>, ReadError> {
        let host_path = self.host_path(path);
        std::fs::read(&host_path).map_err(|source| ReadError::UnreadableFile {
            path: host_path,
            source,
        })
    }

    pub fn read_file<'a, T: FmFile + Sized, P: Into<FmPath<'a>>>(
        &self,
        path: P,
    ) -> Result<T, anyhow::Error> {
        self.read_file_with(path, &Default::default())
    }

    pub fn read_file_with<'a, T: FmFile + Sized, P: Into<FmPath<'a>>>(
        &self,
        path: P,
        options: &T::ReadOptions,
    ) -> Result<T, anyhow::Error> {
        let fm_path: FmPath = path.into();

        let buffer = self.open_file(&fm_path)?;
        T::read(FmFileReader::from(&buffer), options)
            .with_context(|| format!("Failed to read {}", fm_path.as_str()))
    }
}
