mod filesystem;
mod reader;
pub use reader::{FmFileReader, ReadError};

pub trait FmFile {
    type ReadOptions: Default;

    fn read(reader: FmFileReader, options: &Self::ReadOptions) -> Result<Self, anyhow::Error>
    where
        Self: Sized;
}

mod decl;
mod map;
mod wildcard;

pub use decl::{DeclFile, DeclReadOptions};
pub use filesystem::{FmPath, FmPathBuf, HostFilesystem};
pub use map::{MapBrush, MapEntity, MapFile, MapPatch};
pub use wildcard::Wildcard;
