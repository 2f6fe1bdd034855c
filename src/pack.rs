use anyhow::Context;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::mission::{Mission, MissionFile, MissionFileSet};

const PK4_EXTENSION: &str = "pk4";

#[derive(Debug, Clone, Copy)]
pub struct PackSummary {
    pub dir_count: usize,
    pub file_count: usize,
    pub elapsed: Duration,
}

/// `<mission name>.pk4` inside the mission directory.
pub fn default_output_path(mission: &Mission) -> PathBuf {
    mission
        .root_path
        .join(format!("{}.{}", mission.name, PK4_EXTENSION))
}

/// Write every included file into a deflate compressed pk4 archive,
/// calling `on_file` once each file has been added.
pub fn pack_files(
    file_set: &MissionFileSet,
    output_path: &Path,
    mut on_file: impl FnMut(&MissionFile),
) -> Result<PackSummary, anyhow::Error> {
    let start = Instant::now();
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.to_string_lossy()))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    let mut file_count = 0;
    for mission_file in file_set.included.iter() {
        if mission_file.absolute_path == output_path {
            continue;
        }

        writer
            .start_file(mission_file.relative_path.as_str(), options)
            .with_context(|| format!("Failed to add {}", mission_file.relative_path.as_str()))?;
        let mut source = File::open(&mission_file.absolute_path).with_context(|| {
            format!(
                "Failed to open {}",
                mission_file.absolute_path.to_string_lossy()
            )
        })?;
        std::io::copy(&mut source, &mut writer)
            .with_context(|| format!("Failed to write {}", mission_file.relative_path.as_str()))?;
        file_count += 1;
        on_file(mission_file);
    }

    let mut buffer = writer
        .finish()
        .with_context(|| format!("Failed to finish {}", output_path.to_string_lossy()))?;
    buffer.flush()?;

    Ok(PackSummary {
        dir_count: file_set.dir_count,
        file_count,
        elapsed: start.elapsed(),
    })
}
