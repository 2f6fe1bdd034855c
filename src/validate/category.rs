use serde::{Deserialize, Serialize};

use fmpak_file_readers::{DeclReadOptions, FmPath, Wildcard};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Models,
    Materials,
    Skins,
    Particles,
    Entities,
    Xdata,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMode {
    PerDefinition,
    PerFile,
}

pub enum DefinitionSource {
    /// Every file is a single definition named by its path below the
    /// category directory.
    Files,
    Declarations(DeclReadOptions),
}

pub enum UsageSource {
    Property {
        names: Vec<Wildcard>,
        value_pattern: Option<Wildcard>,
        strip_prefix: Option<&'static str>,
        strip_suffix: Option<&'static str>,
    },
    Materials,
    Classnames,
}

pub struct CategoryDescriptor {
    pub category: Category,
    pub directory: &'static str,
    pub file_patterns: Vec<Wildcard>,
    pub definitions: DefinitionSource,
    pub usage: UsageSource,
    /// Identifiers always in use for every map, `{map}` is the map name.
    pub per_map_identifiers: &'static [&'static str],
    pub mode: ReportMode,
    pub valid_unused_files: Vec<String>,
    pub valid_unused_identifiers: Vec<String>,
}

fn wildcards(patterns: &[&str]) -> Result<Vec<Wildcard>, globset::Error> {
    patterns.iter().map(|pattern| Wildcard::new(pattern)).collect()
}

fn declarations(required_prefix: Option<&str>, rejected_prefixes: &[&str]) -> DefinitionSource {
    DefinitionSource::Declarations(DeclReadOptions {
        required_prefix: required_prefix.map(|prefix| prefix.to_string()),
        rejected_prefixes: rejected_prefixes
            .iter()
            .map(|prefix| prefix.to_string())
            .collect(),
        identifier_pattern: None,
    })
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Models,
        Category::Materials,
        Category::Skins,
        Category::Particles,
        Category::Entities,
        Category::Xdata,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Models => "models",
            Category::Materials => "materials",
            Category::Skins => "skins",
            Category::Particles => "particles",
            Category::Entities => "entities",
            Category::Xdata => "xdata",
        }
    }

    pub fn descriptor(self) -> Result<CategoryDescriptor, globset::Error> {
        let descriptor = match self {
            Category::Models => CategoryDescriptor {
                category: self,
                directory: "models",
                file_patterns: wildcards(&["*.ase", "*.lwo", "*.ma", "*.obj", "*.md5mesh"])?,
                definitions: DefinitionSource::Files,
                usage: UsageSource::Property {
                    names: wildcards(&["model"])?,
                    value_pattern: None,
                    strip_prefix: Some("models/"),
                    strip_suffix: None,
                },
                per_map_identifiers: &[],
                mode: ReportMode::PerFile,
                valid_unused_files: Vec::new(),
                valid_unused_identifiers: Vec::new(),
            },
            Category::Materials => CategoryDescriptor {
                category: self,
                directory: "materials",
                file_patterns: wildcards(&["*.mtr"])?,
                definitions: declarations(None, &["table"]),
                usage: UsageSource::Materials,
                per_map_identifiers: &[],
                mode: ReportMode::PerDefinition,
                valid_unused_files: Vec::new(),
                valid_unused_identifiers: Vec::new(),
            },
            Category::Skins => CategoryDescriptor {
                category: self,
                directory: "skins",
                file_patterns: wildcards(&["*.skin"])?,
                definitions: declarations(None, &[]),
                usage: UsageSource::Property {
                    names: wildcards(&["skin", "skin_*"])?,
                    value_pattern: None,
                    strip_prefix: None,
                    strip_suffix: None,
                },
                per_map_identifiers: &[],
                mode: ReportMode::PerDefinition,
                valid_unused_files: Vec::new(),
                valid_unused_identifiers: Vec::new(),
            },
            Category::Particles => CategoryDescriptor {
                category: self,
                directory: "particles",
                file_patterns: wildcards(&["*.prt"])?,
                definitions: declarations(None, &[]),
                usage: UsageSource::Property {
                    names: wildcards(&["model"])?,
                    value_pattern: Some(Wildcard::new("*.prt")?),
                    strip_prefix: None,
                    strip_suffix: Some(".prt"),
                },
                per_map_identifiers: &[],
                mode: ReportMode::PerDefinition,
                valid_unused_files: Vec::new(),
                valid_unused_identifiers: Vec::new(),
            },
            Category::Entities => CategoryDescriptor {
                category: self,
                directory: "def",
                file_patterns: wildcards(&["*.def"])?,
                definitions: declarations(Some("entityDef"), &[]),
                usage: UsageSource::Classnames,
                per_map_identifiers: &[],
                mode: ReportMode::PerDefinition,
                valid_unused_files: Vec::new(),
                valid_unused_identifiers: Vec::new(),
            },
            Category::Xdata => CategoryDescriptor {
                category: self,
                directory: "xdata",
                file_patterns: wildcards(&["*.xd"])?,
                definitions: declarations(None, &["import"]),
                usage: UsageSource::Property {
                    names: wildcards(&["xdata_contents"])?,
                    value_pattern: None,
                    strip_prefix: None,
                    strip_suffix: None,
                },
                per_map_identifiers: &["maps/{map}/mission_briefing"],
                mode: ReportMode::PerDefinition,
                valid_unused_files: Vec::new(),
                valid_unused_identifiers: Vec::new(),
            },
        };
        Ok(descriptor)
    }
}

impl CategoryDescriptor {
    /// A directory component equal to the category directory, and a file
    /// name matching one of the category patterns.
    pub fn contains(&self, path: &FmPath) -> bool {
        let file_name = path.file_name();
        let mut components: Vec<&str> = path.components().collect();
        components.pop();

        components.contains(&self.directory)
            && self
                .file_patterns
                .iter()
                .any(|pattern| pattern.matches(file_name))
    }

    /// For file definitions, the path after the category directory.
    pub fn file_identifier(&self, path: &FmPath) -> String {
        let components: Vec<&str> = path.components().collect();
        match components
            .iter()
            .position(|component| *component == self.directory)
        {
            Some(index) => components[index + 1..].join("/"),
            None => path.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_descriptor() {
        for category in Category::ALL {
            let descriptor = category.descriptor().unwrap();
            assert_eq!(descriptor.category, category);
            assert!(!descriptor.file_patterns.is_empty());
        }
    }

    #[test]
    fn files_belong_by_directory_and_pattern() {
        let models = Category::Models.descriptor().unwrap();
        assert!(models.contains(&FmPath::from("models/lights/candle.ase")));
        assert!(models.contains(&FmPath::from("models/chair.md5mesh")));
        assert!(!models.contains(&FmPath::from("models/lights/candle.tga")));
        assert!(models.contains(&FmPath::from("textures/models/candle.ase")));
        assert!(!models.contains(&FmPath::from("candle.ase")));

        let entities = Category::Entities.descriptor().unwrap();
        assert!(entities.contains(&FmPath::from("def/tdm_chairs.def")));
        assert!(!entities.contains(&FmPath::from("defaults/tdm_chairs.def")));
    }

    #[test]
    fn file_identifier_is_relative_to_directory() {
        let models = Category::Models.descriptor().unwrap();
        assert_eq!(
            models.file_identifier(&FmPath::from("models/lights/candle.ase")),
            "lights/candle.ase"
        );
    }
}
