use std::collections::BTreeSet;

use fmpak_file_readers::{FmPath, MapFile, Wildcard};

use super::category::{CategoryDescriptor, UsageSource};

const WILDCARD_GLYPHS: [char; 4] = ['*', '?', '[', '{'];

/// Identifiers referenced by the parsed maps. Values containing wildcard
/// glyphs match every identifier their pattern matches.
#[derive(Debug, Default)]
pub struct UsedSet {
    exact: BTreeSet<String>,
    patterns: Vec<Wildcard>,
}

impl UsedSet {
    pub fn insert(&mut self, identifier: &str) {
        if identifier.is_empty() || self.exact.contains(identifier) {
            return;
        }

        if identifier.contains(&WILDCARD_GLYPHS[..]) {
            match Wildcard::new(identifier) {
                Ok(pattern) => self.patterns.push(pattern),
                Err(error) => log::debug!("Using '{}' literally: {}", identifier, error),
            }
        }
        self.exact.insert(identifier.to_string());
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.exact.contains(identifier)
            || self
                .patterns
                .iter()
                .any(|pattern| pattern.matches(identifier))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.exact.iter().map(|identifier| identifier.as_str())
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }
}

fn normalise_value(value: &str, strip_prefix: Option<&str>, strip_suffix: Option<&str>) -> String {
    let path = FmPath::from(value);
    let mut value = path.as_str();
    if let Some(prefix) = strip_prefix {
        value = value.strip_prefix(prefix).unwrap_or(value);
    }
    if let Some(suffix) = strip_suffix {
        value = value.strip_suffix(suffix).unwrap_or(value);
    }
    value.to_string()
}

pub fn collect_used(
    descriptor: &CategoryDescriptor,
    maps: &[MapFile],
    map_names: &[String],
) -> UsedSet {
    let mut used = UsedSet::default();

    for entity in maps.iter().flat_map(|map| map.entities.iter()) {
        match &descriptor.usage {
            UsageSource::Property {
                names,
                value_pattern,
                strip_prefix,
                strip_suffix,
            } => {
                for (key, value) in entity.properties.iter() {
                    if !names.iter().any(|name| name.matches(key)) {
                        continue;
                    }

                    if value_pattern
                        .as_ref()
                        .map_or(false, |pattern| !pattern.matches(value))
                    {
                        continue;
                    }

                    used.insert(&normalise_value(value, *strip_prefix, *strip_suffix));
                }
            }
            UsageSource::Materials => {
                for material in entity.materials.iter() {
                    used.insert(material);
                }
            }
            UsageSource::Classnames => used.insert(&entity.classname),
        }
    }

    for map_name in map_names {
        for template in descriptor.per_map_identifiers {
            used.insert(&template.replace("{map}", map_name));
        }
    }

    log::debug!(
        "{} identifiers in use for {}",
        used.len(),
        descriptor.category.name()
    );
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::category::Category;
    use fmpak_file_readers::{FmFile, FmFileReader};

    const MAP: &str = r#"Version 2
// entity 0
{
"classname" "worldspawn"
// primitive 0
{
brushDef3
{
( 0 0 1 -64 ) ( ( 0.03125 0 0 ) ( 0 0.03125 0 ) ) "textures/stone/wall01" 0 0 0
}
}
}
// entity 1
{
"classname" "atdm:moveable_chair"
"name" "chair_1"
"model" "models\darkmod\furniture\chair.ase"
"skin" "skins/chair_red"
"skin_lit" "skins/chair_lit"
}
// entity 2
{
"classname" "func_emitter"
"model" "smoke01.prt"
"xdata_contents" "readables/letter_*"
}
"#;

    fn maps() -> Vec<MapFile> {
        vec![MapFile::read(FmFileReader::from(MAP), &()).unwrap()]
    }

    fn used(category: Category) -> UsedSet {
        let descriptor = category.descriptor().unwrap();
        collect_used(&descriptor, &maps(), &["test".to_string()])
    }

    #[test]
    fn models_strip_directory() {
        let used = used(Category::Models);
        assert!(used.contains("darkmod/furniture/chair.ase"));
        assert!(used.contains("smoke01.prt"));
    }

    #[test]
    fn particles_only_count_prt_values() {
        let used = used(Category::Particles);
        assert_eq!(used.iter().collect::<Vec<_>>(), vec!["smoke01"]);
    }

    #[test]
    fn skins_use_every_skin_property() {
        let used = used(Category::Skins);
        assert!(used.contains("skins/chair_red"));
        assert!(used.contains("skins/chair_lit"));
        assert_eq!(used.len(), 2);
    }

    #[test]
    fn materials_and_classnames() {
        assert!(used(Category::Materials).contains("textures/stone/wall01"));

        let entities = used(Category::Entities);
        assert!(entities.contains("atdm:moveable_chair"));
        assert!(entities.contains("worldspawn"));
    }

    #[test]
    fn xdata_patterns_and_briefing() {
        let used = used(Category::Xdata);
        assert!(used.contains("maps/test/mission_briefing"));
        assert!(used.contains("readables/letter_01"));
        assert!(!used.contains("readables/book_01"));
    }
}
