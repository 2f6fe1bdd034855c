use anyhow::Context;

use fmpak_file_readers::{DeclFile, FmPath, HostFilesystem, MapFile, ReadError};

use crate::{
    config::AuditConfig,
    mission::{Mission, MissionFile, MissionFileSet},
};

mod category;
mod report;
mod unused;
mod used;

pub use category::{Category, CategoryDescriptor, DefinitionSource, ReportMode, UsageSource};
pub use report::{AuditReport, CategoryReport};
pub use unused::{
    audit_catalog, declared_only_in_excluded, unused_definitions, unused_files, Allowlist,
    AuditOutcome, Catalog,
};
pub use used::{collect_used, UsedSet};

/// Definition files of one category. Unreadable or unbalanced files are
/// skipped and recorded in `warnings`.
pub fn build_catalog(
    filesystem: &HostFilesystem,
    descriptor: &CategoryDescriptor,
    files: &[MissionFile],
    warnings: &mut Vec<String>,
) -> Result<Catalog, anyhow::Error> {
    let mut catalog = Catalog::new();

    for file in files.iter() {
        let path = FmPath::from(&file.relative_path);
        if !descriptor.contains(&path) {
            continue;
        }

        match &descriptor.definitions {
            DefinitionSource::Files => {
                catalog.insert(
                    path.as_str().to_string(),
                    vec![descriptor.file_identifier(&path)],
                );
            }
            DefinitionSource::Declarations(options) => {
                match filesystem.read_file_with::<DeclFile, _>(&path, options) {
                    Ok(decl) => {
                        log::trace!("{}: {:?}", path.as_str(), decl.identifiers());
                        catalog.insert(path.as_str().to_string(), decl.into_identifiers());
                    }
                    Err(error) => {
                        if error
                            .downcast_ref::<ReadError>()
                            .map_or(false, |error| error.is_fatal())
                        {
                            return Err(error);
                        }

                        let message = format!("{}: {:#}", path.as_str(), error);
                        log::warn!("Skipping {}", message);
                        warnings.push(message);
                    }
                }
            }
        }
    }

    Ok(catalog)
}

pub fn read_maps(mission: &Mission, map_names: &[String]) -> Result<Vec<MapFile>, anyhow::Error> {
    let filesystem = mission.filesystem();
    let mut maps = Vec::with_capacity(map_names.len());

    for map_name in map_names {
        let path = mission.map_path(map_name);
        let map: MapFile = filesystem
            .read_file(&path)
            .with_context(|| format!("Failed to parse map {}", map_name))?;
        log::debug!(
            "Read {} with {} entities",
            path.as_str(),
            map.entities.len()
        );
        maps.push(map);
    }

    Ok(maps)
}

/// Cross reference every asset category of the mission against its maps.
pub fn audit_mission(
    mission: &Mission,
    file_set: &MissionFileSet,
    config: &AuditConfig,
    force_per_file: bool,
) -> Result<AuditReport, anyhow::Error> {
    let map_names = mission.map_names()?;
    let maps = read_maps(mission, &map_names)?;
    let filesystem = mission.filesystem();

    let mut warnings = Vec::new();
    let mut categories = Vec::with_capacity(Category::ALL.len());

    for category in Category::ALL {
        let descriptor = category
            .descriptor()
            .with_context(|| format!("Invalid pattern for {}", category.name()))?;
        let category_config = config.category(category);

        let included = build_catalog(&filesystem, &descriptor, &file_set.included, &mut warnings)?;
        let excluded = build_catalog(&filesystem, &descriptor, &file_set.excluded, &mut warnings)?;
        let used = collect_used(&descriptor, &maps, &map_names);

        let mode = if force_per_file {
            ReportMode::PerFile
        } else {
            category_config
                .and_then(|config| config.mode)
                .unwrap_or(descriptor.mode)
        };

        let allowlist = Allowlist::new(
            descriptor.valid_unused_files.iter().chain(
                category_config
                    .into_iter()
                    .flat_map(|config| config.valid_unused_files.iter()),
            ),
            descriptor.valid_unused_identifiers.iter().chain(
                category_config
                    .into_iter()
                    .flat_map(|config| config.valid_unused_identifiers.iter()),
            ),
        );

        let outcome = audit_catalog(&included, &used, &allowlist, mode);
        let excluded_but_used = declared_only_in_excluded(&included, &excluded, &used);
        log::debug!(
            "{}: {} definition files, {:?}",
            category.name(),
            included.len(),
            outcome
        );

        categories.push(CategoryReport {
            category,
            mode,
            outcome,
            excluded_but_used,
        });
    }

    Ok(AuditReport {
        mission: mission.name.clone(),
        maps: map_names,
        categories,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{tests::create_mission, MissionError, PKIGNORE_FILENAME};

    const MAP: &str = r#"Version 2
// entity 0
{
"classname" "worldspawn"
// primitive 0
{
brushDef3
{
( 0 0 1 -64 ) ( ( 0.03125 0 0 ) ( 0 0.03125 0 ) ) "textures/stone/floor" 0 0 0
}
}
}
// entity 1
{
"classname" "light"
"name" "light_1"
"model" "lights/candle.ase"
}
"#;

    fn outcome(report: &AuditReport, category: Category) -> &CategoryReport {
        report
            .categories
            .iter()
            .find(|report| report.category == category)
            .unwrap()
    }

    #[test]
    fn used_model_is_ok() {
        let (_dir, mission) = create_mission(&[
            ("startingmap.txt", "test"),
            ("maps/test.map", MAP),
            ("models/lights/candle.ase", "*3DSMAX_ASCIIEXPORT"),
        ]);
        let file_set = mission.collect_files(&mission.map_names().unwrap()).unwrap();
        let report = audit_mission(&mission, &file_set, &AuditConfig::default(), false).unwrap();

        let models = outcome(&report, Category::Models);
        assert_eq!(models.outcome, AuditOutcome::UnusedFiles(Vec::new()));
        assert!(models.to_string().starts_with("models: all Ok"));
        assert_eq!(
            outcome(&report, Category::Skins).outcome,
            AuditOutcome::NothingDeclared
        );
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unused_model_and_material_are_reported() {
        let (_dir, mission) = create_mission(&[
            ("startingmap.txt", "test"),
            ("maps/test.map", MAP),
            ("models/lights/unused.ase", ""),
            (
                "materials/stone.mtr",
                "textures/stone/wall01\n{\n  diffusemap textures/stone/wall01_d\n}\n// unused comment\n\ntextures/stone/floor\n{\n}\n",
            ),
        ]);
        let file_set = mission.collect_files(&mission.map_names().unwrap()).unwrap();
        let report = audit_mission(&mission, &file_set, &AuditConfig::default(), false).unwrap();

        assert_eq!(
            outcome(&report, Category::Models).outcome,
            AuditOutcome::UnusedFiles(vec!["models/lights/unused.ase".to_string()])
        );
        match &outcome(&report, Category::Materials).outcome {
            AuditOutcome::UnusedDefinitions(unused) => {
                assert_eq!(unused.len(), 1);
                assert_eq!(unused["materials/stone.mtr"], vec!["textures/stone/wall01"]);
            }
            outcome => panic!("unexpected outcome {:?}", outcome),
        }
    }

    #[test]
    fn config_and_per_file_override_modes() {
        let (_dir, mission) = create_mission(&[
            ("startingmap.txt", "test"),
            ("maps/test.map", MAP),
            ("materials/stone.mtr", "textures/stone/wall01 {}\ntextures/stone/wall02 {}\n"),
        ]);
        let file_set = mission.collect_files(&mission.map_names().unwrap()).unwrap();
        let config = AuditConfig::parse(
            "materials:\n  valid_unused_identifiers: [textures/stone/wall02]\n",
        )
        .unwrap();

        let report = audit_mission(&mission, &file_set, &config, false).unwrap();
        match &outcome(&report, Category::Materials).outcome {
            AuditOutcome::UnusedDefinitions(unused) => {
                assert_eq!(unused["materials/stone.mtr"], vec!["textures/stone/wall01"]);
            }
            outcome => panic!("unexpected outcome {:?}", outcome),
        }

        let report = audit_mission(&mission, &file_set, &config, true).unwrap();
        let materials = outcome(&report, Category::Materials);
        assert_eq!(materials.mode, ReportMode::PerFile);
        assert_eq!(
            materials.outcome,
            AuditOutcome::UnusedFiles(vec!["materials/stone.mtr".to_string()])
        );
    }

    #[test]
    fn unbalanced_definition_file_is_a_warning() {
        let (_dir, mission) = create_mission(&[
            ("startingmap.txt", "test"),
            ("maps/test.map", MAP),
            ("skins/broken.skin", "skin skins/broken\n{\n"),
            ("skins/chairs.skin", "skin skins/chair_red\n{\n}\n"),
        ]);
        let file_set = mission.collect_files(&mission.map_names().unwrap()).unwrap();
        let report = audit_mission(&mission, &file_set, &AuditConfig::default(), false).unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("skins/broken.skin"));
        match &outcome(&report, Category::Skins).outcome {
            AuditOutcome::UnusedDefinitions(unused) => {
                assert_eq!(unused.len(), 1);
                assert_eq!(unused["skins/chairs.skin"], vec!["skins/chair_red"]);
            }
            outcome => panic!("unexpected outcome {:?}", outcome),
        }
    }

    #[test]
    fn unreadable_definition_file_is_a_warning() {
        let (_dir, mission) = create_mission(&[
            ("startingmap.txt", "test"),
            ("maps/test.map", MAP),
            ("materials/a.mtr", "textures/a\n{\n}\n"),
            ("materials/b.mtr", "textures/b\n{\n}\n"),
            ("skins/chairs.skin", "skin skins/chair_red\n{\n}\n"),
        ]);
        let file_set = mission.collect_files(&mission.map_names().unwrap()).unwrap();
        std::fs::remove_file(mission.root_path.join("materials/b.mtr")).unwrap();
        let report = audit_mission(&mission, &file_set, &AuditConfig::default(), false).unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("materials/b.mtr"));
        match &outcome(&report, Category::Materials).outcome {
            AuditOutcome::UnusedDefinitions(unused) => {
                assert_eq!(unused.len(), 1);
                assert_eq!(unused["materials/a.mtr"], vec!["textures/a"]);
            }
            outcome => panic!("unexpected outcome {:?}", outcome),
        }
        match &outcome(&report, Category::Skins).outcome {
            AuditOutcome::UnusedDefinitions(unused) => {
                assert_eq!(unused["skins/chairs.skin"], vec!["skins/chair_red"]);
            }
            outcome => panic!("unexpected outcome {:?}", outcome),
        }
        assert_eq!(
            outcome(&report, Category::Models).outcome,
            AuditOutcome::NothingDeclared
        );
    }

    #[test]
    fn excluded_declarations_are_reported() {
        let (_dir, mission) = create_mission(&[
            (PKIGNORE_FILENAME, "/wip\n"),
            ("startingmap.txt", "test"),
            ("maps/test.map", MAP),
            ("wip/def/lights.def", "entityDef light\n{\n}\n"),
        ]);
        let file_set = mission.collect_files(&mission.map_names().unwrap()).unwrap();
        let report = audit_mission(&mission, &file_set, &AuditConfig::default(), false).unwrap();

        let entities = outcome(&report, Category::Entities);
        assert_eq!(entities.outcome, AuditOutcome::NothingDeclared);
        assert_eq!(entities.excluded_but_used, vec!["light"]);
    }

    #[test]
    fn malformed_map_is_fatal() {
        let (_dir, mission) = create_mission(&[
            ("startingmap.txt", "test"),
            ("maps/test.map", "{\n\"classname\" \"worldspawn\"\n"),
        ]);
        let file_set = mission.collect_files(&mission.map_names().unwrap()).unwrap();
        let error = audit_mission(&mission, &file_set, &AuditConfig::default(), false).unwrap_err();

        let read_error = error.downcast_ref::<ReadError>().unwrap();
        assert!(matches!(read_error, ReadError::UnterminatedBlock { .. }));
        assert!(read_error.is_fatal());
    }

    #[test]
    fn missing_map_is_fatal() {
        let (_dir, mission) = create_mission(&[("startingmap.txt", "test")]);
        let file_set = mission.collect_files(&["test".to_string()]).unwrap();
        let error = audit_mission(&mission, &file_set, &AuditConfig::default(), false).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ReadError>(),
            Some(ReadError::UnreadableFile { .. })
        ));

        let (_dir, mission) = create_mission(&[]);
        let error = audit_mission(
            &mission,
            &MissionFileSet::default(),
            &AuditConfig::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<MissionError>(),
            Some(MissionError::NoMapsDeclared(_))
        ));
    }
}
