use std::path::{Path, PathBuf};

use clap::{ArgMatches, Command};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use fmpak::{
    config::AuditConfig,
    mission::{read_filters_csv, write_filters, Mission, MissionError},
    pack::{default_output_path, pack_files},
    validate::audit_mission,
};

fn command() -> Command<'static> {
    Command::new("fmpak")
        .about("Pack a Dark Mod fan mission into a pk4 and check its assets are in use")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            clap::Arg::new("path")
                .help("Mission directory, defaults to the current directory.")
                .default_value("."),
        )
        .arg(
            clap::Arg::new("check")
                .short('c')
                .long("check")
                .help("List the files which would be packed, optionally only those below DIR.")
                .value_name("DIR")
                .takes_value(true)
                .min_values(0)
                .max_values(1),
        )
        .arg(
            clap::Arg::new("validate")
                .long("validate")
                .help("Report declared assets which none of the mission maps use."),
        )
        .arg(
            clap::Arg::new("per-file")
                .long("per-file")
                .requires("validate")
                .help("Report whole definition files instead of single definitions."),
        )
        .arg(
            clap::Arg::new("json")
                .long("json")
                .requires("validate")
                .help("Print the validation report as json."),
        )
        .arg(
            clap::Arg::new("pk-set")
                .long("pk-set")
                .value_name("FILTERS")
                .help("Replace the .pkignore filters with a comma separated list.")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("pk-get")
                .long("pk-get")
                .help("Print the .pkignore filters."),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Set the pk4 path, defaults to '<mission>.pk4' in the mission directory.")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print debug logging."),
        )
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .long("quiet")
                .conflicts_with("verbose")
                .help("Only print warnings and errors."),
        )
}

fn init_logging(matches: &ArgMatches) {
    let level = if matches.is_present("verbose") {
        LevelFilter::Debug
    } else if matches.is_present("quiet") {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    if let Err(error) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("Failed to initialise logging: {}", error);
    }
}

fn set_filters(mission: &Mission, filters: &str) -> Result<(), anyhow::Error> {
    println!("old filters: {}", read_filters_csv(&mission.root_path)?);
    write_filters(&mission.root_path, filters)?;
    println!("new filters: {}", read_filters_csv(&mission.root_path)?);
    Ok(())
}

fn validate(mission: &Mission, matches: &ArgMatches) -> Result<(), anyhow::Error> {
    let config = AuditConfig::load(&mission.root_path)?;
    let map_names = mission.map_names()?;
    let file_set = mission.collect_files(&map_names)?;
    let report = audit_mission(mission, &file_set, &config, matches.is_present("per-file"))?;

    if matches.is_present("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), anyhow::Error> {
    let mission = Mission::open(Path::new(matches.value_of("path").unwrap_or(".")))?;
    log::debug!("Mission {} at {}", mission.name, mission.root_path.display());

    if let Some(filters) = matches.value_of("pk-set") {
        return set_filters(&mission, filters);
    }

    if matches.is_present("pk-get") {
        println!("{}", read_filters_csv(&mission.root_path)?);
        return Ok(());
    }

    if matches.is_present("validate") {
        return validate(&mission, matches);
    }

    let map_names = match mission.map_names() {
        Ok(map_names) => map_names,
        Err(error) => match error.downcast_ref::<MissionError>() {
            Some(MissionError::NoMapsDeclared(_)) => {
                log::warn!("{}, packing without maps", error);
                Vec::new()
            }
            _ => return Err(error),
        },
    };
    let file_set = mission.collect_files(&map_names)?;

    if matches.is_present("check") {
        let listing = mission.list_files(&file_set, matches.value_of("check"))?;
        for path in listing.files.iter() {
            println!("  {}", path);
        }
        println!("{} dirs, {} files", listing.dir_count, listing.files.len());
        return Ok(());
    }

    let output_path = matches
        .value_of("output")
        .map_or_else(|| default_output_path(&mission), PathBuf::from);
    log::info!("Packing {} into {}", mission.name, output_path.display());

    let summary = pack_files(&file_set, &output_path, |file| {
        println!("  {}", file.relative_path.as_str())
    })?;
    println!(
        "Packed {} dirs, {} files in {:.2} seconds",
        summary.dir_count,
        summary.file_count,
        summary.elapsed.as_secs_f32()
    );
    Ok(())
}

fn main() {
    let matches = command().get_matches();
    init_logging(&matches);

    if let Err(error) = run(&matches) {
        log::error!("{:?}", error);
        std::process::exit(1);
    }
}
