//! Mythic+ Stats CLI
//!
//! Command-line tool for inspecting and exporting the run statistics stored in
//! the Mythic+ Stats addon's SavedVariables file.

use clap::{Parser, Subcommand, ValueEnum};
use mps_core::{
    find_saved_variables, ingest, parse_assignment, prescreen, write_csv, write_json,
    DuplicatePolicy, EncounterRecord, Error, FileSource, IngestConfig, Run, RunField, RunsById,
    SourceProvider,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mps")]
#[command(about = "Mythic+ Stats SavedVariables viewer", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file with ingestion settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Reject duplicate keys instead of keeping the last one
    #[arg(long, global = true)]
    strict: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a SavedVariables file and print the generic table as JSON
    Parse {
        /// Path to the SavedVariables file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show runs as an indented tree
    Show {
        /// Path to the SavedVariables file
        #[arg(short, long)]
        file: PathBuf,

        /// Only show this map id
        #[arg(long)]
        map: Option<i64>,

        /// Only show this keystone level
        #[arg(long)]
        level: Option<i64>,

        /// Only show this run state (e.g. "success")
        #[arg(long)]
        state: Option<String>,
    },

    /// Print run counts per map, keystone level and state
    Summary {
        /// Path to the SavedVariables file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export runs to a file
    Export {
        /// Path to the SavedVariables file
        #[arg(short, long)]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Find SavedVariables files under one or more directories
    Scan {
        /// Root directories to scan (e.g. the World of Warcraft WTF folder)
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// Write a config file with the default settings
    InitConfig {
        /// Output path for the config file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> mps_core::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.strict)?;

    match cli.command {
        Commands::Parse { file } => cmd_parse(&file, &config),
        Commands::Show {
            file,
            map,
            level,
            state,
        } => cmd_show(&file, &config, map, level, state.as_deref()),
        Commands::Summary { file } => cmd_summary(&file, &config),
        Commands::Export {
            file,
            format,
            output,
        } => cmd_export(&file, &config, format, &output),
        Commands::Scan { root } => cmd_scan(&root, &config),
        Commands::InitConfig { output } => cmd_init_config(&output, &config),
    }
}

fn load_config(path: Option<&Path>, strict: bool) -> mps_core::Result<IngestConfig> {
    let mut config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            IngestConfig::load(path)?
        }
        None => IngestConfig::default(),
    };
    if strict {
        config.duplicates = DuplicatePolicy::Reject;
    }
    Ok(config)
}

/// Read, parse and project a file, attaching line/column to parse errors
fn load_runs(file: &Path, config: &IngestConfig) -> mps_core::Result<RunsById> {
    let mut source = FileSource::new(file);
    match ingest(&mut source, config) {
        Ok(runs) => {
            info!(file = %file.display(), runs = runs.run_count(), "loaded runs");
            Ok(runs)
        }
        Err(Error::Parse(err)) => {
            report_parse_location(file, &err);
            Err(Error::Parse(err))
        }
        Err(e) => Err(e),
    }
}

fn report_parse_location(file: &Path, err: &mps_core::ParseError) {
    if let Ok(text) = std::fs::read_to_string(file) {
        let (line, column) = err.line_col(&text);
        eprintln!("{}:{}:{}: syntax error", file.display(), line, column);
    }
}

fn cmd_parse(file: &Path, config: &IngestConfig) -> mps_core::Result<()> {
    let text = FileSource::new(file).read()?;
    prescreen(&text, &config.identifier)?;

    let assignment = match parse_assignment(&text) {
        Ok(a) => a,
        Err(err) => {
            let (line, column) = err.line_col(&text);
            eprintln!("{}:{}:{}: syntax error", file.display(), line, column);
            return Err(err.into());
        }
    };

    let json = serde_json::to_string_pretty(&assignment.value)?;
    println!("{} = {}", assignment.name, json);
    Ok(())
}

fn cmd_show(
    file: &Path,
    config: &IngestConfig,
    map: Option<i64>,
    level: Option<i64>,
    state: Option<&str>,
) -> mps_core::Result<()> {
    let runs = load_runs(file, config)?;

    let mut shown = 0;
    for (map_id, levels) in runs.maps() {
        if map.is_some_and(|m| m != *map_id) {
            continue;
        }
        println!("map {}", map_id);

        for (key_level, states) in levels {
            if level.is_some_and(|l| l != *key_level) {
                continue;
            }
            println!("  +{}", key_level);

            for (state_name, state_runs) in states {
                if state.is_some_and(|s| s != state_name.as_str()) {
                    continue;
                }
                println!("    {} ({} runs)", state_name, state_runs.len());

                for (run_id, run) in state_runs {
                    print_run(*run_id, run);
                    shown += 1;
                }
            }
        }
    }

    if shown == 0 {
        println!("No runs match.");
    }
    Ok(())
}

fn print_run(run_id: i64, run: &Run) {
    println!("      run {}", run_id);
    for (name, field) in &run.fields {
        match field {
            RunField::Scalar(value) => println!("        {}: {}", name, value),
            RunField::Encounters(encounters) => {
                println!("        {}: {} recorded", name, encounters.len());
                for (i, encounter) in encounters.iter().enumerate() {
                    println!("          {}. {}", i + 1, format_encounter(encounter));
                }
            }
        }
    }
}

fn format_encounter(encounter: &EncounterRecord) -> String {
    let parts: Vec<String> = encounter
        .fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    parts.join(", ")
}

fn cmd_summary(file: &Path, config: &IngestConfig) -> mps_core::Result<()> {
    let runs = load_runs(file, config)?;

    println!("File: {}", file.display());
    println!("Maps: {}", runs.maps().len());
    println!("Runs: {}", runs.run_count());
    println!();

    for (map_id, levels) in runs.maps() {
        for (key_level, states) in levels {
            let counts: Vec<String> = states
                .iter()
                .map(|(state, state_runs)| format!("{} {}", state_runs.len(), state))
                .collect();
            println!("map {:>5}  +{:<3} {}", map_id, key_level, counts.join(", "));
        }
    }

    Ok(())
}

fn cmd_export(file: &Path, config: &IngestConfig, format: Format, output: &Path) -> mps_core::Result<()> {
    let runs = load_runs(file, config)?;

    let out = File::create(output)?;
    let mut writer = BufWriter::new(out);

    match format {
        Format::Json => write_json(&runs, &mut writer)?,
        Format::Csv => {
            write_csv(&runs, &mut writer)?;
        }
    }
    writer.flush()?;

    println!("Exported {} runs to {}", runs.run_count(), output.display());
    Ok(())
}

fn cmd_scan(roots: &[PathBuf], config: &IngestConfig) -> mps_core::Result<()> {
    let found = find_saved_variables(roots, &config.file_name)?;

    println!("Found {} file(s) named {}:", found.len(), config.file_name);
    for file in &found {
        match &file.account {
            Some(account) => println!("  {} [{}]", file.path.display(), account),
            None => println!("  {}", file.path.display()),
        }
    }

    Ok(())
}

fn cmd_init_config(output: &Path, config: &IngestConfig) -> mps_core::Result<()> {
    config.save(output)?;
    println!("Created config file: {}", output.display());
    println!();
    println!("Edit the file to adjust the settings, then run:");
    println!("  mps --config {} show --file <SavedVariables file>", output.display());
    Ok(())
}
