use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::LevelFilter;
use ovaimport::{Error, ImportConfig, Importer};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::process::exit;

/// Import an OVA package as an image and write a Heat template for it
#[derive(Parser, Debug)]
#[command(name = "ova-import", version, about)]
struct Args {
    /// OVA package to import
    #[arg(value_name = "PACKAGE")]
    package: Option<PathBuf>,

    /// Name of the created image
    #[arg(value_name = "NAME")]
    name: Option<String>,

    /// Program used to register the image
    #[arg(long, value_name = "PROGRAM")]
    glance: Option<String>,

    /// Where to write the Heat template
    #[arg(long, value_name = "PATH")]
    template: Option<PathBuf>,

    /// Directory the package is unpacked into
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Keep the extracted descriptor and disk image
    #[arg(long)]
    keep_extracted: bool,

    /// Sets debug prints level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn level_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn import_config(&self) -> ImportConfig {
        let mut config = ImportConfig::new().keep_extracted(self.keep_extracted);
        if let Some(name) = &self.name {
            config = config.with_image_name(name.as_str());
        }
        if let Some(program) = &self.glance {
            config = config.with_glance_program(program.as_str());
        }
        if let Some(path) = &self.template {
            config = config.with_template_path(path);
        }
        if let Some(dir) = &self.work_dir {
            config = config.with_work_dir(dir);
        }
        config
    }
}

/// Render an optional fact the way the summary line shows it
fn describe(fact: Option<u64>) -> String {
    fact.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn require_package(path: Option<PathBuf>) -> ovaimport::Result<PathBuf> {
    path.ok_or_else(|| {
        Error::Usage(
            "Specify the OVA file to be imported and optionally a name for the image".to_string(),
        )
    })
}

fn try_to_initialize_logging(level: LevelFilter) {
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

fn run(args: Args) -> Result<()> {
    let package = require_package(args.package.clone())?;
    let importer = Importer::new(args.import_config());

    let report = importer
        .import_path(&package)
        .with_context(|| format!("Failed to import {}", package.display()))?;

    if !report.registration.success() {
        match report.registration.exit_code {
            Some(code) => eprintln!("Image registration failed with exit code {}", code),
            None => eprintln!("Image registration was terminated by a signal"),
        }
    }

    println!(
        "Writing Heat Template for {} CPU and {} MB memory...",
        describe(report.flattened.facts.cpu),
        describe(report.flattened.facts.memory_mb)
    );
    print!("{}", report.template_yaml);
    Ok(())
}

fn main() {
    let args = Args::parse();
    try_to_initialize_logging(args.level_filter());

    if let Err(e) = run(args) {
        eprintln!("{:#}", e);
        exit(1);
    }
}
