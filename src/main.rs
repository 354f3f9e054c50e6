use anyhow::Result;
use clap::{App, Arg, ArgMatches};
use quill::build::build_site;
use quill::config::Config;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = App::new("quill")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate a static blog from Markdown files")
        .arg(
            Arg::with_name("source")
                .short("s")
                .long("source")
                .takes_value(true)
                .value_name("DIR")
                .help("Source directory for markdown files [default: posts]"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("DIR")
                .help("Output directory for the generated blog [default: output]"),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .value_name("FILE")
                .help("Project file to load instead of searching for blog.yaml"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log progress (otherwise RUST_LOG applies, defaulting to warn)"),
        )
        .get_matches();

    let filter = if matches.is_present("verbose") {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&matches) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

// Returns whether every output file was written.
fn run(matches: &ArgMatches) -> Result<bool> {
    let config = match matches.value_of("config") {
        Some(path) => Config::from_project_file(Path::new(path))?,
        None => Config::from_directory(&std::env::current_dir()?)?,
    }
    .with_overrides(
        matches.value_of("source").map(PathBuf::from),
        matches.value_of("output").map(PathBuf::from),
    );

    // Each failure was already logged as a warning; print only the counts.
    let report = build_site(&config)?;
    println!("{} in {}", report, config.output_directory.display());
    Ok(report.write_failures.is_empty())
}
