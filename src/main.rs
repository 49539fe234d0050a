//! `ephemongo` CLI entrypoint.
//!
//! `fetch` fills the binary cache ahead of time, which is useful in CI
//! images. `start` runs a server until standard input closes, printing its
//! URI so scripts can connect.

use clap::Parser;
use ephemongo::cli::{Cli, Command, FetchArgs, StartArgs};
use ephemongo::error::Result;
use ephemongo::options::BinarySource;
use ephemongo::output::{ArtifactEntry, FetchReport, StderrLogger, write_stderr_line};
use ephemongo::start_with_options;
use ephemongo_mongobin::cache::{ArtifactCache, MONGOD_FILES, MONGOSH_FILES};
use ephemongo_mongobin::download::HttpDownloader;
use ephemongo_mongobin::install::StdFileMover;
use log::LevelFilter;
use std::io::{self, Write};

fn main() {
    let cli = Cli::parse();
    if StderrLogger::init(cli.log_level()).is_err() {
        // A logger is already installed; keep it.
    }
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Command::Fetch(args) => run_fetch(args, cli.log_level(), stdout),
        Command::Start(args) => run_start(args, cli.log_level(), stdout),
    }
}

/// Resolves the requested artifacts and downloads any that are missing.
fn run_fetch(args: &FetchArgs, level: LevelFilter, stdout: &mut dyn Write) -> Result<()> {
    let resolved = args.to_options(level).resolve()?;
    let Some(cache_root) = resolved.cache_path.clone() else {
        writeln!(stdout, "Nothing to fetch: a local mongod binary is configured.")?;
        return Ok(());
    };

    let downloader = HttpDownloader;
    let mover = StdFileMover;
    let cache = ArtifactCache::new(cache_root.clone(), &downloader, &mover);

    let mut artifacts = Vec::new();
    let wanted = [
        ("mongod", Some(&resolved.mongod), MONGOD_FILES),
        ("mongosh", resolved.mongosh.as_ref(), MONGOSH_FILES),
    ];
    for (name, source, files) in wanted {
        let Some(BinarySource::Download(url)) = source else {
            continue;
        };
        let directory = cache.directory_for(url)?;
        let files = if args.dry_run {
            Vec::new()
        } else {
            cache
                .fetch(url, files)?
                .into_iter()
                .map(String::from)
                .collect()
        };
        artifacts.push(ArtifactEntry {
            name: name.to_owned(),
            url: url.clone(),
            directory: directory.into_string(),
            files,
        });
    }

    let report = FetchReport {
        cache_root: cache_root.into_string(),
        dry_run: args.dry_run,
        artifacts,
    };
    let text = if args.json {
        report.format_json()
    } else {
        report.format_human()
    };
    writeln!(stdout, "{}", text.trim_end())?;
    Ok(())
}

/// Runs a server until stdin reaches end of file.
fn run_start(args: &StartArgs, level: LevelFilter, stdout: &mut dyn Write) -> Result<()> {
    let mut server = start_with_options(&args.to_options(level))?;
    writeln!(stdout, "{}", server.uri())?;
    stdout.flush()?;

    io::copy(&mut io::stdin().lock(), &mut io::sink())?;
    server.stop();
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            1
        }
    }
}
