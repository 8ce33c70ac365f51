use clap::Parser;
use std::path::PathBuf;

use common::ExitStatus;
use common::config::{DEFAULT_LOG_DIR, DEFAULT_UTILITY, DEFAULT_UTILITY_ARGS, GenerateConfig};
use migrate_tools_migrate::{Command, GenerateRequest, RunRequest};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "migrate",
    version,
    about = "Migrate files in bulk using rsync (or robocopy on Windows)",
    long_about = "`migrate` copies files and directories listed in a manifest by running an external copy utility for each entry.

A manifest has one `SOURCE;DESTINATION` pair per line. A source ending with a path separator stands for the contents of that directory. Every run writes a main log and one log file per failed entry into the log directory.

EXIT CODES:
    0 - Finished (individual entries may still have failed, check the logs)
    1 - Unknown error
    3 - Usage error
    4 - Unable to read manifest
    5 - Unable to write manifest
    6 - Copying utility not found
    7 - File not found
    8 - Unable to open logs

EXAMPLES:
    # Generate a manifest with one entry per child of /data
    migrate generate /data/ /mnt/backup/data/

    # Preview the commands, then run them
    migrate run --dryrun
    migrate run

    # Copy a single directory without a manifest
    migrate run /data/photos /mnt/backup/"
)]
struct Args {
    // Progress & output
    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, global = true, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, don't report errors on the console
    #[arg(short = 'q', long = "quiet", global = true, help_heading = "Progress & output")]
    quiet: bool,

    // Advanced settings
    /// Number of worker threads, 0 means number of cores
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        global = true,
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads, 0 means Tokio runtime default (512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        global = true,
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,

    #[command(subcommand)]
    command: Subcommand,
}

#[derive(clap::Subcommand, Debug, Clone)]
enum Subcommand {
    /// Copy every entry of a manifest, or a single SRC DEST pair
    Run(RunArgs),
    /// Write manifest entries for SRC
    Generate(GenerateArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct RunArgs {
    /// Log the commands that would be run instead of running them
    #[arg(long, help_heading = "Run options")]
    dryrun: bool,

    /// Copying utility, either a path or a name looked up in the current directory and PATH
    #[arg(long, default_value = DEFAULT_UTILITY, value_name = "UTIL", help_heading = "Run options")]
    util: String,

    /// Arguments passed to the copying utility before SRC and DEST, split on whitespace
    #[arg(
        long,
        default_value = DEFAULT_UTILITY_ARGS,
        value_name = "ARGS",
        allow_hyphen_values = true,
        help_heading = "Run options"
    )]
    util_args: String,

    /// Directory for the main log and the per-entry logs
    #[arg(long, default_value = DEFAULT_LOG_DIR, value_name = "DIR", help_heading = "Run options")]
    log_dir: PathBuf,

    // ARGUMENTS
    /// `[MANIFEST]` (default: manifest.txt) or `SRC DEST`
    #[arg(num_args = 0..=2)]
    paths: Vec<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
struct GenerateArgs {
    /// Truncate the manifest instead of appending to it
    #[arg(long, help_heading = "Generate options")]
    overwrite: bool,

    /// Write sources relative to the manifest's directory
    #[arg(
        long = "rel-src",
        value_name = "BOOL",
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = clap::ArgAction::Set,
        help_heading = "Generate options"
    )]
    rel_src: bool,

    /// Write destinations relative to the manifest's directory
    #[arg(
        long = "rel-dest",
        value_name = "BOOL",
        default_value_t = false,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = clap::ArgAction::Set,
        help_heading = "Generate options"
    )]
    rel_dest: bool,

    /// Directory for the main log and the per-entry logs
    #[arg(long, default_value = DEFAULT_LOG_DIR, value_name = "DIR", help_heading = "Generate options")]
    log_dir: PathBuf,

    // ARGUMENTS
    /// Source path; a trailing separator maps each child of a directory separately
    source: PathBuf,

    /// Destination path
    destination: PathBuf,

    /// Manifest to write (default: manifest.txt)
    manifest: Option<PathBuf>,
}

impl From<Subcommand> for Command {
    fn from(subcommand: Subcommand) -> Self {
        match subcommand {
            Subcommand::Run(args) => Command::Run(RunRequest {
                dry_run: args.dryrun,
                utility: args.util,
                utility_args: args.util_args,
                log_dir: args.log_dir,
                paths: args.paths,
            }),
            Subcommand::Generate(args) => Command::Generate(GenerateRequest {
                source: args.source,
                destination: args.destination,
                manifest: args.manifest,
                log_dir: args.log_dir,
                config: GenerateConfig {
                    overwrite: args.overwrite,
                    relative_source: args.rel_src,
                    relative_destination: args.rel_dest,
                },
            }),
        }
    }
}

fn exit_with(status: ExitStatus, usage: Option<&str>) -> ! {
    match usage {
        Some(usage) => println!("{}\n{}", status.message(), usage),
        None => println!("{}", status.message()),
    }
    std::process::exit(status.code());
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            if !error.use_stderr() {
                // --help and --version
                error.exit();
            }
            let _ = error.print();
            exit_with(ExitStatus::Usage, Some(&migrate_tools_migrate::usage()));
        }
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let command = Command::from(args.command);
    let usage = command.usage();
    let func = move || command.execute();
    if let Err(error) = common::run(output, runtime, func) {
        let status = error.exit_status();
        exit_with(status, (status == ExitStatus::Usage).then_some(usage));
    }
}
