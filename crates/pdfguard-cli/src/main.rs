// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfguard — Command-line entry point. Parses arguments, layers the run
// configuration (file, then environment, then flags), sets up logging and
// hands off to the batch driver.

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use pdfguard_batch::{BatchDriver, log_summary, write_json_report};
use pdfguard_core::error::{GuardError, Result};
use pdfguard_core::human_errors::humanize_error;
use pdfguard_core::{GuardConfig, OutputMode, PageSize, Permissions, Placement, sanitize_filename};
use pdfguard_document::{SampleWriter, inspect_file};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pdfguard")]
#[command(version)]
#[command(about = "Watermark and password-protect a PDF library, with mirrored backups")]
struct Cli {
    /// Emit log events as JSON on stderr
    #[arg(long, global = true)]
    json: bool,

    /// Also append log events to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up, watermark and encrypt every matching document
    Protect(ProtectArgs),

    /// Report whether a document is encrypted and what it permits
    Inspect {
        /// Document to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Password to try when the document is encrypted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Write a plain multi-page sample document
    Sample {
        /// Output path
        #[arg(value_name = "OUT")]
        output: PathBuf,

        /// Number of pages
        #[arg(short = 'n', long, default_value_t = 3)]
        pages: usize,

        /// Paper size
        #[arg(long, value_enum, default_value_t = Paper::Letter)]
        paper: Paper,

        /// Title printed on each page
        #[arg(long)]
        title: Option<String>,
    },

    /// Print the sanitized form of each name
    Sanitize {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },
}

#[derive(clap::Args)]
struct ProtectArgs {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Document root to scan (repeatable; replaces the configured roots)
    #[arg(long = "root", value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Where originals are mirrored before they are touched
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<PathBuf>,

    /// Write protected copies under DIR instead of replacing originals
    #[arg(long, value_name = "DIR")]
    mirror: Option<PathBuf>,

    /// Suffix added to file stems in the mirrored output tree
    #[arg(long, default_value = "-protected")]
    suffix: String,

    /// File extension to match (without the dot)
    #[arg(long)]
    extension: Option<String>,

    /// List what would be processed without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Process files on all cores
    #[arg(long)]
    parallel: bool,

    /// Write the full run result as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Password needed to open protected documents
    #[arg(long, env = "PDFGUARD_USER_PASSWORD", hide_env_values = true)]
    user_password: Option<String>,

    /// Password that lifts the permission restrictions
    #[arg(long, env = "PDFGUARD_OWNER_PASSWORD", hide_env_values = true)]
    owner_password: Option<String>,

    /// Granted permissions, e.g. `print,copy`
    #[arg(long)]
    permissions: Option<Permissions>,

    /// Watermark placement: bottom, center or diagonal
    #[arg(long)]
    placement: Option<Placement>,

    /// Watermark text
    #[arg(long)]
    watermark_text: Option<String>,

    /// Watermark opacity between 0 and 1
    #[arg(long)]
    opacity: Option<f32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Paper {
    Letter,
    A4,
}

impl From<Paper> for PageSize {
    fn from(paper: Paper) -> Self {
        match paper {
            Paper::Letter => PageSize::LETTER,
            Paper::A4 => PageSize::A4,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Protect(args) => Some(build_config(args)),
        _ => None,
    };
    let log_file = cli.log_file.clone().or_else(|| {
        config
            .as_ref()
            .and_then(|c| c.as_ref().ok())
            .and_then(|c| c.log_file.clone())
    });

    if let Err(err) = logging::init(cli.json, log_file.as_deref()) {
        eprintln!("pdfguard: {err}");
        return ExitCode::FAILURE;
    }

    let outcome = match cli.command {
        Commands::Protect(args) => match config {
            Some(Ok(config)) => protect(config, &args),
            Some(Err(err)) => Err(err),
            None => Err(GuardError::Config("no configuration".to_string())),
        },
        Commands::Inspect { file, password } => inspect(file, password.as_deref(), cli.json),
        Commands::Sample {
            output,
            pages,
            paper,
            title,
        } => sample(output, pages, paper, title),
        Commands::Sanitize { names } => {
            for name in names {
                println!("{}", sanitize_filename(&name));
            }
            Ok(ExitCode::SUCCESS)
        }
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            let human = humanize_error(&err);
            error!(%err, "{}", human.message);
            error!("{}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

// -- Configuration ----------------------------------------------------------

/// Start from the config file (or defaults) and apply environment and flag
/// overrides. Clap resolves env against flags, so a flag always wins.
fn build_config(args: &ProtectArgs) -> Result<GuardConfig> {
    let mut config = match &args.config {
        Some(path) => GuardConfig::load(path)?,
        None => GuardConfig::default(),
    };

    if !args.roots.is_empty() {
        config.roots = args.roots.clone();
    }
    if let Some(dir) = &args.backup_dir {
        config.backup_root = dir.clone();
    }
    if let Some(root) = &args.mirror {
        config.output = OutputMode::Mirror {
            root: root.clone(),
            suffix: args.suffix.clone(),
        };
    }
    if let Some(extension) = &args.extension {
        config.extension = extension.trim_start_matches('.').to_string();
    }
    if args.parallel {
        config.parallel = true;
    }

    let policy = &mut config.policy;
    if let Some(password) = &args.user_password {
        policy.user_password = password.clone();
    }
    if let Some(password) = &args.owner_password {
        policy.owner_password = password.clone();
    }
    if let Some(permissions) = args.permissions {
        policy.permissions = permissions;
    }
    if let Some(placement) = args.placement {
        policy.watermark.placement = placement;
    }
    if let Some(text) = &args.watermark_text {
        policy.watermark.text = text.clone();
    }
    if let Some(opacity) = args.opacity {
        policy.watermark.opacity = opacity;
    }

    config.validate()?;
    Ok(config)
}

// -- Commands ---------------------------------------------------------------

fn protect(config: GuardConfig, args: &ProtectArgs) -> Result<ExitCode> {
    let driver = BatchDriver::new(config)?;

    if args.dry_run {
        let plan = driver.plan();
        info!(
            files = plan.len(),
            backup_root = %driver.backups().backup_root().display(),
            "Backups would be written under the backup root"
        );
        return Ok(ExitCode::SUCCESS);
    }

    let result = driver.run();
    log_summary(&result, driver.backups().backup_root());

    if let Some(path) = &args.report {
        write_json_report(&result, path)?;
    }

    Ok(if result.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn inspect(file: PathBuf, password: Option<&str>, json: bool) -> Result<ExitCode> {
    let inspection = inspect_file(&file, password)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
    } else {
        println!("File:        {}", file.display());
        println!("Version:     {}", inspection.version);
        println!("Encrypted:   {}", inspection.encrypted);
        println!("Opened:      {}", inspection.opened);
        println!("Pages:       {}", inspection.pages);
        println!("Permissions: {}", inspection.permission_names().join(", "));
    }

    Ok(if inspection.opened {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn sample(output: PathBuf, pages: usize, paper: Paper, title: Option<String>) -> Result<ExitCode> {
    let mut writer = SampleWriter::new(paper.into());
    if let Some(title) = title {
        writer.set_title(title);
    }
    writer.write_to_file(pages, &output)?;
    info!(path = %output.display(), pages, "Wrote sample document");
    Ok(ExitCode::SUCCESS)
}
