use clap::{Parser, Subcommand};
use dzi_pyramid::imaging::{ImageBackend, RustBackend};
use dzi_pyramid::layout::{self, PyramidPaths};
use dzi_pyramid::pyramid::{self, BatchJob, Eligibility, PyramidReport};
use dzi_pyramid::{config, output};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dzi-pyramid")]
#[command(about = "Generate Deep Zoom Image tile pyramids")]
#[command(long_about = "\
Generate Deep Zoom Image tile pyramids

Each source image becomes a descriptor plus a tree of overlapping tiles:

  uploads/
  ├── art_abc123.jpg
  └── dzi/
      ├── art_abc123.dzi           # written last; its presence means complete
      └── art_abc123_files/
          ├── 0/0_0.jpg            # 1×1
          ├── ...
          └── 12/15_11.jpg         # full resolution, {col}_{row}

Existing complete pyramids are left alone. A failed run removes its partial
tiles. Run 'dzi-pyramid gen-config' to generate a documented dzi.toml.")]
#[command(version)]
struct Cli {
    /// Log debug events (per level) to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Config file flag shared by commands that read settings.
#[derive(clap::Args, Clone)]
struct ConfigArgs {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "dzi.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Build pyramids for one or more source images
    Generate {
        /// Source images
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Output directory [default: dzi/ beside each source]
        #[arg(long)]
        output: Option<PathBuf>,

        /// Only build pyramids for images at or above trigger.min_dimension
        #[arg(long)]
        only_large: bool,

        /// Print one JSON report per source instead of text
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Show the levels and tile counts a source would produce
    Plan {
        source: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Delete a pyramid's descriptor and tiles
    Remove {
        /// Pyramid name (source file stem)
        name: String,

        /// Directory holding the pyramid
        #[arg(long, default_value = "dzi")]
        output: PathBuf,
    },
    /// Print a stock dzi.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Generate {
            sources,
            output: output_dir,
            only_large,
            json,
            config: config_args,
        } => {
            let config = config::load_config(&config_args.config)?;
            let backend = RustBackend::new();

            let jobs: Vec<BatchJob> = sources
                .into_iter()
                .filter(|source| {
                    if !only_large {
                        return true;
                    }
                    match pyramid::check_trigger(&backend, source, &config.trigger) {
                        Eligibility::Eligible(_) => true,
                        Eligibility::BelowThreshold(d) => {
                            info!(
                                source = %source.display(),
                                width = d.width,
                                height = d.height,
                                "below trigger threshold, skipping"
                            );
                            false
                        }
                        Eligibility::Unreadable(e) => {
                            warn!(source = %source.display(), error = %e, "cannot identify source, skipping");
                            false
                        }
                    }
                })
                .map(|source| BatchJob {
                    output_dir: output_dir
                        .clone()
                        .unwrap_or_else(|| layout::default_output_dir(&source)),
                    source,
                })
                .collect();

            let outcomes = pyramid::generate_batch_with_backend(&backend, &jobs, &config);
            let reports: Vec<PyramidReport> = outcomes
                .iter()
                .map(|o| PyramidReport::from_result(&o.result))
                .collect();

            for (outcome, report) in outcomes.iter().zip(&reports) {
                if json {
                    println!("{}", serde_json::to_string(report)?);
                } else {
                    output::print_report(&outcome.source, report);
                }
            }
            if !json {
                println!();
                println!("{}", output::format_totals(&reports));
            }

            if reports.iter().any(|r| !r.success) {
                std::process::exit(1);
            }
        }
        Command::Plan {
            source,
            config: config_args,
        } => {
            let config = config::load_config(&config_args.config)?;
            let dimensions = RustBackend::new().identify(&source)?;
            output::print_plan(&source, dimensions, &config);
        }
        Command::Remove {
            name,
            output: output_dir,
        } => {
            let paths = PyramidPaths::new(output_dir, name);
            let removed = layout::remove_pyramid(&paths)?;
            output::print_removed(paths.name(), &removed);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Send tracing events to stderr so stdout stays clean for reports.
///
/// `RUST_LOG` overrides the default filter.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "dzi_pyramid=debug"
    } else {
        "dzi_pyramid=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
