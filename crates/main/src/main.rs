use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use study_booklet::model::{load_works, Artifact};
use study_booklet::progress::{
    recent_works, summarize, variety_distribution, CatalogSummary, VarietyCount,
};
use study_booklet::{
    generate_booklet, generate_share_card, BookletOptions, Curriculum, RenderError,
    ShareCardOptions, Work,
};

/// Generates progress reports, booklets and share cards from a study catalog.
///
/// Fonts must be present under `assets/fonts` next to the binary or the `study_booklet` crate,
/// or provided via the `STUDY_BOOKLET_FONTS_DIR` environment variable.  Set `RUST_LOG` to see
/// what the renderers are doing.
#[derive(Parser)]
#[command(author, version, about = "Study catalog booklets and share cards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the catalog snapshot comes from.
#[derive(Args)]
struct Snapshot {
    /// Curriculum table (JSON object with `graduations` and `items`, or an array of items).
    #[arg(long)]
    curriculum: PathBuf,

    /// Works snapshot (JSON array); relative image paths resolve against this file.
    #[arg(long)]
    works: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Print graduation progress and catalog statistics as JSON.
    Progress {
        #[command(flatten)]
        snapshot: Snapshot,

        /// Number of recent works to list.
        #[arg(long, default_value_t = 5)]
        recent: usize,
    },

    /// Render the progress booklet PDF.
    Booklet {
        #[command(flatten)]
        snapshot: Snapshot,

        /// Directory the booklet is written to.
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Render the share card PNG of one work.
    #[command(name = "share-card", aliases = ["share_card", "card"])]
    ShareCard {
        #[command(flatten)]
        snapshot: Snapshot,

        /// Identifier of the work to share.
        #[arg(long)]
        work: String,

        /// Directory the card is written to.
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressReport<'a> {
    summary: CatalogSummary,
    varieties: Vec<VarietyCount>,
    recent: Vec<&'a Work>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logging().and_then(|()| run(cli)) {
        if let Some(RenderError::EmptyCatalog) = err.downcast_ref::<RenderError>() {
            eprintln!("{err}");
            std::process::exit(2);
        }
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("study_booklet=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| -> Box<dyn Error> { err })
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Progress { snapshot, recent } => {
            let (curriculum, works) = snapshot.load()?;
            let report = ProgressReport {
                summary: summarize(&curriculum, &works),
                varieties: variety_distribution(&works),
                recent: recent_works(&works, recent),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Booklet { snapshot, output } => {
            let (curriculum, works) = snapshot.load()?;
            let artifact = generate_booklet(&curriculum, &works, &BookletOptions::new())?;
            save(&output, &artifact)?;
        }
        Commands::ShareCard {
            snapshot,
            work,
            output,
        } => {
            let (curriculum, works) = snapshot.load()?;
            let artifact =
                generate_share_card(&curriculum, &works, &work, &ShareCardOptions::new())?;
            save(&output, &artifact)?;
        }
    }
    Ok(())
}

impl Snapshot {
    fn load(&self) -> Result<(Curriculum, Vec<Work>), Box<dyn Error>> {
        let curriculum = Curriculum::load(&self.curriculum)?;
        let works = load_works(&self.works)?;
        Ok((curriculum, works))
    }
}

fn save(directory: &Path, artifact: &Artifact) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(directory)?;
    let path = directory.join(&artifact.filename);
    std::fs::write(&path, &artifact.bytes)?;
    println!("Generated {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
