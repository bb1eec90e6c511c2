//! Legistats CLI - EU legislative act statistics to tidy data
//!
//! # Main Commands
//!
//! ```bash
//! legistats parse --input export.csv --output data/legislative_acts_2023_05.csv
//! legistats parse --input <url> --output <csv> --generate-doi --release
//! legistats report --data-dir data --output-dir site
//! legistats cite --doi 10.5281/zenodo.1234567
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! legistats classify --input export.csv   # Show how each raw row is read
//! ```

use clap::{Args, Parser, Subcommand};
use legistats::config::{GitHubConfig, ZenodoConfig};
use legistats::logs::init_tracing;
use legistats::publish::{MetadataOverrides, ZenodoPublisher};
use legistats::transform::{NormalizeOptions, NormalizerState};
use legistats::{
    collect_reports, fetch_source, format_delimiter, parse_source_bytes_with, render_site,
    run_pipeline, ParseOptions, RawRow, Source,
};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "legistats")]
#[command(about = "Turn EUR-Lex legal act statistics exports into tidy datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a raw export into a tidy CSV, optionally publishing it
    Parse(ParseArgs),

    /// Print how every raw row is classified (debug)
    Classify {
        /// Input CSV file path or URL
        #[arg(short, long)]
        input: String,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// End a wrapped category label at a subtotal row
        #[arg(long)]
        reset_continuation_on_subtotal: bool,
    },

    /// Render the static report site from a directory of tidy tables
    Report {
        /// Directory holding legislative_acts_*.csv tables
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Where to write index.html and stats/
        #[arg(short, long, default_value = "site")]
        output_dir: PathBuf,
    },

    /// Print citation formats for a DOI
    Cite {
        /// Dataset DOI
        #[arg(long)]
        doi: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ParseArgs {
    /// Input CSV file path or URL
    #[arg(short, long)]
    input: String,

    /// Output tidy CSV file
    #[arg(short, long)]
    output: PathBuf,

    /// CSV delimiter (auto-detect if not specified)
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Add a parsed_at column
    #[arg(long)]
    timestamp: bool,

    /// End a wrapped category label at a subtotal row
    #[arg(long)]
    reset_continuation_on_subtotal: bool,

    /// Generate a DOI for the dataset using Zenodo
    #[arg(long)]
    generate_doi: bool,

    /// Use Zenodo production instead of sandbox
    #[arg(long)]
    production: bool,

    /// Zenodo API token
    #[arg(long, env = "ZENODO_TOKEN", hide_env_values = true)]
    zenodo_token: Option<String>,

    /// Publish a new version of this deposition
    #[arg(long)]
    deposit_id: Option<u64>,

    /// Create a GitHub release with the produced files
    #[arg(long)]
    release: bool,

    /// Release tag (default: dataset-<YYYY_MM>)
    #[arg(long)]
    release_tag: Option<String>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    github_repository: Option<String>,

    /// Authors/creators of the dataset (comma-separated)
    #[arg(long)]
    authors: Option<String>,

    /// Custom title for the dataset
    #[arg(long)]
    title: Option<String>,

    /// Custom description for the dataset
    #[arg(long)]
    description: Option<String>,

    /// Keywords for the dataset (comma-separated)
    #[arg(long)]
    keywords: Option<String>,

    /// License for the dataset (default: cc-by)
    #[arg(long)]
    license: Option<String>,
}

impl ParseArgs {
    fn into_options(self) -> ParseOptions {
        let overrides = MetadataOverrides {
            title: self.title,
            description: self.description,
            creators: self.authors.as_deref().map(MetadataOverrides::split_list),
            keywords: self.keywords.as_deref().map(MetadataOverrides::split_list),
            license: self.license,
        };

        let zenodo = self
            .generate_doi
            .then(|| ZenodoConfig::new(self.zenodo_token, self.production));
        let github = self.release.then(|| {
            GitHubConfig::from_repository(
                self.github_token,
                self.github_repository.as_deref().unwrap_or_default(),
            )
        });

        let mut options = ParseOptions::new(self.input, self.output);
        options.delimiter = self.delimiter;
        options.timestamp = self.timestamp;
        options.normalize = NormalizeOptions {
            reset_continuation_on_subtotal: self.reset_continuation_on_subtotal,
        };
        options.zenodo = zenodo;
        options.deposit_id = self.deposit_id;
        options.overrides = overrides;
        options.github = github;
        options.release_tag = self.release_tag;
        options
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse(args) => cmd_parse(args).await,

        Commands::Classify {
            input,
            delimiter,
            reset_continuation_on_subtotal,
        } => cmd_classify(&input, delimiter, reset_continuation_on_subtotal).await,

        Commands::Report {
            data_dir,
            output_dir,
        } => cmd_report(&data_dir, &output_dir),

        Commands::Cite { doi, output } => cmd_cite(&doi, output.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("   caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}

async fn cmd_parse(args: ParseArgs) -> Result<(), Box<dyn Error>> {
    eprintln!("📄 Processing: {}", args.input);

    let outcome = run_pipeline(args.into_options()).await?;

    eprintln!("   Encoding: {}", outcome.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(outcome.delimiter));
    eprintln!("   Rows: {}", outcome.diagnostics.rows_seen);
    eprintln!("\n⚙️  Tidy records: {}", outcome.records);
    if outcome.diagnostics.skipped_rows > 0 {
        eprintln!("   ⚠️  Skipped rows: {}", outcome.diagnostics.skipped_rows);
    }
    if outcome.diagnostics.coerced_cells > 0 {
        eprintln!("   ⚠️  Non-numeric counts: {}", outcome.diagnostics.coerced_cells);
    }
    eprintln!("   💾 Saved to: {}", outcome.output.display());

    if let Some(ref doi) = outcome.doi {
        eprintln!("\n🔖 DOI generated: {}", doi);
    }
    if let Some(ref url) = outcome.release_url {
        eprintln!("🏷️  Release: {}", url);
    }
    for error in &outcome.publish_errors {
        eprintln!("   ❌ {}", error);
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

async fn cmd_classify(
    input: &str,
    delimiter: Option<char>,
    reset_continuation_on_subtotal: bool,
) -> Result<(), Box<dyn Error>> {
    let source = Source::parse(input);
    eprintln!("🔎 Classifying: {}", source);

    let table = parse_source_bytes_with(&fetch_source(&source).await?, delimiter)?;
    let mut state = NormalizerState::new(NormalizeOptions {
        reset_continuation_on_subtotal,
    });

    for (i, row) in table.rows.iter().enumerate() {
        let kind = state.classify(row);
        let label = kind.name();
        let produced = state.apply(kind).len();
        println!(
            "{:>5}  {:<8} {:<60} | period={} category={} +{}",
            i + 1,
            label,
            format_cells(row),
            state
                .current_period
                .as_ref()
                .map(|p| format!("{}-{}", p.year, p.month))
                .unwrap_or_else(|| "-".into()),
            state.current_category.as_deref().unwrap_or("-"),
            produced
        );
    }

    eprintln!("\n📊 {} rows", table.rows.len());
    Ok(())
}

fn cmd_report(data_dir: &Path, output_dir: &Path) -> Result<(), Box<dyn Error>> {
    eprintln!("📚 Collecting tidy tables from: {}", data_dir.display());
    let reports = collect_reports(data_dir)?;
    eprintln!("   {} table(s)", reports.len());

    let site = render_site(&reports, output_dir)?;
    eprintln!("   💾 Index: {}", site.index.display());
    eprintln!("\n✨ Done!");
    Ok(())
}

async fn cmd_cite(doi: &str, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    eprintln!("🔖 Resolving citation for: {}", doi);

    let citation = ZenodoPublisher::new(ZenodoConfig::anonymous())
        .generate_citation(doi, None)
        .await?;
    let json = serde_json::to_string_pretty(&citation)?;
    write_output(&json, output)?;
    Ok(())
}

fn format_cells(row: &RawRow) -> String {
    row.cells
        .iter()
        .map(|c| c.as_deref().unwrap_or("∅"))
        .collect::<Vec<_>>()
        .join(" │ ")
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
