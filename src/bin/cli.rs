//! listing-autofill CLI
//!
//! Detects tables in an exported spreadsheet grid, drives the Etsy listing editor in a
//! Chrome tab to create variations and fill prices, and generates listing titles and tags
//! from photos.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use listing_autofill::automation::AutomationReport;
use listing_autofill::content::{ContentGenerator, FillTarget, GeminiClient, ImageData};
use listing_autofill::grid::{CellAddress, Grid, Table, description_candidates, segment};
use listing_autofill::page::PageController;
use listing_autofill::pricing::{FallbackRates, compute_price, resolve_rate};
use listing_autofill::{
    AutomationSequencer, BrowserSession, ColumnMapping, ConnectionOptions, LaunchOptions, RowOutcome, Settings,
};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "listing-autofill")]
#[command(version)]
#[command(about = "Spreadsheet variations and AI listing content for the Etsy listing editor", long_about = None)]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, short = 'c', value_name = "PATH", default_value = "listing-autofill.json")]
    settings: PathBuf,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H', global = true)]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH", global = true)]
    executable_path: Option<PathBuf>,

    /// WebSocket endpoint of an already running browser
    #[arg(long, value_name = "URL", global = true)]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory (keeps the Etsy login)
    #[arg(long, value_name = "DIR", global = true)]
    user_data_dir: Option<PathBuf>,

    /// Listing editor URL to open when launching a new browser
    #[arg(long, value_name = "URL", global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the tables detected in a grid file (JSON array of rows)
    Tables {
        grid: PathBuf,
    },

    /// Compute a listing price with the configured pricing
    Price {
        /// Raw spreadsheet value, e.g. "$12.50"
        value: String,

        /// Exchange rate override
        #[arg(long)]
        rate: Option<f64>,
    },

    /// Create variations from a table and fill every row price
    Apply {
        grid: PathBuf,

        /// Table id or zero-based position (default: first table)
        #[arg(long)]
        table: Option<String>,

        /// Variant 1 column (letter or zero-based index)
        #[arg(long, value_parser = parse_column)]
        variant1: Option<usize>,

        #[arg(long, value_parser = parse_column)]
        variant2: Option<usize>,

        #[arg(long, value_parser = parse_column)]
        price: Option<usize>,

        /// Cell holding the listing description, e.g. "F2"
        #[arg(long)]
        description: Option<CellAddress>,

        /// Skip variation creation and only re-fill prices of existing rows
        #[arg(long)]
        prices_only: bool,
    },

    /// Generate title and tags, from an image file or from the open listing
    Generate {
        /// Image file; when omitted the listing's current photo is used and the form is filled
        #[arg(long)]
        image: Option<PathBuf>,

        /// Fields to fill: title, tags or all
        #[arg(long, default_value = "all")]
        target: FillTarget,
    },

    /// Watch the listing editor and auto-generate content for the first upload
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "2000")]
        interval_ms: u64,
    },
}

fn parse_column(value: &str) -> std::result::Result<usize, String> {
    if let Ok(index) = value.parse::<usize>() {
        return Ok(index);
    }
    format!("{}1", value).parse::<CellAddress>().map(|a| a.column)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.settings).await?;
    settings.apply_env();

    match &cli.command {
        Command::Tables { grid } => print_tables(&load_grid(grid).await?),
        Command::Price { value, rate } => {
            let rate = match rate {
                Some(rate) => *rate,
                None => exchange_rate(&settings).await?,
            };
            let config = settings.pricing.pricing_config(rate)?;
            match compute_price(value, &config) {
                Some(price) => println!("{}", price),
                None => bail!("'{}' holds no price", value),
            }
        }
        Command::Apply { grid, table, variant1, variant2, price, description, prices_only } => {
            let grid = load_grid(grid).await?;
            let tables = segment(&grid);
            let table = pick_table(&tables, table.as_deref())?;
            info!("Using table '{}' ({} rows)", table.name, table.rows().len());

            let mapping = ColumnMapping { variant1: *variant1, variant2: *variant2, price: *price, description: *description };
            let pricing = settings.pricing.pricing_config(exchange_rate(&settings).await?)?;

            let session = open_browser(&cli)?;
            let page = session.listing_tab()?;

            let mut sequencer = AutomationSequencer::new(&page).with_timings(settings.sequencer.timings());
            if let Some(text) = mapping.description_text(&grid) {
                sequencer = sequencer.with_description(text);
            }

            let report = if *prices_only {
                sequencer.update_prices_only(table, &mapping, &pricing).await?
            } else {
                sequencer.run(table, &mapping, &pricing).await?
            };
            print_report(&report);
        }
        Command::Generate { image: Some(path), .. } => {
            let image = read_image_file(path).await?;
            let rotation = generator(&settings)?.generate(&image).await?;
            println!("{}", serde_json::to_string_pretty(&rotation.value)?);
        }
        Command::Generate { image: None, target } => {
            let session = open_browser(&cli)?;
            let page = session.listing_tab()?;
            let mut controller = PageController::new(&page, generator(&settings)?);
            let report = controller.regenerate(*target).await?;
            println!("title set: {}, tags added: {}", report.title_set, report.tags_added);
        }
        Command::Watch { interval_ms } => {
            let session = open_browser(&cli)?;
            let page = session.listing_tab()?;
            let mut controller =
                PageController::new(&page, generator(&settings)?).auto_generate(settings.gemini.auto_generate);

            info!("Watching listing editor (Ctrl-C to stop)");
            let mut ticker = tokio::time::interval(Duration::from_millis(*interval_ms));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match controller.poll().await {
                            Ok(outcome) => {
                                if let Some(report) = outcome.generated {
                                    info!("Generated: title set {}, tags added {}", report.title_set, report.tags_added);
                                }
                            }
                            Err(e) => error!("{} ({:?})", e, e.kind()),
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Stopping");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn load_grid(path: &Path) -> Result<Grid> {
    let json = tokio::fs::read_to_string(path).await.with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("{} is not a JSON array of rows", path.display()))
}

fn pick_table<'a>(tables: &'a [Table], selector: Option<&str>) -> Result<&'a Table> {
    if tables.is_empty() {
        return Err(listing_autofill::AutofillError::NoSourceTable.into());
    }
    let Some(selector) = selector else {
        return Ok(&tables[0]);
    };

    tables
        .iter()
        .find(|t| t.id == selector)
        .or_else(|| selector.parse::<usize>().ok().and_then(|i| tables.get(i)))
        .with_context(|| format!("no table '{}'", selector))
}

fn print_tables(grid: &Grid) {
    let tables = segment(grid);
    if tables.is_empty() {
        println!("No table found in data");
    }
    for (i, table) in tables.iter().enumerate() {
        let headers: Vec<String> = table.headers().iter().map(|c| c.trimmed()).collect();
        println!(
            "[{}] {} ({}, row {}, {} value rows): {}",
            i,
            table.name,
            table.id,
            table.origin_source_row,
            table.rows().len(),
            headers.join(" | ")
        );
    }

    for candidate in description_candidates(grid) {
        println!("description candidate {}: {}", candidate.address, candidate.preview);
    }
}

fn print_report(report: &AutomationReport) {
    for dimension in &report.dimensions {
        println!(
            "{}: {}/{} options added{}",
            dimension.header,
            dimension.options_added,
            dimension.options_requested,
            if dimension.confirmed { "" } else { " (not confirmed)" }
        );
    }
    if let Some(price) = &report.listing_price {
        println!("listing price: {}", price);
    }
    for row in &report.rows {
        match row {
            RowOutcome::Priced { label, price, .. } => println!("  {} -> {}", label, price),
            RowOutcome::PriceNotAccepted { label, price, .. } => println!("  {} -> {} (not accepted)", label, price),
            RowOutcome::Disabled { label, .. } => println!("  {} -> disabled", label),
            RowOutcome::NoPriceInput { label, .. } => println!("  {} -> no price input", label),
        }
    }
    for unmatched in report.unmatched_rows() {
        println!("{}", unmatched);
    }
}

async fn exchange_rate(settings: &Settings) -> Result<f64> {
    let source = FallbackRates::public(reqwest::Client::new());
    Ok(resolve_rate(&source, &settings.pricing.target_currency, settings.pricing.manual_rate).await?)
}

fn generator(settings: &Settings) -> Result<ContentGenerator> {
    Ok(ContentGenerator::new(GeminiClient::new()?, settings.gemini.api_keys.clone())
        .model(settings.gemini.model.clone())
        .prompt(settings.gemini.prompt.clone()))
}

async fn read_image_file(path: &Path) -> Result<ImageData> {
    let bytes = tokio::fs::read(path).await.with_context(|| format!("reading {}", path.display()))?;
    let mime_type = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    };
    Ok(ImageData::from_bytes(mime_type, &bytes))
}

fn open_browser(cli: &Cli) -> Result<BrowserSession> {
    if let Some(endpoint) = &cli.ws_endpoint {
        info!("Connecting to {}", endpoint);
        return Ok(BrowserSession::connect(ConnectionOptions::new(endpoint.clone()))?);
    }

    let mut options = LaunchOptions::new().headless(!cli.headed);
    if let Some(path) = &cli.executable_path {
        options = options.chrome_path(path.clone());
    }
    if let Some(dir) = &cli.user_data_dir {
        options = options.user_data_dir(dir.clone());
    }

    let session = BrowserSession::launch(options)?;
    if let Some(url) = &cli.url {
        session.open_listing(url)?;
    }
    Ok(session)
}
