//! Binary entry point for the Reel recommendation CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reel::{
    config::EngineConfig,
    engine::{Engine, EngineStats},
    import::{load_dataset, read_ratings},
    model::FactorSnapshot,
    query::{HistoryEntry, PredictedItem, SimilarItem},
    ItemId, UserId,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "reel",
    version,
    about = "Collaborative-filtering recommendations over a rating dataset",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    open: OpenArgs,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct OpenArgs {
    #[arg(
        long,
        global = true,
        env = "REEL_CONFIG",
        value_name = "FILE",
        help = "Engine config file (TOML)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Directory with ratings.csv, movies.csv and links.csv"
    )]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE", help = "Ratings CSV")]
    ratings: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE", help = "Items (catalog) CSV")]
    catalog: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE", help = "Links CSV")]
    links: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Start from a saved factor snapshot instead of training"
    )]
    factors: Option<PathBuf>,

    #[arg(long, global = true, help = "Override latent rank")]
    rank: Option<usize>,

    #[arg(long, global = true, help = "Override training iterations")]
    iterations: Option<usize>,

    #[arg(long, global = true, help = "Override regularization weight")]
    regularization: Option<f64>,

    #[arg(long, global = true, help = "Override training seed")]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Print dataset and model statistics")]
    Stats,

    #[command(about = "Predict a user's rating for specific items")]
    Predict {
        #[arg(long, value_name = "USER", allow_negative_numbers = true)]
        user: i64,

        #[arg(
            long,
            value_name = "ID,ID",
            value_delimiter = ',',
            allow_negative_numbers = true,
            required = true,
            help = "Comma-separated item ids"
        )]
        items: Vec<i64>,
    },

    #[command(about = "Recommend unrated items to a user")]
    Top {
        #[arg(long, value_name = "USER", allow_negative_numbers = true)]
        user: i64,

        #[arg(long, default_value_t = 10, help = "Number of recommendations")]
        count: usize,
    },

    #[command(about = "List items similar to an item (self-match first)")]
    Similar {
        #[arg(long, value_name = "ITEM", allow_negative_numbers = true)]
        item: i64,

        #[arg(long, help = "Neighbours to return besides the item itself")]
        limit: Option<usize>,
    },

    #[command(about = "List a user's own ratings")]
    History {
        #[arg(long, value_name = "USER", allow_negative_numbers = true)]
        user: i64,
    },

    #[command(about = "Add ratings from a CSV file and retrain")]
    Ingest {
        #[arg(value_name = "FILE", help = "Ratings CSV with a header row")]
        file: PathBuf,

        #[arg(long, value_name = "FILE", help = "Save the retrained factors")]
        save: Option<PathBuf>,
    },

    #[command(about = "Train from the dataset and save the factors")]
    Train {
        #[arg(long, value_name = "FILE", required = true)]
        save: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = EngineConfig::load(cli.open.config.clone())?;
    apply_overrides(&mut config, &cli.open, &cli.command);
    let engine = open_engine(&config, &cli.command)?;

    let format = cli.format;
    match cli.command {
        Command::Stats => emit(format, &engine.stats())?,
        Command::Predict { user, items } => {
            let items: Vec<ItemId> = items.into_iter().map(ItemId).collect();
            emit(format, &engine.ratings_for_items(UserId(user), &items))?;
        }
        Command::Top { user, count } => {
            emit(format, &engine.top_recommendations(UserId(user), count))?;
        }
        Command::Similar { item, .. } => emit(format, &engine.similar_items(ItemId(item))?)?,
        Command::History { user } => emit(format, &engine.user_history(UserId(user)))?,
        Command::Ingest { file, save } => {
            let ratings = read_ratings("ingest", File::open(&file)?)?;
            let accepted = engine.add_ratings(ratings)?;
            if let Some(path) = &save {
                engine.export_snapshot().save(path)?;
            }
            let summary = IngestSummary {
                accepted: accepted.len(),
                saved_to: save,
                stats: engine.stats(),
            };
            emit(format, &summary)?;
        }
        Command::Train { save } => {
            engine.export_snapshot().save(&save)?;
            let summary = TrainSummary {
                saved_to: save,
                stats: engine.stats(),
            };
            emit(format, &summary)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct IngestSummary {
    accepted: usize,
    saved_to: Option<PathBuf>,
    stats: EngineStats,
}

#[derive(Serialize)]
struct TrainSummary {
    saved_to: PathBuf,
    stats: EngineStats,
}

fn apply_overrides(config: &mut EngineConfig, open: &OpenArgs, command: &Command) {
    let dataset = &mut config.dataset;
    if let Some(dir) = &open.data_dir {
        dataset.dir = Some(dir.clone());
    }
    if let Some(path) = &open.ratings {
        dataset.ratings = Some(path.clone());
    }
    if let Some(path) = &open.catalog {
        dataset.items = Some(path.clone());
    }
    if let Some(path) = &open.links {
        dataset.links = Some(path.clone());
    }
    if let Some(path) = &open.factors {
        dataset.factors = Some(path.clone());
    }
    let training = &mut config.training;
    if let Some(rank) = open.rank {
        training.rank = rank;
    }
    if let Some(iterations) = open.iterations {
        training.iterations = iterations;
    }
    if let Some(regularization) = open.regularization {
        training.regularization = regularization;
    }
    if let Some(seed) = open.seed {
        training.seed = seed;
    }
    if let Command::Similar {
        limit: Some(limit), ..
    } = command
    {
        config.queries.similar_limit = *limit;
    }
}

fn open_engine(config: &EngineConfig, command: &Command) -> Result<Engine, Box<dyn Error>> {
    let paths = config
        .dataset
        .paths()
        .ok_or("dataset location missing; pass --data-dir or --ratings/--catalog/--links")?;
    let dataset = load_dataset(&paths)?;
    let options = config.engine_options();
    let preloaded = match (&config.dataset.factors, command) {
        (_, Command::Train { .. }) => None,
        (Some(path), _) => Some(FactorSnapshot::load(path)?.into_model()?),
        (None, _) => None,
    };
    let engine = match preloaded {
        Some(model) => Engine::open_with_model(dataset, options, model),
        None => Engine::open(dataset, options)?,
    };
    Ok(engine)
}

/// Human-readable rendering used by `--format text`.
trait TextReport {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

fn emit<T>(format: OutputFormat, value: &T) -> Result<(), Box<dyn Error>>
where
    T: Serialize + TextReport,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputFormat::Text => value.write_text(&mut out)?,
    }
    out.flush()?;
    Ok(())
}

impl TextReport for EngineStats {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Dataset:")?;
        writeln!(
            out,
            "  ratings={} users={} rated_items={} catalog_items={} links={}",
            self.ratings, self.users, self.rated_items, self.catalog_items, self.links
        )?;
        writeln!(out, "Model:")?;
        writeln!(
            out,
            "  generation={} trained_users={} trained_items={} rank={} iterations={} regularization={} seed={}",
            self.generation,
            self.trained_users,
            self.trained_items,
            self.params.rank,
            self.params.iterations,
            self.params.regularization,
            self.params.seed
        )
    }
}

impl TextReport for IngestSummary {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "accepted={}", self.accepted)?;
        if let Some(path) = &self.saved_to {
            writeln!(out, "saved factors to {}", path.display())?;
        }
        self.stats.write_text(out)
    }
}

impl TextReport for TrainSummary {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "saved factors to {}", self.saved_to.display())?;
        self.stats.write_text(out)
    }
}

impl TextReport for Vec<PredictedItem> {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.is_empty() {
            return writeln!(out, "(no results)");
        }
        for row in self {
            writeln!(
                out,
                "{:>8}  {:>6.3}  n={:<6} {}  [{}]",
                row.item_id, row.predicted_rating, row.rating_count, row.title, row.external_ref
            )?;
        }
        Ok(())
    }
}

impl TextReport for Vec<SimilarItem> {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.is_empty() {
            return writeln!(out, "(no results)");
        }
        for row in self {
            writeln!(
                out,
                "{:>8}  {:>6.3}  n={:<6} avg={:.2}  {}  [{}]",
                row.item_id,
                row.similarity,
                row.rating_count,
                row.mean_rating,
                row.title,
                row.external_ref
            )?;
        }
        Ok(())
    }
}

impl TextReport for Vec<HistoryEntry> {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.is_empty() {
            return writeln!(out, "(no results)");
        }
        for row in self {
            writeln!(
                out,
                "{:>8}  {:>4.1}  {}  [{}]",
                row.item_id, row.rating, row.title, row.external_ref
            )?;
        }
        Ok(())
    }
}
