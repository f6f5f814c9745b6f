//! plom-idmatch CLI: match scanned papers to student IDs from JSON files.

use clap::{Args, Parser, Subcommand};
use plom_idmatch::{
    assignment_cost, log_likelihood_cost_with_floor, mean_digit_probability,
    solve_optimal_assignment, DMatrix, IdMatcher, MatchConfig, MatchInputs, MatchReport,
    PredictionStore, ProbabilityTable, Roster, StudentId,
};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "plom-idmatch")]
#[command(about = "Predict which student wrote each exam paper from ID digit probabilities")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the greedy and optimal predictors and write the predictions.
    Predict(CliPredictArgs),

    /// Print the cost and certainty of one (paper, student ID) pair.
    Cost {
        /// Digit probabilities (JSON object keyed by paper number).
        #[arg(long)]
        probs: PathBuf,

        /// Paper number to look up.
        #[arg(long)]
        paper: u32,

        /// Student ID to score.
        #[arg(long)]
        id: String,

        /// Optional matching configuration (JSON) for the probability floor.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Solve a cost matrix given as a JSON array of rows.
    Solve {
        /// Cost matrix (JSON array of equal-length rows of numbers).
        #[arg(long)]
        matrix: PathBuf,
    },

    /// Print the default matching configuration as JSON.
    ConfigDump,
}

#[derive(Debug, Clone, Args)]
struct CliPredictArgs {
    /// Digit probabilities (JSON object keyed by paper number).
    #[arg(long)]
    probs: PathBuf,

    /// Classlist (JSON: {"students": [{"id": ..., "name": ..., "paper_number": ...}]}).
    #[arg(long)]
    roster: PathBuf,

    /// IDs already attached to identified papers (JSON array of strings).
    #[arg(long)]
    matched: Option<PathBuf>,

    /// Unidentified paper numbers (JSON array). Defaults to every paper in --probs.
    #[arg(long)]
    papers: Option<PathBuf>,

    /// Matching configuration (JSON). Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to write predictions and the run report (JSON).
    #[arg(long)]
    out: PathBuf,
}

#[derive(serde::Serialize)]
struct PredictOutput<'a> {
    report: &'a MatchReport,
    n_prenamed: usize,
    predictions: &'a PredictionStore,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict(args) => run_predict(&args),
        Commands::Cost {
            probs,
            paper,
            id,
            config,
        } => run_cost(&probs, paper, &id, config.as_deref()),
        Commands::Solve { matrix } => run_solve(&matrix),
        Commands::ConfigDump => run_config_dump(),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<MatchConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading config: {}", p.display());
            MatchConfig::from_json_file(p)
        }
        None => Ok(MatchConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| -> CliError { format!("{}: {}", path.display(), e).into() })?;
    Ok(serde_json::from_str(&data)?)
}

fn run_predict(args: &CliPredictArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;

    tracing::info!("Loading probabilities: {}", args.probs.display());
    let probabilities = ProbabilityTable::from_json_file(&args.probs)?;
    tracing::info!("Loading roster: {}", args.roster.display());
    let roster = Roster::from_json_file(&args.roster)?;

    let already_matched: Vec<StudentId> = match &args.matched {
        Some(p) => read_json(p)?,
        None => Vec::new(),
    };
    let unidentified_papers: Vec<u32> = match &args.papers {
        Some(p) => read_json(p)?,
        None => probabilities.papers().collect(),
    };

    let inputs = MatchInputs {
        roster: roster.ids().cloned().collect(),
        already_matched,
        unidentified_papers,
        probabilities,
    };

    let matcher = IdMatcher::new(config);
    let mut store = PredictionStore::new();
    let n_prenamed = matcher
        .record_prenamed(&roster, &mut store)
        .map_err(|e| -> CliError { e })?;
    let report = matcher.run(&inputs, &mut store);

    tracing::info!(
        "{} candidate IDs, {} papers ({} without probabilities)",
        report.n_candidate_ids,
        report.n_papers,
        report.n_papers_without_probabilities
    );

    let output = PredictOutput {
        report: &report,
        n_prenamed,
        predictions: &store,
    };
    let json = serde_json::to_string_pretty(&output)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Predictions written to {}", args.out.display());

    Ok(())
}

fn run_cost(probs: &Path, paper: u32, id: &str, config: Option<&Path>) -> CliResult<()> {
    let config = load_config(config)?;
    let table = ProbabilityTable::from_json_file(probs)?;
    let digit_probs = table
        .get(paper)
        .ok_or_else(|| -> CliError { format!("no probabilities for paper {}", paper).into() })?;
    let id: StudentId = id.parse()?;

    let cost = log_likelihood_cost_with_floor(&id, digit_probs, config.probability_floor)?;
    let certainty = mean_digit_probability(&id, digit_probs)?;

    println!("Paper {} vs ID {}", paper, id);
    println!("  cost:       {:.6}", cost);
    println!("  certainty:  {:.4}", certainty);

    Ok(())
}

fn run_solve(path: &Path) -> CliResult<()> {
    let rows: Vec<Vec<f64>> = read_json(path)?;
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().position(|r| r.len() != n_cols) {
        return Err(format!(
            "row {} has {} entries, expected {}",
            bad,
            rows[bad].len(),
            n_cols
        )
        .into());
    }
    let cost = DMatrix::from_fn(n_rows, n_cols, |r, c| rows[r][c]);

    let pairs = solve_optimal_assignment(&cost)?;

    println!("Assignment ({}x{} matrix):", n_rows, n_cols);
    for &(r, c) in &pairs {
        println!("  row {:>4} -> col {:>4}  cost {:.6}", r, c, cost[(r, c)]);
    }
    println!("Total cost: {:.6}", assignment_cost(&cost, &pairs));

    Ok(())
}

fn run_config_dump() -> CliResult<()> {
    let json = serde_json::to_string_pretty(&MatchConfig::default())?;
    println!("{}", json);
    Ok(())
}
