use clap::Parser;
use crossfill::autofill::{grid_stats, AutoFill, FillError};
use crossfill::backtracking_search::FillOptions;
use crossfill::grid_config::Grid;
use crossfill::random::RngStrategy;
use crossfill::word_list::WordList;
use std::fmt::{Debug, Formatter};
use std::fs;

/// crossfill: Command-line crossword auto-fill tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the grid file, as ASCII with # representing blocks and . representing empty squares
    grid_path: String,

    /// Path to a word list file, one `WORD;SCORE` entry per line
    #[arg(long)]
    wordlist: String,

    /// Path to a JSON file of fill options; flags below override its values
    #[arg(long)]
    options: Option<String>,

    /// Number of seeded search attempts after the greedy pass
    #[arg(long)]
    max_retries: Option<usize>,

    /// Backtrack budget of the first search attempt
    #[arg(long)]
    initial_max_backtracks: Option<usize>,

    /// Consecutive slot failures needed to backtrack instead of restarting
    #[arg(long)]
    failures_before_backtrack: Option<usize>,

    /// Random number generator to drive the search with (`lcg` or `small_rng`)
    #[arg(long)]
    rng: Option<RngStrategy>,

    /// Adjust crossing weights as slots fail
    #[arg(long)]
    learn_crossing_weights: bool,

    /// Print fill statistics to stderr
    #[arg(long)]
    stats: bool,
}

struct Error(String);

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0) // Print error unquoted
    }
}

fn load_options(args: &Args) -> Result<FillOptions, Error> {
    let mut options: FillOptions = match &args.options {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .map_err(|_| Error(format!("Couldn't read file '{path}'")))?;
            serde_json::from_str(&contents)
                .map_err(|error| Error(format!("Invalid options file '{path}': {error}")))?
        }
        None => FillOptions::default(),
    };

    if let Some(max_retries) = args.max_retries {
        options.max_retries = max_retries;
    }
    if let Some(initial_max_backtracks) = args.initial_max_backtracks {
        options.initial_max_backtracks = initial_max_backtracks;
    }
    if let Some(failures_before_backtrack) = args.failures_before_backtrack {
        options.failures_before_backtrack = failures_before_backtrack;
    }
    if let Some(rng) = args.rng {
        options.rng = rng;
    }
    if args.learn_crossing_weights {
        options.learn_crossing_weights = true;
    }

    Ok(options)
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let options = load_options(&args)?;

    let template = fs::read_to_string(&args.grid_path)
        .map_err(|_| Error(format!("Couldn't read file '{}'", args.grid_path)))?;
    let mut grid = Grid::from_template(&template).map_err(|error| Error(error.to_string()))?;

    let word_list =
        WordList::from_dict_file(&args.wordlist).map_err(|error| Error(error.to_string()))?;

    let mut auto_fill = AutoFill::new(options);
    auto_fill.set_dictionary(word_list);

    let result = auto_fill
        .auto_fill_grid(&mut grid)
        .map_err(|error: FillError| Error(error.to_string()))?;

    if args.stats {
        let stats = grid_stats(&grid);
        eprintln!(
            "{}",
            serde_json::to_string_pretty(auto_fill.statistics())
                .map_err(|error| Error(error.to_string()))?
        );
        eprintln!(
            "{} of {} words filled ({}%)",
            stats.filled_words, stats.total_words, stats.completion_percentage
        );
    }

    if !result.success {
        return Err(Error(result.message));
    }

    eprintln!("{}", result.message);
    println!("{}", grid.render());

    Ok(())
}
