use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use gridfill::dict::{bench_index, LetterIndex, SortedIndex};
use gridfill::{
    build_index, compile, Alphabet, BacktrackerKind, Grid, IndexKind, Outcome, OutputFormat,
    SearchConfig, WalkerKind, WordList,
};
use log::{info, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Rounds of random fills per index when benchmarking.
const BENCH_ROUNDS: usize = 1000;

/// gridfill: fill a crossword grid with words from a dictionary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Word list, one word per line
    #[arg(short, long, default_value = "/usr/share/dict/words")]
    dict: PathBuf,

    /// Template grid: a "<width> <height>" line, then rows of '+' (open), ' ' (block) and letters
    #[arg(short, long, conflicts_with = "grid", required_unless_present_any = ["grid", "bench_dict"])]
    pattern: Option<PathBuf>,

    /// General grid: one word per line, given as the numbers of its cells
    #[arg(short, long, required_unless_present_any = ["pattern", "bench_dict"])]
    grid: Option<PathBuf>,

    /// Order in which cells are filled
    #[arg(short, long, value_enum, default_value_t = WalkerKind::Flood)]
    walker: WalkerKind,

    /// Strategy for resuming after a dead end
    #[arg(short, long, value_enum, default_value_t = BacktrackerKind::Smart)]
    backtracker: BacktrackerKind,

    /// How to print a template grid
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Ascii)]
    format: OutputFormat,

    /// Dictionary index implementation
    #[arg(short, long, value_enum, default_value_t = IndexKind::Indexed)]
    index: IndexKind,

    /// Letters words may use, in the order they are tried [default: a-z]
    #[arg(long)]
    alphabet: Option<String>,

    /// Random seed for the dictionary benchmark [default: random]
    #[arg(short = 'r', long)]
    seed: Option<u64>,

    /// Log more detail (-v for candidate sets, -vv for backtracking)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Log the grid every half second while searching
    #[arg(short, long)]
    show_steps: bool,

    /// Log the grid after every letter placed
    #[arg(short = 'S', long)]
    show_all_steps: bool,

    /// Give up after placing this many letters
    #[arg(long)]
    max_states: Option<u64>,

    /// Time both dictionary indexes and exit
    #[arg(long)]
    bench_dict: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> gridfill::Result<ExitCode> {
    let alphabet = match &args.alphabet {
        Some(letters) => Alphabet::new(letters)?,
        None => Alphabet::default(),
    };
    let word_list = WordList::load(&args.dict, &alphabet)?;

    if args.bench_dict {
        bench(&word_list, args.seed);
        return Ok(ExitCode::SUCCESS);
    }

    let mut grid = match (&args.pattern, &args.grid) {
        (Some(path), _) => Grid::load_template(path, &alphabet)?,
        (None, Some(path)) => Grid::load_general(path)?,
        (None, None) => return Err(gridfill::Error::Format("No grid file given".into())),
    };
    let index = build_index(args.index, &word_list);

    let open = grid.num_open();
    info!(
        "Open cells: {}, possible fillings: {:e}",
        open,
        (alphabet.len() as f64).powi(i32::try_from(open).unwrap_or(i32::MAX))
    );
    info!("Walker: {:?}, backtracker: {:?}", args.walker, args.backtracker);
    info!("Degree of interlock: {:.2}", grid.interlock_degree());
    info!(
        "Degree of dependency: {:.2} (first level), {:.2} (second level)",
        grid.dependency_degree(1),
        grid.dependency_degree(2)
    );

    let config = SearchConfig {
        walker: args.walker,
        backtracker: args.backtracker,
        show_steps: args.show_steps,
        show_all_steps: args.show_all_steps,
        max_states: args.max_states,
    };
    let report = compile(&mut grid, index.as_ref(), &alphabet, &config)?;

    info!("Attempt average: {:.2}", grid.attempt_average());
    info!("Compilation time: {:?}", report.statistics.duration);
    info!(
        "Searched {:e} of {:e} fillings ({:.4}%)",
        report.rejected,
        report.space,
        report.searched_fraction() * 100.0
    );

    match report.outcome {
        Outcome::Solved => {
            print!("{}", grid.render(&alphabet, args.format));
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Unsatisfiable => {
            println!("No solution found");
            Ok(ExitCode::from(2))
        }
        Outcome::Aborted => {
            println!("No solution found within {} states", report.statistics.states);
            Ok(ExitCode::from(2))
        }
    }
}

fn bench(word_list: &WordList, seed: Option<u64>) {
    let seed = seed.unwrap_or_else(rand::random);
    info!("Benchmark seed: {seed}");

    let letter_index = LetterIndex::new(word_list);
    let elapsed = bench_index(&letter_index, BENCH_ROUNDS, &mut StdRng::seed_from_u64(seed));
    info!("Indexed dictionary: {:?} for {} rounds", elapsed, BENCH_ROUNDS);

    let sorted_index = SortedIndex::new(word_list);
    let elapsed = bench_index(&sorted_index, BENCH_ROUNDS, &mut StdRng::seed_from_u64(seed));
    info!("Sorted dictionary: {:?} for {} rounds", elapsed, BENCH_ROUNDS);
}
