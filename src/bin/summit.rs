//! Summit CLI - archive-guided evolutionary unit test generation
//!
//! Search for tests of a class model, or send one prompt to the
//! configured text-generation oracle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use summit::archive::CoverageArchive;
use summit::cluster::{StaticCluster, TypeCluster};
use summit::fitness::{FitnessOracle, MethodCoverageOracle};
use summit::generator::{
    ClusterInserter, GuidedFactory, LlmVariableSelector, RandomSelector, VariableSelector,
};
use summit::mutator::StructuralMutator;
use summit::oracle::{HttpTextOracle, LlmConfig, TextOracle};
use summit::search::{
    IterationStats, LogObserver, SearchBudget, SearchComponents, SearchConfig, SearchObserver,
    Summit, SuiteResult,
};

/// Summit - Archive-Guided Evolutionary Test Generation
#[derive(Parser)]
#[command(name = "summit")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a test suite covering a class model
    Search {
        /// Class model (JSON)
        #[arg(short, long)]
        cluster: PathBuf,

        /// Search configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Text-generation oracle configuration (JSON); enables guided selection
        #[arg(long)]
        llm: Option<PathBuf>,

        /// Fitness evaluation budget
        #[arg(long, default_value = "10000")]
        max_evaluations: usize,

        /// Wall-clock budget in seconds
        #[arg(long)]
        max_seconds: Option<u64>,

        /// Random seed, overriding the configuration
        #[arg(long)]
        seed: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,

        /// Show a progress bar
        #[arg(long, default_value = "false")]
        progress: bool,
    },

    /// Send one prompt to the text-generation oracle
    Query {
        /// Text-generation oracle configuration (JSON)
        #[arg(long)]
        llm: PathBuf,

        /// Prompt text
        #[arg(short, long)]
        prompt: String,
    },
}

/// Progress bar driven by search events
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new() -> Self {
        let bar = ProgressBar::new(1000);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}‰ {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }
}

impl SearchObserver for ProgressObserver {
    fn search_started(&mut self, goals: usize) {
        self.bar.set_message(format!("0/{goals} goals"));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn iteration(&mut self, stats: &IterationStats) {
        self.bar.set_position((stats.progress * 1000.0) as u64);
        self.bar
            .set_message(format!("{}/{} goals", stats.covered, stats.goals));
    }

    fn search_finished(&mut self, result: &SuiteResult) {
        self.bar.finish_with_message(format!(
            "{}/{} goals covered",
            result.covered(),
            result.total()
        ));
    }
}

fn factory(
    cluster: &Arc<dyn TypeCluster>,
    selector: Box<dyn VariableSelector>,
    config: &SearchConfig,
) -> Box<GuidedFactory> {
    let inserter = ClusterInserter::new(Arc::clone(cluster), selector);
    Box::new(GuidedFactory::new(
        Box::new(inserter),
        config.chromosome_length,
        config.max_attempts,
    ))
}

#[allow(clippy::too_many_arguments)]
fn search(
    cluster: &Path,
    config: Option<&Path>,
    llm: Option<&Path>,
    max_evaluations: usize,
    max_seconds: Option<u64>,
    seed: Option<u64>,
    output: &str,
    progress: bool,
) -> summit::Result<()> {
    let cluster: Arc<dyn TypeCluster> = Arc::new(StaticCluster::from_json_file(cluster)?);
    let mut config = match config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::default(),
    };
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    let guided_selector: Box<dyn VariableSelector> = match llm {
        Some(path) => {
            let oracle = HttpTextOracle::new(LlmConfig::from_json_file(path)?)?;
            log::info!("guided selection through {}", oracle.config().model);
            Box::new(LlmVariableSelector::new(Arc::new(oracle)))
        }
        None => Box::new(RandomSelector::new()),
    };

    let fitness = MethodCoverageOracle::new(Arc::clone(&cluster));
    let goals: Vec<_> = fitness.goals().ids().collect();
    log::info!("{} goals over {} callables", goals.len(), cluster.callables().len());
    let mutation_inserter =
        ClusterInserter::new(Arc::clone(&cluster), Box::new(RandomSelector::new()));
    let components = SearchComponents {
        archive: Box::new(CoverageArchive::new(goals, config.tests_per_target)),
        seed_factory: factory(&cluster, Box::new(RandomSelector::new()), &config),
        guided_factory: factory(&cluster, guided_selector, &config),
        mutator: Box::new(StructuralMutator::new(
            Arc::clone(&cluster),
            Box::new(mutation_inserter),
            config.chromosome_length,
        )),
        fitness: Box::new(fitness),
    };

    let mut budget = SearchBudget::evaluations(max_evaluations);
    if let Some(seconds) = max_seconds {
        budget = budget.with_max_time(Duration::from_secs(seconds));
    }

    let mut summit = Summit::new(config, components)?;
    let result = if progress {
        summit.run(budget, &mut ProgressObserver::new())?
    } else {
        summit.run(budget, &mut LogObserver::new(100))?
    };

    let report = result.report();
    match output {
        "json" => println!("{}", report.to_json()?),
        _ => print!("{report}"),
    }
    Ok(())
}

fn query(llm: &Path, prompt: &str) -> summit::Result<()> {
    let oracle = HttpTextOracle::new(LlmConfig::from_json_file(llm)?)?;
    println!("{}", oracle.query(prompt)?);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Search {
            cluster,
            config,
            llm,
            max_evaluations,
            max_seconds,
            seed,
            output,
            progress,
        } => search(
            &cluster,
            config.as_deref(),
            llm.as_deref(),
            max_evaluations,
            max_seconds,
            seed,
            &output,
            progress,
        ),
        Commands::Query { llm, prompt } => query(&llm, &prompt),
    };

    if let Err(err) = outcome {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
