use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use log::info;

use minni_logic::condition::{Bindings, Value};
use minni_logic::engine::RuleEngine;
use minni_logic::formula::Formula;
use minni_logic::graph::KnowledgeGraph;
use minni_logic::sat::{SatSolver, SolverConfig};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Search node budget for `sat` and `count`.
    #[clap(long, value_name = "INT")]
    max_nodes: Option<u64>,

    /// Search deadline in milliseconds for `sat` and `count`.
    #[clap(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Enable debug logging.
    #[clap(long)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a formula and print a model.
    Sat {
        #[arg(value_name = "FORMULA")]
        formula: String,
    },
    /// Count the models of a formula.
    Count {
        #[arg(value_name = "FORMULA")]
        formula: String,
    },
    /// Evaluate a rule file against `name=value` inputs.
    Rules {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(value_name = "NAME=VALUE")]
        inputs: Vec<String>,
    },
    /// Load `subject predicate object` lines from stdin and print statistics.
    Facts {
        /// Use the interned encoding.
        #[clap(long)]
        quantized: bool,
    },
}

fn parse_input(input: &str) -> color_eyre::Result<(String, Value)> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| eyre!("expected NAME=VALUE, got {:?}", input))?;
    let value = match value.parse::<f64>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::Text(value.trim_matches(|c| c == '\'' || c == '"').to_string()),
    };
    Ok((name.to_string(), value))
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let config = SolverConfig {
        max_nodes: args.max_nodes,
        timeout: args.timeout_ms.map(Duration::from_millis),
    };

    match args.command {
        Command::Sat { formula } => {
            let formula = Formula::parse(&formula)?;
            info!("formula = {}", formula);
            let mut solver = SatSolver::new(config);
            let result = solver.check(&formula)?;
            println!("{:?}", result.status);
            for (name, value) in &result.model {
                println!("{} = {}", name, value);
            }
            info!("stats = {:?}", solver.stats());
        }
        Command::Count { formula } => {
            let formula = Formula::parse(&formula)?;
            let mut solver = SatSolver::new(config);
            match solver.count_models(&formula)? {
                Some(count) => println!("{} models over {} variables", count, formula.num_vars()),
                None => println!("budget exhausted"),
            }
            info!("stats = {:?}", solver.stats());
        }
        Command::Rules { path, inputs } => {
            let text = std::fs::read_to_string(&path)?;
            let mut engine = RuleEngine::new();
            engine.load_rules(&text)?;
            info!("loaded {} rules from {}", engine.num_rules()?, path.display());

            let bindings = inputs
                .iter()
                .map(|input| parse_input(input))
                .collect::<color_eyre::Result<Bindings>>()?;
            match engine.evaluate(&bindings)? {
                Some(conclusion) => println!("{}", conclusion),
                None => println!("no match"),
            }
        }
        Command::Facts { quantized } => {
            let mut graph = match quantized {
                true => KnowledgeGraph::quantized(),
                false => KnowledgeGraph::plain(),
            };
            for line in std::io::stdin().lock().lines() {
                let line = line?;
                let parts: Vec<&str> = line.split_whitespace().collect();
                match parts.as_slice() {
                    [] => continue,
                    [s, p, o] => graph.add_fact(s, p, o)?,
                    _ => return Err(eyre!("expected `subject predicate object`, got {:?}", line)),
                }
            }
            println!("facts: {}", graph.fact_count()?);
            println!("entities: {}", graph.entity_count()?);
            println!("relations: {}", graph.relation_count()?);
            println!("memory: {} bytes", graph.memory_usage_bytes());
        }
    }

    Ok(())
}
