pub mod args;
pub mod commands;

pub use args::{GraphArgs, OutputFormat, PlanArgs, RunArgs};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
PLAN COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "rulegraph")]
#[command(version = crate::VERSION)]
#[command(about = "Run declarative rule plans over tabular data as pipelines or graphs")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: validate a plan against its inputs, explain the execution order, then run it."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Check a plan's structure without running it",
        long_about = "Validate infers the plan mode and checks named inputs, duplicate outputs and clashes with the supplied inputs. Input files are not read.",
        after_help = "Example:\n    rulegraph validate plan.yml --input orders=orders.jsonl"
    )]
    Validate(PlanArgs),
    #[command(
        about = "Execute a plan over JSON-lines inputs",
        long_about = "Run validates the plan, loads the inputs, applies every rule in dependency order and writes the requested outputs.",
        after_help = "Example:\n    rulegraph run plan.yml --main-input in.jsonl --main-output out.jsonl"
    )]
    Run(RunArgs),
    #[command(
        about = "Show the plan's rules, slots and execution order",
        long_about = "Explain lists every rule with its effective input and output slots, its dependencies and the order a run would use.",
        after_help = "Example:\n    rulegraph explain plan.yml --input orders=orders.jsonl --format json"
    )]
    Explain(PlanArgs),
    #[command(
        about = "Render the plan's data flow as Graphviz DOT",
        after_help = "Example:\n    rulegraph graph plan.yml | dot -Tsvg > plan.svg"
    )]
    Graph(GraphArgs),
}

impl Command {
    /// Workspace the command operates in.
    pub fn workspace(&self) -> Option<PathBuf> {
        let explicit = match self {
            Command::Validate(args) | Command::Explain(args) => args.workspace.clone(),
            Command::Run(args) => args.plan.workspace.clone(),
            Command::Graph(args) => args.workspace.clone(),
        };
        explicit.or_else(|| env::current_dir().ok())
    }
}

pub fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Validate(plan_args) => commands::validate(plan_args),
        Command::Run(run_args) => commands::run(run_args),
        Command::Explain(plan_args) => commands::explain(plan_args),
        Command::Graph(graph_args) => commands::graph(graph_args),
    }
}
