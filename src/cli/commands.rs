use crate::{
    cli::args::{GraphArgs, OutputFormat, PlanArgs, RunArgs},
    core::{
        backends::memory::io::{read_json_lines, write_json_lines},
        engine::{build_explain_output, plan_to_dot},
        load_plan, ConfigLoader, Plan, RuleData, RuleEngine, RuleRegistry, RulegraphConfig,
        RunSummary, Table,
    },
    Result,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::{
    env,
    path::{Path, PathBuf},
};

/// Workspace, configuration and plan shared by every command.
struct PlanSession {
    workspace: PathBuf,
    config: RulegraphConfig,
    plan: Plan,
}

impl PlanSession {
    fn open(plan_path: &Path, backend: Option<&str>, workspace: Option<&Path>) -> Result<Self> {
        let workspace = match workspace {
            Some(path) => path.to_path_buf(),
            None => env::current_dir()?,
        };
        let config = ConfigLoader::load_from_workspace(&workspace)?;
        let backend = backend
            .map(str::to_string)
            .unwrap_or_else(|| config.engine.default_backend.clone());
        let registry = RuleRegistry::with_builtins();
        tracing::debug!(
            plan = %plan_path.display(),
            %backend,
            workspace = %workspace.display(),
            "loading plan"
        );
        let plan = load_plan(plan_path, &backend, &registry)?;
        Ok(Self {
            workspace,
            config,
            plan,
        })
    }

    fn data_path(&self, path: &Path) -> PathBuf {
        self.config.resolve_data_path(&self.workspace, path)
    }

    /// Input slots for structural checks: names only, tables left empty.
    fn placeholder_data(&self, args: &PlanArgs) -> RuleData {
        let main = args.main_input.as_ref().map(|_| Table::default());
        let named: IndexMap<String, Table> = args
            .inputs
            .iter()
            .map(|(name, _)| (name.clone(), Table::default()))
            .collect();
        RuleData::new(main, named)
    }

    fn load_data(&self, args: &PlanArgs) -> Result<RuleData> {
        let main = match &args.main_input {
            Some(path) => Some(read_json_lines(&self.data_path(path))?),
            None => None,
        };
        let mut named = IndexMap::new();
        for (name, path) in &args.inputs {
            named.insert(name.clone(), read_json_lines(&self.data_path(path))?);
        }
        Ok(RuleData::new(main, named))
    }
}

#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
    mode: Option<String>,
    rules: usize,
    error: Option<String>,
}

pub fn validate(args: PlanArgs) -> Result<()> {
    let session = PlanSession::open(&args.plan, args.backend.as_deref(), args.workspace.as_deref())?;
    let data = session.placeholder_data(&args);
    let engine = RuleEngine::new(session.plan);
    let outcome = engine.check(&data);
    let report = ValidationReport {
        valid: outcome.is_ok(),
        mode: engine.plan().mode().map(|mode| mode.to_string()),
        rules: engine.plan().len(),
        error: outcome.as_ref().err().map(|err| err.message.clone()),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            if report.valid {
                println!(
                    "Plan is valid: {} rule(s), {} mode.",
                    report.rules,
                    report.mode.as_deref().unwrap_or("unknown")
                );
            } else {
                println!(
                    "Plan is invalid: {}",
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    outcome.map_err(Into::into)
}

pub fn explain(args: PlanArgs) -> Result<()> {
    let session = PlanSession::open(&args.plan, args.backend.as_deref(), args.workspace.as_deref())?;
    let data = session.placeholder_data(&args);
    let engine = RuleEngine::new(session.plan);
    let output = build_explain_output(&engine, &data);
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => print!("{}", output.render_text()),
    }
    Ok(())
}

#[derive(Serialize)]
struct RunReport<'a> {
    summary: &'a RunSummary,
    outputs: Vec<WrittenOutput>,
}

#[derive(Serialize)]
struct WrittenOutput {
    slot: String,
    path: String,
    rows: usize,
}

pub fn run(args: RunArgs) -> Result<()> {
    let plan_args = &args.plan;
    let mut session = PlanSession::open(
        &plan_args.plan,
        plan_args.backend.as_deref(),
        plan_args.workspace.as_deref(),
    )?;
    let mut data = session.load_data(plan_args)?;
    let engine = RuleEngine::new(std::mem::take(&mut session.plan));
    let summary = engine.run(&mut data)?;

    let mut written = Vec::new();
    if let Some(path) = &args.main_output {
        let table = data.get_main_output()?;
        let target = session.data_path(path);
        write_json_lines(table, &target)?;
        written.push(WrittenOutput {
            slot: "main".to_string(),
            path: target.display().to_string(),
            rows: table.row_count(),
        });
    }
    for (name, path) in &args.outputs {
        let table = data.get_named_output(name)?;
        let target = session.data_path(path);
        write_json_lines(table, &target)?;
        written.push(WrittenOutput {
            slot: name.clone(),
            path: target.display().to_string(),
            rows: table.row_count(),
        });
    }

    match plan_args.format {
        OutputFormat::Json => {
            let report = RunReport {
                summary: &summary,
                outputs: written,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "Ran {} rule(s) in {} mode ({} ms).",
                summary.rules.len(),
                summary.mode,
                summary.total_duration_ms
            );
            for output in &written {
                println!("  {} -> {} ({} rows)", output.slot, output.path, output.rows);
            }
        }
    }
    Ok(())
}

pub fn graph(args: GraphArgs) -> Result<()> {
    let session = PlanSession::open(&args.plan, args.backend.as_deref(), args.workspace.as_deref())?;
    print!("{}", plan_to_dot(&session.plan));
    Ok(())
}
