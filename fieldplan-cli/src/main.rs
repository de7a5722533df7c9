use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use fieldplan_cli::input::{parse_portal_list, validate};
use fieldplan_cli::plan::{is_plan_file, PlanFile, PLAN_EXTENSION};
use fieldplan_cli::printers::PlanPrinter;
use fieldplan_core::{assign_agents, plan, Graph, PlannerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "fieldplan",
    version,
    about = "Plan a maximum-field link overlay and split the work across agents"
)]
struct Args {
    /// Portal list (one `name ; lat ; lng [; keys]` per line), or a plan
    /// saved by a previous run
    input_file: PathBuf,

    /// Directory receiving every output artifact
    #[arg(default_value = ".")]
    output_directory: PathBuf,

    /// Name for the saved plan inside the output directory; feed it back as
    /// the input to replan for a different agent count
    #[arg(default_value = "lastPlan.json")]
    output_file: PathBuf,

    /// Number of agents
    #[arg(short = 'n', long = "agents", value_name = "COUNT", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    agents: u32,

    /// Use the blue map theme instead of green
    #[arg(short = 'b', long = "blue")]
    blue: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_ansi(false)
        .init();

    let args = Args::parse();
    debug!(?args, "starting");

    if args.output_file.extension().map_or(true, |ext| ext != PLAN_EXTENSION) {
        warn!(
            file = ?args.output_file,
            "output file does not end in .{}; it will not be reloadable as input",
            PLAN_EXTENSION
        );
    }
    if args.blue {
        debug!("blue theme requested; this build renders no maps");
    }

    fs::create_dir_all(&args.output_directory)
        .with_context(|| format!("creating {:?}", args.output_directory))?;

    let nagents = args.agents as usize;

    let mut graph = if is_plan_file(&args.input_file) {
        info!(path = ?args.input_file, "reusing saved plan");
        PlanFile::load(&args.input_file)?.into_graph()
    } else {
        let text = fs::read_to_string(&args.input_file)
            .with_context(|| format!("reading {:?}", args.input_file))?;
        let portals = parse_portal_list(&text);
        validate(&portals)?;
        info!(portals = portals.len(), "planning link overlay");

        let base = Graph::new(portals);
        let graph = plan(&base, &PlannerConfig::default())?;

        let out_path = args.output_directory.join(&args.output_file);
        PlanFile::from_graph(&graph).save(&out_path)?;
        info!(path = ?out_path, links = graph.links.len(), "plan saved");
        graph
    };

    let schedule = assign_agents(&mut graph, nagents);
    let total_time = graph.walktime + graph.linktime + graph.commtime;
    info!(
        agents = nagents,
        links = graph.links.len(),
        fields = graph.triangle_count(),
        minutes = total_time / 60.0,
        "schedule ready"
    );

    let stamp = Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string();
    let printer = PlanPrinter::new(&graph, &schedule, nagents);
    printer.key_prep(&args.output_directory, &stamp)?;
    printer.agent_keys(&args.output_directory, &stamp)?;
    printer.agent_links(&args.output_directory, &stamp)?;
    info!(dir = ?args.output_directory, "instruction sheets written");

    Ok(())
}
