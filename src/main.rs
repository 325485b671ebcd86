//main.rs
use anyhow::Context;
use clap::{Parser, ValueEnum};
use kmeans_viz::command::{Command, HELP};
use kmeans_viz::config::DEFAULT_BASE_URL;
use kmeans_viz::{
    Config, Dataset, HttpClusteringService, InitMethod, JsonLinesSink, RenderSink, Selection,
    Session, TerminalPlot,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Output {
    Ascii,
    Json,
}

#[derive(Parser)]
#[clap(version = "0.3.0", author = "Stefan L. <stefan.lang@med.lu.se>")]
#[clap(about = "Drive a remote K-means service step by step and plot every iteration")]
struct Opts {
    /// Base URL of the clustering backend
    #[clap(short, long, env = "KMEANS_VIZ_URL", default_value = DEFAULT_BASE_URL)]
    url: String,

    /// TSV file to cluster instead of a random dataset
    #[clap(short, long)]
    file: Option<String>,

    /// Number of clusters
    #[clap(short, long, default_value_t = 3)]
    k: usize,

    /// Initialization method: random, kmeans++, farthest or manual
    #[clap(short, long, default_value = "random")]
    init: InitMethod,

    /// Size of generated datasets
    #[clap(short = 'n', long, default_value_t = 100)]
    points: usize,

    /// Milliseconds between auto-step ticks
    #[clap(long, default_value_t = 1000)]
    tick_ms: u64,

    /// Request timeout in seconds
    #[clap(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Run to convergence right after a successful init
    #[clap(long)]
    run_immediately: bool,

    /// Seed for dataset generation
    #[clap(long)]
    seed: Option<u64>,

    #[clap(short, long, value_enum, default_value_t = Output::Ascii)]
    output: Output,

    /// Commands separated by ';' to run instead of reading stdin
    #[clap(short, long)]
    script: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opts {
    fn config(&self) -> Config {
        let mut config = Config::default()
            .with_base_url(self.url.clone())
            .with_cluster_count(self.k)
            .with_init_method(self.init)
            .with_tick_period(Duration::from_millis(self.tick_ms))
            .with_run_immediately(self.run_immediately);
        config.request_timeout = Duration::from_secs(self.timeout_secs);
        config.dataset_size = self.points;
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }
}

enum Flow {
    Continue,
    Quit,
}

async fn dispatch(session: &mut Session, cmd: Command) -> anyhow::Result<Flow> {
    match cmd {
        Command::Generate(None) => session.generate(),
        Command::Generate(Some(n)) => session.generate_n(n),
        Command::Load(path) => {
            let dataset = Dataset::from_tsv(&path)?;
            println!("Loaded {} points from {}", dataset.len(), path.display());
            session.load(dataset);
        }
        Command::Reset => session.reset(),
        Command::Method(method) => session.set_init_method(method),
        Command::ClusterCount(k) => session.set_cluster_count(k),
        Command::Click { x, y } => match session.on_point_clicked(x, y)? {
            Selection::Ignored => println!("Clicks only pick centroids in manual mode"),
            Selection::Captured { count } => println!("Picked centroid {}", count),
        },
        Command::Initialize => {
            let centroids = session.initialize().await?;
            println!("Initialized with {} centroids", centroids.len());
        }
        Command::Step => {
            let response = session.step().await?;
            if response.converged {
                println!("KMeans has converged!");
            }
        }
        Command::AutoStep => session.start_auto_step()?,
        Command::Stop => {
            if !session.stop_auto_step() {
                println!("Auto step is not running");
            }
        }
        Command::Converge => {
            session.run_to_convergence().await?;
        }
        Command::Status => {
            let state = session.state();
            println!(
                "points={} method={} k={} picks={} initialized={} running={} controls={}",
                state.dataset.len(),
                state.init_method,
                state.session_k.unwrap_or(state.cluster_count),
                state.selected.len(),
                state.initialized,
                state.running,
                if state.controls_enabled { "enabled" } else { "disabled" },
            );
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Parse and run one line; failures are reported and the session goes on.
async fn handle_line(session: &mut Session, line: &str) -> Flow {
    if line.trim().is_empty() {
        return Flow::Continue;
    }
    let cmd = match line.parse::<Command>() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("{}", e);
            return Flow::Continue;
        }
    };
    match dispatch(session, cmd).await {
        Ok(flow) => flow,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {}", e);
            Flow::Continue
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let filter = match opts.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = opts.config();
    let service = HttpClusteringService::new(config.base_url.clone(), config.request_timeout)
        .context("Failed to set up the clustering backend client")?;
    info!(url = service.base_url(), "using backend");

    let sink: Box<dyn RenderSink> = match opts.output {
        Output::Ascii => Box::new(TerminalPlot::new(std::io::stdout())),
        Output::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
    };
    let mut session = Session::new(config, Arc::new(service), sink);

    match &opts.file {
        Some(file) => {
            let dataset = Dataset::from_tsv(file)?;
            println!("Loaded {} points from {}", dataset.len(), file);
            session.load(dataset);
        }
        None => session.generate(),
    }

    if let Some(script) = &opts.script {
        for line in script.split(';') {
            if let Flow::Quit = handle_line(&mut session, line).await {
                return Ok(());
            }
        }
        if session.is_running() {
            session.wait_auto_step().await;
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Flow::Quit = handle_line(&mut session, &line).await {
            break;
        }
    }
    session.stop_auto_step();
    Ok(())
}
