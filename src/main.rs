use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use screenpilot::agent::{Agent, AutoApprove, Confirmer, StdinConfirmer};
use screenpilot::config::{load_config, AppConfig};
use screenpilot::errors::{ScreenPilotError, ScreenPilotResult};
use screenpilot::executor::input::{DisconnectedBackend, EnigoBackend, InputBackend};
use screenpilot::executor::{ActionExecutor, ExecutorConfig};
use screenpilot::perception::{
    capture_primary, default_screenshot_path, load_image_file, primary_screen_size, XcapSource,
};
use screenpilot::types::{ActionResult, AnalysisResult, ElementLocation, ScreenshotMeta};
use screenpilot::vision::OpenAiVisionProvider;

#[derive(Parser)]
#[command(name = "screenpilot", version, about = "Vision-driven UI automation agent")]
struct Cli {
    /// Validate and report actions without performing them.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Ask before every action.
    #[arg(long, global = true)]
    confirm: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Describe a screenshot and list its interactive elements.
    Analyze { image: PathBuf },
    /// Locate an element by description, on screen or in a file.
    Find {
        description: String,
        #[arg(short, long)]
        screenshot: Option<PathBuf>,
    },
    /// Click at coordinates.
    Click {
        x: i32,
        y: i32,
        #[arg(short, long, default_value = "left")]
        button: String,
    },
    /// Type text.
    Type { text: String },
    /// Scroll the screen.
    Scroll {
        direction: String,
        amount: Option<i32>,
    },
    /// Execute one natural-language instruction.
    Do { instruction: String },
    /// Execute several instructions in order, reporting every step.
    Run {
        steps: Vec<String>,
        /// Read instructions from a file, one per line.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Capture the primary monitor and save it as PNG.
    Screenshot {
        /// Output path; defaults to a timestamped name in the working directory.
        path: Option<PathBuf>,
    },
    /// Interactive instruction loop.
    Repl,
}

fn build_agent(cfg: &AppConfig) -> ScreenPilotResult<Agent> {
    let vision = Arc::new(OpenAiVisionProvider::new(cfg.vision.clone())?);

    let bounds = primary_screen_size().unwrap_or(ScreenshotMeta {
        width: cfg.screen.width,
        height: cfg.screen.height,
    });

    let backend: Box<dyn InputBackend> = if cfg.agent.dry_run {
        Box::new(DisconnectedBackend)
    } else {
        Box::new(EnigoBackend::new()?)
    };
    let executor = ActionExecutor::new(backend, ExecutorConfig::from_config(cfg, bounds));

    let confirmer: Arc<dyn Confirmer> = if cfg.agent.confirm_actions {
        Arc::new(StdinConfirmer)
    } else {
        Arc::new(AutoApprove)
    };

    Ok(Agent::new(
        vision,
        Arc::new(XcapSource),
        executor,
        confirmer,
        cfg.agent.clone(),
    ))
}

fn print_result(result: &ActionResult) {
    if result.success {
        println!("ok: {}", result.details);
    } else {
        let kind = result
            .error
            .as_ref()
            .map(|e| format!("{:?}", e.kind))
            .unwrap_or_default();
        println!("failed ({kind}): {}", result.details);
    }
}

fn print_analysis(result: &AnalysisResult) {
    println!("{}\n", result.description);
    if !result.elements.is_empty() {
        println!("Interactive elements:");
        for (i, el) in result.elements.iter().take(10).enumerate() {
            println!(
                "  {}. [{:?}] {} at ({}, {})",
                i + 1,
                el.element_type,
                el.description,
                el.x,
                el.y
            );
        }
    }
}

fn print_element(el: &ElementLocation) {
    println!("found: {}", el.description);
    println!("  type: {:?}", el.element_type);
    println!("  location: ({}, {})", el.x, el.y);
    println!("  confidence: {:.0}%", el.confidence * 100.0);
}

async fn run_steps(agent: &mut Agent, steps: Vec<String>) {
    // Ctrl-C cancels between steps; completed steps stay in the report.
    let cancel = agent.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let report = agent.automate(&steps).await;
    for step in &report.steps {
        let mark = if step.result.success { "ok" } else { "failed" };
        println!("step {} [{}]: {}", step.step_number, mark, step.result.details);
    }
    println!("{}", report.summary());
}

async fn repl(agent: &mut Agent) -> ScreenPilotResult<()> {
    println!("screenpilot interactive mode. Type an instruction, or 'quit' to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        use std::io::Write as _;
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line.to_ascii_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }
        if let Some(target) = line.strip_prefix("find ") {
            match agent.find_element(target, None).await {
                Ok(Some(el)) => print_element(&el),
                Ok(None) => println!("not found: {target}"),
                Err(e) => println!("error: {e}"),
            }
            continue;
        }
        let result = agent.do_command(line, None).await;
        print_result(&result);
    }
    Ok(())
}

async fn run(cli: Cli) -> ScreenPilotResult<()> {
    let mut cfg = load_config()?;
    if cli.dry_run {
        cfg.agent.dry_run = true;
    }
    if cli.confirm {
        cfg.agent.confirm_actions = true;
    }

    // Capture needs no vision credentials, so it runs without an agent.
    if let Command::Screenshot { path } = &cli.command {
        let path = path.clone().unwrap_or_else(default_screenshot_path);
        if cfg.agent.dry_run {
            println!("[dry run] would save screenshot to {}", path.display());
            return Ok(());
        }
        let shot = capture_primary().await?;
        std::fs::write(&path, &shot.image_bytes)?;
        println!(
            "saved: {} ({}x{})",
            path.display(),
            shot.image.meta.width,
            shot.image.meta.height
        );
        return Ok(());
    }

    let mut agent = build_agent(&cfg)?;

    match cli.command {
        Command::Analyze { image } => {
            let input = load_image_file(&image)?;
            let result = agent.analyze(&input).await?;
            print_analysis(&result);
        }
        Command::Find {
            description,
            screenshot,
        } => {
            let input = screenshot.map(|p| load_image_file(&p)).transpose()?;
            match agent.find_element(&description, input.as_ref()).await? {
                Some(el) => print_element(&el),
                None => println!("not found: {description}"),
            }
        }
        Command::Click { x, y, button } => {
            let verb = match button.as_str() {
                "left" => "click",
                "right" => "right click",
                "double" => "double click",
                other => {
                    return Err(ScreenPilotError::Config(format!(
                        "unknown button {other:?}, expected left/right/double"
                    )))
                }
            };
            let result = agent.do_command(&format!("{verb} {x}, {y}"), None).await;
            print_result(&result);
        }
        Command::Type { text } => {
            let result = agent.do_command(&format!("type {text}"), None).await;
            print_result(&result);
        }
        Command::Scroll { direction, amount } => {
            let instruction = match amount {
                Some(n) => format!("scroll {direction} {n}"),
                None => format!("scroll {direction}"),
            };
            let result = agent.do_command(&instruction, None).await;
            print_result(&result);
        }
        Command::Do { instruction } => {
            let result = agent.do_command(&instruction, None).await;
            print_result(&result);
        }
        Command::Run { steps, file } => {
            let steps = match file {
                Some(path) => std::fs::read_to_string(&path)?
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(str::to_string)
                    .collect(),
                None => steps,
            };
            if steps.is_empty() {
                return Err(ScreenPilotError::Config("no steps to run".into()));
            }
            run_steps(&mut agent, steps).await;
        }
        Command::Repl => repl(&mut agent).await?,
        // Handled before the agent was built.
        Command::Screenshot { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load .env if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "fatal");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
