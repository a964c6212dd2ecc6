// blockbot: block-based robot programming in the terminal

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use blockbot::blocks::BlockRegistry;
use blockbot::config::Settings;
use blockbot::controller::simulated::SharedSimState;
use blockbot::controller::{LinkController, SimulatedCar};
use blockbot::decoration::Locale;
use blockbot::editor::Editor;
use blockbot::interpreter::{RunEvent, RunSession, RunState};
use blockbot::ui::{App, BoxedController};

/// Block-based robot programming
#[derive(Parser)]
#[command(name = "blockbot", author, version, about)]
struct Cli {
    /// Program to open (`.json`, otherwise a text script)
    file: Option<PathBuf>,

    /// Settings file
    #[arg(short, long, default_value = "blockbot.toml")]
    config: PathBuf,

    /// Drive a robot bridge at HOST:PORT instead of the simulator
    #[arg(long, value_name = "HOST:PORT")]
    connect: Option<String>,

    /// Number format for block values (en, de)
    #[arg(short, long)]
    locale: Option<String>,

    /// Run the program without the TUI and print its trace
    #[arg(long)]
    run: bool,

    /// Log destination in TUI mode (RUST_LOG sets the level)
    #[arg(long, default_value = "blockbot.log")]
    log_file: PathBuf,
}

fn init_tracing(cli: &Cli) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // The TUI owns the terminal, so logs go to a file there.
    if cli.run {
        let _ = builder.with_writer(io::stderr).try_init();
    } else {
        let file = File::create(&cli.log_file)?;
        let _ = builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    }
    Ok(())
}

fn load_program(editor: &mut Editor, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    if path.extension().is_some_and(|ext| ext == "json") {
        editor.load_json(&text)?;
    } else {
        editor.load_script(&text)?;
    }
    Ok(())
}

fn build_controller(
    cli: &Cli,
    settings: &Settings,
) -> Result<(BoxedController, Option<SharedSimState>), Box<dyn std::error::Error>> {
    if let Some(addr) = &cli.connect {
        eprintln!("Connecting to {}...", addr);
        let link: BoxedController = Box::new(LinkController::tcp(addr.as_str())?);
        return Ok((link, None));
    }

    let layout = settings.layout()?;
    let car = SimulatedCar::new()
        .with_inputs(settings.sensors()?)
        .with_motors([layout.left, layout.right])
        .with_touch(settings.simulation.touch)
        .with_distance(settings.simulation.distance_cm)
        .with_light(settings.simulation.light_percent)
        .realtime(settings.simulation.realtime);
    let state = car.state();
    let car: BoxedController = Box::new(car);
    Ok((car, Some(state)))
}

/// Run headless, streaming the trace to stdout
fn run_headless(
    editor: &Editor,
    controller: BoxedController,
    settings: &Settings,
) -> Result<RunState, Box<dyn std::error::Error>> {
    let program = editor.program()?;
    let handle = RunSession::start(program, controller, settings.run_options()?)?;

    loop {
        let event = match handle.recv_timeout(Duration::from_millis(100)) {
            Some(event) => event,
            // Drain whatever arrived before the worker exited
            None if handle.is_finished() => match handle.try_recv() {
                Some(event) => event,
                None => break,
            },
            None => continue,
        };
        match event {
            RunEvent::Step(step) => println!("{}", step.describe()),
            RunEvent::Finished { state, error } => {
                if let Some(message) = error {
                    eprintln!("Run failed: {}", message);
                }
                println!("Run {}.", state.label());
                break;
            }
        }
    }

    let result = handle.join()?;
    Ok(result.state())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let settings = match Settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let locale = match &cli.locale {
        Some(code) => match Locale::from_code(code) {
            Some(locale) => locale,
            None => {
                eprintln!("Error: unknown locale '{}' (expected en or de)", code);
                std::process::exit(1);
            }
        },
        None => settings.locale()?,
    };

    let mut editor = Editor::new(BlockRegistry::standard())
        .with_locale(locale)
        .with_history_limit(settings.editor.history_limit);

    if let Some(path) = &cli.file {
        if path.exists() {
            if let Err(e) = load_program(&mut editor, path) {
                eprintln!("Error: cannot load '{}': {}", path.display(), e);
                std::process::exit(1);
            }
            eprintln!(
                "Loaded {} ({} blocks).",
                path.display(),
                editor.arrangement().len()
            );
        } else if cli.run {
            eprintln!("Error: File '{}' not found", path.display());
            std::process::exit(1);
        }
    } else if cli.run {
        eprintln!("Error: --run needs a program file");
        eprintln!("Usage: blockbot <program> --run");
        std::process::exit(1);
    }

    let (controller, sim) = match build_controller(&cli, &settings) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: cannot reach the robot: {}", e);
            std::process::exit(1);
        }
    };

    if cli.run {
        let state = run_headless(&editor, controller, &settings)?;
        if state == RunState::Failed {
            std::process::exit(2);
        }
        return Ok(());
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create and run app
    let mut app = App::new(
        editor,
        controller,
        sim,
        settings.run_options()?,
        cli.file.clone(),
    );
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
