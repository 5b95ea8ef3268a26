use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use vatio::api::{PricesApi, reference_offset, today};
use vatio::cli::{self, Args};
use vatio::config::Config;
use vatio::coordinator::{CoordinatorHandle, RefreshCoordinator, RefreshState};
use vatio::display::{self, Severity};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(level) = args.log_level_override() {
        config.logging.level = level.to_string();
    }
    config.validate()?;
    vatio::logging::init_logging(&config.logging)?;

    info!("Vatio starting up");

    let api = PricesApi::from_config(&config.api)?;
    let initial_date = args.date.unwrap_or_else(today);
    let (coordinator, handle) = RefreshCoordinator::new(Arc::new(api), initial_date);
    let coordinator_task = tokio::spawn(coordinator.run());

    let result = if args.once {
        run_once(&handle, &config).await
    } else {
        run_interactive(&handle, &config).await
    };

    handle.shutdown();
    let _ = coordinator_task.await;
    result
}

/// Wait for the first completed refresh, render it, and exit
async fn run_once(handle: &CoordinatorHandle, config: &Config) -> Result<()> {
    let mut state_rx = handle.state();
    loop {
        let state = state_rx.borrow_and_update().clone();
        if state.generation > 0 && !state.loading {
            render(&state, config);
            return Ok(());
        }
        if state_rx.changed().await.is_err() {
            anyhow::bail!("coordinator stopped before publishing a result");
        }
    }
}

/// Re-render on every state change and take day selections from stdin
async fn run_interactive(handle: &CoordinatorHandle, config: &Config) -> Result<()> {
    let mut state_rx = handle.state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Enter a date (YYYY-MM-DD), \"today\", or \"quit\".");

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                render(&state, config);
            }
            line = lines.next_line() => {
                match line? {
                    Some(input) => {
                        if !handle_input(input.trim(), handle) {
                            break;
                        }
                    }
                    // stdin closed
                    None => break,
                }
            }
        }
    }

    Ok(())
}

/// Dispatch one line of user input; returns false to quit
fn handle_input(input: &str, handle: &CoordinatorHandle) -> bool {
    match input {
        "" => true,
        "q" | "quit" | "exit" => false,
        "t" | "today" => {
            handle.select_date(today());
            true
        }
        other => {
            match cli::parse_date(other) {
                Ok(date) => {
                    handle.select_date(date);
                }
                Err(e) => display::notify(Severity::Warning, &e),
            }
            true
        }
    }
}

fn render(state: &RefreshState, config: &Config) {
    if state.loading {
        println!("Fetching prices for {}...", state.selected_date);
        return;
    }
    let now = chrono::Utc::now().with_timezone(&reference_offset());
    print!("{}", display::render_day(state, &config.ui, now));
}
