mod config;
mod display;
mod editor;
mod error;
mod form;
mod grid;
mod parser;
mod web;

use std::fs::File;
use std::io::BufReader;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::EditorConfig;
use display::{conflict_report, print_timetable};
use editor::TimetableEditor;
use grid::{period_times, Command};
use parser::PageInputs;

fn usage() {
    println!("Usage:");
    println!("  timetable-editor web [port]");
    println!("  timetable-editor check <page.json> [commands.json]");
}

fn check(config: &EditorConfig, page_path: &str, commands_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading timetable page from {}...", page_path);
    let inputs: PageInputs = serde_json::from_reader(BufReader::new(File::open(page_path)?))?;
    let mut editor = TimetableEditor::from_page(&inputs, &config.days, config.periods_per_day)?;

    if let Some(path) = commands_path {
        let commands: Vec<Command> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let outcomes = editor.apply_all(commands)?;
        let applied = outcomes.iter().filter(|o| o.is_applied()).count();
        println!("Applied {} of {} commands", applied, outcomes.len());
    }

    let times = period_times(&config.day_start, editor.grid().periods_per_day(), config.lunch_after);
    print_timetable(editor.grid(), &times);

    println!("\n=== Conflicts ===");
    for line in conflict_report(&editor.conflicts(), editor.grid().days()) {
        println!("{}", line);
    }

    println!("\n=== timetable_data ===");
    println!("{}", editor.timetable_data());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timetable_editor=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = EditorConfig::from_env()?;
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("web") => {
            if let Some(port) = args.get(2) {
                config.port = port.parse()?;
            }
            println!("Access the editor at http://localhost:{}", config.port);
            web::start_server(config).await?;
        }
        Some("check") => match args.get(2) {
            Some(page) => check(&config, page, args.get(3).map(String::as_str))?,
            None => usage(),
        },
        _ => usage(),
    }

    Ok(())
}
