#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sheet_pick::app::SheetPickApp;
use sheet_pick::config::resolve;
use sheet_pick::host::{Host, NullHost};
use sheet_pick::loader::load;
use sheet_pick::picker::Picker;

#[derive(Parser, Debug)]
#[command(name = "sheetpick")]
#[command(about = "Search and pick a value from a public spreadsheet")]
struct Args {
    /// Search query (CLI mode only).
    #[arg(default_value = "")]
    query: String,
    /// Fallback settings as a query string, e.g.
    /// "SpreadsheetId=...&SheetName=Sheet1&ValueColumn=A&LabelColumn=B".
    #[arg(long, default_value = "")]
    params: String,
    #[arg(long, default_value_t = false)]
    cli: bool,
}

fn run_cli(args: &Args) -> Result<()> {
    let host = NullHost;
    let config = resolve(&host.settings(), &args.params)?;
    let choices = load(&config).context("failed to load sheet")?;

    let query = args.query.trim();
    if query.is_empty() {
        for choice in &choices {
            println!("{}\t{}", choice.value, choice.label);
        }
        return Ok(());
    }

    let mut picker = Picker::new(config);
    picker.set_choices(choices, None);
    picker.query = query.to_string();
    picker.run_filter();
    for choice in picker.results() {
        println!("{}\t{}", choice.value, choice.label);
    }
    Ok(())
}

fn run_gui(args: &Args) -> Result<()> {
    let host = NullHost;
    let config = resolve(&host.settings(), &args.params)?;
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport =
        eframe::egui::ViewportBuilder::default().with_inner_size(eframe::egui::vec2(520.0, 420.0));

    eframe::run_native(
        "SheetPick",
        native_options,
        Box::new(move |_cc| Ok(Box::new(SheetPickApp::new(config, Box::new(NullHost))))),
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    if args.cli {
        run_cli(&args)
    } else {
        run_gui(&args)
    }
}
