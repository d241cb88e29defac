mod board;
mod cli;
mod commands;
mod config;
mod input;
mod layout;
mod model;
mod session;
mod storage;
#[cfg(test)]
mod test_support;
mod ui;

use anyhow::Result;
use clap::Parser;
use config::Config;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::{self, OpenOptions};

fn main() {
    let args = cli::Cli::parse();
    let config = Config::load(args.config.as_deref());
    init_logging(config.as_ref().ok());

    let result = config
        .map_err(anyhow::Error::from)
        .and_then(|config| run(args, config));
    if let Err(err) = result {
        log::error!("fatal: {:#}", err);
        eprintln!("boardwalk: {:#}", err);
        std::process::exit(1);
    }
}

fn run(args: cli::Cli, config: Config) -> Result<()> {
    let ws = commands::Workspace::resolve(&args, config)?;
    log::info!(
        "using database {} (board {})",
        ws.db_path.display(),
        ws.board_id
    );
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init { title } => commands::init(&ws, title),
        cli::Command::Show => commands::show(&ws),
        cli::Command::AddList { title } => commands::add_list(&ws, title),
        cli::Command::Add {
            title,
            list,
            description,
            due,
        } => commands::add(&ws, title, list, description, due),
        cli::Command::Edit {
            list,
            card,
            title,
            description,
            due,
        } => commands::edit(&ws, list, card, title, description, due),
        cli::Command::Move { list, card, to } => commands::move_card(&ws, list, card, to),
        cli::Command::Remove { list, card } => commands::remove(&ws, list, card),
        cli::Command::Rename { title } => commands::rename(&ws, title),
        cli::Command::RenameList { list, title } => commands::rename_list(&ws, list, title),
        cli::Command::Tui => commands::tui(&ws),
    }
}

/// Logs go to a file; the terminal belongs to the board while it runs.
fn init_logging(settings: Option<&Config>) {
    let level = settings
        .and_then(|c| c.log_level().ok())
        .unwrap_or(LevelFilter::Info);
    let path = match settings
        .and_then(|c| c.log_file.clone())
        .or_else(config::default_log_path)
    {
        Some(path) => path,
        None => return,
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = WriteLogger::init(level, log_config, file);
    }
}
