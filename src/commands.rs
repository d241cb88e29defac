use crate::cli::Cli;
use crate::config::Config;
use crate::model::Board;
use crate::session::{bootstrap, Session, SessionSettings};
use crate::storage::{default_database_path, parse_user_date, SqliteStore, Storage};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved locations and settings shared by every command.
pub struct Workspace {
    pub config: Config,
    pub db_path: PathBuf,
    pub board_id: String,
}

impl Workspace {
    pub fn resolve(args: &Cli, config: Config) -> Result<Self> {
        let db_path = match args.db.clone().or_else(|| config.database.clone()) {
            Some(path) => path,
            None => default_database_path()?,
        };
        let board_id = args.board.clone().unwrap_or_else(|| config.board_id.clone());
        Ok(Workspace {
            config,
            db_path,
            board_id,
        })
    }

    fn open_store(&self) -> Result<(SqliteStore, bool)> {
        let first_run = is_first_run(&self.db_path);
        let store = SqliteStore::open(&self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        Ok((store, first_run))
    }

    pub fn open_session(&self) -> Result<Session> {
        let (store, first_run) = self.open_store()?;
        bootstrap(&store, &self.board_id, &self.config.board_title, first_run)
            .context("preparing database")?;
        let settings = SessionSettings::from_config(&self.config)?;
        Session::init(Box::new(store), &self.board_id, settings)
            .with_context(|| format!("loading board {}", self.board_id))
    }
}

/// Converts a 1-based position from the command line to an index.
fn index_of(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow!("positions start at 1"))
}

fn list_title(session: &Session, index: usize) -> Result<String> {
    session
        .board()
        .board()
        .lists
        .get(index)
        .map(|l| l.title.clone())
        .ok_or_else(|| anyhow!("no list at position {}", index + 1))
}

fn is_first_run(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true)
}

pub fn init(ws: &Workspace, title: Option<String>) -> Result<()> {
    let (store, _) = ws.open_store()?;
    store.create_schema().context("creating schema")?;
    if store.board_exists(&ws.board_id)? {
        println!(
            "Board {} already exists in {}",
            ws.board_id,
            ws.db_path.display()
        );
        return Ok(());
    }
    let title = title.unwrap_or_else(|| ws.config.board_title.clone());
    store
        .insert_board(&Board::new(&ws.board_id, &title))
        .context("creating board")?;
    println!("Initialized board {} at {}", title, ws.db_path.display());
    Ok(())
}

pub fn show(ws: &Workspace) -> Result<()> {
    let session = ws.open_session()?;
    print!("{}", session.render());
    Ok(())
}

pub fn add_list(ws: &Workspace, title: String) -> Result<()> {
    let mut session = ws.open_session()?;
    let id = session
        .board_mut()
        .add_list(&title)
        .with_context(|| format!("adding list {:?}", title))?;
    println!("Added list {} ({})", title, id);
    Ok(())
}

pub fn add(
    ws: &Workspace,
    title: String,
    list: Option<usize>,
    description: Option<String>,
    due: Option<String>,
) -> Result<()> {
    let mut session = ws.open_session()?;
    let index = index_of(list.unwrap_or(1))?;
    let list_title = list_title(&session, index)?;

    let mut card = ws.config.cards.card(&title, Local::now().date_naive());
    if let Some(description) = description {
        card.description = description;
    }
    if let Some(raw) = due {
        let due = parse_user_date(&raw)?;
        card.due = due;
        card.end = due;
        card.duration = due - card.start;
    }
    let id = session
        .board_mut()
        .add_card_to_column(index, card)
        .with_context(|| format!("adding card to {}", list_title))?;
    println!("Added card {} to {}", id, list_title);
    Ok(())
}

pub fn edit(
    ws: &Workspace,
    list: usize,
    card: usize,
    title: Option<String>,
    description: Option<String>,
    due: Option<String>,
) -> Result<()> {
    let mut session = ws.open_session()?;
    let (index, card_index) = (index_of(list)?, index_of(card)?);
    let mut edited = session
        .board()
        .board()
        .lists
        .get(index)
        .and_then(|l| l.cards.get(card_index))
        .cloned()
        .ok_or_else(|| anyhow!("no card {} in list {}", card, list))?;
    if let Some(title) = title {
        edited.title = title.trim().to_string();
    }
    if let Some(description) = description {
        edited.description = description;
    }
    if let Some(raw) = due {
        let due = parse_user_date(&raw)?;
        edited.due = due;
        edited.end = due;
        edited.duration = due - edited.start;
    }
    let id = edited.id.clone();
    session
        .board_mut()
        .update_card(index, card_index, edited)
        .with_context(|| format!("updating card {}", id))?;
    println!("Updated card {}", id);
    Ok(())
}

pub fn move_card(ws: &Workspace, list: usize, card: usize, to: usize) -> Result<()> {
    let mut session = ws.open_session()?;
    let (from, card_index, dest) = (index_of(list)?, index_of(card)?, index_of(to)?);
    let dest_title = list_title(&session, dest)?;
    session
        .board_mut()
        .move_card(from, dest, card_index)
        .context("moving card")?;
    println!("Moved card to {}", dest_title);
    Ok(())
}

pub fn remove(ws: &Workspace, list: usize, card: usize) -> Result<()> {
    let mut session = ws.open_session()?;
    let removed = session
        .board_mut()
        .remove_card_from_column(index_of(list)?, index_of(card)?)
        .context("removing card")?;
    println!("Removed card {} ({})", removed.id, removed.title);
    Ok(())
}

pub fn rename_list(ws: &Workspace, list: usize, title: String) -> Result<()> {
    let mut session = ws.open_session()?;
    let index = index_of(list)?;
    let old = list_title(&session, index)?;
    session
        .board_mut()
        .rename_list(index, &title)
        .context("renaming list")?;
    println!("Renamed list {} to {}", old, title);
    Ok(())
}

pub fn rename(ws: &Workspace, title: String) -> Result<()> {
    let mut session = ws.open_session()?;
    session
        .board_mut()
        .rename_board(&title)
        .context("renaming board")?;
    println!("Renamed board {} to {}", ws.board_id, title);
    Ok(())
}

pub fn tui(ws: &Workspace) -> Result<()> {
    let session = ws.open_session()?;
    ui::run(session)
}
