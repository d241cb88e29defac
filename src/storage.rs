use crate::model::{Board, Card, CardList};
use anyhow::Context;
use chrono::{Duration, NaiveDate};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("board not found: {0}")]
    BoardNotFound(String),
    #[error("{kind} not found: {id}")]
    Missing { kind: &'static str, id: String },
    #[error("card {card} has an invalid {field} date: {value:?}")]
    InvalidDate {
        card: String,
        field: &'static str,
        value: String,
    },
    #[error("card {card} has an out-of-range duration: {value}s")]
    InvalidDuration { card: String, value: i64 },
}

/// Persistence operations the board needs. Every call is synchronous.
pub trait Storage {
    /// Creates the tables if they are missing.
    fn create_schema(&self) -> Result<bool, StoreError>;
    fn board_exists(&self, board_id: &str) -> Result<bool, StoreError>;
    /// Inserts the board together with its lists and their cards.
    fn insert_board(&self, board: &Board) -> Result<(), StoreError>;
    fn insert_list(&self, list: &CardList, board_id: &str) -> Result<(), StoreError>;
    /// Appends the card at the end of the list `list_id`.
    fn insert_card(&self, card: &Card, list_id: &str) -> Result<(), StoreError>;
    /// Returns the full tree in persisted order.
    fn load_board(&self, board_id: &str) -> Result<Board, StoreError>;
    fn update_board_title(&self, board_id: &str, title: &str) -> Result<(), StoreError>;
    fn update_list_title(&self, list: &CardList) -> Result<(), StoreError>;
    fn update_card_fields(&self, card: &Card) -> Result<(), StoreError>;
    /// Deletes the list and every card in it.
    fn delete_list(&self, id: &str) -> Result<(), StoreError>;
    fn delete_card(&self, id: &str) -> Result<(), StoreError>;
    /// Reparents the card, placing it after the destination's last card.
    fn move_card(&self, card_id: &str, list_id: &str) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "on")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(SqliteStore { conn })
    }

    fn load_lists(&self, board: &mut Board) -> Result<(), StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT ID, Title FROM CardLists WHERE BoardID = ?1 ORDER BY Position, rowid")?;
        let rows = stmt.query_map([&board.id], |row| {
            Ok(CardList::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for list in rows {
            let mut list = list?;
            self.load_cards(&mut list)?;
            board.add_list(list);
        }
        Ok(())
    }

    fn load_cards(&self, list: &mut CardList) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT ID, Title, Description, StartDate, DueDate, EndDate, Duration
             FROM Cards WHERE ListID = ?1 ORDER BY Position, rowid",
        )?;
        let rows = stmt.query_map([&list.id], |row| {
            Ok(CardRow {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                start: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                due: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                end: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                duration: row.get::<_, Option<i64>>(6)?.unwrap_or_default(),
            })
        })?;
        for row in rows {
            list.add_card(row?.into_card()?);
        }
        Ok(())
    }

    fn insert_list_rows(
        conn: &Connection,
        list: &CardList,
        board_id: &str,
    ) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO CardLists (ID, Title, BoardID, Position)
             VALUES (?1, ?2, ?3,
                (SELECT COALESCE(MAX(Position), -1) + 1 FROM CardLists WHERE BoardID = ?3))",
            params![list.id, list.title, board_id],
        )?;
        for card in &list.cards {
            Self::insert_card_row(conn, card, &list.id)?;
        }
        Ok(())
    }

    fn insert_card_row(conn: &Connection, card: &Card, list_id: &str) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO Cards (ID, Title, Description, StartDate, DueDate, EndDate, Duration, ListID, Position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                (SELECT COALESCE(MAX(Position), -1) + 1 FROM Cards WHERE ListID = ?8))",
            params![
                card.id,
                card.title,
                card.description,
                format_date(card.start),
                format_date(card.due),
                format_date(card.end),
                card.duration.num_seconds(),
                list_id,
            ],
        )?;
        Ok(())
    }
}

fn expect_changed(changed: usize, kind: &'static str, id: &str) -> Result<(), StoreError> {
    if changed == 0 {
        return Err(StoreError::Missing {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

impl Storage for SqliteStore {
    fn create_schema(&self) -> Result<bool, StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS Boards (
                ID TEXT PRIMARY KEY,
                Title TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS CardLists (
                ID TEXT PRIMARY KEY,
                Title TEXT NOT NULL,
                BoardID TEXT NOT NULL,
                Position INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (BoardID) REFERENCES Boards(ID) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS Cards (
                ID TEXT PRIMARY KEY,
                Title TEXT NOT NULL,
                Description TEXT,
                StartDate TEXT,
                DueDate TEXT,
                EndDate TEXT,
                Duration INTEGER,
                ListID TEXT NOT NULL,
                Position INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (ListID) REFERENCES CardLists(ID) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS cardlists_board ON CardLists (BoardID, Position);
            CREATE INDEX IF NOT EXISTS cards_list ON Cards (ListID, Position);
            ",
        )?;
        log::info!("database schema ready");
        Ok(true)
    }

    fn board_exists(&self, board_id: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM Boards WHERE ID = ?1", [board_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_board(&self, board: &Board) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO Boards (ID, Title) VALUES (?1, ?2)",
            params![board.id, board.title],
        )?;
        for list in &board.lists {
            Self::insert_list_rows(&tx, list, &board.id)?;
        }
        tx.commit()?;
        log::debug!("inserted board {}", board.id);
        Ok(())
    }

    fn insert_list(&self, list: &CardList, board_id: &str) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        Self::insert_list_rows(&tx, list, board_id)?;
        tx.commit()?;
        log::debug!("inserted list {} into board {}", list.id, board_id);
        Ok(())
    }

    fn insert_card(&self, card: &Card, list_id: &str) -> Result<(), StoreError> {
        Self::insert_card_row(&self.conn, card, list_id)?;
        log::debug!("inserted card {} into list {}", card.id, list_id);
        Ok(())
    }

    fn load_board(&self, board_id: &str) -> Result<Board, StoreError> {
        let title: Option<String> = self
            .conn
            .query_row("SELECT Title FROM Boards WHERE ID = ?1", [board_id], |row| {
                row.get(0)
            })
            .optional()?;
        let title = title.ok_or_else(|| StoreError::BoardNotFound(board_id.to_string()))?;
        let mut board = Board::new(board_id, title);
        self.load_lists(&mut board)?;
        log::debug!(
            "loaded board {} ({} lists, {} cards)",
            board.id,
            board.lists.len(),
            board.card_count()
        );
        Ok(board)
    }

    fn update_board_title(&self, board_id: &str, title: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE Boards SET Title = ?1 WHERE ID = ?2",
            params![title, board_id],
        )?;
        expect_changed(changed, "board", board_id)
    }

    fn update_list_title(&self, list: &CardList) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE CardLists SET Title = ?1 WHERE ID = ?2",
            params![list.title, list.id],
        )?;
        expect_changed(changed, "list", &list.id)
    }

    fn update_card_fields(&self, card: &Card) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE Cards SET Title = ?1, Description = ?2, StartDate = ?3, DueDate = ?4,
                EndDate = ?5, Duration = ?6
             WHERE ID = ?7",
            params![
                card.title,
                card.description,
                format_date(card.start),
                format_date(card.due),
                format_date(card.end),
                card.duration.num_seconds(),
                card.id,
            ],
        )?;
        expect_changed(changed, "card", &card.id)
    }

    fn delete_list(&self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM CardLists WHERE ID = ?1", [id])?;
        expect_changed(changed, "list", id)?;
        log::debug!("deleted list {}", id);
        Ok(())
    }

    fn delete_card(&self, id: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute("DELETE FROM Cards WHERE ID = ?1", [id])?;
        expect_changed(changed, "card", id)?;
        log::debug!("deleted card {}", id);
        Ok(())
    }

    fn move_card(&self, card_id: &str, list_id: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE Cards SET ListID = ?1,
                Position = (SELECT COALESCE(MAX(Position), -1) + 1 FROM Cards WHERE ListID = ?1)
             WHERE ID = ?2",
            params![list_id, card_id],
        )?;
        expect_changed(changed, "card", card_id)?;
        log::debug!("moved card {} to list {}", card_id, list_id);
        Ok(())
    }
}

struct CardRow {
    id: String,
    title: String,
    description: String,
    start: String,
    due: String,
    end: String,
    duration: i64,
}

impl CardRow {
    fn into_card(self) -> Result<Card, StoreError> {
        let start = parse_date(&self.id, "start", &self.start)?;
        let due = parse_date(&self.id, "due", &self.due)?;
        let end = parse_date(&self.id, "end", &self.end)?;
        let duration =
            Duration::try_seconds(self.duration).ok_or_else(|| StoreError::InvalidDuration {
                card: self.id.clone(),
                value: self.duration,
            })?;
        Ok(Card {
            id: self.id,
            title: self.title,
            description: self.description,
            start,
            due,
            end,
            duration,
        })
    }
}

fn parse_date(card: &str, field: &'static str, value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| StoreError::InvalidDate {
        card: card.to_string(),
        field,
        value: value.to_string(),
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_user_date(input: &str) -> anyhow::Result<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .with_context(|| format!("invalid date (use YYYY-MM-DD): {}", trimmed))
}

/// Location of the database when neither the command line nor the config names one.
pub fn default_database_path() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "boardwalk").context("locating data directory")?;
    let dir = dirs.data_dir();
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    Ok(dir.join("boardwalk.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::generate_id;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn card(title: &str) -> Card {
        let mut c = Card::new(title, day(1));
        c.id = generate_id();
        c.description = format!("about {}", title);
        c.due = day(8);
        c.end = day(9);
        c.duration = Duration::days(7);
        c
    }

    fn seeded() -> (SqliteStore, Board) {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.create_schema().unwrap());
        let board = Board::new("default-board", "Sprint");
        store.insert_board(&board).unwrap();
        (store, board)
    }

    #[test]
    fn create_schema_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.create_schema().unwrap());
        assert!(store.create_schema().unwrap());
    }

    #[test]
    fn load_returns_lists_and_cards_in_persisted_order() {
        let (store, board) = seeded();
        let todo = CardList::new(generate_id(), "Todo");
        let done = CardList::new(generate_id(), "Done");
        store.insert_list(&todo, &board.id).unwrap();
        store.insert_list(&done, &board.id).unwrap();
        let first = card("first");
        let second = card("second");
        store.insert_card(&first, &todo.id).unwrap();
        store.insert_card(&second, &todo.id).unwrap();

        let loaded = store.load_board(&board.id).unwrap();
        assert_eq!(loaded.title, "Sprint");
        let titles: Vec<_> = loaded.lists.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, ["Todo", "Done"]);
        assert_eq!(loaded.lists[0].cards, vec![first, second]);
        assert!(loaded.lists[1].cards.is_empty());
    }

    #[test]
    fn insert_board_writes_nested_tree() {
        let store = SqliteStore::in_memory().unwrap();
        store.create_schema().unwrap();
        let mut board = Board::new("b", "Nested");
        let mut list = CardList::new("l", "Todo");
        list.add_card(card("one"));
        board.add_list(list);
        store.insert_board(&board).unwrap();
        assert_eq!(store.load_board("b").unwrap(), board);
        assert!(store.board_exists("b").unwrap());
        assert!(!store.board_exists("other").unwrap());
    }

    #[test]
    fn missing_board_is_reported() {
        let (store, _) = seeded();
        assert!(matches!(
            store.load_board("nope"),
            Err(StoreError::BoardNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn insert_card_into_unknown_list_fails() {
        let (store, _) = seeded();
        assert!(store.insert_card(&card("orphan"), "missing").is_err());
    }

    #[test]
    fn move_card_appends_to_destination() {
        let (store, board) = seeded();
        let a = CardList::new("a", "A");
        let b = CardList::new("b", "B");
        store.insert_list(&a, &board.id).unwrap();
        store.insert_list(&b, &board.id).unwrap();
        let existing = card("existing");
        let moving = card("moving");
        store.insert_card(&moving, "a").unwrap();
        store.insert_card(&existing, "b").unwrap();

        store.move_card(&moving.id, "b").unwrap();
        let loaded = store.load_board(&board.id).unwrap();
        assert!(loaded.lists[0].cards.is_empty());
        let ids: Vec<_> = loaded.lists[1].cards.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![existing.id, moving.id]);

        assert!(matches!(
            store.move_card("ghost", "b"),
            Err(StoreError::Missing { kind: "card", .. })
        ));
    }

    #[test]
    fn delete_list_cascades_to_cards() {
        let (store, board) = seeded();
        let list = CardList::new("l", "Todo");
        store.insert_list(&list, &board.id).unwrap();
        let c = card("doomed");
        store.insert_card(&c, "l").unwrap();

        store.delete_list("l").unwrap();
        assert!(store.load_board(&board.id).unwrap().lists.is_empty());
        assert!(store.delete_card(&c.id).is_err());
        assert!(store.delete_list("l").is_err());
    }

    #[test]
    fn updates_are_persisted() {
        let (store, board) = seeded();
        let mut list = CardList::new("l", "Todo");
        store.insert_list(&list, &board.id).unwrap();
        let mut c = card("draft");
        store.insert_card(&c, "l").unwrap();

        list.title = "Backlog".into();
        store.update_list_title(&list).unwrap();
        c.title = "final".into();
        c.duration = Duration::hours(3);
        store.update_card_fields(&c).unwrap();
        store.update_board_title(&board.id, "Release").unwrap();

        let loaded = store.load_board(&board.id).unwrap();
        assert_eq!(loaded.title, "Release");
        assert_eq!(loaded.lists[0].title, "Backlog");
        assert_eq!(loaded.lists[0].cards[0], c);
    }

    #[test]
    fn malformed_date_fails_the_load() {
        let (store, board) = seeded();
        store
            .insert_list(&CardList::new("l", "Todo"), &board.id)
            .unwrap();
        let c = card("bad");
        store.insert_card(&c, "l").unwrap();
        store
            .conn
            .execute("UPDATE Cards SET DueDate = 'soon' WHERE ID = ?1", [&c.id])
            .unwrap();

        match store.load_board(&board.id) {
            Err(StoreError::InvalidDate { field, value, .. }) => {
                assert_eq!(field, "due");
                assert_eq!(value, "soon");
            }
            other => panic!("expected invalid date, got {:?}", other),
        }
    }

    #[test]
    fn out_of_range_duration_fails_the_load() {
        let (store, board) = seeded();
        store
            .insert_list(&CardList::new("l", "Todo"), &board.id)
            .unwrap();
        let c = card("long");
        store.insert_card(&c, "l").unwrap();
        store
            .conn
            .execute(
                "UPDATE Cards SET Duration = ?1 WHERE ID = ?2",
                rusqlite::params![i64::MAX, &c.id],
            )
            .unwrap();

        match store.load_board(&board.id) {
            Err(StoreError::InvalidDuration { card, value }) => {
                assert_eq!(card, c.id);
                assert_eq!(value, i64::MAX);
            }
            other => panic!("expected invalid duration, got {:?}", other),
        }
    }

    #[test]
    fn on_disk_database_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("board.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_schema().unwrap();
            store.insert_board(&Board::new("b", "Kept")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_board("b").unwrap().title, "Kept");
    }

    #[test]
    fn user_dates_parse_iso_format() {
        assert_eq!(parse_user_date(" 2024-03-08 ").unwrap(), day(8));
        assert!(parse_user_date("08/03/2024").is_err());
    }
}
