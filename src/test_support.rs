//! Test helpers shared across modules. Only compiled for tests.

use crate::model::{Board, Card, CardList};
use crate::storage::{SqliteStore, StoreError, Storage};
use std::cell::Cell;
use std::rc::Rc;

/// Flips a [`FlakyStore`] between healthy and failing after it has been boxed.
#[derive(Clone, Default)]
pub struct FailSwitch(Rc<Cell<bool>>);

impl FailSwitch {
    pub fn fail(&self) {
        self.0.set(true);
    }

    pub fn heal(&self) {
        self.0.set(false);
    }

    fn failing(&self) -> bool {
        self.0.get()
    }
}

/// In-memory SQLite store whose writes can be made to fail on demand.
pub struct FlakyStore {
    inner: SqliteStore,
    switch: FailSwitch,
}

impl FlakyStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.switch.failing() {
            return Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        Ok(())
    }
}

impl Storage for FlakyStore {
    fn create_schema(&self) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.create_schema()
    }

    fn board_exists(&self, board_id: &str) -> Result<bool, StoreError> {
        self.inner.board_exists(board_id)
    }

    fn insert_board(&self, board: &Board) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert_board(board)
    }

    fn insert_list(&self, list: &CardList, board_id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert_list(list, board_id)
    }

    fn insert_card(&self, card: &Card, list_id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert_card(card, list_id)
    }

    fn load_board(&self, board_id: &str) -> Result<Board, StoreError> {
        self.inner.load_board(board_id)
    }

    fn update_board_title(&self, board_id: &str, title: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.update_board_title(board_id, title)
    }

    fn update_list_title(&self, list: &CardList) -> Result<(), StoreError> {
        self.check()?;
        self.inner.update_list_title(list)
    }

    fn update_card_fields(&self, card: &Card) -> Result<(), StoreError> {
        self.check()?;
        self.inner.update_card_fields(card)
    }

    fn delete_list(&self, id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete_list(id)
    }

    fn delete_card(&self, id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete_card(id)
    }

    fn move_card(&self, card_id: &str, list_id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.move_card(card_id, list_id)
    }
}

/// Schema plus an empty board named `title` under `board_id`.
pub fn seeded_store(board_id: &str, title: &str) -> (FlakyStore, FailSwitch) {
    let inner = SqliteStore::in_memory().expect("in-memory database");
    inner.create_schema().expect("schema");
    inner
        .insert_board(&Board::new(board_id, title))
        .expect("seed board");
    let switch = FailSwitch::default();
    (
        FlakyStore {
            inner,
            switch: switch.clone(),
        },
        switch,
    )
}
