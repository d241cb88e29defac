use crate::model::{generate_id, Board, Card, CardId, CardList, ListId};
use crate::storage::{StoreError, Storage};
use std::collections::HashMap;

#[derive(thiserror::Error, Debug)]
pub enum BoardError {
    #[error("board has no lists")]
    NoLists,
    #[error("no list at column {0}")]
    ColumnOutOfRange(usize),
    #[error("no card {card} in column {column}")]
    CardOutOfRange { column: usize, card: usize },
    #[error("title must not be empty")]
    EmptyTitle,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// The loaded board plus everything the screen needs to know about it.
///
/// Every structural change is written to storage first and applied in memory
/// only once the write succeeds, so a failed write leaves the tree untouched.
pub struct BoardState {
    board: Board,
    storage: Box<dyn Storage>,
    cursor: Option<usize>,
    card_cursor: usize,
    selected: HashMap<usize, bool>,
    columns: Vec<Vec<String>>,
}

impl BoardState {
    pub fn new(board: Board, storage: Box<dyn Storage>) -> Self {
        let columns = board
            .lists
            .iter()
            .map(|l| l.cards.iter().map(|c| c.title.clone()).collect())
            .collect();
        let cursor = if board.lists.is_empty() { None } else { Some(0) };
        BoardState {
            board,
            storage,
            cursor,
            card_cursor: 0,
            selected: HashMap::new(),
            columns,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    #[cfg(test)]
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Focused column, `None` only when the board has no lists.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn card_cursor(&self) -> usize {
        self.card_cursor
    }

    #[cfg(test)]
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(&index).copied().unwrap_or(false)
    }

    pub fn selection(&self) -> &HashMap<usize, bool> {
        &self.selected
    }

    /// Card titles per column, kept in step with the board's lists.
    pub fn projection(&self) -> &[Vec<String>] {
        &self.columns
    }

    pub fn focused_card(&self) -> Option<&Card> {
        let list = self.board.lists.get(self.cursor?)?;
        list.cards.get(self.card_cursor)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let Some(current) = self.cursor else {
            return;
        };
        let max = self.board.lists.len() as isize - 1;
        let target = (current as isize).saturating_add(delta).clamp(0, max) as usize;
        if target != current {
            self.cursor = Some(target);
            self.card_cursor = 0;
        }
    }

    pub fn move_card_cursor(&mut self, delta: isize) {
        let len = self.cursor_column_len();
        if len == 0 {
            self.card_cursor = 0;
            return;
        }
        let max = len as isize - 1;
        self.card_cursor = (self.card_cursor as isize)
            .saturating_add(delta)
            .clamp(0, max) as usize;
    }

    /// Puts the cursor on `column` and the card focus on `card`, both clamped.
    pub fn focus(&mut self, column: usize, card: usize) {
        if self.board.lists.is_empty() {
            self.cursor = None;
            self.card_cursor = 0;
            return;
        }
        self.cursor = Some(column.min(self.board.lists.len() - 1));
        self.card_cursor = card;
        self.clamp_card_cursor();
    }

    pub fn toggle_selection(&mut self, index: usize) {
        let flag = self.selected.entry(index).or_insert(false);
        *flag = !*flag;
    }

    pub fn add_card_to_column(&mut self, index: usize, mut card: Card) -> Result<CardId, BoardError> {
        card.title = trimmed_title(&card.title)?;
        let list_id = self.list_id(index)?;
        card.id = generate_id();
        self.commit(
            format!("insert card {:?} into list {}", card.title, list_id),
            self.storage.insert_card(&card, &list_id),
        )?;
        let id = card.id.clone();
        let title = card.title.clone();
        self.place_card(index, &list_id, card)?;
        self.columns[index].push(title);
        log::info!("added card {} to column {}", id, index);
        Ok(id)
    }

    pub fn remove_card_from_column(
        &mut self,
        index: usize,
        card_index: usize,
    ) -> Result<Card, BoardError> {
        let card_id = self.card_id(index, card_index)?;
        self.commit(
            format!("delete card {}", card_id),
            self.storage.delete_card(&card_id),
        )?;
        let card = self.take_card(index, card_index, &card_id)?;
        self.columns[index].remove(card_index);
        self.clamp_card_cursor();
        log::info!("removed card {} from column {}", card.id, index);
        Ok(card)
    }

    /// Moves a card to the end of another column, keeping its id and content.
    pub fn move_card(
        &mut self,
        from: usize,
        to: usize,
        card_index: usize,
    ) -> Result<(), BoardError> {
        let card_id = self.card_id(from, card_index)?;
        let dest_id = self.list_id(to)?;
        if from == to {
            return Ok(());
        }
        self.commit(
            format!("move card {} to list {}", card_id, dest_id),
            self.storage.move_card(&card_id, &dest_id),
        )?;
        let card = self.take_card(from, card_index, &card_id)?;
        self.place_card(to, &dest_id, card)?;
        let title = self.columns[from].remove(card_index);
        self.columns[to].push(title);
        self.clamp_card_cursor();
        log::info!("moved card {} from column {} to {}", card_id, from, to);
        Ok(())
    }

    pub fn update_card(
        &mut self,
        index: usize,
        card_index: usize,
        mut card: Card,
    ) -> Result<(), BoardError> {
        card.title = trimmed_title(&card.title)?;
        card.id = self.card_id(index, card_index)?;
        let list_id = self.list_id(index)?;
        if self.board.find_card(&list_id, &card.id) == Some(&card) {
            return Ok(());
        }
        self.commit(
            format!("update card {}", card.id),
            self.storage.update_card_fields(&card),
        )?;
        self.columns[index][card_index] = card.title.clone();
        self.board.update_card(card);
        Ok(())
    }

    pub fn add_list(&mut self, title: &str) -> Result<ListId, BoardError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        let list = CardList::new(generate_id(), title);
        self.commit(
            format!("insert list {:?}", title),
            self.storage.insert_list(&list, &self.board.id),
        )?;
        let id = list.id.clone();
        self.board.add_list(list);
        self.columns.push(Vec::new());
        if self.cursor.is_none() {
            self.cursor = Some(0);
            self.card_cursor = 0;
        }
        log::info!("added list {} at column {}", id, self.board.lists.len() - 1);
        Ok(id)
    }

    pub fn remove_list(&mut self, index: usize) -> Result<CardList, BoardError> {
        let list_id = self.list_id(index)?;
        self.commit(
            format!("delete list {}", list_id),
            self.storage.delete_list(&list_id),
        )?;
        let list = self
            .board
            .remove_list(&list_id)
            .ok_or(BoardError::ColumnOutOfRange(index))?;
        self.columns.remove(index);
        self.selected = self
            .selected
            .drain()
            .filter(|(i, _)| *i != index)
            .map(|(i, flag)| if i > index { (i - 1, flag) } else { (i, flag) })
            .collect();
        self.cursor = match self.cursor {
            _ if self.board.lists.is_empty() => None,
            Some(c) if c > index => Some(c - 1),
            Some(c) => Some(c.min(self.board.lists.len() - 1)),
            None => None,
        };
        self.clamp_card_cursor();
        log::info!("removed list {} ({} cards)", list.id, list.cards.len());
        Ok(list)
    }

    pub fn rename_list(&mut self, index: usize, title: &str) -> Result<(), BoardError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        let list_id = self.list_id(index)?;
        let mut list = self
            .board
            .find_list(&list_id)
            .cloned()
            .ok_or(BoardError::ColumnOutOfRange(index))?;
        list.title = title.to_string();
        self.commit(
            format!("rename list {}", list.id),
            self.storage.update_list_title(&list),
        )?;
        self.board.update_list(list);
        Ok(())
    }

    pub fn rename_board(&mut self, title: &str) -> Result<(), BoardError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        self.commit(
            format!("rename board {}", self.board.id),
            self.storage.update_board_title(&self.board.id, title),
        )?;
        self.board.title = title.to_string();
        Ok(())
    }

    fn commit(&self, what: String, result: Result<(), StoreError>) -> Result<(), BoardError> {
        result.map_err(|err| {
            log::error!("failed to {}: {}", what, err);
            BoardError::Storage(err)
        })
    }

    fn list_id(&self, index: usize) -> Result<ListId, BoardError> {
        if self.board.lists.is_empty() {
            return Err(BoardError::NoLists);
        }
        self.board
            .lists
            .get(index)
            .map(|l| l.id.clone())
            .ok_or(BoardError::ColumnOutOfRange(index))
    }

    fn card_id(&self, index: usize, card_index: usize) -> Result<CardId, BoardError> {
        self.list_id(index)?;
        self.board.lists[index]
            .cards
            .get(card_index)
            .map(|c| c.id.clone())
            .ok_or(BoardError::CardOutOfRange {
                column: index,
                card: card_index,
            })
    }

    fn take_card(
        &mut self,
        index: usize,
        card_index: usize,
        card_id: &str,
    ) -> Result<Card, BoardError> {
        let list_id = self.list_id(index)?;
        self.board
            .remove_card(&list_id, card_id)
            .ok_or(BoardError::CardOutOfRange {
                column: index,
                card: card_index,
            })
    }

    fn place_card(&mut self, index: usize, list_id: &str, card: Card) -> Result<(), BoardError> {
        self.board
            .add_card(list_id, card)
            .map_err(|_| BoardError::ColumnOutOfRange(index))
    }

    fn cursor_column_len(&self) -> usize {
        self.cursor
            .and_then(|c| self.board.lists.get(c))
            .map(|l| l.cards.len())
            .unwrap_or(0)
    }

    fn clamp_card_cursor(&mut self) {
        self.card_cursor = self
            .card_cursor
            .min(self.cursor_column_len().saturating_sub(1));
    }
}

fn trimmed_title(title: &str) -> Result<String, BoardError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BoardError::EmptyTitle);
    }
    Ok(title.to_string())
}
