use crate::board::{BoardError, BoardState};
use crate::config::{CardDefaults, Config, ConfigError};
use crate::input::{Action, ComposeTarget, InputController, Key, KeyMap, Message, Mode};
use crate::layout::{self, BoardFrame, Snapshot, Theme};
use crate::model::Board;
use crate::storage::{StoreError, Storage};
use chrono::{Local, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub keys: KeyMap,
    pub theme: Theme,
    pub cards: CardDefaults,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(SessionSettings {
            keys: config.keys.key_map(),
            theme: config.theme.theme()?,
            cards: config.cards.clone(),
        })
    }
}

/// Makes sure the tables and the board row exist before the board is loaded.
pub fn bootstrap(
    storage: &dyn Storage,
    board_id: &str,
    title: &str,
    first_run: bool,
) -> Result<(), StoreError> {
    if first_run {
        log::info!("first run, creating schema");
        storage.create_schema()?;
    }
    if !storage.board_exists(board_id)? {
        log::info!("creating board {} ({:?})", board_id, title);
        storage.insert_board(&Board::new(board_id, title))?;
    }
    Ok(())
}

/// One interactive session: the board, the key controller and the look of the frame.
pub struct Session {
    board: BoardState,
    input: InputController,
    theme: Theme,
    cards: CardDefaults,
    status: String,
}

impl Session {
    pub fn init(
        storage: Box<dyn Storage>,
        board_id: &str,
        settings: SessionSettings,
    ) -> Result<Self, StoreError> {
        let board = storage.load_board(board_id)?;
        log::info!(
            "session started on board {} with {} lists",
            board.id,
            board.lists.len()
        );
        let status = format!("Loaded {}", board.title);
        Ok(Session {
            board: BoardState::new(board, storage),
            input: InputController::new(settings.keys),
            theme: settings.theme,
            cards: settings.cards,
            status,
        })
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut BoardState {
        &mut self.board
    }

    pub fn input(&self) -> &InputController {
        &self.input
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn handle(&mut self, message: Message) -> Flow {
        match message {
            Message::Key(key) => self.handle_key(key),
            Message::Resize(w, h) => {
                log::debug!("terminal resized to {}x{}", w, h);
                Flow::Continue
            }
            Message::Failure(err) => {
                log::error!("{}", err);
                self.status = err;
                Flow::Continue
            }
        }
    }

    pub fn handle_key(&mut self, key: Key) -> Flow {
        self.handle_key_on(key, Local::now().date_naive())
    }

    fn handle_key_on(&mut self, key: Key, today: NaiveDate) -> Flow {
        let result = match self.input.interpret(key) {
            Action::None => Ok(()),
            Action::Quit => return Flow::Quit,
            Action::MoveCursor(delta) => {
                self.board.move_cursor(delta);
                Ok(())
            }
            Action::MoveCardCursor(delta) => {
                self.board.move_card_cursor(delta);
                Ok(())
            }
            Action::ToggleSelection => {
                if let Some(cursor) = self.board.cursor() {
                    self.board.toggle_selection(cursor);
                }
                Ok(())
            }
            Action::RemoveCard => self.remove_focused_card(),
            Action::ShiftCard(delta) => self.shift_focused_card(delta),
            Action::RemoveList => self.remove_cursor_list(),
            Action::Commit(target, title) => self.commit(target, &title, today),
        };
        if let Err(err) = result {
            self.status = format!("Error: {}", err);
        }
        Flow::Continue
    }

    fn commit(&mut self, target: ComposeTarget, title: &str, today: NaiveDate) -> Result<(), BoardError> {
        match target {
            ComposeTarget::Card => {
                let Some(cursor) = self.board.cursor() else {
                    self.input.finish();
                    return Err(BoardError::NoLists);
                };
                let card = self.cards.card(title, today);
                self.board.add_card_to_column(cursor, card)?;
                let last = self.board.projection()[cursor].len().saturating_sub(1);
                self.board.focus(cursor, last);
                self.status = format!("Added {:?}", title.trim());
            }
            ComposeTarget::List => {
                self.board.add_list(title)?;
                let last = self.board.board().lists.len() - 1;
                self.board.focus(last, 0);
                self.status = format!("Added list {:?}", title.trim());
            }
        }
        self.input.finish();
        Ok(())
    }

    fn remove_focused_card(&mut self) -> Result<(), BoardError> {
        let cursor = self.board.cursor().ok_or(BoardError::NoLists)?;
        if self.board.focused_card().is_none() {
            self.status = "No card to remove".into();
            return Ok(());
        }
        let card = self
            .board
            .remove_card_from_column(cursor, self.board.card_cursor())?;
        self.status = format!("Removed {:?}", card.title);
        Ok(())
    }

    fn shift_focused_card(&mut self, delta: isize) -> Result<(), BoardError> {
        let cursor = self.board.cursor().ok_or(BoardError::NoLists)?;
        if self.board.focused_card().is_none() {
            self.status = "No card to move".into();
            return Ok(());
        }
        let max = self.board.board().lists.len() as isize - 1;
        let target = (cursor as isize + delta).clamp(0, max) as usize;
        if target == cursor {
            return Ok(());
        }
        self.board
            .move_card(cursor, target, self.board.card_cursor())?;
        let last = self.board.projection()[target].len().saturating_sub(1);
        self.board.focus(target, last);
        self.status = format!("Moved to {}", self.board.board().lists[target].title);
        Ok(())
    }

    fn remove_cursor_list(&mut self) -> Result<(), BoardError> {
        let cursor = self.board.cursor().ok_or(BoardError::NoLists)?;
        let list = self.board.remove_list(cursor)?;
        self.status = format!("Removed list {:?}", list.title);
        Ok(())
    }

    pub fn frame(&self) -> BoardFrame {
        let compose = match self.input.mode() {
            Mode::Composing { target, draft } => Some((*target, draft.as_str())),
            Mode::Browse => None,
        };
        let snapshot = Snapshot {
            board: Some(self.board.board()),
            projection: self.board.projection(),
            cursor: self.board.cursor(),
            card_cursor: self.board.focused_card().map(|_| self.board.card_cursor()),
            selection: self.board.selection(),
            compose,
        };
        layout::render(&snapshot, &self.theme)
    }

    pub fn render(&self) -> String {
        self.frame().to_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use crate::test_support::{seeded_store, FailSwitch};
    use tempfile::TempDir;

    fn session(title: &str) -> (Session, FailSwitch) {
        let (store, switch) = seeded_store("default-board", title);
        let session =
            Session::init(Box::new(store), "default-board", SessionSettings::default()).unwrap();
        (session, switch)
    }

    fn type_text(session: &mut Session, text: &str) {
        for c in text.chars() {
            assert_eq!(session.handle_key(Key::Char(c)), Flow::Continue);
        }
    }

    fn add_list(session: &mut Session, title: &str) {
        session.handle_key(Key::Char('n'));
        type_text(session, title);
        session.handle_key(Key::Char('/'));
    }

    fn add_card(session: &mut Session, title: &str) {
        session.handle_key(Key::Char('i'));
        type_text(session, title);
        session.handle_key(Key::Char('/'));
    }

    #[test]
    fn sprint_board_renders_card_under_cursor_list() {
        let (mut session, _) = session("Sprint");
        add_list(&mut session, "Todo");
        add_card(&mut session, "Fix bug");

        assert_eq!(session.input().mode(), &Mode::Browse);
        let text = session.render();
        assert!(text.contains("Sprint"));
        assert!(text.contains("Fix bug"));
        assert!(text.contains("> Todo"));

        let saved = session
            .board()
            .storage()
            .load_board("default-board")
            .unwrap();
        assert_eq!(saved.lists[0].cards[0].title, "Fix bug");
    }

    #[test]
    fn escape_discards_typed_draft() {
        let (mut session, _) = session("Sprint");
        add_list(&mut session, "Todo");
        let before = session.board().board().clone();

        session.handle_key(Key::Char('i'));
        type_text(&mut session, "ABC");
        assert!(session.render().contains("Add card: ABC"));
        session.handle_key(Key::Esc);

        assert_eq!(session.input().mode(), &Mode::Browse);
        assert_eq!(session.board().board(), &before);
        assert!(!session.render().contains("ABC"));
    }

    #[test]
    fn empty_commit_keeps_composing() {
        let (mut session, _) = session("Sprint");
        add_list(&mut session, "Todo");
        let before = session.board().board().clone();
        session.handle_key(Key::Char('i'));
        session.handle_key(Key::Char('/'));
        assert!(session.input().is_composing());
        assert_eq!(session.board().board(), &before);
    }

    #[test]
    fn failed_commit_keeps_the_draft() {
        let (mut session, switch) = session("Sprint");
        add_list(&mut session, "Todo");
        switch.fail();
        add_card(&mut session, "Fix bug");
        assert_eq!(session.input().draft(), Some("Fix bug"));
        assert!(session.status().starts_with("Error"));
        assert!(session.board().board().lists[0].cards.is_empty());

        switch.heal();
        session.handle_key(Key::Char('/'));
        assert_eq!(session.input().mode(), &Mode::Browse);
        assert_eq!(session.board().projection()[0], ["Fix bug"]);
    }

    #[test]
    fn committed_card_gets_default_dates() {
        let (mut session, _) = session("Sprint");
        add_list(&mut session, "Todo");
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        session.handle_key_on(Key::Char('i'), today);
        for c in "Plan".chars() {
            session.handle_key_on(Key::Char(c), today);
        }
        session.handle_key_on(Key::Char('/'), today);
        let card = &session.board().board().lists[0].cards[0];
        assert_eq!(card.start, today);
        assert_eq!(card.due, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
    }

    #[test]
    fn card_commit_without_lists_reports_error() {
        let (mut session, _) = session("Sprint");
        add_card(&mut session, "Orphan");
        assert_eq!(session.input().mode(), &Mode::Browse);
        assert!(session.status().contains("no lists"));
        assert!(session.render().contains(layout::NO_LISTS));
    }

    #[test]
    fn browse_keys_move_and_remove_cards() {
        let (mut session, _) = session("Sprint");
        add_list(&mut session, "Todo");
        add_list(&mut session, "Done");
        session.handle_key(Key::Left);
        add_card(&mut session, "one");
        add_card(&mut session, "two");

        session.handle_key(Key::Up);
        session.handle_key(Key::Char('>'));
        assert_eq!(session.board().cursor(), Some(1));
        assert_eq!(session.board().projection()[0], ["two"]);
        assert_eq!(session.board().projection()[1], ["one"]);

        session.handle_key(Key::Char('d'));
        assert!(session.board().projection()[1].is_empty());
        session.handle_key(Key::Char('d'));
        assert_eq!(session.status(), "No card to remove");

        session.handle_key(Key::Enter);
        assert!(session.render().contains("> * Done"));

        session.handle_key(Key::Char('X'));
        assert_eq!(session.board().board().lists.len(), 1);
        assert_eq!(session.board().cursor(), Some(0));
        let saved = session
            .board()
            .storage()
            .load_board("default-board")
            .unwrap();
        assert_eq!(&saved, session.board().board());
    }

    #[test]
    fn quit_and_interrupt_end_the_session() {
        let (mut session, _) = session("Sprint");
        assert_eq!(session.handle_key(Key::Char('q')), Flow::Quit);
        session.handle_key(Key::Char('i'));
        assert_eq!(session.handle_key(Key::Char('q')), Flow::Continue);
        assert_eq!(session.handle(Message::Key(Key::Interrupt)), Flow::Quit);
    }

    #[test]
    fn failures_are_surfaced_in_status() {
        let (mut session, _) = session("Sprint");
        let flow = session.handle(Message::Failure("disk full".into()));
        assert_eq!(flow, Flow::Continue);
        assert_eq!(session.status(), "disk full");
        assert_eq!(session.handle(Message::Resize(10, 10)), Flow::Continue);
    }

    #[test]
    fn bootstrap_creates_schema_and_board_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("boardwalk.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            bootstrap(&store, "default-board", "Sprint", true).unwrap();
            bootstrap(&store, "default-board", "Ignored", false).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let session =
            Session::init(Box::new(store), "default-board", SessionSettings::default()).unwrap();
        assert!(session.render().contains("Sprint"));
    }

    #[test]
    fn init_fails_for_unknown_board() {
        let (store, _) = seeded_store("default-board", "Sprint");
        assert!(matches!(
            Session::init(Box::new(store), "other", SessionSettings::default()),
            Err(StoreError::BoardNotFound(_))
        ));
    }
}
