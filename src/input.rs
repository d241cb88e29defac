use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A single key press, reduced to what the board reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Esc,
    Left,
    Right,
    Up,
    Down,
    Tab,
    /// Ctrl+C, ends the session from any mode.
    Interrupt,
    Other,
}

impl Key {
    pub fn from_event(key: KeyEvent) -> Key {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Key::Interrupt,
                _ => Key::Other,
            };
        }
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Esc => Key::Esc,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Tab => Key::Tab,
            _ => Key::Other,
        }
    }
}

/// Everything the event loop can hand to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Key(Key),
    Resize(u16, u16),
    Failure(String),
}

impl Message {
    /// Converts a terminal event; releases, repeats and mouse input are dropped.
    pub fn from_event(event: Event) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                Some(Message::Key(Key::from_event(key)))
            }
            Event::Resize(w, h) => Some(Message::Resize(w, h)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeTarget {
    Card,
    List,
}

impl ComposeTarget {
    pub fn prompt(&self) -> &'static str {
        match self {
            ComposeTarget::Card => "Add card: ",
            ComposeTarget::List => "Add list: ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Composing { target: ComposeTarget, draft: String },
}

/// Characters bound to browse commands and to the compose commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMap {
    pub compose: char,
    pub new_list: char,
    pub commit: char,
    pub quit: char,
    pub remove_card: char,
    pub remove_list: char,
}

impl Default for KeyMap {
    fn default() -> Self {
        KeyMap {
            compose: 'i',
            new_list: 'n',
            commit: '/',
            quit: 'q',
            remove_card: 'd',
            remove_list: 'X',
        }
    }
}

/// Fixed browse bindings that sit beside the configurable ones.
const NAVIGATION: [(char, &str); 6] = [
    ('h', "column left"),
    ('l', "column right"),
    ('k', "card up"),
    ('j', "card down"),
    ('<', "shift left"),
    ('>', "shift right"),
];

impl KeyMap {
    /// First browse key bound to two commands, with both command names.
    /// The commit key only acts while composing and is not checked.
    pub fn conflict(&self) -> Option<(char, &'static str, &'static str)> {
        let mut bound: Vec<(char, &'static str)> = vec![
            (self.compose, "compose"),
            (self.new_list, "new_list"),
            (self.quit, "quit"),
            (self.remove_card, "remove_card"),
            (self.remove_list, "remove_list"),
        ];
        bound.extend(NAVIGATION);
        for (i, &(key, first)) in bound.iter().enumerate() {
            if let Some(&(_, second)) = bound[i + 1..].iter().find(|(k, _)| *k == key) {
                return Some((key, first, second));
            }
        }
        None
    }
}

/// What the board should do in response to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    MoveCursor(isize),
    MoveCardCursor(isize),
    ToggleSelection,
    RemoveCard,
    ShiftCard(isize),
    RemoveList,
    /// The draft is complete; the controller stays composing until [`InputController::finish`].
    Commit(ComposeTarget, String),
}

pub struct InputController {
    mode: Mode,
    keys: KeyMap,
}

impl InputController {
    pub fn new(keys: KeyMap) -> Self {
        InputController {
            mode: Mode::Browse,
            keys,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    pub fn is_composing(&self) -> bool {
        matches!(self.mode, Mode::Composing { .. })
    }

    #[cfg(test)]
    pub fn draft(&self) -> Option<&str> {
        match &self.mode {
            Mode::Composing { draft, .. } => Some(draft),
            Mode::Browse => None,
        }
    }

    /// Drops the draft and returns to browsing.
    pub fn finish(&mut self) {
        self.mode = Mode::Browse;
    }

    pub fn interpret(&mut self, key: Key) -> Action {
        if key == Key::Interrupt {
            return Action::Quit;
        }
        match &mut self.mode {
            Mode::Browse => self.browse(key),
            Mode::Composing { target, draft } => {
                let target = *target;
                match key {
                    Key::Char(c) if c == self.keys.commit => {
                        if draft.is_empty() {
                            Action::None
                        } else {
                            Action::Commit(target, draft.clone())
                        }
                    }
                    Key::Backspace => {
                        draft.pop();
                        Action::None
                    }
                    Key::Esc => {
                        log::debug!("discarded draft {:?}", draft);
                        self.mode = Mode::Browse;
                        Action::None
                    }
                    Key::Char(c) => {
                        draft.push(c);
                        Action::None
                    }
                    _ => Action::None,
                }
            }
        }
    }

    fn browse(&mut self, key: Key) -> Action {
        let keys = self.keys;
        match key {
            Key::Char(c) if c == keys.quit => Action::Quit,
            Key::Char(c) if c == keys.compose => {
                self.start(ComposeTarget::Card);
                Action::None
            }
            Key::Char(c) if c == keys.new_list => {
                self.start(ComposeTarget::List);
                Action::None
            }
            Key::Char(c) if c == keys.remove_card => Action::RemoveCard,
            Key::Char(c) if c == keys.remove_list => Action::RemoveList,
            Key::Left | Key::Char('h') => Action::MoveCursor(-1),
            Key::Right | Key::Char('l') => Action::MoveCursor(1),
            Key::Up | Key::Char('k') => Action::MoveCardCursor(-1),
            Key::Down | Key::Char('j') => Action::MoveCardCursor(1),
            Key::Char('<') => Action::ShiftCard(-1),
            Key::Char('>') => Action::ShiftCard(1),
            Key::Enter => Action::ToggleSelection,
            _ => Action::None,
        }
    }

    fn start(&mut self, target: ComposeTarget) {
        self.mode = Mode::Composing {
            target,
            draft: String::new(),
        };
    }
}
