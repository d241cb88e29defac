//! Turns a board snapshot into a fixed-width, column-per-list frame.
//!
//! Layout is computed once into a [`BoardFrame`]; the frame can then be
//! flattened to plain text (for `show` and tests) or to styled ratatui text
//! for the terminal.

use crate::input::ComposeTarget;
use crate::model::Board;
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::symbols::border;
use ratatui::text::{Line, Span, Text};
use std::collections::HashMap;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const CURSOR_MARKER: &str = "> ";
pub const SELECTED_MARKER: &str = "* ";
pub const NO_BOARD: &str = "No board loaded";
pub const NO_LISTS: &str = "No lists yet. Press n to add one.";

const BANNER_PAD: usize = 2;

/// Colours and sizes for the board, built once from config and passed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub column_width: usize,
    pub background: Color,
    pub border: Color,
    pub banner_fg: Color,
    pub banner_bg: Color,
    pub list_fg: Color,
    pub list_bg: Color,
    pub card_fg: Color,
    pub card_bg: Color,
    pub focus_fg: Color,
    pub focus_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            column_width: 20,
            background: Color::Rgb(16, 18, 24),
            border: Color::DarkGray,
            banner_fg: Color::White,
            banner_bg: Color::Rgb(0, 123, 255),
            list_fg: Color::Rgb(32, 0, 0),
            list_bg: Color::Yellow,
            card_fg: Color::Black,
            card_bg: Color::White,
            focus_fg: Color::White,
            focus_bg: Color::Rgb(252, 150, 40),
        }
    }
}

impl Theme {
    fn banner_style(&self) -> Style {
        Style::default()
            .fg(self.banner_fg)
            .bg(self.banner_bg)
            .add_modifier(Modifier::BOLD)
    }

    fn style_for(&self, kind: CellKind) -> Style {
        match kind {
            CellKind::ListTitle { cursor, .. } => {
                let style = Style::default()
                    .fg(self.list_fg)
                    .bg(self.list_bg)
                    .add_modifier(Modifier::BOLD);
                if cursor {
                    style.add_modifier(Modifier::UNDERLINED)
                } else {
                    style
                }
            }
            CellKind::Card { focused: true } => Style::default()
                .fg(self.focus_fg)
                .bg(self.focus_bg)
                .add_modifier(Modifier::BOLD),
            CellKind::Card { focused: false } => Style::default().fg(self.card_fg).bg(self.card_bg),
            CellKind::Blank => Style::default().bg(self.background),
        }
    }
}

/// Read-only view of everything the frame depends on.
pub struct Snapshot<'a> {
    pub board: Option<&'a Board>,
    /// Card titles per column, parallel to `board.lists`.
    pub projection: &'a [Vec<String>],
    pub cursor: Option<usize>,
    pub card_cursor: Option<usize>,
    pub selection: &'a HashMap<usize, bool>,
    pub compose: Option<(ComposeTarget, &'a str)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    ListTitle { cursor: bool, selected: bool },
    Card { focused: bool },
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    /// Content before fitting to the column width.
    pub text: String,
}

impl Cell {
    fn blank() -> Self {
        Cell {
            kind: CellKind::Blank,
            text: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Placeholder(&'static str),
    /// Column-major, every column padded to the same height.
    Columns(Vec<Vec<Cell>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFrame {
    pub banner: Option<String>,
    pub banner_offset: usize,
    pub column_width: usize,
    pub body: Body,
    pub prompt: Option<String>,
}

/// Title line plus one line per card, for every column.
pub fn column_lines(snapshot: &Snapshot<'_>, board: &Board) -> Vec<Vec<Cell>> {
    board
        .lists
        .iter()
        .enumerate()
        .map(|(idx, list)| {
            let cursor = snapshot.cursor == Some(idx);
            let selected = snapshot.selection.get(&idx).copied().unwrap_or(false);
            let mut title = String::new();
            if cursor {
                title.push_str(CURSOR_MARKER);
            }
            if selected {
                title.push_str(SELECTED_MARKER);
            }
            title.push_str(&list.title);

            let mut lines = vec![Cell {
                kind: CellKind::ListTitle { cursor, selected },
                text: title,
            }];
            let cards = snapshot.projection.get(idx).map(Vec::as_slice).unwrap_or(&[]);
            lines.extend(cards.iter().enumerate().map(|(n, card)| Cell {
                kind: CellKind::Card {
                    focused: cursor && snapshot.card_cursor == Some(n),
                },
                text: card.clone(),
            }));
            lines
        })
        .collect()
}

pub fn max_height<T>(columns: &[Vec<T>]) -> usize {
    columns.iter().map(Vec::len).max().unwrap_or(0)
}

pub fn render(snapshot: &Snapshot<'_>, theme: &Theme) -> BoardFrame {
    let width = theme.column_width.max(1);
    let prompt = snapshot
        .compose
        .map(|(target, draft)| format!("{}{}", target.prompt(), draft));

    let Some(board) = snapshot.board else {
        return BoardFrame {
            banner: None,
            banner_offset: 0,
            column_width: width,
            body: Body::Placeholder(NO_BOARD),
            prompt,
        };
    };

    let banner = banner_text(&board.title);
    if board.lists.is_empty() {
        return BoardFrame {
            banner_offset: 0,
            banner: Some(banner),
            column_width: width,
            body: Body::Placeholder(NO_LISTS),
            prompt,
        };
    }

    let mut columns = column_lines(snapshot, board);
    let height = max_height(&columns);
    for column in &mut columns {
        column.resize_with(height, Cell::blank);
    }

    // left margin, then every column followed by a gap, minus the trailing gap
    let total = width * 2 * columns.len();
    let banner_offset = total.saturating_sub(banner.width()) / 2;
    BoardFrame {
        banner: Some(banner),
        banner_offset,
        column_width: width,
        body: Body::Columns(columns),
        prompt,
    }
}

fn banner_text(title: &str) -> String {
    let pad = " ".repeat(BANNER_PAD);
    format!("{pad}{title}{pad}")
}

/// Truncates to `width` cells (marking the cut with an ellipsis) and pads with spaces.
pub fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    if text.width() <= width {
        out.push_str(text);
    } else if width > 0 {
        let mut used = 0;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w + 1 > width {
                break;
            }
            out.push(ch);
            used += w;
        }
        out.push('…');
    }
    let fill = width.saturating_sub(out.width());
    out.push_str(&" ".repeat(fill));
    out
}

impl BoardFrame {
    #[cfg(test)]
    pub fn max_height(&self) -> usize {
        match &self.body {
            Body::Columns(columns) => max_height(columns),
            Body::Placeholder(_) => 0,
        }
    }

    /// Body rows, each the concatenation of every column's line at that height.
    pub fn rows(&self) -> Vec<String> {
        match &self.body {
            Body::Placeholder(message) => vec![message.to_string()],
            Body::Columns(columns) => (0..max_height(columns))
                .map(|row| {
                    let pad = " ".repeat(self.column_width);
                    let mut line = pad.clone();
                    for (i, column) in columns.iter().enumerate() {
                        if i > 0 {
                            line.push_str(&pad);
                        }
                        line.push_str(&fit(&column[row].text, self.column_width));
                    }
                    line.trim_end().to_string()
                })
                .collect(),
        }
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(banner) = &self.banner {
            lines.push(format!("{}{}", " ".repeat(self.banner_offset), banner));
            lines.push(String::new());
        }
        lines.extend(self.rows());
        if let Some(prompt) = &self.prompt {
            lines.push(String::new());
            lines.push(prompt.clone());
        }
        lines
    }

    /// Plain text inside a rounded border.
    pub fn to_text(&self) -> String {
        let set = border::ROUNDED;
        let lines = self.lines();
        let inner = lines.iter().map(|l| l.width()).max().unwrap_or(0);
        let mut out = String::new();
        out.push_str(set.top_left);
        out.push_str(&set.horizontal_top.repeat(inner));
        out.push_str(set.top_right);
        out.push('\n');
        for line in &lines {
            out.push_str(set.vertical_left);
            out.push_str(&fit(line, inner));
            out.push_str(set.vertical_right);
            out.push('\n');
        }
        out.push_str(set.bottom_left);
        out.push_str(&set.horizontal_bottom.repeat(inner));
        out.push_str(set.bottom_right);
        out.push('\n');
        out
    }

    /// Styled lines for the terminal; the caller draws the surrounding border.
    pub fn to_styled(&self, theme: &Theme) -> Text<'static> {
        let mut lines: Vec<Line<'static>> = Vec::new();
        if let Some(banner) = &self.banner {
            lines.push(Line::from(vec![
                Span::raw(" ".repeat(self.banner_offset)),
                Span::styled(banner.clone(), theme.banner_style()),
            ]));
            lines.push(Line::default());
        }
        match &self.body {
            Body::Placeholder(message) => {
                lines.push(Line::from(Span::styled(
                    message.to_string(),
                    Style::default().fg(Color::Gray),
                )));
            }
            Body::Columns(columns) => {
                let pad = " ".repeat(self.column_width);
                for row in 0..max_height(columns) {
                    let mut spans = vec![Span::raw(pad.clone())];
                    for (i, column) in columns.iter().enumerate() {
                        if i > 0 {
                            spans.push(Span::raw(pad.clone()));
                        }
                        let cell = &column[row];
                        let text = fit(&cell.text, self.column_width);
                        spans.push(Span::styled(text, theme.style_for(cell.kind)));
                    }
                    lines.push(Line::from(spans));
                    // breathing room between rows
                    lines.push(Line::default());
                }
            }
        }
        if let Some(prompt) = &self.prompt {
            lines.push(Line::from(Span::styled(
                prompt.clone(),
                Style::default()
                    .fg(theme.focus_bg)
                    .add_modifier(Modifier::BOLD),
            )));
        }
        Text::from(lines)
    }
}
