use crate::input::Message;
use crate::session::{Flow, Session};
use anyhow::Result;
use crossterm::event;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::Duration;

pub fn run(mut session: Session) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut session, &mut terminal);
    teardown_terminal(&mut terminal)?;
    log::info!("session ended");
    result
}

fn event_loop(
    session: &mut Session,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, session))?;
        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let message = match event::read() {
            Ok(ev) => Message::from_event(ev),
            Err(err) => Some(Message::Failure(format!("reading terminal input: {}", err))),
        };
        if let Some(message) = message {
            if session.handle(message) == Flow::Quit {
                break;
            }
        }
    }
    Ok(())
}

fn draw(f: &mut ratatui::Frame<'_>, session: &Session) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(4)])
        .split(f.size());

    draw_board(f, session, layout[0]);
    draw_footer(f, session, layout[1]);
}

fn draw_board(f: &mut ratatui::Frame<'_>, session: &Session, area: Rect) {
    let theme = session.theme();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.background));
    let board = Paragraph::new(session.frame().to_styled(theme)).block(block);
    f.render_widget(board, area);
}

fn draw_footer(f: &mut ratatui::Frame<'_>, session: &Session, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(2)])
        .split(area);

    let help_bar = Paragraph::new(help_line(session))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(help_bar, rows[0]);

    let status = Paragraph::new(session.status().to_string())
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(status, rows[1]);
}

fn help_line(session: &Session) -> Line<'static> {
    let keys = session.input().keys();
    let pairs: Vec<(String, &str)> = if !session.input().is_composing() {
        vec![
            ("h/l".into(), "column"),
            ("j/k".into(), "card"),
            ("Enter".into(), "select"),
            (keys.compose.to_string(), "new card"),
            (keys.new_list.to_string(), "new list"),
            ("</>".into(), "move card"),
            (keys.remove_card.to_string(), "delete card"),
            (keys.remove_list.to_string(), "delete list"),
            (keys.quit.to_string(), "quit"),
        ]
    } else {
        vec![
            (keys.commit.to_string(), "save"),
            ("Backspace".into(), "erase"),
            ("Esc".into(), "cancel"),
        ]
    };
    let mut spans = Vec::new();
    for (i, (key, label)) in pairs.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(key, Style::default().fg(Color::LightCyan)));
        spans.push(Span::styled(
            format!(" {}", label),
            Style::default().fg(Color::Gray),
        ));
    }
    Line::from(spans)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
