use anyhow::{anyhow, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::cmp::Ordering;
use std::io::stdout;

use crate::commands::{App, Command};
use crate::error::AppError;
use crate::models::{Employee, EmployeeForm, COLUMN_HEADINGS, FORM_LABELS};
use crate::session::Session;

const FORM_FIELDS: usize = 8;

const ABOUT: &str = "Employee Data Manager v1.0";

const HELP: &str = "To use this application: \
    1. Add, update, or delete employee records. Press Enter on a grid row to copy it into the form. \
    2. Use 'Reveal Sensitive Data' (F6) to view salary information; hiding it again needs no login. \
    3. Use 'Toggle Theme' (F7) to switch between light and dark themes. \
    Keys: Tab/Shift-Tab focus, F2 add, F3 update, F4 delete, / search, F5 clear search, \
    F8 sort column, Esc leave field, F10 exit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Form(usize),
    Search,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginPurpose {
    Startup,
    Reveal,
}

enum Modal {
    Login {
        purpose: LoginPurpose,
        username: String,
        password: String,
        on_password: bool,
        error: Option<String>,
    },
    ConfirmDelete(i64),
    Message {
        title: String,
        body: String,
    },
    Help,
}

impl Modal {
    fn login(purpose: LoginPurpose) -> Self {
        Modal::Login {
            purpose,
            username: String::new(),
            password: String::new(),
            on_password: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Light,
    Dark,
}

struct Palette {
    fg: Color,
    bg: Color,
    accent: Color,
    highlight: Color,
    muted: Color,
}

impl Theme {
    fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                highlight: Color::Gray,
                muted: Color::DarkGray,
            },
            Theme::Dark => Palette {
                fg: Color::White,
                bg: Color::Black,
                accent: Color::Cyan,
                highlight: Color::DarkGray,
                muted: Color::Gray,
            },
        }
    }
}

struct AppState {
    session: Session,
    rows: Vec<Employee>,
    table: TableState,
    form: EmployeeForm,
    search: String,
    focus: Focus,
    modal: Option<Modal>,
    theme: Theme,
    sort_column: Option<usize>,
    quit: bool,
    fatal: Option<AppError>,
}

impl AppState {
    fn new() -> Self {
        Self {
            session: Session::new(),
            rows: Vec::new(),
            table: TableState::default(),
            form: EmployeeForm::default(),
            search: String::new(),
            focus: Focus::Form(0),
            modal: Some(Modal::login(LoginPurpose::Startup)),
            theme: Theme::Light,
            sort_column: None,
            quit: false,
            fatal: None,
        }
    }

    fn selected_id(&self) -> Option<i64> {
        self.table
            .selected()
            .and_then(|i| self.rows.get(i))
            .map(|row| row.id)
    }

    fn set_rows(&mut self, rows: Vec<Employee>) {
        self.rows = rows;
        self.table.select(None);
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        if let Some(column) = self.sort_column {
            sort_rows(&mut self.rows, column);
        }
    }

    fn cycle_sort(&mut self) {
        self.sort_column = match self.sort_column {
            None => Some(0),
            Some(c) if c + 1 < COLUMN_HEADINGS.len() => Some(c + 1),
            Some(_) => None,
        };
        self.apply_sort();
        self.table.select(None);
    }

    fn next_row(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let next = match self.table.selected() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.table.select(Some(next));
    }

    fn prev_row(&mut self) {
        if let Some(i) = self.table.selected() {
            self.table.select(Some(i.saturating_sub(1)));
        }
    }

    /// Copy the selected grid row into the form exactly as displayed.
    fn bind_selected(&mut self) {
        if let Some(row) = self.table.selected().and_then(|i| self.rows.get(i)) {
            self.form = EmployeeForm::from_row(row);
        }
    }

    fn next_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Form(i) if i + 1 < FORM_FIELDS => Focus::Form(i + 1),
            Focus::Form(_) => Focus::Search,
            Focus::Search => Focus::Grid,
            Focus::Grid => Focus::Form(0),
        };
    }

    fn prev_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Form(0) => Focus::Grid,
            Focus::Form(i) => Focus::Form(i - 1),
            Focus::Search => Focus::Form(FORM_FIELDS - 1),
            Focus::Grid => Focus::Search,
        };
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Form(i) => self.form.field_mut(i),
            Focus::Search => Some(&mut self.search),
            Focus::Grid => None,
        }
    }

    fn dispatch(&mut self, app: &App, command: Command) {
        match app.execute(&mut self.session, command) {
            Ok(outcome) => {
                if let Some(rows) = outcome.rows {
                    self.set_rows(rows);
                }
                if let Some(body) = outcome.message {
                    self.modal = Some(Modal::Message {
                        title: "Success".to_string(),
                        body,
                    });
                }
            }
            Err(e) => self.show_error(&e),
        }
    }

    fn show_error(&mut self, err: &AppError) {
        self.modal = Some(Modal::Message {
            title: err.title().to_string(),
            body: err.to_string(),
        });
    }
}

/// Order rows by one grid column; numeric columns compare numerically and
/// masked cells sort last.
fn sort_rows(rows: &mut [Employee], column: usize) {
    rows.sort_by(|a, b| match column {
        0 => a.id.cmp(&b.id),
        6 => a.typical_hours.cmp(&b.typical_hours),
        7 => cmp_amount(a.annual_salary.amount(), b.annual_salary.amount()),
        8 => cmp_amount(a.hourly_rate.amount(), b.hourly_rate.amount()),
        c => a.cells()[c].cmp(&b.cells()[c]),
    });
}

fn cmp_amount(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn run_browse(app: &App) -> Result<()> {
    let mut state = AppState::new();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, app);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result?;
    match state.fatal {
        Some(err) => Err(anyhow!("{}: {}", err.title(), err)),
        None => Ok(()),
    }
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    app: &App,
) -> Result<()> {
    while !state.quit {
        terminal.draw(|frame| draw(frame, state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if state.modal.is_some() {
                handle_modal_key(state, app, key);
            } else {
                handle_main_key(state, app, key);
            }
        }
    }
    Ok(())
}

fn handle_modal_key(state: &mut AppState, app: &App, key: KeyEvent) {
    let Some(modal) = state.modal.take() else { return };

    match modal {
        Modal::Login {
            purpose,
            mut username,
            mut password,
            mut on_password,
            error,
        } => {
            let mut error = error;
            match key.code {
                KeyCode::Esc => {
                    if purpose == LoginPurpose::Startup {
                        state.quit = true;
                    }
                    return;
                }
                KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                    on_password = !on_password;
                }
                KeyCode::Backspace => {
                    if on_password {
                        password.pop();
                    } else {
                        username.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if on_password {
                        password.push(c);
                    } else {
                        username.push(c);
                    }
                }
                KeyCode::Enter => {
                    let command = match purpose {
                        LoginPurpose::Startup => Command::Login {
                            username: username.clone(),
                            password: password.clone(),
                        },
                        LoginPurpose::Reveal => Command::Reveal {
                            username: username.clone(),
                            password: password.clone(),
                        },
                    };
                    match app.execute(&mut state.session, command) {
                        Ok(outcome) => {
                            if let Some(rows) = outcome.rows {
                                state.set_rows(rows);
                            }
                            return;
                        }
                        Err(AppError::Login) => {
                            error = Some(AppError::Login.to_string());
                            password.clear();
                        }
                        Err(e) if purpose == LoginPurpose::Startup => {
                            state.fatal = Some(e);
                            state.quit = true;
                            return;
                        }
                        Err(e) => {
                            state.show_error(&e);
                            return;
                        }
                    }
                }
                _ => {}
            }
            state.modal = Some(Modal::Login {
                purpose,
                username,
                password,
                on_password,
                error,
            });
        }
        Modal::ConfirmDelete(id) => {
            let confirmed = match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => true,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
                _ => {
                    state.modal = Some(Modal::ConfirmDelete(id));
                    return;
                }
            };
            state.dispatch(
                app,
                Command::Delete {
                    selected: Some(id),
                    confirmed,
                },
            );
        }
        Modal::Message { .. } | Modal::Help => {}
    }
}

fn handle_main_key(state: &mut AppState, app: &App, key: KeyEvent) {
    match key.code {
        KeyCode::F(10) => state.quit = true,
        KeyCode::Esc => state.focus = Focus::Grid,
        KeyCode::Tab => state.next_focus(),
        KeyCode::BackTab => state.prev_focus(),
        KeyCode::F(1) => state.modal = Some(Modal::Help),
        KeyCode::F(2) => {
            let form = state.form.clone();
            state.dispatch(app, Command::Add(form));
        }
        KeyCode::F(3) => {
            let command = Command::Update {
                selected: state.selected_id(),
                form: state.form.clone(),
            };
            state.dispatch(app, command);
        }
        KeyCode::F(4) => match state.selected_id() {
            Some(id) => state.modal = Some(Modal::ConfirmDelete(id)),
            None => state.show_error(&AppError::Selection("delete")),
        },
        KeyCode::F(5) => {
            state.search.clear();
            state.dispatch(app, Command::ClearSearch);
        }
        KeyCode::F(6) => {
            if state.session.is_revealed() {
                state.dispatch(app, Command::Mask);
            } else {
                state.modal = Some(Modal::login(LoginPurpose::Reveal));
            }
        }
        KeyCode::F(7) => state.theme = state.theme.toggled(),
        KeyCode::F(8) => state.cycle_sort(),
        _ => match state.focus {
            Focus::Grid => match key.code {
                KeyCode::Down | KeyCode::Char('j') => state.next_row(),
                KeyCode::Up | KeyCode::Char('k') => state.prev_row(),
                KeyCode::Enter => state.bind_selected(),
                KeyCode::Char('/') => state.focus = Focus::Search,
                _ => {}
            },
            Focus::Search if key.code == KeyCode::Enter => {
                let keyword = state.search.clone();
                state.dispatch(app, Command::Search(keyword));
            }
            Focus::Form(_) if key.code == KeyCode::Enter => state.next_focus(),
            _ => match key.code {
                KeyCode::Char(c) => {
                    if let Some(text) = state.focused_text() {
                        text.push(c);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(text) = state.focused_text() {
                        text.pop();
                    }
                }
                _ => {}
            },
        },
    }
}

fn draw(frame: &mut Frame, state: &mut AppState) {
    let palette = state.theme.palette();
    let base = Style::default().fg(palette.fg).bg(palette.bg);
    frame.render_widget(Block::default().style(base), frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(FORM_FIELDS as u16 + 2),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Edit form
    let lines: Vec<Line> = FORM_LABELS
        .iter()
        .zip(state.form.fields())
        .enumerate()
        .map(|(i, (label, value))| {
            let focused = state.focus == Focus::Form(i);
            let marker = if focused { "> " } else { "  " };
            let style = if focused {
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
            } else {
                base
            };
            Line::from(vec![
                Span::styled(format!("{}{:<15}", marker, format!("{}:", label)), style),
                Span::raw(value.to_string()),
            ])
        })
        .collect();
    let form = Paragraph::new(lines)
        .style(base)
        .block(Block::default().borders(Borders::ALL).title(" Employee "));
    frame.render_widget(form, chunks[0]);

    // Search box
    let search_style = if state.focus == Focus::Search {
        Style::default().fg(palette.accent)
    } else {
        base
    };
    let search = Paragraph::new(state.search.as_str())
        .style(search_style)
        .block(Block::default().borders(Borders::ALL).title(" Search "));
    frame.render_widget(search, chunks[1]);

    // Result grid
    let header = Row::new(COLUMN_HEADINGS.iter().enumerate().map(|(i, h)| {
        let text = if state.sort_column == Some(i) {
            format!("{} ^", h)
        } else {
            h.to_string()
        };
        Cell::from(text)
    }))
    .style(Style::default().fg(palette.accent).add_modifier(Modifier::BOLD));

    let rows = state
        .rows
        .iter()
        .map(|row| Row::new(row.cells().into_iter().map(Cell::from)));

    let widths = [
        Constraint::Length(5),
        Constraint::Min(16),
        Constraint::Min(14),
        Constraint::Min(12),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(7),
        Constraint::Length(11),
        Constraint::Length(9),
    ];
    let mode = if state.session.is_revealed() {
        "revealed"
    } else {
        "masked"
    };
    let grid_border = if state.focus == Focus::Grid {
        Style::default().fg(palette.accent)
    } else {
        base
    };
    let table = Table::new(rows, widths)
        .header(header)
        .style(base)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(grid_border)
                .title(format!(" Employees ({}) - {} ", state.rows.len(), mode)),
        )
        .row_highlight_style(Style::default().bg(palette.highlight).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(table, chunks[2], &mut state.table);

    // Footer help
    let help = Paragraph::new(
        " Tab:focus  F2:add F3:update F4:delete  /:search F5:clear  F6:reveal/hide F7:theme F8:sort  F1:help  F10:exit",
    )
    .style(Style::default().fg(palette.muted).bg(palette.bg));
    frame.render_widget(help, chunks[3]);

    if let Some(modal) = &state.modal {
        draw_modal(frame, modal, &palette);
    }
}

fn draw_modal(frame: &mut Frame, modal: &Modal, palette: &Palette) {
    let base = Style::default().fg(palette.fg).bg(palette.bg);
    let (title, text, width, height) = match modal {
        Modal::Login {
            username,
            password,
            on_password,
            error,
            ..
        } => {
            let field = |label: &str, value: String, focused: bool| {
                let style = if focused {
                    Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
                } else {
                    base
                };
                Line::from(vec![
                    Span::styled(format!("{:<10}", label), style),
                    Span::raw(value),
                ])
            };
            let mut lines = vec![
                field("Username:", username.clone(), !on_password),
                field("Password:", "*".repeat(password.chars().count()), *on_password),
                Line::from(""),
            ];
            match error {
                Some(e) => lines.push(Line::from(Span::styled(e.clone(), Style::default().fg(Color::Red)))),
                None => lines.push(Line::from(Span::styled(
                    "Enter: login  Esc: cancel",
                    Style::default().fg(palette.muted),
                ))),
            }
            (" Login ".to_string(), Text::from(lines), 44, 7)
        }
        Modal::ConfirmDelete(_) => (
            " Confirm Deletion ".to_string(),
            Text::from("Are you sure you want to delete this record? (y/n)"),
            56,
            5,
        ),
        Modal::Message { title, body } => {
            let lines = body.lines().count() as u16;
            (
                format!(" {} ", title),
                Text::from(body.clone()),
                60,
                lines + 4,
            )
        }
        Modal::Help => {
            let wrapped = format!("{}\n\n{}", ABOUT, textwrap::fill(HELP, 64));
            let lines = wrapped.lines().count() as u16;
            (" Help ".to_string(), Text::from(wrapped), 70, lines + 2)
        }
    };

    let area = centered(frame.area(), width, height);
    frame.render_widget(Clear, area);
    let widget = Paragraph::new(text)
        .style(base)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(widget, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
