//! App: terminal init, main loop, key and mouse handling.

use crate::combat::{Outcome, Side};
use crate::grid::{GRID_SIZE, Pos};
use crate::input::{Action, key_to_action};
use crate::session::{GameEvent, GameSession};
use crate::theme::Theme;
use crate::ui::{self, Hud, RemovalFx};
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{
    self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Lines kept for the sidebar log.
const LOG_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Exit,
}

pub struct App {
    theme: Theme,
    session: GameSession,
    screen: Screen,
    paused: bool,
    /// When the game clock stopped (pause or quit menu).
    frozen_at: Option<Instant>,
    quit_selected: QuitOption,
    cursor: Pos,
    /// Cell grabbed with the keyboard.
    held: Option<Pos>,
    log: VecDeque<String>,
    removal_fx: RemovalFx,
    removal_ms: u32,
    frame_interval: Duration,
    /// Frame area of the last draw, for mouse hit-testing.
    area: Rect,
}

impl App {
    pub fn new(args: &Args, config: GameConfig, theme: Theme) -> Self {
        let mut app = Self {
            theme,
            session: GameSession::new(config),
            screen: Screen::Playing,
            paused: false,
            frozen_at: None,
            quit_selected: QuitOption::Resume,
            cursor: Pos::new(GRID_SIZE / 2, GRID_SIZE / 2),
            held: None,
            log: VecDeque::with_capacity(LOG_CAPACITY),
            removal_fx: RemovalFx::default(),
            removal_ms: config.timings.removal.as_millis().min(u32::MAX as u128) as u32,
            frame_interval: Duration::from_secs_f64(1.0 / args.frame_rate),
            area: Rect::default(),
        };
        app.collect_events();
        app
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        if let Err(e) = &result {
            log::error!("game stopped: {e:#}");
        }
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            if self.is_running() {
                self.session.advance(now)?;
                self.collect_events();
            }

            let hud = Hud {
                session: &self.session,
                theme: &self.theme,
                screen: self.screen,
                paused: self.paused,
                quit_selected: self.quit_selected,
                cursor: self.cursor,
                holding: self.held.is_some(),
                log: &self.log,
                removal_ms: self.removal_ms,
                now,
            };
            let removal_fx = &mut self.removal_fx;
            let mut area = self.area;
            terminal.draw(|f| {
                area = f.area();
                ui::draw(f, &hud, removal_fx);
            })?;
            self.area = area;

            let timeout = self.frame_interval.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let keep_going = match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            self.on_action(key_to_action(key), Instant::now())
                        }
                        Event::Mouse(mouse) => {
                            self.on_mouse(mouse, Instant::now());
                            true
                        }
                        _ => true,
                    };
                    if !keep_going {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn is_running(&self) -> bool {
        self.screen == Screen::Playing && !self.paused
    }

    /// Stop the game clock; the matching `thaw` shifts every running timer by the gap.
    fn freeze(&mut self, now: Instant) {
        if self.frozen_at.is_none() {
            self.frozen_at = Some(now);
        }
    }

    fn thaw(&mut self, now: Instant) {
        if !self.is_running() {
            return;
        }
        if let Some(at) = self.frozen_at.take() {
            self.session.shift_clock(now.saturating_duration_since(at));
        }
    }

    /// Returns false when the app should exit.
    fn on_action(&mut self, action: Action, now: Instant) -> bool {
        match self.screen {
            Screen::QuitMenu => match action {
                Action::Up | Action::Down | Action::Left | Action::Right => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::Grab => match self.quit_selected {
                    QuitOption::Resume => self.close_quit_menu(now),
                    QuitOption::Exit => return false,
                },
                Action::Quit | Action::Cancel | Action::Pause => self.close_quit_menu(now),
                Action::None => {}
            },
            Screen::Playing if self.paused => match action {
                Action::Pause => {
                    self.paused = false;
                    self.thaw(now);
                }
                Action::Quit => self.open_quit_menu(now),
                _ => {}
            },
            Screen::Playing => match action {
                Action::Up => self.move_cursor(-1, 0),
                Action::Down => self.move_cursor(1, 0),
                Action::Left => self.move_cursor(0, -1),
                Action::Right => self.move_cursor(0, 1),
                Action::Grab => self.grab_or_drop(now),
                Action::Cancel => {
                    if let Some(origin) = self.held.take() {
                        self.session.pointer_up(origin.row, origin.col, now);
                    } else {
                        self.open_quit_menu(now);
                    }
                }
                Action::Pause => {
                    self.paused = true;
                    self.freeze(now);
                }
                Action::Quit => self.open_quit_menu(now),
                Action::None => {}
            },
        }
        true
    }

    fn open_quit_menu(&mut self, now: Instant) {
        self.screen = Screen::QuitMenu;
        self.quit_selected = QuitOption::Resume;
        self.freeze(now);
    }

    fn close_quit_menu(&mut self, now: Instant) {
        self.screen = Screen::Playing;
        self.thaw(now);
    }

    fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let clamp = |v: usize, d: isize| v.saturating_add_signed(d).min(GRID_SIZE - 1);
        self.cursor = Pos::new(clamp(self.cursor.row, d_row), clamp(self.cursor.col, d_col));
        if self.held.is_some() {
            self.session.pointer_move(self.cursor.row, self.cursor.col);
        }
    }

    fn grab_or_drop(&mut self, now: Instant) {
        match self.held.take() {
            Some(_) => self.session.pointer_up(self.cursor.row, self.cursor.col, now),
            None => {
                if self.session.pointer_down(self.cursor.row, self.cursor.col) {
                    self.held = Some(self.cursor);
                }
            }
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        if !self.is_running() {
            return;
        }
        let cell = ui::cell_at(self.area, mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(pos) = cell {
                    self.held = None;
                    self.cursor = pos;
                    self.session.pointer_down(pos.row, pos.col);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(pos) = cell {
                    self.session.pointer_move(pos.row, pos.col);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                // Off-board release still drops the selection.
                let pos = cell.unwrap_or(Pos::new(GRID_SIZE, GRID_SIZE));
                self.session.pointer_up(pos.row, pos.col, now);
            }
            _ => {}
        }
    }

    fn collect_events(&mut self) {
        for event in self.session.drain_events() {
            if let Some(line) = describe(&event) {
                if self.log.len() == LOG_CAPACITY {
                    self.log.pop_front();
                }
                self.log.push_back(line);
            }
        }
    }
}

/// One log line per event worth showing.
fn describe(event: &GameEvent) -> Option<String> {
    let line = match event {
        GameEvent::RoundStarted { ally, enemy } => {
            format!("New round: {} vs {}", ally.name(), enemy.name())
        }
        GameEvent::Swapped { a, b, valid: false } => {
            format!("No match: {} - {}", cell_name(*a), cell_name(*b))
        }
        GameEvent::Swapped { .. } => return None,
        GameEvent::Hit {
            element,
            side: Side::Enemy,
            damage,
            player_move: true,
        } => format!("You strike with {} -{damage}", element.name()),
        GameEvent::Hit {
            element,
            side: Side::Enemy,
            damage,
            player_move: false,
        } => format!("{} hits enemy -{damage}", element.name()),
        GameEvent::Hit {
            element,
            side: Side::Ally,
            damage,
            ..
        } => format!("{} hurts you -{damage}", element.name()),
        GameEvent::Streak { count, element } => {
            format!("{} streak x{}", element.name(), count + 1)
        }
        GameEvent::ChestSpawned(pos) => format!("A chest appeared on {}", cell_name(*pos)),
        GameEvent::ChestsOpened { items } => format!("Chest opened: {items} items"),
        GameEvent::LootCollected(kind) => format!("+1 {}", kind.name()),
        GameEvent::RoundOver(Outcome::Victory) => "Victory!".to_string(),
        GameEvent::RoundOver(Outcome::Defeat) => "Defeat".to_string(),
    };
    Some(line)
}

/// Board coordinate in chess style: columns a-h, rows 8 (top) to 1.
fn cell_name(pos: Pos) -> String {
    let file = char::from(b'a' + pos.col as u8);
    format!("{file}{}", GRID_SIZE - pos.row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Element;
    use clap::Parser;

    fn app() -> App {
        let args = Args::parse_from(["orbclash", "--seed", "3"]);
        let config = GameConfig {
            seed: Some(3),
            ..GameConfig::default()
        };
        App::new(&args, config, Theme::default())
    }

    #[test]
    fn test_new_app_logs_round_start() {
        let app = app();
        assert_eq!(app.log.len(), 1);
        assert!(app.log[0].starts_with("New round"));
    }

    #[test]
    fn test_cursor_stays_on_board() {
        let mut app = app();
        let now = Instant::now();
        for _ in 0..20 {
            app.on_action(Action::Up, now);
            app.on_action(Action::Left, now);
        }
        assert_eq!(app.cursor, Pos::new(0, 0));
        for _ in 0..20 {
            app.on_action(Action::Down, now);
        }
        assert_eq!(app.cursor, Pos::new(GRID_SIZE - 1, 0));
    }

    #[test]
    fn test_grab_then_cancel_leaves_board_untouched() {
        let mut app = app();
        let now = Instant::now();
        let before = app.session.view(now).grid.clone();
        app.on_action(Action::Grab, now);
        assert!(app.held.is_some());
        app.on_action(Action::Right, now);
        app.on_action(Action::Cancel, now);
        assert!(app.held.is_none());
        assert!(!app.session.is_busy());
        assert_eq!(app.session.view(now).grid, &before);
    }

    #[test]
    fn test_pause_freezes_and_quit_menu_exits() {
        let mut app = app();
        let now = Instant::now();
        assert!(app.on_action(Action::Pause, now));
        assert!(!app.is_running());
        assert!(app.frozen_at.is_some());
        assert!(app.on_action(Action::Pause, now));
        assert!(app.is_running());
        assert!(app.frozen_at.is_none());

        assert!(app.on_action(Action::Quit, now));
        assert_eq!(app.screen, Screen::QuitMenu);
        app.on_action(Action::Down, now);
        assert_eq!(app.quit_selected, QuitOption::Exit);
        assert!(!app.on_action(Action::Grab, now));
    }

    #[test]
    fn test_describe_events() {
        assert_eq!(
            describe(&GameEvent::Hit {
                element: Element::Fire,
                side: Side::Ally,
                damage: 15.0,
                player_move: false,
            })
            .as_deref(),
            Some("Fire hurts you -15")
        );
        assert_eq!(
            describe(&GameEvent::Hit {
                element: Element::Water,
                side: Side::Enemy,
                damage: 7.5,
                player_move: true,
            })
            .as_deref(),
            Some("You strike with Water -7.5")
        );
        assert_eq!(
            describe(&GameEvent::Streak {
                count: 2,
                element: Element::Air
            })
            .as_deref(),
            Some("Air streak x3")
        );
        assert_eq!(
            describe(&GameEvent::ChestSpawned(Pos::new(0, 2))).as_deref(),
            Some("A chest appeared on c8")
        );
        assert_eq!(
            describe(&GameEvent::Swapped {
                a: Pos::new(0, 0),
                b: Pos::new(0, 1),
                valid: true
            }),
            None
        );
    }
}
