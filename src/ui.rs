//! Layout and drawing: board, orb animation, chests and loot, sidebar, overlays.

use crate::app::{QuitOption, Screen};
use crate::combat::{Combatant, Outcome};
use crate::grid::{Element, GRID_SIZE, Pos};
use crate::loot::LootKind;
use crate::sequencer::{Phase, ease_in_out_cubic};
use crate::session::{GameSession, View};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// One orb is drawn in a 6x3 block of terminal cells.
const CELL_WIDTH: u16 = 6;
const CELL_HEIGHT: u16 = 3;
const BOARD_WIDTH: u16 = GRID_SIZE as u16 * CELL_WIDTH;
const BOARD_HEIGHT: u16 = GRID_SIZE as u16 * CELL_HEIGHT;
const PLAYFIELD_WIDTH: u16 = BOARD_WIDTH + 2;
const PLAYFIELD_HEIGHT: u16 = BOARD_HEIGHT + 2;
const SIDEBAR_WIDTH: u16 = 30;

/// Everything `draw` reads for one frame.
pub struct Hud<'a> {
    pub session: &'a GameSession,
    pub theme: &'a Theme,
    pub screen: Screen,
    pub paused: bool,
    pub quit_selected: QuitOption,
    /// Keyboard cursor, and whether it is holding an orb.
    pub cursor: Pos,
    pub holding: bool,
    pub log: &'a VecDeque<String>,
    pub removal_ms: u32,
    pub now: Instant,
}

/// Fade over the cells of the current removal phase, rebuilt when a new removal starts.
#[derive(Default)]
pub struct RemovalFx {
    phase_id: u64,
    effect: Option<Effect>,
    last_frame: Option<Instant>,
}

/// Playfield (board + border) rect for the frame area; sidebar sits to its right.
fn playfield_rect(area: Rect) -> Rect {
    let total_w = PLAYFIELD_WIDTH + SIDEBAR_WIDTH;
    Rect {
        x: area.x + area.width.saturating_sub(total_w) / 2,
        y: area.y + area.height.saturating_sub(PLAYFIELD_HEIGHT) / 2,
        width: PLAYFIELD_WIDTH.min(area.width),
        height: PLAYFIELD_HEIGHT.min(area.height),
    }
}

/// Board rect (inside the border) for the frame area; matches `draw`.
fn board_rect(area: Rect) -> Rect {
    let outer = playfield_rect(area);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: BOARD_WIDTH.min(outer.width.saturating_sub(2)),
        height: BOARD_HEIGHT.min(outer.height.saturating_sub(2)),
    }
}

/// Board cell under a terminal position, for mouse input.
pub fn cell_at(area: Rect, column: u16, row: u16) -> Option<Pos> {
    let board = board_rect(area);
    if !board.contains(Position::new(column, row)) {
        return None;
    }
    Pos::checked(
        usize::from((row - board.y) / CELL_HEIGHT),
        usize::from((column - board.x) / CELL_WIDTH),
    )
}

/// Where the orb now stored at `pos` is drawn, as (row, col) in cell units.
/// Orbs mid-swap or mid-fall sit between cells; refilled orbs start above the board.
pub fn orb_position(view: &View<'_>, pos: Pos) -> (f32, f32) {
    let here = (pos.row as f32, pos.col as f32);
    match view.phase {
        Some(Phase::Swap { a, b, valid }) => {
            let from = if pos == *a {
                *b
            } else if pos == *b {
                *a
            } else {
                return here;
            };
            // A rejected swap travels out and back.
            let t = if *valid {
                view.progress
            } else {
                1.0 - (2.0 * view.progress - 1.0).abs()
            };
            let t = ease_in_out_cubic(t);
            (
                from.row as f32 + (here.0 - from.row as f32) * t,
                from.col as f32 + (here.1 - from.col as f32) * t,
            )
        }
        Some(Phase::Falling { falls, spawns }) => {
            let t = ease_in_out_cubic(view.progress);
            if let Some(fall) = falls
                .iter()
                .find(|f| f.col == pos.col && f.to_row == pos.row)
            {
                let from = fall.from_row as f32;
                return (from + (here.0 - from) * t, here.1);
            }
            if spawns.iter().any(|s| s.pos == pos) {
                let stacked = spawns.iter().filter(|s| s.pos.col == pos.col).count() as f32;
                return (here.0 - stacked * (1.0 - t), here.1);
            }
            here
        }
        _ => here,
    }
}

pub fn element_glyph(element: Element) -> &'static str {
    match element {
        Element::Water => "≈",
        Element::Fire => "▲",
        Element::Earth => "■",
        Element::Air => "○",
    }
}

fn loot_glyph(kind: LootKind) -> &'static str {
    match kind {
        LootKind::Gem => "◆",
        LootKind::Coin => "●",
        LootKind::Star => "★",
        LootKind::Crystal => "✦",
    }
}

fn dim(color: Color, factor: f32) -> Color {
    match color {
        Color::Rgb(r, g, b) => Color::Rgb(
            (r as f32 * factor) as u8,
            (g as f32 * factor) as u8,
            (b as f32 * factor) as u8,
        ),
        other => other,
    }
}

/// Write `symbol` at (x, y) if it falls inside `clip`.
fn put(buf: &mut Buffer, clip: Rect, x: i32, y: i32, symbol: &str, style: Style) {
    let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
        return;
    };
    if clip.contains(Position::new(x, y)) {
        buf[(x, y)].set_symbol(symbol).set_style(style);
    }
}

/// Draw the screen: board and sidebar, then whichever overlay applies.
pub fn draw(frame: &mut Frame, hud: &Hud<'_>, removal_fx: &mut RemovalFx) {
    let area = frame.area();
    let view = hud.session.view(hud.now);
    let playfield = playfield_rect(area);
    let sidebar = Rect {
        x: playfield.x + playfield.width,
        y: playfield.y,
        width: SIDEBAR_WIDTH.min(area.width.saturating_sub(playfield.x + playfield.width - area.x)),
        height: playfield.height,
    };

    draw_playfield(frame, hud, &view, playfield);
    draw_sidebar(frame, hud, sidebar);
    apply_removal_effect(frame, hud, &view, area, removal_fx);

    if let Some(Phase::RoundOver { outcome }) = view.phase {
        draw_round_over(frame, hud.theme, *outcome, playfield);
    }
    match hud.screen {
        Screen::QuitMenu => draw_quit_menu(frame, hud.theme, hud.quit_selected),
        Screen::Playing if hud.paused => draw_pause_overlay(frame, hud.theme, playfield),
        Screen::Playing => {}
    }
}

fn draw_playfield(frame: &mut Frame, hud: &Hud<'_>, view: &View<'_>, area: Rect) {
    let theme = hud.theme;
    let combat = hud.session.combat();
    let title = format!(
        " Orbclash  {} vs {} ",
        combat.ally.affinity.name(),
        combat.enemy.affinity.name()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    block.render(area, frame.buffer_mut());

    let board = board_rect(frame.area());
    let buf = frame.buffer_mut();
    buf.set_style(board, Style::default().bg(theme.bg));

    if let Some(pos) = view.selected {
        let cell = cell_rect(board, pos);
        buf.set_style(cell, Style::default().bg(dim(theme.selected, 0.35)));
    }

    let removing = match view.phase {
        Some(Phase::Removal { matches }) => Some(matches),
        _ => None,
    };
    for (pos, element) in view.grid.occupied() {
        let closed_chest = view.chests.iter().any(|c| c.pos == pos && !c.opened);
        let (row, col) = orb_position(view, pos);
        draw_orb(buf, board, theme, element, row, col, closed_chest);
        if removing.is_some_and(|m| m.contains(pos)) {
            let x = board.x as i32 + pos.col as i32 * CELL_WIDTH as i32;
            let y = board.y as i32 + pos.row as i32 * CELL_HEIGHT as i32;
            put(
                buf,
                board,
                x + 3,
                y + 1,
                "✶",
                Style::default().fg(theme.selected).bg(theme.element(element)),
            );
        }
    }

    draw_cursor(buf, board, hud);

    // Loot may rise past the top edge into the border.
    for sprite in &view.loot {
        let x = board.x as i32 + (sprite.col * CELL_WIDTH as f32).round() as i32;
        let y = board.y as i32 + (sprite.row * CELL_HEIGHT as f32).round() as i32;
        let color = if sprite.progress > 0.85 {
            dim(theme.loot(sprite.kind), 0.6)
        } else {
            theme.loot(sprite.kind)
        };
        put(
            buf,
            area,
            x,
            y,
            loot_glyph(sprite.kind),
            Style::default().fg(color).bg(theme.bg).bold(),
        );
    }
}

fn cell_rect(board: Rect, pos: Pos) -> Rect {
    Rect {
        x: board.x + pos.col as u16 * CELL_WIDTH,
        y: board.y + pos.row as u16 * CELL_HEIGHT,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    }
    .intersection(board)
}

/// Orb sprite with its top-left corner at (row, col) cell units; clipped to the board.
fn draw_orb(
    buf: &mut Buffer,
    board: Rect,
    theme: &Theme,
    element: Element,
    row: f32,
    col: f32,
    closed_chest: bool,
) {
    let color = if closed_chest {
        dim(theme.element(element), 0.5)
    } else {
        theme.element(element)
    };
    let x = board.x as i32 + (col * CELL_WIDTH as f32).round() as i32;
    let y = board.y as i32 + (row * CELL_HEIGHT as f32).round() as i32;
    let edge = Style::default().fg(color).bg(theme.bg);
    let body = Style::default().fg(theme.bg).bg(color);

    for dx in 1..5 {
        put(buf, board, x + dx, y, "▄", edge);
        put(buf, board, x + dx, y + 2, "▀", edge);
        put(buf, board, x + dx, y + 1, " ", body);
    }
    put(buf, board, x, y + 1, "▐", edge);
    put(buf, board, x + 5, y + 1, "▌", edge);
    if closed_chest {
        put(
            buf,
            board,
            x + 2,
            y + 1,
            "$",
            Style::default().fg(theme.chest).bg(color).bold(),
        );
    } else {
        put(buf, board, x + 2, y + 1, element_glyph(element), body);
    }
}

fn draw_cursor(buf: &mut Buffer, board: Rect, hud: &Hud<'_>) {
    if hud.session.is_busy() && !hud.holding {
        return;
    }
    let color = if hud.holding {
        hud.theme.selected
    } else {
        hud.theme.title
    };
    let style = Style::default().fg(color).bg(hud.theme.bg);
    let x = board.x as i32 + (hud.cursor.col as u16 * CELL_WIDTH) as i32;
    let y = board.y as i32 + (hud.cursor.row as u16 * CELL_HEIGHT) as i32;
    let (right, bottom) = (x + CELL_WIDTH as i32 - 1, y + CELL_HEIGHT as i32 - 1);
    put(buf, board, x, y, "┏", style);
    put(buf, board, right, y, "┓", style);
    put(buf, board, x, bottom, "┗", style);
    put(buf, board, right, bottom, "┛", style);
}

/// Fade matched cells to the background while a removal phase runs.
fn apply_removal_effect(
    frame: &mut Frame,
    hud: &Hud<'_>,
    view: &View<'_>,
    area: Rect,
    removal_fx: &mut RemovalFx,
) {
    let Some(Phase::Removal { matches }) = view.phase else {
        removal_fx.effect = None;
        removal_fx.last_frame = None;
        return;
    };
    if hud.removal_ms == 0 {
        return;
    }
    let board = board_rect(area);
    if removal_fx.effect.is_none() || removal_fx.phase_id != view.phase_id {
        let cells: HashSet<(u16, u16)> = matches
            .flat
            .iter()
            .flat_map(|pos| {
                let r = cell_rect(board, *pos);
                r.positions().map(|p| (p.x, p.y))
            })
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            cells.contains(&(pos.x, pos.y))
        }));
        let bg = hud.theme.bg;
        let effect = fx::fade_to(bg, bg, (hud.removal_ms, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        removal_fx.effect = Some(effect);
        removal_fx.phase_id = view.phase_id;
        removal_fx.last_frame = None;
    }

    let frozen = hud.paused || hud.screen == Screen::QuitMenu;
    let delta = match removal_fx.last_frame {
        Some(t) if !frozen => hud.now.saturating_duration_since(t),
        _ => std::time::Duration::ZERO,
    };
    removal_fx.last_frame = Some(hud.now);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    if let Some(effect) = removal_fx.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn health_gauge(theme: &Theme, who: &Combatant) -> Gauge<'static> {
    let ratio = who.health_ratio();
    Gauge::default()
        .ratio(ratio)
        .label(format!("{}/{}", who.health.ceil(), who.max_health))
        .gauge_style(Style::default().fg(theme.health(ratio)).bg(theme.div_line))
}

fn section(theme: &Theme, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {title} "), theme.title))
}

fn draw_sidebar(frame: &mut Frame, hud: &Hud<'_>, area: Rect) {
    let theme = hud.theme;
    let session = hud.session;
    let combat = session.combat();
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Battle: names + gauges
            Constraint::Length(5), // Streak, last element, record
            Constraint::Length(6), // Loot tallies
            Constraint::Fill(1),   // Log
            Constraint::Length(4), // Controls
        ])
        .split(area);

    let battle = section(theme, "Battle");
    let inner = battle.inner(chunks[0]);
    battle.render(chunks[0], frame.buffer_mut());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 4])
        .split(inner);
    for (i, (label, who)) in [("Ally ", &combat.ally), ("Enemy", &combat.enemy)]
        .into_iter()
        .enumerate()
    {
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{label} "), title_style),
            Span::styled(
                format!("{} {}", element_glyph(who.affinity), who.affinity.name()),
                Style::default().fg(theme.element(who.affinity)),
            ),
        ]))
        .render(rows[i * 2], frame.buffer_mut());
        health_gauge(theme, who).render(rows[i * 2 + 1], frame.buffer_mut());
    }

    let stats = section(theme, "Stats");
    let inner = stats.inner(chunks[1]);
    stats.render(chunks[1], frame.buffer_mut());
    let streak = if combat.streak.count > 0 {
        Span::styled(
            format!("x{}", combat.streak.count + 1),
            Style::default().fg(theme.title).bold(),
        )
    } else {
        Span::styled("-", fg_style)
    };
    let last = combat.streak.element.map_or_else(
        || Span::styled("-", fg_style),
        |e| Span::styled(e.name(), Style::default().fg(theme.element(e))),
    );
    let record = session.stats();
    Paragraph::new(Text::from(vec![
        Line::from(vec![Span::styled("Streak: ", title_style), streak]),
        Line::from(vec![Span::styled("Last:   ", title_style), last]),
        Line::from(vec![
            Span::styled("Rounds: ", title_style),
            Span::styled(format!("{}W {}L", record.won, record.lost), fg_style),
        ]),
    ]))
    .render(inner, frame.buffer_mut());

    let loot = session.loot();
    let incoming = loot.spawned() - loot.collected();
    let loot_title = if incoming > 0 {
        format!("Loot (+{incoming})")
    } else {
        "Loot".to_string()
    };
    let loot_block = section(theme, &loot_title);
    let inner = loot_block.inner(chunks[2]);
    loot_block.render(chunks[2], frame.buffer_mut());
    let lines: Vec<Line> = LootKind::ALL
        .iter()
        .map(|kind| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", loot_glyph(*kind)),
                    Style::default().fg(theme.loot(*kind)),
                ),
                Span::styled(format!("{:<9}", kind.name()), title_style),
                Span::styled(loot.tally(*kind).to_string(), fg_style),
            ])
        })
        .collect();
    Paragraph::new(Text::from(lines)).render(inner, frame.buffer_mut());

    let log_block = section(theme, "Log");
    let inner = log_block.inner(chunks[3]);
    log_block.render(chunks[3], frame.buffer_mut());
    let visible = usize::from(inner.height);
    let lines: Vec<Line> = hud
        .log
        .iter()
        .skip(hud.log.len().saturating_sub(visible))
        .map(|s| Line::from(Span::styled(s.as_str(), fg_style)))
        .collect();
    Paragraph::new(Text::from(lines)).render(inner, frame.buffer_mut());

    let help = Style::default().fg(theme.inactive_fg);
    Paragraph::new(Text::from(vec![
        Line::from(Span::styled(" Drag or Space: swap orbs", help)),
        Line::from(Span::styled(" hjkl/arrows  Esc: let go", help)),
        Line::from(Span::styled(" P: pause     Q: quit", help)),
    ]))
    .render(chunks[4], frame.buffer_mut());
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_round_over(frame: &mut Frame, theme: &Theme, outcome: Outcome, area: Rect) {
    let (label, color) = match outcome {
        Outcome::Victory => (" Victory! ", theme.health[0]),
        Outcome::Defeat => (" Defeat ", theme.health[2]),
    };
    let popup = centered(area, 26, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            label,
            Style::default().fg(theme.bg).bg(color).bold(),
        )),
        Line::from(Span::styled(
            "Next round coming up",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let quit_rect = centered(frame.area(), 24, 6);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");
    frame
        .buffer_mut()
        .set_style(quit_rect, Style::default().bg(theme.bg));
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [(QuitOption::Resume, " Resume "), (QuitOption::Exit, " Exit ")];
    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let x = inner.x + inner.width.saturating_sub(label.len() as u16) / 2;
        let y = inner.y + i as u16 * 2;
        if y < inner.y + inner.height {
            frame.buffer_mut().set_string(x, y, label, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::checker;
    use crate::grid::{Fall, Grid, Spawn};
    use crate::session::LootSprite;

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 120,
        height: 40,
    };

    fn view<'a>(grid: &'a Grid, phase: Option<&'a Phase>, progress: f32) -> View<'a> {
        View {
            grid,
            phase,
            progress,
            phase_id: 1,
            selected: None,
            chests: &[],
            loot: Vec::<LootSprite>::new(),
        }
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-4 && (a.1 - b.1).abs() < 1e-4
    }

    #[test]
    fn test_cell_at_maps_corners_and_rejects_border() {
        let board = board_rect(SCREEN);
        assert_eq!(cell_at(SCREEN, board.x, board.y), Some(Pos::new(0, 0)));
        assert_eq!(
            cell_at(SCREEN, board.x + BOARD_WIDTH - 1, board.y + BOARD_HEIGHT - 1),
            Some(Pos::new(7, 7))
        );
        assert_eq!(
            cell_at(SCREEN, board.x + CELL_WIDTH, board.y + CELL_HEIGHT * 2),
            Some(Pos::new(2, 1))
        );
        assert_eq!(cell_at(SCREEN, board.x - 1, board.y), None);
        assert_eq!(cell_at(SCREEN, board.x, board.y + BOARD_HEIGHT), None);
    }

    #[test]
    fn test_idle_orbs_sit_on_their_cells() {
        let grid = checker();
        let v = view(&grid, None, 1.0);
        assert!(close(orb_position(&v, Pos::new(3, 5)), (3.0, 5.0)));
    }

    #[test]
    fn test_valid_swap_moves_from_partner_cell() {
        let grid = checker();
        let phase = Phase::Swap {
            a: Pos::new(2, 2),
            b: Pos::new(2, 3),
            valid: true,
        };
        let start = view(&grid, Some(&phase), 0.0);
        assert!(close(orb_position(&start, Pos::new(2, 2)), (2.0, 3.0)));
        assert!(close(orb_position(&start, Pos::new(2, 3)), (2.0, 2.0)));
        let end = view(&grid, Some(&phase), 1.0);
        assert!(close(orb_position(&end, Pos::new(2, 2)), (2.0, 2.0)));
        // Bystanders never move.
        assert!(close(orb_position(&start, Pos::new(0, 0)), (0.0, 0.0)));
    }

    #[test]
    fn test_rejected_swap_goes_out_and_back() {
        let grid = checker();
        let phase = Phase::Swap {
            a: Pos::new(4, 4),
            b: Pos::new(5, 4),
            valid: false,
        };
        let mid = view(&grid, Some(&phase), 0.5);
        assert!(close(orb_position(&mid, Pos::new(4, 4)), (4.0, 4.0)));
        let end = view(&grid, Some(&phase), 1.0);
        assert!(close(orb_position(&end, Pos::new(4, 4)), (5.0, 4.0)));
    }

    #[test]
    fn test_fall_and_spawn_interpolate_downwards() {
        let grid = checker();
        let phase = Phase::Falling {
            falls: vec![Fall {
                col: 1,
                from_row: 2,
                to_row: 4,
                element: Element::Fire,
            }],
            spawns: vec![
                Spawn {
                    pos: Pos::new(0, 1),
                    element: Element::Air,
                },
                Spawn {
                    pos: Pos::new(1, 1),
                    element: Element::Air,
                },
            ],
        };
        let start = view(&grid, Some(&phase), 0.0);
        assert!(close(orb_position(&start, Pos::new(4, 1)), (2.0, 1.0)));
        assert!(close(orb_position(&start, Pos::new(0, 1)), (-2.0, 1.0)));
        assert!(close(orb_position(&start, Pos::new(1, 1)), (-1.0, 1.0)));
        let end = view(&grid, Some(&phase), 1.0);
        assert!(close(orb_position(&end, Pos::new(4, 1)), (4.0, 1.0)));
        assert!(close(orb_position(&end, Pos::new(0, 1)), (0.0, 1.0)));
    }

    #[test]
    fn test_dim_scales_rgb_only() {
        assert_eq!(dim(Color::Rgb(200, 100, 50), 0.5), Color::Rgb(100, 50, 25));
        assert_eq!(dim(Color::Red, 0.5), Color::Red);
    }
}
