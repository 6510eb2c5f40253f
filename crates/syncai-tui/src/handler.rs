use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

const WHEEL_ROWS: i32 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        // Geometry is re-measured on the next draw
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('r') if ctrl => {
            app.retry();
            return;
        }
        KeyCode::End if ctrl => {
            app.scroll_to_bottom();
            return;
        }
        KeyCode::PageDown => {
            app.scroll_half_page_down();
            return;
        }
        KeyCode::PageUp => {
            app.scroll_half_page_up();
            return;
        }
        _ => {}
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let empty = app.store.is_empty();

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to the composer
        KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Enter if empty => app.select_example(app.selected_example),
        KeyCode::Enter => app.input_mode = InputMode::Editing,

        KeyCode::Char('j') | KeyCode::Down if empty => app.example_nav_down(),
        KeyCode::Char('k') | KeyCode::Up if empty => app.example_nav_up(),
        KeyCode::Char(c @ '1'..='9') if empty => {
            app.select_example(c as usize - '1' as usize);
        }

        KeyCode::Char('d') if ctrl => app.scroll_half_page_down(),
        KeyCode::Char('u') if ctrl => app.scroll_half_page_up(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_by(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_by(-1),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),

        KeyCode::Char('r') => app.retry(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let empty = app.store.is_empty();

    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            if empty && app.composer.is_blank() {
                app.select_example(app.selected_example);
            } else {
                app.submit();
            }
        }
        KeyCode::Up if empty => app.example_nav_up(),
        KeyCode::Down if empty => app.example_nav_down(),
        KeyCode::Up => app.scroll_by(-1),
        KeyCode::Down => app.scroll_by(1),

        KeyCode::Backspace => app.composer.backspace(),
        KeyCode::Delete => app.composer.delete(),
        KeyCode::Left => app.composer.move_left(),
        KeyCode::Right => app.composer.move_right(),
        KeyCode::Home => app.composer.move_home(),
        KeyCode::End => app.composer.move_end(),
        KeyCode::Char('a') if ctrl => app.composer.move_home(),
        KeyCode::Char('e') if ctrl => app.composer.move_end(),
        KeyCode::Char('u') if ctrl => app.composer.clear(),
        KeyCode::Char(c) if !ctrl && !alt => app.composer.insert_char(c),

        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown if in_chat => app.scroll_by(WHEEL_ROWS),
        MouseEventKind::ScrollUp if in_chat => app.scroll_by(-WHEEL_ROWS),
        MouseEventKind::Down(MouseButton::Left) => {
            if app.affordance_area.is_some_and(|r| point_in_rect(x, y, r)) {
                app.scroll_to_bottom();
            } else if let Some(idx) = app
                .example_areas
                .iter()
                .position(|r| point_in_rect(x, y, *r))
            {
                app.select_example(idx);
            } else if app.input_area.is_some_and(|r| point_in_rect(x, y, r)) {
                app.input_mode = InputMode::Editing;
            }
        }
        _ => {}
    }
}
