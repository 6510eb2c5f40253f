use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use syncai_core::{Role, EXAMPLE_PROMPTS};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, InputMode};
use crate::markdown::wrap_lines;

const USER_BUBBLE_BG: Color = Color::Blue;
const MODEL_GUTTER: &str = "▌ ";
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const PLACEHOLDER: &str = "Write your message...";
const DISCLAIMER: &str = "SyncAI may be mistaken. Check important info before use.";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Header, transcript, composer, disclaimer, footer
    let [header_area, chat_area, input_area, disclaimer_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);

    let disclaimer = Paragraph::new(DISCLAIMER)
        .style(Style::default().fg(Color::DarkGray))
        .centered();
    frame.render_widget(disclaimer, disclaimer_area);

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" SyncAI ✦ ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("Powered by {} ", app.provider.display_name()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("({}) ", app.store.model_name()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.example_areas.clear();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.store.is_empty() {
        app.update_layout(0, inner.height);
        app.affordance_area = None;
        render_welcome(app, frame, inner);
        return;
    }

    let lines = transcript_lines(app, inner.width as usize);
    let content_rows = lines.len().min(u16::MAX as usize) as u16;
    app.update_layout(content_rows, inner.height);

    // Lines are pre-wrapped so row counts match what the scroll math sees
    let transcript = Paragraph::new(lines).scroll((app.scroll_offset, 0));
    frame.render_widget(transcript, inner);

    render_affordance(app, frame, area);
}

/// Build the full transcript at `width` columns, one entry per terminal row.
pub fn transcript_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (turn, rendered) in app.store.turns().iter().zip(&app.rendered_turns) {
        let rendered = trim_trailing_blank(rendered);
        match turn.role {
            Role::User => lines.extend(user_bubble(rendered, width)),
            Role::Model => lines.extend(model_block(rendered, width)),
        }
        lines.push(Line::default());
    }

    if app.store.pending() {
        let dots = ".".repeat((app.animation_frame as usize / 4) % 3 + 1);
        lines.push(Line::from(vec![
            Span::styled(MODEL_GUTTER, Style::default().fg(Color::Magenta)),
            Span::styled(
                format!("Thinking{dots}"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    lines
}

fn trim_trailing_blank<'a>(lines: &'a [Line<'static>]) -> &'a [Line<'static>] {
    let end = lines
        .iter()
        .rposition(|line| line.width() > 0)
        .map_or(0, |idx| idx + 1);
    &lines[..end]
}

/// Right-aligned, padded bubble no wider than 85% of the transcript.
fn user_bubble(rendered: &[Line<'static>], width: usize) -> Vec<Line<'static>> {
    let text_width = (width * 85 / 100).saturating_sub(2).max(1);
    let wrapped = wrap_lines(rendered, text_width);
    let bubble_width = wrapped.iter().map(Line::width).max().unwrap_or(0);
    let pad = Style::default().bg(USER_BUBBLE_BG);

    wrapped
        .into_iter()
        .map(|line| {
            let fill = bubble_width.saturating_sub(line.width());
            let mut spans = vec![Span::styled(" ", pad)];
            spans.extend(
                line.spans
                    .into_iter()
                    .map(|span| Span::styled(span.content, span.style.bg(USER_BUBBLE_BG))),
            );
            spans.push(Span::styled(" ".repeat(fill + 1), pad));
            Line::from(spans).style(line.style).right_aligned()
        })
        .collect()
}

fn model_block(rendered: &[Line<'static>], width: usize) -> Vec<Line<'static>> {
    let gutter_width = MODEL_GUTTER.width();
    wrap_lines(rendered, width.saturating_sub(gutter_width).max(1))
        .into_iter()
        .map(|line| {
            let mut spans = vec![Span::styled(MODEL_GUTTER, Style::default().fg(Color::Magenta))];
            spans.extend(line.spans);
            Line::from(spans).style(line.style)
        })
        .collect()
}

fn render_welcome(app: &mut App, frame: &mut Frame, inner: Rect) {
    let intro = vec![
        Line::from(Span::styled(
            "Welcome to SyncAI",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Ask anything - from creative ideas to technical explanations.",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Try one of these:",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let intro_rows = intro.len() as u16;
    let total = intro_rows + EXAMPLE_PROMPTS.len() as u16;
    let top = inner.y + inner.height.saturating_sub(total) / 2;
    let intro_height = intro_rows.min(inner.bottom().saturating_sub(top));
    frame.render_widget(
        Paragraph::new(intro).centered(),
        Rect::new(inner.x, top, inner.width, intro_height),
    );

    for (i, prompt) in EXAMPLE_PROMPTS.iter().enumerate() {
        let y = top + intro_rows + i as u16;
        if y >= inner.bottom() {
            break;
        }

        let label = format!(" {}. {} ", i + 1, prompt);
        let w = (label.width() as u16).min(inner.width);
        let rect = Rect::new(inner.x + (inner.width - w) / 2, y, w, 1);

        let style = if i == app.selected_example {
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        frame.render_widget(Paragraph::new(label).style(style), rect);
        app.example_areas.push(rect);
    }
}

/// "Scroll down" pill on the bottom border of the transcript.
fn render_affordance(app: &mut App, frame: &mut Frame, area: Rect) {
    if !app.scroll.show_affordance() {
        app.affordance_area = None;
        return;
    }

    let label = if app.scroll.new_content_below() {
        " ↓ New messages below "
    } else {
        " ↓ Scroll down "
    };
    let w = (label.width() as u16).min(area.width);
    let rect = Rect::new(
        area.x + (area.width - w) / 2,
        area.y + area.height.saturating_sub(1),
        w,
        1,
    );

    let pill = Paragraph::new(label).style(
        Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(pill, rect);
    app.affordance_area = Some(rect);
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    app.input_area = Some(area);

    let pending = app.store.pending();
    let border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if pending {
        let spinner = SPINNER[app.animation_frame as usize % SPINNER.len()];
        Span::styled(
            format!(" {spinner} Waiting for reply "),
            Style::default().fg(Color::Yellow),
        )
    } else if app.composer.can_submit(pending) {
        Span::styled(" Message (Enter to send) ", Style::default().fg(Color::White))
    } else {
        Span::raw(" Message ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor in view
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) =
        input_window(app.composer.draft(), app.composer.cursor(), inner_width);

    let input = if app.composer.draft().is_empty() {
        Paragraph::new(PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input.block(input_block), area);

    if app.input_mode == InputMode::Editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// The part of `draft` that fits in `width` columns with the cursor in view,
/// and the cursor's column within it. `cursor` is a char index.
fn input_window(draft: &str, cursor: usize, width: usize) -> (String, u16) {
    if width == 0 {
        return (String::new(), 0);
    }

    let cells: Vec<(char, usize)> = draft
        .chars()
        .map(|c| (c, c.width().unwrap_or(0)))
        .collect();
    let cursor = cursor.min(cells.len());

    // The cursor needs a cell of its own, as wide as the char under it
    let mut used = cells.get(cursor).map_or(1, |(_, w)| (*w).max(1));
    let mut start = cursor;
    while start > 0 && used + cells[start - 1].1 <= width {
        start -= 1;
        used += cells[start].1;
    }

    let mut visible = String::new();
    let mut visible_width = 0;
    for &(c, w) in &cells[start..] {
        if visible_width + w > width {
            break;
        }
        visible.push(c);
        visible_width += w;
    }

    let cursor_x: usize = cells[start..cursor].iter().map(|(_, w)| w).sum();
    (visible, cursor_x as u16)
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let empty = app.store.is_empty();
    let mut hints: Vec<Span> = Vec::new();
    match app.input_mode {
        InputMode::Editing => {
            if empty {
                hints.extend(hint(" ↑/↓ ", " examples "));
            }
            hints.extend(hint(" Enter ", " send "));
            hints.extend(hint(" Esc ", " normal "));
            hints.extend(hint(" ^R ", " retry "));
            hints.extend(hint(" ^C ", " quit "));
        }
        InputMode::Normal => {
            if empty {
                hints.extend(hint(" 1-3 ", " example "));
            } else {
                hints.extend(hint(" j/k ", " scroll "));
                hints.extend(hint(" G ", " bottom "));
            }
            hints.extend(hint(" i ", " type "));
            hints.extend(hint(" r ", " retry "));
            hints.extend(hint(" q ", " quit "));
        }
    }

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)];
    spans.extend(hints);
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(
            format!("  {notice}"),
            Style::default().fg(Color::Yellow).bg(Color::Black),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, Terminal};
    use syncai_core::{CompletionClient, CompletionResult, ConversationStore, Provider};

    use super::*;

    struct FixedClient(&'static str);

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn generate(&self, _prompt: &str) -> CompletionResult<String> {
            Ok(self.0.to_string())
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    fn app(reply: &'static str) -> App {
        App::new(ConversationStore::new(Arc::new(FixedClient(reply))), Provider::Gemini)
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn empty_transcript_shows_welcome_and_examples() {
        let mut app = app("unused");
        let screen = draw(&mut app, 90, 24);

        assert!(screen.contains("Welcome to SyncAI"));
        assert!(screen.contains(EXAMPLE_PROMPTS[0]));
        assert!(screen.contains(PLACEHOLDER));
        assert!(screen.contains("Powered by Gemini"));
        assert_eq!(app.example_areas.len(), EXAMPLE_PROMPTS.len());
        assert!(app.affordance_area.is_none());
    }

    #[tokio::test]
    async fn pending_turn_shows_thinking_and_answer_replaces_it() {
        let mut app = app("four");
        app.composer.on_example_selected("2+2?");
        app.submit();

        let screen = draw(&mut app, 60, 20);
        assert!(screen.contains("2+2?"));
        assert!(screen.contains("Thinking"));
        assert!(!screen.contains("Welcome"));

        app.store.settle_next().await;
        app.sync_store();
        let screen = draw(&mut app, 60, 20);
        assert!(screen.contains("▌ four"));
        assert!(!screen.contains("Thinking"));
    }

    #[tokio::test]
    async fn long_transcript_follows_tail_until_reader_scrolls_up() {
        let reply: &'static str = "line\n\nline\n\nline\n\nline\n\nline\n\nline\n\nline\n\nend";
        let mut app = app(reply);
        app.composer.on_example_selected("go");
        app.submit();
        app.store.settle_next().await;
        app.sync_store();

        draw(&mut app, 40, 14);
        assert_eq!(app.scroll_offset, app.max_scroll());
        assert!(app.scroll.at_bottom());

        app.scroll_to_top();
        let screen = draw(&mut app, 40, 14);
        assert!(screen.contains("Scroll down"));
        assert!(app.affordance_area.is_some());
    }

    #[test]
    fn input_window_measures_wide_chars_in_columns() {
        let draft = "你好世界abc";

        assert_eq!(input_window(draft, 7, 6), ("界abc".to_string(), 5));
        assert_eq!(input_window(draft, 0, 6), ("你好世".to_string(), 0));
        assert_eq!(input_window(draft, 2, 6), ("你好世".to_string(), 4));
        assert_eq!(input_window("hello", 5, 10), ("hello".to_string(), 5));
    }

    #[test]
    fn user_bubble_is_right_aligned_and_narrower_than_view() {
        let rendered = vec![Line::from("hello there")];
        let bubble = user_bubble(&rendered, 40);

        assert_eq!(bubble.len(), 1);
        assert_eq!(bubble[0].alignment, Some(ratatui::layout::Alignment::Right));
        assert_eq!(bubble[0].width(), "hello there".len() + 2);
    }
}
