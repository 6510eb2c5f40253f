//! Markdown to styled terminal lines
//!
//! Model output is untrusted: raw HTML is shown as literal text and links are
//! printed, never followed.

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const RULE_WIDTH: usize = 32;

fn code_style() -> Style {
    Style::default().fg(Color::LightYellow)
}

fn dim_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

struct TableBuilder {
    alignments: Vec<Alignment>,
    rows: Vec<Vec<Vec<Span<'static>>>>,
    header_rows: usize,
    current_row: Vec<Vec<Span<'static>>>,
    current_cell: Vec<Span<'static>>,
}

impl TableBuilder {
    fn new(alignments: Vec<Alignment>) -> Self {
        Self {
            alignments,
            rows: Vec::new(),
            header_rows: 0,
            current_row: Vec::new(),
            current_cell: Vec::new(),
        }
    }

    fn finish_cell(&mut self) {
        self.current_row.push(std::mem::take(&mut self.current_cell));
    }

    fn finish_row(&mut self) {
        if !self.current_row.is_empty() {
            self.rows.push(std::mem::take(&mut self.current_row));
        }
    }

    fn render(self) -> Vec<Line<'static>> {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Vec::new();
        }

        let mut widths = vec![0usize; columns];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(spans_width(cell));
            }
        }

        let border = |left: &str, mid: &str, right: &str| {
            let body = widths
                .iter()
                .map(|w| "─".repeat(w + 2))
                .collect::<Vec<_>>()
                .join(mid);
            Line::from(Span::styled(format!("{left}{body}{right}"), dim_style()))
        };

        let mut lines = vec![border("┌", "┬", "┐")];
        for (row_idx, row) in self.rows.into_iter().enumerate() {
            let mut spans = vec![Span::styled("│", dim_style())];
            let mut cells = row.into_iter();
            for (col, width) in widths.iter().enumerate() {
                let cell = cells.next().unwrap_or_default();
                let gap = width - spans_width(&cell);
                let (before, after) = match self.alignments.get(col) {
                    Some(Alignment::Right) => (gap, 0),
                    Some(Alignment::Center) => (gap / 2, gap - gap / 2),
                    _ => (0, gap),
                };
                spans.push(Span::raw(" ".repeat(before + 1)));
                if row_idx < self.header_rows {
                    spans.extend(cell.into_iter().map(|s| {
                        let style = s.style.add_modifier(Modifier::BOLD);
                        Span::styled(s.content, style)
                    }));
                } else {
                    spans.extend(cell);
                }
                spans.push(Span::raw(" ".repeat(after + 1)));
                spans.push(Span::styled("│", dim_style()));
            }
            lines.push(Line::from(spans));

            if row_idx + 1 == self.header_rows {
                lines.push(border("├", "┼", "┤"));
            }
        }
        lines.push(border("└", "┴", "┘"));
        lines
    }
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|s| s.content.width()).sum()
}

struct Renderer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    list_stack: Vec<Option<u64>>,
    quote_depth: usize,
    code_block: Option<String>,
    link_targets: Vec<String>,
    table: Option<TableBuilder>,
}

impl Renderer {
    fn new(base: Style) -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
            style_stack: vec![base],
            list_stack: Vec::new(),
            quote_depth: 0,
            code_block: None,
            link_targets: Vec::new(),
            table: None,
        }
    }

    fn style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, patch: Style) {
        let style = self.style().patch(patch);
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn push_span(&mut self, span: Span<'static>) {
        match self.table.as_mut() {
            Some(table) => table.current_cell.push(span),
            None => self.current.push(span),
        }
    }

    fn push_text(&mut self, text: &str) {
        let style = self.style();
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush_line();
            }
            if !part.is_empty() {
                self.push_span(Span::styled(part.to_string(), style));
            }
        }
    }

    fn flush_line(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let mut spans = self.quote_prefix();
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn quote_prefix(&self) -> Vec<Span<'static>> {
        (0..self.quote_depth)
            .map(|_| Span::styled("│ ", Style::default().fg(Color::Cyan)))
            .collect()
    }

    fn blank_line(&mut self) {
        self.flush_line();
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some(buffer) = self.code_block.as_mut() {
                    buffer.push_str(&text);
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                let style = self.style().patch(code_style());
                self.push_span(Span::styled(code.to_string(), style));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = self.style().patch(dim_style());
                for (i, part) in html.split('\n').enumerate() {
                    if i > 0 {
                        self.flush_line();
                    }
                    if !part.is_empty() {
                        self.push_span(Span::styled(part.to_string(), style));
                    }
                }
            }
            Event::SoftBreak => self.push_span(Span::raw(" ")),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.lines
                    .push(Line::from(Span::styled("─".repeat(RULE_WIDTH), dim_style())));
                self.blank_line();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_span(Span::styled(marker, Style::default().fg(Color::Green)));
            }
            Event::FootnoteReference(label) => {
                self.push_span(Span::styled(format!("[^{label}]"), dim_style()));
            }
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { level, .. } => {
                self.flush_line();
                let mut style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
                if level == HeadingLevel::H1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                self.push_style(style);
            }
            Tag::BlockQuote => {
                self.flush_line();
                self.quote_depth += 1;
                self.push_style(Style::default().add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => {
                self.flush_line();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                if !lang.is_empty() {
                    self.lines
                        .push(Line::from(Span::styled(format!("  {lang}"), dim_style())));
                }
                self.code_block = Some(String::new());
            }
            Tag::List(start) => {
                self.flush_line();
                self.list_stack.push(start);
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.list_stack.len().saturating_sub(1);
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.current.push(Span::raw("  ".repeat(depth)));
                self.current
                    .push(Span::styled(marker, Style::default().fg(Color::Yellow)));
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link_targets.push(dest_url.to_string());
                self.push_style(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            Tag::Image { dest_url, .. } => {
                self.link_targets.push(dest_url.to_string());
                self.push_span(Span::styled("[image: ", dim_style()));
                self.push_style(Style::default());
            }
            Tag::Table(alignments) => {
                self.flush_line();
                self.table = Some(TableBuilder::new(alignments));
            }
            Tag::TableHead | Tag::TableRow => {}
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.current_cell.clear();
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.list_stack.is_empty() {
                    self.blank_line();
                } else {
                    self.flush_line();
                }
            }
            TagEnd::Heading(_) => {
                self.pop_style();
                self.blank_line();
            }
            TagEnd::BlockQuote => {
                self.flush_line();
                self.pop_style();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    self.blank_line();
                }
            }
            TagEnd::CodeBlock => {
                let code = self.code_block.take().unwrap_or_default();
                let prefix = self.quote_prefix();
                for line in code.trim_end_matches('\n').split('\n') {
                    let mut spans = prefix.clone();
                    spans.push(Span::styled("  ", code_style()));
                    spans.push(Span::styled(line.replace('\t', "    "), code_style()));
                    self.lines.push(Line::from(spans));
                }
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link_targets.pop() {
                    self.push_span(Span::styled(format!(" ({url})"), dim_style()));
                }
            }
            TagEnd::Image => {
                self.pop_style();
                if let Some(url) = self.link_targets.pop() {
                    self.push_span(Span::styled(format!("] ({url})"), dim_style()));
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.finish_cell();
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.finish_row();
                    table.header_rows = table.rows.len();
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.finish_row();
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    let prefix = self.quote_prefix();
                    for line in table.render() {
                        let mut spans = prefix.clone();
                        spans.extend(line.spans);
                        self.lines.push(Line::from(spans));
                    }
                }
                self.blank_line();
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Render markdown `text` into lines, starting from `base` style.
pub fn render_markdown(text: &str, base: Style) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);

    let mut renderer = Renderer::new(base);
    for event in Parser::new_ext(text, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

/// Word-wrap `lines` so that none is wider than `width` columns.
///
/// Styles and alignment survive the wrap. Words longer than `width` are split.
pub fn wrap_lines(lines: &[Line<'static>], width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return lines.to_vec();
    }

    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        if line.width() <= width {
            out.push(line.clone());
            continue;
        }

        let cells: Vec<(char, Style)> = line
            .spans
            .iter()
            .flat_map(|span| span.content.chars().map(move |c| (c, span.style)))
            .collect();

        let mut row: Vec<(char, Style)> = Vec::new();
        let mut row_width = 0;
        let mut last_break: Option<usize> = None;

        for (c, style) in cells {
            let w = c.width().unwrap_or(0);
            if row_width + w > width && !row.is_empty() {
                let rest = match last_break {
                    // Overflowing on a space: break right here and drop it.
                    _ if c == ' ' => Vec::new(),
                    Some(at) if at < row.len() => row.split_off(at),
                    _ => Vec::new(),
                };
                while row.last().is_some_and(|(c, _)| *c == ' ') {
                    row.pop();
                }
                out.push(restyle(line, &row));
                row = rest;
                row_width = row.iter().map(|(c, _)| c.width().unwrap_or(0)).sum();
                last_break = None;
            }
            if c == ' ' && row.is_empty() {
                continue;
            }
            row.push((c, style));
            row_width += w;
            if c == ' ' {
                last_break = Some(row.len());
            }
        }
        if !row.is_empty() {
            out.push(restyle(line, &row));
        }
    }
    out
}

fn restyle(template: &Line<'static>, cells: &[(char, Style)]) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut text = String::new();
    let mut style: Option<Style> = None;

    for (c, s) in cells {
        if style.is_some_and(|current| current != *s) {
            spans.push(Span::styled(std::mem::take(&mut text), style.unwrap_or_default()));
        }
        style = Some(*s);
        text.push(*c);
    }
    if !text.is_empty() {
        spans.push(Span::styled(text, style.unwrap_or_default()));
    }

    let mut line = Line::from(spans).style(template.style);
    if let Some(alignment) = template.alignment {
        line = line.alignment(alignment);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn render(text: &str) -> Vec<Line<'static>> {
        render_markdown(text, Style::default())
    }

    #[test]
    fn bold_and_italic_carry_modifiers() {
        let lines = render("plain **bold** and *soft*");
        assert_eq!(lines.len(), 1);
        let bold = lines[0].spans.iter().find(|s| s.content == "bold").unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        let soft = lines[0].spans.iter().find(|s| s.content == "soft").unwrap();
        assert!(soft.style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn inline_code_is_styled_without_backticks() {
        let lines = render("run `cargo test` now");
        assert_eq!(text_of(&lines[0]), "run cargo test now");
        let code = lines[0].spans.iter().find(|s| s.content == "cargo test").unwrap();
        assert_eq!(code.style.fg, Some(Color::LightYellow));
    }

    #[test]
    fn fenced_code_keeps_lines_verbatim() {
        let lines = render("```python\ndef f():\n    return **x**\n```");
        let texts: Vec<String> = lines.iter().map(text_of).collect();
        assert_eq!(texts, vec!["  python", "  def f():", "      return **x**"]);
    }

    #[test]
    fn table_is_drawn_with_borders() {
        let lines = render("| a | bb |\n|---|---:|\n| 1 | 2 |");
        let texts: Vec<String> = lines.iter().map(text_of).collect();
        assert_eq!(
            texts,
            vec![
                "┌───┬────┐",
                "│ a │ bb │",
                "├───┼────┤",
                "│ 1 │  2 │",
                "└───┴────┘",
            ]
        );
    }

    #[test]
    fn html_is_shown_literally() {
        let lines = render("<script>alert(1)</script>");
        let all: String = lines.iter().map(text_of).collect();
        assert!(all.contains("<script>alert(1)</script>"));
    }

    #[test]
    fn links_show_their_target() {
        let lines = render("see [docs](https://example.com)");
        assert_eq!(text_of(&lines[0]), "see docs (https://example.com)");
    }

    #[test]
    fn lists_get_markers() {
        let lines = render("- one\n- two\n\n1. first\n2. second");
        let texts: Vec<String> = lines.iter().map(text_of).collect();
        assert_eq!(texts, vec!["• one", "• two", "", "1. first", "2. second"]);
    }

    #[test]
    fn paragraphs_are_separated_by_one_blank_line() {
        let lines = render("first\n\nsecond");
        let texts: Vec<String> = lines.iter().map(text_of).collect();
        assert_eq!(texts, vec!["first", "", "second"]);
    }

    #[test]
    fn wrap_breaks_at_spaces_and_keeps_styles() {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let line = Line::from(vec![Span::raw("hello "), Span::styled("brave new", bold), Span::raw(" world")]);
        let wrapped = wrap_lines(&[line], 11);
        let texts: Vec<String> = wrapped.iter().map(text_of).collect();
        assert_eq!(texts, vec!["hello brave", "new world"]);
        assert!(wrapped.iter().all(|l| l.width() <= 11));
        assert_eq!(wrapped[1].spans[0].style, bold);
    }

    #[test]
    fn wrap_splits_words_longer_than_width() {
        let wrapped = wrap_lines(&[Line::from("abcdefghij")], 4);
        let texts: Vec<String> = wrapped.iter().map(text_of).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_counts_wide_characters() {
        let wrapped = wrap_lines(&[Line::from("日本語テキスト")], 6);
        assert!(wrapped.iter().all(|l| l.width() <= 6));
        assert_eq!(wrapped.len(), 3);
    }

    #[test]
    fn wrapped_rows_fit_the_width_ratatui_measures() {
        let text = "naïve café ❤ emoji 🎉 mixed 日本 text with combining e\u{301} and\u{00ad}soft hyphen";
        for width in 3..20 {
            let wrapped = wrap_lines(&[Line::from(text)], width);
            for line in &wrapped {
                let measured: usize = line
                    .spans
                    .iter()
                    .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
                    .sum();
                assert_eq!(measured, line.width());
                assert!(line.width() <= width, "{width}: {:?}", text_of(line));
            }
        }
    }
}
