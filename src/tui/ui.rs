use crate::tui::app::{App, Mode, expand_tabs};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

const HELP: &[(&str, &str)] = &[
    ("Enter", "run query"),
    ("Up/Down, Tab", "move selection"),
    ("Ctrl+P", "toggle full preview"),
    ("Ctrl+O", "open in $EDITOR"),
    ("Ctrl+Y", "activate (compose to output file)"),
    ("F5", "rebuild index"),
    ("Esc", "clear query / quit"),
    ("", ""),
    ("tag:api", "tag prefix"),
    ("type:prompt", "pipeline, component, prompts, contexts, rules"),
    ("name:auth", "name substring"),
    ("content:\"x y\"", "content phrase; bare words too"),
    ("modified:>7d", "changed within 7 days"),
    ("modified:<1m", "unchanged for over a month"),
    ("status:archived", "include the archive"),
    ("AND OR NOT", "left to right, AND implied"),
];

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Query input
            Constraint::Min(10),   // Results / Preview
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_query_input(f, app, chunks[0]);
    draw_main_area(f, app, chunks[1]);
    draw_status_bar(f, app, chunks[2]);

    if app.mode == Mode::Help {
        draw_help(f, f.area());
    }
}

fn draw_query_input(f: &mut Frame, app: &App, area: Rect) {
    let input = Paragraph::new(app.query.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Query (Enter: search, ?: help, Esc: quit) "),
        );

    f.render_widget(input, area);

    if app.mode == Mode::Search {
        let width = app.query.chars().count() as u16;
        f.set_cursor_position((area.x + width + 1, area.y + 1));
    }
}

fn draw_main_area(f: &mut Frame, app: &App, area: Rect) {
    let mode = if app.mode == Mode::Help {
        app.previous_mode
    } else {
        app.mode
    };
    match mode {
        Mode::Preview => draw_preview(f, app, area),
        _ => {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
                .split(area);

            draw_results_list(f, app, chunks[0]);
            draw_preview(f, app, chunks[1]);
        }
    }
}

fn draw_results_list(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .results
        .iter()
        .map(|hit| {
            let item = &hit.item;
            let kind_style = Style::default().fg(Color::Magenta);
            let name_style = if item.archived {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            let tag_style = Style::default().fg(Color::Cyan);

            let mut spans = vec![
                Span::styled(format!("{:9}", item.type_label()), kind_style),
                Span::styled(item.name.clone(), name_style),
            ];
            if !item.tags.is_empty() {
                spans.push(Span::styled(format!(" [{}]", item.tags.join(", ")), tag_style));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Results ({}) ", app.results.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.results.is_empty() {
        state.select(Some(app.selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_preview(f: &mut Frame, app: &App, area: Rect) {
    let Some(item) = app.selected_item() else {
        let empty = Paragraph::new("No preview available")
            .block(Block::default().borders(Borders::ALL).title(" Preview "));
        f.render_widget(empty, area);
        return;
    };

    let label = Style::default().fg(Color::Green);
    let mut lines = vec![
        Line::from(vec![Span::styled("path     ", label), Span::raw(item.path.clone())]),
        Line::from(vec![Span::styled("tags     ", label), Span::raw(item.tags.join(", "))]),
        Line::from(vec![
            Span::styled("modified ", label),
            Span::raw(item.modified.format("%Y-%m-%d %H:%M").to_string()),
        ]),
        Line::from(vec![
            Span::styled("tokens   ", label),
            Span::raw(format!("~{}", item.token_count)),
        ]),
    ];
    if item.is_component() {
        lines.push(Line::from(vec![
            Span::styled("used by  ", label),
            Span::raw(format!("{} pipeline(s)", item.usage_count)),
        ]));
    }
    lines.push(Line::raw(""));

    let marked = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let content = expand_tabs(&item.content);
    lines.extend(
        content
            .lines()
            .skip(app.preview_scroll)
            .take(area.height.saturating_sub(2) as usize)
            .map(|line| {
                let lower = line.to_lowercase();
                if app.content_terms.iter().any(|t| lower.contains(t.as_str())) {
                    Line::styled(line.to_string(), marked)
                } else {
                    Line::raw(line.to_string())
                }
            }),
    );

    let preview = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", item.name)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(preview, area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let status = Paragraph::new(app.status_line()).style(Style::default().fg(Color::Cyan));

    f.render_widget(status, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let width = area.width.min(64);
    let height = area.height.min(HELP.len() as u16 + 2);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let key_style = Style::default().fg(Color::Yellow);
    let lines: Vec<Line> = HELP
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(format!("{key:16}"), key_style),
                Span::raw(*desc),
            ])
        })
        .collect();

    let help = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help (any key to close) "),
    );
    f.render_widget(Clear, popup);
    f.render_widget(help, popup);
}
