use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use regex::Regex;
use strum::IntoEnumIterator;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{
    recipe_meta, recipe_preview, AppState, NewRecipeField, OverlayState, PlannerScreen, Screen,
    SearchHit, SearchRow, EMPTY_RESULTS,
};
use crate::calendar::{format_iso_date, short_month, short_weekday};
use crate::config::themes::Palette;
use crate::highlight::{build_highlight_regex, split_matches};
use crate::recent::RecentSearchKind;
use crate::storage::Recipe;

pub fn draw_app(frame: &mut Frame, state: &AppState, palette: &Palette, list_state: &mut ListState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(frame.size());

    frame.render_widget(build_tabs(state, palette), vertical[0]);

    match state.screen {
        Screen::Home => draw_home(frame, state, palette, list_state, vertical[1]),
        Screen::Search => draw_search(frame, state, palette, list_state, vertical[1]),
        Screen::Planner => draw_planner(frame, state, palette, list_state, vertical[1]),
        Screen::Collections => draw_collections(frame, state, palette, list_state, vertical[1]),
        Screen::Notifications => draw_notifications(frame, state, palette, list_state, vertical[1]),
    }

    let status = build_status_line(state, palette);
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(palette.muted)),
        vertical[2],
    );

    render_overlay(frame, state, palette);
}

fn build_tabs(state: &AppState, palette: &Palette) -> Tabs<'static> {
    let titles: Vec<Line<'static>> = Screen::iter()
        .enumerate()
        .map(|(idx, screen)| {
            let label = if screen == Screen::Notifications && state.unread > 0 {
                format!("{} {screen} ({})", idx + 1, state.unread)
            } else {
                format!("{} {screen}", idx + 1)
            };
            Line::from(label)
        })
        .collect();
    let selected = Screen::iter()
        .position(|screen| screen == state.screen)
        .unwrap_or(0);
    Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(palette.muted))
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )
}

fn draw_home(
    frame: &mut Frame,
    state: &AppState,
    palette: &Palette,
    list_state: &mut ListState,
    area: Rect,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let width = columns[0].width.saturating_sub(4) as usize;
    let mut items: Vec<ListItem> = state
        .home
        .recipes
        .iter()
        .map(|recipe| recipe_item(recipe, state.preview_lines, None, palette, width))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new(if state.home.saved_only {
            "No saved recipes yet. Press s on a recipe to save it."
        } else {
            "No recipes yet. Press n to publish one."
        }));
        list_state.select(None);
    } else {
        list_state.select(Some(state.home.selected));
    }
    let title = if state.home.saved_only {
        "Saved recipes"
    } else {
        "Recipes"
    };
    frame.render_stateful_widget(selectable_list(items, title, palette), columns[0], list_state);

    let detail = match state.home.selected_recipe() {
        Some(recipe) => recipe_detail(recipe, None, palette),
        None => Text::from(""),
    };
    frame.render_widget(
        Paragraph::new(detail)
            .block(Block::default().title("Recipe").borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        columns[1],
    );
}

fn draw_search(
    frame: &mut Frame,
    state: &AppState,
    palette: &Palette,
    list_state: &mut ListState,
    area: Rect,
) {
    let search = &state.search;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let mut input = search.input.clone();
    if search.editing {
        input.push('▌');
    }
    let chips = search.query.filter_chips();
    let input_title = if chips.is_empty() {
        "Search".to_string()
    } else {
        format!("Search [{}]", chips.join(" "))
    };
    let border = if search.editing {
        Style::default().fg(palette.accent)
    } else {
        Style::default()
    };
    frame.render_widget(
        Paragraph::new(input).block(
            Block::default()
                .title(input_title)
                .borders(Borders::ALL)
                .border_style(border),
        ),
        rows[0],
    );

    let regex = build_highlight_regex(&search.highlight_terms());
    let width = rows[1].width.saturating_sub(4) as usize;
    let mut items: Vec<ListItem> = search
        .rows()
        .into_iter()
        .map(|row| match row {
            SearchRow::Recent(entry) => {
                let tag = match entry.kind {
                    RecentSearchKind::User => "@",
                    RecentSearchKind::Query => "?",
                    RecentSearchKind::Recipe => "#",
                };
                let mut spans = vec![
                    Span::styled(format!("{tag} "), Style::default().fg(palette.muted)),
                    Span::raw(entry.label.clone()),
                ];
                if let Some(secondary) = &entry.secondary {
                    spans.push(Span::styled(
                        format!("  {secondary}"),
                        Style::default().fg(palette.muted),
                    ));
                }
                ListItem::new(Line::from(spans))
            }
            SearchRow::Hit(SearchHit::User(user)) => {
                let mut spans = vec![Span::styled("@", Style::default().fg(palette.accent))];
                spans.extend(highlight_line(
                    &user.username,
                    regex.as_ref(),
                    palette,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::styled(
                    format!("  {} · {} recipes", user.display_name, user.recipe_count),
                    Style::default().fg(palette.muted),
                ));
                ListItem::new(Line::from(spans))
            }
            SearchRow::Hit(SearchHit::Recipe(recipe)) => {
                recipe_item(recipe, state.preview_lines, regex.as_ref(), palette, width)
            }
        })
        .collect();

    if let Some(message) = search.empty_message() {
        items.push(ListItem::new(Span::styled(
            message,
            Style::default().fg(palette.muted),
        )));
        list_state.select(None);
    } else {
        list_state.select(Some(search.selected));
    }

    let title = match (&search.author, search.showing_recent()) {
        (Some(user), _) => format!("Recipes by {}", user.display_name),
        (None, true) => "Recent searches".to_string(),
        (None, false) => format!("Results ({})", search.hits.len()),
    };
    frame.render_stateful_widget(selectable_list(items, &title, palette), rows[1], list_state);
}

fn draw_planner(
    frame: &mut Frame,
    state: &AppState,
    palette: &Palette,
    list_state: &mut ListState,
    area: Rect,
) {
    let planner = &state.planner;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(20)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(9)])
        .split(columns[0]);

    frame.render_widget(
        Paragraph::new(week_strip_line(planner, palette))
            .block(Block::default().title("This week").borders(Borders::ALL)),
        left[0],
    );
    frame.render_widget(
        Paragraph::new(month_grid_lines(planner, palette)).block(
            Block::default()
                .title(format!("{} {}", planner.grid.month, planner.grid.year))
                .borders(Borders::ALL),
        ),
        left[1],
    );

    let meals = planner.meals_for_selected();
    let mut items: Vec<ListItem> = meals
        .iter()
        .map(|meal| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", meal.meal.to_string()),
                    Style::default().fg(palette.accent),
                ),
                Span::raw(meal.recipe_title.clone()),
            ]))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new(Span::styled(
            "Nothing planned. Select a recipe on Home and press p.",
            Style::default().fg(palette.muted),
        )));
        list_state.select(None);
    } else {
        list_state.select(Some(planner.selected_meal));
    }
    let title = format!("Meals on {}", format_iso_date(planner.selected_date));
    frame.render_stateful_widget(selectable_list(items, &title, palette), columns[1], list_state);
}

fn week_strip_line(planner: &PlannerScreen, palette: &Palette) -> Line<'static> {
    let mut spans = Vec::new();
    for ((_, month), days) in planner.strip.by_month() {
        if !spans.is_empty() {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            format!("{} ", short_month(month)),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ));
        for day in days {
            spans.push(Span::styled(
                format!("{:>2} ", day.date.day()),
                day_style(planner, day.date, day.is_today(), true, palette),
            ));
        }
    }
    Line::from(spans)
}

fn month_grid_lines(planner: &PlannerScreen, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(7);
    let header: Vec<Span<'static>> = planner
        .week_start
        .columns()
        .iter()
        .map(|day| {
            Span::styled(
                format!(" {} ", short_weekday(*day)),
                Style::default().fg(palette.muted),
            )
        })
        .collect();
    lines.push(Line::from(header));
    for week in planner.grid.weeks() {
        let spans: Vec<Span<'static>> = week
            .iter()
            .map(|day| {
                let marker = if planner.meals_on(day.date).is_empty() {
                    ' '
                } else {
                    '•'
                };
                Span::styled(
                    format!("{:>3}{marker}", day.date.day()),
                    day_style(planner, day.date, day.is_today(), day.in_month(), palette),
                )
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines
}

fn day_style(
    planner: &PlannerScreen,
    date: time::Date,
    today: bool,
    in_month: bool,
    palette: &Palette,
) -> Style {
    let mut style = if in_month {
        Style::default()
    } else {
        Style::default().fg(palette.outside_month)
    };
    if today {
        style = style.fg(palette.today).add_modifier(Modifier::BOLD);
    }
    if date == planner.selected_date {
        style = style
            .bg(palette.selection_bg)
            .fg(palette.selection_fg);
    }
    style
}

fn draw_collections(
    frame: &mut Frame,
    state: &AppState,
    palette: &Palette,
    list_state: &mut ListState,
    area: Rect,
) {
    let collections = &state.collections;
    let width = area.width.saturating_sub(4) as usize;
    if let Some(open) = &collections.open {
        let mut items: Vec<ListItem> = open
            .recipes
            .iter()
            .map(|recipe| recipe_item(recipe, state.preview_lines, None, palette, width))
            .collect();
        if items.is_empty() {
            items.push(ListItem::new("Empty collection. Press a on the list to add the Home recipe."));
            list_state.select(None);
        } else {
            list_state.select(Some(open.selected));
        }
        let title = format!("{} (Esc back, x remove)", open.collection.name);
        frame.render_stateful_widget(selectable_list(items, &title, palette), area, list_state);
        return;
    }

    let mut items: Vec<ListItem> = collections
        .collections
        .iter()
        .map(|collection| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    collection.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {} recipes", collection.recipe_count),
                    Style::default().fg(palette.muted),
                ),
            ]))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No collections. Press n to create one."));
        list_state.select(None);
    } else {
        list_state.select(Some(collections.selected));
    }
    frame.render_stateful_widget(
        selectable_list(items, "Collections", palette),
        area,
        list_state,
    );
}

fn draw_notifications(
    frame: &mut Frame,
    state: &AppState,
    palette: &Palette,
    list_state: &mut ListState,
    area: Rect,
) {
    let notifications = &state.notifications;
    let mut items: Vec<ListItem> = notifications
        .items
        .iter()
        .map(|notification| {
            let style = if notification.read {
                Style::default()
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{}  ", format_epoch_date(notification.created_at)),
                    Style::default().fg(palette.muted),
                ),
                Span::styled(notification.message.clone(), style),
            ]))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No notifications."));
        list_state.select(None);
    } else {
        list_state.select(Some(notifications.selected));
    }
    frame.render_stateful_widget(
        selectable_list(items, "Notifications", palette),
        area,
        list_state,
    );
}

fn selectable_list<'a>(items: Vec<ListItem<'a>>, title: &str, palette: &Palette) -> List<'a> {
    List::new(items)
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent)),
        )
        .highlight_style(
            Style::default()
                .bg(palette.selection_bg)
                .fg(palette.selection_fg),
        )
        .highlight_symbol("> ")
}

fn recipe_item(
    recipe: &Recipe,
    preview_lines: usize,
    regex: Option<&Regex>,
    palette: &Palette,
    width: usize,
) -> ListItem<'static> {
    let mut title = Vec::new();
    if recipe.saved {
        title.push(Span::styled(
            "★ ",
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD),
        ));
    }
    title.extend(highlight_line(
        &recipe.title,
        regex,
        palette,
        Style::default().add_modifier(Modifier::BOLD),
    ));
    let mut lines = vec![
        Line::from(title),
        Line::from(Span::styled(
            recipe_meta(recipe),
            Style::default().fg(palette.muted),
        )),
    ];
    for line in recipe_preview(recipe, preview_lines).lines() {
        lines.push(Line::from(highlight_line(
            &truncate_to_width(line, width),
            regex,
            palette,
            Style::default(),
        )));
    }
    ListItem::new(lines)
}

fn recipe_detail(recipe: &Recipe, regex: Option<&Regex>, palette: &Palette) -> Text<'static> {
    let heading = Style::default()
        .fg(palette.accent)
        .add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(highlight_line(
            &recipe.title,
            regex,
            palette,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            recipe_meta(recipe),
            Style::default().fg(palette.muted),
        )),
    ];
    if let Some(url) = &recipe.image_url {
        lines.push(Line::from(Span::styled(
            format!("Image: {url}"),
            Style::default().fg(palette.muted),
        )));
    }
    if !recipe.description.is_empty() {
        lines.push(Line::from(""));
        for line in recipe.description.lines() {
            lines.push(Line::from(line.to_string()));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Ingredients", heading)));
    for ingredient in &recipe.ingredients {
        lines.push(Line::from(format!("  • {ingredient}")));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Steps", heading)));
    for (idx, step) in recipe.steps.iter().enumerate() {
        lines.push(Line::from(format!("  {}. {step}", idx + 1)));
    }
    Text::from(lines)
}

fn build_status_line(state: &AppState, palette: &Palette) -> Text<'static> {
    let hints = match state.screen {
        Screen::Home => "n new • s save • S saved only • p plan • / search • Enter open",
        Screen::Search => "/ edit • Enter open • d remove recent • C clear recent • Esc back",
        Screen::Planner => "h/l day • [/] month • t today • x remove • Enter open",
        Screen::Collections => "n new • a add Home recipe • d delete • Enter open • Esc back",
        Screen::Notifications => "Enter open recipe",
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{} ", state.screen),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("| {hints} | Tab/1-5 switch • q quit")),
    ])];
    if let Some(message) = &state.status_message {
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(palette.highlight),
        )));
    }
    Text::from(lines)
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    palette: &Palette,
    base_style: Style,
) -> Vec<Span<'static>> {
    let highlight_style = Style::default()
        .fg(palette.highlight)
        .add_modifier(Modifier::BOLD);
    split_matches(text, regex)
        .into_iter()
        .map(|(fragment, hit)| {
            Span::styled(
                fragment.to_string(),
                if hit { highlight_style } else { base_style },
            )
        })
        .collect()
}

/// Cuts `text` to at most `width` terminal columns, marking the cut with `…`.
fn truncate_to_width(text: &str, width: usize) -> String {
    if width == 0 || text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if used + w + 1 > width {
            break;
        }
        out.push_str(grapheme);
        used += w;
    }
    out.push('…');
    out
}

fn format_epoch_date(timestamp: i64) -> String {
    time::OffsetDateTime::from_unix_timestamp(timestamp)
        .map(|dt| format_iso_date(dt.date()))
        .unwrap_or_else(|_| timestamp.to_string())
}

fn render_overlay(frame: &mut Frame, state: &AppState, palette: &Palette) {
    let hint = Style::default().fg(palette.muted);
    let border = Style::default().fg(palette.accent);
    match state.overlay() {
        Some(OverlayState::NewRecipe(draft)) => {
            let area = centered_rect(60, 40, frame.size());
            frame.render_widget(Clear, area);
            let field = |label: &str, value: &str, active: bool| {
                let mut value = value.to_string();
                let style = if active {
                    value.push('▌');
                    Style::default().fg(palette.accent)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(format!("{label:<10}"), style.add_modifier(Modifier::BOLD)),
                    Span::styled(value, style),
                ])
            };
            let paragraph = Paragraph::new(vec![
                field("Title", &draft.title, draft.field == NewRecipeField::Title),
                field(
                    "Category",
                    &draft.category,
                    draft.field == NewRecipeField::Category,
                ),
                field(
                    "Minutes",
                    &draft.minutes,
                    draft.field == NewRecipeField::Minutes,
                ),
                Line::from(""),
                Line::from(Span::styled(
                    "Tab next field • Enter publish • Esc cancel",
                    hint,
                )),
            ])
            .block(
                Block::default()
                    .title("New Recipe")
                    .borders(Borders::ALL)
                    .border_style(border),
            )
            .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::NewCollection(draft)) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let mut name = draft.name.clone();
            name.push('▌');
            let paragraph = Paragraph::new(vec![
                Line::from(name),
                Line::from(""),
                Line::from(Span::styled("Enter to create • Esc to cancel", hint)),
            ])
            .block(
                Block::default()
                    .title("New Collection")
                    .borders(Borders::ALL)
                    .border_style(border),
            );
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::DeleteCollection { name, .. }) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let paragraph = Paragraph::new(vec![
                Line::from(format!("Delete collection '{name}'?")),
                Line::from("Recipes stay in the feed."),
                Line::from(""),
                Line::from(Span::styled("Enter to delete • Esc to cancel", hint)),
            ])
            .block(
                Block::default()
                    .title("Delete Collection")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.error)),
            );
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::PlanMeal(draft)) => {
            let area = centered_rect(50, 30, frame.size());
            frame.render_widget(Clear, area);
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    draft.recipe_title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(format!("Day:  {}", format_iso_date(draft.date))),
                Line::from(vec![
                    Span::raw("Meal: "),
                    Span::styled(
                        draft.meal.to_string(),
                        Style::default()
                            .fg(palette.accent)
                            .add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "Tab change meal • Enter plan • Esc cancel",
                    hint,
                )),
            ])
            .block(
                Block::default()
                    .title("Plan Meal")
                    .borders(Borders::ALL)
                    .border_style(border),
            );
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::RecipeDetail(recipe)) => {
            let area = centered_rect(70, 80, frame.size());
            frame.render_widget(Clear, area);
            let regex = if state.screen == Screen::Search {
                build_highlight_regex(&state.search.highlight_terms())
            } else {
                None
            };
            let mut text = recipe_detail(recipe, regex.as_ref(), palette);
            text.lines.push(Line::from(""));
            text.lines.push(Line::from(Span::styled(
                "s save/unsave • Esc close",
                hint,
            )));
            let paragraph = Paragraph::new(text)
                .block(
                    Block::default()
                        .title("Recipe")
                        .borders(Borders::ALL)
                        .border_style(border),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        None => {}
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}
