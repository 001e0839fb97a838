use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::calendar::today_local;
use crate::config::themes::ThemeRegistry;
use crate::config::AppConfig;
use crate::recent::RecentSearchStore;
use crate::storage::StorageHandle;
use crate::ui;

mod actions;
pub mod state;

pub use state::{AppState, OverlayState, Screen, SearchHit, SearchRow};

use actions::ActionDispatcher;

enum Action {
    Quit,
    NextScreen,
    GoTo(Screen),
    SelectNext,
    SelectPrevious,
    Refresh,
    Open,
    Back,
    StartSearch,
    New,
    ToggleSaved,
    ToggleSavedOnly,
    PlanMeal,
    AddToCollection,
    Delete,
    RemoveFromList,
    ClearRecent,
    MoveDay(i64),
    ShiftMonth(i32),
    Today,
}

pub struct App {
    pub config: Arc<AppConfig>,
    pub storage: StorageHandle,
    recent: RecentSearchStore,
    state: AppState,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(
        config: Arc<AppConfig>,
        storage: StorageHandle,
        recent: RecentSearchStore,
    ) -> Result<Self> {
        let state = AppState::load(&storage, &recent, &config, today_local())
            .context("loading screens for initial state")?;
        Ok(Self {
            config,
            storage,
            recent,
            state,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let palette = ThemeRegistry::default().palette(self.config.theme);
        loop {
            terminal
                .draw(|frame| ui::draw_app(frame, &self.state, &palette, &mut self.list_state))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            if event::poll(self.tick_rate).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.handle_overlay_key(key) {
            return;
        }

        if self.state.screen == Screen::Search && self.state.search.editing {
            self.handle_search_input(key);
            return;
        }

        let plain = is_plain(key);
        let action = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Refresh)
            }
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Tab => Some(Action::NextScreen),
            KeyCode::Char(ch @ '1'..='5') if plain => Screen::from_digit(ch).map(Action::GoTo),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Enter => Some(Action::Open),
            KeyCode::Esc => Some(Action::Back),
            KeyCode::Char('/') if plain => Some(Action::StartSearch),
            KeyCode::Char('n') if plain => Some(Action::New),
            KeyCode::Char('s') if plain => Some(Action::ToggleSaved),
            KeyCode::Char('S') => Some(Action::ToggleSavedOnly),
            KeyCode::Char('p') if plain => Some(Action::PlanMeal),
            KeyCode::Char('a') if plain => Some(Action::AddToCollection),
            KeyCode::Char('d') if plain => Some(Action::Delete),
            KeyCode::Char('x') if plain => Some(Action::RemoveFromList),
            KeyCode::Char('C') => Some(Action::ClearRecent),
            KeyCode::Char('h') | KeyCode::Left => Some(Action::MoveDay(-1)),
            KeyCode::Char('l') | KeyCode::Right => Some(Action::MoveDay(1)),
            KeyCode::Char('[') => Some(Action::ShiftMonth(-1)),
            KeyCode::Char(']') => Some(Action::ShiftMonth(1)),
            KeyCode::Char('t') if plain => Some(Action::Today),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        let screen = self.state.screen;
        match action {
            Action::Quit => self.should_quit = true,
            Action::NextScreen => self.go_to(screen.next()),
            Action::GoTo(target) => self.go_to(target),
            Action::SelectNext => self.state.move_selection(1),
            Action::SelectPrevious => self.state.move_selection(-1),
            Action::Refresh => {
                if let Err(err) = self.state.refresh(&self.storage) {
                    tracing::error!(?err, "failed to refresh screens from storage");
                    self.state.set_status_message(Some("Refresh failed"));
                } else {
                    self.state.set_status_message(Some("Refreshed"));
                }
            }
            Action::Open => self.handle_open(),
            Action::Back => self.handle_back(),
            Action::StartSearch => {
                self.go_to(Screen::Search);
                self.state.search.begin_edit();
                self.state.set_status_message(Some(
                    "Type to search • title: by: category: max: • Enter keep • Esc clear",
                ));
            }
            Action::New => match screen {
                Screen::Home => {
                    self.state.open_new_recipe();
                    self.state
                        .set_status_message(Some("Tab next field • Enter publish • Esc cancel"));
                }
                Screen::Collections => self.state.open_new_collection(),
                _ => {}
            },
            Action::ToggleSaved => self.handle_toggle_saved(),
            Action::ToggleSavedOnly if screen == Screen::Home => {
                self.state.home.saved_only = !self.state.home.saved_only;
                self.state.home.selected = 0;
                if let Err(err) = self.state.home.refresh(&self.storage) {
                    tracing::error!(?err, "failed to reload home feed");
                    self.state.set_status_message(Some("Failed to load recipes"));
                } else if self.state.home.saved_only {
                    self.state.set_status_message(Some("Showing saved recipes"));
                } else {
                    self.state.set_status_message(Some("Showing all recipes"));
                }
            }
            Action::PlanMeal => {
                if !self.state.open_plan_meal() {
                    self.state
                        .set_status_message(Some("Select a recipe on Home first"));
                }
            }
            Action::AddToCollection if screen == Screen::Collections => {
                self.handle_add_to_collection()
            }
            Action::Delete => match screen {
                Screen::Search => self.handle_remove_recent(),
                Screen::Collections if self.state.collections.open.is_none() => {
                    self.state.open_delete_collection();
                }
                _ => {}
            },
            Action::RemoveFromList => match screen {
                Screen::Planner => self.handle_unplan(),
                Screen::Collections => self.handle_uncollect(),
                _ => {}
            },
            Action::ClearRecent if screen == Screen::Search => {
                if let Err(err) = self.state.search.clear_recent(&self.recent) {
                    tracing::error!(?err, "failed to clear recent searches");
                    self.state
                        .set_status_message(Some("Failed to clear recent searches"));
                } else {
                    self.state.set_status_message(Some("Recent searches cleared"));
                }
            }
            Action::MoveDay(delta) if screen == Screen::Planner => {
                self.state.planner.move_day(delta);
                self.reload_planner();
            }
            Action::ShiftMonth(delta) if screen == Screen::Planner => {
                self.state.planner.shift_month(delta);
                self.reload_planner();
            }
            Action::Today if screen == Screen::Planner => {
                self.state.planner.jump_to_today();
                self.reload_planner();
            }
            _ => {}
        }
    }

    fn go_to(&mut self, screen: Screen) {
        if let Err(err) = self.state.switch_screen(screen, &self.storage) {
            tracing::error!(?err, %screen, "failed to open screen");
            self.state
                .set_status_message(Some(format!("Failed to open {screen}")));
            return;
        }
        self.state.clear_status_message();
    }

    fn reload_planner(&mut self) {
        if let Err(err) = self.state.planner.refresh(&self.storage) {
            tracing::error!(?err, "failed to load meal plan");
            self.state.set_status_message(Some("Failed to load meal plan"));
        }
    }

    fn handle_open(&mut self) {
        match self.state.screen {
            Screen::Home => {
                if let Some(recipe) = self.state.home.selected_recipe().cloned() {
                    self.state.open_recipe_detail(recipe);
                }
            }
            Screen::Search => match self.state.search.activate(&self.storage, &self.recent) {
                Ok(Some(recipe)) => self.state.open_recipe_detail(recipe),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(?err, "failed to open search result");
                    self.state.set_status_message(Some(format!("{err}")));
                }
            },
            Screen::Collections => {
                if let Some(recipe) = self.state.collections.selected_open_recipe().cloned() {
                    self.state.open_recipe_detail(recipe);
                } else if let Err(err) = self.state.collections.open_selected(&self.storage) {
                    tracing::error!(?err, "failed to open collection");
                    self.state
                        .set_status_message(Some("Failed to open collection"));
                }
            }
            Screen::Planner => {
                let recipe_id = self
                    .state
                    .planner
                    .selected_meal()
                    .map(|meal| meal.recipe_id.clone());
                if let Some(recipe_id) = recipe_id {
                    self.open_recipe_by_id(&recipe_id);
                }
            }
            Screen::Notifications => {
                let recipe_id = self
                    .state
                    .notifications
                    .items
                    .get(self.state.notifications.selected)
                    .and_then(|notification| notification.recipe_id.clone());
                if let Some(recipe_id) = recipe_id {
                    self.open_recipe_by_id(&recipe_id);
                }
            }
        }
    }

    fn open_recipe_by_id(&mut self, recipe_id: &str) {
        match self.storage.fetch_recipe(recipe_id) {
            Ok(Some(recipe)) => self.state.open_recipe_detail(recipe),
            Ok(None) => self.state.set_status_message(Some("Recipe no longer exists")),
            Err(err) => {
                tracing::error!(?err, recipe_id, "failed to load recipe");
                self.state.set_status_message(Some("Failed to load recipe"));
            }
        }
    }

    fn handle_back(&mut self) {
        match self.state.screen {
            Screen::Search => match self.state.search.close_user(&self.storage) {
                Ok(true) => {}
                Ok(false) => self.state.search.cancel(&self.recent),
                Err(err) => {
                    tracing::error!(?err, "failed to restore search results");
                    self.state.set_status_message(Some("Search failed"));
                }
            },
            Screen::Collections => {
                self.state.collections.close();
            }
            _ => self.state.clear_status_message(),
        }
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        let result = match key.code {
            KeyCode::Esc => {
                self.state.search.cancel(&self.recent);
                Ok(())
            }
            KeyCode::Enter => self.state.search.submit(&self.storage, &self.recent),
            KeyCode::Backspace => self.state.search.pop_char(&self.storage),
            KeyCode::Down => {
                self.state.search.editing = false;
                self.state.search.move_selection(1);
                Ok(())
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                Ok(())
            }
            KeyCode::Char(ch) if is_plain(key) => self.state.search.push_char(&self.storage, ch),
            _ => Ok(()),
        };
        if let Err(err) = result {
            tracing::error!(?err, "search failed");
            self.state.set_status_message(Some("Search failed"));
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        let plain = is_plain(key);
        match self.state.overlay_mut() {
            Some(OverlayState::NewRecipe(draft)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Canceled new recipe"));
                    }
                    KeyCode::Enter => self.submit_new_recipe(),
                    KeyCode::Tab => draft.next_field(),
                    KeyCode::Backspace => draft.pop_char(),
                    KeyCode::Char(ch) if plain => draft.push_char(ch),
                    _ => {}
                }
                true
            }
            Some(OverlayState::NewCollection(draft)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Canceled new collection"));
                    }
                    KeyCode::Enter => self.submit_new_collection(),
                    KeyCode::Backspace => {
                        draft.name.pop();
                    }
                    KeyCode::Char(ch) if plain => draft.name.push(ch),
                    _ => {}
                }
                true
            }
            Some(OverlayState::DeleteCollection { .. }) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Delete canceled"));
                    }
                    KeyCode::Enter => self.submit_delete_collection(),
                    _ => {}
                }
                true
            }
            Some(OverlayState::PlanMeal(draft)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Canceled planning"));
                    }
                    KeyCode::Tab | KeyCode::Char(' ') => draft.cycle_meal(),
                    KeyCode::Enter => self.submit_plan_meal(),
                    _ => {}
                }
                true
            }
            Some(OverlayState::RecipeDetail(_)) => {
                match key.code {
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                        self.state.close_overlay()
                    }
                    KeyCode::Char('s') if plain => self.handle_toggle_saved(),
                    _ => {}
                }
                true
            }
            None => false,
        }
    }

    fn submit_new_recipe(&mut self) {
        let Some(OverlayState::NewRecipe(draft)) = self.state.overlay() else {
            return;
        };
        let recipe = match draft.to_new_recipe(&self.state.username) {
            Ok(recipe) => recipe,
            Err(err) => {
                self.state.set_status_message(Some(format!("{err}")));
                return;
            }
        };

        match ActionDispatcher::new(&self.storage).publish(&recipe) {
            Ok(recipe_id) => {
                self.state.close_overlay();
                self.state.home.saved_only = false;
                if let Err(err) = self.state.refresh(&self.storage) {
                    tracing::error!(?err, "failed to refresh after publishing");
                    self.state
                        .set_status_message(Some("Recipe published, refresh failed"));
                } else {
                    self.state.home.select_recipe_by_id(&recipe_id);
                    self.state.set_status_message(Some("Recipe published"));
                }
            }
            Err(err) => {
                tracing::error!(?err, "failed to publish recipe");
                self.state
                    .set_status_message(Some("Failed to publish recipe"));
            }
        }
    }

    fn submit_new_collection(&mut self) {
        let Some(OverlayState::NewCollection(draft)) = self.state.overlay() else {
            return;
        };
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            self.state.set_status_message(Some("Name cannot be empty"));
            return;
        }
        match ActionDispatcher::new(&self.storage).create_collection(&name) {
            Ok(id) => {
                self.state.close_overlay();
                if let Err(err) = self.state.collections.refresh(&self.storage) {
                    tracing::error!(?err, "failed to refresh collections");
                }
                self.state.collections.select_collection_by_id(id);
                self.state
                    .set_status_message(Some(format!("Created collection '{name}'")));
            }
            Err(err) => {
                tracing::warn!(?err, "failed to create collection");
                self.state.set_status_message(Some(format!("{err}")));
            }
        }
    }

    fn submit_delete_collection(&mut self) {
        let Some(OverlayState::DeleteCollection { id, name }) = self.state.overlay().cloned()
        else {
            return;
        };
        self.state.close_overlay();
        if let Err(err) = ActionDispatcher::new(&self.storage).delete_collection(id) {
            tracing::error!(?err, id, "failed to delete collection");
            self.state
                .set_status_message(Some("Failed to delete collection"));
            return;
        }
        if let Err(err) = self.state.collections.refresh(&self.storage) {
            tracing::error!(?err, "failed to refresh collections");
        }
        self.state
            .set_status_message(Some(format!("Deleted collection '{name}'")));
    }

    fn submit_plan_meal(&mut self) {
        let Some(OverlayState::PlanMeal(draft)) = self.state.overlay().cloned() else {
            return;
        };
        self.state.close_overlay();
        match ActionDispatcher::new(&self.storage).plan(draft.date, draft.meal, &draft.recipe_id) {
            Ok(_) => {
                self.reload_planner();
                if let Err(err) = self.state.refresh_unread(&self.storage) {
                    tracing::warn!(?err, "failed to count notifications");
                }
                self.state.set_status_message(Some(format!(
                    "Planned {} for {} on {}",
                    draft.recipe_title, draft.meal, draft.date
                )));
            }
            Err(err) => {
                tracing::error!(?err, "failed to plan meal");
                self.state.set_status_message(Some("Failed to plan meal"));
            }
        }
    }

    fn handle_toggle_saved(&mut self) {
        let Some(recipe) = self.state.focused_recipe() else {
            return;
        };
        let recipe_id = recipe.id.clone();
        let saved = !recipe.saved;
        if let Err(err) = ActionDispatcher::new(&self.storage).toggle_saved(&recipe_id, saved) {
            tracing::error!(?err, %recipe_id, "failed to toggle saved");
            self.state.set_status_message(Some("Failed to update recipe"));
            return;
        }
        if let Some(OverlayState::RecipeDetail(recipe)) = self.state.overlay_mut() {
            recipe.saved = saved;
        }
        for hit in &mut self.state.search.hits {
            if let SearchHit::Recipe(recipe) = hit {
                if recipe.id == recipe_id {
                    recipe.saved = saved;
                }
            }
        }
        if let Err(err) = self.state.refresh(&self.storage) {
            tracing::error!(?err, "failed to refresh after saving");
        }
        self.state.set_status_message(Some(if saved {
            "Recipe saved"
        } else {
            "Recipe removed from saved"
        }));
    }

    fn handle_add_to_collection(&mut self) {
        let Some(collection) = self.state.collections.selected_collection().cloned() else {
            self.state
                .set_status_message(Some("Create a collection first (n)"));
            return;
        };
        let Some(recipe) = self.state.home.selected_recipe().cloned() else {
            self.state
                .set_status_message(Some("Select a recipe on Home first"));
            return;
        };
        match ActionDispatcher::new(&self.storage).collect(collection.id, &recipe.id) {
            Ok(true) => {
                if let Err(err) = self.state.collections.refresh(&self.storage) {
                    tracing::error!(?err, "failed to refresh collections");
                }
                self.state.set_status_message(Some(format!(
                    "Added \"{}\" to {}",
                    recipe.title, collection.name
                )));
            }
            Ok(false) => self.state.set_status_message(Some(format!(
                "\"{}\" is already in {}",
                recipe.title, collection.name
            ))),
            Err(err) => {
                tracing::error!(?err, "failed to add recipe to collection");
                self.state
                    .set_status_message(Some("Failed to add to collection"));
            }
        }
    }

    fn handle_uncollect(&mut self) {
        let Some(open) = self.state.collections.open.as_ref() else {
            return;
        };
        let Some(recipe) = open.recipes.get(open.selected) else {
            return;
        };
        let (collection_id, recipe_id) = (open.collection.id, recipe.id.clone());
        if let Err(err) = ActionDispatcher::new(&self.storage).uncollect(collection_id, &recipe_id)
        {
            tracing::error!(?err, "failed to remove recipe from collection");
            self.state
                .set_status_message(Some("Failed to remove from collection"));
            return;
        }
        if let Err(err) = self.state.collections.refresh(&self.storage) {
            tracing::error!(?err, "failed to refresh collections");
        }
        self.state
            .set_status_message(Some("Removed from collection"));
    }

    fn handle_unplan(&mut self) {
        let Some(meal) = self.state.planner.selected_meal() else {
            return;
        };
        let plan_id = meal.id;
        if let Err(err) = ActionDispatcher::new(&self.storage).unplan(plan_id) {
            tracing::error!(?err, plan_id, "failed to remove planned meal");
            self.state
                .set_status_message(Some("Failed to remove planned meal"));
            return;
        }
        self.reload_planner();
        self.state.set_status_message(Some("Removed from plan"));
    }

    fn handle_remove_recent(&mut self) {
        match self.state.search.remove_selected_recent(&self.recent) {
            Ok(true) => self.state.set_status_message(Some("Removed recent search")),
            Ok(false) => {}
            Err(err) => {
                tracing::error!(?err, "failed to remove recent search");
                self.state
                    .set_status_message(Some("Failed to remove recent search"));
            }
        }
    }
}

fn is_plain(key: KeyEvent) -> bool {
    !key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
