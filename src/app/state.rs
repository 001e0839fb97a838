use anyhow::{bail, Result};
use strum::{Display, EnumIter, IntoEnumIterator};
use time::{Date, Duration};
use unicode_segmentation::UnicodeSegmentation;

use crate::calendar::{add_months, month_grid, week_strip, MonthGrid, WeekStart, WeekStrip};
use crate::config::AppConfig;
use crate::recent::{RecentSearch, RecentSearchKind, RecentSearchStore};
use crate::search::{parse_query, SearchQuery};
use crate::storage::{
    Collection, MealType, NewRecipe, Notification, PlannedMeal, Recipe, StorageHandle,
    UserProfile,
};

/// Shown for an empty recent list as well as for a search without hits.
pub const EMPTY_RESULTS: &str = "No results";

const FEED_LIMIT: usize = 50;
const NOTIFICATION_LIMIT: usize = 100;
const INPUT_LIMIT: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Screen {
    Home,
    Search,
    Planner,
    Collections,
    Notifications,
}

impl Screen {
    pub fn next(self) -> Self {
        let all: Vec<Screen> = Screen::iter().collect();
        let idx = all.iter().position(|screen| *screen == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    /// `1` is Home, `5` is Notifications.
    pub fn from_digit(ch: char) -> Option<Self> {
        let digit = ch.to_digit(10)? as usize;
        Screen::iter().nth(digit.checked_sub(1)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HomeScreen {
    pub recipes: Vec<Recipe>,
    pub selected: usize,
    pub saved_only: bool,
}

impl HomeScreen {
    pub fn refresh(&mut self, storage: &StorageHandle) -> Result<()> {
        self.recipes = if self.saved_only {
            storage.fetch_saved(FEED_LIMIT)?
        } else {
            storage.fetch_feed(FEED_LIMIT)?
        };
        self.selected = clamp_selection(self.selected, self.recipes.len());
        Ok(())
    }

    pub fn selected_recipe(&self) -> Option<&Recipe> {
        self.recipes.get(self.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.selected = step_selection(self.selected, self.recipes.len(), delta);
    }

    pub fn select_recipe_by_id(&mut self, id: &str) {
        if let Some(idx) = self.recipes.iter().position(|recipe| recipe.id == id) {
            self.selected = idx;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit {
    User(UserProfile),
    Recipe(Recipe),
}

#[derive(Debug, Clone, Copy)]
pub enum SearchRow<'a> {
    Recent(&'a RecentSearch),
    Hit(&'a SearchHit),
}

/// Owns the search text; nothing outside this screen reads or writes it.
#[derive(Debug, Clone, Default)]
pub struct SearchScreen {
    pub input: String,
    pub editing: bool,
    pub query: SearchQuery,
    pub hits: Vec<SearchHit>,
    pub recent: Vec<RecentSearch>,
    pub selected: usize,
    /// Set while browsing one cook's recipes.
    pub author: Option<UserProfile>,
    max_results: usize,
    max_user_results: usize,
}

impl SearchScreen {
    pub fn new(max_results: usize, max_user_results: usize) -> Self {
        Self {
            max_results,
            max_user_results,
            ..Self::default()
        }
    }

    pub fn showing_recent(&self) -> bool {
        self.input.trim().is_empty() && self.author.is_none()
    }

    pub fn rows(&self) -> Vec<SearchRow<'_>> {
        if self.showing_recent() {
            self.recent.iter().map(SearchRow::Recent).collect()
        } else {
            self.hits.iter().map(SearchRow::Hit).collect()
        }
    }

    pub fn row_count(&self) -> usize {
        if self.showing_recent() {
            self.recent.len()
        } else {
            self.hits.len()
        }
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        (self.row_count() == 0).then_some(EMPTY_RESULTS)
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.selected = step_selection(self.selected, self.row_count(), delta);
    }

    pub fn reload_recent(&mut self, recent: &RecentSearchStore) {
        self.recent = recent.list();
        self.selected = clamp_selection(self.selected, self.row_count());
    }

    pub fn begin_edit(&mut self) {
        self.editing = true;
    }

    pub fn push_char(&mut self, storage: &StorageHandle, ch: char) -> Result<()> {
        if self.input.chars().count() >= INPUT_LIMIT {
            return Ok(());
        }
        self.input.push(ch);
        self.author = None;
        self.run(storage)
    }

    pub fn pop_char(&mut self, storage: &StorageHandle) -> Result<()> {
        if pop_grapheme(&mut self.input) {
            self.author = None;
            self.run(storage)?;
        }
        Ok(())
    }

    /// Enter in the search box: the query becomes a recent entry.
    pub fn submit(&mut self, storage: &StorageHandle, recent: &RecentSearchStore) -> Result<()> {
        self.editing = false;
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return Ok(());
        }
        self.run(storage)?;
        recent.add(RecentSearch::query(text))?;
        self.reload_recent(recent);
        Ok(())
    }

    pub fn cancel(&mut self, recent: &RecentSearchStore) {
        self.editing = false;
        self.input.clear();
        self.query = SearchQuery::default();
        self.hits.clear();
        self.author = None;
        self.selected = 0;
        self.reload_recent(recent);
    }

    pub fn run(&mut self, storage: &StorageHandle) -> Result<()> {
        self.query = parse_query(&self.input);
        self.hits.clear();
        self.selected = 0;
        if self.query.is_empty() {
            return Ok(());
        }
        if let Some(term) = self.query.people_term() {
            let users = storage.search_users(&term, self.max_user_results)?;
            self.hits.extend(users.into_iter().map(SearchHit::User));
        }
        let recipes = storage.search_recipes(&self.query, self.max_results)?;
        self.hits.extend(recipes.into_iter().map(SearchHit::Recipe));
        Ok(())
    }

    /// Opens the selected row. Returns the recipe to show in detail, if any.
    pub fn activate(
        &mut self,
        storage: &StorageHandle,
        recent: &RecentSearchStore,
    ) -> Result<Option<Recipe>> {
        if self.showing_recent() {
            let Some(entry) = self.recent.get(self.selected).cloned() else {
                return Ok(None);
            };
            return self.reopen(storage, recent, entry);
        }
        let Some(hit) = self.hits.get(self.selected).cloned() else {
            return Ok(None);
        };
        match hit {
            SearchHit::User(user) => {
                self.open_user(storage, recent, &user.username)?;
                Ok(None)
            }
            SearchHit::Recipe(recipe) => {
                recent.add(RecentSearch::recipe(
                    recipe.title.clone(),
                    Some(recipe.author.clone()),
                    recipe.image_url.clone(),
                ))?;
                self.reload_recent(recent);
                Ok(Some(recipe))
            }
        }
    }

    fn reopen(
        &mut self,
        storage: &StorageHandle,
        recent: &RecentSearchStore,
        entry: RecentSearch,
    ) -> Result<Option<Recipe>> {
        match entry.kind {
            RecentSearchKind::User => {
                self.open_user(storage, recent, &entry.label)?;
                Ok(None)
            }
            RecentSearchKind::Query => {
                self.input = entry.label.clone();
                self.run(storage)?;
                recent.add(entry)?;
                self.reload_recent(recent);
                Ok(None)
            }
            RecentSearchKind::Recipe => {
                self.input = entry.label.clone();
                self.run(storage)?;
                let found = self.hits.iter().find_map(|hit| match hit {
                    SearchHit::Recipe(recipe) if recipe.title.eq_ignore_ascii_case(&entry.label) => {
                        Some(recipe.clone())
                    }
                    _ => None,
                });
                recent.add(entry)?;
                self.reload_recent(recent);
                Ok(found)
            }
        }
    }

    pub fn open_user(
        &mut self,
        storage: &StorageHandle,
        recent: &RecentSearchStore,
        username: &str,
    ) -> Result<()> {
        let Some(user) = storage.fetch_user(username)? else {
            bail!("user '{username}' not found");
        };
        let recipes = storage.recipes_by_author(&user.username, self.max_results)?;
        recent.add(RecentSearch::user(
            user.username.clone(),
            Some(user.display_name.clone()).filter(|name| !name.is_empty()),
        ))?;
        self.hits = recipes.into_iter().map(SearchHit::Recipe).collect();
        self.author = Some(user);
        self.selected = 0;
        self.reload_recent(recent);
        Ok(())
    }

    /// Leaves a user's recipe list and returns to the query results.
    pub fn close_user(&mut self, storage: &StorageHandle) -> Result<bool> {
        if self.author.take().is_none() {
            return Ok(false);
        }
        self.run(storage)?;
        Ok(true)
    }

    pub fn remove_selected_recent(&mut self, recent: &RecentSearchStore) -> Result<bool> {
        if !self.showing_recent() {
            return Ok(false);
        }
        let Some(entry) = self.recent.get(self.selected).cloned() else {
            return Ok(false);
        };
        let removed = recent.remove(&entry)?;
        self.reload_recent(recent);
        Ok(removed)
    }

    pub fn clear_recent(&mut self, recent: &RecentSearchStore) -> Result<()> {
        recent.clear()?;
        self.selected = 0;
        self.reload_recent(recent);
        Ok(())
    }

    pub fn highlight_terms(&self) -> Vec<String> {
        self.query.highlight_terms()
    }
}

#[derive(Debug, Clone)]
pub struct PlannerScreen {
    pub today: Date,
    pub selected_date: Date,
    pub week_start: WeekStart,
    pub grid: MonthGrid,
    pub strip: WeekStrip,
    /// Every planned meal visible in the grid.
    pub month_meals: Vec<PlannedMeal>,
    pub selected_meal: usize,
}

impl PlannerScreen {
    pub fn new(today: Date, week_start: WeekStart, days_before: u8, days_after: u8) -> Self {
        Self {
            today,
            selected_date: today,
            week_start,
            grid: month_grid(today.year(), today.month(), today, week_start),
            strip: week_strip(today, days_before, days_after),
            month_meals: Vec::new(),
            selected_meal: 0,
        }
    }

    pub fn refresh(&mut self, storage: &StorageHandle) -> Result<()> {
        let first = self.grid.days[0].date;
        let last = self.grid.days[self.grid.days.len() - 1].date;
        self.month_meals = storage.meals_between(first, last)?;
        self.selected_meal = clamp_selection(self.selected_meal, self.meals_for_selected().len());
        Ok(())
    }

    pub fn move_day(&mut self, delta: i64) {
        let target = self.selected_date.saturating_add(Duration::days(delta));
        self.select_date(target);
    }

    /// Same day of month in another month, clamped to its length.
    pub fn shift_month(&mut self, delta: i32) {
        let (year, month) = add_months(
            self.selected_date.year(),
            self.selected_date.month(),
            delta,
        );
        let day = self
            .selected_date
            .day()
            .min(time::util::days_in_year_month(year, month));
        if let Ok(date) = Date::from_calendar_date(year, month, day) {
            self.select_date(date);
        }
    }

    pub fn jump_to_today(&mut self) {
        self.select_date(self.today);
    }

    fn select_date(&mut self, date: Date) {
        if date.year() != self.grid.year || date.month() != self.grid.month {
            self.grid = month_grid(date.year(), date.month(), self.today, self.week_start);
        }
        self.selected_date = date;
        self.selected_meal = 0;
    }

    pub fn meals_for_selected(&self) -> Vec<&PlannedMeal> {
        self.meals_on(self.selected_date)
    }

    pub fn meals_on(&self, date: Date) -> Vec<&PlannedMeal> {
        self.month_meals
            .iter()
            .filter(|meal| meal.date == date)
            .collect()
    }

    pub fn selected_meal(&self) -> Option<&PlannedMeal> {
        self.meals_for_selected().get(self.selected_meal).copied()
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.meals_for_selected().len();
        self.selected_meal = step_selection(self.selected_meal, len, delta);
    }
}

#[derive(Debug, Clone)]
pub struct OpenCollection {
    pub collection: Collection,
    pub recipes: Vec<Recipe>,
    pub selected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionsScreen {
    pub collections: Vec<Collection>,
    pub selected: usize,
    pub open: Option<OpenCollection>,
}

impl CollectionsScreen {
    pub fn refresh(&mut self, storage: &StorageHandle) -> Result<()> {
        self.collections = storage.list_collections()?;
        self.selected = clamp_selection(self.selected, self.collections.len());
        if let Some(open) = self.open.take() {
            if let Some(collection) = self
                .collections
                .iter()
                .find(|collection| collection.id == open.collection.id)
                .cloned()
            {
                let recipes = storage.collection_recipes(collection.id)?;
                let selected = clamp_selection(open.selected, recipes.len());
                self.open = Some(OpenCollection {
                    collection,
                    recipes,
                    selected,
                });
            }
        }
        Ok(())
    }

    pub fn selected_collection(&self) -> Option<&Collection> {
        self.collections.get(self.selected)
    }

    pub fn select_collection_by_id(&mut self, id: i64) {
        if let Some(idx) = self.collections.iter().position(|c| c.id == id) {
            self.selected = idx;
        }
    }

    pub fn open_selected(&mut self, storage: &StorageHandle) -> Result<()> {
        let Some(collection) = self.selected_collection().cloned() else {
            return Ok(());
        };
        let recipes = storage.collection_recipes(collection.id)?;
        self.open = Some(OpenCollection {
            collection,
            recipes,
            selected: 0,
        });
        Ok(())
    }

    pub fn close(&mut self) -> bool {
        self.open.take().is_some()
    }

    pub fn selected_open_recipe(&self) -> Option<&Recipe> {
        let open = self.open.as_ref()?;
        open.recipes.get(open.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        match self.open.as_mut() {
            Some(open) => open.selected = step_selection(open.selected, open.recipes.len(), delta),
            None => self.selected = step_selection(self.selected, self.collections.len(), delta),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationsScreen {
    pub items: Vec<Notification>,
    pub selected: usize,
}

impl NotificationsScreen {
    pub fn refresh(&mut self, storage: &StorageHandle) -> Result<()> {
        self.items = storage.list_notifications(NOTIFICATION_LIMIT)?;
        self.selected = clamp_selection(self.selected, self.items.len());
        Ok(())
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.selected = step_selection(self.selected, self.items.len(), delta);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewRecipeField {
    #[default]
    Title,
    Category,
    Minutes,
}

#[derive(Debug, Clone, Default)]
pub struct NewRecipeOverlay {
    pub title: String,
    pub category: String,
    pub minutes: String,
    pub field: NewRecipeField,
}

impl NewRecipeOverlay {
    pub fn next_field(&mut self) {
        self.field = match self.field {
            NewRecipeField::Title => NewRecipeField::Category,
            NewRecipeField::Category => NewRecipeField::Minutes,
            NewRecipeField::Minutes => NewRecipeField::Title,
        };
    }

    fn active_mut(&mut self) -> &mut String {
        match self.field {
            NewRecipeField::Title => &mut self.title,
            NewRecipeField::Category => &mut self.category,
            NewRecipeField::Minutes => &mut self.minutes,
        }
    }

    pub fn push_char(&mut self, ch: char) {
        if self.field == NewRecipeField::Minutes && !ch.is_ascii_digit() {
            return;
        }
        let value = self.active_mut();
        if value.chars().count() < INPUT_LIMIT {
            value.push(ch);
        }
    }

    pub fn pop_char(&mut self) {
        pop_grapheme(self.active_mut());
    }

    pub fn to_new_recipe(&self, author: &str) -> Result<NewRecipe> {
        let title = self.title.trim();
        if title.is_empty() {
            bail!("Title cannot be empty");
        }
        let cook_minutes = if self.minutes.trim().is_empty() {
            0
        } else {
            self.minutes.trim().parse::<u32>()?
        };
        Ok(NewRecipe {
            title: title.to_string(),
            category: self.category.trim().to_string(),
            cook_minutes,
            servings: 1,
            author: author.to_string(),
            ..NewRecipe::default()
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NameOverlay {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct PlanMealOverlay {
    pub recipe_id: String,
    pub recipe_title: String,
    pub date: Date,
    pub meal: MealType,
}

impl PlanMealOverlay {
    pub fn cycle_meal(&mut self) {
        let all: Vec<MealType> = MealType::iter().collect();
        let idx = all.iter().position(|meal| *meal == self.meal).unwrap_or(0);
        self.meal = all[(idx + 1) % all.len()];
    }
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    NewRecipe(NewRecipeOverlay),
    NewCollection(NameOverlay),
    DeleteCollection { id: i64, name: String },
    PlanMeal(PlanMealOverlay),
    RecipeDetail(Box<Recipe>),
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub home: HomeScreen,
    pub search: SearchScreen,
    pub planner: PlannerScreen,
    pub collections: CollectionsScreen,
    pub notifications: NotificationsScreen,
    pub unread: usize,
    pub preview_lines: usize,
    pub username: String,
    pub status_message: Option<String>,
    pub overlay: Option<OverlayState>,
}

impl AppState {
    pub fn load(
        storage: &StorageHandle,
        recent: &RecentSearchStore,
        config: &AppConfig,
        today: Date,
    ) -> Result<Self> {
        let mut state = Self {
            screen: Screen::Home,
            home: HomeScreen::default(),
            search: SearchScreen::new(config.search.max_results, config.search.max_user_results),
            planner: PlannerScreen::new(
                today,
                config.calendar.first_day_of_week,
                config.calendar.week_days_before,
                config.calendar.week_days_after,
            ),
            collections: CollectionsScreen::default(),
            notifications: NotificationsScreen::default(),
            unread: 0,
            preview_lines: config.preview_lines as usize,
            username: config.profile.username.clone(),
            status_message: None,
            overlay: None,
        };
        state.search.reload_recent(recent);
        state.refresh(storage)?;
        Ok(state)
    }

    pub fn refresh(&mut self, storage: &StorageHandle) -> Result<()> {
        self.home.refresh(storage)?;
        self.planner.refresh(storage)?;
        self.collections.refresh(storage)?;
        self.notifications.refresh(storage)?;
        self.unread = storage.unread_notifications()?;
        Ok(())
    }

    pub fn switch_screen(&mut self, screen: Screen, storage: &StorageHandle) -> Result<()> {
        self.screen = screen;
        match screen {
            Screen::Home => self.home.refresh(storage)?,
            Screen::Search => {}
            Screen::Planner => self.planner.refresh(storage)?,
            Screen::Collections => self.collections.refresh(storage)?,
            Screen::Notifications => {
                // Looking at the list counts as reading it.
                self.notifications.refresh(storage)?;
                storage.mark_notifications_read()?;
                self.unread = 0;
            }
        }
        Ok(())
    }

    pub fn refresh_unread(&mut self, storage: &StorageHandle) -> Result<()> {
        self.unread = storage.unread_notifications()?;
        Ok(())
    }

    pub fn move_selection(&mut self, delta: isize) {
        match self.screen {
            Screen::Home => self.home.move_selection(delta),
            Screen::Search => self.search.move_selection(delta),
            Screen::Planner => self.planner.move_selection(delta),
            Screen::Collections => self.collections.move_selection(delta),
            Screen::Notifications => self.notifications.move_selection(delta),
        }
    }

    /// Recipe that screen actions (plan, collect, save) apply to.
    pub fn focused_recipe(&self) -> Option<&Recipe> {
        match (&self.overlay, self.screen) {
            (Some(OverlayState::RecipeDetail(recipe)), _) => Some(recipe.as_ref()),
            (_, Screen::Search) => match self.search.hits.get(self.search.selected) {
                Some(SearchHit::Recipe(recipe)) if !self.search.showing_recent() => Some(recipe),
                _ => None,
            },
            (_, Screen::Collections) => self
                .collections
                .selected_open_recipe()
                .or_else(|| self.home.selected_recipe()),
            _ => self.home.selected_recipe(),
        }
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut OverlayState> {
        self.overlay.as_mut()
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn open_new_recipe(&mut self) {
        self.overlay = Some(OverlayState::NewRecipe(NewRecipeOverlay::default()));
    }

    pub fn open_new_collection(&mut self) {
        self.overlay = Some(OverlayState::NewCollection(NameOverlay::default()));
    }

    pub fn open_delete_collection(&mut self) -> bool {
        let Some(collection) = self.collections.selected_collection() else {
            return false;
        };
        self.overlay = Some(OverlayState::DeleteCollection {
            id: collection.id,
            name: collection.name.clone(),
        });
        true
    }

    pub fn open_plan_meal(&mut self) -> bool {
        let Some(recipe) = self.home.selected_recipe() else {
            return false;
        };
        self.overlay = Some(OverlayState::PlanMeal(PlanMealOverlay {
            recipe_id: recipe.id.clone(),
            recipe_title: recipe.title.clone(),
            date: self.planner.selected_date,
            meal: MealType::Dinner,
        }));
        true
    }

    pub fn open_recipe_detail(&mut self, recipe: Recipe) {
        self.overlay = Some(OverlayState::RecipeDetail(Box::new(recipe)));
    }
}

/// Short text under a recipe title: the search snippet when there is one,
/// otherwise the description followed by the ingredients.
pub fn recipe_preview(recipe: &Recipe, preview_lines: usize) -> String {
    if preview_lines == 0 {
        return String::new();
    }
    if let Some(snippet) = recipe.snippet.as_deref().map(str::trim) {
        if !snippet.is_empty() {
            return snippet.to_string();
        }
    }
    let mut lines: Vec<String> = Vec::with_capacity(preview_lines);
    lines.extend(
        recipe
            .description
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string),
    );
    if !recipe.ingredients.is_empty() {
        lines.push(recipe.ingredients.join(", "));
    }
    lines.truncate(preview_lines);
    lines.join("\n")
}

pub fn recipe_meta(recipe: &Recipe) -> String {
    let mut parts = vec![format!("by {}", recipe.author)];
    if !recipe.category.is_empty() {
        parts.push(recipe.category.clone());
    }
    if recipe.cook_minutes > 0 {
        parts.push(format!("{} min", recipe.cook_minutes));
    }
    parts.push(format!("serves {}", recipe.servings));
    parts.join(" · ")
}

fn pop_grapheme(text: &mut String) -> bool {
    match text.grapheme_indices(true).next_back() {
        Some((idx, _)) => {
            text.truncate(idx);
            true
        }
        None => false,
    }
}

fn step_selection(current: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = current as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

fn clamp_selection(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        current.min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigPaths;
    use crate::prefs::Preferences;
    use crate::storage::tests::{init_storage, recipe};
    use assert_matches::assert_matches;
    use tempfile::TempDir;
    use time::macros::date;

    fn recent_store(temp: &TempDir) -> RecentSearchStore {
        let paths = ConfigPaths::rooted(temp.path());
        RecentSearchStore::new(Preferences::open(&paths.prefs_dir, "search"), 15)
    }

    fn load_state(
        storage: &StorageHandle,
        recent: &RecentSearchStore,
        today: Date,
    ) -> anyhow::Result<AppState> {
        AppState::load(storage, recent, &AppConfig::default(), today)
    }

    #[test]
    fn empty_recent_list_and_zero_hits_share_the_empty_message() -> anyhow::Result<()> {
        let (temp, storage) = init_storage()?;
        let recent = recent_store(&temp);
        let mut state = load_state(&storage, &recent, date!(2026 - 03 - 02))?;

        assert!(state.search.showing_recent());
        assert_eq!(state.search.empty_message(), Some(EMPTY_RESULTS));

        for ch in "zzzz".chars() {
            state.search.push_char(&storage, ch)?;
        }
        assert!(!state.search.showing_recent());
        assert_eq!(state.search.empty_message(), Some(EMPTY_RESULTS));
        Ok(())
    }

    #[test]
    fn submitting_a_query_records_it_first() -> anyhow::Result<()> {
        let (temp, storage) = init_storage()?;
        storage.create_recipe(&recipe("Pasta Bake", "dinner", 40, "me"))?;
        let recent = recent_store(&temp);
        let mut state = load_state(&storage, &recent, date!(2026 - 03 - 02))?;

        state.search.begin_edit();
        for ch in "pasta".chars() {
            state.search.push_char(&storage, ch)?;
        }
        state.search.submit(&storage, &recent)?;
        assert!(!state.search.editing);
        assert_eq!(state.search.hits.len(), 1);
        assert_eq!(recent.list(), vec![RecentSearch::query("pasta")]);

        state.search.cancel(&recent);
        assert!(state.search.showing_recent());
        assert_eq!(state.search.row_count(), 1);
        assert_matches!(state.search.rows()[0], SearchRow::Recent(entry) if entry.label == "pasta");
        Ok(())
    }

    #[test]
    fn opening_hits_records_users_and_recipes() -> anyhow::Result<()> {
        let (temp, storage) = init_storage()?;
        storage.ensure_user("alice", "Alice Waters")?;
        storage.create_recipe(&recipe("Alicante Stew", "dinner", 60, "me"))?;
        storage.create_recipe(&recipe("Chez Salad", "lunch", 10, "alice"))?;
        let recent = recent_store(&temp);
        let mut state = load_state(&storage, &recent, date!(2026 - 03 - 02))?;

        for ch in "ali".chars() {
            state.search.push_char(&storage, ch)?;
        }
        assert_matches!(&state.search.hits[0], SearchHit::User(user) if user.username == "alice");
        assert_matches!(&state.search.hits[1], SearchHit::Recipe(r) if r.title == "Alicante Stew");

        state.search.move_selection(1);
        let opened = state.search.activate(&storage, &recent)?;
        assert_eq!(opened.map(|r| r.title), Some("Alicante Stew".to_string()));

        state.search.selected = 0;
        assert!(state.search.activate(&storage, &recent)?.is_none());
        let author = state.search.author.as_ref().map(|user| user.username.clone());
        assert_eq!(author.as_deref(), Some("alice"));
        assert_matches!(&state.search.hits[..], [SearchHit::Recipe(r)] if r.title == "Chez Salad");

        let kinds: Vec<_> = recent.list().into_iter().map(|entry| entry.kind).collect();
        assert_eq!(kinds, vec![RecentSearchKind::User, RecentSearchKind::Recipe]);

        assert!(state.search.close_user(&storage)?);
        assert_eq!(state.search.hits.len(), 2);
        Ok(())
    }

    #[test]
    fn recent_rows_can_be_reopened_removed_and_cleared() -> anyhow::Result<()> {
        let (temp, storage) = init_storage()?;
        storage.create_recipe(&recipe("Lemon Tart", "dessert", 75, "me"))?;
        let recent = recent_store(&temp);
        recent.add(RecentSearch::query("soup"))?;
        recent.add(RecentSearch::recipe("lemon tart", Some("me".into()), None))?;
        let mut state = load_state(&storage, &recent, date!(2026 - 03 - 02))?;

        let opened = state.search.activate(&storage, &recent)?;
        assert_eq!(opened.map(|r| r.title), Some("Lemon Tart".to_string()));

        state.search.cancel(&recent);
        assert!(state.search.remove_selected_recent(&recent)?);
        assert_eq!(recent.list(), vec![RecentSearch::query("soup")]);

        state.search.clear_recent(&recent)?;
        assert!(recent.list().is_empty());
        assert_eq!(state.search.empty_message(), Some(EMPTY_RESULTS));
        Ok(())
    }

    #[test]
    fn planner_month_shift_clamps_day_and_lists_meals() -> anyhow::Result<()> {
        let (temp, storage) = init_storage()?;
        let recent = recent_store(&temp);
        let curry = storage.create_recipe(&recipe("Curry", "dinner", 40, "me"))?;
        storage.plan_meal(date!(2026 - 02 - 28), MealType::Dinner, &curry)?;
        let mut state = load_state(&storage, &recent, date!(2026 - 01 - 31))?;

        state.planner.shift_month(1);
        assert_eq!(state.planner.selected_date, date!(2026 - 02 - 28));
        assert_eq!(state.planner.grid.month, time::Month::February);
        state.planner.refresh(&storage)?;
        assert_eq!(state.planner.meals_for_selected().len(), 1);
        assert_eq!(
            state.planner.selected_meal().map(|m| m.recipe_title.as_str()),
            Some("Curry")
        );

        state.planner.move_day(1);
        assert_eq!(state.planner.selected_date, date!(2026 - 03 - 01));
        assert_eq!(state.planner.grid.month, time::Month::March);
        state.planner.jump_to_today();
        assert_eq!(state.planner.grid.month, time::Month::January);
        Ok(())
    }

    #[test]
    fn notifications_screen_marks_everything_read() -> anyhow::Result<()> {
        let (temp, storage) = init_storage()?;
        let recent = recent_store(&temp);
        storage.create_recipe(&recipe("Flatbread", "", 20, "me"))?;
        let mut state = load_state(&storage, &recent, date!(2026 - 03 - 02))?;
        assert_eq!(state.unread, 1);

        state.switch_screen(Screen::Notifications, &storage)?;
        assert_eq!(state.unread, 0);
        assert_eq!(state.notifications.items.len(), 1);
        assert_eq!(storage.unread_notifications()?, 0);
        Ok(())
    }

    #[test]
    fn new_recipe_overlay_validates_fields() {
        let mut overlay = NewRecipeOverlay::default();
        assert!(overlay.to_new_recipe("me").is_err());
        for ch in "Dal".chars() {
            overlay.push_char(ch);
        }
        overlay.next_field();
        overlay.next_field();
        for ch in "3x0".chars() {
            overlay.push_char(ch);
        }
        let recipe = overlay.to_new_recipe("me").expect("valid recipe");
        assert_eq!(recipe.title, "Dal");
        assert_eq!(recipe.cook_minutes, 30);
        overlay.pop_char();
        assert_eq!(overlay.minutes, "3");
    }

    #[test]
    fn screens_cycle_and_map_digits() {
        assert_eq!(Screen::Notifications.next(), Screen::Home);
        assert_eq!(Screen::from_digit('3'), Some(Screen::Planner));
        assert_eq!(Screen::from_digit('0'), None);
        assert_eq!(Screen::from_digit('9'), None);
    }

    #[test]
    fn preview_prefers_snippet_then_description() {
        let mut dish = Recipe {
            id: "1".into(),
            title: "Soup".into(),
            description: "Warm\nand thick".into(),
            category: String::new(),
            cook_minutes: 0,
            servings: 2,
            ingredients: vec!["leek".into(), "potato".into()],
            steps: Vec::new(),
            image_url: None,
            author: "me".into(),
            saved: false,
            created_at: 0,
            updated_at: 0,
            snippet: None,
        };
        assert_eq!(recipe_preview(&dish, 2), "Warm\nand thick");
        assert_eq!(recipe_preview(&dish, 3), "Warm\nand thick\nleek, potato");
        assert_eq!(recipe_meta(&dish), "by me · serves 2");
        dish.snippet = Some(" leek soup ".into());
        assert_eq!(recipe_preview(&dish, 2), "leek soup");
        assert_eq!(recipe_preview(&dish, 0), "");
    }
}
