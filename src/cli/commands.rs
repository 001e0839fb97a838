use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use time::{Date, Month};

use crate::app::App;
use crate::calendar::{
    format_iso_date, month_grid, parse_iso_date, render_month, short_weekday,
    week_strip_around,
};
use crate::config::{AppConfig, CalendarOptions};
use crate::recent::{RecentSearch, RecentSearchKind, RecentSearchStore};
use crate::search::parse_query;
use crate::storage::{Collection, MealType, NewRecipe, PlannedMeal, Recipe, StorageHandle};

const NO_RESULTS: &str = "No results";

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Recipe title (prompted if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Short description. If omitted, read from stdin when piped.
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, default_value = "")]
    pub category: String,
    /// Cooking time in minutes
    #[arg(long, default_value_t = 0)]
    pub minutes: u32,
    #[arg(long, default_value_t = 1)]
    pub servings: u32,
    /// One ingredient; repeat for more
    #[arg(long = "ingredient")]
    pub ingredients: Vec<String>,
    /// One step; repeat for more, in order
    #[arg(long = "step")]
    pub steps: Vec<String>,
    /// Image file to attach (png, jpg, webp, gif)
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search terms (supports title:, by:, category:, max:<minutes>)
    #[arg()]
    pub query: Vec<String>,
    /// Limit the number of recipes printed
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecentCommand {
    /// Print recent searches, most recent first
    List,
    /// Forget one entry
    Remove {
        /// USER, QUERY or RECIPE
        kind: RecentSearchKind,
        label: String,
    },
    /// Forget every entry
    Clear,
}

#[derive(Args, Debug, Clone)]
pub struct RecentArgs {
    #[command(subcommand)]
    pub command: RecentCommand,
}

#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    /// Recipe identifier
    pub id: String,
    /// Remove the recipe from saved instead
    #[arg(long)]
    pub unsave: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlanCommand {
    /// Plan a recipe for a day
    Add {
        /// Day as YYYY-MM-DD
        date: String,
        /// breakfast, lunch, dinner or snack
        meal: MealType,
        recipe_id: String,
    },
    /// Remove a planned meal by id
    Remove { id: i64 },
    /// Meals around a day (default today)
    Week {
        #[arg(long)]
        date: Option<String>,
    },
    /// Month grid plus every meal planned in it
    Month {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u8>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub command: PlanCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CollectionCommand {
    /// Create an empty collection
    New { name: String },
    /// Add a recipe to a collection
    Add { name: String, recipe_id: String },
    /// Remove a recipe from a collection
    Remove { name: String, recipe_id: String },
    /// List collections
    List,
    /// List the recipes of a collection
    Show { name: String },
    /// Delete a collection (recipes are kept)
    Delete { name: String },
}

#[derive(Args, Debug, Clone)]
pub struct CollectionArgs {
    #[command(subcommand)]
    pub command: CollectionCommand,
}

#[derive(Args, Debug, Clone)]
pub struct CalendarArgs {
    #[arg(long)]
    pub year: Option<i32>,
    /// Month number, 1-12
    #[arg(long)]
    pub month: Option<u8>,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn new_recipe(config: &AppConfig, storage: &StorageHandle, mut args: NewArgs) -> Result<()> {
    if args.title.is_none() {
        args.title = Some(prompt("Title")?);
    }
    if args.description.is_none() {
        args.description = read_stdin()?;
    }
    let output = run_new(storage, &config.profile.username, args)?;
    print!("{output}");
    Ok(())
}

fn run_new(storage: &StorageHandle, author: &str, args: NewArgs) -> Result<String> {
    let title = args.title.unwrap_or_default().trim().to_owned();
    if title.is_empty() {
        bail!("recipe title cannot be empty");
    }
    let image_url = match &args.image {
        Some(path) => Some(
            storage
                .images()
                .upload(path)
                .with_context(|| format!("uploading image {}", path.display()))?,
        ),
        None => None,
    };
    let recipe = NewRecipe {
        title,
        description: args.description.unwrap_or_default(),
        category: args.category,
        cook_minutes: args.minutes,
        servings: args.servings,
        ingredients: args.ingredients,
        steps: args.steps,
        image_url,
        author: author.to_string(),
    };
    let id = storage.create_recipe(&recipe).context("creating recipe")?;
    Ok(format!("Published \"{}\" as {id}\n", recipe.title))
}

pub fn search(
    storage: &StorageHandle,
    recent: &RecentSearchStore,
    config: &AppConfig,
    args: SearchArgs,
) -> Result<()> {
    let output = run_search(storage, recent, config.search.max_user_results, &args)?;
    print!("{output}");
    Ok(())
}

fn run_search(
    storage: &StorageHandle,
    recent: &RecentSearchStore,
    max_users: usize,
    args: &SearchArgs,
) -> Result<String> {
    let raw_query = args.query.join(" ");
    let trimmed = raw_query.trim();
    if trimmed.is_empty() {
        bail!("search query cannot be empty");
    }
    let query = parse_query(trimmed);
    if query.is_empty() {
        bail!("search query must contain terms or filters");
    }

    let users = match query.people_term() {
        Some(term) => storage
            .search_users(&term, max_users)
            .context("searching users")?,
        None => Vec::new(),
    };
    let recipes = storage
        .search_recipes(&query, args.limit)
        .context("executing search")?;
    recent
        .add(RecentSearch::query(trimmed))
        .context("recording recent search")?;

    if users.is_empty() && recipes.is_empty() {
        return Ok(format!("{NO_RESULTS}\n"));
    }
    let mut out = String::new();
    if !users.is_empty() {
        let _ = writeln!(out, "Cooks");
        for user in &users {
            let _ = writeln!(
                out,
                "  @{}  {} ({} recipes)",
                user.username, user.display_name, user.recipe_count
            );
        }
        out.push('\n');
    }
    if !recipes.is_empty() {
        let _ = writeln!(out, "Recipes");
        for recipe in &recipes {
            write_recipe_line(&mut out, recipe);
            if let Some(snippet) = &recipe.snippet {
                let _ = writeln!(out, "      {}", snippet.replace('\n', " "));
            }
        }
    }
    Ok(out)
}

pub fn recent_searches(recent: &RecentSearchStore, args: RecentArgs) -> Result<()> {
    let output = run_recent(recent, args.command)?;
    print!("{output}");
    Ok(())
}

fn run_recent(recent: &RecentSearchStore, command: RecentCommand) -> Result<String> {
    match command {
        RecentCommand::List => {
            let entries = recent.list();
            if entries.is_empty() {
                return Ok(format!("{NO_RESULTS}\n"));
            }
            let mut out = String::new();
            for (idx, entry) in entries.iter().enumerate() {
                let _ = write!(
                    out,
                    "{:>2}. {:<6} {}",
                    idx + 1,
                    entry.kind.to_string(),
                    entry.label
                );
                if let Some(secondary) = &entry.secondary {
                    let _ = write!(out, "  ({secondary})");
                }
                out.push('\n');
            }
            Ok(out)
        }
        RecentCommand::Remove { kind, label } => {
            let target = RecentSearch {
                kind,
                label: label.clone(),
                secondary: None,
                image: None,
            };
            if recent.remove(&target)? {
                Ok(format!("Removed {kind} '{label}'\n"))
            } else {
                Ok(format!("No recent {kind} '{label}'\n"))
            }
        }
        RecentCommand::Clear => {
            recent.clear()?;
            Ok("Cleared recent searches\n".to_string())
        }
    }
}

pub fn save(storage: &StorageHandle, args: SaveArgs) -> Result<()> {
    let output = run_save(storage, args)?;
    print!("{output}");
    Ok(())
}

fn run_save(storage: &StorageHandle, args: SaveArgs) -> Result<String> {
    let recipe = fetch_existing(storage, &args.id)?;
    storage
        .set_saved(&recipe.id, !args.unsave)
        .with_context(|| format!("updating recipe {}", recipe.id))?;
    Ok(if args.unsave {
        format!("Removed \"{}\" from saved\n", recipe.title)
    } else {
        format!("Saved \"{}\"\n", recipe.title)
    })
}

pub fn plan(storage: &StorageHandle, calendar: &CalendarOptions, today: Date, args: PlanArgs) -> Result<()> {
    let output = run_plan(storage, calendar, today, args.command)?;
    print!("{output}");
    Ok(())
}

fn run_plan(
    storage: &StorageHandle,
    calendar: &CalendarOptions,
    today: Date,
    command: PlanCommand,
) -> Result<String> {
    match command {
        PlanCommand::Add {
            date,
            meal,
            recipe_id,
        } => {
            let date = parse_date_arg(&date)?;
            let recipe = fetch_existing(storage, &recipe_id)?;
            let id = storage.plan_meal(date, meal, &recipe.id)?;
            Ok(format!(
                "Planned \"{}\" for {meal} on {} (#{id})\n",
                recipe.title,
                format_iso_date(date)
            ))
        }
        PlanCommand::Remove { id } => {
            storage.unplan_meal(id)?;
            Ok(format!("Removed planned meal #{id}\n"))
        }
        PlanCommand::Week { date } => {
            let anchor = match date {
                Some(raw) => parse_date_arg(&raw)?,
                None => today,
            };
            let strip = week_strip_around(
                anchor,
                today,
                calendar.week_days_before,
                calendar.week_days_after,
            );
            let (Some(first), Some(last)) = (strip.days.first(), strip.days.last()) else {
                return Ok(format!("{NO_RESULTS}\n"));
            };
            let meals = storage.meals_between(first.date, last.date)?;
            let mut out = String::new();
            for ((year, month), days) in strip.by_month() {
                let _ = writeln!(out, "{month} {year}");
                for day in days {
                    let marker = if day.is_today() { "*" } else { " " };
                    let _ = write!(
                        out,
                        "{marker} {} {}",
                        short_weekday(day.date.weekday()),
                        format_iso_date(day.date)
                    );
                    let planned = meals_on(&meals, day.date);
                    if planned.is_empty() {
                        out.push('\n');
                    } else {
                        let _ = writeln!(out, "  {}", planned.join(", "));
                    }
                }
            }
            Ok(out)
        }
        PlanCommand::Month { year, month } => {
            let (year, month) = resolve_month(today, year, month)?;
            let grid = month_grid(year, month, today, calendar.first_day_of_week);
            let first = grid.days[0].date;
            let last = grid.days[grid.days.len() - 1].date;
            let meals = storage.meals_between(first, last)?;
            let mut out = render_month(&grid);
            out.push('\n');
            let in_month: Vec<&PlannedMeal> = meals
                .iter()
                .filter(|meal| meal.date.month() == month && meal.date.year() == year)
                .collect();
            if in_month.is_empty() {
                let _ = writeln!(out, "Nothing planned.");
            }
            for meal in in_month {
                let _ = writeln!(
                    out,
                    "#{:<4} {}  {:<9} {}",
                    meal.id,
                    format_iso_date(meal.date),
                    meal.meal.to_string(),
                    meal.recipe_title
                );
            }
            Ok(out)
        }
    }
}

pub fn collection(storage: &StorageHandle, args: CollectionArgs) -> Result<()> {
    let output = run_collection(storage, args.command)?;
    print!("{output}");
    Ok(())
}

fn run_collection(storage: &StorageHandle, command: CollectionCommand) -> Result<String> {
    let find = |name: &str| find_collection(storage, name);
    match command {
        CollectionCommand::New { name } => {
            let id = storage.create_collection(&name)?;
            Ok(format!("Created collection '{}' (#{id})\n", name.trim()))
        }
        CollectionCommand::Add { name, recipe_id } => {
            let collection = find(&name)?;
            let recipe = fetch_existing(storage, &recipe_id)?;
            if storage.add_to_collection(collection.id, &recipe.id)? {
                Ok(format!("Added \"{}\" to '{}'\n", recipe.title, collection.name))
            } else {
                Ok(format!(
                    "\"{}\" is already in '{}'\n",
                    recipe.title, collection.name
                ))
            }
        }
        CollectionCommand::Remove { name, recipe_id } => {
            let collection = find(&name)?;
            storage.remove_from_collection(collection.id, &recipe_id)?;
            Ok(format!("Removed {recipe_id} from '{}'\n", collection.name))
        }
        CollectionCommand::List => {
            let collections = storage.list_collections()?;
            if collections.is_empty() {
                return Ok("No collections\n".to_string());
            }
            let mut out = String::new();
            for collection in collections {
                let _ = writeln!(
                    out,
                    "{}  ({} recipes)",
                    collection.name, collection.recipe_count
                );
            }
            Ok(out)
        }
        CollectionCommand::Show { name } => {
            let collection = find(&name)?;
            let recipes = storage.collection_recipes(collection.id)?;
            let mut out = format!("{}\n", collection.name);
            if recipes.is_empty() {
                let _ = writeln!(out, "  (empty)");
            }
            for recipe in &recipes {
                write_recipe_line(&mut out, recipe);
            }
            Ok(out)
        }
        CollectionCommand::Delete { name } => {
            let collection = find(&name)?;
            storage.delete_collection(collection.id)?;
            Ok(format!("Deleted collection '{}'\n", collection.name))
        }
    }
}

pub fn calendar(calendar: &CalendarOptions, today: Date, args: CalendarArgs) -> Result<()> {
    let (year, month) = resolve_month(today, args.year, args.month)?;
    print!(
        "{}",
        render_month(&month_grid(year, month, today, calendar.first_day_of_week))
    );
    Ok(())
}

fn resolve_month(today: Date, year: Option<i32>, month: Option<u8>) -> Result<(i32, Month)> {
    let year = year.unwrap_or(today.year());
    let month = match month {
        Some(number) => {
            Month::try_from(number).map_err(|_| anyhow!("month must be 1-12, got {number}"))?
        }
        None => today.month(),
    };
    Ok((year, month))
}

fn parse_date_arg(raw: &str) -> Result<Date> {
    parse_iso_date(raw).ok_or_else(|| anyhow!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn find_collection(storage: &StorageHandle, name: &str) -> Result<Collection> {
    storage
        .find_collection(name)?
        .ok_or_else(|| anyhow!("collection '{}' not found", name.trim()))
}

fn fetch_existing(storage: &StorageHandle, id: &str) -> Result<Recipe> {
    storage
        .fetch_recipe(id)?
        .ok_or_else(|| anyhow!("recipe {id} not found"))
}

fn meals_on(meals: &[PlannedMeal], date: Date) -> Vec<String> {
    meals
        .iter()
        .filter(|meal| meal.date == date)
        .map(|meal| format!("{}: {}", meal.meal, meal.recipe_title))
        .collect()
}

fn write_recipe_line(out: &mut String, recipe: &Recipe) {
    let mut headline = format!("  {}  {}", recipe.id, recipe.title);
    if recipe.saved {
        headline.push_str("  [SAVED]");
    }
    let _ = writeln!(out, "{headline}");
    let mut meta = format!("      by {}", recipe.author);
    if !recipe.category.is_empty() {
        let _ = write!(meta, " · {}", recipe.category);
    }
    if recipe.cook_minutes > 0 {
        let _ = write!(meta, " · {} min", recipe.cook_minutes);
    }
    let _ = writeln!(out, "{meta}");
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    let trimmed = buf.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigPaths;
    use crate::prefs::Preferences;
    use crate::storage::tests::{init_storage, recipe};
    use tempfile::TempDir;
    use time::macros::date;

    type TestResult<T = ()> = Result<T>;

    fn recent_store(temp: &TempDir) -> RecentSearchStore {
        let paths = ConfigPaths::rooted(temp.path());
        RecentSearchStore::new(Preferences::open(&paths.prefs_dir, "search"), 15)
    }

    fn search_args(query: &[&str]) -> SearchArgs {
        SearchArgs {
            query: query.iter().map(|part| part.to_string()).collect(),
            limit: 10,
        }
    }

    #[test]
    fn cli_search_lists_cooks_and_recipes_and_records_query() -> TestResult {
        let (temp, storage) = init_storage()?;
        let recent = recent_store(&temp);
        storage.ensure_user("tomasz", "Tomasz")?;
        storage.create_recipe(&recipe("Tomato Salad", "lunch", 10, "tomasz"))?;
        storage.create_recipe(&recipe("Beef Stew", "dinner", 120, "me"))?;

        let output = run_search(&storage, &recent, 10, &search_args(&["tom"]))?;
        assert!(output.contains("@tomasz"));
        assert!(output.contains("Tomato Salad"));
        assert!(!output.contains("Beef Stew"));

        let missing = run_search(&storage, &recent, 10, &search_args(&["zzz"]))?;
        assert_eq!(missing, "No results\n");

        let labels: Vec<_> = recent.list().into_iter().map(|entry| entry.label).collect();
        assert_eq!(labels, vec!["zzz", "tom"]);
        assert!(run_search(&storage, &recent, 10, &search_args(&["  "])).is_err());
        Ok(())
    }

    #[test]
    fn cli_recent_lists_removes_and_clears() -> TestResult {
        let temp = TempDir::new()?;
        let recent = recent_store(&temp);
        assert_eq!(run_recent(&recent, RecentCommand::List)?, "No results\n");

        recent.add(RecentSearch::query("pasta"))?;
        recent.add(RecentSearch::user("alice", Some("Alice".into())))?;
        let listed = run_recent(&recent, RecentCommand::List)?;
        assert_eq!(listed, " 1. USER   alice  (Alice)\n 2. QUERY  pasta\n");

        let removed = run_recent(
            &recent,
            RecentCommand::Remove {
                kind: RecentSearchKind::Query,
                label: "PASTA".into(),
            },
        )?;
        assert_eq!(removed, "Removed QUERY 'PASTA'\n");
        assert_eq!(recent.list().len(), 1);

        run_recent(&recent, RecentCommand::Clear)?;
        assert!(recent.list().is_empty());
        Ok(())
    }

    #[test]
    fn cli_new_attaches_uploaded_image() -> TestResult {
        let (temp, storage) = init_storage()?;
        let image = temp.path().join("dish.png");
        std::fs::write(&image, b"png")?;
        let output = run_new(
            &storage,
            "me",
            NewArgs {
                title: Some(" Fattoush ".into()),
                description: Some("Bread salad".into()),
                category: "Salad".into(),
                minutes: 15,
                servings: 2,
                ingredients: vec!["pita".into(), "sumac".into()],
                steps: vec!["toast".into(), "toss".into()],
                image: Some(image),
            },
        )?;
        assert!(output.starts_with("Published \"Fattoush\" as "));
        let feed = storage.fetch_feed(1)?;
        assert_eq!(feed[0].title, "Fattoush");
        assert_eq!(feed[0].steps, vec!["toast", "toss"]);
        assert!(feed[0]
            .image_url
            .as_deref()
            .is_some_and(|url| url.starts_with("file://") && url.ends_with(".png")));
        Ok(())
    }

    #[test]
    fn cli_plan_week_groups_days_by_month() -> TestResult {
        let (_temp, storage) = init_storage()?;
        let curry = storage.create_recipe(&recipe("Curry", "dinner", 40, "me"))?;
        let today = date!(2026 - 03 - 02);
        run_plan(
            &storage,
            &CalendarOptions::default(),
            today,
            PlanCommand::Add {
                date: "2026-02-27".into(),
                meal: MealType::Dinner,
                recipe_id: curry.clone(),
            },
        )?;

        let week = run_plan(
            &storage,
            &CalendarOptions::default(),
            today,
            PlanCommand::Week { date: None },
        )?;
        let lines: Vec<&str> = week.lines().collect();
        assert_eq!(lines[0], "February 2026");
        assert_eq!(lines[2], "  Fr 2026-02-27  dinner: Curry");
        assert_eq!(lines[4], "March 2026");
        assert!(lines.contains(&"* Mo 2026-03-02"));
        assert_eq!(lines.len(), 9);

        let elsewhere = run_plan(
            &storage,
            &CalendarOptions::default(),
            today,
            PlanCommand::Week {
                date: Some("2026-03-20".into()),
            },
        )?;
        assert!(elsewhere.starts_with("March 2026\n"));
        assert!(elsewhere.contains("  Fr 2026-03-20"));
        assert!(!elsewhere.lines().any(|line| line.starts_with('*')));

        let bad = run_plan(
            &storage,
            &CalendarOptions::default(),
            today,
            PlanCommand::Add {
                date: "27/02/2026".into(),
                meal: MealType::Lunch,
                recipe_id: curry,
            },
        );
        assert!(bad.is_err());
        Ok(())
    }

    #[test]
    fn cli_plan_month_lists_meals_of_that_month_only() -> TestResult {
        let (_temp, storage) = init_storage()?;
        let oats = storage.create_recipe(&recipe("Oats", "breakfast", 5, "me"))?;
        storage.plan_meal(date!(2026 - 03 - 01), MealType::Breakfast, &oats)?;
        storage.plan_meal(date!(2026 - 02 - 28), MealType::Breakfast, &oats)?;

        let output = run_plan(
            &storage,
            &CalendarOptions::default(),
            date!(2026 - 03 - 10),
            PlanCommand::Month {
                year: None,
                month: None,
            },
        )?;
        assert!(output.starts_with("March 2026\n"));
        assert!(output.contains("2026-03-01  breakfast Oats"));
        assert!(!output.contains("2026-02-28"));
        assert!(resolve_month(date!(2026 - 03 - 10), None, Some(13)).is_err());
        Ok(())
    }

    #[test]
    fn cli_collection_flow() -> TestResult {
        let (_temp, storage) = init_storage()?;
        let soup = storage.create_recipe(&recipe("Miso Soup", "soup", 15, "me"))?;

        run_collection(&storage, CollectionCommand::New { name: "Weeknight".into() })?;
        let added = run_collection(
            &storage,
            CollectionCommand::Add {
                name: "weeknight".into(),
                recipe_id: soup.clone(),
            },
        )?;
        assert_eq!(added, "Added \"Miso Soup\" to 'Weeknight'\n");

        let listed = run_collection(&storage, CollectionCommand::List)?;
        assert_eq!(listed, "Weeknight  (1 recipes)\n");
        let shown = run_collection(&storage, CollectionCommand::Show { name: "Weeknight".into() })?;
        assert!(shown.contains("Miso Soup"));

        run_collection(
            &storage,
            CollectionCommand::Remove {
                name: "Weeknight".into(),
                recipe_id: soup,
            },
        )?;
        run_collection(&storage, CollectionCommand::Delete { name: "Weeknight".into() })?;
        assert_eq!(
            run_collection(&storage, CollectionCommand::List)?,
            "No collections\n"
        );
        assert!(run_collection(&storage, CollectionCommand::Show { name: "gone".into() }).is_err());
        Ok(())
    }

    #[test]
    fn cli_save_toggles_flag() -> TestResult {
        let (_temp, storage) = init_storage()?;
        let id = storage.create_recipe(&recipe("Granola", "breakfast", 30, "me"))?;
        let saved = run_save(
            &storage,
            SaveArgs {
                id: id.clone(),
                unsave: false,
            },
        )?;
        assert_eq!(saved, "Saved \"Granola\"\n");
        assert_eq!(storage.fetch_saved(5)?.len(), 1);
        run_save(&storage, SaveArgs { id, unsave: true })?;
        assert!(storage.fetch_saved(5)?.is_empty());
        Ok(())
    }
}
