use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::config::DbConfig;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::calendar::{format_iso_date, parse_iso_date};
use crate::config::{ConfigPaths, StorageOptions};
use crate::search::SearchQuery;

mod images;
mod schema;

pub use images::ImageStore;

const FTS_ROW_LIMIT: usize = 200;
const BM25_TITLE_WEIGHT: f64 = 0.2;
const BM25_DESCRIPTION_WEIGHT: f64 = 1.0;
const BM25_INGREDIENT_WEIGHT: f64 = 0.8;

const RECIPE_COLUMNS: &str = "r.id, r.title, r.description, r.category, r.cook_minutes, \
     r.servings, r.ingredients, r.steps, r.image_url, r.author, r.saved, r.created_at, \
     r.updated_at";

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub cook_minutes: u32,
    pub servings: u32,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub image_url: Option<String>,
    pub author: String,
    pub saved: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub category: String,
    pub cook_minutes: u32,
    pub servings: u32,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub image_url: Option<String>,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub recipe_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub recipe_count: usize,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMeal {
    pub id: i64,
    pub date: Date,
    pub meal: MealType,
    pub recipe_id: String,
    pub recipe_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    pub recipe_id: Option<String>,
    pub created_at: i64,
    pub read: bool,
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
    images: ImageStore,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    // Recipes

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<String> {
        let title = recipe.title.trim();
        if title.is_empty() {
            bail!("recipe title cannot be empty");
        }
        let author = recipe.author.trim();
        if author.is_empty() {
            bail!("recipe author cannot be empty");
        }
        let id = Uuid::new_v4().to_string();
        let ingredients = encode_lines(&recipe.ingredients)?;
        let steps = encode_lines(&recipe.steps)?;
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = now_epoch();
        tx.execute(
            "INSERT INTO recipes (id, title, description, category, cook_minutes, servings,
                                  ingredients, steps, image_url, author, saved, created_at,
                                  updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?11)",
            params![
                id,
                title,
                recipe.description.trim(),
                recipe.category.trim().to_lowercase(),
                recipe.cook_minutes,
                recipe.servings.max(1),
                ingredients,
                steps,
                recipe.image_url,
                author,
                now
            ],
        )
        .context("inserting recipe")?;
        insert_notification(&tx, &format!("Published \"{title}\""), Some(&id), now)?;
        tx.commit()?;
        tracing::info!(recipe_id = %id, "recipe created");
        Ok(id)
    }

    pub fn update_recipe(&self, id: &str, recipe: &NewRecipe) -> Result<()> {
        let title = recipe.title.trim();
        if title.is_empty() {
            bail!("recipe title cannot be empty");
        }
        let ingredients = encode_lines(&recipe.ingredients)?;
        let steps = encode_lines(&recipe.steps)?;
        self.with_connection(|conn| {
            let updated = conn
                .execute(
                    "UPDATE recipes
                     SET title = ?1, description = ?2, category = ?3, cook_minutes = ?4,
                         servings = ?5, ingredients = ?6, steps = ?7, image_url = ?8,
                         updated_at = ?9
                     WHERE id = ?10",
                    params![
                        title,
                        recipe.description.trim(),
                        recipe.category.trim().to_lowercase(),
                        recipe.cook_minutes,
                        recipe.servings.max(1),
                        ingredients,
                        steps,
                        recipe.image_url,
                        now_epoch(),
                        id
                    ],
                )
                .context("updating recipe")?;
            if updated == 0 {
                bail!("recipe {id} not found");
            }
            Ok(())
        })
    }

    pub fn delete_recipe(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            let deleted = conn
                .execute("DELETE FROM recipes WHERE id = ?1", params![id])
                .context("deleting recipe")?;
            if deleted == 0 {
                bail!("recipe {id} not found");
            }
            Ok(())
        })
    }

    pub fn fetch_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        self.with_connection(|conn| {
            let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = ?1");
            conn.query_row(&sql, params![id], map_recipe)
                .optional()
                .context("fetching recipe")
        })
    }

    /// Newest recipes first.
    pub fn fetch_feed(&self, limit: usize) -> Result<Vec<Recipe>> {
        self.fetch_feed_batch(limit, 0)
    }

    fn fetch_feed_batch(&self, limit: usize, offset: usize) -> Result<Vec<Recipe>> {
        self.query_recipes(
            &format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes r
                 ORDER BY r.created_at DESC, r.seq DESC
                 LIMIT ?1 OFFSET ?2"
            ),
            params![limit as i64, offset as i64],
        )
    }

    pub fn fetch_saved(&self, limit: usize) -> Result<Vec<Recipe>> {
        self.query_recipes(
            &format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes r
                 WHERE r.saved = 1
                 ORDER BY r.updated_at DESC, r.seq DESC
                 LIMIT ?1"
            ),
            params![limit as i64],
        )
    }

    pub fn recipes_by_author(&self, username: &str, limit: usize) -> Result<Vec<Recipe>> {
        self.query_recipes(
            &format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes r
                 WHERE r.author = ?1
                 ORDER BY r.created_at DESC, r.seq DESC
                 LIMIT ?2"
            ),
            params![username.trim(), limit as i64],
        )
    }

    pub fn set_saved(&self, id: &str, saved: bool) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let title: String = tx
            .query_row("SELECT title FROM recipes WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or_else(|| anyhow!("recipe {id} not found"))?;
        let changed = tx
            .execute(
                "UPDATE recipes SET saved = ?1 WHERE id = ?2 AND saved != ?1",
                params![saved as i64, id],
            )
            .context("updating saved state")?;
        if changed > 0 && saved {
            insert_notification(&tx, &format!("Saved \"{title}\""), Some(id), now_epoch())?;
        }
        tx.commit()?;
        Ok(())
    }

    fn query_recipes<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Recipe>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params, map_recipe)?;
            rows.collect::<Result<Vec<_>, _>>()
                .context("reading recipe rows")
        })
    }

    // Search

    pub fn search_recipes(&self, query: &SearchQuery, limit: usize) -> Result<Vec<Recipe>> {
        if query.is_empty() {
            return self.fetch_feed(limit);
        }
        let match_expr = if query.has_terms() {
            match build_match_expression(query) {
                Some(expr) => Some(expr),
                None => return Ok(Vec::new()),
            }
        } else {
            None
        };
        // Filters run in memory, so keep paging until enough rows survive.
        let batch_size = limit.max(FTS_ROW_LIMIT);
        let mut results = Vec::new();
        let mut offset = 0usize;
        loop {
            let mut batch = match &match_expr {
                Some(expr) => self.search_terms_batch(expr, batch_size, offset)?,
                None => self.fetch_feed_batch(batch_size, offset)?,
            };
            let exhausted = batch.len() < batch_size;
            apply_filters(&mut batch, query);
            results.extend(batch);
            if exhausted || results.len() >= limit {
                break;
            }
            offset += batch_size;
        }
        if match_expr.is_some() {
            let title_priority_tokens = query
                .highlight_terms()
                .into_iter()
                .map(|token| token.to_lowercase())
                .collect::<Vec<_>>();
            results = prioritize_title_matches(results, &title_priority_tokens);
        }
        results.truncate(limit);
        Ok(results)
    }

    fn search_terms_batch(
        &self,
        match_expr: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Recipe>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {RECIPE_COLUMNS},
                        snippet(fts_recipes, -1, '', '', ' ... ', 16) AS snippet
                 FROM fts_recipes
                 INNER JOIN recipes r ON r.seq = fts_recipes.rowid
                 WHERE fts_recipes MATCH ?1
                 ORDER BY bm25(fts_recipes, {title}, {description}, {ingredients}),
                          r.created_at DESC
                 LIMIT ?2 OFFSET ?3",
                title = BM25_TITLE_WEIGHT,
                description = BM25_DESCRIPTION_WEIGHT,
                ingredients = BM25_INGREDIENT_WEIGHT,
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![match_expr, limit as i64, offset as i64], |row| {
                let mut recipe = map_recipe(row)?;
                let snippet: String = row.get(13)?;
                let snippet = snippet.trim();
                if !snippet.is_empty() {
                    recipe.snippet = Some(snippet.to_string());
                }
                Ok(recipe)
            })?;
            rows.collect::<Result<Vec<_>, _>>()
                .context("querying search results")
        })
    }

    /// Case-insensitive substring match on username or display name.
    pub fn search_users(&self, term: &str, limit: usize) -> Result<Vec<UserProfile>> {
        let trimmed = term.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(trimmed));
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.display_name, u.bio,
                        (SELECT COUNT(*) FROM recipes r WHERE r.author = u.username)
                 FROM users u
                 WHERE u.username LIKE ?1 ESCAPE '\\'
                    OR u.display_name LIKE ?1 ESCAPE '\\'
                 ORDER BY u.username COLLATE NOCASE
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![pattern, limit as i64], map_user)?;
            rows.collect::<Result<Vec<_>, _>>()
                .context("searching users")
        })
    }

    // Users

    pub fn ensure_user(&self, username: &str, display_name: &str) -> Result<()> {
        let username = username.trim();
        if username.is_empty() {
            bail!("username cannot be empty");
        }
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (username, display_name, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(username) DO UPDATE SET display_name = excluded.display_name",
                params![username, display_name.trim(), now_epoch()],
            )
            .context("upserting user")?;
            Ok(())
        })
    }

    pub fn fetch_user(&self, username: &str) -> Result<Option<UserProfile>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT u.id, u.username, u.display_name, u.bio,
                        (SELECT COUNT(*) FROM recipes r WHERE r.author = u.username)
                 FROM users u
                 WHERE u.username = ?1",
                params![username.trim()],
                map_user,
            )
            .optional()
            .context("fetching user")
        })
    }

    // Collections

    pub fn create_collection(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            bail!("collection name cannot be empty");
        }
        self.with_connection(|conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM collections WHERE name = ?1",
                    params![name],
                    |_row| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                bail!("collection '{name}' already exists");
            }
            conn.execute(
                "INSERT INTO collections (name, created_at) VALUES (?1, ?2)",
                params![name, now_epoch()],
            )
            .context("inserting collection")?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn delete_collection(&self, collection_id: i64) -> Result<()> {
        self.with_connection(|conn| {
            let deleted = conn.execute(
                "DELETE FROM collections WHERE id = ?1",
                params![collection_id],
            )?;
            if deleted == 0 {
                bail!("collection {collection_id} not found");
            }
            Ok(())
        })
    }

    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, c.created_at, COUNT(cr.recipe_id)
                 FROM collections c
                 LEFT JOIN collection_recipes cr ON cr.collection_id = c.id
                 GROUP BY c.id
                 ORDER BY c.name COLLATE NOCASE",
            )?;
            let rows = stmt.query_map([], map_collection)?;
            rows.collect::<Result<Vec<_>, _>>()
                .context("listing collections")
        })
    }

    pub fn find_collection(&self, name: &str) -> Result<Option<Collection>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT c.id, c.name, c.created_at, COUNT(cr.recipe_id)
                 FROM collections c
                 LEFT JOIN collection_recipes cr ON cr.collection_id = c.id
                 WHERE c.name = ?1
                 GROUP BY c.id",
                params![name.trim()],
                map_collection,
            )
            .optional()
            .context("finding collection")
        })
    }

    /// Returns false when the recipe was already in the collection.
    pub fn add_to_collection(&self, collection_id: i64, recipe_id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            ensure_recipe_exists(conn, recipe_id)?;
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO collection_recipes (collection_id, recipe_id, added_at)
                     VALUES (?1, ?2, ?3)",
                    params![collection_id, recipe_id, now_epoch()],
                )
                .with_context(|| format!("adding recipe to collection {collection_id}"))?;
            Ok(inserted > 0)
        })
    }

    pub fn remove_from_collection(&self, collection_id: i64, recipe_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            let removed = conn.execute(
                "DELETE FROM collection_recipes WHERE collection_id = ?1 AND recipe_id = ?2",
                params![collection_id, recipe_id],
            )?;
            if removed == 0 {
                bail!("recipe {recipe_id} is not in collection {collection_id}");
            }
            Ok(())
        })
    }

    pub fn collection_recipes(&self, collection_id: i64) -> Result<Vec<Recipe>> {
        self.query_recipes(
            &format!(
                "SELECT {RECIPE_COLUMNS}
                 FROM collection_recipes cr
                 INNER JOIN recipes r ON r.id = cr.recipe_id
                 WHERE cr.collection_id = ?1
                 ORDER BY cr.added_at DESC, r.title COLLATE NOCASE"
            ),
            params![collection_id],
        )
    }

    // Meal plan

    pub fn plan_meal(&self, date: Date, meal: MealType, recipe_id: &str) -> Result<i64> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let title = ensure_recipe_exists(&tx, recipe_id)?;
        let day = format_iso_date(date);
        let now = now_epoch();
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO meal_plans (plan_date, meal, recipe_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![day, meal.to_string(), recipe_id, now],
            )
            .context("inserting planned meal")?;
        let id = if inserted > 0 {
            let id = tx.last_insert_rowid();
            insert_notification(
                &tx,
                &format!("Planned \"{title}\" for {meal} on {day}"),
                Some(recipe_id),
                now,
            )?;
            id
        } else {
            tx.query_row(
                "SELECT id FROM meal_plans WHERE plan_date = ?1 AND meal = ?2 AND recipe_id = ?3",
                params![day, meal.to_string(), recipe_id],
                |row| row.get(0),
            )?
        };
        tx.commit()?;
        Ok(id)
    }

    pub fn unplan_meal(&self, plan_id: i64) -> Result<()> {
        self.with_connection(|conn| {
            let removed = conn.execute("DELETE FROM meal_plans WHERE id = ?1", params![plan_id])?;
            if removed == 0 {
                bail!("planned meal {plan_id} not found");
            }
            Ok(())
        })
    }

    /// Meals with `from <= date <= to`, ordered by day then meal.
    pub fn meals_between(&self, from: Date, to: Date) -> Result<Vec<PlannedMeal>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.plan_date, m.meal, m.recipe_id, r.title
                 FROM meal_plans m
                 INNER JOIN recipes r ON r.id = m.recipe_id
                 WHERE m.plan_date >= ?1 AND m.plan_date <= ?2
                 ORDER BY m.plan_date, m.id",
            )?;
            let rows = stmt.query_map(
                params![format_iso_date(from), format_iso_date(to)],
                map_planned_meal,
            )?;
            let mut meals = rows
                .collect::<Result<Vec<_>, _>>()
                .context("reading meal plan")?;
            meals.sort_by(|a, b| a.date.cmp(&b.date).then(a.meal.cmp(&b.meal)));
            Ok(meals)
        })
    }

    pub fn meals_on(&self, date: Date) -> Result<Vec<PlannedMeal>> {
        self.meals_between(date, date)
    }

    // Notifications

    pub fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, message, recipe_id, created_at, read
                 FROM notifications
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok(Notification {
                    id: row.get(0)?,
                    message: row.get(1)?,
                    recipe_id: row.get(2)?,
                    created_at: row.get(3)?,
                    read: row.get::<_, i64>(4)? != 0,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
                .context("listing notifications")
        })
    }

    pub fn unread_notifications(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE read = 0",
                [],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }

    pub fn mark_notifications_read(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let updated = conn.execute("UPDATE notifications SET read = 1 WHERE read = 0", [])?;
            Ok(updated)
        })
    }
}

fn now_epoch() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn encode_lines(lines: &[String]) -> Result<String> {
    let cleaned: Vec<&str> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();
    serde_json::to_string(&cleaned).context("encoding recipe lines")
}

fn decode_lines(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn map_recipe(row: &Row<'_>) -> rusqlite::Result<Recipe> {
    let ingredients: String = row.get(6)?;
    let steps: String = row.get(7)?;
    Ok(Recipe {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        cook_minutes: row.get(4)?,
        servings: row.get(5)?,
        ingredients: decode_lines(&ingredients),
        steps: decode_lines(&steps),
        image_url: row.get(8)?,
        author: row.get(9)?,
        saved: row.get::<_, i64>(10)? != 0,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        snippet: None,
    })
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        bio: row.get(3)?,
        recipe_count: row.get::<_, i64>(4)? as usize,
    })
}

fn map_collection(row: &Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        recipe_count: row.get::<_, i64>(3)? as usize,
    })
}

fn map_planned_meal(row: &Row<'_>) -> rusqlite::Result<PlannedMeal> {
    let day: String = row.get(1)?;
    let date = parse_iso_date(&day)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(1, "plan_date".into(), Type::Text))?;
    let meal: String = row.get(2)?;
    let meal = meal
        .parse::<MealType>()
        .map_err(|_| rusqlite::Error::InvalidColumnType(2, "meal".into(), Type::Text))?;
    Ok(PlannedMeal {
        id: row.get(0)?,
        date,
        meal,
        recipe_id: row.get(3)?,
        recipe_title: row.get(4)?,
    })
}

fn ensure_recipe_exists(conn: &Connection, recipe_id: &str) -> Result<String> {
    conn.query_row(
        "SELECT title FROM recipes WHERE id = ?1",
        params![recipe_id],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .context("checking recipe existence")?
    .ok_or_else(|| anyhow!("recipe {recipe_id} not found"))
}

fn insert_notification(
    conn: &Connection,
    message: &str,
    recipe_id: Option<&str>,
    created_at: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO notifications (message, recipe_id, created_at, read) VALUES (?1, ?2, ?3, 0)",
        params![message, recipe_id, created_at],
    )
    .context("recording notification")?;
    Ok(())
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(clause) = build_clause(None, &query.terms) {
        clauses.push(clause);
    }
    if let Some(clause) = build_clause(Some("title"), &query.title_terms) {
        clauses.push(clause);
    }
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn build_clause(column: Option<&str>, terms: &[String]) -> Option<String> {
    let parts: Vec<String> = terms
        .iter()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .map(|term| {
            let quoted = format!("\"{}\"*", term.replace('"', "\"\""));
            match column {
                Some(col) => format!("{col}:{quoted}"),
                None => quoted,
            }
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}

fn prioritize_title_matches(recipes: Vec<Recipe>, tokens: &[String]) -> Vec<Recipe> {
    if tokens.is_empty() {
        return recipes;
    }
    let (mut with_title, without_title): (Vec<_>, Vec<_>) = recipes
        .into_iter()
        .partition(|recipe| title_contains_any(&recipe.title, tokens));
    with_title.extend(without_title);
    with_title
}

fn title_contains_any(title: &str, tokens: &[String]) -> bool {
    let haystack = title.to_lowercase();
    tokens
        .iter()
        .any(|token| !token.is_empty() && haystack.contains(token.as_str()))
}

fn apply_filters(recipes: &mut Vec<Recipe>, query: &SearchQuery) {
    if !query.has_filters() {
        return;
    }
    recipes.retain(|recipe| {
        if !query.authors.is_empty() {
            let author = recipe.author.to_lowercase();
            if !query.authors.iter().any(|wanted| author.starts_with(wanted)) {
                return false;
            }
        }
        if !query.categories.is_empty() {
            let category = recipe.category.to_lowercase();
            if !query.categories.iter().any(|wanted| *wanted == category) {
                return false;
            }
        }
        if let Some(max) = query.max_minutes {
            if recipe.cook_minutes > max {
                return false;
            }
        }
        true
    });
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        paths.database_path.clone()
    } else {
        storage.database_path.clone()
    };
    let image_dir = if storage.image_dir.as_os_str().is_empty() {
        paths.image_dir.clone()
    } else {
        storage.image_dir.clone()
    };
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    if !existed && storage.seed_on_first_run {
        seed_initial_recipes(&conn)?;
    }
    Ok(StorageHandle {
        db_path: Arc::new(db_path),
        options: Arc::new(storage.clone()),
        images: ImageStore::new(image_dir),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)
        .context("enabling foreign keys")?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

fn seed_initial_recipes(conn: &Connection) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row("SELECT seq FROM recipes LIMIT 1", [], |row| row.get(0))
        .optional()
        .context("checking for existing recipes")?;
    if existing.is_some() {
        return Ok(());
    }

    tracing::info!("seeding first-run recipes");
    let now = now_epoch();
    for (username, display_name) in [("nadia", "Nadia Haddad"), ("marco", "Marco Bellini")] {
        conn.execute(
            "INSERT OR IGNORE INTO users (username, display_name, created_at) VALUES (?1, ?2, ?3)",
            params![username, display_name, now],
        )
        .context("inserting seed user")?;
    }

    let recipes: [(&str, &str, &str, u32, &[&str], &[&str], &str); 4] = [
        (
            "Shakshuka",
            "Eggs poached in a spiced tomato and pepper sauce.",
            "breakfast",
            30,
            &["4 eggs", "1 can tomatoes", "1 red pepper", "1 tsp cumin"],
            &["Soften the pepper", "Add tomatoes and cumin", "Crack in eggs and cover"],
            "nadia",
        ),
        (
            "Lemon Tart",
            "Short crust filled with a sharp lemon custard.",
            "dessert",
            75,
            &["1 tart shell", "4 lemons", "3 eggs", "150 g sugar"],
            &["Blind bake the shell", "Whisk the filling", "Bake until just set"],
            "nadia",
        ),
        (
            "Pasta e Ceci",
            "Chickpea and pasta soup with rosemary.",
            "dinner",
            35,
            &["200 g ditalini", "1 can chickpeas", "1 sprig rosemary", "2 cloves garlic"],
            &["Fry garlic and rosemary", "Simmer chickpeas", "Cook pasta in the broth"],
            "marco",
        ),
        (
            "Basil Pesto",
            "Classic Genovese pesto for pasta or sandwiches.",
            "sauce",
            10,
            &["2 cups basil", "50 g parmesan", "30 g pine nuts", "olive oil"],
            &["Pound garlic and nuts", "Add basil", "Loosen with oil and cheese"],
            "marco",
        ),
    ];

    for (offset, (title, description, category, minutes, ingredients, steps, author)) in
        recipes.into_iter().enumerate()
    {
        let ingredients = serde_json::to_string(ingredients).context("encoding seed ingredients")?;
        let steps = serde_json::to_string(steps).context("encoding seed steps")?;
        let created = now - offset as i64;
        conn.execute(
            "INSERT INTO recipes (id, title, description, category, cook_minutes, servings,
                                  ingredients, steps, author, saved, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 2, ?6, ?7, ?8, 0, ?9, ?9)",
            params![
                Uuid::new_v4().to_string(),
                title,
                description,
                category,
                minutes,
                ingredients,
                steps,
                author,
                created
            ],
        )
        .context("inserting seed recipe")?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::search::parse_query;
    use assert_matches::assert_matches;
    use tempfile::TempDir;
    use time::macros::date;

    pub(crate) fn init_storage() -> anyhow::Result<(TempDir, StorageHandle)> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted(temp.path());
        paths.ensure_directories()?;
        let mut options = StorageOptions::default();
        options.seed_on_first_run = false;
        let storage = init(&paths, &options)?;
        storage.ensure_user("me", "Home Cook")?;
        Ok((temp, storage))
    }

    pub(crate) fn recipe(title: &str, category: &str, minutes: u32, author: &str) -> NewRecipe {
        NewRecipe {
            title: title.into(),
            description: format!("{title} description"),
            category: category.into(),
            cook_minutes: minutes,
            servings: 2,
            ingredients: vec!["salt".into(), "  ".into(), "olive oil".into()],
            steps: vec!["cook".into()],
            image_url: None,
            author: author.into(),
        }
    }

    #[test]
    fn create_and_fetch_recipe_round_trips_lists() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let id = storage.create_recipe(&recipe("Tomato Soup", "Dinner", 25, "me"))?;
        let fetched = storage.fetch_recipe(&id)?.expect("recipe present");
        assert_eq!(fetched.title, "Tomato Soup");
        assert_eq!(fetched.category, "dinner");
        assert_eq!(fetched.ingredients, vec!["salt", "olive oil"]);
        assert!(!fetched.saved);
        assert!(storage.fetch_recipe("missing")?.is_none());
        Ok(())
    }

    #[test]
    fn create_rejects_blank_title() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        assert!(storage.create_recipe(&recipe("   ", "dinner", 5, "me")).is_err());
        Ok(())
    }

    #[test]
    fn feed_is_newest_first() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let first = storage.create_recipe(&recipe("First", "", 5, "me"))?;
        let second = storage.create_recipe(&recipe("Second", "", 5, "me"))?;
        let feed = storage.fetch_feed(10)?;
        assert_eq!(feed[0].id, second);
        assert_eq!(feed[1].id, first);
        Ok(())
    }

    #[test]
    fn search_prefers_title_matches_over_ingredient_hits() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let title_hit = storage.create_recipe(&recipe("Garlic Bread", "side", 15, "me"))?;
        let mut body = recipe("Roast Chicken", "dinner", 90, "me");
        body.ingredients = vec!["1 chicken".into(), "garlic".into()];
        let body_hit = storage.create_recipe(&body)?;

        let results = storage.search_recipes(&parse_query("garlic"), 10)?;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, title_hit);
        assert_eq!(results[1].id, body_hit);
        assert!(results[1].snippet.is_some());
        Ok(())
    }

    #[test]
    fn search_applies_author_category_and_time_filters() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.ensure_user("nadia", "Nadia")?;
        let quick = storage.create_recipe(&recipe("Quick Salad", "lunch", 10, "nadia"))?;
        storage.create_recipe(&recipe("Slow Salad", "lunch", 120, "nadia"))?;
        storage.create_recipe(&recipe("Other Salad", "lunch", 10, "me"))?;
        storage.create_recipe(&recipe("Dinner Salad", "dinner", 10, "nadia"))?;

        let results =
            storage.search_recipes(&parse_query("salad by:nad category:lunch max:30"), 10)?;
        let ids: Vec<_> = results.iter().map(|recipe| recipe.id.clone()).collect();
        assert_eq!(ids, vec![quick]);

        let filter_only = storage.search_recipes(&parse_query("max:15"), 10)?;
        assert_eq!(filter_only.len(), 3);
        Ok(())
    }

    #[test]
    fn search_handles_quotes_in_terms() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.create_recipe(&recipe("Grandma's Pie", "dessert", 60, "me"))?;
        let results = storage.search_recipes(&parse_query("grandma's"), 10)?;
        assert!(results.len() <= 1);
        Ok(())
    }

    #[test]
    fn filters_reach_recipes_older_than_one_batch() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let cake = storage.create_recipe(&recipe("Chocolate Cake", "dessert", 60, "me"))?;
        for idx in 0..FTS_ROW_LIMIT {
            storage.create_recipe(&recipe(&format!("Dinner Cake {idx}"), "dinner", 30, "me"))?;
        }

        let filter_only = storage.search_recipes(&parse_query("category:dessert"), 10)?;
        assert_eq!(filter_only.len(), 1);
        assert_eq!(filter_only[0].id, cake);

        let with_terms = storage.search_recipes(&parse_query("cake category:dessert"), 10)?;
        assert_eq!(with_terms.len(), 1);
        assert_eq!(with_terms[0].id, cake);

        let unfiltered = storage.search_recipes(&parse_query("cake"), 10)?;
        assert_eq!(unfiltered.len(), 10);
        Ok(())
    }

    #[test]
    fn search_users_matches_substrings_case_insensitively() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.ensure_user("alice", "Alice Waters")?;
        storage.ensure_user("malik", "Malik")?;
        storage.ensure_user("bob", "Robert")?;
        storage.create_recipe(&recipe("Chez Soup", "", 20, "alice"))?;

        let users = storage.search_users("ALI", 10)?;
        let names: Vec<_> = users.iter().map(|user| user.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "malik"]);
        assert_eq!(users[0].recipe_count, 1);
        assert!(storage.search_users("%", 10)?.is_empty());
        Ok(())
    }

    #[test]
    fn saving_records_a_single_notification() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let id = storage.create_recipe(&recipe("Flatbread", "", 20, "me"))?;
        storage.set_saved(&id, true)?;
        storage.set_saved(&id, true)?;
        assert_eq!(storage.fetch_saved(10)?.len(), 1);

        let notifications = storage.list_notifications(10)?;
        assert_eq!(notifications.len(), 2);
        assert!(notifications.iter().any(|notification| notification.message == "Saved \"Flatbread\""));
        assert_eq!(storage.unread_notifications()?, 2);
        assert_eq!(storage.mark_notifications_read()?, 2);
        assert_eq!(storage.unread_notifications()?, 0);

        storage.set_saved(&id, false)?;
        assert!(storage.fetch_saved(10)?.is_empty());
        assert!(storage.set_saved("missing", true).is_err());
        Ok(())
    }

    #[test]
    fn collections_group_recipes() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let soup = storage.create_recipe(&recipe("Soup", "", 20, "me"))?;
        let stew = storage.create_recipe(&recipe("Stew", "", 20, "me"))?;
        let winter = storage.create_collection("Winter")?;
        assert!(storage.create_collection("winter").is_err());

        assert!(storage.add_to_collection(winter, &soup)?);
        assert!(!storage.add_to_collection(winter, &soup)?);
        assert!(storage.add_to_collection(winter, &stew)?);
        assert!(storage.add_to_collection(winter, "missing").is_err());

        let listed = storage.list_collections()?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].recipe_count, 2);
        assert_eq!(storage.find_collection("WINTER")?.map(|c| c.id), Some(winter));

        storage.remove_from_collection(winter, &soup)?;
        let remaining = storage.collection_recipes(winter)?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, stew);

        storage.delete_recipe(&stew)?;
        assert!(storage.collection_recipes(winter)?.is_empty());
        storage.delete_collection(winter)?;
        assert!(storage.list_collections()?.is_empty());
        Ok(())
    }

    #[test]
    fn meal_plan_queries_by_inclusive_range() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let oats = storage.create_recipe(&recipe("Oats", "breakfast", 5, "me"))?;
        let curry = storage.create_recipe(&recipe("Curry", "dinner", 40, "me"))?;

        storage.plan_meal(date!(2026 - 03 - 01), MealType::Dinner, &curry)?;
        let breakfast = storage.plan_meal(date!(2026 - 03 - 01), MealType::Breakfast, &oats)?;
        let again = storage.plan_meal(date!(2026 - 03 - 01), MealType::Breakfast, &oats)?;
        assert_eq!(breakfast, again);
        storage.plan_meal(date!(2026 - 03 - 07), MealType::Lunch, &curry)?;
        storage.plan_meal(date!(2026 - 03 - 08), MealType::Lunch, &curry)?;

        let week = storage.meals_between(date!(2026 - 03 - 01), date!(2026 - 03 - 07))?;
        assert_eq!(week.len(), 3);
        assert_eq!(week[0].meal, MealType::Breakfast);
        assert_eq!(week[0].recipe_title, "Oats");
        assert_eq!(week[1].meal, MealType::Dinner);
        assert_eq!(week[2].date, date!(2026 - 03 - 07));

        storage.unplan_meal(breakfast)?;
        assert_eq!(storage.meals_on(date!(2026 - 03 - 01))?.len(), 1);
        assert_matches!(storage.unplan_meal(breakfast), Err(_));
        assert!(storage
            .plan_meal(date!(2026 - 03 - 02), MealType::Snack, "missing")
            .is_err());
        Ok(())
    }

    #[test]
    fn seeded_database_has_recipes_and_authors() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted(temp.path());
        let storage = init(&paths, &StorageOptions::default())?;
        assert_eq!(storage.fetch_feed(10)?.len(), 4);
        let nadia = storage.fetch_user("NADIA")?.expect("seed user");
        assert_eq!(nadia.recipe_count, 2);
        assert_eq!(storage.recipes_by_author("marco", 10)?.len(), 2);

        // Reopening does not seed twice.
        let reopened = init(&paths, &StorageOptions::default())?;
        assert_eq!(reopened.fetch_feed(10)?.len(), 4);
        Ok(())
    }

    #[test]
    fn update_recipe_rewrites_fields_and_search_index() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let id = storage.create_recipe(&recipe("Plain Rice", "side", 20, "me"))?;
        let mut changed = recipe("Saffron Rice", "side", 25, "me");
        changed.image_url = Some("file:///tmp/rice.png".into());
        storage.update_recipe(&id, &changed)?;

        let fetched = storage.fetch_recipe(&id)?.expect("recipe");
        assert_eq!(fetched.title, "Saffron Rice");
        assert_eq!(fetched.image_url.as_deref(), Some("file:///tmp/rice.png"));
        assert!(storage.search_recipes(&parse_query("plain"), 10)?.is_empty());
        assert_eq!(storage.search_recipes(&parse_query("saffron"), 10)?.len(), 1);
        assert!(storage.update_recipe("missing", &changed).is_err());
        Ok(())
    }
}
