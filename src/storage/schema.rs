use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE COLLATE NOCASE,
            display_name TEXT NOT NULL DEFAULT '',
            bio TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipes (
            seq INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            cook_minutes INTEGER NOT NULL DEFAULT 0,
            servings INTEGER NOT NULL DEFAULT 1,
            ingredients TEXT NOT NULL DEFAULT '[]',
            steps TEXT NOT NULL DEFAULT '[]',
            image_url TEXT,
            author TEXT NOT NULL COLLATE NOCASE,
            saved INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS recipes_author_idx ON recipes(author);

        CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS collection_recipes (
            collection_id INTEGER NOT NULL,
            recipe_id TEXT NOT NULL,
            added_at INTEGER NOT NULL,
            PRIMARY KEY (collection_id, recipe_id),
            FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE CASCADE,
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS meal_plans (
            id INTEGER PRIMARY KEY,
            plan_date TEXT NOT NULL,
            meal TEXT NOT NULL,
            recipe_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (plan_date, meal, recipe_id),
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS meal_plans_date_idx ON meal_plans(plan_date);

        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY,
            message TEXT NOT NULL,
            recipe_id TEXT,
            created_at INTEGER NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE SET NULL
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS fts_recipes USING fts5(
            title,
            description,
            ingredients,
            content='recipes',
            content_rowid='seq',
            tokenize='unicode61'
        );

        CREATE TRIGGER IF NOT EXISTS recipes_ai AFTER INSERT ON recipes BEGIN
            INSERT INTO fts_recipes(rowid, title, description, ingredients)
            VALUES (new.seq, new.title, new.description, new.ingredients);
        END;

        CREATE TRIGGER IF NOT EXISTS recipes_ad AFTER DELETE ON recipes BEGIN
            INSERT INTO fts_recipes(fts_recipes, rowid, title, description, ingredients)
            VALUES ('delete', old.seq, old.title, old.description, old.ingredients);
        END;

        CREATE TRIGGER IF NOT EXISTS recipes_au AFTER UPDATE ON recipes BEGIN
            INSERT INTO fts_recipes(fts_recipes, rowid, title, description, ingredients)
            VALUES ('delete', old.seq, old.title, old.description, old.ingredients);
            INSERT INTO fts_recipes(rowid, title, description, ingredients)
            VALUES (new.seq, new.title, new.description, new.ingredients);
        END;
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}
