use anyhow::Result;
use time::Date;

use crate::storage::{MealType, NewRecipe, StorageHandle};

pub struct ActionDispatcher<'a> {
    storage: &'a StorageHandle,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(storage: &'a StorageHandle) -> Self {
        Self { storage }
    }

    pub fn publish(&self, recipe: &NewRecipe) -> Result<String> {
        self.storage.create_recipe(recipe)
    }

    pub fn toggle_saved(&self, recipe_id: &str, saved: bool) -> Result<()> {
        self.storage.set_saved(recipe_id, saved)
    }

    pub fn plan(&self, date: Date, meal: MealType, recipe_id: &str) -> Result<i64> {
        self.storage.plan_meal(date, meal, recipe_id)
    }

    pub fn unplan(&self, plan_id: i64) -> Result<()> {
        self.storage.unplan_meal(plan_id)
    }

    pub fn create_collection(&self, name: &str) -> Result<i64> {
        self.storage.create_collection(name)
    }

    pub fn delete_collection(&self, collection_id: i64) -> Result<()> {
        self.storage.delete_collection(collection_id)
    }

    pub fn collect(&self, collection_id: i64, recipe_id: &str) -> Result<bool> {
        self.storage.add_to_collection(collection_id, recipe_id)
    }

    pub fn uncollect(&self, collection_id: i64, recipe_id: &str) -> Result<()> {
        self.storage.remove_from_collection(collection_id, recipe_id)
    }
}
