//! End-to-end search tests against a temporary SQLite database and a scripted oracle.

use async_trait::async_trait;
use recipe_finder::config::PlannerConfig;
use recipe_finder::error::{FinderError, Result};
use recipe_finder::execution::{ExecutionEngine, SqliteEngine};
use recipe_finder::llm::Oracle;
use recipe_finder::loader::RecipeLoader;
use recipe_finder::planner::QueryPlanner;
use recipe_finder::search::SearchService;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Returns a fixed reply and remembers the user prompts it was given.
struct ScriptedOracle {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        Ok(self.reply.clone())
    }
}

fn seed_database(dir: &TempDir) -> PathBuf {
    let dump = json!([
        {"title": "Margherita Pizza", "cook_time": 15, "prep_time": 20, "ratings": 4.5,
         "cuisine": "italian", "category": "pizza", "author": "Ada",
         "image": "https://img.taste.com.au/margherita.jpg",
         "ingredients": ["flour", "water", "yeast", "salt", "tomato", "mozzarella", "basil",
                         "olive oil", "oregano"]},
        {"title": "Spaghetti Carbonara", "cook_time": "12", "ratings": "4.8",
         "cuisine": "italian", "category": "pasta",
         "ingredients": ["spaghetti", "egg", "pecorino", "guanciale"]},
        {"title": "Risotto", "cook_time": 30, "ratings": 4.1, "cuisine": "italian",
         "image": "https://img.taste.com.au/risotto.jpg", "ingredients": ["rice", "stock"]},
        {"title": "Pad Thai", "cook_time": 20, "ratings": 4.2, "cuisine": "thai",
         "ingredients": ["noodles", "tamarind", "peanuts"]}
    ]);
    let json_path = dir.path().join("recipes-en.json");
    std::fs::write(&json_path, dump.to_string()).unwrap();

    let db_path = dir.path().join("data/recipes.db");
    let mut loader = RecipeLoader::open(&db_path).unwrap();
    let report = loader.import(&json_path, false).unwrap();
    assert_eq!(report.inserted, 4);
    db_path
}

fn service(db_path: PathBuf, oracle: Arc<ScriptedOracle>) -> SearchService {
    let engine: Arc<dyn ExecutionEngine> = Arc::new(SqliteEngine::new(db_path));
    SearchService::new(QueryPlanner::new(oracle, PlannerConfig::default()), engine)
}

#[tokio::test]
async fn test_paginated_search_reports_total() {
    let dir = TempDir::new().unwrap();
    let oracle = ScriptedOracle::new(
        "SELECT * FROM recipes WHERE cuisine = 'italian' ORDER BY ratings DESC LIMIT 2",
    );
    let service = service(seed_database(&dir), oracle.clone());

    let response = service.search("best italian recipes", Some(2)).await.unwrap();

    assert_eq!(
        response.sql,
        "SELECT * FROM recipes WHERE cuisine = 'italian' ORDER BY ratings DESC LIMIT 2;"
    );
    assert_eq!(response.count, 2);
    assert_eq!(response.total, Some(3));
    assert_eq!(response.results[0]["title"], json!("Spaghetti Carbonara"));
    assert_eq!(response.results[1]["title"], json!("Margherita Pizza"));

    let prompts = oracle.prompts.lock().unwrap();
    assert!(prompts[0].contains("LIMIT 2"));
}

#[tokio::test]
async fn test_fenced_reply_is_unwrapped() {
    let dir = TempDir::new().unwrap();
    let oracle = ScriptedOracle::new("Here you go:\n```sql\nSELECT title FROM recipes LIMIT 3\n```");
    let service = service(seed_database(&dir), oracle);

    let response = service.search("three recipes", None).await.unwrap();
    assert_eq!(response.sql, "SELECT title FROM recipes LIMIT 3;");
    assert_eq!(response.count, 3);
    assert_eq!(response.total, Some(4));
}

#[tokio::test]
async fn test_destructive_reply_never_executes() {
    let dir = TempDir::new().unwrap();
    let db_path = seed_database(&dir);
    let oracle = ScriptedOracle::new("Sure! DELETE FROM recipes;");
    let service = service(db_path.clone(), oracle);

    let err = service.search("remove everything", None).await.unwrap_err();
    assert!(matches!(err, FinderError::UnsafeQuery(_)));

    let loader = RecipeLoader::open(&db_path).unwrap();
    assert_eq!(loader.row_count().unwrap(), 4);
}

#[tokio::test]
async fn test_images_are_attached_for_id_projections() {
    let dir = TempDir::new().unwrap();
    let oracle = ScriptedOracle::new("SELECT id, title FROM recipes WHERE cuisine = 'italian' ORDER BY id");
    let service = service(seed_database(&dir), oracle);

    let response = service.search("italian dishes", None).await.unwrap();
    assert_eq!(response.count, 3);
    for row in &response.results {
        assert!(row.contains_key("image"));
    }
    assert_eq!(
        response.results[0]["image"],
        json!("https://img.taste.com.au/margherita.jpg")
    );
    assert_eq!(response.results[1]["image"], Value::Null);

    let keys: Vec<&str> = response.results[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["id", "title", "image"]);
}

#[tokio::test]
async fn test_ingredient_preview_is_bounded() {
    let dir = TempDir::new().unwrap();
    let oracle = ScriptedOracle::new(
        "SELECT title, ingredients_json FROM recipes WHERE title = 'Margherita Pizza'",
    );
    let service = service(seed_database(&dir), oracle);

    let response = service.search("margherita ingredients", None).await.unwrap();
    let row = &response.results[0];
    assert_eq!(
        row["ingredients_preview"],
        json!(["flour", "water", "yeast", "salt", "tomato", "mozzarella", "basil", "olive oil"])
    );
    assert!(!row.contains_key("image"));
}

#[tokio::test]
async fn test_database_is_not_writable_through_search() {
    let dir = TempDir::new().unwrap();
    let db_path = seed_database(&dir);
    let oracle = ScriptedOracle::new("SELECT 1; DROP TABLE recipes;");
    let service = service(db_path.clone(), oracle);

    let response = service.search("anything", None).await.unwrap();
    assert_eq!(response.sql, "SELECT 1;");

    let loader = RecipeLoader::open(&db_path).unwrap();
    assert_eq!(loader.row_count().unwrap(), 4);
}

#[tokio::test]
async fn test_execution_error_surfaces() {
    let dir = TempDir::new().unwrap();
    let oracle = ScriptedOracle::new("SELECT calories FROM recipes");
    let service = service(seed_database(&dir), oracle);

    let err = service.search("calories", None).await.unwrap_err();
    assert!(matches!(err, FinderError::Execution(_)));
    assert!(err.is_client_facing());
}
