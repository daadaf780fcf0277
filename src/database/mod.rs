use anyhow::Result;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, migrate::MigrateDatabase};
use std::path::Path;
use tracing::{debug, info};

use crate::models::UnifiedRow;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Create database file if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            if let Some(parent) = db_file(db_url).and_then(Path::parent)
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }

            info!("Creating database file");
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePool::connect(db_url).await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        // Run migrations
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(Self { pool })
    }

    /// Upsert every attempted (SKU, competitor) row; re-running a batch replaces, never duplicates
    pub async fn save_rows(&self, rows: &[UnifiedRow]) -> Result<usize> {
        let updated_at = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut saved = 0;

        for row in rows {
            let Some(status) = row.status else {
                continue;
            };

            sqlx::query(
                r"
                INSERT INTO competitor_prices
                    (sku, competitor, my_price, competitor_price, competitor_link, comparison, status, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (sku, competitor) DO UPDATE SET
                    my_price = excluded.my_price,
                    competitor_price = excluded.competitor_price,
                    competitor_link = excluded.competitor_link,
                    comparison = excluded.comparison,
                    status = excluded.status,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(&row.sku)
            .bind(&row.competitor)
            .bind((!row.my_price.is_empty()).then_some(row.my_price.as_str()))
            .bind(&row.competitor_price)
            .bind(&row.competitor_link)
            .bind(&row.comparison)
            .bind(status.as_str())
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;

            saved += 1;
        }

        tx.commit().await?;
        debug!("Upserted {} competitor price rows", saved);
        Ok(saved)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

/// Filesystem path of a `sqlite:` URL, if it names a file
fn db_file(db_url: &str) -> Option<&Path> {
    let path = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;

    (!path.is_empty() && path != ":memory:").then(|| Path::new(path))
}

#[cfg(test)]
mod tests {
    use sqlx::Row;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::models::{Price, PriceEntry, PriceStatus};
    use crate::reconciler::Reconciler;

    async fn in_memory() -> Database {
        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Database::from_pool(pool).await.unwrap()
    }

    async fn fetch(db: &Database) -> Vec<(String, String, Option<String>, String, String)> {
        sqlx::query(
            "SELECT sku, competitor, my_price, competitor_price, status FROM competitor_prices ORDER BY competitor, sku",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap()
        .into_iter()
        .map(|row| {
            (
                row.get("sku"),
                row.get("competitor"),
                row.get("my_price"),
                row.get("competitor_price"),
                row.get("status"),
            )
        })
        .collect()
    }

    fn reconciler() -> Reconciler {
        let mut reconciler = Reconciler::new(vec!["Diamond".to_string(), "Naheed".to_string()]);
        reconciler.seed("ABC123", Price::parse_amount("100"));
        reconciler.upsert(
            "ABC123",
            None,
            "Diamond",
            PriceEntry::found("https://dsmonline.pk/p/1", Price::from_cents(12_000)),
        );
        reconciler
    }

    #[tokio::test]
    async fn test_save_skips_unattempted_rows() {
        let db = in_memory().await;
        let saved = db.save_rows(&reconciler().rows()).await.unwrap();

        assert_eq!(saved, 1);
        assert_eq!(
            fetch(&db).await,
            vec![(
                "ABC123".to_string(),
                "Diamond".to_string(),
                Some("100.00".to_string()),
                "120.00".to_string(),
                PriceStatus::Found.as_str().to_string(),
            )]
        );
    }

    #[tokio::test]
    async fn test_rerun_upserts_instead_of_duplicating() {
        let db = in_memory().await;
        let mut reconciler = reconciler();
        db.save_rows(&reconciler.rows()).await.unwrap();

        reconciler.upsert(
            "ABC123",
            None,
            "Diamond",
            PriceEntry::not_found("https://dsmonline.pk/p/1"),
        );
        reconciler.upsert("XYZ789", None, "Naheed", PriceEntry::no_link(""));
        db.save_rows(&reconciler.rows()).await.unwrap();

        let rows = fetch(&db).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].3, "None");
        assert_eq!(rows[0].4, "not_found");
        assert_eq!(rows[1].0, "XYZ789");
        assert_eq!(rows[1].2, None);
        assert_eq!(rows[1].4, "no_link");
    }

    #[test]
    fn test_db_file_from_url() {
        assert_eq!(db_file("sqlite:database/prices.db"), Some(Path::new("database/prices.db")));
        assert_eq!(db_file("sqlite://data/p.db?mode=rwc"), Some(Path::new("data/p.db")));
        assert_eq!(db_file("sqlite::memory:"), None);
        assert_eq!(db_file("postgres://localhost/db"), None);
    }
}
