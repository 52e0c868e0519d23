pub mod queries;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Error;

use crate::config::DatabaseSettings;

pub use queries::categories::Category;
pub use queries::questions::Question;

pub async fn establish_connection(settings: &DatabaseSettings) -> Result<SqlitePool, Error> {
    let options =
        SqliteConnectOptions::from_str(&settings.url)?.create_if_missing(settings.create_if_missing);
    SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    use super::queries::questions::create_question;
    use super::run_migrations;

    /// Single-connection in-memory pool: every connection to `:memory:` is its
    /// own database, so the pool must never open a second one.
    pub(crate) async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    /// Twelve Science questions, three Art, two History.
    pub(crate) async fn seeded_pool() -> SqlitePool {
        let pool = memory_pool().await;
        for n in 1..=12 {
            let text = format!("Science question number {n}?");
            create_question(&pool, &text, "Answer", 1, 1 + n % 5)
                .await
                .unwrap();
        }
        for title in [
            "Which painter cut off his ear?",
            "What is the title of the Mona Lisa in Italian?",
            "Who painted the Sistine Chapel ceiling?",
        ] {
            create_question(&pool, title, "Answer", 2, 2).await.unwrap();
        }
        for title in [
            "In which year did the Berlin Wall fall?",
            "Who was the first Roman emperor?",
        ] {
            create_question(&pool, title, "Answer", 4, 3).await.unwrap();
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::testing::memory_pool;
    use super::queries::categories::get_all_categories;

    #[tokio::test]
    async fn migrations_seed_categories() {
        let pool = memory_pool().await;
        let categories = get_all_categories(&pool).await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(
            names,
            ["Science", "Art", "Geography", "History", "Entertainment", "Sports"]
        );
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = memory_pool().await;
        super::run_migrations(&pool).await.unwrap();
        assert_eq!(get_all_categories(&pool).await.unwrap().len(), 6);
    }
}
