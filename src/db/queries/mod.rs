//! Typed queries, grouped by entity, as methods on [`Database`](super::Database).

pub mod analytics;
pub mod appointments;
pub mod articles;
pub mod doctors;
pub mod encounters;
pub mod patients;
pub mod prescriptions;
pub mod users;
pub mod voice;

use sqlx::{Executor, Sqlite};

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Slugs in `table` equal to `base` or of the form `base-N`.
pub(crate) async fn slugs_like<'e, E>(
    executor: E,
    table: &'static str,
    base: &str,
) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT slug FROM {} WHERE slug = ? OR slug LIKE ?", table);
    sqlx::query_scalar(&sql)
        .bind(base)
        .bind(format!("{}-%", base))
        .fetch_all(executor)
        .await
}
