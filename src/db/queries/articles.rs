use tracing::{info, instrument};

use super::{new_id, slugs_like};
use crate::audit::{self, Action};
use crate::core::slug::{slugify, unique_slug};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::article::{Article, ArticleQuery, ArticleUpdate, NewArticle};
use crate::models::{non_blank, Timestamp};

impl Database {
    /// Published articles, newest first, optionally by one doctor's slug.
    #[instrument(skip(self, query))]
    pub async fn list_published_articles(
        &self,
        query: &ArticleQuery,
    ) -> Result<(Vec<Article>, i64), ApiError> {
        let pagination = query.pagination();
        let doctor = query.doctor.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles a
             LEFT JOIN doctors d ON d.id = a.author_doctor_id
             WHERE a.published = 1 AND (?1 IS NULL OR d.slug = ?1)",
        )
        .bind(doctor)
        .fetch_one(self.pool())
        .await?;

        let articles = sqlx::query_as::<_, Article>(
            "SELECT a.* FROM articles a
             LEFT JOIN doctors d ON d.id = a.author_doctor_id
             WHERE a.published = 1 AND (?1 IS NULL OR d.slug = ?1)
             ORDER BY a.published_at DESC, a.created_at DESC, a.id
             LIMIT ?2 OFFSET ?3",
        )
        .bind(doctor)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool())
        .await?;

        Ok((articles, total))
    }

    pub async fn find_published_article(&self, slug: &str) -> Result<Article, ApiError> {
        sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE slug = ? AND published = 1")
            .bind(slug)
            .fetch_optional(self.pool())
            .await?
            .ok_or(ApiError::NotFound("article"))
    }

    pub async fn find_article(&self, id: &str) -> Result<Article, ApiError> {
        sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(ApiError::NotFound("article"))
    }

    /// Every article, or only one author's when `author` is given. Drafts included.
    pub async fn list_articles_for(&self, author: Option<&str>) -> Result<Vec<Article>, ApiError> {
        let articles = sqlx::query_as::<_, Article>(
            "SELECT * FROM articles
             WHERE (?1 IS NULL OR author_doctor_id = ?1)
             ORDER BY updated_at DESC, id",
        )
        .bind(author)
        .fetch_all(self.pool())
        .await?;
        Ok(articles)
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    pub async fn create_article(
        &self,
        author_doctor_id: Option<String>,
        new: NewArticle,
        actor_id: &str,
    ) -> Result<Article, ApiError> {
        let base = slugify(&new.title);
        if base.is_empty() {
            return Err(ApiError::invalid("title", "must contain letters or digits"));
        }

        let mut tx = self.pool().begin().await?;
        let taken = slugs_like(&mut *tx, "articles", &base).await?;
        let now = Timestamp::now();
        let article = Article {
            id: new_id(),
            author_doctor_id,
            slug: unique_slug(&base, &taken),
            title: new.title.trim().to_string(),
            excerpt: non_blank(new.excerpt),
            body: new.body,
            published: new.published,
            published_at: new.published.then_some(now),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO articles (
                id, author_doctor_id, slug, title, excerpt, body, published,
                published_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&article.id)
        .bind(&article.author_doctor_id)
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.excerpt)
        .bind(&article.body)
        .bind(article.published)
        .bind(article.published_at)
        .bind(article.created_at)
        .bind(article.updated_at)
        .execute(&mut *tx)
        .await?;
        audit::record(&mut *tx, actor_id, Action::Create, "article", &article.id, &article).await?;
        tx.commit().await?;

        info!(article_id = %article.id, slug = %article.slug, "article created");
        Ok(article)
    }

    /// Save an edited article; the slug stays stable across title changes.
    #[instrument(skip(self, article, update), fields(article_id = %article.id))]
    pub async fn update_article(
        &self,
        mut article: Article,
        update: ArticleUpdate,
        actor_id: &str,
    ) -> Result<Article, ApiError> {
        let now = Timestamp::now();
        update.apply(&mut article, now);
        article.updated_at = now;

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "UPDATE articles SET title = ?, excerpt = ?, body = ?, published = ?,
                published_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&article.title)
        .bind(&article.excerpt)
        .bind(&article.body)
        .bind(article.published)
        .bind(article.published_at)
        .bind(article.updated_at)
        .bind(&article.id)
        .execute(&mut *tx)
        .await?;
        audit::record(&mut *tx, actor_id, Action::Update, "article", &article.id, &article).await?;
        tx.commit().await?;

        info!(article_id = %article.id, "article updated");
        Ok(article)
    }

    #[instrument(skip(self))]
    pub async fn delete_article(&self, id: &str, actor_id: &str) -> Result<(), ApiError> {
        let mut tx = self.pool().begin().await?;
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("article"));
        }
        audit::record(&mut *tx, actor_id, Action::Delete, "article", id, id).await?;
        tx.commit().await?;

        info!(article_id = %id, "article deleted");
        Ok(())
    }

    pub async fn count_published_articles(&self) -> Result<i64, ApiError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE published = 1")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
