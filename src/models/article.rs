use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Pagination, Timestamp};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Article {
    pub id: String,
    pub author_doctor_id: Option<String>,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub published: bool,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewArticle {
    /// Only honoured for administrators; doctors always author as themselves.
    pub author_doctor_id: Option<String>,
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1, max = 100000))]
    pub body: String,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ArticleUpdate {
    #[validate(length(min = 3, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1, max = 100000))]
    pub body: Option<String>,
    pub published: Option<bool>,
}

impl ArticleUpdate {
    pub fn apply(self, article: &mut Article, now: Timestamp) {
        if let Some(v) = self.title {
            article.title = v.trim().to_string();
        }
        if self.excerpt.is_some() {
            article.excerpt = super::non_blank(self.excerpt);
        }
        if let Some(v) = self.body {
            article.body = v;
        }
        if let Some(published) = self.published {
            article.published = published;
            if published && article.published_at.is_none() {
                article.published_at = Some(now);
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleQuery {
    /// Slug of the authoring doctor.
    pub doctor: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ArticleQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Article {
        let now = Timestamp::from_unix(1_700_000_000).unwrap();
        Article {
            id: "a1".into(),
            author_doctor_id: None,
            slug: "hello".into(),
            title: "Hello".into(),
            excerpt: None,
            body: "text".into(),
            published: false,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn first_publish_stamps_published_at_once() {
        let mut article = draft();
        let t1 = Timestamp::from_unix(1_700_000_100).unwrap();
        let t2 = Timestamp::from_unix(1_700_000_200).unwrap();

        ArticleUpdate {
            published: Some(true),
            ..Default::default()
        }
        .apply(&mut article, t1);
        assert_eq!(article.published_at, Some(t1));

        ArticleUpdate {
            published: Some(false),
            ..Default::default()
        }
        .apply(&mut article, t2);
        ArticleUpdate {
            published: Some(true),
            ..Default::default()
        }
        .apply(&mut article, t2);
        assert_eq!(article.published_at, Some(t1));
    }
}
