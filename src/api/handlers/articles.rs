use actix_web::{web, HttpResponse};
use validator::Validate;

use super::created;
use crate::api::middleware::{authorize, AuthUser, Capability};
use crate::error::{ApiError, ApiResult};
use crate::models::article::{ArticleQuery, ArticleUpdate, NewArticle};
use crate::models::{non_blank, Page};
use crate::AppState;

pub async fn list_published(
    state: web::Data<AppState>,
    query: web::Query<ArticleQuery>,
) -> ApiResult<HttpResponse> {
    let (articles, total) = state.db.list_published_articles(&query).await?;
    Ok(HttpResponse::Ok().json(Page::new(articles, &query.pagination(), total)))
}

pub async fn get_published(
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let article = state.db.find_published_article(&slug).await?;
    Ok(HttpResponse::Ok().json(article))
}

/// Drafts and published articles: all of them for admins, own for doctors.
pub async fn list_for_portal(
    state: web::Data<AppState>,
    caller: AuthUser,
) -> ApiResult<HttpResponse> {
    let author = if caller.is_admin() {
        None
    } else {
        Some(caller.practice()?)
    };
    let articles = state.db.list_articles_for(author).await?;
    Ok(HttpResponse::Ok().json(articles))
}

pub async fn create(
    state: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<NewArticle>,
) -> ApiResult<HttpResponse> {
    let mut body = body.into_inner();
    body.validate()?;

    let author = if caller.is_admin() {
        match non_blank(body.author_doctor_id.take()) {
            Some(id) => {
                state.db.find_doctor(&id).await?.ok_or_else(|| {
                    ApiError::invalid("author_doctor_id", "does not reference a doctor")
                })?;
                Some(id)
            }
            None => None,
        }
    } else {
        Some(caller.practice()?.to_string())
    };

    let article = state.db.create_article(author, body, caller.id()).await?;
    Ok(created(&article))
}

pub async fn update(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
    body: web::Json<ArticleUpdate>,
) -> ApiResult<HttpResponse> {
    let article = state.db.find_article(&id).await?;
    authorize(&caller, Capability::Article(article.author_doctor_id.as_deref()))?;
    let body = body.into_inner();
    body.validate()?;
    let article = state.db.update_article(article, body, caller.id()).await?;
    Ok(HttpResponse::Ok().json(article))
}

pub async fn delete(
    state: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let article = state.db.find_article(&id).await?;
    authorize(&caller, Capability::Article(article.author_doctor_id.as_deref()))?;
    state.db.delete_article(&article.id, caller.id()).await?;
    Ok(HttpResponse::NoContent().finish())
}
