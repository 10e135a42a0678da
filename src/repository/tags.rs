use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres};
use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    messages,
    models::{Tag, TagResponse},
    repository::is_unique_violation,
};

const TAG_COLUMNS: &str = "id, title, user_id, created_at";

#[derive(sqlx::FromRow)]
struct PhotoTagRow {
    photo_id: i64,
    id: i64,
    title: String,
    created_at: DateTime<Utc>,
}

fn conflict_or(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(messages::TAG_ALREADY_EXISTS.to_string())
    } else {
        err.into()
    }
}

/// Returns the tag rows for `titles`, in input order
///
/// Titles that do not exist yet are created and owned by `user_id`. Must run
/// inside the caller's transaction so a failed photo insert leaves no tags.
pub async fn find_or_create_tags(
    conn: &mut PgConnection,
    titles: &[String],
    user_id: i64,
) -> AppResult<Vec<Tag>> {
    let mut tags = Vec::with_capacity(titles.len());

    for title in titles {
        // the no-op update makes RETURNING yield the existing row on conflict
        let tag = sqlx::query_as::<Postgres, Tag>(&format!(
            r#"
            INSERT INTO tags (title, user_id)
            VALUES ($1, $2)
            ON CONFLICT (title) DO UPDATE SET title = EXCLUDED.title
            RETURNING {}
            "#,
            TAG_COLUMNS
        ))
        .bind(title)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        tags.push(tag);
    }

    Ok(tags)
}

/// Links tags to a photo, keeping their order
pub async fn attach_tags(conn: &mut PgConnection, photo_id: i64, tags: &[Tag]) -> AppResult<()> {
    for (position, tag) in tags.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO photo_2_tag (photo_id, tag_id, position)
            VALUES ($1, $2, $3)
            ON CONFLICT (photo_id, tag_id) DO NOTHING
            "#,
        )
        .bind(photo_id)
        .bind(tag.id)
        .bind(position as i16)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Replaces a photo's whole tag set
pub async fn replace_photo_tags(conn: &mut PgConnection, photo_id: i64, tags: &[Tag]) -> AppResult<()> {
    sqlx::query("DELETE FROM photo_2_tag WHERE photo_id = $1")
        .bind(photo_id)
        .execute(&mut *conn)
        .await?;

    attach_tags(conn, photo_id, tags).await
}

/// Loads the tags of many photos in one query, grouped by photo id
pub async fn tags_for_photos(
    db_pool: &PgPool,
    photo_ids: &[i64],
) -> AppResult<HashMap<i64, Vec<TagResponse>>> {
    if photo_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<Postgres, PhotoTagRow>(
        r#"
        SELECT pt.photo_id, t.id, t.title, t.created_at
        FROM photo_2_tag pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.photo_id = ANY($1)
        ORDER BY pt.photo_id, pt.position
        "#,
    )
    .bind(photo_ids)
    .fetch_all(db_pool)
    .await?;

    let mut grouped: HashMap<i64, Vec<TagResponse>> = HashMap::new();
    for row in rows {
        grouped.entry(row.photo_id).or_default().push(TagResponse {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
        });
    }

    Ok(grouped)
}

pub async fn create_tag(db_pool: &PgPool, title: &str, user_id: i64) -> AppResult<Tag> {
    let tag = sqlx::query_as::<Postgres, Tag>(&format!(
        "INSERT INTO tags (title, user_id) VALUES ($1, $2) RETURNING {}",
        TAG_COLUMNS
    ))
    .bind(title)
    .bind(user_id)
    .fetch_one(db_pool)
    .await
    .map_err(conflict_or)?;

    tracing::debug!(tag_id = tag.id, title = %tag.title, "Created tag");
    Ok(tag)
}

pub async fn list_user_tags(db_pool: &PgPool, user_id: i64, skip: i64, limit: i64) -> AppResult<Vec<Tag>> {
    let tags = sqlx::query_as::<Postgres, Tag>(&format!(
        "SELECT {} FROM tags WHERE user_id = $1 ORDER BY id OFFSET $2 LIMIT $3",
        TAG_COLUMNS
    ))
    .bind(user_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(db_pool)
    .await?;

    Ok(tags)
}

pub async fn list_tags(db_pool: &PgPool, skip: i64, limit: i64) -> AppResult<Vec<Tag>> {
    let tags = sqlx::query_as::<Postgres, Tag>(&format!(
        "SELECT {} FROM tags ORDER BY id OFFSET $1 LIMIT $2",
        TAG_COLUMNS
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(db_pool)
    .await?;

    Ok(tags)
}

pub async fn get_tag(db_pool: &PgPool, tag_id: i64) -> AppResult<Option<Tag>> {
    let tag = sqlx::query_as::<Postgres, Tag>(&format!(
        "SELECT {} FROM tags WHERE id = $1",
        TAG_COLUMNS
    ))
    .bind(tag_id)
    .fetch_optional(db_pool)
    .await?;

    Ok(tag)
}

pub async fn update_tag(db_pool: &PgPool, tag_id: i64, title: &str) -> AppResult<Option<Tag>> {
    let tag = sqlx::query_as::<Postgres, Tag>(&format!(
        "UPDATE tags SET title = $1 WHERE id = $2 RETURNING {}",
        TAG_COLUMNS
    ))
    .bind(title)
    .bind(tag_id)
    .fetch_optional(db_pool)
    .await
    .map_err(conflict_or)?;

    Ok(tag)
}

pub async fn delete_tag(db_pool: &PgPool, tag_id: i64) -> AppResult<Option<Tag>> {
    let tag = sqlx::query_as::<Postgres, Tag>(&format!(
        "DELETE FROM tags WHERE id = $1 RETURNING {}",
        TAG_COLUMNS
    ))
    .bind(tag_id)
    .fetch_optional(db_pool)
    .await?;

    Ok(tag)
}
