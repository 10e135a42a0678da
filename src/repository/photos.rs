use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::{PhotoRecord, PhotoResponse, PhotoSearch},
    repository::tags,
};

/// Photo columns joined with the owner's username and the like count
const PHOTO_SELECT: &str = r#"
SELECT p.id, p.image_url, p.description, p.public_id, p.image_transform, p.qr_transform,
       p.user_id, u.username AS photo_owner,
       (SELECT COUNT(*) FROM photo_likes l WHERE l.photo_id = p.id) AS likes,
       p.created_at, p.updated_at
FROM photos p
JOIN users u ON u.id = p.user_id"#;

const NEWEST_FIRST: &str = " ORDER BY p.created_at DESC, p.id DESC";

pub async fn insert_photo(
    conn: &mut PgConnection,
    user_id: i64,
    image_url: &str,
    description: Option<&str>,
    public_id: &str,
) -> AppResult<i64> {
    let id = sqlx::query_scalar::<Postgres, i64>(
        r#"
        INSERT INTO photos (image_url, description, public_id, user_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(image_url)
    .bind(description)
    .bind(public_id)
    .bind(user_id)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn get_photo(db_pool: &PgPool, photo_id: i64) -> AppResult<Option<PhotoRecord>> {
    let photo = sqlx::query_as::<Postgres, PhotoRecord>(&format!("{} WHERE p.id = $1", PHOTO_SELECT))
        .bind(photo_id)
        .fetch_optional(db_pool)
        .await?;

    Ok(photo)
}

/// Lists photos newest first, optionally only those of one owner
pub async fn list_photos(
    db_pool: &PgPool,
    owner_id: Option<i64>,
    skip: i64,
    limit: i64,
) -> AppResult<Vec<PhotoRecord>> {
    let mut query = QueryBuilder::<Postgres>::new(PHOTO_SELECT);
    if let Some(owner_id) = owner_id {
        query.push(" WHERE p.user_id = ").push_bind(owner_id);
    }
    query
        .push(NEWEST_FIRST)
        .push(" OFFSET ")
        .push_bind(skip)
        .push(" LIMIT ")
        .push_bind(limit);

    let photos = query
        .build_query_as::<PhotoRecord>()
        .fetch_all(db_pool)
        .await?;

    Ok(photos)
}

/// Bumps `updated_at`, replacing the description only when one is given
pub async fn update_description(
    conn: &mut PgConnection,
    photo_id: i64,
    description: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE photos SET description = COALESCE($1, description), updated_at = NOW() WHERE id = $2",
    )
        .bind(description)
        .bind(photo_id)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn set_image_transform(db_pool: &PgPool, photo_id: i64, url: &str) -> AppResult<()> {
    sqlx::query("UPDATE photos SET image_transform = $1, updated_at = NOW() WHERE id = $2")
        .bind(url)
        .bind(photo_id)
        .execute(db_pool)
        .await?;

    Ok(())
}

pub async fn set_qr_transform(db_pool: &PgPool, photo_id: i64, url: &str) -> AppResult<()> {
    sqlx::query("UPDATE photos SET qr_transform = $1, updated_at = NOW() WHERE id = $2")
        .bind(url)
        .bind(photo_id)
        .execute(db_pool)
        .await?;

    Ok(())
}

pub async fn delete_photo(db_pool: &PgPool, photo_id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM photos WHERE id = $1")
        .bind(photo_id)
        .execute(db_pool)
        .await?;

    Ok(())
}

/// Media ids of every photo a user owns
pub async fn public_ids_of_user(db_pool: &PgPool, user_id: i64) -> AppResult<Vec<String>> {
    let ids = sqlx::query_scalar::<Postgres, String>("SELECT public_id FROM photos WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(db_pool)
        .await?;

    Ok(ids)
}

/// Escapes LIKE wildcards and wraps the term for a substring match
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Builds the photo search query
///
/// Every supplied filter narrows the result. The tag filter joins through
/// `photo_2_tag`; tag titles are unique, so the join never repeats a photo.
pub fn build_search_query(search: &PhotoSearch, skip: i64, limit: i64) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new(PHOTO_SELECT);

    if search.tag().is_some() {
        query.push(" JOIN photo_2_tag pt ON pt.photo_id = p.id JOIN tags t ON t.id = pt.tag_id");
    }

    query.push(" WHERE TRUE");

    if let Some(description) = search.description() {
        query
            .push(" AND p.description ILIKE ")
            .push_bind(contains_pattern(description));
    }
    if let Some(tag) = search.tag() {
        query.push(" AND t.title = ").push_bind(tag.to_string());
    }
    if let Some(username) = search.username() {
        query.push(" AND u.username = ").push_bind(username.to_string());
    }

    query
        .push(NEWEST_FIRST)
        .push(" OFFSET ")
        .push_bind(skip)
        .push(" LIMIT ")
        .push_bind(limit);

    query
}

pub async fn search_photos(db_pool: &PgPool, search: &PhotoSearch, skip: i64, limit: i64) -> AppResult<Vec<PhotoRecord>> {
    let mut query = build_search_query(search, skip, limit);
    let photos = query
        .build_query_as::<PhotoRecord>()
        .fetch_all(db_pool)
        .await?;

    tracing::debug!(
        description = ?search.description(),
        tag = ?search.tag(),
        username = ?search.username(),
        results = photos.len(),
        "Photo search"
    );

    Ok(photos)
}

/// Attaches tags to photo rows, preserving row order
pub async fn with_tags(db_pool: &PgPool, records: Vec<PhotoRecord>) -> AppResult<Vec<PhotoResponse>> {
    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    let mut grouped = tags::tags_for_photos(db_pool, &ids).await?;

    Ok(records
        .into_iter()
        .map(|record| {
            let photo_tags = grouped.remove(&record.id).unwrap_or_default();
            PhotoResponse::new(record, photo_tags)
        })
        .collect())
}

/// Loads one photo as a response, tags included
pub async fn get_photo_response(db_pool: &PgPool, photo_id: i64) -> AppResult<Option<PhotoResponse>> {
    match get_photo(db_pool, photo_id).await? {
        Some(record) => Ok(with_tags(db_pool, vec![record]).await?.pop()),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(description: Option<&str>, tag: Option<&str>, username: Option<&str>) -> PhotoSearch {
        PhotoSearch {
            description: description.map(String::from),
            tag: tag.map(String::from),
            username: username.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_search_without_filters_lists_everything() {
        let query = build_search_query(&search(None, None, None), 0, 10);
        let sql = query.sql();
        assert!(!sql.contains("photo_2_tag"));
        assert!(sql.contains("WHERE TRUE ORDER BY p.created_at DESC, p.id DESC OFFSET $1 LIMIT $2"));
    }

    #[test]
    fn test_search_description_only() {
        let query = build_search_query(&search(Some("sea"), None, None), 0, 10);
        let sql = query.sql();
        assert!(sql.contains("AND p.description ILIKE $1"));
        assert!(!sql.contains("JOIN tags"));
        assert!(sql.ends_with("OFFSET $2 LIMIT $3"));
    }

    #[test]
    fn test_search_tag_adds_join() {
        let query = build_search_query(&search(None, Some("nature"), None), 0, 10);
        let sql = query.sql();
        assert!(sql.contains("JOIN photo_2_tag pt ON pt.photo_id = p.id JOIN tags t ON t.id = pt.tag_id WHERE TRUE"));
        assert!(sql.contains("AND t.title = $1"));
    }

    #[test]
    fn test_search_all_filters_bind_in_order() {
        let query = build_search_query(&search(Some("sea"), Some("nature"), Some("alice")), 5, 20);
        let sql = query.sql();
        assert!(sql.contains("p.description ILIKE $1"));
        assert!(sql.contains("t.title = $2"));
        assert!(sql.contains("u.username = $3"));
        assert!(sql.ends_with("OFFSET $4 LIMIT $5"));
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let query = build_search_query(&search(Some("  "), Some(""), None), 0, 10);
        assert!(!query.sql().contains("ILIKE"));
        assert!(!query.sql().contains("photo_2_tag"));
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("sea"), "%sea%");
        assert_eq!(contains_pattern("100%_off"), "%100\\%\\_off%");
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn test_long_values_and_optional_description() {
        use crate::repository::{
            test_support::{create_test_db_pool, unique},
            users,
        };

        let db_pool = create_test_db_pool().await;
        let email = format!("{}{}@example.com", "x".repeat(150), unique("photo"));
        let user = users::create_user(&db_pool, "tester", &email, "hash", None)
            .await
            .unwrap();
        let public_id = format!("{}_{}_{}", email, user.id, 1_700_000_000);

        let mut conn = db_pool.acquire().await.unwrap();
        let photo_id = insert_photo(&mut conn, user.id, "https://cdn.test/a", Some("sea"), &public_id)
            .await
            .unwrap();

        update_description(&mut conn, photo_id, None).await.unwrap();
        let photo = get_photo(&db_pool, photo_id).await.unwrap().unwrap();
        assert_eq!(photo.description.as_deref(), Some("sea"));
        assert_eq!(photo.public_id, public_id);

        update_description(&mut conn, photo_id, Some("lake")).await.unwrap();
        let photo = get_photo(&db_pool, photo_id).await.unwrap().unwrap();
        assert_eq!(photo.description.as_deref(), Some("lake"));

        drop(conn);
        users::delete_user(&db_pool, user.id).await.unwrap();
    }
}
