/// Read-through caching over [`Cache`](crate::db::Cache).
///
/// Looks the key up first. On a miss the block is awaited, the result is
/// queued for a background fill with the given TTL (seconds), and returned.
/// The fill is skipped if another writer stored the key in the meantime.
/// An error from the block is propagated with `?` and nothing is cached.
///
/// # Example
/// ```rust,ignore
/// async fn load_user(state: &AppState, email: &str) -> AppResult<User> {
///     cached!(state.cache, CacheKey::User(email.to_string()), 900, async {
///         users::get_user_by_email(&state.db_pool, email)
///             .await?
///             .ok_or_else(|| AppError::Unauthorized(messages::NOT_VALIDATE_CREDENTIALS.into()))
///     })
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
