/// Read-through caching for list responses.
///
/// Looks `$key` up in an optional cache and returns the hit. On a miss (or when
/// the cache is disabled or fails to answer) the `$block` future is awaited, its
/// value is queued for a background write with `$ttl` seconds to live, and
/// returned. A cache failure never fails the caller.
///
/// # Arguments
/// * `$cache`: an `Option<&Cache>`.
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) for the value.
/// * `$ttl`: time-to-live in seconds.
/// * `$block`: future computing the value, resolving to `AppResult<T>`.
///
/// # Example
/// ```rust,ignore
/// let videos = cached!(self.cache.as_ref(), CacheKey::Featured(6), 60, async {
///     store.featured_videos(6).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let hit = match $cache {
            Some(cache) => match cache.get_from_cache(&$key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(error = %e, key = %$key, "Cache read failed, treating as miss");
                    None
                }
            },
            None => None,
        };

        match hit {
            Some(value) => Ok(value),
            None => match $block.await {
                Ok(value) => {
                    if let Some(cache) = $cache {
                        cache.set_in_background(&$key, &value, $ttl);
                    }
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
