use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::EngagementStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        AccountType, Category, Channel, ChannelSummary, FavoriteState, LikeState,
        SubscriptionState, Video, VideoListing, ViewCount, Viewer,
    },
};

const VIDEO_COLUMNS: &str =
    "v.id, v.title, v.video_url, v.thumbnail, v.views, v.likes, v.channel_id, v.created_at";

const VIEWER_COLUMNS: &str = "v.id, v.name, v.email, v.account_type, v.created_at";

/// PostgreSQL-backed engagement store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Relation tables keyed by `(viewer_id, target)`
#[derive(Debug, Clone, Copy)]
enum Relation {
    Like,
    Favorite,
    Subscription,
}

impl Relation {
    fn table(self) -> &'static str {
        match self {
            Relation::Like => "likes",
            Relation::Favorite => "favorites",
            Relation::Subscription => "subscriptions",
        }
    }

    fn target_column(self) -> &'static str {
        match self {
            Relation::Like | Relation::Favorite => "video_id",
            Relation::Subscription => "channel_id",
        }
    }

    fn target_table(self) -> &'static str {
        match self {
            Relation::Like | Relation::Favorite => "videos",
            Relation::Subscription => "channels",
        }
    }
}

/// Row of a video joined with its channel's name and avatar
#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    video: Video,
    channel_name: String,
    channel_avatar: Option<String>,
}

impl From<ListingRow> for VideoListing {
    fn from(row: ListingRow) -> Self {
        let channel = ChannelSummary {
            id: row.video.channel_id,
            name: row.channel_name,
            avatar: row.channel_avatar,
        };
        Self {
            video: row.video,
            channel,
        }
    }
}

/// Maps sqlx failures onto the retry taxonomy
///
/// Serialization failures and deadlocks are `Conflict`; a pool that cannot
/// hand out a connection or a broken socket is `Unavailable`.
pub fn classify(err: sqlx::Error) -> AppError {
    let unavailable = matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    );
    if unavailable {
        return AppError::Unavailable(err.to_string());
    }

    let conflict = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "40001" || code == "40P01");
    if conflict {
        return AppError::Conflict(err.to_string());
    }

    AppError::Database(err)
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn relation_exists(
        &self,
        relation: Relation,
        viewer_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE viewer_id = $1 AND {} = $2)",
            relation.table(),
            relation.target_column()
        );
        sqlx::query_scalar(&sql)
            .bind(viewer_id)
            .bind(target_id)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    /// Flips a relation inside one transaction
    ///
    /// The target row is locked first so concurrent flips on the same target
    /// serialize. Returns `None` when the target does not exist, otherwise the
    /// new membership and, for counted relations, the new counter.
    async fn flip(
        &self,
        relation: Relation,
        viewer_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<Option<(bool, Option<i64>)>> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let lock_sql = format!(
            "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
            relation.target_table()
        );
        let locked: Option<Uuid> = sqlx::query_scalar(&lock_sql)
            .bind(target_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(classify)?;

        if locked.is_none() {
            return Ok(None);
        }

        let is_member = Self::flip_membership(&mut tx, relation, viewer_id, target_id).await?;
        let delta: i64 = if is_member { 1 } else { -1 };

        let counter: Option<i64> = match relation {
            Relation::Like => Some(
                sqlx::query_scalar(
                    "UPDATE videos SET likes = likes + $2 WHERE id = $1 RETURNING likes",
                )
                .bind(target_id)
                .bind(delta)
                .fetch_one(&mut *tx)
                .await
                .map_err(classify)?,
            ),
            Relation::Subscription => Some(
                sqlx::query_scalar(
                    "UPDATE channels SET subscribers = subscribers + $2 WHERE id = $1 RETURNING subscribers",
                )
                .bind(target_id)
                .bind(delta)
                .fetch_one(&mut *tx)
                .await
                .map_err(classify)?,
            ),
            Relation::Favorite => None,
        };

        tx.commit().await.map_err(classify)?;

        Ok(Some((is_member, counter)))
    }

    async fn flip_membership(
        conn: &mut PgConnection,
        relation: Relation,
        viewer_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<bool> {
        let delete_sql = format!(
            "DELETE FROM {} WHERE viewer_id = $1 AND {} = $2",
            relation.table(),
            relation.target_column()
        );
        let removed = sqlx::query(&delete_sql)
            .bind(viewer_id)
            .bind(target_id)
            .execute(&mut *conn)
            .await
            .map_err(classify)?
            .rows_affected();

        if removed > 0 {
            return Ok(false);
        }

        let insert_sql = format!(
            "INSERT INTO {} (viewer_id, {}) VALUES ($1, $2)",
            relation.table(),
            relation.target_column()
        );
        sqlx::query(&insert_sql)
            .bind(viewer_id)
            .bind(target_id)
            .execute(&mut *conn)
            .await
            .map_err(classify)?;

        Ok(true)
    }
}

#[async_trait::async_trait]
impl EngagementStore for PgStore {
    async fn video(&self, video_id: Uuid) -> AppResult<Option<Video>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos v WHERE v.id = $1");
        sqlx::query_as::<_, Video>(&sql)
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn channel(&self, channel_id: Uuid) -> AppResult<Option<Channel>> {
        sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, name, avatar, subscribers, owner_id, category, created_at
            FROM channels
            WHERE id = $1
            "#,
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn is_liked(&self, video_id: Uuid, viewer_id: Uuid) -> AppResult<bool> {
        self.relation_exists(Relation::Like, viewer_id, video_id).await
    }

    async fn is_favorite(&self, video_id: Uuid, viewer_id: Uuid) -> AppResult<bool> {
        self.relation_exists(Relation::Favorite, viewer_id, video_id)
            .await
    }

    async fn is_subscribed(&self, channel_id: Uuid, viewer_id: Uuid) -> AppResult<bool> {
        self.relation_exists(Relation::Subscription, viewer_id, channel_id)
            .await
    }

    async fn toggle_like(&self, video_id: Uuid, viewer_id: Uuid) -> AppResult<Option<LikeState>> {
        let flipped = self.flip(Relation::Like, viewer_id, video_id).await?;
        Ok(flipped.map(|(is_liked, likes)| LikeState {
            likes: likes.unwrap_or_default(),
            is_liked,
        }))
    }

    async fn toggle_favorite(
        &self,
        video_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<Option<FavoriteState>> {
        let flipped = self.flip(Relation::Favorite, viewer_id, video_id).await?;
        Ok(flipped.map(|(is_favorite, _)| FavoriteState { is_favorite }))
    }

    async fn toggle_subscription(
        &self,
        channel_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<Option<SubscriptionState>> {
        let flipped = self
            .flip(Relation::Subscription, viewer_id, channel_id)
            .await?;
        Ok(flipped.map(|(is_subscribed, subscribers)| SubscriptionState {
            is_subscribed,
            subscribers: subscribers.unwrap_or_default(),
        }))
    }

    async fn increment_views(&self, video_id: Uuid) -> AppResult<Option<ViewCount>> {
        let views: Option<i64> =
            sqlx::query_scalar("UPDATE videos SET views = views + 1 WHERE id = $1 RETURNING views")
                .bind(video_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;

        Ok(views.map(|views| ViewCount { views }))
    }

    async fn favorites(&self, viewer_id: Uuid) -> AppResult<Vec<VideoListing>> {
        let sql = format!(
            r#"
            SELECT {VIDEO_COLUMNS}, c.name AS channel_name, c.avatar AS channel_avatar
            FROM favorites f
            JOIN videos v ON v.id = f.video_id
            JOIN channels c ON c.id = v.channel_id
            WHERE f.viewer_id = $1
            ORDER BY f.created_at DESC, v.id ASC
            "#
        );
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(viewer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;

        Ok(rows.into_iter().map(VideoListing::from).collect())
    }

    async fn top_channel_videos(
        &self,
        channel_id: Uuid,
        exclude: Uuid,
        limit: usize,
    ) -> AppResult<Vec<Video>> {
        let sql = format!(
            r#"
            SELECT {VIDEO_COLUMNS}
            FROM videos v
            WHERE v.channel_id = $1 AND v.id <> $2
            ORDER BY v.views DESC, v.id ASC
            LIMIT $3
            "#
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(channel_id)
            .bind(exclude)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn top_videos(&self, exclude: Vec<Uuid>, limit: usize) -> AppResult<Vec<Video>> {
        let sql = format!(
            r#"
            SELECT {VIDEO_COLUMNS}
            FROM videos v
            WHERE NOT (v.id = ANY($1))
            ORDER BY v.views DESC, v.id ASC
            LIMIT $2
            "#
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(exclude)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn featured_videos(&self, limit: usize) -> AppResult<Vec<VideoListing>> {
        let sql = format!(
            r#"
            SELECT {VIDEO_COLUMNS}, c.name AS channel_name, c.avatar AS channel_avatar
            FROM videos v
            JOIN channels c ON c.id = v.channel_id
            ORDER BY v.views DESC, v.id ASC
            LIMIT $1
            "#
        );
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;

        Ok(rows.into_iter().map(VideoListing::from).collect())
    }

    async fn viewers(&self, account_type: Option<AccountType>) -> AppResult<Vec<Viewer>> {
        let sql = format!(
            r#"
            SELECT {VIEWER_COLUMNS}
            FROM viewers v
            WHERE ($1::text IS NULL OR v.account_type = $1)
            ORDER BY v.created_at DESC, v.id ASC
            "#
        );
        sqlx::query_as::<_, Viewer>(&sql)
            .bind(account_type.map(|t| t.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn categories(&self, limit: usize) -> AppResult<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY name ASC, id ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn viewer_for_session(&self, token: &str) -> AppResult<Option<Viewer>> {
        let sql = format!(
            r#"
            SELECT {VIEWER_COLUMNS}
            FROM sessions s
            JOIN viewers v ON v.id = s.viewer_id
            WHERE s.token = $1 AND s.expires_at > now()
            "#
        );
        sqlx::query_as::<_, Viewer>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }
}
