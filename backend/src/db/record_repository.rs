use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("no records found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One persisted classification. Rows are insert-only; `id` is assigned by a
/// serial sequence and grows monotonically.
#[derive(Debug, Clone, FromRow)]
pub struct ClassificationEvent {
    pub id: i64,
    pub user_id: Uuid,
    pub link: String,
    pub predicted_label: i32,
    pub probabilities: serde_json::Value,
    pub confidence: f32,
    pub distraction_score: f64,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClassificationEvent {
    pub user_id: Uuid,
    pub link: String,
    pub predicted_label: i32,
    pub probabilities: Vec<f32>,
    pub confidence: f32,
    pub distraction_score: f64,
}

#[derive(Clone)]
pub struct RecordRepository {
    pool: PgPool,
}

impl RecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        event: NewClassificationEvent,
    ) -> Result<ClassificationEvent, RecordStoreError> {
        let probabilities = serde_json::json!(event.probabilities);
        let rec = sqlx::query_as::<_, ClassificationEvent>(
            r#"
            INSERT INTO classification_events
                (user_id, link, predicted_label, probabilities, confidence, distraction_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(event.user_id)
        .bind(&event.link)
        .bind(event.predicted_label)
        .bind(probabilities)
        .bind(event.confidence)
        .bind(event.distraction_score)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec)
    }

    /// Time-ordered page of a user's events, oldest first, ties broken by id.
    /// An empty page is reported as `NotFound`; the mobile client treats "no
    /// history" as a 404 rather than an empty collection.
    pub async fn list(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ClassificationEvent>, RecordStoreError> {
        let events = sqlx::query_as::<_, ClassificationEvent>(
            r#"
            SELECT * FROM classification_events
            WHERE user_id = $1
            ORDER BY taken_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        if events.is_empty() {
            return Err(RecordStoreError::NotFound);
        }
        Ok(events)
    }

    /// Up to `count` most-recent `(label, confidence)` pairs for the scoring
    /// window, returned oldest first. Empty history is valid here; the caller
    /// appends the in-flight classification before aggregating.
    pub async fn recent(
        &self,
        user_id: Uuid,
        count: i64,
    ) -> Result<Vec<(usize, f32)>, RecordStoreError> {
        let rows: Vec<(i32, f32)> = sqlx::query_as(
            r#"
            SELECT predicted_label, confidence FROM classification_events
            WHERE user_id = $1
            ORDER BY taken_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(count)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .rev()
            .map(|(label, confidence)| (label as usize, confidence))
            .collect())
    }
}
