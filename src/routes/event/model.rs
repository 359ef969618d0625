use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::routes::ModelError;

const EVENT_COLUMNS: &str =
    "id, venue_id, title, start_time, end_time, image_url, age_restriction, dress_code";

/// Timed happening at a venue. Events carry no coordinates of their own;
/// posters attached to an event inherit the cell id of the event's venue.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub image_url: Option<String>,
    pub age_restriction: Option<i32>,
    pub dress_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub venue_id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub image_url: Option<String>,
    pub age_restriction: Option<i32>,
    pub dress_code: Option<String>,
}

impl Event {
    pub async fn create(pool: &PgPool, req: CreateEventRequest) -> Result<Self, ModelError> {
        // The venue must exist; a dangling venue_id would leave any poster
        // attached to this event without a resolvable cell id.
        let venue_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM venues WHERE id = $1")
            .bind(req.venue_id)
            .fetch_optional(pool)
            .await?;

        if venue_exists.is_none() {
            return Err(sqlx::Error::RowNotFound.into());
        }

        let event: Event = sqlx::query_as(&format!(
            r#"
            INSERT INTO events (
                id, venue_id, title, start_time, end_time, image_url, age_restriction,
                dress_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(req.venue_id)
        .bind(&req.title)
        .bind(req.start_time)
        .bind(req.end_time)
        .bind(&req.image_url)
        .bind(req.age_restriction)
        .bind(&req.dress_code)
        .fetch_one(pool)
        .await?;

        Ok(event)
    }

    pub async fn find_by_id(pool: &PgPool, event_id: Uuid) -> Result<Option<Self>, ModelError> {
        let event: Option<Event> =
            sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(event_id)
                .fetch_optional(pool)
                .await?;

        Ok(event)
    }

    pub async fn find_by_venue(pool: &PgPool, venue_id: Uuid) -> Result<Vec<Self>, ModelError> {
        let events: Vec<Event> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE venue_id = $1 ORDER BY start_time"
        ))
        .bind(venue_id)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    /// Removes an event and its posters in one transaction; the posters'
    /// polymorphic `owner_id` carries no cascading foreign key, and orphaned
    /// posters would otherwise stay in the nearby lookup until expiry.
    pub async fn delete(pool: &PgPool, event_id: Uuid) -> Result<(), ModelError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM carousel_posters WHERE owner_kind = 'event' AND owner_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }

        tx.commit().await?;

        Ok(())
    }
}
