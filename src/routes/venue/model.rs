use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::geo::{self, RESOLUTION};
use crate::routes::ModelError;

// Venue cache expiry in seconds.
const VENUE_CACHE_EXPIRE: u64 = 600;
const VENUE_ID_CACHE_PREFIX: &str = "venue:id:";

/// Posters hanging off a venue: owned by the venue itself, or by one of the
/// venue's events. `owner_id` is polymorphic, so this set cannot be expressed
/// as a foreign key; every statement that retargets or removes a venue's
/// posters goes through this predicate.
const VENUE_POSTER_OWNERSHIP: &str = "(owner_kind <> 'event' AND owner_id = $1) \
     OR (owner_kind = 'event' \
         AND owner_id IN (SELECT id FROM events WHERE venue_id = $1))";

const VENUE_COLUMNS: &str ="id, name, address, latitude, longitude, h3_index, capacity, \
     description, google_rating, instagram_handle, google_map_link, mobile_number, email, \
     opening_time, closing_time, avg_expense_for_two, created_by, created_at, kind, age_limit, \
     cuisine_type, total_qsrs, seating_capacity, drive_thru, foodcourt_id";

/// Kind-specific payload. One venues table row carries the shared core plus
/// a discriminator column and the nullable columns of its kind; anything
/// deeper than this flat tagging is deliberately avoided.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VenueKind {
    Nightclub {
        age_limit: Option<i32>,
    },
    Restaurant {
        cuisine_type: Option<String>,
    },
    Foodcourt {
        total_qsrs: Option<i32>,
        seating_capacity: Option<i32>,
    },
    Qsr {
        drive_thru: bool,
        foodcourt_id: Option<Uuid>,
    },
}

impl VenueKind {
    pub fn discriminator(&self) -> &'static str {
        match self {
            VenueKind::Nightclub { .. } => "nightclub",
            VenueKind::Restaurant { .. } => "restaurant",
            VenueKind::Foodcourt { .. } => "foodcourt",
            VenueKind::Qsr { .. } => "qsr",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Derived from (latitude, longitude) at last write; never set directly.
    pub h3_index: String,
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub google_rating: Option<f64>,
    pub instagram_handle: Option<String>,
    pub google_map_link: Option<String>,
    pub mobile_number: Option<String>,
    pub email: Option<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub avg_expense_for_two: Option<f64>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: VenueKind,
}

#[derive(Debug, Deserialize)]
pub struct CreateVenueRequest {
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub google_rating: Option<f64>,
    pub instagram_handle: Option<String>,
    pub google_map_link: Option<String>,
    pub mobile_number: Option<String>,
    pub email: Option<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub avg_expense_for_two: Option<f64>,
    #[serde(flatten)]
    pub kind: VenueKind,
}

/// Detail updates never touch coordinates; those go through
/// [`Venue::update_location`] so the derived cell id cannot go stale.
#[derive(Debug, Deserialize)]
pub struct UpdateVenueRequest {
    pub name: String,
    pub address: Option<String>,
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub google_rating: Option<f64>,
    pub instagram_handle: Option<String>,
    pub google_map_link: Option<String>,
    pub mobile_number: Option<String>,
    pub email: Option<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub avg_expense_for_two: Option<f64>,
    #[serde(flatten)]
    pub kind: VenueKind,
}

/// Flat database row; converted into [`Venue`] by reassembling the kind
/// variant from the discriminator and its columns.
#[derive(sqlx::FromRow)]
struct VenueRow {
    id: Uuid,
    name: String,
    address: Option<String>,
    latitude: f64,
    longitude: f64,
    h3_index: String,
    capacity: Option<i32>,
    description: Option<String>,
    google_rating: Option<f64>,
    instagram_handle: Option<String>,
    google_map_link: Option<String>,
    mobile_number: Option<String>,
    email: Option<String>,
    opening_time: Option<String>,
    closing_time: Option<String>,
    avg_expense_for_two: Option<f64>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    kind: String,
    age_limit: Option<i32>,
    cuisine_type: Option<String>,
    total_qsrs: Option<i32>,
    seating_capacity: Option<i32>,
    drive_thru: Option<bool>,
    foodcourt_id: Option<Uuid>,
}

fn kind_from_columns(
    kind: &str,
    age_limit: Option<i32>,
    cuisine_type: Option<String>,
    total_qsrs: Option<i32>,
    seating_capacity: Option<i32>,
    drive_thru: Option<bool>,
    foodcourt_id: Option<Uuid>,
) -> Result<VenueKind, sqlx::Error> {
    match kind {
        "nightclub" => Ok(VenueKind::Nightclub { age_limit }),
        "restaurant" => Ok(VenueKind::Restaurant { cuisine_type }),
        "foodcourt" => Ok(VenueKind::Foodcourt {
            total_qsrs,
            seating_capacity,
        }),
        "qsr" => Ok(VenueKind::Qsr {
            drive_thru: drive_thru.unwrap_or(false),
            foodcourt_id,
        }),
        other => Err(sqlx::Error::Protocol(format!(
            "unknown venue kind in store: {other}"
        ))),
    }
}

/// Kind payload split back into its nullable columns for binding.
fn kind_to_columns(
    kind: &VenueKind,
) -> (
    Option<i32>,
    Option<String>,
    Option<i32>,
    Option<i32>,
    Option<bool>,
    Option<Uuid>,
) {
    match kind {
        VenueKind::Nightclub { age_limit } => (*age_limit, None, None, None, None, None),
        VenueKind::Restaurant { cuisine_type } => {
            (None, cuisine_type.clone(), None, None, None, None)
        }
        VenueKind::Foodcourt {
            total_qsrs,
            seating_capacity,
        } => (None, None, *total_qsrs, *seating_capacity, None, None),
        VenueKind::Qsr {
            drive_thru,
            foodcourt_id,
        } => (None, None, None, None, Some(*drive_thru), *foodcourt_id),
    }
}

impl TryFrom<VenueRow> for Venue {
    type Error = sqlx::Error;

    fn try_from(row: VenueRow) -> Result<Self, Self::Error> {
        let kind = kind_from_columns(
            &row.kind,
            row.age_limit,
            row.cuisine_type,
            row.total_qsrs,
            row.seating_capacity,
            row.drive_thru,
            row.foodcourt_id,
        )?;

        Ok(Venue {
            id: row.id,
            name: row.name,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            h3_index: row.h3_index,
            capacity: row.capacity,
            description: row.description,
            google_rating: row.google_rating,
            instagram_handle: row.instagram_handle,
            google_map_link: row.google_map_link,
            mobile_number: row.mobile_number,
            email: row.email,
            opening_time: row.opening_time,
            closing_time: row.closing_time,
            avg_expense_for_two: row.avg_expense_for_two,
            created_by: row.created_by,
            created_at: row.created_at,
            kind,
        })
    }
}

impl Venue {
    pub async fn create(
        pool: &PgPool,
        req: CreateVenueRequest,
        created_by: Uuid,
    ) -> Result<Self, ModelError> {
        // Derive the cell id before touching the store.
        let cell = geo::cell_of(req.latitude, req.longitude, RESOLUTION)?;
        let (age_limit, cuisine_type, total_qsrs, seating_capacity, drive_thru, foodcourt_id) =
            kind_to_columns(&req.kind);

        let row: VenueRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO venues (
                id, name, address, latitude, longitude, h3_index, capacity, description,
                google_rating, instagram_handle, google_map_link, mobile_number, email,
                opening_time, closing_time, avg_expense_for_two, created_by, created_at,
                kind, age_limit, cuisine_type, total_qsrs, seating_capacity, drive_thru,
                foodcourt_id
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, NOW(), $18, $19, $20, $21, $22, $23, $24
            )
            RETURNING {VENUE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&req.name)
        .bind(&req.address)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(cell.to_string())
        .bind(req.capacity)
        .bind(&req.description)
        .bind(req.google_rating)
        .bind(&req.instagram_handle)
        .bind(&req.google_map_link)
        .bind(&req.mobile_number)
        .bind(&req.email)
        .bind(&req.opening_time)
        .bind(&req.closing_time)
        .bind(req.avg_expense_for_two)
        .bind(created_by)
        .bind(req.kind.discriminator())
        .bind(age_limit)
        .bind(cuisine_type)
        .bind(total_qsrs)
        .bind(seating_capacity)
        .bind(drive_thru)
        .bind(foodcourt_id)
        .fetch_one(pool)
        .await?;

        Ok(row.try_into()?)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        venue_id: Uuid,
    ) -> Result<Option<Self>, ModelError> {
        let cache_key = format!("{}{}", VENUE_ID_CACHE_PREFIX, venue_id);

        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let cached: redis::RedisResult<String> = conn.get(&cache_key).await;

            if let Ok(json_str) = cached {
                if let Ok(venue) = serde_json::from_str::<Venue>(&json_str) {
                    tracing::debug!("Get venue from cache: {}", cache_key);
                    return Ok(Some(venue));
                }
            }
        }

        let row: Option<VenueRow> =
            sqlx::query_as(&format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1"))
                .bind(venue_id)
                .fetch_optional(pool)
                .await?;

        let venue = row.map(Venue::try_from).transpose()?;

        if let Some(ref v) = venue {
            if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                if let Ok(json_str) = serde_json::to_string(v) {
                    let _: Result<(), redis::RedisError> =
                        conn.set_ex(&cache_key, json_str, VENUE_CACHE_EXPIRE).await;
                    tracing::debug!("Set venue to cache: {}", cache_key);
                }
            }
        }

        Ok(venue)
    }

    pub async fn list(
        pool: &PgPool,
        kind: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Self>, ModelError> {
        let rows: Vec<VenueRow> = match kind {
            Some(kind) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {VENUE_COLUMNS} FROM venues
                    WHERE kind = $1
                    ORDER BY created_at DESC
                    OFFSET $2 LIMIT $3
                    "#
                ))
                .bind(kind)
                .bind(page * limit)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {VENUE_COLUMNS} FROM venues
                    ORDER BY created_at DESC
                    OFFSET $1 LIMIT $2
                    "#
                ))
                .bind(page * limit)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|row| Venue::try_from(row).map_err(ModelError::from))
            .collect()
    }

    pub async fn update_details(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        venue_id: Uuid,
        req: UpdateVenueRequest,
    ) -> Result<Self, ModelError> {
        let (age_limit, cuisine_type, total_qsrs, seating_capacity, drive_thru, foodcourt_id) =
            kind_to_columns(&req.kind);

        let row: VenueRow = sqlx::query_as(&format!(
            r#"
            UPDATE venues SET
                name = $2, address = $3, capacity = $4, description = $5, google_rating = $6,
                instagram_handle = $7, google_map_link = $8, mobile_number = $9, email = $10,
                opening_time = $11, closing_time = $12, avg_expense_for_two = $13,
                kind = $14, age_limit = $15, cuisine_type = $16, total_qsrs = $17,
                seating_capacity = $18, drive_thru = $19, foodcourt_id = $20
            WHERE id = $1
            RETURNING {VENUE_COLUMNS}
            "#
        ))
        .bind(venue_id)
        .bind(&req.name)
        .bind(&req.address)
        .bind(req.capacity)
        .bind(&req.description)
        .bind(req.google_rating)
        .bind(&req.instagram_handle)
        .bind(&req.google_map_link)
        .bind(&req.mobile_number)
        .bind(&req.email)
        .bind(&req.opening_time)
        .bind(&req.closing_time)
        .bind(req.avg_expense_for_two)
        .bind(req.kind.discriminator())
        .bind(age_limit)
        .bind(cuisine_type)
        .bind(total_qsrs)
        .bind(seating_capacity)
        .bind(drive_thru)
        .bind(foodcourt_id)
        .fetch_one(pool)
        .await?;

        Self::invalidate_cache(redis, venue_id).await;

        Ok(row.try_into()?)
    }

    /// Moves a venue. The coordinate write, the venue's derived cell id and
    /// the cell ids of every poster hanging off the venue (directly or via
    /// its events) commit in one transaction, so proximity queries never see
    /// a coordinate paired with a stale cell.
    pub async fn update_location(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        venue_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, ModelError> {
        let cell = geo::cell_of(latitude, longitude, RESOLUTION)?;
        let h3_index = cell.to_string();

        let mut tx = pool.begin().await?;

        let row: VenueRow = sqlx::query_as(&format!(
            r#"
            UPDATE venues SET latitude = $2, longitude = $3, h3_index = $4
            WHERE id = $1
            RETURNING {VENUE_COLUMNS}
            "#
        ))
        .bind(venue_id)
        .bind(latitude)
        .bind(longitude)
        .bind(&h3_index)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "UPDATE carousel_posters SET h3_index = $2 WHERE {VENUE_POSTER_OWNERSHIP}"
        ))
        .bind(venue_id)
        .bind(&h3_index)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Self::invalidate_cache(redis, venue_id).await;

        Ok(row.try_into()?)
    }

    /// Removes a venue together with its posters. Posters owned by the venue
    /// or by its events have no cascading foreign key, so they are deleted
    /// explicitly, in the same transaction as the venue row; otherwise they
    /// would stay discoverable through the nearby lookup until expiry with no
    /// owning entity behind them.
    pub async fn delete(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        venue_id: Uuid,
    ) -> Result<(), ModelError> {
        let mut tx = pool.begin().await?;

        sqlx::query(&format!(
            "DELETE FROM carousel_posters WHERE {VENUE_POSTER_OWNERSHIP}"
        ))
        .bind(venue_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM venues WHERE id = $1")
            .bind(venue_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }

        tx.commit().await?;

        Self::invalidate_cache(redis, venue_id).await;

        Ok(())
    }

    async fn invalidate_cache(redis: &Arc<RedisClient>, venue_id: Uuid) {
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let cache_key = format!("{}{}", VENUE_ID_CACHE_PREFIX, venue_id);
            let _: Result<(), redis::RedisError> = conn.del(&cache_key).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_columns() {
        let kinds = [
            VenueKind::Nightclub {
                age_limit: Some(21),
            },
            VenueKind::Restaurant {
                cuisine_type: Some("south indian".into()),
            },
            VenueKind::Foodcourt {
                total_qsrs: Some(12),
                seating_capacity: Some(300),
            },
            VenueKind::Qsr {
                drive_thru: true,
                foodcourt_id: Some(Uuid::new_v4()),
            },
        ];

        for kind in kinds {
            let (age_limit, cuisine_type, total_qsrs, seating_capacity, drive_thru, foodcourt_id) =
                kind_to_columns(&kind);
            let rebuilt = kind_from_columns(
                kind.discriminator(),
                age_limit,
                cuisine_type,
                total_qsrs,
                seating_capacity,
                drive_thru,
                foodcourt_id,
            )
            .unwrap();
            assert_eq!(rebuilt, kind);
        }
    }

    // Retargeting posters on a move and removing them on venue deletion must
    // act on the same ownership set, including posters reached through the
    // venue's events.
    #[test]
    fn poster_ownership_covers_direct_and_event_owners() {
        assert!(VENUE_POSTER_OWNERSHIP.contains("owner_kind <> 'event' AND owner_id = $1"));
        assert!(VENUE_POSTER_OWNERSHIP.contains("SELECT id FROM events WHERE venue_id = $1"));
    }

    #[test]
    fn unknown_discriminator_is_a_store_error() {
        assert!(kind_from_columns("arena", None, None, None, None, None, None).is_err());
    }

    #[test]
    fn create_request_parses_tagged_kind() {
        let req: CreateVenueRequest = serde_json::from_str(
            r#"{
                "name": "Indigo",
                "latitude": 12.9716,
                "longitude": 77.5946,
                "kind": "nightclub",
                "age_limit": 21
            }"#,
        )
        .unwrap();

        assert_eq!(
            req.kind,
            VenueKind::Nightclub {
                age_limit: Some(21)
            }
        );
    }

    #[test]
    fn create_request_rejects_unknown_kind() {
        let result = serde_json::from_str::<CreateVenueRequest>(
            r#"{
                "name": "Indigo",
                "latitude": 12.9716,
                "longitude": 77.5946,
                "kind": "stadium"
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn venue_serializes_kind_fields_at_top_level() {
        let venue = Venue {
            id: Uuid::new_v4(),
            name: "Indigo".into(),
            address: None,
            latitude: 12.9716,
            longitude: 77.5946,
            h3_index: "8961a25a0c3ffff".into(),
            capacity: None,
            description: None,
            google_rating: None,
            instagram_handle: None,
            google_map_link: None,
            mobile_number: None,
            email: None,
            opening_time: None,
            closing_time: None,
            avg_expense_for_two: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            kind: VenueKind::Qsr {
                drive_thru: false,
                foodcourt_id: None,
            },
        };

        let json = serde_json::to_value(&venue).unwrap();
        assert_eq!(json["kind"], "qsr");
        assert_eq!(json["drive_thru"], false);
    }
}
