use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::geo;
use crate::routes::ModelError;

// Nearby results change with every poster write in the area, so they are
// cached only briefly, under a coordinate key rounded to two decimals.
const NEARBY_CACHE_EXPIRE: u64 = 120;
const NEARBY_CACHE_PREFIX: &str = "carousel:near:";

const POSTER_COLUMNS: &str =
    "id, image_url, deep_link, expires_at, h3_index, owner_kind, owner_id";

/// The entity a poster advertises. Exactly one owner, enforced by the type:
/// there is no way to construct a poster with zero or two owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "owner_kind", content = "owner_id", rename_all = "snake_case")]
pub enum PosterOwner {
    Event(Uuid),
    Nightclub(Uuid),
    Restaurant(Uuid),
    Foodcourt(Uuid),
    Qsr(Uuid),
}

impl PosterOwner {
    pub fn kind(&self) -> &'static str {
        match self {
            PosterOwner::Event(_) => "event",
            PosterOwner::Nightclub(_) => "nightclub",
            PosterOwner::Restaurant(_) => "restaurant",
            PosterOwner::Foodcourt(_) => "foodcourt",
            PosterOwner::Qsr(_) => "qsr",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            PosterOwner::Event(id)
            | PosterOwner::Nightclub(id)
            | PosterOwner::Restaurant(id)
            | PosterOwner::Foodcourt(id)
            | PosterOwner::Qsr(id) => *id,
        }
    }

    fn from_columns(kind: &str, id: Uuid) -> Result<Self, sqlx::Error> {
        match kind {
            "event" => Ok(PosterOwner::Event(id)),
            "nightclub" => Ok(PosterOwner::Nightclub(id)),
            "restaurant" => Ok(PosterOwner::Restaurant(id)),
            "foodcourt" => Ok(PosterOwner::Foodcourt(id)),
            "qsr" => Ok(PosterOwner::Qsr(id)),
            other => Err(sqlx::Error::Protocol(format!(
                "unknown poster owner kind in store: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselPoster {
    pub id: Uuid,
    pub image_url: String,
    pub deep_link: String,
    pub expires_at: DateTime<Utc>,
    /// Derived from the owning entity's venue coordinate at last write;
    /// recomputed transactionally when that coordinate changes.
    pub h3_index: String,
    #[serde(flatten)]
    pub owner: PosterOwner,
}

/// No `h3_index` here: the cell id is always resolved from the owner inside
/// the write transaction, never accepted from the caller.
#[derive(Debug, Deserialize)]
pub struct CreatePosterRequest {
    pub image_url: String,
    pub deep_link: String,
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub owner: PosterOwner,
}

#[derive(sqlx::FromRow)]
struct PosterRow {
    id: Uuid,
    image_url: String,
    deep_link: String,
    expires_at: DateTime<Utc>,
    h3_index: String,
    owner_kind: String,
    owner_id: Uuid,
}

impl TryFrom<PosterRow> for CarouselPoster {
    type Error = sqlx::Error;

    fn try_from(row: PosterRow) -> Result<Self, Self::Error> {
        Ok(CarouselPoster {
            id: row.id,
            image_url: row.image_url,
            deep_link: row.deep_link,
            expires_at: row.expires_at,
            h3_index: row.h3_index,
            owner: PosterOwner::from_columns(&row.owner_kind, row.owner_id)?,
        })
    }
}

/// Cell id of the owner's venue. Venue owners read their own row; event
/// owners go through the event to its venue.
async fn owner_h3_index(
    conn: &mut PgConnection,
    owner: &PosterOwner,
) -> Result<String, ModelError> {
    let row: Option<(String,)> = match owner {
        PosterOwner::Event(event_id) => {
            sqlx::query_as(
                r#"
                SELECT v.h3_index FROM venues v
                JOIN events e ON e.venue_id = v.id
                WHERE e.id = $1
                "#,
            )
            .bind(event_id)
            .fetch_optional(&mut *conn)
            .await?
        }
        _ => {
            sqlx::query_as("SELECT h3_index FROM venues WHERE id = $1 AND kind = $2")
                .bind(owner.id())
                .bind(owner.kind())
                .fetch_optional(&mut *conn)
                .await?
        }
    };

    row.map(|(h3_index,)| h3_index)
        .ok_or_else(|| sqlx::Error::RowNotFound.into())
}

impl CarouselPoster {
    /// A poster is live until its expiry passes; expired rows stay in the
    /// store but drop out of every nearby lookup.
    pub fn is_live(&self, as_of: DateTime<Utc>) -> bool {
        self.expires_at > as_of
    }

    pub async fn create(pool: &PgPool, req: CreatePosterRequest) -> Result<Self, ModelError> {
        let mut tx = pool.begin().await?;

        let h3_index = owner_h3_index(&mut tx, &req.owner).await?;

        let row: PosterRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO carousel_posters (
                id, image_url, deep_link, expires_at, h3_index, owner_kind, owner_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {POSTER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&req.image_url)
        .bind(&req.deep_link)
        .bind(req.expires_at)
        .bind(&h3_index)
        .bind(req.owner.kind())
        .bind(req.owner.id())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.try_into()?)
    }

    pub async fn update(
        pool: &PgPool,
        poster_id: Uuid,
        req: CreatePosterRequest,
    ) -> Result<Self, ModelError> {
        let mut tx = pool.begin().await?;

        // Re-resolve the cell id in the same transaction in case the owner
        // changed.
        let h3_index = owner_h3_index(&mut tx, &req.owner).await?;

        let row: PosterRow = sqlx::query_as(&format!(
            r#"
            UPDATE carousel_posters SET
                image_url = $2, deep_link = $3, expires_at = $4, h3_index = $5,
                owner_kind = $6, owner_id = $7
            WHERE id = $1
            RETURNING {POSTER_COLUMNS}
            "#
        ))
        .bind(poster_id)
        .bind(&req.image_url)
        .bind(&req.deep_link)
        .bind(req.expires_at)
        .bind(&h3_index)
        .bind(req.owner.kind())
        .bind(req.owner.id())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.try_into()?)
    }

    pub async fn delete(pool: &PgPool, poster_id: Uuid) -> Result<(), ModelError> {
        let result = sqlx::query("DELETE FROM carousel_posters WHERE id = $1")
            .bind(poster_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }

        Ok(())
    }

    /// Live posters within roughly `radius_km` of a coordinate.
    ///
    /// Indexes the coordinate, sizes the search as a ring count, expands
    /// the candidate disk, then fetches every poster whose stored cell id
    /// is in the disk and whose expiry is after `as_of`, in a single
    /// set-membership query. Membership in the approximate disk is all that
    /// is guaranteed; results may reach slightly past the radius and carry
    /// no distance ordering.
    pub async fn find_nearby(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        max_rings: u32,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Self>, ModelError> {
        // Any coordinate or radius problem aborts here, before the store is
        // touched.
        let cells = geo::nearby_cells(latitude, longitude, radius_km, max_rings)?;

        let lat_rounded = (latitude * 100.0).round() / 100.0;
        let lon_rounded = (longitude * 100.0).round() / 100.0;
        let cache_key = format!(
            "{}{}:{}:{}",
            NEARBY_CACHE_PREFIX, lat_rounded, lon_rounded, radius_km
        );

        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let cached: redis::RedisResult<String> = conn.get(&cache_key).await;

            if let Ok(json_str) = cached {
                if let Ok(posters) = serde_json::from_str::<Vec<CarouselPoster>>(&json_str) {
                    tracing::debug!("Get nearby posters from cache: {}", cache_key);
                    // Entries may have expired since they were cached.
                    return Ok(posters
                        .into_iter()
                        .filter(|p| p.is_live(as_of))
                        .collect());
                }
            }
        }

        let candidate_cells: Vec<String> = cells.iter().map(|cell| cell.to_string()).collect();

        let rows: Vec<PosterRow> = sqlx::query_as(&format!(
            r#"
            SELECT {POSTER_COLUMNS} FROM carousel_posters
            WHERE h3_index = ANY($1) AND expires_at > $2
            "#
        ))
        .bind(&candidate_cells)
        .bind(as_of)
        .fetch_all(pool)
        .await?;

        let posters = rows
            .into_iter()
            .map(|row| CarouselPoster::try_from(row).map_err(ModelError::from))
            .collect::<Result<Vec<_>, _>>()?;

        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            if let Ok(json_str) = serde_json::to_string(&posters) {
                let _: Result<(), redis::RedisError> =
                    conn.set_ex(&cache_key, json_str, NEARBY_CACHE_EXPIRE).await;
                tracing::debug!("Set nearby posters to cache: {}", cache_key);
            }
        }

        Ok(posters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn poster(expires_at: DateTime<Utc>) -> CarouselPoster {
        CarouselPoster {
            id: Uuid::new_v4(),
            image_url: "https://cdn.example.com/poster.png".into(),
            deep_link: "app://event/42".into(),
            expires_at,
            h3_index: "8961a25a0c3ffff".into(),
            owner: PosterOwner::Event(Uuid::new_v4()),
        }
    }

    #[test]
    fn poster_is_live_until_expiry() {
        let now = Utc::now();
        assert!(poster(now + Duration::hours(1)).is_live(now));
        assert!(!poster(now - Duration::hours(1)).is_live(now));
        // Boundary: expiry equal to as_of is no longer live.
        assert!(!poster(now).is_live(now));
    }

    #[test]
    fn owner_round_trips_through_columns() {
        let owners = [
            PosterOwner::Event(Uuid::new_v4()),
            PosterOwner::Nightclub(Uuid::new_v4()),
            PosterOwner::Restaurant(Uuid::new_v4()),
            PosterOwner::Foodcourt(Uuid::new_v4()),
            PosterOwner::Qsr(Uuid::new_v4()),
        ];

        for owner in owners {
            let rebuilt = PosterOwner::from_columns(owner.kind(), owner.id()).unwrap();
            assert_eq!(rebuilt, owner);
        }
    }

    #[test]
    fn unknown_owner_kind_is_a_store_error() {
        assert!(PosterOwner::from_columns("venue", Uuid::new_v4()).is_err());
    }

    #[test]
    fn create_request_requires_exactly_one_owner() {
        // One owner parses.
        let ok: Result<CreatePosterRequest, _> = serde_json::from_str(
            r#"{
                "image_url": "https://cdn.example.com/p.png",
                "deep_link": "app://club/7",
                "expires_at": "2030-01-01T00:00:00Z",
                "owner_kind": "nightclub",
                "owner_id": "7a4f0a6e-7cbe-4a43-9c5e-22d6a8f0f6c1"
            }"#,
        );
        assert!(ok.is_ok());

        // No owner fails.
        let missing: Result<CreatePosterRequest, _> = serde_json::from_str(
            r#"{
                "image_url": "https://cdn.example.com/p.png",
                "deep_link": "app://club/7",
                "expires_at": "2030-01-01T00:00:00Z"
            }"#,
        );
        assert!(missing.is_err());

        // An unrecognized owner kind fails.
        let unknown: Result<CreatePosterRequest, _> = serde_json::from_str(
            r#"{
                "image_url": "https://cdn.example.com/p.png",
                "deep_link": "app://club/7",
                "expires_at": "2030-01-01T00:00:00Z",
                "owner_kind": "mall",
                "owner_id": "7a4f0a6e-7cbe-4a43-9c5e-22d6a8f0f6c1"
            }"#,
        );
        assert!(unknown.is_err());
    }

    #[test]
    fn poster_json_carries_owner_at_top_level() {
        let owner_id = Uuid::new_v4();
        let mut p = poster(Utc::now());
        p.owner = PosterOwner::Restaurant(owner_id);

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["owner_kind"], "restaurant");
        assert_eq!(json["owner_id"], owner_id.to_string());
    }
}
