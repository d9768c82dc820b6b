//! Diesel-backed stores. Queries run on the blocking pool; the r2d2 pool
//! is shared by every store.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use futures_lite::StreamExt;
use pgvector::Vector;
use uuid::Uuid;

use kindred_shared::clients::db::{checkout, DbPool};
use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use super::{
    ordered_pair, pair_lock_key, CascadeCounts, LedgerStore, MatchSide, MessageStore, Neighbor,
    ProfileStream, SwipeWrite, UserStore, VectorIndex,
};
use crate::models::{
    parse_looking_for, AgeRange, Location, Match, MatchId, Message, Swipe, SwipeAction, UserId,
    UserProfile,
};
use crate::schema::{matches, messages, swipes, users};

const STREAM_PAGE_SIZE: i64 = 200;

async fn with_conn<T, F>(pool: &DbPool, f: F) -> AppResult<T>
where
    F: FnOnce(&mut PgConnection) -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = checkout(&pool)?;
        f(&mut conn)
    })
    .await
    .map_err(|e| AppError::internal(format!("database task failed: {e}")))?
}

// --- Rows ---

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
struct UserRow {
    id: Uuid,
    name: String,
    date_of_birth: Option<NaiveDate>,
    age: i32,
    gender: String,
    bio: String,
    looking_for: Vec<String>,
    age_min: i32,
    age_max: i32,
    interests: Vec<String>,
    photos: Vec<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    max_distance: Option<f64>,
    is_demo: bool,
    embedding: Option<Vector>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&UserProfile> for UserRow {
    fn from(p: &UserProfile) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            date_of_birth: p.date_of_birth,
            age: p.age as i32,
            gender: p.gender.as_str().to_string(),
            bio: p.bio.clone(),
            looking_for: p.looking_for.iter().map(|g| g.as_str().to_string()).collect(),
            age_min: p.age_range.min as i32,
            age_max: p.age_range.max as i32,
            interests: p.interests.clone(),
            photos: p.photos.clone(),
            latitude: p.location.map(|l| l.latitude),
            longitude: p.location.map(|l| l.longitude),
            max_distance: p.max_distance,
            is_demo: p.is_demo,
            embedding: p.embedding.clone().map(Vector::from),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl TryFrom<UserRow> for UserProfile {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        let location = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Some(Location::new(lat, lng)),
            _ => None,
        };
        Ok(Self {
            id: row.id,
            name: row.name,
            date_of_birth: row.date_of_birth,
            age: row.age.max(0) as u32,
            gender: row.gender.parse()?,
            bio: row.bio,
            looking_for: parse_looking_for(&row.looking_for)?,
            age_range: AgeRange::new(row.age_min.max(0) as u32, row.age_max.max(0) as u32)?,
            interests: row.interests,
            photos: row.photos,
            location,
            max_distance: row.max_distance,
            is_demo: row.is_demo,
            embedding: row.embedding.map(|v| v.to_vec()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = swipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct SwipeRow {
    id: Uuid,
    swiper_id: Uuid,
    swiped_id: Uuid,
    action: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SwipeRow> for Swipe {
    type Error = AppError;

    fn try_from(row: SwipeRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            swiper_id: row.swiper_id,
            swiped_id: row.swiped_id,
            action: row.action.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = matches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct MatchRow {
    id: Uuid,
    user1_id: Uuid,
    user2_id: Uuid,
    pair_low: Uuid,
    pair_high: Uuid,
    matched_at: DateTime<Utc>,
    ai_explanation: Option<String>,
}

impl From<MatchRow> for Match {
    fn from(row: MatchRow) -> Self {
        Self {
            id: row.id,
            user1_id: row.user1_id,
            user2_id: row.user2_id,
            matched_at: row.matched_at,
            ai_explanation: row.ai_explanation,
        }
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct MessageRow {
    id: Uuid,
    match_id: Uuid,
    sender_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    read: bool,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            match_id: row.match_id,
            sender_id: row.sender_id,
            content: row.content,
            created_at: row.created_at,
            read: row.read,
        }
    }
}

#[derive(QueryableByName)]
struct NeighborRow {
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    id: Uuid,
    #[diesel(sql_type = diesel::sql_types::Double)]
    distance: f64,
}

// --- Users ---

#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn fetch_page(conn: &mut PgConnection, after: Option<Uuid>) -> AppResult<Vec<UserRow>> {
    let mut query = users::table
        .select(UserRow::as_select())
        .order(users::id.asc())
        .limit(STREAM_PAGE_SIZE)
        .into_boxed();
    if let Some(after) = after {
        query = query.filter(users::id.gt(after));
    }
    Ok(query.load(conn)?)
}

struct PageCursor {
    pool: DbPool,
    after: Option<Uuid>,
    buffer: VecDeque<AppResult<UserProfile>>,
    exhausted: bool,
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get(&self, id: UserId) -> AppResult<Option<UserProfile>> {
        with_conn(&self.pool, move |conn| {
            users::table
                .find(id)
                .select(UserRow::as_select())
                .first(conn)
                .optional()?
                .map(UserProfile::try_from)
                .transpose()
        })
        .await
    }

    async fn insert(&self, profile: &UserProfile) -> AppResult<()> {
        let row = UserRow::from(profile);
        with_conn(&self.pool, move |conn| {
            diesel::insert_into(users::table).values(&row).execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn update(&self, profile: &UserProfile) -> AppResult<()> {
        let row = UserRow::from(profile);
        with_conn(&self.pool, move |conn| {
            let updated = diesel::update(users::table.find(row.id)).set(&row).execute(conn)?;
            if updated == 0 {
                return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: UserId) -> AppResult<bool> {
        with_conn(&self.pool, move |conn| {
            Ok(diesel::delete(users::table.find(id)).execute(conn)? > 0)
        })
        .await
    }

    async fn update_embedding(&self, id: UserId, embedding: Vec<f32>) -> AppResult<()> {
        with_conn(&self.pool, move |conn| {
            let updated = diesel::update(users::table.find(id))
                .set((
                    users::embedding.eq(Some(Vector::from(embedding))),
                    users::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
            }
            Ok(())
        })
        .await
    }

    fn stream_all(&self) -> ProfileStream {
        let start = PageCursor {
            pool: self.pool.clone(),
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        };
        // Keyset pagination: at most one page is buffered at any time.
        futures_lite::stream::unfold(start, |mut cur| async move {
            if cur.buffer.is_empty() && !cur.exhausted {
                let after = cur.after;
                match with_conn(&cur.pool, move |conn| fetch_page(conn, after)).await {
                    Ok(rows) => {
                        cur.exhausted = (rows.len() as i64) < STREAM_PAGE_SIZE;
                        cur.after = rows.last().map(|r| r.id).or(cur.after);
                        cur.buffer.extend(rows.into_iter().map(UserProfile::try_from));
                    }
                    Err(e) => {
                        cur.exhausted = true;
                        return Some((Err(e), cur));
                    }
                }
            }
            let next = cur.buffer.pop_front()?;
            Some((next, cur))
        })
        .boxed()
    }
}

#[async_trait]
impl VectorIndex for PgUserStore {
    async fn nearest_neighbors(&self, vector: &[f32], k: usize) -> AppResult<Vec<Neighbor>> {
        let query = Vector::from(vector.to_vec());
        let limit = k as i64;
        with_conn(&self.pool, move |conn| {
            let rows: Vec<NeighborRow> = diesel::sql_query(
                "SELECT id, (embedding <=> $1) AS distance FROM users \
                 WHERE embedding IS NOT NULL ORDER BY embedding <=> $1 LIMIT $2",
            )
            .bind::<pgvector::sql_types::Vector, _>(query)
            .bind::<diesel::sql_types::BigInt, _>(limit)
            .load(conn)?;
            Ok(rows
                .into_iter()
                .map(|r| Neighbor {
                    user_id: r.id,
                    score: 1.0 - r.distance,
                })
                .collect())
        })
        .await
    }
}

// --- Swipes + matches ---

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: DbPool,
}

impl PgLedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn record_swipe_tx(
    conn: &mut PgConnection,
    swiper: UserId,
    swiped: UserId,
    action: SwipeAction,
) -> AppResult<SwipeWrite> {
    conn.transaction::<_, AppError, _>(|conn| {
        // Serializes both directions of the pair until commit.
        diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<diesel::sql_types::BigInt, _>(pair_lock_key(swiper, swiped))
            .execute(conn)?;

        let now = Utc::now();
        let inserted = diesel::insert_into(swipes::table)
            .values(&SwipeRow {
                id: Uuid::now_v7(),
                swiper_id: swiper,
                swiped_id: swiped,
                action: action.as_str().to_string(),
                created_at: now,
            })
            .on_conflict((swipes::swiper_id, swipes::swiped_id))
            .do_nothing()
            .execute(conn)?;

        if inserted == 0 {
            let existing = swipes::table
                .filter(swipes::swiper_id.eq(swiper))
                .filter(swipes::swiped_id.eq(swiped))
                .select(SwipeRow::as_select())
                .first(conn)?;
            return Ok(SwipeWrite::Duplicate(existing.try_into()?));
        }

        if action != SwipeAction::Like {
            return Ok(SwipeWrite::no_match());
        }

        let reciprocal = swipes::table
            .filter(swipes::swiper_id.eq(swiped))
            .filter(swipes::swiped_id.eq(swiper))
            .filter(swipes::action.eq(SwipeAction::Like.as_str()))
            .select(swipes::id)
            .first::<Uuid>(conn)
            .optional()?;
        if reciprocal.is_none() {
            return Ok(SwipeWrite::no_match());
        }

        let (low, high) = ordered_pair(swiper, swiped);
        let created = diesel::insert_into(matches::table)
            .values(&MatchRow {
                id: Uuid::now_v7(),
                user1_id: swiper,
                user2_id: swiped,
                pair_low: low,
                pair_high: high,
                matched_at: now,
                ai_explanation: None,
            })
            .on_conflict((matches::pair_low, matches::pair_high))
            .do_nothing()
            .execute(conn)?;

        let match_id = matches::table
            .filter(matches::pair_low.eq(low))
            .filter(matches::pair_high.eq(high))
            .select(matches::id)
            .first::<Uuid>(conn)?;
        Ok(SwipeWrite::matched(match_id, created == 1))
    })
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn record_swipe(
        &self,
        swiper: UserId,
        swiped: UserId,
        action: SwipeAction,
    ) -> AppResult<SwipeWrite> {
        with_conn(&self.pool, move |conn| record_swipe_tx(conn, swiper, swiped, action)).await
    }

    async fn get_swipe(&self, swiper: UserId, swiped: UserId) -> AppResult<Option<Swipe>> {
        with_conn(&self.pool, move |conn| {
            swipes::table
                .filter(swipes::swiper_id.eq(swiper))
                .filter(swipes::swiped_id.eq(swiped))
                .select(SwipeRow::as_select())
                .first(conn)
                .optional()?
                .map(Swipe::try_from)
                .transpose()
        })
        .await
    }

    async fn swiped_ids(&self, swiper: UserId) -> AppResult<HashSet<UserId>> {
        with_conn(&self.pool, move |conn| {
            let ids: Vec<Uuid> = swipes::table
                .filter(swipes::swiper_id.eq(swiper))
                .select(swipes::swiped_id)
                .load(conn)?;
            Ok(ids.into_iter().collect())
        })
        .await
    }

    async fn likes_received(&self, user: UserId) -> AppResult<Vec<Swipe>> {
        with_conn(&self.pool, move |conn| {
            let answered: HashSet<Uuid> = swipes::table
                .filter(swipes::swiper_id.eq(user))
                .select(swipes::swiped_id)
                .load::<Uuid>(conn)?
                .into_iter()
                .collect();
            let rows: Vec<SwipeRow> = swipes::table
                .filter(swipes::swiped_id.eq(user))
                .filter(swipes::action.eq(SwipeAction::Like.as_str()))
                .order(swipes::created_at.desc())
                .select(SwipeRow::as_select())
                .load(conn)?;
            rows.into_iter()
                .filter(|r| !answered.contains(&r.swiper_id))
                .map(Swipe::try_from)
                .collect()
        })
        .await
    }

    async fn matches_as(&self, user: UserId, side: MatchSide) -> AppResult<Vec<Match>> {
        with_conn(&self.pool, move |conn| {
            let query = matches::table.select(MatchRow::as_select()).into_boxed();
            let query = match side {
                MatchSide::First => query.filter(matches::user1_id.eq(user)),
                MatchSide::Second => query.filter(matches::user2_id.eq(user)),
            };
            let rows: Vec<MatchRow> = query.load(conn)?;
            Ok(rows.into_iter().map(Match::from).collect())
        })
        .await
    }

    async fn find_match(&self, a: UserId, b: UserId) -> AppResult<Option<Match>> {
        let (low, high) = ordered_pair(a, b);
        with_conn(&self.pool, move |conn| {
            Ok(matches::table
                .filter(matches::pair_low.eq(low))
                .filter(matches::pair_high.eq(high))
                .select(MatchRow::as_select())
                .first(conn)
                .optional()?
                .map(Match::from))
        })
        .await
    }

    async fn get_match(&self, id: MatchId) -> AppResult<Option<Match>> {
        with_conn(&self.pool, move |conn| {
            Ok(matches::table
                .find(id)
                .select(MatchRow::as_select())
                .first(conn)
                .optional()?
                .map(Match::from))
        })
        .await
    }

    async fn set_match_explanation(&self, id: MatchId, text: &str) -> AppResult<bool> {
        let text = text.to_string();
        with_conn(&self.pool, move |conn| {
            let updated = diesel::update(matches::table.find(id))
                .set(matches::ai_explanation.eq(Some(text)))
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn delete_user(&self, user: UserId) -> AppResult<CascadeCounts> {
        with_conn(&self.pool, move |conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                let matches_deleted = diesel::delete(
                    matches::table.filter(matches::user1_id.eq(user).or(matches::user2_id.eq(user))),
                )
                .execute(conn)?;
                let swipes_deleted = diesel::delete(
                    swipes::table.filter(swipes::swiper_id.eq(user).or(swipes::swiped_id.eq(user))),
                )
                .execute(conn)?;
                Ok(CascadeCounts {
                    swipes: swipes_deleted as u64,
                    matches: matches_deleted as u64,
                })
            })
        })
        .await
    }

    async fn delete_all_swipes(&self) -> AppResult<u64> {
        with_conn(&self.pool, move |conn| {
            Ok(diesel::delete(swipes::table).execute(conn)? as u64)
        })
        .await
    }
}

// --- Messages ---

#[derive(Clone)]
pub struct PgMessageStore {
    pool: DbPool,
}

impl PgMessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert(&self, match_id: MatchId, sender: UserId, content: &str) -> AppResult<Message> {
        let row = MessageRow {
            id: Uuid::now_v7(),
            match_id,
            sender_id: sender,
            content: content.to_string(),
            created_at: Utc::now(),
            read: false,
        };
        with_conn(&self.pool, move |conn| {
            let saved = diesel::insert_into(messages::table)
                .values(&row)
                .returning(MessageRow::as_returning())
                .get_result(conn)?;
            Ok(Message::from(saved))
        })
        .await
    }

    async fn list(&self, match_id: MatchId) -> AppResult<Vec<Message>> {
        with_conn(&self.pool, move |conn| {
            let rows: Vec<MessageRow> = messages::table
                .filter(messages::match_id.eq(match_id))
                .order((messages::created_at.asc(), messages::id.asc()))
                .select(MessageRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(Message::from).collect())
        })
        .await
    }

    async fn last(&self, match_id: MatchId) -> AppResult<Option<Message>> {
        with_conn(&self.pool, move |conn| {
            Ok(messages::table
                .filter(messages::match_id.eq(match_id))
                .order((messages::created_at.desc(), messages::id.desc()))
                .select(MessageRow::as_select())
                .first(conn)
                .optional()?
                .map(Message::from))
        })
        .await
    }

    async fn mark_read(&self, match_id: MatchId, reader: UserId) -> AppResult<u64> {
        with_conn(&self.pool, move |conn| {
            let flipped = diesel::update(
                messages::table
                    .filter(messages::match_id.eq(match_id))
                    .filter(messages::sender_id.ne(reader))
                    .filter(messages::read.eq(false)),
            )
            .set(messages::read.eq(true))
            .execute(conn)?;
            Ok(flipped as u64)
        })
        .await
    }

    async fn unread_count(&self, match_id: MatchId, reader: UserId) -> AppResult<u64> {
        with_conn(&self.pool, move |conn| {
            let count: i64 = messages::table
                .filter(messages::match_id.eq(match_id))
                .filter(messages::sender_id.ne(reader))
                .filter(messages::read.eq(false))
                .count()
                .get_result(conn)?;
            Ok(count as u64)
        })
        .await
    }

    async fn delete_for_match(&self, match_id: MatchId) -> AppResult<u64> {
        with_conn(&self.pool, move |conn| {
            let deleted = diesel::delete(messages::table.filter(messages::match_id.eq(match_id)))
                .execute(conn)?;
            Ok(deleted as u64)
        })
        .await
    }
}
