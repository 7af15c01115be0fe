use crate::error::RepoResult;
use crate::models::{
    Car, CarDraft, CarFilter, Favorite, FavoriteEntry, Message, NewMessage, NewUser,
    UpdateCarRequest, User,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The contract for all persistence operations. Handlers only see this trait,
/// so tests swap in an in-memory implementation.
///
/// **Send + Sync + async_trait** keep `Arc<dyn Repository>` usable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    // Fails with `RepoError::Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn set_user_banned(&self, id: Uuid, banned: bool) -> RepoResult<Option<User>>;

    // --- Cars ---
    // Newest first.
    async fn list_cars(&self, filter: &CarFilter) -> RepoResult<Vec<Car>>;
    async fn get_car(&self, id: Uuid) -> RepoResult<Option<Car>>;
    async fn create_car(&self, draft: CarDraft, owner_id: Uuid) -> RepoResult<Car>;
    // Absent fields keep their stored value.
    async fn update_car(&self, id: Uuid, changes: UpdateCarRequest) -> RepoResult<Option<Car>>;
    async fn delete_car(&self, id: Uuid) -> RepoResult<bool>;
    async fn cars_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Car>>;
    async fn recent_cars_excluding(&self, exclude: &[Uuid], limit: i64) -> RepoResult<Vec<Car>>;

    // --- Filter sources ---
    async fn distinct_brands(&self) -> RepoResult<Vec<String>>;
    // (min, max) over all listings; both `None` when there are none.
    async fn year_bounds(&self) -> RepoResult<(Option<i32>, Option<i32>)>;
    async fn distinct_models(&self, brand: &str) -> RepoResult<Vec<String>>;
    async fn distinct_versions(&self, brand: &str, model: &str) -> RepoResult<Vec<String>>;

    // --- Favorites ---
    // Idempotent: returns the existing row when the pair is already stored.
    async fn add_favorite(&self, user_id: Uuid, car_id: Uuid) -> RepoResult<Favorite>;
    async fn remove_favorite(&self, user_id: Uuid, car_id: Uuid) -> RepoResult<bool>;
    // Newest first, each joined with its listing.
    async fn list_favorites(&self, user_id: Uuid) -> RepoResult<Vec<FavoriteEntry>>;

    // --- Contact ---
    async fn create_message(&self, message: NewMessage) -> RepoResult<Message>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, email, name, password_hash, role, banned, created_at";

const CAR_COLUMNS: &str = "id, owner_id, brand, model, model_version, year, mileage, price, \
    description, images, body_type, engine_volume, engine_type, power, transmission, drive, \
    color, condition, steering, customs_cleared, documents, phone, city, created_at, updated_at";

/// Escapes LIKE metacharacters so user input is matched literally.
fn like_pattern(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_user
    ///
    /// The unique index on `email` backs the 409 path even when two
    /// registrations race past the handler's existence check.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, name, password_hash, role, banned, created_at) \
             VALUES ($1, $2, $3, $4, $5, false, NOW()) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.email)
            .bind(user.name)
            .bind(user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn set_user_banned(&self, id: Uuid, banned: bool) -> RepoResult<Option<User>> {
        let sql = format!("UPDATE users SET banned = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(banned)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_cars
    ///
    /// Builds the catalog query with `QueryBuilder` so every filter value is a
    /// bound parameter. Brand matching is a case-insensitive substring match.
    async fn list_cars(&self, filter: &CarFilter) -> RepoResult<Vec<Car>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CAR_COLUMNS} FROM cars WHERE TRUE"));

        if let Some(brand) = filter.brand.as_deref().filter(|b| !b.is_empty()) {
            builder.push(" AND brand ILIKE ");
            builder.push_bind(like_pattern(brand));
        }
        if let Some(min) = filter.min_price {
            builder.push(" AND price >= ");
            builder.push_bind(min);
        }
        if let Some(max) = filter.max_price {
            builder.push(" AND price <= ");
            builder.push_bind(max);
        }
        if let Some(min) = filter.min_year {
            builder.push(" AND year >= ");
            builder.push_bind(min);
        }
        if let Some(max) = filter.max_year {
            builder.push(" AND year <= ");
            builder.push_bind(max);
        }

        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<Car>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_car(&self, id: Uuid) -> RepoResult<Option<Car>> {
        let sql = format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = $1");
        Ok(sqlx::query_as::<_, Car>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_car(&self, draft: CarDraft, owner_id: Uuid) -> RepoResult<Car> {
        let d = draft.details;
        let sql = format!(
            "INSERT INTO cars (id, owner_id, brand, model, model_version, year, mileage, price, \
             description, images, body_type, engine_volume, engine_type, power, transmission, \
             drive, color, condition, steering, customs_cleared, documents, phone, city, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, NOW(), NOW()) RETURNING {CAR_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Car>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(draft.brand)
            .bind(draft.model)
            .bind(d.model_version)
            .bind(draft.year)
            .bind(draft.mileage)
            .bind(draft.price)
            .bind(draft.description)
            .bind(draft.images)
            .bind(d.body_type)
            .bind(d.engine_volume)
            .bind(d.engine_type)
            .bind(d.power)
            .bind(d.transmission)
            .bind(d.drive)
            .bind(d.color)
            .bind(d.condition)
            .bind(d.steering)
            .bind(d.customs_cleared)
            .bind(d.documents)
            .bind(d.phone)
            .bind(d.city)
            .fetch_one(&self.pool)
            .await?)
    }

    /// update_car
    ///
    /// Uses `COALESCE` so only the fields present in `changes` are written.
    async fn update_car(&self, id: Uuid, changes: UpdateCarRequest) -> RepoResult<Option<Car>> {
        let d = changes.details;
        let sql = format!(
            "UPDATE cars SET \
                brand = COALESCE($2, brand), \
                model = COALESCE($3, model), \
                year = COALESCE($4, year), \
                mileage = COALESCE($5, mileage), \
                price = COALESCE($6, price), \
                description = COALESCE($7, description), \
                images = COALESCE($8, images), \
                model_version = COALESCE($9, model_version), \
                body_type = COALESCE($10, body_type), \
                engine_volume = COALESCE($11, engine_volume), \
                engine_type = COALESCE($12, engine_type), \
                power = COALESCE($13, power), \
                transmission = COALESCE($14, transmission), \
                drive = COALESCE($15, drive), \
                color = COALESCE($16, color), \
                condition = COALESCE($17, condition), \
                steering = COALESCE($18, steering), \
                customs_cleared = COALESCE($19, customs_cleared), \
                documents = COALESCE($20, documents), \
                phone = COALESCE($21, phone), \
                city = COALESCE($22, city), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {CAR_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Car>(&sql)
            .bind(id)
            .bind(changes.brand)
            .bind(changes.model)
            .bind(changes.year)
            .bind(changes.mileage)
            .bind(changes.price)
            .bind(changes.description)
            .bind(changes.images)
            .bind(d.model_version)
            .bind(d.body_type)
            .bind(d.engine_volume)
            .bind(d.engine_type)
            .bind(d.power)
            .bind(d.transmission)
            .bind(d.drive)
            .bind(d.color)
            .bind(d.condition)
            .bind(d.steering)
            .bind(d.customs_cleared)
            .bind(d.documents)
            .bind(d.phone)
            .bind(d.city)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_car(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cars_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Car>> {
        let sql =
            format!("SELECT {CAR_COLUMNS} FROM cars WHERE owner_id = $1 ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, Car>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn recent_cars_excluding(&self, exclude: &[Uuid], limit: i64) -> RepoResult<Vec<Car>> {
        let sql = format!(
            "SELECT {CAR_COLUMNS} FROM cars WHERE id <> ALL($1) ORDER BY created_at DESC LIMIT $2"
        );
        Ok(sqlx::query_as::<_, Car>(&sql)
            .bind(exclude.to_vec())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn distinct_brands(&self) -> RepoResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT brand FROM cars WHERE brand <> '' ORDER BY brand ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn year_bounds(&self) -> RepoResult<(Option<i32>, Option<i32>)> {
        Ok(
            sqlx::query_as::<_, (Option<i32>, Option<i32>)>("SELECT MIN(year), MAX(year) FROM cars")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn distinct_models(&self, brand: &str) -> RepoResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT model FROM cars WHERE LOWER(brand) = LOWER($1) AND model <> '' \
             ORDER BY model ASC",
        )
        .bind(brand)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn distinct_versions(&self, brand: &str, model: &str) -> RepoResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT model_version FROM cars \
             WHERE LOWER(brand) = LOWER($1) AND LOWER(model) = LOWER($2) \
             AND model_version IS NOT NULL AND model_version <> '' \
             ORDER BY model_version ASC",
        )
        .bind(brand)
        .bind(model)
        .fetch_all(&self.pool)
        .await?)
    }

    /// add_favorite
    ///
    /// `ON CONFLICT ... DO UPDATE` is a no-op write that lets `RETURNING` hand
    /// back the existing row, which keeps repeated favorites idempotent.
    async fn add_favorite(&self, user_id: Uuid, car_id: Uuid) -> RepoResult<Favorite> {
        Ok(sqlx::query_as::<_, Favorite>(
            "INSERT INTO favorites (id, user_id, car_id, created_at) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (user_id, car_id) DO UPDATE SET user_id = EXCLUDED.user_id \
             RETURNING id, user_id, car_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(car_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn remove_favorite(&self, user_id: Uuid, car_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND car_id = $2")
            .bind(user_id)
            .bind(car_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// list_favorites
    ///
    /// Two queries instead of a wide join: the favorites, then their cars.
    async fn list_favorites(&self, user_id: Uuid) -> RepoResult<Vec<FavoriteEntry>> {
        let favorites = sqlx::query_as::<_, Favorite>(
            "SELECT id, user_id, car_id, created_at FROM favorites WHERE user_id = $1 \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = favorites.iter().map(|f| f.car_id).collect();
        let sql = format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = ANY($1)");
        let mut cars: HashMap<Uuid, Car> = sqlx::query_as::<_, Car>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|car| (car.id, car))
            .collect();

        Ok(favorites
            .into_iter()
            .filter_map(|fav| {
                cars.remove(&fav.car_id).map(|car| FavoriteEntry {
                    id: fav.id,
                    car_id: fav.car_id,
                    created_at: fav.created_at,
                    car,
                })
            })
            .collect())
    }

    async fn create_message(&self, message: NewMessage) -> RepoResult<Message> {
        Ok(sqlx::query_as::<_, Message>(
            "INSERT INTO messages (id, name, email, subject, message, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             RETURNING id, name, email, subject, message, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(message.name)
        .bind(message.email)
        .bind(message.subject)
        .bind(message.message)
        .fetch_one(&self.pool)
        .await?)
    }
}
