#![allow(dead_code)]

use async_trait::async_trait;
use autoshop::{
    AppConfig, AppState,
    auth::issue_token,
    catalog::StaticCatalog,
    error::{RepoError, RepoResult},
    mail::{MailError, Mailer, OutgoingEmail},
    media::MockMediaHost,
    models::{
        Car, CarDraft, CarFilter, Favorite, FavoriteEntry, Message, NewMessage, NewUser, Role,
        UpdateCarRequest, User,
    },
    repository::{Repository, RepositoryState},
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

// --- In-memory repository ---

#[derive(Default)]
struct Store {
    users: Vec<User>,
    cars: Vec<Car>,
    favorites: Vec<Favorite>,
    messages: Vec<Message>,
    tick: i64,
}

impl Store {
    /// Strictly increasing timestamps so "newest first" is deterministic.
    fn next_time(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        DateTime::from_timestamp(1_700_000_000 + self.tick, 0).unwrap()
    }
}

/// InMemoryRepo
///
/// A `Repository` backed by plain vectors. Mirrors the ordering and
/// idempotency rules of the Postgres implementation.
#[derive(Default)]
pub struct InMemoryRepo {
    store: Mutex<Store>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, email: &str, role: &str) -> User {
        let mut store = self.store.lock().unwrap();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            password_hash: String::new(),
            role: role.to_string(),
            banned: false,
            created_at: store.next_time(),
        };
        store.users.push(user.clone());
        user
    }

    pub fn seed_user_with_password(&self, email: &str, role: Role, password: &str) -> User {
        let mut user = self.seed_user(email, role.as_str());
        let hash = bcrypt::hash(password, 4).unwrap();
        let mut store = self.store.lock().unwrap();
        if let Some(stored) = store.users.iter_mut().find(|u| u.id == user.id) {
            stored.password_hash = hash.clone();
        }
        user.password_hash = hash;
        user
    }

    pub fn ban(&self, user_id: Uuid) {
        let mut store = self.store.lock().unwrap();
        if let Some(user) = store.users.iter_mut().find(|u| u.id == user_id) {
            user.banned = true;
        }
    }

    pub fn seed_car(&self, owner_id: Uuid, brand: &str, model: &str, year: i32, price: i64) -> Car {
        let mut store = self.store.lock().unwrap();
        let now = store.next_time();
        let car = Car {
            id: Uuid::new_v4(),
            owner_id,
            brand: brand.to_string(),
            model: model.to_string(),
            year,
            price,
            created_at: now,
            updated_at: now,
            ..Car::default()
        };
        store.cars.push(car.clone());
        car
    }

    pub fn set_version(&self, car_id: Uuid, version: &str) {
        let mut store = self.store.lock().unwrap();
        if let Some(car) = store.cars.iter_mut().find(|c| c.id == car_id) {
            car.model_version = Some(version.to_string());
        }
    }

    pub fn car(&self, id: Uuid) -> Option<Car> {
        self.store.lock().unwrap().cars.iter().find(|c| c.id == id).cloned()
    }

    pub fn favorite_count(&self, user_id: Uuid) -> usize {
        self.store
            .lock()
            .unwrap()
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .count()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.store.lock().unwrap().messages.clone()
    }
}

fn newest_first(cars: &mut [Car]) {
    cars.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn sorted_unique(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values.dedup();
    values
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.store.lock().unwrap().users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store.lock().unwrap();
        if store.users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role.as_str().to_string(),
            banned: false,
            created_at: store.next_time(),
        };
        store.users.push(created.clone());
        Ok(created)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut users = self.store.lock().unwrap().users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn set_user_banned(&self, id: Uuid, banned: bool) -> RepoResult<Option<User>> {
        let mut store = self.store.lock().unwrap();
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.banned = banned;
            u.clone()
        }))
    }

    async fn list_cars(&self, filter: &CarFilter) -> RepoResult<Vec<Car>> {
        let brand = filter.brand.as_ref().map(|b| b.to_lowercase());
        let mut cars: Vec<Car> = self
            .store
            .lock()
            .unwrap()
            .cars
            .iter()
            .filter(|c| {
                brand
                    .as_ref()
                    .is_none_or(|b| c.brand.to_lowercase().contains(b.as_str()))
            })
            .filter(|c| filter.min_price.is_none_or(|p| c.price >= p))
            .filter(|c| filter.max_price.is_none_or(|p| c.price <= p))
            .filter(|c| filter.min_year.is_none_or(|y| c.year >= y))
            .filter(|c| filter.max_year.is_none_or(|y| c.year <= y))
            .cloned()
            .collect();
        newest_first(&mut cars);
        Ok(cars)
    }

    async fn get_car(&self, id: Uuid) -> RepoResult<Option<Car>> {
        Ok(self.car(id))
    }

    async fn create_car(&self, draft: CarDraft, owner_id: Uuid) -> RepoResult<Car> {
        let mut store = self.store.lock().unwrap();
        let now = store.next_time();
        let d = draft.details;
        let car = Car {
            id: Uuid::new_v4(),
            owner_id,
            brand: draft.brand,
            model: draft.model,
            model_version: d.model_version,
            year: draft.year,
            mileage: draft.mileage,
            price: draft.price,
            description: draft.description,
            images: draft.images,
            body_type: d.body_type,
            engine_volume: d.engine_volume,
            engine_type: d.engine_type,
            power: d.power,
            transmission: d.transmission,
            drive: d.drive,
            color: d.color,
            condition: d.condition,
            steering: d.steering,
            customs_cleared: d.customs_cleared,
            documents: d.documents,
            phone: d.phone,
            city: d.city,
            created_at: now,
            updated_at: now,
        };
        store.cars.push(car.clone());
        Ok(car)
    }

    async fn update_car(&self, id: Uuid, changes: UpdateCarRequest) -> RepoResult<Option<Car>> {
        let mut store = self.store.lock().unwrap();
        let now = store.next_time();
        let Some(car) = store.cars.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.brand {
            car.brand = v;
        }
        if let Some(v) = changes.model {
            car.model = v;
        }
        if let Some(v) = changes.year {
            car.year = v;
        }
        if let Some(v) = changes.mileage {
            car.mileage = v;
        }
        if let Some(v) = changes.price {
            car.price = v;
        }
        if let Some(v) = changes.description {
            car.description = v;
        }
        if let Some(v) = changes.images {
            car.images = v;
        }
        let d = changes.details;
        car.model_version = d.model_version.or(car.model_version.take());
        car.color = d.color.or(car.color.take());
        car.city = d.city.or(car.city.take());
        car.phone = d.phone.or(car.phone.take());
        car.updated_at = now;
        Ok(Some(car.clone()))
    }

    async fn delete_car(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.cars.len();
        store.cars.retain(|c| c.id != id);
        store.favorites.retain(|f| f.car_id != id);
        Ok(store.cars.len() < before)
    }

    async fn cars_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Car>> {
        let mut cars: Vec<Car> = self
            .store
            .lock()
            .unwrap()
            .cars
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut cars);
        Ok(cars)
    }

    async fn recent_cars_excluding(&self, exclude: &[Uuid], limit: i64) -> RepoResult<Vec<Car>> {
        let mut cars: Vec<Car> = self
            .store
            .lock()
            .unwrap()
            .cars
            .iter()
            .filter(|c| !exclude.contains(&c.id))
            .cloned()
            .collect();
        newest_first(&mut cars);
        cars.truncate(limit.max(0) as usize);
        Ok(cars)
    }

    async fn distinct_brands(&self) -> RepoResult<Vec<String>> {
        let brands = self.store.lock().unwrap().cars.iter().map(|c| c.brand.clone()).collect();
        Ok(sorted_unique(brands))
    }

    async fn year_bounds(&self) -> RepoResult<(Option<i32>, Option<i32>)> {
        let store = self.store.lock().unwrap();
        let years = store.cars.iter().map(|c| c.year);
        Ok((years.clone().min(), years.max()))
    }

    async fn distinct_models(&self, brand: &str) -> RepoResult<Vec<String>> {
        let models = self
            .store
            .lock()
            .unwrap()
            .cars
            .iter()
            .filter(|c| c.brand.eq_ignore_ascii_case(brand))
            .map(|c| c.model.clone())
            .collect();
        Ok(sorted_unique(models))
    }

    async fn distinct_versions(&self, brand: &str, model: &str) -> RepoResult<Vec<String>> {
        let versions = self
            .store
            .lock()
            .unwrap()
            .cars
            .iter()
            .filter(|c| c.brand.eq_ignore_ascii_case(brand) && c.model.eq_ignore_ascii_case(model))
            .filter_map(|c| c.model_version.clone())
            .collect();
        Ok(sorted_unique(versions))
    }

    async fn add_favorite(&self, user_id: Uuid, car_id: Uuid) -> RepoResult<Favorite> {
        let mut store = self.store.lock().unwrap();
        if let Some(existing) = store
            .favorites
            .iter()
            .find(|f| f.user_id == user_id && f.car_id == car_id)
        {
            return Ok(existing.clone());
        }
        let favorite = Favorite {
            id: Uuid::new_v4(),
            user_id,
            car_id,
            created_at: store.next_time(),
        };
        store.favorites.push(favorite.clone());
        Ok(favorite)
    }

    async fn remove_favorite(&self, user_id: Uuid, car_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.favorites.len();
        store
            .favorites
            .retain(|f| !(f.user_id == user_id && f.car_id == car_id));
        Ok(store.favorites.len() < before)
    }

    async fn list_favorites(&self, user_id: Uuid) -> RepoResult<Vec<FavoriteEntry>> {
        let store = self.store.lock().unwrap();
        let mut entries: Vec<FavoriteEntry> = store
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .filter_map(|f| {
                store.cars.iter().find(|c| c.id == f.car_id).map(|car| FavoriteEntry {
                    id: f.id,
                    car_id: f.car_id,
                    created_at: f.created_at,
                    car: car.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn create_message(&self, message: NewMessage) -> RepoResult<Message> {
        let mut store = self.store.lock().unwrap();
        let saved = Message {
            id: Uuid::new_v4(),
            name: message.name,
            email: message.email,
            subject: message.subject,
            message: message.message,
            created_at: store.next_time(),
        };
        store.messages.push(saved.clone());
        Ok(saved)
    }
}

// --- Failure doubles ---

fn unavailable<T>() -> RepoResult<T> {
    Err(RepoError::Database(sqlx::Error::PoolTimedOut))
}

/// Every call fails as if the database were unreachable.
pub struct BrokenRepo;

#[async_trait]
impl Repository for BrokenRepo {
    async fn get_user(&self, _id: Uuid) -> RepoResult<Option<User>> {
        unavailable()
    }
    async fn get_user_by_email(&self, _email: &str) -> RepoResult<Option<User>> {
        unavailable()
    }
    async fn create_user(&self, _user: NewUser) -> RepoResult<User> {
        unavailable()
    }
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        unavailable()
    }
    async fn set_user_banned(&self, _id: Uuid, _banned: bool) -> RepoResult<Option<User>> {
        unavailable()
    }
    async fn list_cars(&self, _filter: &CarFilter) -> RepoResult<Vec<Car>> {
        unavailable()
    }
    async fn get_car(&self, _id: Uuid) -> RepoResult<Option<Car>> {
        unavailable()
    }
    async fn create_car(&self, _draft: CarDraft, _owner_id: Uuid) -> RepoResult<Car> {
        unavailable()
    }
    async fn update_car(&self, _id: Uuid, _changes: UpdateCarRequest) -> RepoResult<Option<Car>> {
        unavailable()
    }
    async fn delete_car(&self, _id: Uuid) -> RepoResult<bool> {
        unavailable()
    }
    async fn cars_by_owner(&self, _owner_id: Uuid) -> RepoResult<Vec<Car>> {
        unavailable()
    }
    async fn recent_cars_excluding(&self, _exclude: &[Uuid], _limit: i64) -> RepoResult<Vec<Car>> {
        unavailable()
    }
    async fn distinct_brands(&self) -> RepoResult<Vec<String>> {
        unavailable()
    }
    async fn year_bounds(&self) -> RepoResult<(Option<i32>, Option<i32>)> {
        unavailable()
    }
    async fn distinct_models(&self, _brand: &str) -> RepoResult<Vec<String>> {
        unavailable()
    }
    async fn distinct_versions(&self, _brand: &str, _model: &str) -> RepoResult<Vec<String>> {
        unavailable()
    }
    async fn add_favorite(&self, _user_id: Uuid, _car_id: Uuid) -> RepoResult<Favorite> {
        unavailable()
    }
    async fn remove_favorite(&self, _user_id: Uuid, _car_id: Uuid) -> RepoResult<bool> {
        unavailable()
    }
    async fn list_favorites(&self, _user_id: Uuid) -> RepoResult<Vec<FavoriteEntry>> {
        unavailable()
    }
    async fn create_message(&self, _message: NewMessage) -> RepoResult<Message> {
        unavailable()
    }
}

/// Wraps a repository and delays user lookups, for session timeout tests.
pub struct SlowUserRepo {
    pub inner: InMemoryRepo,
    pub delay: Duration,
}

#[async_trait]
impl Repository for SlowUserRepo {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_user(id).await
    }
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.inner.get_user_by_email(email).await
    }
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        self.inner.create_user(user).await
    }
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        self.inner.list_users().await
    }
    async fn set_user_banned(&self, id: Uuid, banned: bool) -> RepoResult<Option<User>> {
        self.inner.set_user_banned(id, banned).await
    }
    async fn list_cars(&self, filter: &CarFilter) -> RepoResult<Vec<Car>> {
        self.inner.list_cars(filter).await
    }
    async fn get_car(&self, id: Uuid) -> RepoResult<Option<Car>> {
        self.inner.get_car(id).await
    }
    async fn create_car(&self, draft: CarDraft, owner_id: Uuid) -> RepoResult<Car> {
        self.inner.create_car(draft, owner_id).await
    }
    async fn update_car(&self, id: Uuid, changes: UpdateCarRequest) -> RepoResult<Option<Car>> {
        self.inner.update_car(id, changes).await
    }
    async fn delete_car(&self, id: Uuid) -> RepoResult<bool> {
        self.inner.delete_car(id).await
    }
    async fn cars_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Car>> {
        self.inner.cars_by_owner(owner_id).await
    }
    async fn recent_cars_excluding(&self, exclude: &[Uuid], limit: i64) -> RepoResult<Vec<Car>> {
        self.inner.recent_cars_excluding(exclude, limit).await
    }
    async fn distinct_brands(&self) -> RepoResult<Vec<String>> {
        self.inner.distinct_brands().await
    }
    async fn year_bounds(&self) -> RepoResult<(Option<i32>, Option<i32>)> {
        self.inner.year_bounds().await
    }
    async fn distinct_models(&self, brand: &str) -> RepoResult<Vec<String>> {
        self.inner.distinct_models(brand).await
    }
    async fn distinct_versions(&self, brand: &str, model: &str) -> RepoResult<Vec<String>> {
        self.inner.distinct_versions(brand, model).await
    }
    async fn add_favorite(&self, user_id: Uuid, car_id: Uuid) -> RepoResult<Favorite> {
        self.inner.add_favorite(user_id, car_id).await
    }
    async fn remove_favorite(&self, user_id: Uuid, car_id: Uuid) -> RepoResult<bool> {
        self.inner.remove_favorite(user_id, car_id).await
    }
    async fn list_favorites(&self, user_id: Uuid) -> RepoResult<Vec<FavoriteEntry>> {
        self.inner.list_favorites(user_id).await
    }
    async fn create_message(&self, message: NewMessage) -> RepoResult<Message> {
        self.inner.create_message(message).await
    }
}

// --- Mailer double ---

/// Records every email instead of sending it; optionally fails delivery.
#[derive(Default)]
pub struct RecordingMailer {
    pub fail: bool,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Delivery("simulated outage".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

// --- State builders ---

pub fn test_catalog() -> StaticCatalog {
    StaticCatalog {
        models: vec!["X5".to_string(), "3 Series".to_string()],
        versions: vec!["xDrive40i".to_string()],
    }
}

/// AppState over the given repository with mock collaborators.
pub fn create_test_state(repo: RepositoryState) -> AppState {
    AppState {
        repo,
        media: Arc::new(MockMediaHost::new()),
        mailer: Arc::new(RecordingMailer::default()),
        catalog: Arc::new(test_catalog()),
        config: AppConfig::default(),
    }
}

pub fn bearer_for(user: &User, config: &AppConfig) -> String {
    format!("Bearer {}", issue_token(user, config).unwrap())
}
