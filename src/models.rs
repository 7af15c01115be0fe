use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The closed set of account roles. Stored and transmitted as the literal
/// strings `BUYER`, `SELLER` and `ADMIN`; parsing is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "BUYER",
            Role::Seller => "SELLER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUYER" => Ok(Role::Buyer),
            "SELLER" => Ok(Role::Seller),
            "ADMIN" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// --- Core Records (Mapped to Database) ---

/// User
///
/// An account row from the `users` table. The role column is free text so a
/// legacy or hand-edited value never breaks decoding; `role()` narrows it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub role: String,
    pub banned: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

/// Car
///
/// A listing from the `cars` table. Serialized in camelCase for the web client.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Car {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub brand: String,
    pub model: String,
    pub model_version: Option<String>,
    pub year: i32,
    pub mileage: i32,
    pub price: i64,
    pub description: String,
    pub images: Vec<String>,
    pub body_type: Option<String>,
    pub engine_volume: Option<String>,
    pub engine_type: Option<String>,
    pub power: Option<String>,
    pub transmission: Option<String>,
    pub drive: Option<String>,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub steering: Option<String>,
    pub customs_cleared: Option<String>,
    pub documents: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Favorite
///
/// A buyer's bookmark on a listing. `(user_id, car_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub car_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// FavoriteEntry
///
/// A favorite joined with the listing it points to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FavoriteEntry {
    pub id: Uuid,
    pub car_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub car: Car,
}

/// Message
///
/// A contact-form submission from the `messages` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Message {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Repository Inputs ---

/// Validated data for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Validated data for a new listing.
#[derive(Debug, Clone, Default)]
pub struct CarDraft {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage: i32,
    pub price: i64,
    pub description: String,
    pub images: Vec<String>,
    pub details: CarDetails,
}

/// Optional descriptive fields shared by create and update payloads.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CarDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steering: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customs_cleared: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl CarDetails {
    /// Blank strings from form fields are stored as NULL.
    pub fn without_blanks(self) -> Self {
        fn keep(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        Self {
            model_version: keep(self.model_version),
            body_type: keep(self.body_type),
            engine_volume: keep(self.engine_volume),
            engine_type: keep(self.engine_type),
            power: keep(self.power),
            transmission: keep(self.transmission),
            drive: keep(self.drive),
            color: keep(self.color),
            condition: keep(self.condition),
            steering: keep(self.steering),
            customs_cleared: keep(self.customs_cleared),
            documents: keep(self.documents),
            phone: keep(self.phone),
            city: keep(self.city),
        }
    }
}

/// Validated contact-form submission.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /api/register. The role defaults to BUYER.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// LoginResponse
///
/// The signed session token is returned in the body and also set as a cookie.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// CarFilter
///
/// Query parameters for GET /api/cars.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CarFilter {
    /// Case-insensitive substring of the brand.
    pub brand: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}

/// CreateCarRequest
///
/// Input payload for POST /api/cars. Brand, model, year and price are
/// required; the rest is optional.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCarRequest {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<i32>,
    pub price: Option<i64>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    #[serde(flatten)]
    pub details: CarDetails,
}

/// Oldest model year a listing may carry.
pub const MIN_LISTING_YEAR: i32 = 1886;
/// Highest asking price accepted for a listing.
pub const MAX_LISTING_PRICE: i64 = 1_000_000_000_000;
pub const MAX_LISTING_MILEAGE: i32 = 10_000_000;

/// ListingError
///
/// Why a listing payload was refused. Rendered verbatim as the 400 message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListingError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Year must be between 1886 and {0}")]
    Year(i32),
    #[error("Price must be between 1 and 1000000000000")]
    Price,
    #[error("Mileage must be between 0 and 10000000")]
    Mileage,
}

/// Range checks shared by create and update. Model years may run one year
/// ahead of the calendar.
fn check_listing_ranges(
    year: Option<i32>,
    price: Option<i64>,
    mileage: Option<i32>,
    current_year: i32,
) -> Result<(), ListingError> {
    let newest = current_year.saturating_add(1);
    if year.is_some_and(|y| !(MIN_LISTING_YEAR..=newest).contains(&y)) {
        return Err(ListingError::Year(newest));
    }
    if price.is_some_and(|p| !(1..=MAX_LISTING_PRICE).contains(&p)) {
        return Err(ListingError::Price);
    }
    if mileage.is_some_and(|m| !(0..=MAX_LISTING_MILEAGE).contains(&m)) {
        return Err(ListingError::Mileage);
    }
    Ok(())
}

impl CreateCarRequest {
    /// Validates the payload against `current_year` and turns it into a
    /// draft. A missing, blank or zero required field is `MissingFields`.
    pub fn into_draft(self, current_year: i32) -> Result<CarDraft, ListingError> {
        let brand = self.brand.filter(|b| !b.trim().is_empty());
        let model = self.model.filter(|m| !m.trim().is_empty());
        let year = self.year.filter(|y| *y != 0);
        let price = self.price.filter(|p| *p != 0);
        let (Some(brand), Some(model), Some(year), Some(price)) = (brand, model, year, price)
        else {
            return Err(ListingError::MissingFields);
        };
        check_listing_ranges(Some(year), Some(price), self.mileage, current_year)?;

        Ok(CarDraft {
            brand,
            model,
            year,
            mileage: self.mileage.unwrap_or(0),
            price,
            description: self.description.unwrap_or_default(),
            images: self.images.unwrap_or_default(),
            details: self.details.without_blanks(),
        })
    }
}

/// UpdateCarRequest
///
/// Partial update payload for PUT /api/cars/{id}. Absent fields are left
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateCarRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(flatten)]
    pub details: CarDetails,
}

impl UpdateCarRequest {
    /// Applies the same ranges as a new listing to whichever fields are present.
    pub fn validate(&self, current_year: i32) -> Result<(), ListingError> {
        check_listing_ranges(self.year, self.price, self.mileage, current_year)
    }
}

/// FavoriteRequest
///
/// Body for POST and DELETE /api/favorites.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FavoriteRequest {
    #[serde(default)]
    pub car_id: Option<Uuid>,
}

/// BanRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BanRequest {
    #[serde(default)]
    pub banned: bool,
}

/// UploadRequest
///
/// Body for POST /api/upload: either a data URI / base64 payload in `file`
/// or a remote `url` for the media host to fetch.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UploadRequest {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
}

/// UploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadResponse {
    pub url: String,
    pub public_id: String,
}

/// ContactRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// --- Response Envelopes ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CarList {
    pub cars: Vec<Car>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CarResponse {
    pub car: Car,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FavoriteResponse {
    pub favorite: Favorite,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ContactResponse {
    pub ok: bool,
    pub message: Message,
}

/// FilterOptions
///
/// Brand and year choices for the catalog filter bar and the sell form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct FilterOptions {
    pub brands: Vec<String>,
    pub years: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ModelList {
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct VersionList {
    pub versions: Vec<String>,
}

// --- Dashboard & Page Schemas (Output) ---

/// BuyerDashboard
///
/// Favorites plus up to six of the newest listings not already favorited.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BuyerDashboard {
    pub favorites: Vec<FavoriteEntry>,
    pub recommendations: Vec<Car>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellerStats {
    pub total_listings: i64,
    pub average_price: i64,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SellerDashboard {
    pub cars: Vec<Car>,
    pub stats: SellerStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProfilePage {
    pub user: User,
    pub cars: Vec<Car>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FavoritesPage {
    pub favorites: Vec<FavoriteEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminOverview {
    pub users: Vec<User>,
    pub cars: Vec<Car>,
}
