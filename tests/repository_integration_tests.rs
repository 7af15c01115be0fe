use autoshop::{
    error::RepoError,
    models::{CarDetails, CarDraft, CarFilter, NewMessage, NewUser, Role, UpdateCarRequest, User},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

/// A simple structure to hold the database pool for testing
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Every test works on its own rows, so the suite can share one database.
async fn create_test_user(repo: &PostgresRepository, role: Role) -> User {
    repo.create_user(NewUser {
        email: format!("{}@repo-test.local", Uuid::new_v4()),
        name: Some("Repo Test".to_string()),
        password_hash: "$2b$04$placeholderplaceholderplaceholderpla".to_string(),
        role,
    })
    .await
    .expect("Failed to create test user")
}

fn draft(brand: &str, model: &str, year: i32, price: i64) -> CarDraft {
    CarDraft {
        brand: brand.to_string(),
        model: model.to_string(),
        year,
        mileage: 12_000,
        price,
        description: "Test listing".to_string(),
        images: vec!["https://media.mock.local/a.jpg".to_string()],
        details: CarDetails::default(),
    }
}

// --- Users ---

#[test]
#[ignore = "requires Postgres"]
async fn test_create_and_fetch_user() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = create_test_user(&repo, Role::Seller).await;
    let by_id = repo.get_user(user.id).await.unwrap().unwrap();
    let by_email = repo.get_user_by_email(&user.email).await.unwrap().unwrap();

    assert_eq!(by_id.id, by_email.id);
    assert_eq!(by_id.role(), Some(Role::Seller));
    assert!(!by_id.banned);
}

#[test]
#[ignore = "requires Postgres"]
async fn test_duplicate_email_is_conflict() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = create_test_user(&repo, Role::Buyer).await;
    let err = repo
        .create_user(NewUser {
            email: user.email.clone(),
            name: None,
            password_hash: "x".to_string(),
            role: Role::Buyer,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict));
}

#[test]
#[ignore = "requires Postgres"]
async fn test_ban_toggle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = create_test_user(&repo, Role::Buyer).await;
    let banned = repo.set_user_banned(user.id, true).await.unwrap().unwrap();
    assert!(banned.banned);

    assert!(repo.set_user_banned(Uuid::new_v4(), true).await.unwrap().is_none());
}

// --- Cars ---

#[test]
#[ignore = "requires Postgres"]
async fn test_car_lifecycle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo, Role::Seller).await;

    let mut new_car = draft("Skoda", "Octavia", 2019, 15_500);
    new_car.details.model_version = Some("RS".to_string());
    let car = repo.create_car(new_car, owner.id).await.unwrap();
    assert_eq!(car.owner_id, owner.id);
    assert_eq!(car.model_version.as_deref(), Some("RS"));
    assert_eq!(car.images.len(), 1);

    let updated = repo
        .update_car(
            car.id,
            UpdateCarRequest {
                price: Some(14_900),
                ..UpdateCarRequest::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.price, 14_900);
    assert_eq!(updated.model, "Octavia");
    assert_eq!(updated.model_version.as_deref(), Some("RS"));

    assert!(repo.delete_car(car.id).await.unwrap());
    assert!(!repo.delete_car(car.id).await.unwrap());
    assert!(repo.get_car(car.id).await.unwrap().is_none());
}

#[test]
#[ignore = "requires Postgres"]
async fn test_list_cars_filters_and_orders() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo, Role::Seller).await;

    // A brand unique to this test keeps other rows out of the result.
    let brand = format!("Brand{}", Uuid::new_v4().simple());
    let older = repo.create_car(draft(&brand, "A", 2010, 5_000), owner.id).await.unwrap();
    let newer = repo.create_car(draft(&brand, "B", 2020, 25_000), owner.id).await.unwrap();

    let all = repo
        .list_cars(&CarFilter {
            brand: Some(brand.to_lowercase()),
            ..CarFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(
        all.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );

    let cheap = repo
        .list_cars(&CarFilter {
            brand: Some(brand.clone()),
            max_price: Some(10_000),
            ..CarFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(cheap.len(), 1);
    assert_eq!(cheap[0].id, older.id);

    let models = repo.distinct_models(&brand.to_uppercase()).await.unwrap();
    assert_eq!(models, vec!["A", "B"]);
}

#[test]
#[ignore = "requires Postgres"]
async fn test_brand_filter_is_literal() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let cars = repo
        .list_cars(&CarFilter {
            brand: Some("%_no_such_brand_%".to_string()),
            ..CarFilter::default()
        })
        .await
        .unwrap();
    assert!(cars.is_empty());
}

// --- Favorites ---

#[test]
#[ignore = "requires Postgres"]
async fn test_favorites_are_idempotent_and_cascade() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let seller = create_test_user(&repo, Role::Seller).await;
    let buyer = create_test_user(&repo, Role::Buyer).await;
    let car = repo.create_car(draft("Opel", "Astra", 2016, 8_000), seller.id).await.unwrap();

    let first = repo.add_favorite(buyer.id, car.id).await.unwrap();
    let second = repo.add_favorite(buyer.id, car.id).await.unwrap();
    assert_eq!(first.id, second.id);

    let entries = repo.list_favorites(buyer.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].car.id, car.id);

    let recommended = repo.recent_cars_excluding(&[car.id], 50).await.unwrap();
    assert!(recommended.iter().all(|c| c.id != car.id));

    // Deleting the listing removes the favorite with it.
    repo.delete_car(car.id).await.unwrap();
    assert!(repo.list_favorites(buyer.id).await.unwrap().is_empty());
    assert!(!repo.remove_favorite(buyer.id, car.id).await.unwrap());
}

// --- Contact ---

#[test]
#[ignore = "requires Postgres"]
async fn test_create_message() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let saved = repo
        .create_message(NewMessage {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            subject: None,
            message: "Hello".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(saved.subject, None);
    assert_eq!(saved.message, "Hello");
}
