#![allow(dead_code)]

use std::{path::PathBuf, time::Duration};

use campus_canteen_api::{
    config::AppConfig,
    entity::{
        AuditLogs, CartItems, Categories, FoodItems, OrderItems, Orders, Profiles, cart_items,
        categories::ActiveModel as CategoryActive,
        food_items::{self, ActiveModel as FoodActive},
        profiles::ActiveModel as ProfileActive,
    },
    middleware::auth::Session,
    models::Role,
    state::AppState,
};
use chrono::Utc;
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    Schema, Set,
};
use uuid::Uuid;

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        estimated_prep_minutes: 15,
        change_feed_capacity: 64,
    }
}

/// Fresh in-memory database with every table created from the entities.
///
/// A single pooled connection keeps the whole test on one database.
pub async fn setup_state() -> anyhow::Result<AppState> {
    connect("sqlite::memory:", 1).await
}

/// File-backed database shared by `max_connections` pooled connections, for
/// tests that need statements to really run side by side.
pub async fn setup_pooled_state(max_connections: u32) -> anyhow::Result<(AppState, PathBuf)> {
    let path = std::env::temp_dir().join(format!("canteen-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let state = connect(&url, max_connections).await?;
    Ok((state, path))
}

async fn connect(url: &str, max_connections: u32) -> anyhow::Result<AppState> {
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;

    create_table(&orm, Profiles).await?;
    create_table(&orm, Categories).await?;
    create_table(&orm, FoodItems).await?;
    create_table(&orm, CartItems).await?;
    create_table(&orm, Orders).await?;
    create_table(&orm, OrderItems).await?;
    create_table(&orm, AuditLogs).await?;

    let backend = orm.get_database_backend();
    orm.execute(backend.build(&cart_items::user_item_unique_index()))
        .await?;

    Ok(AppState::new(orm, test_config()))
}

async fn create_table<E: EntityTrait>(orm: &DatabaseConnection, entity: E) -> anyhow::Result<()> {
    let backend = orm.get_database_backend();
    let schema = Schema::new(backend);
    orm.execute(backend.build(&schema.create_table_from_entity(entity)))
        .await?;
    Ok(())
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

pub async fn create_profile(state: &AppState, email: &str, role: Role) -> anyhow::Result<Session> {
    let profile = ProfileActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        full_name: Set(None),
        phone: Set(None),
        role: Set(role.as_str().to_string()),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(&state.orm)
    .await?;

    Ok(Session {
        user_id: profile.id,
        email: profile.email,
        role,
    })
}

pub async fn create_category(state: &AppState, slug: &str) -> anyhow::Result<Uuid> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(slug.to_uppercase()),
        slug: Set(slug.to_string()),
        image_url: Set(None),
        created_at: Set(now()),
    }
    .insert(&state.orm)
    .await?;
    Ok(category.id)
}

pub async fn create_food(
    state: &AppState,
    category_id: Uuid,
    name: &str,
    price: i64,
    discount_percentage: i32,
) -> anyhow::Result<food_items::Model> {
    let food = FoodActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        category_id: Set(category_id),
        price: Set(price),
        image_url: Set(None),
        is_available: Set(true),
        discount_percentage: Set(discount_percentage),
        is_combo: Set(false),
        is_customizable: Set(false),
        tags: Set(serde_json::json!([])),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(&state.orm)
    .await?;
    Ok(food)
}

/// A customer, a canteen staff member and two dishes:
/// a 100.00 thali at 10% off and a 50.00 dosa at full price.
pub struct Fixture {
    pub state: AppState,
    pub customer: Session,
    pub staff: Session,
    pub thali: food_items::Model,
    pub dosa: food_items::Model,
}

pub async fn fixture() -> anyhow::Result<Fixture> {
    fixture_on(setup_state().await?).await
}

pub async fn fixture_on(state: AppState) -> anyhow::Result<Fixture> {
    let customer = create_profile(&state, "student@campus.test", Role::Customer).await?;
    let staff = create_profile(&state, "kitchen@campus.test", Role::Canteen).await?;
    let category = create_category(&state, "meals").await?;
    let thali = create_food(&state, category, "Veg Thali", 10000, 10).await?;
    let dosa = create_food(&state, category, "Masala Dosa", 5000, 0).await?;
    Ok(Fixture {
        state,
        customer,
        staff,
        thali,
        dosa,
    })
}
