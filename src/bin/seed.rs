use campus_canteen_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        categories::{self, ActiveModel as CategoryActive, Column as CategoryCol},
        food_items::{ActiveModel as FoodActive, Column as FoodCol},
        profiles::{ActiveModel as ProfileActive, Column as ProfileCol},
        Categories, FoodItems, Profiles,
    },
    middleware::auth::{Session, issue_token},
    models::Role,
};
use chrono::{Duration, Utc};
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

struct SeedFood {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    price: i64,
    discount_percentage: i32,
    is_combo: bool,
    tags: &'static [&'static str],
}

const MENU: &[SeedFood] = &[
    SeedFood {
        name: "Masala Dosa",
        description: "Crisp dosa with potato masala, sambar and chutney",
        category: "south-indian",
        price: 6000,
        discount_percentage: 0,
        is_combo: false,
        tags: &["veg", "bestseller"],
    },
    SeedFood {
        name: "Idli Vada Combo",
        description: "Two idlis and one vada",
        category: "south-indian",
        price: 5500,
        discount_percentage: 10,
        is_combo: true,
        tags: &["veg"],
    },
    SeedFood {
        name: "Veg Thali",
        description: "Rice, two curries, dal, roti and curd",
        category: "meals",
        price: 10000,
        discount_percentage: 10,
        is_combo: true,
        tags: &["veg", "lunch"],
    },
    SeedFood {
        name: "Chicken Biryani",
        description: "Hyderabadi dum biryani with raita",
        category: "meals",
        price: 15000,
        discount_percentage: 0,
        is_combo: false,
        tags: &["non-veg", "bestseller"],
    },
    SeedFood {
        name: "Samosa",
        description: "Two samosas with green chutney",
        category: "snacks",
        price: 2500,
        discount_percentage: 0,
        is_combo: false,
        tags: &["veg"],
    },
    SeedFood {
        name: "Cold Coffee",
        description: "Chilled coffee with ice cream",
        category: "beverages",
        price: 5000,
        discount_percentage: 20,
        is_combo: false,
        tags: &["cold"],
    },
];

const CATEGORIES: &[(&str, &str)] = &[
    ("south-indian", "South Indian"),
    ("meals", "Meals"),
    ("snacks", "Snacks"),
    ("beverages", "Beverages"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let customer =
        ensure_profile(&orm, "student@campus.test", "Campus Student", Role::Customer).await?;
    let staff =
        ensure_profile(&orm, "kitchen@campus.test", "Canteen Counter", Role::Canteen).await?;
    seed_menu(&orm).await?;

    // Development tokens, signed the same way the identity service signs them.
    for session in [&customer, &staff] {
        let token = issue_token(session, &config.jwt_secret, Duration::days(7))?;
        println!("{} ({}): {token}", session.email, session.role.as_str());
    }

    println!("Seed completed.");
    Ok(())
}

async fn ensure_profile(
    orm: &DatabaseConnection,
    email: &str,
    full_name: &str,
    role: Role,
) -> anyhow::Result<Session> {
    let existing = Profiles::find()
        .filter(ProfileCol::Email.eq(email))
        .one(orm)
        .await?;

    let user_id = match existing {
        Some(profile) => profile.id,
        None => {
            let now: DateTimeWithTimeZone = Utc::now().into();
            ProfileActive {
                id: Set(Uuid::new_v4()),
                email: Set(email.to_string()),
                full_name: Set(Some(full_name.to_string())),
                phone: Set(None),
                role: Set(role.as_str().to_string()),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(orm)
            .await?
            .id
        }
    };

    println!("Ensured profile {email} (role={})", role.as_str());
    Ok(Session {
        user_id,
        email: email.to_string(),
        role,
    })
}

async fn ensure_category(
    orm: &DatabaseConnection,
    slug: &str,
    name: &str,
) -> anyhow::Result<categories::Model> {
    if let Some(category) = Categories::find()
        .filter(CategoryCol::Slug.eq(slug))
        .one(orm)
        .await?
    {
        return Ok(category);
    }

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        image_url: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(category)
}

async fn seed_menu(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (slug, name) in CATEGORIES {
        let category = ensure_category(orm, slug, name).await?;
        category_ids.push((*slug, category.id));
    }

    let mut inserted = 0;
    for food in MENU {
        let exists = FoodItems::find()
            .filter(FoodCol::Name.eq(food.name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let category_id = category_ids
            .iter()
            .find(|(slug, _)| *slug == food.category)
            .map(|(_, id)| *id)
            .ok_or_else(|| anyhow::anyhow!("unknown category {}", food.category))?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        FoodActive {
            id: Set(Uuid::new_v4()),
            name: Set(food.name.to_string()),
            description: Set(Some(food.description.to_string())),
            category_id: Set(category_id),
            price: Set(food.price),
            image_url: Set(None),
            is_available: Set(true),
            discount_percentage: Set(food.discount_percentage),
            is_combo: Set(food.is_combo),
            is_customizable: Set(false),
            tags: Set(serde_json::json!(food.tags)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(orm)
        .await?;
        inserted += 1;
    }

    println!("Seeded {inserted} food items");
    Ok(())
}
