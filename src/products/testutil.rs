use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::moderation::Status;
use super::repo::ProductContent;

pub async fn seed_user(db: &PgPool) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO users (user_name, email) VALUES ('seller', $1) RETURNING id"#,
    )
    .bind(format!("{}@example.com", Uuid::new_v4()))
    .fetch_one(db)
    .await
    .expect("seed user")
}

pub fn content(name: &str, category: &str) -> ProductContent {
    ProductContent {
        name: name.into(),
        product_price: 120.5,
        market_price_from: 100.0,
        market_price_to: 150.0,
        category_name: category.into(),
        is_negotiable: true,
        description: "Barely used".into(),
        state: "Lagos".into(),
        address_in_state: "Yaba".into(),
        outstanding_issues: String::new(),
        condition: "Used".into(),
        brand_name: "Acme".into(),
        university: "Unilag".into(),
        image_urls: vec!["https://cdn.example/a.jpg".into()],
    }
}

/// Bare listing row with an explicit creation time, for ordering-sensitive
/// fixtures.
pub async fn insert_listing(
    db: &PgPool,
    owner: Uuid,
    name: &str,
    category: &str,
    status: Status,
    created_at: OffsetDateTime,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO products (name, category_name, status, user_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(category)
    .bind(status)
    .bind(owner)
    .bind(created_at)
    .fetch_one(db)
    .await
    .expect("insert listing")
}
