use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::moderation::Status;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub product_price: f64,
    pub market_price_from: f64,
    pub market_price_to: f64,
    pub category_name: String,
    pub is_negotiable: bool,
    pub description: String,
    pub state: String,
    pub address_in_state: String,
    pub outstanding_issues: String,
    pub condition: String,
    pub brand_name: String,
    pub university: String,
    pub image_urls: serde_json::Value,
    pub status: Status,
    pub user_id: Uuid,
    pub views: i64,
    pub likes: i64,
    pub is_deleted_by_user: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
    pub closed_at: Option<OffsetDateTime>,
}

/// A product row joined with the sanitized columns of its owner.
#[derive(Debug, Clone, FromRow)]
pub struct ProductWithOwner {
    #[sqlx(flatten)]
    pub product: Product,
    pub owner_user_name: String,
    pub owner_email: String,
    pub owner_role: String,
    pub owner_phone_number: String,
    pub owner_image_url: String,
    pub owner_location: String,
    pub owner_created_at: OffsetDateTime,
    pub owner_updated_at: OffsetDateTime,
}

/// Content fields of a listing, written wholesale on create and update.
#[derive(Debug, Clone)]
pub struct ProductContent {
    pub name: String,
    pub product_price: f64,
    pub market_price_from: f64,
    pub market_price_to: f64,
    pub category_name: String,
    pub is_negotiable: bool,
    pub description: String,
    pub state: String,
    pub address_in_state: String,
    pub outstanding_issues: String,
    pub condition: String,
    pub brand_name: String,
    pub university: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<Status>,
    pub state: Option<String>,
    pub created_between: Option<(OffsetDateTime, OffsetDateTime)>,
    pub price_between: Option<(f64, f64)>,
    pub keyword: Option<String>,
}

pub(super) const SELECT_WITH_OWNER: &str = r#"
SELECT p.*,
       u.user_name    AS owner_user_name,
       u.email        AS owner_email,
       u.role         AS owner_role,
       u.phone_number AS owner_phone_number,
       u.image_url    AS owner_image_url,
       u.location     AS owner_location,
       u.created_at   AS owner_created_at,
       u.updated_at   AS owner_updated_at
  FROM products p
  JOIN users u ON u.id = p.user_id
"#;

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, owner: Option<Uuid>, f: &ProductFilter) {
    qb.push(" WHERE p.deleted_at IS NULL");
    if let Some(owner) = owner {
        qb.push(" AND p.user_id = ").push_bind(owner);
    }
    if let Some(s) = &f.search {
        qb.push(" AND p.name ILIKE ").push_bind(format!("%{s}%"));
    }
    if let Some(c) = &f.category {
        qb.push(" AND p.category_name = ").push_bind(c.clone());
    }
    if let Some(st) = f.status {
        qb.push(" AND p.status = ").push_bind(st);
    }
    if let Some(s) = &f.state {
        qb.push(" AND p.state = ").push_bind(s.clone());
    }
    if let Some((from, to)) = f.created_between {
        qb.push(" AND p.created_at BETWEEN ")
            .push_bind(from)
            .push(" AND ")
            .push_bind(to);
    }
    if let Some((lo, hi)) = f.price_between {
        qb.push(" AND p.product_price BETWEEN ")
            .push_bind(lo)
            .push(" AND ")
            .push_bind(hi);
    }
    if let Some(k) = &f.keyword {
        let pat = format!("%{k}%");
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pat.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pat)
            .push(")");
    }
}

impl Product {
    pub async fn insert(
        db: &PgPool,
        owner_id: Uuid,
        content: &ProductContent,
        status: Status,
    ) -> sqlx::Result<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products
                (name, product_price, market_price_from, market_price_to, category_name,
                 is_negotiable, description, state, address_in_state, outstanding_issues,
                 condition, brand_name, university, image_urls, status, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(&content.name)
        .bind(content.product_price)
        .bind(content.market_price_from)
        .bind(content.market_price_to)
        .bind(&content.category_name)
        .bind(content.is_negotiable)
        .bind(&content.description)
        .bind(&content.state)
        .bind(&content.address_in_state)
        .bind(&content.outstanding_issues)
        .bind(&content.condition)
        .bind(&content.brand_name)
        .bind(&content.university)
        .bind(serde_json::json!(content.image_urls))
        .bind(status)
        .bind(owner_id)
        .fetch_one(db)
        .await
    }

    /// Overwrite all content fields of an owned listing in one ownership-scoped
    /// statement. `None` means "no row matched id + owner", which the caller
    /// must report as the collapsed not-found/unauthorized error.
    pub async fn update_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        content: &ProductContent,
        status: Option<Status>,
    ) -> sqlx::Result<Option<Product>> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
               SET name = $3, product_price = $4, market_price_from = $5,
                   market_price_to = $6, category_name = $7, is_negotiable = $8,
                   description = $9, state = $10, address_in_state = $11,
                   outstanding_issues = $12, condition = $13, brand_name = $14,
                   university = $15, image_urls = $16,
                   status = COALESCE($17, status),
                   updated_at = now()
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&content.name)
        .bind(content.product_price)
        .bind(content.market_price_from)
        .bind(content.market_price_to)
        .bind(&content.category_name)
        .bind(content.is_negotiable)
        .bind(&content.description)
        .bind(&content.state)
        .bind(&content.address_in_state)
        .bind(&content.outstanding_issues)
        .bind(&content.condition)
        .bind(&content.brand_name)
        .bind(&content.university)
        .bind(serde_json::json!(content.image_urls))
        .bind(status)
        .fetch_optional(db)
        .await
    }

    /// Soft delete an owned listing. Returns false when no live row matched
    /// the id + owner pair; a zero-row delete is never success.
    pub async fn soft_delete_owned(db: &PgPool, id: Uuid, owner_id: Uuid) -> sqlx::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE products
               SET deleted_at = now(), is_deleted_by_user = TRUE, updated_at = now()
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<ProductWithOwner>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_WITH_OWNER);
        qb.push(" WHERE p.id = ").push_bind(id);
        qb.push(" AND p.deleted_at IS NULL");
        qb.build_query_as::<ProductWithOwner>()
            .fetch_optional(db)
            .await
    }

    pub async fn find_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> sqlx::Result<Option<ProductWithOwner>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_WITH_OWNER);
        qb.push(" WHERE p.id = ").push_bind(id);
        qb.push(" AND p.user_id = ").push_bind(owner_id);
        qb.push(" AND p.deleted_at IS NULL");
        qb.build_query_as::<ProductWithOwner>()
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        db: &PgPool,
        owner: Option<Uuid>,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<(Vec<ProductWithOwner>, i64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_filters(&mut count_qb, owner, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

        let mut qb = QueryBuilder::<Postgres>::new(SELECT_WITH_OWNER);
        push_filters(&mut qb, owner, filter);
        qb.push(" ORDER BY p.created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = qb.build_query_as::<ProductWithOwner>().fetch_all(db).await?;

        Ok((rows, total))
    }

    /// Detached view counter bump. Atomic at the storage layer so concurrent
    /// readers never lose updates.
    pub async fn increment_views(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query(r#"UPDATE products SET views = views + 1 WHERE id = $1 AND deleted_at IS NULL"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn count(
        db: &PgPool,
        owner: Option<Uuid>,
        status: Option<Status>,
        category: Option<&str>,
    ) -> sqlx::Result<i64> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL");
        if let Some(owner) = owner {
            qb.push(" AND user_id = ").push_bind(owner);
        }
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(category) = category {
            qb.push(" AND category_name = ").push_bind(category.to_string());
        }
        qb.build_query_scalar().fetch_one(db).await
    }
}
