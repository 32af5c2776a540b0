use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

/// Result of a like toggle: whether the caller now likes the product, and the
/// denormalized counter after the flip.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i64,
}

/// Flip the (product, user) like. Presence of the product_likes row is the
/// liked boolean; the products.likes counter is adjusted with an atomic
/// increment/decrement in a second statement. A crash between the two writes
/// can leave the counter off by one; that drift is accepted rather than
/// masked, and no reconciliation runs here.
pub async fn toggle(db: &PgPool, product_id: Uuid, user_id: Uuid) -> Result<LikeState, ApiError> {
    let exists = sqlx::query_scalar::<_, i32>(
        r#"SELECT 1 FROM products WHERE id = $1 AND deleted_at IS NULL"#,
    )
    .bind(product_id)
    .fetch_optional(db)
    .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound);
    }

    let deleted = sqlx::query(
        r#"DELETE FROM product_likes WHERE product_id = $1 AND user_id = $2"#,
    )
    .bind(product_id)
    .bind(user_id)
    .execute(db)
    .await?;

    if deleted.rows_affected() > 0 {
        let likes = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE products SET likes = GREATEST(likes - 1, 0)
             WHERE id = $1
            RETURNING likes
            "#,
        )
        .bind(product_id)
        .fetch_one(db)
        .await?;
        return Ok(LikeState { liked: false, likes });
    }

    // The UNIQUE (product_id, user_id) index makes a racing double-insert a
    // no-op instead of a duplicate row.
    let inserted = sqlx::query(
        r#"
        INSERT INTO product_likes (product_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (product_id, user_id) DO NOTHING
        "#,
    )
    .bind(product_id)
    .bind(user_id)
    .execute(db)
    .await?;

    let likes = if inserted.rows_affected() > 0 {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE products SET likes = likes + 1
             WHERE id = $1
            RETURNING likes
            "#,
        )
        .bind(product_id)
        .fetch_one(db)
        .await?
    } else {
        sqlx::query_scalar::<_, i64>(r#"SELECT likes FROM products WHERE id = $1"#)
            .bind(product_id)
            .fetch_one(db)
            .await?
    };

    Ok(LikeState { liked: true, likes })
}
