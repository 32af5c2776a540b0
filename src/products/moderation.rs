use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

use super::repo::Product;

/// Moderation state of a listing.
///
/// Any state may be entered from any other; the enum is the only gate.
/// A strict transition table was considered and rejected to keep parity
/// with existing admin tooling that reopens CLOSED listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    UnderReview,
    Ongoing,
    Closed,
    Rejected,
}

impl Status {
    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "UNDER_REVIEW" => Some(Status::UnderReview),
            "ONGOING" => Some(Status::Ongoing),
            "CLOSED" => Some(Status::Closed),
            "REJECTED" => Some(Status::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::UnderReview => "UNDER_REVIEW",
            Status::Ongoing => "ONGOING",
            Status::Closed => "CLOSED",
            Status::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply a moderation decision to a product.
///
/// The status write and the `closed_at` stamp happen in one statement, so a
/// listing can never be observed as CLOSED without its timestamp. A REJECTED
/// decision additionally notifies the owner; that dispatch is detached and
/// its failure never unwinds the status change.
pub async fn set_status(
    state: &AppState,
    id: Uuid,
    new_status: Status,
    reason: Option<String>,
) -> Result<Product, ApiError> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
           SET status = $2,
               closed_at = CASE WHEN $2 = 'CLOSED'::product_status THEN now() ELSE closed_at END,
               updated_at = now()
         WHERE id = $1 AND deleted_at IS NULL
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(new_status)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound)?;

    if new_status == Status::Rejected {
        let db = state.db.clone();
        let notifier = state.notifier.clone();
        let owner_id = product.user_id;
        let product_name = product.name.clone();
        let reason = reason.unwrap_or_default();
        tokio::spawn(async move {
            let owner = sqlx::query_as::<_, (String, String)>(
                r#"SELECT user_name, email FROM users WHERE id = $1"#,
            )
            .bind(owner_id)
            .fetch_optional(&db)
            .await;

            match owner {
                Ok(Some((user_name, email))) => {
                    if let Err(e) = notifier
                        .notify_product_rejected(&email, &user_name, &product_name, &reason)
                        .await
                    {
                        tracing::warn!(error = %e, %owner_id, "rejection notification failed");
                    }
                }
                Ok(None) => {
                    tracing::warn!(%owner_id, "rejection notification skipped, owner missing");
                }
                Err(e) => {
                    tracing::warn!(error = %e, %owner_id, "owner lookup for notification failed");
                }
            }
        });
    }

    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_four_statuses() {
        assert_eq!(Status::parse("UNDER_REVIEW"), Some(Status::UnderReview));
        assert_eq!(Status::parse("ONGOING"), Some(Status::Ongoing));
        assert_eq!(Status::parse("CLOSED"), Some(Status::Closed));
        assert_eq!(Status::parse("REJECTED"), Some(Status::Rejected));
    }

    #[test]
    fn rejects_unknown_and_lowercase_statuses() {
        assert_eq!(Status::parse("ARCHIVED"), None);
        assert_eq!(Status::parse("ongoing"), None);
        assert_eq!(Status::parse(""), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        let s: Status = serde_json::from_str("\"UNDER_REVIEW\"").unwrap();
        assert_eq!(s, Status::UnderReview);
        assert_eq!(serde_json::to_string(&Status::Closed).unwrap(), "\"CLOSED\"");
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(Status::Rejected.to_string(), "REJECTED");
    }

    mod db {
        use super::*;
        use crate::products::testutil::{insert_listing, seed_user};
        use sqlx::PgPool;
        use time::OffsetDateTime;

        #[sqlx::test]
        async fn closing_stamps_closed_at_with_the_status(db: PgPool) {
            let state = AppState::fake_with_db(db.clone());
            let owner = seed_user(&db).await;
            let id = insert_listing(
                &db,
                owner,
                "Desk Lamp",
                "Home",
                Status::Ongoing,
                OffsetDateTime::now_utc(),
            )
            .await;

            let closed = set_status(&state, id, Status::Closed, None).await.unwrap();
            assert_eq!(closed.status, Status::Closed);
            let closed_at = closed.closed_at.unwrap();
            assert!(closed_at >= closed.created_at);

            // The stamp survives a later reopen.
            let reopened = set_status(&state, id, Status::Ongoing, None).await.unwrap();
            assert_eq!(reopened.status, Status::Ongoing);
            assert_eq!(reopened.closed_at, Some(closed_at));
        }

        #[sqlx::test]
        async fn non_closing_decisions_leave_closed_at_empty(db: PgPool) {
            let state = AppState::fake_with_db(db.clone());
            let owner = seed_user(&db).await;
            let id = insert_listing(
                &db,
                owner,
                "Desk Lamp",
                "Home",
                Status::UnderReview,
                OffsetDateTime::now_utc(),
            )
            .await;

            let approved = set_status(&state, id, Status::Ongoing, None).await.unwrap();
            assert!(approved.closed_at.is_none());
        }

        #[sqlx::test]
        async fn unknown_product_is_not_found(db: PgPool) {
            let state = AppState::fake_with_db(db);
            let err = set_status(&state, Uuid::new_v4(), Status::Closed, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::NotFound));
        }
    }
}
