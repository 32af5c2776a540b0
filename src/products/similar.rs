use std::cmp::Reverse;

use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use super::moderation::Status;
use super::repo::{Product, ProductWithOwner, SELECT_WITH_OWNER};

/// Lowercase whitespace tokens of a product name, with tokens of length <= 2
/// dropped as noise (a, the, in, ...).
pub fn keywords(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .map(str::to_string)
        .collect()
}

/// Precomputed reference facts for the five-tier relevance ordering.
pub struct Reference {
    name: String,
    name_lower: String,
    category: String,
    first_keyword: Option<String>,
}

impl Reference {
    pub fn new(name: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            name_lower: name.to_lowercase(),
            category: category.to_string(),
            first_keyword: keywords(name).into_iter().next(),
        }
    }

    /// Relevance tier of a candidate, lower is more relevant:
    /// 0 exact name match, 1 name contains the full reference name,
    /// 2 name contains the first keyword, 3 same category, 4 everything else.
    /// Tiers 0 and 1 compare against the untokenized name; tier 2 only uses
    /// the first retained keyword.
    pub fn tier(&self, candidate_name: &str, candidate_category: &str) -> u8 {
        if candidate_name == self.name {
            return 0;
        }
        let candidate_lower = candidate_name.to_lowercase();
        if candidate_lower.contains(&self.name_lower) {
            return 1;
        }
        if let Some(kw) = &self.first_keyword {
            if candidate_lower.contains(kw.as_str()) {
                return 2;
            }
        }
        if candidate_category == self.category {
            return 3;
        }
        4
    }
}

/// Sort key: tier first, then most-recently-created within a tier.
fn rank_key(
    reference: &Reference,
    name: &str,
    category: &str,
    created_at: OffsetDateTime,
) -> (u8, Reverse<OffsetDateTime>) {
    (reference.tier(name, category), Reverse(created_at))
}

/// Find up to `limit` ONGOING listings related to `reference`, ranked by the
/// five-tier relevance order. The whole candidate set is fetched and ranked
/// in memory, so an old tier-0 match always outranks newer low-tier rows.
/// The reference itself is always excluded.
pub async fn find_similar(
    db: &PgPool,
    reference: &Product,
    limit: i64,
) -> sqlx::Result<Vec<ProductWithOwner>> {
    let kws = keywords(&reference.name);
    if kws.is_empty() && reference.category_name.is_empty() {
        // Nothing to match on; matching everything would be worse than nothing.
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new(SELECT_WITH_OWNER);
    qb.push(" WHERE p.deleted_at IS NULL");
    qb.push(" AND p.id != ").push_bind(reference.id);
    qb.push(" AND p.status = ").push_bind(Status::Ongoing);
    qb.push(" AND (p.category_name = ")
        .push_bind(reference.category_name.clone());
    for kw in &kws {
        let pat = format!("%{kw}%");
        qb.push(" OR p.name ILIKE ").push_bind(pat.clone());
        qb.push(" OR p.description ILIKE ").push_bind(pat);
    }
    qb.push(")");

    let mut candidates = qb.build_query_as::<ProductWithOwner>().fetch_all(db).await?;

    let reference = Reference::new(&reference.name, &reference.category_name);
    candidates.sort_by_key(|c| {
        rank_key(
            &reference,
            &c.product.name,
            &c.product.category_name,
            c.product.created_at,
        )
    });
    candidates.truncate(limit.max(0) as usize);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn keywords_drop_short_tokens_and_lowercase() {
        assert_eq!(
            keywords("Red Leather Bag in NY"),
            vec!["red".to_string(), "leather".to_string(), "bag".to_string()]
        );
        assert!(keywords("a an to").is_empty());
        assert!(keywords("").is_empty());
    }

    #[test]
    fn tier_zero_requires_exact_case_sensitive_name() {
        let r = Reference::new("Red Leather Bag", "Fashion");
        assert_eq!(r.tier("Red Leather Bag", "Sports"), 0);
        // Case differences fall through to the substring tier.
        assert_eq!(r.tier("red leather bag", "Sports"), 1);
    }

    #[test]
    fn tier_one_matches_full_name_substring_case_insensitive() {
        let r = Reference::new("Red Leather Bag", "Fashion");
        assert_eq!(r.tier("New RED leather bag Deluxe", "Sports"), 1);
    }

    #[test]
    fn tier_two_uses_only_first_keyword() {
        let r = Reference::new("Red Leather Bag", "Fashion");
        // Contains "red" but not the full name.
        assert_eq!(r.tier("Bright Red Scarf", "Sports"), 2);
        // Contains "leather" (second keyword) only: not tier 2.
        assert_ne!(r.tier("Leather Wallet", "Sports"), 2);
    }

    #[test]
    fn tier_three_matches_category() {
        let r = Reference::new("Red Leather Bag", "Fashion");
        assert_eq!(r.tier("Leather Wallet", "Fashion"), 3);
    }

    #[test]
    fn tier_four_is_the_fallback() {
        let r = Reference::new("Red Leather Bag", "Fashion");
        assert_eq!(r.tier("Garden Hose", "Outdoors"), 4);
    }

    #[test]
    fn five_tier_precedence_orders_candidates() {
        let r = Reference::new("Red Leather Bag", "Fashion");
        let ts = datetime!(2024-01-01 00:00 UTC);
        let mut candidates = vec![
            ("Garden Hose", "Outdoors"),
            ("Bag Stand", "Fashion"),
            ("New Red Leather Bag Deluxe", "Sports"),
            ("Red Leather Bag", "Sports"),
            ("Red Scarf", "Sports"),
        ];
        candidates.sort_by_key(|(name, cat)| rank_key(&r, name, cat, ts));
        let names: Vec<&str> = candidates.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "Red Leather Bag",
                "New Red Leather Bag Deluxe",
                "Red Scarf",
                "Bag Stand",
                "Garden Hose",
            ]
        );
    }

    #[test]
    fn ties_break_by_most_recent_first() {
        let r = Reference::new("Red Leather Bag", "Fashion");
        let older = datetime!(2024-01-01 00:00 UTC);
        let newer = datetime!(2024-06-01 00:00 UTC);
        let mut candidates = vec![("Bag Stand", older), ("Shoe Rack", newer)];
        candidates.sort_by_key(|(name, ts)| rank_key(&r, name, "Fashion", *ts));
        assert_eq!(candidates[0].0, "Shoe Rack");
    }

    #[test]
    fn empty_name_with_category_still_ranks_by_category() {
        let r = Reference::new("", "Fashion");
        // Empty reference name is a substring of everything: tier 1.
        assert_eq!(r.tier("Anything", "Outdoors"), 1);
    }

    mod db {
        use super::*;
        use crate::products::repo::Product;
        use crate::products::testutil::{insert_listing, seed_user};
        use sqlx::PgPool;

        #[sqlx::test]
        async fn old_exact_match_outranks_newer_category_matches(db: PgPool) {
            let owner = seed_user(&db).await;
            let reference_id = insert_listing(
                &db,
                owner,
                "Red Leather Bag",
                "Fashion",
                Status::Ongoing,
                datetime!(2023-01-01 00:00 UTC),
            )
            .await;
            // Exact-name match far older than the category crowd.
            let exact = insert_listing(
                &db,
                owner,
                "Red Leather Bag",
                "Sports",
                Status::Ongoing,
                datetime!(2020-01-01 00:00 UTC),
            )
            .await;
            let closed_twin = insert_listing(
                &db,
                owner,
                "Red Leather Bag",
                "Sports",
                Status::Closed,
                datetime!(2020-01-01 00:00 UTC),
            )
            .await;
            // Enough newer same-category rows to bury the exact match if
            // ranking only saw a recency-capped slice of the candidates.
            for i in 0..300 {
                insert_listing(
                    &db,
                    owner,
                    &format!("Shelf Unit {i}"),
                    "Fashion",
                    Status::Ongoing,
                    datetime!(2024-01-01 00:00 UTC),
                )
                .await;
            }

            let reference = Product::find_by_id(&db, reference_id)
                .await
                .unwrap()
                .unwrap()
                .product;
            let ranked = find_similar(&db, &reference, 5).await.unwrap();

            assert_eq!(ranked.len(), 5);
            assert_eq!(ranked[0].product.id, exact);
            assert!(ranked.iter().all(|r| r.product.id != reference_id));
            assert!(ranked.iter().all(|r| r.product.id != closed_twin));
        }
    }
}
