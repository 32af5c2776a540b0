use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use crate::error::ApiError;

use super::moderation::Status;
use super::repo::{Product, ProductContent, ProductFilter, ProductWithOwner};

// --- requests ---

/// Listing payload. Numeric fields arrive as strings (form-value heritage of
/// the public API) and must parse as non-negative floats.
#[derive(Debug, Deserialize)]
pub struct ProductBody {
    pub product_name: String,
    pub product_price: String,
    pub market_price_from: String,
    pub market_price_to: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub is_negotiable: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub address_in_state: String,
    #[serde(default)]
    pub outstanding_issues: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub brand_name: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub status: Option<String>,
}

fn parse_non_negative(raw: &str, message: &str) -> Result<f64, ApiError> {
    let v: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidInput(message.to_string()))?;
    if !v.is_finite() || v < 0.0 {
        return Err(ApiError::InvalidInput(message.to_string()));
    }
    Ok(v)
}

impl ProductBody {
    /// Validate and convert into persistable content plus an optional
    /// caller-picked status. Rejects before any write happens.
    pub fn parse_content(&self) -> Result<(ProductContent, Option<Status>), ApiError> {
        if self.image_urls.is_empty() {
            return Err(ApiError::InvalidInput(
                "You must upload at least one image".into(),
            ));
        }
        let product_price = parse_non_negative(&self.product_price, "Invalid product price")?;
        let market_price_from =
            parse_non_negative(&self.market_price_from, "Invalid market price (from)")?;
        let market_price_to =
            parse_non_negative(&self.market_price_to, "Invalid market price (to)")?;

        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                Status::parse(raw).ok_or_else(|| ApiError::InvalidStatus(raw.to_string()))?,
            ),
        };

        Ok((
            ProductContent {
                name: self.product_name.clone(),
                product_price,
                market_price_from,
                market_price_to,
                category_name: self.category_name.clone(),
                is_negotiable: self.is_negotiable.to_lowercase() == "true",
                description: self.description.clone(),
                state: self.state.clone(),
                address_in_state: self.address_in_state.clone(),
                outstanding_issues: self.outstanding_issues.clone(),
                condition: self.condition.clone(),
                brand_name: self.brand_name.clone(),
                university: self.university.clone(),
                image_urls: self.image_urls.clone(),
            },
            status,
        ))
    }

    /// Updates overwrite every content field, so all of them must be present.
    pub fn require_all_fields(&self) -> Result<(), ApiError> {
        let required = [
            &self.product_name,
            &self.product_price,
            &self.market_price_from,
            &self.market_price_to,
            &self.category_name,
            &self.is_negotiable,
            &self.description,
            &self.state,
            &self.address_in_state,
            &self.condition,
            &self.brand_name,
        ];
        if required.iter().any(|f| f.is_empty()) {
            return Err(ApiError::InvalidInput("All fields are required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateBody {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub category_name: Option<String>,
    pub status: Option<String>,
    pub state: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub keyword: Option<String>,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub limit: i64,
}

fn non_empty(v: &Option<String>) -> Option<&String> {
    v.as_ref().filter(|s| !s.is_empty())
}

impl ProductListQuery {
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> i64 {
        if self.limit < 1 {
            10
        } else {
            self.limit
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    pub fn filter(&self) -> Result<ProductFilter, ApiError> {
        let status = match non_empty(&self.status) {
            None => None,
            Some(raw) => Some(
                Status::parse(raw).ok_or_else(|| ApiError::InvalidStatus(raw.clone()))?,
            ),
        };

        // Range filters only apply when both bounds are present.
        let created_between = match (non_empty(&self.start_date), non_empty(&self.end_date)) {
            (Some(from), Some(to)) => {
                let from = OffsetDateTime::parse(from, &Rfc3339)
                    .map_err(|_| ApiError::InvalidInput("Invalid start_date".into()))?;
                let to = OffsetDateTime::parse(to, &Rfc3339)
                    .map_err(|_| ApiError::InvalidInput("Invalid end_date".into()))?;
                Some((from, to))
            }
            _ => None,
        };

        let price_between = match (non_empty(&self.min_price), non_empty(&self.max_price)) {
            (Some(lo), Some(hi)) => {
                let lo = parse_non_negative(lo, "Invalid min_price")?;
                let hi = parse_non_negative(hi, "Invalid max_price")?;
                Some((lo, hi))
            }
            _ => None,
        };

        Ok(ProductFilter {
            search: non_empty(&self.search).cloned(),
            category: non_empty(&self.category_name).cloned(),
            status,
            state: non_empty(&self.state).cloned(),
            created_between,
            price_between,
            keyword: non_empty(&self.keyword).cloned(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    #[serde(default = "default_similar_limit")]
    pub limit: i64,
}

fn default_similar_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    pub category_name: Option<String>,
    pub status: Option<String>,
}

// --- responses ---

/// Owner embed stripped of anything credential-like.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub role: String,
    pub phone_number: String,
    pub image_url: String,
    pub location: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub product_name: String,
    pub product_price: f64,
    pub market_price_from: f64,
    pub market_price_to: f64,
    pub category_name: String,
    pub is_negotiable: bool,
    pub description: String,
    pub state: String,
    pub address_in_state: String,
    pub outstanding_issues: String,
    pub image_urls: serde_json::Value,
    pub status: Status,
    pub condition: String,
    pub user_id: Uuid,
    pub university: String,
    pub brand_name: String,
    pub user: PublicUser,
    pub views: i64,
    pub likes: i64,
    pub is_deleted_by_user: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<ProductWithOwner> for ProductResponse {
    fn from(row: ProductWithOwner) -> Self {
        let Product {
            id,
            name,
            product_price,
            market_price_from,
            market_price_to,
            category_name,
            is_negotiable,
            description,
            state,
            address_in_state,
            outstanding_issues,
            condition,
            brand_name,
            university,
            image_urls,
            status,
            user_id,
            views,
            likes,
            is_deleted_by_user,
            created_at,
            updated_at,
            ..
        } = row.product;
        Self {
            id,
            product_name: name,
            product_price,
            market_price_from,
            market_price_to,
            category_name,
            is_negotiable,
            description,
            state,
            address_in_state,
            outstanding_issues,
            image_urls,
            status,
            condition,
            user_id,
            university,
            brand_name,
            user: PublicUser {
                id: user_id,
                user_name: row.owner_user_name,
                email: row.owner_email,
                role: row.owner_role,
                phone_number: row.owner_phone_number,
                image_url: row.owner_image_url,
                location: row.owner_location,
                created_at: row.owner_created_at,
                updated_at: row.owner_updated_at,
            },
            views,
            likes,
            is_deleted_by_user,
            created_at,
            updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub data: Vec<ProductResponse>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdated {
    pub status: Status,
}

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct OwnerCount {
    pub count: i64,
    pub status: Option<Status>,
}

#[derive(Debug, Serialize)]
pub struct UploadedImages {
    pub image_urls: Vec<String>,
}
