use serde::Deserialize;

use crate::products::moderation::Status;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Base under which uploaded objects are publicly reachable.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
    /// Status assigned to new listings when the caller does not pick one.
    pub default_product_status: Status,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "tradepost".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "tradepost-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let media = MediaConfig {
            endpoint: std::env::var("MEDIA_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".into()),
            bucket: std::env::var("MEDIA_BUCKET").unwrap_or_else(|_| "tradepost".into()),
            access_key: std::env::var("MEDIA_ACCESS_KEY").unwrap_or_default(),
            secret_key: std::env::var("MEDIA_SECRET_KEY").unwrap_or_default(),
            public_base_url: std::env::var("MEDIA_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9000/tradepost".into()),
        };
        let default_product_status = std::env::var("DEFAULT_PRODUCT_STATUS")
            .ok()
            .and_then(|v| Status::parse(&v))
            .unwrap_or(Status::UnderReview);
        Ok(Self {
            database_url,
            jwt,
            media,
            default_product_status,
        })
    }
}
