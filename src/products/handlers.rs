use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::ApiError,
    state::AppState,
};

use super::dto::{
    CategoryCount, CountQuery, DeleteResponse, OwnerCount, ProductBody, ProductListQuery,
    ProductPage, ProductResponse, SimilarQuery, StatusUpdateBody, StatusUpdated, UploadedImages,
};
use super::likes::{self, LikeState};
use super::moderation::{self, Status};
use super::repo::Product;
use super::similar;

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/counts", get(category_counts))
        .route("/products/:id", get(get_product))
        .route("/products/:id/similar", get(get_similar))
}

pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route(
            "/products/images",
            post(upload_images).layer(DefaultBodyLimit::max(20 * 1024 * 1024)),
        )
        .route("/products/user", get(list_my_products))
        .route("/products/user/counts", get(my_counts))
        .route(
            "/products/:id/user",
            get(get_my_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/like", post(toggle_like))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/products/:id/status", patch(set_product_status))
}

// --- public handlers ---

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<ProductListQuery>,
) -> Result<Json<ProductPage>, ApiError> {
    let filter = q.filter()?;
    let (page, limit) = (q.page(), q.limit());
    let (rows, total) = Product::list(&state.db, None, &filter, limit, q.offset()).await?;
    Ok(Json(ProductPage {
        page,
        limit,
        total,
        total_pages: (total + limit - 1) / limit,
        data: rows.into_iter().map(ProductResponse::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let row = Product::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    // Detached view bump; a reader never waits on (or fails because of) it.
    let db = state.db.clone();
    tokio::spawn(async move {
        if let Err(e) = Product::increment_views(&db, id).await {
            warn!(error = %e, %id, "view increment failed");
        }
    });

    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn get_similar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<SimilarQuery>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let reference = Product::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let rows = similar::find_similar(&state.db, &reference.product, q.limit).await?;
    Ok(Json(rows.into_iter().map(ProductResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn category_counts(
    State(state): State<AppState>,
    Query(q): Query<CountQuery>,
) -> Result<Json<CategoryCount>, ApiError> {
    let category = q
        .category_name
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Category is required".into()))?;
    let count = Product::count(&state.db, None, None, Some(category)).await?;
    Ok(Json(CategoryCount {
        category: category.to_string(),
        count,
    }))
}

// --- owner-scoped handlers ---

#[instrument(skip(state, body))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ProductBody>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let (content, status) = body.parse_content()?;
    let status = status.unwrap_or(state.config.default_product_status);
    let product = Product::insert(&state.db, user_id, &content, status).await?;

    // Social auto-post is decoupled from the create; its outcome is only logged.
    let social = state.social.clone();
    let caption = format!("{} for {:.2}", product.name, product.product_price);
    let first_image = content.image_urls.first().cloned().unwrap_or_default();
    tokio::spawn(async move {
        if let Err(e) = social.post_listing(&caption, &first_image).await {
            warn!(error = %e, "social auto-post failed");
        }
    });

    let row = Product::find_by_id(&state.db, product.id)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(product_id = %product.id, %user_id, status = %status, "product created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state))]
pub async fn list_my_products(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ProductListQuery>,
) -> Result<Json<ProductPage>, ApiError> {
    let filter = q.filter()?;
    let (page, limit) = (q.page(), q.limit());
    let (rows, total) = Product::list(&state.db, Some(user_id), &filter, limit, q.offset()).await?;
    Ok(Json(ProductPage {
        page,
        limit,
        total,
        total_pages: (total + limit - 1) / limit,
        data: rows.into_iter().map(ProductResponse::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn my_counts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<CountQuery>,
) -> Result<Json<OwnerCount>, ApiError> {
    let status = match q.status.as_deref().filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => {
            Some(Status::parse(raw).ok_or_else(|| ApiError::InvalidStatus(raw.to_string()))?)
        }
    };
    let count = Product::count(&state.db, Some(user_id), status, None).await?;
    Ok(Json(OwnerCount { count, status }))
}

#[instrument(skip(state))]
pub async fn get_my_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let row = Product::find_owned(&state.db, id, user_id)
        .await?
        .ok_or(ApiError::NotFoundOrUnauthorized)?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, body))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductBody>,
) -> Result<Json<ProductResponse>, ApiError> {
    body.require_all_fields()?;
    let (content, status) = body.parse_content()?;

    // Lookup and ownership predicate share one statement, so a non-owner
    // cannot tell "missing" from "not mine".
    Product::update_owned(&state.db, id, user_id, &content, status)
        .await?
        .ok_or(ApiError::NotFoundOrUnauthorized)?;

    let row = Product::find_owned(&state.db, id, user_id)
        .await?
        .ok_or(ApiError::NotFoundOrUnauthorized)?;
    info!(product_id = %id, %user_id, "product updated");
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = Product::soft_delete_owned(&state.db, id, user_id).await?;
    if !deleted {
        return Err(ApiError::NotFoundOrUnauthorized);
    }
    info!(product_id = %id, %user_id, "product deleted");
    Ok(Json(DeleteResponse {
        message: "Product deleted successfully".into(),
    }))
}

#[instrument(skip(state))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeState>, ApiError> {
    let like = likes::toggle(&state.db, id, user_id).await?;
    Ok(Json(like))
}

// --- admin handlers ---

#[instrument(skip(state, body))]
pub async fn set_product_status(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdateBody>,
) -> Result<Json<StatusUpdated>, ApiError> {
    let status =
        Status::parse(&body.status).ok_or_else(|| ApiError::InvalidStatus(body.status.clone()))?;
    moderation::set_status(&state, id, status, body.reason).await?;
    info!(product_id = %id, %admin_id, status = %status, "product status updated");
    Ok(Json(StatusUpdated { status }))
}

// --- media upload ---

#[instrument(skip(state, mp))]
pub async fn upload_images(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<UploadedImages>, ApiError> {
    let mut urls = Vec::new();
    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return Err(ApiError::InvalidInput("Invalid form data".into())),
        };
        let name = field.name().map(|s| s.to_string());
        if name.as_deref() != Some("images") && name.as_deref() != Some("image_urls") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::InvalidInput("Invalid form data".into()))?;
        let key = format!("users/{}/products/{}", user_id, Uuid::new_v4());
        let url = state.media.upload_image(&key, data, &content_type).await?;
        urls.push(url);
    }

    if urls.is_empty() {
        return Err(ApiError::InvalidInput(
            "You must upload at least one image".into(),
        ));
    }
    Ok(Json(UploadedImages { image_urls: urls }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;

    async fn multipart_from(body: &'static str) -> Multipart {
        let req = Request::builder()
            .header(
                "content-type",
                "multipart/form-data; boundary=XBOUNDARYX",
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    #[tokio::test]
    async fn upload_stores_image_fields() {
        let state = AppState::fake_with_jwt("secret", "iss", "aud");
        let mp = multipart_from(
            "--XBOUNDARYX\r\n\
             Content-Disposition: form-data; name=\"images\"; filename=\"a.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n\
             fakejpegbytes\r\n\
             --XBOUNDARYX--\r\n",
        )
        .await;

        let user_id = Uuid::new_v4();
        let Json(out) = upload_images(State(state), AuthUser(user_id), mp)
            .await
            .unwrap();
        assert_eq!(out.image_urls.len(), 1);
        assert!(out.image_urls[0].starts_with(&format!("https://fake.local/users/{user_id}/")));
    }

    #[tokio::test]
    async fn upload_rejects_malformed_multipart_as_invalid_form_data() {
        let state = AppState::fake_with_jwt("secret", "iss", "aud");
        let mp = multipart_from("this is not a multipart body").await;

        let err = upload_images(State(state), AuthUser(Uuid::new_v4()), mp)
            .await
            .unwrap_err();
        match err {
            ApiError::InvalidInput(msg) => assert_eq!(msg, "Invalid form data"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_without_image_fields_is_rejected() {
        let state = AppState::fake_with_jwt("secret", "iss", "aud");
        let mp = multipart_from(
            "--XBOUNDARYX\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             hello\r\n\
             --XBOUNDARYX--\r\n",
        )
        .await;

        let err = upload_images(State(state), AuthUser(Uuid::new_v4()), mp)
            .await
            .unwrap_err();
        match err {
            ApiError::InvalidInput(msg) => assert_eq!(msg, "You must upload at least one image"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
