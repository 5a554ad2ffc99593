//! CRUD handlers shared by every user-owned collection.
//!
//! Each handler is generic over [`CollectionModel`]; the router instantiates
//! them once per collection.

use crate::{json_body, parse_id, ApiError, ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use collecthub_core::{CollectionModel, DocumentStore, Filter, RecordId};
use serde::Serialize;

#[derive(Serialize)]
pub struct InsertResponse {
    pub inserted_id: RecordId,
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub message: String,
    pub modified_count: u64,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted_count: u64,
}

const PARSE_ERROR: &str = "cannot parse JSON";

pub async fn create_record<M: CollectionModel>(
    State(state): State<AppState>,
    payload: Result<Json<M>, JsonRejection>,
) -> ApiResult<Json<InsertResponse>> {
    let record = json_body(payload, PARSE_ERROR)?;
    let document = record.to_document()?;

    let inserted_id = state
        .store
        .insert_one(M::COLLECTION, document)
        .await
        .map_err(|e| ApiError::internal(format!("failed to insert {}", M::NOUN), e))?;

    Ok(Json(InsertResponse { inserted_id }))
}

pub async fn list_by_user<M: CollectionModel>(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<M>>> {
    let user_id = parse_id(&user_id, "user")?;

    let documents = state
        .store
        .find(M::COLLECTION, &Filter::by_user(user_id))
        .await
        .map_err(|e| ApiError::internal(format!("failed to fetch {}", M::COLLECTION), e))?;

    let records = documents
        .into_iter()
        .map(M::from_document)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::internal(format!("error decoding {}", M::COLLECTION), e))?;

    Ok(Json(records))
}

pub async fn get_record<M: CollectionModel>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<M>> {
    let id = parse_id(&id, M::NOUN)?;

    let document = state
        .store
        .find_one(M::COLLECTION, &Filter::by_id(id))
        .await
        .map_err(|e| ApiError::internal(format!("failed to fetch {}", M::NOUN), e))?
        .ok_or_else(|| ApiError::NotFound(format!("{} not found", M::NOUN)))?;

    let record = M::from_document(document)
        .map_err(|e| ApiError::internal(format!("failed to fetch {}", M::NOUN), e))?;
    Ok(Json(record))
}

/// Partial update: only non-empty fields of the body are written.
pub async fn update_record<M: CollectionModel>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<M>, JsonRejection>,
) -> ApiResult<Json<UpdateResponse>> {
    let id = parse_id(&id, M::NOUN)?;
    let update = json_body(payload, PARSE_ERROR)?;

    let fields = update.update_fields();
    if fields.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".to_string()));
    }

    let result = state
        .store
        .update_one(M::COLLECTION, &Filter::by_id(id), fields)
        .await
        .map_err(|e| ApiError::internal(format!("failed to update {}", M::NOUN), e))?;

    if result.matched_count == 0 {
        return Err(ApiError::NotFound(format!("{} not found", M::NOUN)));
    }

    Ok(Json(UpdateResponse {
        message: format!("{} updated successfully", M::NOUN),
        modified_count: result.modified_count,
    }))
}

pub async fn delete_record<M: CollectionModel>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_id(&id, M::NOUN)?;

    let deleted_count = state
        .store
        .delete_one(M::COLLECTION, &Filter::by_id(id))
        .await
        .map_err(|e| ApiError::internal(format!("failed to delete {}", M::NOUN), e))?;

    if deleted_count == 0 {
        return Err(ApiError::NotFound(format!("{} not found", M::NOUN)));
    }

    Ok(Json(DeleteResponse {
        message: format!("{} deleted successfully", M::NOUN),
        deleted_count,
    }))
}
