//! Account deletion by id.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::accounts;
use crate::api::endpoints::MessageResponse;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::authorization::require_caller;

/// `DELETE /users/:id` — the user themself or an admin.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let caller = require_caller(caller)?;
    let target = Uuid::parse_str(&raw_id)
        .map_err(|_| ApiError::NotFound("User not found".into()))?;
    let conn = ctx.core.open_db()?;
    accounts::delete_account(&conn, &caller, &target)?;
    Ok(Json(MessageResponse {
        message: "Account and related data deleted",
    }))
}
