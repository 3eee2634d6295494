//! Mapping of core errors onto request/response status codes and bodies.

use serde_json::{json, Value};

use crate::error::AppError;

pub const CREATED: u16 = 201;
pub const OK: u16 = 200;
pub const NO_CONTENT: u16 = 204;

pub fn status_code(error: &AppError) -> u16 {
    match error {
        AppError::Validation(_) | AppError::Decode(_) | AppError::Conflict(_) => 400,
        AppError::PermissionDenied(_) => 403,
        AppError::NotFound(_) => 404,
        _ => 500,
    }
}

pub fn error_body(error: &AppError) -> Value {
    match error {
        AppError::Validation(errors) => json!(errors),
        other => json!({ "errors": other.to_string() }),
    }
}
