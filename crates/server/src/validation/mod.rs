//! Request validation: declarative schemas plus the Axum extractor that
//! applies them before a handler runs.

mod extract;
mod schema;

pub use extract::{DeclaredSchema, ValidatedJson};
pub use schema::{ArraySchema, FieldError, NumberSchema, ObjectSchema, Schema, StringSchema};
