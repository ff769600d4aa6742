//! Repository functions — one function per database operation.
//!
//! Every function takes a `&DbPool` and returns a `Result<T, DbError>`.
//! Pure SQL with no business logic.

pub mod workflows;
pub mod executions;
pub mod connections;
