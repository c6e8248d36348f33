//! Request and response value objects plus the `http` crate adapter.

pub mod adapter;
pub mod request;
pub mod response;

pub use request::{HeaderVec, Params, Request, MAX_INLINE_HEADERS};
pub use response::{status_reason, FinishedResponse, Response};
