//! HTTP route handlers that sit outside the authentication module.
//!
//! Account routes live in [`crate::auth::routes`]; this module holds the
//! operational endpoints mounted alongside them.

pub mod health;
