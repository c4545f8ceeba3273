//! HTTP request handlers.

pub(crate) mod env;
