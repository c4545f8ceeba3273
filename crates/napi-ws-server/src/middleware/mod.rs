//! HTTP middleware.

pub(crate) mod inject;
