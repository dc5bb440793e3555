//! Request middleware.

pub(crate) mod origin;
pub(crate) mod request_log;
pub(crate) mod security;
