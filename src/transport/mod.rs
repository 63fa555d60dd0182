//! Delivery of assembled messages.
//!
//! The only transport is SMTP: the connector performs exactly one
//! best-effort send attempt per invocation, over its own connection.

pub mod smtp;
