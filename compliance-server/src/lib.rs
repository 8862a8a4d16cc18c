//! HTTP API shell for the `compliance-core` scanning library. Holds no
//! scanning logic of its own: every route deserializes a request, calls
//! into `compliance_core`, and serializes the result.

pub mod config;
pub mod error;
pub mod routes;
