//! # stratum-client - client for query based REST APIs
//!
//! The Stratum API has no traditional per-resource endpoints. Every resource
//! is addressed through one querying convention: `select`, `where`,
//! `orderby` and `returning` parameters appended to a resource path. The
//! query documentation is served by the API itself at
//! `https://<server>/stratum/docs/`.
//!
//! ## Features
//!
//! - Login with Basic authentication, then bearer (JWT) authorization
//! - Transparent token renewal once the token lifetime has passed
//! - JSON encoding of request bodies and decoding of replies with serde
//! - Structured API errors including backend (PostgreSQL) detail
//!
//! ## Basic Usage
//!
//! ```no_run
//! use serde::Deserialize;
//! use stratum_client::{Client, Config, Payload};
//!
//! #[derive(Deserialize)]
//! struct Platform {
//!     id: i64,
//!     name: String,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect(Config::new(
//!         "myuser",
//!         "mypassword",
//!         "https://server/stratum/v1",
//!     ))?;
//!
//!     let platforms: Vec<Platform> = client
//!         .get("platform/?orderby=name&select=id,name&where=name~linux")?
//!         .apply()?;
//!
//!     for platform in &platforms {
//!         println!("[{}] {}", platform.id, platform.name);
//!     }
//!
//!     let created: Vec<Platform> = client
//!         .post(
//!             "platform/?returning=*",
//!             Some(Payload::from(serde_json::json!({"name": "Linux"}))),
//!         )?
//!         .apply()?;
//!
//!     // The reply body is discarded when it is not applied
//!     client.delete(&format!("platform/?where=id={}", created[0].id), None)?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod payload;
pub mod response;
pub mod rest;
pub mod token;

// Re-export main types for convenience
pub use client::{Config, DEFAULT_TIMEOUT_SECS, LIBRARY_AGENT};
pub use error::{Result, StratumError};
pub use payload::Payload;
pub use response::{BackendError, ErrorResponse, Reply};
pub use rest::{Client, LOGIN_RESOURCE};
pub use token::{Credential, LoginResponse};

// Re-export serde_json for convenience
pub use serde_json::json;
