//! Federation Partner API Client
//!
//! A Rust client for the east-west federation protocol spoken between
//! operator platforms. Provides typed request/response models, a
//! transport-independent classification of partner responses, the
//! multipart/form-data encoding the protocol requires for uploads, and a
//! process-wide registry that caches one client per partner.
//!
//! # Example
//!
//! ```no_run
//! use partner_client::{PartnerClientRegistry, ResponseClass, classify};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = PartnerClientRegistry::new(false);
//! let client = registry.get_or_create("fed-1", "https://partner.example", "guest-op")?;
//!
//! let response = client.delete_federation("ctx-1").await?;
//! match classify(response.status, response.problem.as_ref(), None) {
//!     ResponseClass::Success => println!("federation removed"),
//!     other => println!("partner answered {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod multipart;
pub mod registry;
pub mod response;
#[path = "trait.rs"]
pub mod partner_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{CALLER_ID_HEADER, PartnerClient};
pub use error::{MultipartError, PartnerError};
pub use models::*;
pub use multipart::{EncodedForm, MultipartForm, form_field_value};
pub use partner_trait::PartnerApi;
pub use registry::PartnerClientRegistry;
pub use response::{PartnerResponse, ResponseClass, TRANSIENT_STATUSES, classify, deletion_confirmed};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockPartnerClient;
