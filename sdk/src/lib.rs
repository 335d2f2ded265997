//! # vcd_sdk
//!
//! Client SDK core for the vCloud Director REST API.
//!
//! The core converts between wire JSON and in-memory models for both API dialects:
//! the legacy `/api` surface and the JSON `/cloudapi` surface. It is built from
//! five layers:
//!
//! - [`schema`]: the registry of record schemas and enum mappings
//! - [`codec`]: scalar conversion, the serializer and the deserializer
//! - [`model`]: model values, records and the `Model` derive
//! - [`api`]: the dispatcher that runs one request/response cycle
//! - [`config`] / [`logging`]: client settings and tracing setup
//!
//! ```no_run
//! use vcd_sdk::api::{CallRequest, Dispatcher, Session};
//! use vcd_sdk::config::ClientConfig;
//! use vcd_sdk::model::AdminOrgType;
//!
//! # fn main() -> vcd_sdk::Result<()> {
//! let dispatcher = Dispatcher::from_config(ClientConfig::from_env()?)?
//!     .with_session(Session::Bearer("token".to_string()));
//!
//! let envelope = dispatcher
//!     .call(CallRequest::get("https://vcd.example.com/api/admin/org/1").response_type("AdminOrg"))?
//!     .error_for_status()?;
//! let org: AdminOrgType = envelope.decode()?;
//! let edit = envelope.find_first_link("edit", &[]);
//! # let _ = (org, edit);
//! # Ok(())
//! # }
//! ```

// Derive output names `::vcd_sdk::…`, which must also resolve inside this crate
extern crate self as vcd_sdk;

pub mod api;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod model;
pub mod schema;

pub use api::{CallRequest, Dispatcher, ResponseEnvelope};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use model::{Model, ModelEnum, ModelValue, Record};
pub use schema::SchemaRegistry;
