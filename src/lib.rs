//! ingress-defaulter - mutating admission webhook for Ingress default annotations
//!
//! The webhook intercepts Ingress creation and, when the site policy names
//! the Ingress, adds the policy's default annotations through a JSON patch.
//!
//! # Architecture
//!
//! - A policy table is loaded once at startup and shared read-only
//! - The decision engine is a pure function of the object and the table
//! - The patch synthesizer replaces the annotation map in one operation
//!
//! # Modules
//!
//! - [`policy`] - Policy table and its loader
//! - [`engine`] - Decides whether an object needs mutation
//! - [`patch`] - Builds the JSON patch
//! - [`system_namespaces`] - Namespaces that are never mutated
//! - [`webhook`] - AdmissionReview handlers and router
//! - [`server`] - HTTPS server and shutdown handling
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod engine;
pub mod error;
pub mod patch;
pub mod policy;
pub mod server;
pub mod system_namespaces;
pub mod webhook;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Default HTTPS port for the webhook server
pub const DEFAULT_WEBHOOK_PORT: u16 = 443;

/// Default path of the TLS certificate
pub const DEFAULT_TLS_CERT_FILE: &str = "/etc/webhook/certs/cert.pem";

/// Default path of the TLS private key
pub const DEFAULT_TLS_KEY_FILE: &str = "/etc/webhook/certs/key.pem";

/// Default path of the default-annotation policy document
pub const DEFAULT_ANNOTATION_CFG_FILE: &str = "/etc/config/default-annotations.json";

// =============================================================================
// Admission Constants
// =============================================================================

/// The only resource kind the webhook mutates
pub const INGRESS_KIND: &str = "Ingress";

/// Annotation recording that an object was already mutated
pub const STATUS_ANNOTATION: &str = "admission-webhook-example.citrix.com/status";

/// Value of [`STATUS_ANNOTATION`] that blocks further mutation (case-insensitive)
pub const MUTATED_STATUS: &str = "mutated";
