//! Shared Module
//!
//! This module contains the data model shared by every client component: the
//! backend rows, the document content tree, routes and configuration. All types
//! are plain data and serialize to the shapes the backend tables use.

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Rich-text content tree and plain-text extraction
pub mod content;

/// Documents, versions and shares
pub mod document;

/// User profiles and mention candidates
pub mod user;

/// Mention notification rows
pub mod mention;

/// Authentication session types
pub mod session;

/// Navigable routes
pub mod route;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use content::{extract_plain_text, preview, ContentNode, ContentStats};
pub use document::{
    AuthorSummary, Document, DocumentPatch, DocumentShare, DocumentVersion, NewDocument,
    NewShare, NewVersion, Visibility,
};
pub use error::SharedError;
pub use mention::{Mention, NewMention};
pub use route::{DocumentTarget, Route};
pub use session::{AuthUser, Session, SignUpRequest, UserMetadata};
pub use user::{MentionCandidate, ProfileUpsert, UserProfile};
