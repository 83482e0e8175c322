//! DocCollab - Main Library
//!
//! DocCollab is a collaborative document client for a Supabase-style backend:
//! authentication, document storage with row-level access policies, debounced
//! autosave with version history, @-mentions and full-text search.
//!
//! # Overview
//!
//! This library provides the core functionality for DocCollab, including:
//! - A Session Store with change notifications and on-disk persistence
//! - A document repository client over PostgREST
//! - An Autosave Controller that serializes saves and snapshots versions
//! - A Mention Resolver with an explicit suggestion popup state machine
//! - Dashboard and search result view models
//!
//! # Module Structure
//!
//! The library is organized into two modules:
//!
//! - **`shared`** - Backend-agnostic types
//!   - Document, version, share, mention and profile rows
//!   - The content tree and plain-text extraction
//!   - Routes, configuration and error types
//!
//! - **`client`** - Components that talk to the backend
//!   - REST and auth clients behind async traits
//!   - Session Store, Autosave Controller, Mention Resolver
//!   - Dashboard, search results and editor session
//!
//! # Feature Flags
//!
//! - **`cli`** (default) - builds the `doccollab` binary (`clap`,
//!   `tracing-subscriber`, `dotenv`)
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use doccollab::client::{
//!     AccessToken, AuthClient, BackendClient, Config, EditorOpen, EditorSession,
//!     EditorSettings, SessionStore, SupabaseStore,
//! };
//! use doccollab::shared::DocumentTarget;
//!
//! # async fn example() -> Result<(), doccollab::client::ClientError> {
//! let config = Config::load()?;
//! let token = AccessToken::default();
//! let backend = BackendClient::new(config.clone(), token.clone());
//! let store = Arc::new(SupabaseStore::new(backend.clone()));
//! let session = SessionStore::new(Arc::new(AuthClient::new(backend)), store.clone(), token);
//!
//! let user = session.sign_in("alice@example.com", "secret123").await?;
//! let open = EditorSession::open(
//!     store.clone(),
//!     store,
//!     EditorSettings::from(&config),
//!     user.id,
//!     DocumentTarget::New,
//! )
//! .await;
//! if let EditorOpen::Ready(mut editor) = open {
//!     editor.set_title("Notes");
//!     editor.flush().await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - `SharedError` for validation, serialization and content errors
//! - `ConfigError` for configuration
//! - `ClientError` for everything that reaches the backend

/// Shared types and data structures
pub mod shared;

/// Backend clients and stateful components
pub mod client;
