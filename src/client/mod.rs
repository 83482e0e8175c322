//! Client Module
//!
//! Everything that talks to the backend or holds per-user state.
//!
//! # Architecture
//!
//! - **`config`** - Layered configuration (defaults, TOML file, environment)
//! - **`error`** - `ClientError` and the mapping of backend error bodies
//! - **`rest`** - PostgREST request plumbing shared by the HTTP clients
//! - **`store`** - Repository and auth traits the components depend on
//! - **`supabase`** - `DocumentRepository` / `UserDirectory` over PostgREST
//! - **`auth`** - `AuthProvider` over GoTrue
//! - **`token_store`** - Session persistence on disk
//! - **`session`** - Session Store with change notifications
//! - **`autosave`** - Debounced, serialized document saves
//! - **`mention`** - Mention roster, popup state machine and persistence
//! - **`dashboard`** - Document list and search result view models
//! - **`editor`** - One open document wired to autosave and mentions
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs         - Module exports and documentation
//! ├── main.rs        - `doccollab` command line binary
//! ├── config.rs      - Configuration loading
//! ├── error.rs       - Client error type
//! ├── rest.rs        - PostgREST query builder and HTTP client
//! ├── store.rs       - Backend traits
//! ├── supabase.rs    - PostgREST repository
//! ├── auth.rs        - GoTrue client
//! ├── token_store.rs - Session file
//! ├── session.rs     - Session Store
//! ├── autosave.rs    - Autosave Controller
//! ├── mention.rs     - Mention Resolver
//! ├── dashboard.rs   - Dashboard and search results
//! └── editor.rs      - Editor session
//! ```

pub mod auth;
pub mod autosave;
pub mod config;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod mention;
pub mod rest;
pub mod session;
pub mod store;
pub mod supabase;
pub mod token_store;

// Re-export commonly used types
pub use auth::AuthClient;
pub use autosave::{AutosaveController, AutosaveSnapshot, SaveStatus, SaveTracker};
pub use config::Config;
pub use dashboard::{Dashboard, DocumentCard, OwnershipFilter, SearchResults};
pub use editor::{EditorOpen, EditorSession, EditorSettings};
pub use error::ClientError;
pub use mention::{
    MentionPopup, MentionResolver, MentionRoster, MentionSelection, PopupEvent, PopupKey,
    PopupOutcome, PopupState,
};
pub use rest::{AccessToken, BackendClient};
pub use session::{SessionState, SessionStore};
pub use store::{AuthProvider, DocumentRepository, UserDirectory};
pub use supabase::SupabaseStore;
pub use token_store::SessionFile;
