/**
 * DocCollab Command Line Entry Point
 *
 * Scriptable access to the same components the editor uses: the Session
 * Store, the document repository, the dashboard view model and the editor
 * session with its autosave task.
 */

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use doccollab::client::{
    AccessToken, AuthClient, BackendClient, ClientError, Config, Dashboard, DocumentRepository,
    EditorOpen, EditorSession, EditorSettings, OwnershipFilter, SearchResults, SessionFile,
    SessionStore, SupabaseStore,
};
use doccollab::shared::{extract_plain_text, ContentNode, ContentStats, DocumentTarget, SignUpRequest};

#[derive(Parser)]
#[command(author, version, about = "DocCollab document client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Subcommand)]
enum Command {
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Sign in with email and password
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Signout,
    /// Send a password reset email
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// List owned and shared documents
    List {
        /// all, mine or shared
        #[arg(long, default_value = "all")]
        filter: OwnershipFilter,
        /// Substring filter over title and content
        #[arg(long)]
        search: Option<String>,
    },
    /// Full-text search
    Search { query: String },
    /// Print a document as plain text
    Show { id: Uuid },
    /// Version history of a document
    History { id: Uuid },
    /// Create or overwrite a document from plain text
    Write {
        /// Existing document; a new one is created when omitted
        #[arg(long)]
        id: Option<Uuid>,
        #[arg(long)]
        title: Option<String>,
        /// Body text; read from --file when not given
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Delete { id: Uuid },
    /// Private copy of a document
    Duplicate { id: Uuid },
    /// Toggle a document between private and public
    Visibility { id: Uuid },
}

struct App {
    config: Config,
    store: Arc<SupabaseStore>,
    session: SessionStore,
}

impl App {
    async fn start() -> Result<Self, ClientError> {
        let config = Config::load()?;
        let token = AccessToken::default();
        let backend = BackendClient::new(config.clone(), token.clone());
        let store = Arc::new(SupabaseStore::new(backend.clone()));
        let auth = Arc::new(AuthClient::new(backend));

        let mut session = SessionStore::new(auth, store.clone(), token);
        if let Some(file) = SessionFile::default_location() {
            session = session.with_persistence(file);
        }
        session.init().await;

        Ok(Self {
            config,
            store,
            session,
        })
    }

    fn repo(&self) -> Arc<dyn DocumentRepository> {
        self.store.clone()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "doccollab=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), ClientError> {
    let app = App::start().await?;

    match command {
        Command::Signup {
            email,
            password,
            username,
            full_name,
        } => {
            let request = SignUpRequest {
                email,
                password,
                username,
                full_name,
            };
            match app.session.sign_up(&request).await? {
                Some(user) => println!("Signed up and signed in as {}", user.id),
                None => println!("Check your email to confirm the account"),
            }
        }
        Command::Signin { email, password } => {
            let user = app.session.sign_in(&email, &password).await?;
            println!("Signed in as {}", user.email.as_deref().unwrap_or(&email));
        }
        Command::Signout => {
            app.session.sign_out().await?;
            println!("Signed out");
        }
        Command::ResetPassword { email } => {
            app.session.reset_password(&email).await?;
            println!("Password reset email sent to {email}");
        }
        Command::List { filter, search } => {
            let user = app.session.require_user()?;
            let mut dashboard = Dashboard::new(app.repo(), user.id, app.config.preview_chars());
            dashboard.refresh().await?;
            dashboard.set_filter(filter);
            dashboard.set_search(search.unwrap_or_default());

            for card in dashboard.cards(Utc::now()) {
                println!("{}  {}  [{}]  {}", card.id, card.title, card.visibility, card.updated_label);
                if !card.preview.is_empty() {
                    println!("    {}", card.preview);
                }
            }
        }
        Command::Search { query } => {
            let user = app.session.require_user()?;
            let mut results = SearchResults::new(app.repo(), user.id, app.config.preview_chars());
            results.search(&query).await?;
            for card in results.cards(Utc::now()) {
                println!("{}  {}  by {}", card.id, card.title, card.author_name);
            }
        }
        Command::Show { id } => {
            app.session.require_user()?;
            let document = app.store.get_document(id).await?;
            let text = extract_plain_text(&document.content);
            let stats = ContentStats::of(&text);
            println!("# {}", document.title);
            println!("{} | {} characters | {} words", document.visibility, stats.characters, stats.words);
            println!();
            println!("{text}");
        }
        Command::History { id } => {
            app.session.require_user()?;
            for version in app.store.list_versions(id).await? {
                println!("{}  {}", version.created_at.to_rfc3339(), version.title);
            }
        }
        Command::Write {
            id,
            title,
            body,
            file,
        } => {
            let user = app.session.require_user()?;
            let body = match (body, file) {
                (Some(body), _) => Some(body),
                (None, Some(path)) => Some(std::fs::read_to_string(&path).map_err(|e| {
                    ClientError::store(format!("could not read {}: {e}", path.display()))
                })?),
                (None, None) => None,
            };

            let open = EditorSession::open(
                app.repo(),
                app.store.clone(),
                EditorSettings::from(&app.config),
                user.id,
                DocumentTarget::from(id),
            )
            .await;
            let mut editor = match open {
                EditorOpen::Ready(editor) => editor,
                EditorOpen::Redirect { notice, .. } => return Err(ClientError::permission(notice)),
            };

            if let Some(title) = title {
                editor.set_title(title);
            }
            if let Some(body) = body {
                editor.set_content(ContentNode::from_plain_text(&body));
            }
            editor.flush().await?;
            let snapshot = editor.close().await;
            println!("{}", snapshot.route());
        }
        Command::Delete { id } => {
            app.session.require_user()?;
            app.store.delete_document(id).await?;
            println!("Deleted {id}");
        }
        Command::Duplicate { id } => {
            let user = app.session.require_user()?;
            let mut dashboard = Dashboard::new(app.repo(), user.id, app.config.preview_chars());
            dashboard.refresh().await?;
            let copy = dashboard.duplicate(id).await?;
            println!("{}  {}", copy.id, copy.title);
        }
        Command::Visibility { id } => {
            let user = app.session.require_user()?;
            let open = EditorSession::open(
                app.repo(),
                app.store.clone(),
                EditorSettings::from(&app.config),
                user.id,
                DocumentTarget::Existing(id),
            )
            .await;
            let mut editor = match open {
                EditorOpen::Ready(editor) => editor,
                EditorOpen::Redirect { notice, .. } => return Err(ClientError::permission(notice)),
            };
            let visibility = editor.toggle_visibility().await?;
            editor.close().await;
            println!("Document is now {visibility}");
        }
    }

    Ok(())
}
