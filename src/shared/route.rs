//! Navigable routes
//!
//! Paths are kept stable so bookmarks and shared links keep working:
//! `/`, `/auth/signup`, `/auth/signin`, `/auth/forgot-password`, `/dashboard`,
//! `/editor/:id` (`new` for an unsaved document) and `/search?q=`.

use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Which document an editor route addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentTarget {
    /// Not yet persisted
    New,
    Existing(Uuid),
}

impl DocumentTarget {
    pub fn id(self) -> Option<Uuid> {
        match self {
            Self::New => None,
            Self::Existing(id) => Some(id),
        }
    }
}

impl From<Option<Uuid>> for DocumentTarget {
    fn from(id: Option<Uuid>) -> Self {
        id.map_or(Self::New, Self::Existing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    SignUp,
    SignIn,
    ForgotPassword,
    Dashboard,
    Editor(DocumentTarget),
    Search { query: String },
}

impl Route {
    pub fn editor(id: Uuid) -> Self {
        Self::Editor(DocumentTarget::Existing(id))
    }

    /// Routes that need a signed-in user
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Dashboard | Self::Editor(_) | Self::Search { .. })
    }

    /// Routes only meaningful for signed-out visitors
    pub fn is_guest_only(&self) -> bool {
        matches!(
            self,
            Self::Landing | Self::SignUp | Self::SignIn | Self::ForgotPassword
        )
    }

    /// Where a visitor to this route should be sent instead, if anywhere
    pub fn redirect_for(&self, signed_in: bool) -> Option<Route> {
        if signed_in && self.is_guest_only() {
            Some(Self::Dashboard)
        } else if !signed_in && self.is_protected() {
            Some(Self::SignIn)
        } else {
            None
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Landing => f.write_str("/"),
            Self::SignUp => f.write_str("/auth/signup"),
            Self::SignIn => f.write_str("/auth/signin"),
            Self::ForgotPassword => f.write_str("/auth/forgot-password"),
            Self::Dashboard => f.write_str("/dashboard"),
            Self::Editor(DocumentTarget::New) => f.write_str("/editor/new"),
            Self::Editor(DocumentTarget::Existing(id)) => write!(f, "/editor/{id}"),
            Self::Search { query } => {
                let encoded: String = form_urlencoded::Serializer::new(String::new())
                    .append_pair("q", query)
                    .finish();
                write!(f, "/search?{encoded}")
            }
        }
    }
}

impl FromStr for Route {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, query) = match s.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (s, None),
        };
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };

        let route = match path {
            "/" | "" => Self::Landing,
            "/auth/signup" => Self::SignUp,
            "/auth/signin" => Self::SignIn,
            "/auth/forgot-password" => Self::ForgotPassword,
            "/dashboard" => Self::Dashboard,
            "/search" => {
                let query = query
                    .map(|q| {
                        form_urlencoded::parse(q.as_bytes())
                            .find(|(key, _)| key == "q")
                            .map(|(_, value)| value.into_owned())
                            .unwrap_or_default()
                    })
                    .unwrap_or_default();
                Self::Search { query }
            }
            other => match other.strip_prefix("/editor/") {
                Some("new") => Self::Editor(DocumentTarget::New),
                Some(id) => {
                    let id = Uuid::parse_str(id).map_err(|_| {
                        SharedError::validation("route", format!("invalid document id {id}"))
                    })?;
                    Self::editor(id)
                }
                None => {
                    return Err(SharedError::validation(
                        "route",
                        format!("unknown path {other}"),
                    ))
                }
            },
        };
        Ok(route)
    }
}
