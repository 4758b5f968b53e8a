use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Render-time context bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub vars: Map<String, Value>,
    #[serde(default)]
    pub request: Option<Request>,
    /// A user placed directly in the context; takes precedence over the
    /// request's user.
    #[serde(default)]
    pub user: Option<User>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.vars.insert(name.to_string(), value.into());
        self
    }

    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// A variable, with `null` treated as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).filter(|v| !v.is_null())
    }

    /// The user to identify: the context's own, else the request's.
    pub fn current_user(&self) -> Option<&User> {
        self.user
            .as_ref()
            .or_else(|| self.request.as_ref().and_then(|r| r.user.as_ref()))
    }
}

/// The slice of an HTTP request needed for resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub remote_addr: Option<String>,
    /// Raw `X-Forwarded-For` header value.
    #[serde(default)]
    pub forwarded_for: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl Request {
    pub fn from_remote_addr(addr: &str) -> Self {
        Self {
            remote_addr: Some(addr.to_string()),
            ..Self::default()
        }
    }

    pub fn from_forwarded_for(header: &str) -> Self {
        Self {
            forwarded_for: Some(header.to_string()),
            ..Self::default()
        }
    }

    /// Client address: first hop of `X-Forwarded-For` when present,
    /// otherwise the socket peer.
    pub fn client_addr(&self) -> Option<&str> {
        self.forwarded_for
            .as_deref()
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .or_else(|| {
                self.remote_addr
                    .as_deref()
                    .map(str::trim)
                    .filter(|ip| !ip.is_empty())
            })
    }
}

fn default_username_field() -> String {
    "username".to_string()
}

/// An authenticated (or anonymous) visitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub is_authenticated: bool,
    /// Name of the field holding the username.
    #[serde(default = "default_username_field")]
    pub username_field: String,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            username_field: default_username_field(),
            fields: HashMap::new(),
        }
    }
}

impl User {
    pub fn authenticated(username: &str) -> Self {
        Self::authenticated_with_field("username", username)
    }

    pub fn authenticated_with_field(field: &str, value: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert(field.to_string(), value.to_string());
        Self {
            is_authenticated: true,
            username_field: field.to_string(),
            fields,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn username(&self) -> Option<&str> {
        self.fields.get(&self.username_field).map(String::as_str)
    }
}
