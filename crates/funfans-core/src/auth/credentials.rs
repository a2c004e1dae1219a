use std::fmt;

/// Environment variable holding the admin username
pub const USERNAME_ENV: &str = "ADMIN_USERNAME";

/// Environment variable holding the admin password
pub const PASSWORD_ENV: &str = "ADMIN_PASSWORD";

/// Username used when none is configured.
pub const FALLBACK_USERNAME: &str = "admin";

/// Password used when none is configured.
///
/// This is a well-known, insecure default. It is kept so a fresh checkout
/// works out of the box; callers should check [`Credentials::is_fallback`]
/// and warn (or refuse to start) as their deployment requires.
pub const FALLBACK_PASSWORD: &str = "password";

/// The admin username/password pair a login attempt is checked against.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The hardcoded development pair
    pub fn fallback() -> Self {
        Self::new(FALLBACK_USERNAME, FALLBACK_PASSWORD)
    }

    /// Read `ADMIN_USERNAME` / `ADMIN_PASSWORD` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from an arbitrary key lookup.
    ///
    /// Each field falls back independently; an empty value counts as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let configured = |key: &str, fallback: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            username: configured(USERNAME_ENV, FALLBACK_USERNAME),
            password: configured(PASSWORD_ENV, FALLBACK_PASSWORD),
        }
    }

    /// True when both fields equal the hardcoded development pair
    pub fn is_fallback(&self) -> bool {
        self.username == FALLBACK_USERNAME && self.password == FALLBACK_PASSWORD
    }

    /// Exact, case-sensitive comparison of both fields.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

// Keep the password out of logs and panic messages
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}
