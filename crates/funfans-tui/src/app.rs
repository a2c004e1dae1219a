//! Application state management for the admin console.
//!
//! This module contains the `App` struct that owns the session guard and all
//! UI state: the login form, overlays, and the periodically refreshed
//! session countdown.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use funfans_core::auth::{Clock, Session, SessionGuard, SessionStatus, SessionStore};
use funfans_core::Config;
use tracing::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// How often the session countdown is recomputed and expiry enforced.
pub const SESSION_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Pause before each credential check, matching the web login form.
pub const LOGIN_DELAY: Duration = Duration::from_millis(500);

/// Shown for any rejected login; never says which field was wrong.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Shown when the periodic check finds the session has run out.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired";

/// The guard as the console uses it: storage and time picked at start-up.
pub type AdminGuard = SessionGuard<Box<dyn SessionStore>, Box<dyn Clock>>;

// ============================================================================
// UI State
// ============================================================================

/// Application state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    LoggingIn,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

pub struct App {
    pub config: Config,
    /// Where `config` is written after a successful login. `None` disables saving.
    config_path: Option<PathBuf>,
    guard: AdminGuard,

    pub state: AppState,

    // Login form
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
    pub login_delay: Duration,

    // Admin panel
    pub session_minutes: i64,
    pub status_message: Option<String>,
    pub store_location: String,
    last_refresh: Instant,
}

impl App {
    /// Create a new application instance around an already configured guard
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        guard: AdminGuard,
        store_location: String,
    ) -> Self {
        let login_username = config.last_username.clone().unwrap_or_default();

        let mut app = Self {
            config,
            config_path,
            guard,

            state: AppState::LoggingIn,

            login_username,
            login_password: String::new(),
            login_focus: LoginFocus::Username,
            login_error: None,
            login_delay: LOGIN_DELAY,

            session_minutes: 0,
            status_message: None,
            store_location,
            last_refresh: Instant::now(),
        };

        if app.guard.is_authenticated() {
            debug!("Existing admin session found");
            app.state = AppState::Normal;
            app.session_minutes = app.guard.session_time_remaining();
        } else {
            app.start_login();
        }

        if app.using_fallback_credentials() {
            warn!("Using default admin credentials; set ADMIN_USERNAME and ADMIN_PASSWORD");
        }

        app
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub fn is_authenticated(&mut self) -> bool {
        self.guard.is_authenticated()
    }

    pub fn using_fallback_credentials(&self) -> bool {
        self.guard.credentials().is_fallback()
    }

    /// Enforce expiry and snapshot the session (used for `--status`)
    pub fn status(&mut self) -> SessionStatus {
        let status = self.guard.status();
        self.session_minutes = status.minutes_remaining;
        status
    }

    /// Stored session record, for display only
    pub fn session(&self) -> Option<Session> {
        self.guard.session()
    }

    /// Re-check the session and update the countdown.
    /// Drops back to the login overlay if the session has expired.
    pub fn refresh_session(&mut self) {
        self.last_refresh = Instant::now();

        if !self.is_authenticated() {
            self.session_minutes = 0;
            if !matches!(self.state, AppState::LoggingIn | AppState::Quitting) {
                info!("Admin session expired");
                self.start_login();
                self.login_error = Some(SESSION_EXPIRED_MESSAGE.to_string());
            }
            return;
        }

        self.session_minutes = self.guard.session_time_remaining();
        debug!(minutes = self.session_minutes, "Session countdown refreshed");
    }

    /// Called from the main loop; refreshes once per interval
    pub fn tick(&mut self) {
        if self.last_refresh.elapsed() >= SESSION_REFRESH_INTERVAL {
            self.refresh_session();
        }
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let username = self.login_username.clone();
        let password = self.login_password.clone();

        if username.is_empty() || password.is_empty() {
            self.login_error = Some("Username and password required".to_string());
            return Err(anyhow::anyhow!("Username and password required"));
        }

        self.login_error = None;

        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }

        if !self.guard.login(&username, &password) {
            error!("Login failed");
            self.login_password.clear();
            self.login_error = Some(INVALID_CREDENTIALS_MESSAGE.to_string());
            return Err(anyhow::anyhow!(INVALID_CREDENTIALS_MESSAGE));
        }

        self.config.last_username = Some(username);
        self.save_config();

        self.login_password.clear();
        self.state = AppState::Normal;
        self.status_message = None;
        self.refresh_session();
        info!("Login successful");
        Ok(())
    }

    /// Interactive login (used for `--login`)
    pub fn login_interactive(&mut self) -> Result<bool> {
        println!("\n=== FunFansPlay Admin Login ===\n");

        let username = match self.config.last_username.clone() {
            Some(last_user) => {
                print!("Username [{}]: ", last_user);
                io::stdout().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;
                let input = input.trim();

                if input.is_empty() {
                    last_user
                } else {
                    input.to_string()
                }
            }
            None => Self::prompt_username()?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        if !self.guard.login(&username, &password) {
            error!("Login failed");
            return Ok(false);
        }

        self.config.last_username = Some(username);
        self.save_config();
        self.session_minutes = self.guard.session_time_remaining();
        self.state = AppState::Normal;
        info!("Login successful");
        Ok(true)
    }

    fn prompt_username() -> Result<String> {
        print!("Username: ");
        io::stdout().flush()?;

        let mut username = String::new();
        io::stdin().read_line(&mut username)?;
        Ok(username.trim().to_string())
    }

    pub fn logout(&mut self) {
        self.guard.logout();
        self.session_minutes = 0;
        self.start_login();
        self.status_message = Some("Logged out".to_string());
        info!("Logged out");
    }

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_password.clear();
        self.login_error = None;
    }

    fn save_config(&self) {
        if let Some(ref path) = self.config_path {
            if let Err(e) = self.config.save_to(path) {
                warn!(error = %e, "Failed to save config");
            }
        }
    }

    // =========================================================================
    // Display helpers
    // =========================================================================

    pub fn session_display(&self) -> String {
        format!("Session: {}m", self.session_minutes)
    }

    pub fn established_display(&self) -> String {
        self.session()
            .map(|s| format_local(s.established_at))
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn expires_display(&self) -> String {
        self.session()
            .map(|s| format_local(s.expires_at()))
            .unwrap_or_else(|| "-".to_string())
    }
}

fn format_local(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%b %d, %Y %H:%M")
        .to_string()
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
