//! Application wiring for the shopdesk CLI.
//!
//! `App` owns the core services (API client, session store, list cache)
//! and implements each command on top of them. It plays the part of the
//! dashboard UI: it waits for session restore before doing anything,
//! reports activity to the inactivity monitor and returns to the sign-in
//! prompt when the session ends.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use shopdesk_core::{
    ActivityKind, ApiClient, Config, FileStore, InactivityMonitor, ListCache, ListLoad, ListSource,
    LogoutReason, RequestCounter, Resource, SessionState, SessionStore,
};

// ============================================================================
// Constants
// ============================================================================

/// Maximum concurrent list fetches during a full refresh.
const MAX_CONCURRENT_REQUESTS: usize = 4;

const EMAIL_ENV: &str = "SHOPDESK_EMAIL";
const PASSWORD_ENV: &str = "SHOPDESK_PASSWORD";

pub struct App {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub cache: ListCache,
    pub progress: Arc<RequestCounter>,
}

impl App {
    /// Create the services and resolve the persisted session.
    pub async fn new(config: Config, storage_dir: PathBuf) -> Result<Self> {
        debug!(?storage_dir, api = %config.api_base_url, "App::new() starting");

        let storage = Arc::new(
            FileStore::new(storage_dir).context("Failed to open storage directory")?,
        );
        let progress = Arc::new(RequestCounter::new());
        let api = ApiClient::new(&config.api_base_url, progress.clone())?;

        let session = Arc::new(
            SessionStore::new(api, storage.clone()).with_lifetime(config.session_lifetime()),
        );
        session.restore();
        session.wait_until_ready().await;

        Ok(Self {
            config,
            session,
            cache: ListCache::new(storage),
            progress,
        })
    }

    fn api(&self) -> &ApiClient {
        self.session.api()
    }

    fn require_session(&self) -> Result<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Not signed in. Run `shopdesk login` first."))
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| std::env::var(EMAIL_ENV).ok()) {
            Some(email) => email,
            None => Self::prompt_email(self.config.last_email.as_deref())?,
        };
        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) => password,
            Err(_) => rpassword::prompt_password("Password: ")?,
        };

        if email.is_empty() || password.is_empty() {
            return Err(anyhow::anyhow!("Email and password required"));
        }

        match self.session.login(&email, &password).await {
            Ok(user) => {
                println!("Signed in as {}", user.display_name());
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                Err(anyhow::anyhow!("Login failed: {}", e.user_message()))
            }
        }
    }

    fn prompt_email(last: Option<&str>) -> Result<String> {
        match last {
            Some(last) => print!("Email [{}]: ", last),
            None => print!("Email: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        Ok(match (input.is_empty(), last) {
            (true, Some(last)) => last.to_string(),
            _ => input.to_string(),
        })
    }

    pub async fn verify(&self, email: &str, code: &str) -> Result<()> {
        match self.session.verify(email, code).await {
            Ok(Some(user)) => println!("Verified. Signed in as {}", user.display_name()),
            Ok(None) => println!("Verified. Run `shopdesk login` to sign in."),
            Err(e) => return Err(anyhow::anyhow!("Verification failed: {}", e.user_message())),
        }
        Ok(())
    }

    pub fn logout(&self) {
        self.session.logout();
        println!("Signed out");
    }

    pub fn whoami(&self) {
        match self.session.state() {
            SessionState::Authenticated(session) => {
                let user = &session.user;
                println!("{}", user.display_name());
                if let Some(ref email) = user.email {
                    println!("  email:   {}", email);
                }
                println!(
                    "  role:    {}{}",
                    user.role.as_deref().unwrap_or("-"),
                    if self.session.is_admin() { " (admin)" } else { "" }
                );
                if let Some(minutes) = session.minutes_until_expiry() {
                    println!("  expires: in {} min", minutes);
                }
            }
            SessionState::Anonymous { reason } => {
                println!("Not signed in{}", reason.map(reason_suffix).unwrap_or_default());
            }
            SessionState::Loading => println!("Session still loading"),
        }
    }

    // =========================================================================
    // Lists
    // =========================================================================

    pub async fn list(&self, resource: Resource) -> Result<()> {
        self.require_session()?;

        let load: ListLoad<Value> = self.cache.fetch_list(self.api(), resource).await;
        match &load.source {
            ListSource::Live => {}
            ListSource::Cached { cached_at, .. } => {
                eprintln!(
                    "Offline: showing {} cached at {}",
                    resource,
                    cached_at.format("%Y-%m-%d %H:%M")
                );
            }
            ListSource::Empty { error } => {
                eprintln!("Could not load {}: {}", resource, error.user_message());
            }
        }

        println!("{}", serde_json::to_string_pretty(&load.items)?);
        Ok(())
    }

    /// Fetch every list resource, filling the fallback cache.
    pub async fn refresh_all(&self) -> Result<()> {
        self.require_session()?;
        info!("Starting refresh of all lists");

        let api = self.api();
        let cache = &self.cache;
        let results: Vec<(Resource, ListLoad<Value>)> = stream::iter(Resource::ALL)
            .map(|resource| async move { (resource, cache.fetch_list(api, resource).await) })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .collect()
            .await;

        for (resource, load) in results {
            let status = match &load.source {
                ListSource::Live => "live".to_string(),
                ListSource::Cached { error, .. } => format!("cached ({})", error.user_message()),
                ListSource::Empty { error } => format!("empty ({})", error.user_message()),
            };
            println!("{:<12} {:>5} items  {}", resource.name(), load.items.len(), status);
        }
        debug!(in_flight = self.progress.in_flight(), "Refresh finished");
        Ok(())
    }

    pub fn cache_status(&self) {
        for (resource, age) in self.cache.cache_ages() {
            println!("{:<12} {}", resource.name(), age.unwrap_or_else(|| "never".to_string()));
        }
    }

    // =========================================================================
    // Watch
    // =========================================================================

    /// Keep the session open while lines arrive on stdin. Each line counts as
    /// activity; a line naming an activity kind (e.g. `scroll`) reports that
    /// kind, anything else is a key press. Returns when the session ends.
    pub async fn watch(&self) -> Result<()> {
        self.require_session()?;

        let monitor = InactivityMonitor::start(self.session.clone(), self.config.monitor_settings());
        let mut state = self.session.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!(
            "Watching session (idle limit {} min). Type to stay signed in, `logout` to sign out.",
            self.config.idle_limit_secs / 60
        );

        loop {
            tokio::select! {
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = state.borrow_and_update().clone();
                    if let SessionState::Anonymous { reason } = current {
                        println!("Session ended{}", reason.map(reason_suffix).unwrap_or_default());
                        break;
                    }
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) if line.trim() == "logout" => self.session.logout(),
                        Some(line) => {
                            let kind = line.parse().unwrap_or(ActivityKind::KeyPress);
                            if !monitor.record_activity(kind) {
                                debug!(%kind, "Ignoring untracked activity");
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        monitor.shutdown();
        Ok(())
    }
}

fn reason_suffix(reason: LogoutReason) -> String {
    match reason {
        LogoutReason::Manual => String::new(),
        LogoutReason::Idle => " (inactive too long)".to_string(),
        LogoutReason::Expired => " (session expired)".to_string(),
        LogoutReason::Invalid => " (saved session was unreadable)".to_string(),
    }
}
