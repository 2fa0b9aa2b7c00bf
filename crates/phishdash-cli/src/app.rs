use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use phishdash_core::events::{drain, NoticeLevel};
use phishdash_core::models::{UrlInput, UrlRecord};
use phishdash_core::router::Navigation;
use phishdash_core::{
    ApiClient, ApiError, AppEvent, Config, CredentialStore, EventBus, FileStore, Location, Notice,
    Route, RouteGuard, Router, Session,
};

use crate::output;
use crate::{Command, DashboardSubcommand, UrlsSubcommand};

/// Route a command has to be admitted to before it runs
pub fn route_for(command: &Command) -> Option<Route> {
    match command {
        Command::Login { .. } => Some(Route::Login),
        Command::Urls(_) | Command::Export { .. } | Command::Import { .. } => Some(Route::Urls),
        Command::Dashboard(_) => Some(Route::Dashboard),
        Command::Logout { .. } | Command::Whoami => None,
    }
}

/// Turn a login failure into something a user can act on
pub fn login_error_message(e: &ApiError, base_url: &str) -> String {
    match e {
        ApiError::Unauthorized(_) => "Invalid username or password".to_string(),
        ApiError::Network(_) => format!("Unable to connect to server at {}", base_url),
        ApiError::RateLimited => "Too many login attempts. Please wait a minute and try again.".to_string(),
        other => format!("Login failed: {}", other),
    }
}

/// Field changes for `urls update`; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct UrlChanges {
    pub url: Option<String>,
    pub domain: Option<String>,
    pub threat: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
}

impl UrlChanges {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.domain.is_none()
            && self.threat.is_none()
            && self.status.is_none()
            && self.source.is_none()
    }

    /// The full replacement body for `record` with these changes applied
    pub fn apply(self, record: UrlRecord) -> UrlInput {
        let mut input = UrlInput::from(record);
        if let Some(url) = self.url {
            input.url = url;
        }
        if let Some(domain) = self.domain {
            input.domain = domain;
        }
        if let Some(threat) = self.threat {
            input.threat = threat;
        }
        if let Some(status) = self.status {
            input.status = status;
        }
        if let Some(source) = self.source {
            input.source = source;
        }
        input
    }
}

pub struct App {
    config: Config,
    session: Arc<Session>,
    api: ApiClient,
    router: Router,
    notices: broadcast::Receiver<AppEvent>,
    startup_refresh: Option<JoinHandle<()>>,
}

impl App {
    /// Load config and the persisted session, wire the client to the event
    /// bus and the router, and run the startup bootstrap.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let mut config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        if let Some(base_url) = base_url {
            config.base_url = base_url;
        }
        debug!(base_url = %config.base_url, "Config loaded");

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        let store = FileStore::open(&cache_dir).context("Failed to open session storage")?;
        debug!(path = ?store.path(), "Session storage opened");
        let session = Arc::new(Session::new(Arc::new(store)));

        let events = EventBus::new();
        let mut api = ApiClient::from_config(&config, Arc::clone(&session))?;
        api.setup_interceptors(&events);

        let mut router = Router::new(RouteGuard::new(Arc::clone(&session)));
        router.attach(&events);
        let notices = events.subscribe();

        let startup_refresh = api.init_auth_on_startup();
        debug!(state = ?session.state(), "Session bootstrapped");

        Ok(Self {
            config,
            session,
            api,
            router,
            notices,
            startup_refresh,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        if let Some(route) = route_for(&command) {
            let navigation = self.router.navigate(Location::new(route));
            if navigation.was_redirected() && route != Route::Login {
                bail!(
                    "Login required to open {}. Run `phishdash login` first.",
                    navigation.requested
                );
            }
        }

        match command {
            Command::Login {
                username,
                remember,
                force,
            } => self.login(username, remember, force).await,
            Command::Logout { forget } => self.logout(forget),
            Command::Whoami => self.whoami().await,
            Command::Urls(urls) => self.urls(urls.command).await,
            Command::Export { output } => self.export(output.as_deref()).await,
            Command::Import { file } => self.import(&file).await,
            Command::Dashboard(dashboard) => {
                self.dashboard(dashboard.command.unwrap_or(DashboardSubcommand::Summary))
                    .await
            }
        }
    }

    /// Print notices and forced logouts raised while the command ran.
    pub fn report_events(&mut self) {
        for event in drain(&mut self.notices) {
            if let AppEvent::Notice(notice) = event {
                print_notice(&notice);
            }
        }

        let navigations: Vec<Navigation> = self.router.process_events();
        if navigations
            .iter()
            .any(|n| n.resolved.route == Route::Login)
        {
            print_notice(&Notice::session_expired());
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    async fn login(&mut self, username: Option<String>, remember: bool, force: bool) -> Result<()> {
        if self.router.current().route != Route::Login {
            if !force {
                println!(
                    "Already logged in as {}. Use --force to log in again.",
                    self.session.username().unwrap_or_else(|| "(unknown)".to_string())
                );
                return Ok(());
            }
            self.api.logout().context("Could not end the current session")?;
            self.router.navigate(Location::new(Route::Login));
        }

        let username = match username {
            Some(u) => u,
            None => self.prompt_username()?,
        };
        if username.is_empty() {
            bail!("Username required");
        }

        let password = if CredentialStore::has_credentials(&username) {
            print!("Use stored password? [Y/n]: ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if input.trim().to_lowercase() != "n" {
                CredentialStore::get_password(&username)?
            } else {
                Self::prompt_password()?
            }
        } else {
            Self::prompt_password()?
        };
        if password.is_empty() {
            bail!("Password required");
        }

        println!("Authenticating...");

        if let Err(e) = self.api.login(&username, &password).await {
            error!(error = %e, "Login failed");
            return Err(anyhow!(login_error_message(&e, &self.config.base_url)));
        }

        if remember {
            if let Err(e) = CredentialStore::store(&username, &password) {
                warn!(error = %e, "Failed to store credentials");
            }
        }

        self.config.last_username = Some(username.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        let target = self
            .router
            .current()
            .redirect_target()
            .unwrap_or_else(|| Location::new(Route::Dashboard));
        let navigation = self.router.navigate(target);
        info!(to = %navigation.resolved, "Login successful");

        println!("Logged in as {}.", username);
        Ok(())
    }

    fn prompt_username(&self) -> Result<String> {
        match self.config.last_username {
            Some(ref last_user) => print!("Username [{}]: ", last_user),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        Ok(match self.config.last_username {
            Some(ref last_user) if input.is_empty() => last_user.clone(),
            _ => input.to_string(),
        })
    }

    fn prompt_password() -> Result<String> {
        let password = rpassword::prompt_password("Password: ")?;
        Ok(password)
    }

    fn logout(&mut self, forget: bool) -> Result<()> {
        let username = self
            .session
            .username()
            .or_else(|| self.config.last_username.clone());

        self.api.logout().context("Logout failed")?;

        if forget {
            if let Some(username) = username {
                match CredentialStore::delete(&username) {
                    Ok(()) => println!("Forgot stored password for {}.", username),
                    Err(e) => warn!(error = %e, "No stored password removed"),
                }
            }
        }
        println!("Logged out.");
        Ok(())
    }

    async fn whoami(&mut self) -> Result<()> {
        if let Some(handle) = self.startup_refresh.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Startup profile refresh did not complete");
            }
        }

        if !self.session.is_authenticated() {
            println!("Not logged in.");
            return Ok(());
        }

        match self.api.fetch_current_user().await {
            Ok(profile) => output::print_profile(&profile, &self.session.snapshot()),
            Err(e) => {
                warn!(error = %e, "Profile refresh failed");
                output::print_session(&self.session.snapshot());
                eprintln!("Could not refresh profile: {}", e);
            }
        }
        Ok(())
    }

    // =========================================================================
    // URLs
    // =========================================================================

    async fn urls(&mut self, command: UrlsSubcommand) -> Result<()> {
        match command {
            UrlsSubcommand::List => {
                let urls = self.api.list_urls().await?;
                output::print_urls(&urls);
            }
            UrlsSubcommand::Add {
                url,
                domain,
                threat,
                status,
                source,
            } => {
                let domain = match domain.or_else(|| UrlInput::domain_from_url(&url)) {
                    Some(domain) => domain,
                    None => bail!("Could not derive a domain from {}; pass --domain", url),
                };
                let input = UrlInput {
                    url,
                    domain,
                    threat,
                    date_added: Utc::now(),
                    status,
                    source,
                };
                let record = self.api.create_url(&input).await?;
                println!("Created URL #{}.", record.id);
            }
            UrlsSubcommand::Update {
                id,
                url,
                domain,
                threat,
                status,
                source,
            } => {
                let changes = UrlChanges {
                    url,
                    domain,
                    threat,
                    status,
                    source,
                };
                if changes.is_empty() {
                    bail!("Nothing to update; pass at least one field");
                }

                let record = self
                    .api
                    .list_urls()
                    .await?
                    .into_iter()
                    .find(|r| r.id == id)
                    .ok_or_else(|| anyhow!("URL #{} not found", id))?;

                let updated = self.api.update_url(id, &changes.apply(record)).await?;
                println!("Updated URL #{}.", updated.id);
            }
            UrlsSubcommand::Delete { id } => {
                self.api.delete_url(id).await?;
                println!("Deleted URL #{}.", id);
            }
        }
        Ok(())
    }

    async fn export(&mut self, path: Option<&Path>) -> Result<()> {
        let csv = self.api.export_csv().await?;
        match path {
            Some(path) => {
                std::fs::write(path, &csv)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Exported {} bytes to {}.", csv.len(), path.display());
            }
            None => io::stdout().write_all(&csv)?,
        }
        Ok(())
    }

    async fn import(&mut self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid file name: {}", path.display()))?;
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

        let summary = self.api.import_csv(file_name, bytes).await?;
        println!("{}", summary.detail);
        Ok(())
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    async fn dashboard(&mut self, command: DashboardSubcommand) -> Result<()> {
        match command {
            DashboardSubcommand::Metrics => output::print_metrics(&self.api.metrics().await?),
            DashboardSubcommand::Risk => {
                output::print_threat_counts(&self.api.risk_distribution().await?)
            }
            DashboardSubcommand::Status => {
                output::print_status_counts(&self.api.status_distribution().await?)
            }
            DashboardSubcommand::Domains { limit, top } => {
                let domains = if top {
                    self.api.top_risky_domains(limit).await?
                } else {
                    self.api.domain_counts(limit).await?
                };
                output::print_domains(&domains);
            }
            DashboardSubcommand::Activity { monthly } => {
                let activity = if monthly {
                    self.api.monthly_activity().await?
                } else {
                    self.api.daily_activity().await?
                };
                output::print_activity(&activity);
            }
            DashboardSubcommand::Top { limit } => {
                output::print_recent(&self.api.top_risky_urls(limit).await?)
            }
            DashboardSubcommand::Recent { limit } => {
                output::print_recent(&self.api.recent_urls(limit).await?)
            }
            DashboardSubcommand::Events { limit } => {
                output::print_recent(&self.api.recent_events(limit).await?)
            }
            DashboardSubcommand::Search { query } => {
                output::print_search(&self.api.search(&query).await?)
            }
            DashboardSubcommand::Summary => {
                output::print_summary(&self.api.summary().await?);
            }
        }
        Ok(())
    }
}

fn print_notice(notice: &Notice) {
    let prefix = match notice.level {
        NoticeLevel::Info => "",
        NoticeLevel::Warning => "Warning: ",
        NoticeLevel::Error => "Error: ",
    };
    eprintln!("{}{}", prefix, notice.message);
}
