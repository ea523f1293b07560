//! OpsDesk Backend
//!
//! Internal operations tracker: shared inventory with threshold-gated
//! withdrawals, projects with task submissions, and derived salaries.
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - repository: Data access abstractions and implementations
//! - services: Workflows over the repositories
//! - commands: Role-checked handlers returning `Result<T, String>`

use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;

pub mod commands;
pub mod config;
pub mod domain;
pub mod repository;
pub mod services;

pub use config::AppConfig;

use repository::{init_db, ChangeFeed, DbState, KvStore, SqliteKvStore, StoreEvent, UserRepository};
use services::{
    AuthorizedEmails, InventoryService, ProjectService, RosterService, SalaryService,
    SessionService,
};

/// Application state shared across commands
pub struct AppState {
    pub db_state: DbState,
    pub config: AppConfig,
    pub store: Arc<dyn KvStore>,
    pub users: Arc<UserRepository>,
    pub session: SessionService,
    pub inventory: Arc<InventoryService>,
    pub projects: Arc<ProjectService>,
    pub salaries: Arc<SalaryService>,
    pub emails: Arc<AuthorizedEmails>,
    pub roster: RosterService,
}

impl AppState {
    /// Open the database named by `config` and wire up the services
    pub async fn open(config: AppConfig) -> Result<Self, String> {
        let db_state = init_db(&config.db_path()).await?;
        let feed = ChangeFeed::new(config.event_buffer);

        let store: Arc<dyn KvStore> = Arc::new(SqliteKvStore::new(db_state.conn.clone(), feed.clone()));
        let users = Arc::new(UserRepository::new(db_state.conn.clone(), feed));

        let inventory = Arc::new(InventoryService::new(store.clone(), config.history_retention_days));
        let projects = Arc::new(ProjectService::new(store.clone()));
        let salaries = Arc::new(SalaryService::new(store.clone()));
        let emails = Arc::new(AuthorizedEmails::new(store.clone()));
        let roster = RosterService::new(
            users.clone(),
            emails.clone(),
            inventory.clone(),
            projects.clone(),
            salaries.clone(),
        );

        Ok(Self {
            session: SessionService::new(store.clone(), users.clone()),
            db_state,
            config,
            store,
            users,
            inventory,
            projects,
            salaries,
            emails,
            roster,
        })
    }

    /// Changes committed after this call
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }
}

/// Load configuration, start logging and open the database
pub async fn init(config_path: &Path) -> Result<AppState, String> {
    let config = AppConfig::load(config_path)?;

    rolling_logger::init_logger(config.log_dir(), &config.app_name)?;

    match AppState::open(config).await {
        Ok(state) => {
            let _ = rolling_logger::info(&format!("Database ready at {}", state.db_state.path.display()));
            Ok(state)
        }
        Err(e) => {
            let _ = rolling_logger::error(&format!("DB init failed: {}", e));
            Err(e)
        }
    }
}
