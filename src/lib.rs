pub mod auth;
pub mod config;
pub mod db;
pub mod logs;
pub mod notify;
pub mod photos;
pub mod plans;
pub mod progress;
pub mod session;
pub mod settings;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, LevelFilter};

use auth::{AuthGate, IdentityProvider};
use config::AppConfig;
use db::Database;
use logs::{DailyLogService, WeightLogService};
use notify::Notifier;
use photos::{BlobStore, PhotoService};
use plans::{ExerciseLibrary, PlanEditor, PublishedPlans};
use progress::ProgressService;
use session::SessionLauncher;
use settings::{SettingsStore, UserSettings};

/// Initialise `env_logger`. `RUST_LOG` still overrides the default level.
pub fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Every service, wired to one database, settings store and notifier.
#[derive(Clone)]
pub struct FitApp {
    pub db: Database,
    pub settings: Arc<SettingsStore>,
    pub notifier: Notifier,
    pub plans: PlanEditor,
    pub library: ExerciseLibrary,
    pub published: PublishedPlans,
    pub daily_logs: DailyLogService,
    pub weights: WeightLogService,
    pub progress: ProgressService,
    pub sessions: SessionLauncher,
}

impl FitApp {
    pub fn open(config: &AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data directory {}", config.data_dir.display())
        })?;

        let db = Database::new(config.database_path())?;
        let settings = SettingsStore::new(config.settings_path())?;
        info!("fitplan data in {}", config.data_dir.display());

        Ok(Self::assemble(db, settings, config))
    }

    /// In-memory database and non-persistent settings.
    pub fn in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        let settings = SettingsStore::ephemeral(UserSettings::default());
        Ok(Self::assemble(db, settings, &AppConfig::default()))
    }

    pub fn auth_gate<P: IdentityProvider>(&self, provider: Arc<P>) -> AuthGate<P> {
        AuthGate::new(provider, self.db.clone())
    }

    pub fn photos<B: BlobStore>(&self, blobs: Arc<B>) -> PhotoService<B> {
        PhotoService::new(self.db.clone(), blobs)
    }

    fn assemble(db: Database, settings: SettingsStore, config: &AppConfig) -> Self {
        let settings = Arc::new(settings);
        let notifier = Notifier::new();

        Self {
            plans: PlanEditor::new(db.clone()),
            library: ExerciseLibrary::new(db.clone()),
            published: PublishedPlans::new(db.clone()),
            daily_logs: DailyLogService::new(db.clone()),
            weights: WeightLogService::new(db.clone(), Arc::clone(&settings)),
            progress: ProgressService::new(db.clone()),
            sessions: SessionLauncher::new(
                db.clone(),
                notifier.clone(),
                Arc::clone(&settings),
                config.rest_tick,
            ),
            db,
            settings,
            notifier,
        }
    }
}
