//! Match manager: loads matches, indexes them by ID and reports
//! occupancy.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use fdtable_protocol::{MatchId, MatchOccupancy, OccupancyReport};
use tokio::task::JoinHandle;

use crate::{ConfigError, MATCH_TYPE, Match, MatchConfig, ReportError, Services};

/// Receives the periodic occupancy snapshot (the ranking/listing
/// service in production).
#[async_trait]
pub trait OccupancyReporter: Send + Sync + 'static {
    async fn report(&self, report: OccupancyReport) -> Result<(), ReportError>;
}

/// Every match served by this node.
///
/// Read-mostly: matches are added at startup and, for dynamic room-card
/// matches, at runtime. They are never removed.
pub struct MatchManager {
    matches: RwLock<HashMap<MatchId, Arc<Match>>>,
    services: Services,
}

impl MatchManager {
    /// Creates an empty manager.
    pub fn new(services: Services) -> Self {
        Self {
            matches: RwLock::new(HashMap::new()),
            services,
        }
    }

    /// Builds one match per config. An invalid config or a repeated
    /// `match_id` is logged and skipped.
    pub fn from_configs(
        configs: impl IntoIterator<Item = MatchConfig>,
        services: Services,
    ) -> Self {
        let manager = Self::new(services);
        for config in configs {
            let match_id = config.match_id;
            if let Err(e) = manager.insert(config) {
                tracing::error!(%match_id, error = %e, "match skipped");
            }
        }
        manager
    }

    /// Loads every `*.json` file in `dir`, in file-name order.
    ///
    /// A file that cannot be read, parsed or validated is logged and
    /// skipped; only an unreadable directory fails the load.
    pub fn load_dir(
        dir: &Path,
        services: Services,
    ) -> Result<Self, ConfigError> {
        let read_err = |source| ConfigError::Read {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(read_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file() && p.extension().is_some_and(|ext| ext == "json")
            })
            .collect();
        paths.sort();

        let mut configs = Vec::with_capacity(paths.len());
        for path in &paths {
            match MatchConfig::from_file(path) {
                Ok(config) => configs.push(config),
                Err(e) => tracing::error!(error = %e, "match config skipped"),
            }
        }

        let manager = Self::from_configs(configs, services);
        tracing::info!(
            dir = %dir.display(),
            matches = manager.len(),
            "match configs loaded"
        );
        Ok(manager)
    }

    /// Adds a match at runtime.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] if the config is unusable or the ID is
    /// already taken.
    pub fn insert(&self, config: MatchConfig) -> Result<Arc<Match>, ConfigError> {
        self.insert_match(Match::new(config, self.services.clone())?)
    }

    /// Adds an already-built match, such as one with its own
    /// [`RoomLifecycle`](crate::RoomLifecycle).
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] if the match ID is already taken.
    pub fn insert_match(&self, m: Match) -> Result<Arc<Match>, ConfigError> {
        let match_id = m.id();
        let mut matches =
            self.matches.write().unwrap_or_else(PoisonError::into_inner);
        if matches.contains_key(&match_id) {
            return Err(ConfigError::Invalid(format!(
                "duplicate match id {match_id}"
            )));
        }
        let m = Arc::new(m);
        matches.insert(match_id, Arc::clone(&m));
        tracing::info!(%match_id, game_type = %m.config().game_type, "match registered");
        Ok(m)
    }

    pub fn get(&self, match_id: MatchId) -> Option<Arc<Match>> {
        self.matches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&match_id)
            .cloned()
    }

    /// IDs of every match, sorted.
    pub fn match_ids(&self) -> Vec<MatchId> {
        let mut ids: Vec<MatchId> = self
            .matches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.matches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    fn all(&self) -> Vec<Arc<Match>> {
        self.matches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Snapshots the occupancy of every match, ordered by match ID.
    pub fn occupancy(&self) -> OccupancyReport {
        let mut entries: Vec<MatchOccupancy> = self
            .all()
            .iter()
            .map(|m| {
                let config = m.config();
                MatchOccupancy {
                    match_id: config.match_id,
                    name: config.name.clone(),
                    game_type: config.game_type.clone(),
                    match_type: MATCH_TYPE.to_string(),
                    server_id: m.server_id().to_string(),
                    sign_condition: config.sign_condition.clone(),
                    online: m.get_player_count(),
                }
            })
            .collect();
        entries.sort_by_key(|e| e.match_id);
        OccupancyReport { entries }
    }

    /// Sends one occupancy snapshot.
    pub async fn report_once(
        &self,
        reporter: &dyn OccupancyReporter,
    ) -> Result<(), ReportError> {
        reporter.report(self.occupancy()).await
    }

    /// Starts the background reporting loop. The first report goes out
    /// immediately. Abort the returned handle to stop it.
    pub fn spawn_reporter(
        self: &Arc<Self>,
        every: Duration,
        reporter: Arc<dyn OccupancyReporter>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(
                tokio::time::MissedTickBehavior::Delay,
            );
            loop {
                ticker.tick().await;
                if let Err(e) = manager.report_once(reporter.as_ref()).await {
                    tracing::warn!(error = %e, "occupancy report failed");
                }
            }
        })
    }

    /// Stops every table actor in every match.
    pub async fn shutdown(&self) {
        for m in self.all() {
            m.shutdown().await;
        }
        tracing::info!("match manager shut down");
    }
}
