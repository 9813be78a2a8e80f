use anyhow::Result;
use pdf_editor_core::{AppConfig, EditSession, FontSource, font_source_for};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Sessions idle for longer than this are dropped by the cleanup task.
pub const SESSION_MAX_IDLE: Duration = Duration::from_secs(3600);

/// One client's editing session plus its bookkeeping.
struct Session {
    edit: Arc<Mutex<EditSession>>,
    last_access: Instant,
}

/// Global application state
pub struct AppState {
    /// Active sessions indexed by UUID
    sessions: RwLock<HashMap<Uuid, Session>>,
    /// Where text overlays fetch their fonts
    pub fonts: Arc<dyn FontSource>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let fonts = font_source_for(&config.fonts)
            .map_err(|e| anyhow::anyhow!("Failed to create font source: {e}"))?;
        Ok(Self::with_fonts(config, fonts))
    }

    pub fn with_fonts(config: AppConfig, fonts: Arc<dyn FontSource>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            fonts,
            config,
        }
    }

    /// Create an empty session and return its ID.
    pub async fn create_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = Session {
            edit: Arc::new(Mutex::new(EditSession::new(self.config.output.clone()))),
            last_access: Instant::now(),
        };

        self.sessions.write().await.insert(id, session);
        id
    }

    /// Get a session by ID string and mark it as used.
    ///
    /// Returns `None` if the ID is not a valid UUID or session doesn't exist.
    /// The map lock is released before returning; callers lock the session itself.
    pub async fn get_session(&self, id: &str) -> Option<Arc<Mutex<EditSession>>> {
        let uuid = Uuid::parse_str(id).ok()?;
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&uuid)?;
        session.last_access = Instant::now();
        Some(Arc::clone(&session.edit))
    }

    /// Drop sessions idle for longer than `max_idle`. Returns how many were removed.
    pub async fn cleanup_old_sessions(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let before = sessions.len();

        sessions.retain(|_, session| now.duration_since(session.last_access) < max_idle);
        before - sessions.len()
    }
}
