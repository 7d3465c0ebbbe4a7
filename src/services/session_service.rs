use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repositories::operator_repository::OperatorRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::session::{LoginInput, Session};
use crate::utils::crypto::verify_password;

/// Checks a cedula/password pair against the operators table.
pub struct AuthService {
    db: DbPool,
}

impl AuthService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Every failure mode returns the same `Unauthorized` so callers cannot
    /// tell an unknown cedula from a wrong password.
    pub fn login(&self, input: &LoginInput) -> AppResult<Session> {
        let cedula = input.cedula.trim();
        if cedula.is_empty() || input.password.is_empty() {
            return Err(AppError::validation("cédula y contraseña son obligatorias"));
        }

        let row = self
            .db
            .with_connection(|conn| OperatorRepository::find_by_cedula(conn, cedula))?
            .ok_or_else(AppError::unauthorized)?;
        if !row.active {
            debug!(target: "app::auth", operator_id = row.id, "login attempt for inactive operator");
            return Err(AppError::unauthorized());
        }

        let verified = verify_password(&input.password, &row.password_hash).unwrap_or_else(|err| {
            warn!(target: "app::auth", operator_id = row.id, error = %err, "stored hash unreadable");
            false
        });
        if !verified {
            return Err(AppError::unauthorized());
        }

        let record = row.into_record()?;
        info!(target: "app::auth", operator_id = record.id, role = record.role.as_str(), "login succeeded");
        Ok(Session {
            id: Uuid::new_v4().to_string(),
            operator_id: record.id,
            cedula: record.cedula,
            full_name: record.full_name,
            role: record.role,
            issued_at: Utc::now().to_rfc3339(),
        })
    }
}

/// JSON file holding the persisted session between runs.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> AppResult<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!(
                    target: "app::session",
                    path = %self.path.display(),
                    error = %err,
                    "discarding unreadable session file"
                );
                Ok(None)
            }
        }
    }

    pub fn write(&self, session: &Session) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn remove(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Current user for this process. Nothing reads the session file directly;
/// callers go through `load`, `save`, `clear` and `current`.
pub struct SessionContext {
    store: SessionStore,
    current: RwLock<Option<Session>>,
}

impl SessionContext {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    pub fn load(&self) -> AppResult<Option<Session>> {
        let session = self.store.read()?;
        *self.write_guard()? = session.clone();
        Ok(session)
    }

    pub fn save(&self, session: Session) -> AppResult<()> {
        self.store.write(&session)?;
        debug!(target: "app::session", operator_id = session.operator_id, "session saved");
        *self.write_guard()? = Some(session);
        Ok(())
    }

    pub fn clear(&self) -> AppResult<()> {
        self.store.remove()?;
        *self.write_guard()? = None;
        debug!(target: "app::session", "session cleared");
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    pub fn require(&self) -> AppResult<Session> {
        self.current().ok_or_else(AppError::unauthorized)
    }

    fn write_guard(&self) -> AppResult<std::sync::RwLockWriteGuard<'_, Option<Session>>> {
        self.current
            .write()
            .map_err(|_| AppError::other("session lock poisoned"))
    }
}
