//! Background service status: polling, start/stop, MCP launch settings and
//! the HTTP API key.
//!
//! The backend owns the services; the client only samples them. Each status
//! fetch takes a sequence number and a reply older than the one on display
//! is dropped, so a slow poll cannot overwrite a newer answer.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use scribe_shared::{ServiceKind, ServiceStatus};
use scribe_store::{Database, McpLaunchSettings, StoreError};

use crate::error::{Result, ValidationError};
use crate::events::StoreEvent;
use crate::state::Store;

/// Periodic status refresh for one service. Polling ends on [`stop`] or
/// when the handle is dropped.
///
/// [`stop`]: StatusPoller::stop
pub struct StatusPoller {
    kind: ServiceKind,
    task: JoinHandle<()>,
}

impl StatusPoller {
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Store {
    pub fn service_status(&self, kind: ServiceKind) -> ServiceStatus {
        self.lock().service(kind).status.clone()
    }

    /// Fetch the status of `kind` once. Failures are logged and the last
    /// known status stays.
    pub async fn refresh_status(&self, kind: ServiceKind) {
        let seq = {
            let mut state = self.lock();
            let service = state.service_mut(kind);
            service.issued += 1;
            service.issued
        };

        let status = match self.remote().service_status(kind).await {
            Ok(status) => status,
            Err(e) => {
                warn!(%kind, error = %e, "status poll failed");
                return;
            }
        };

        let changed = {
            let mut state = self.lock();
            let service = state.service_mut(kind);
            if seq <= service.applied {
                debug!(%kind, seq, applied = service.applied, "stale status reply dropped");
                return;
            }
            service.applied = seq;
            let changed = service.status != status;
            service.status = status.clone();
            changed
        };

        if changed {
            self.emit(StoreEvent::ServiceStatusChanged { kind, status });
        }
    }

    /// Fetch now, then every poll interval of `kind`, until the returned
    /// handle is stopped or dropped. Must be called within a tokio runtime.
    pub fn watch_status(&self, kind: ServiceKind) -> StatusPoller {
        let period = self.settings().poll_interval(kind);
        self.watch_status_every(kind, period)
    }

    pub fn watch_status_every(&self, kind: ServiceKind, period: Duration) -> StatusPoller {
        let store = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.refresh_status(kind).await;
            }
        });
        debug!(%kind, ?period, "status polling started");
        StatusPoller { kind, task }
    }

    /// Start a service on `port`, then refresh its status once. The status
    /// may still lag the backend's transition afterwards.
    pub async fn start_service(&self, kind: ServiceKind, port: u16) -> Result<()> {
        match kind {
            ServiceKind::Mcp => self.remote().start_mcp_server(port, None).await?,
            ServiceKind::Api => {
                if self.lock().api_key.is_none() {
                    return Err(ValidationError::MissingApiKey.into());
                }
                self.remote().start_api_server(port).await?;
            }
        }
        info!(%kind, port, "service started");
        self.refresh_status(kind).await;
        Ok(())
    }

    pub async fn stop_service(&self, kind: ServiceKind) -> Result<()> {
        self.remote().stop_service(kind).await?;
        info!(%kind, "service stopped");
        self.refresh_status(kind).await;
        Ok(())
    }

    fn with_local<T>(
        &self,
        f: impl FnOnce(&Database) -> std::result::Result<T, StoreError>,
    ) -> Result<T> {
        let state = self.lock();
        let db = state.local.as_ref().ok_or(ValidationError::NoLocalStore)?;
        Ok(f(db)?)
    }

    pub fn mcp_launch_settings(&self) -> Result<McpLaunchSettings> {
        self.with_local(|db| db.mcp_launch_settings())
    }

    pub fn set_mcp_auto_start(&self, enabled: bool) -> Result<()> {
        self.with_local(|db| db.set_mcp_auto_start(enabled))
    }

    pub fn set_mcp_port(&self, port: u16) -> Result<()> {
        self.with_local(|db| db.set_mcp_port(port))
    }

    /// Start the MCP server if the local settings ask for it and it is not
    /// running. Only the first call in a process does anything. Returns
    /// whether a start was issued.
    pub async fn auto_start_mcp(&self) -> Result<bool> {
        {
            let mut state = self.lock();
            if state.mcp_auto_start_attempted {
                return Ok(false);
            }
            state.mcp_auto_start_attempted = true;
        }

        let settings = match self.mcp_launch_settings() {
            Ok(settings) => settings,
            Err(e) if e.is_validation() => {
                debug!("no local store, MCP auto start skipped");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        if !settings.auto_start {
            return Ok(false);
        }

        self.refresh_status(ServiceKind::Mcp).await;
        if self.service_status(ServiceKind::Mcp).is_running {
            debug!("MCP server already running");
            return Ok(false);
        }

        info!(port = settings.port, "auto starting MCP server");
        self.start_service(ServiceKind::Mcp, settings.port).await?;
        Ok(true)
    }

    pub fn api_key(&self) -> Option<String> {
        self.lock().api_key.clone()
    }

    pub async fn load_api_key(&self) -> Result<Option<String>> {
        let key = self.remote().get_api_key().await?;
        self.lock().api_key = key.clone();
        Ok(key)
    }

    pub async fn save_api_key(&self, key: &str) -> Result<()> {
        self.remote().save_api_key(key).await?;
        self.lock().api_key = Some(key.to_string());
        info!("api key saved");
        Ok(())
    }

    pub async fn generate_api_key(&self) -> Result<String> {
        let key = self.remote().generate_api_key().await?;
        self.lock().api_key = Some(key.clone());
        info!("api key generated");
        Ok(key)
    }
}
