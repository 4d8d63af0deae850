use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use scribe_shared::constants::{LOCAL_KEY_MCP_AUTO_START, LOCAL_KEY_MCP_PORT};

use crate::database::Database;
use crate::error::Result;
use crate::models::McpLaunchSettings;

impl Database {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM local_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO local_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Read the MCP launch settings. Missing or unparsable values fall back to
    /// the defaults; only the literal `"true"` enables auto start.
    pub fn mcp_launch_settings(&self) -> Result<McpLaunchSettings> {
        let defaults = McpLaunchSettings::default();

        let auto_start = self
            .get_setting(LOCAL_KEY_MCP_AUTO_START)?
            .map(|v| v == "true")
            .unwrap_or(defaults.auto_start);

        let port = match self.get_setting(LOCAL_KEY_MCP_PORT)? {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid stored mcp_port, using default");
                defaults.port
            }),
            None => defaults.port,
        };

        Ok(McpLaunchSettings { auto_start, port })
    }

    pub fn set_mcp_auto_start(&self, enabled: bool) -> Result<()> {
        self.set_setting(LOCAL_KEY_MCP_AUTO_START, &enabled.to_string())
    }

    pub fn set_mcp_port(&self, port: u16) -> Result<()> {
        self.set_setting(LOCAL_KEY_MCP_PORT, &port.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_shared::constants::DEFAULT_MCP_PORT;

    #[test]
    fn setting_upserts() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_setting("k").unwrap(), None);

        db.set_setting("k", "a").unwrap();
        db.set_setting("k", "b").unwrap();
        assert_eq!(db.get_setting("k").unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn mcp_settings_default_when_absent_or_corrupt() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.mcp_launch_settings().unwrap(), McpLaunchSettings::default());

        db.set_setting(LOCAL_KEY_MCP_PORT, "not-a-port").unwrap();
        db.set_setting(LOCAL_KEY_MCP_AUTO_START, "yes").unwrap();
        let settings = db.mcp_launch_settings().unwrap();
        assert_eq!(settings.port, DEFAULT_MCP_PORT);
        assert!(!settings.auto_start);
    }

    #[test]
    fn mcp_settings_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = Database::open_in_dir(dir.path()).unwrap();
            db.set_mcp_auto_start(true).unwrap();
            db.set_mcp_port(9100).unwrap();
        }
        let db = Database::open_in_dir(dir.path()).unwrap();
        assert_eq!(
            db.mcp_launch_settings().unwrap(),
            McpLaunchSettings {
                auto_start: true,
                port: 9100
            }
        );
    }
}
