use scribe_shared::constants::DEFAULT_MCP_PORT;

/// How the automation-protocol server is launched on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McpLaunchSettings {
    /// Start the server once when the client comes up.
    pub auto_start: bool,
    /// Port used for automatic and manual starts.
    pub port: u16,
}

impl Default for McpLaunchSettings {
    fn default() -> Self {
        Self {
            auto_start: false,
            port: DEFAULT_MCP_PORT,
        }
    }
}
