pub mod ai;
pub mod assets;
pub mod config;
pub mod drafts;
pub mod error;
pub mod events;
pub mod preferences;
pub mod prompts;
pub mod providers;
pub mod session;
pub mod state;
pub mod status;
pub mod sync;
pub mod trends;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::{ClientError, Result, ValidationError};
pub use events::{EventBus, StoreEvent};
pub use providers::{ModelCandidate, Selection, SelectionSlot};
pub use session::{AccountStatus, LoginStep};
pub use state::Store;
pub use status::StatusPoller;
pub use sync::{ConfigKey, ConfigStore, ConfigValue, PendingWrite};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("scribe_client=debug,scribe_gateway=info,scribe_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();

    tracing::info!("{} client core starting", scribe_shared::constants::APP_NAME);
}
