mod normalize;
mod parser;
pub mod config;
pub mod notifier;
pub mod source;
pub mod state;
pub mod types;
pub mod watcher;

pub use config::{Config, ConfigError, PageSettings, RawConfig, TargetCountries, page_url};
pub use normalize::{country_key, normalize};
pub use notifier::{Notifier, NotifyError, TelegramNotifier};
pub use parser::{extract_rows, parse_availability_rows};
pub use source::{LiveFetcher, PageSource, SourceError};
pub use state::{SlotState, StateError, StateStore};
pub use watcher::{Evaluation, RunError, RunSummary, SlotWatcher, evaluate_rows};
