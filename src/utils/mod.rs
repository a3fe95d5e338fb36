pub mod config_loader;
pub mod format;
pub mod logging;

pub use config_loader::{LoadConfigError, load_from_file, load_from_file_sync};
pub use format::{format_currency, format_market_cap};
pub use logging::init_logging;
