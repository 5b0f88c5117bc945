/// Command and message handlers
pub mod handlers;
/// Reply delivery to Telegram
pub mod messaging;
/// Dispatcher setup and startup
pub mod runner;

pub use runner::run_bot;
