use tracing::Level;

use crate::config::VersioConfig;
use crate::error::VersioResult;

/// Install a `fmt` subscriber at the configured level.
///
/// A subscriber installed earlier, by this function or by the host
/// application, stays in place.
pub fn init_tracing(config: &VersioConfig) -> VersioResult<()> {
    init_tracing_at(config.level()?);
    Ok(())
}

pub fn init_tracing_at(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
