/// DegradedInput names the malformed input the simulation replaced by a safe fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum DegradedInput {
    MissingStats,
    InvalidStart,
    InvalidHomeBase { index: usize },
    InvalidTime { t: f64 },
}

impl std::fmt::Display for DegradedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DegradedInput::MissingStats => write!(f, "missing entity stats"),
            DegradedInput::InvalidStart => write!(f, "invalid start position"),
            DegradedInput::InvalidHomeBase { index } => {
                write!(f, "missing or invalid home base {}", index)
            }
            DegradedInput::InvalidTime { t } => write!(f, "invalid query time {}", t),
        }
    }
}

/// SimObserver receives notifications about decisions the simulation core takes silently. The core
/// itself never writes any output, instrumentation is injected through this trait.
pub trait SimObserver: Sync {
    /// Called when an input was replaced by a degenerate fallback.
    fn degraded_input(&self, _entity_id: &str, _reason: &DegradedInput) {}

    /// Called when events following a terminal accident or death were skipped.
    fn ignored_events(&self, _entity_id: &str, _count: usize) {}
}

/// Observer discarding all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

/// Observer forwarding all notifications to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SimObserver for LogObserver {
    fn degraded_input(&self, entity_id: &str, reason: &DegradedInput) {
        log::warn!("Entity {}: {}, using fallback", entity_id, reason);
    }

    fn ignored_events(&self, entity_id: &str, count: usize) {
        log::debug!(
            "Entity {}: ignored {} event(s) after terminal event",
            entity_id,
            count
        );
    }
}
