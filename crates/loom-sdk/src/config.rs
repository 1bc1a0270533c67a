use loom_bus::BusConfig;
use loom_gc::GcPolicy;
use loom_log::CheckpointPolicy;
use loom_weave::HeadsPolicy;

/// Configuration for a [`Loom`](crate::Loom) and its subsystems.
///
/// The defaults are permissive and suit in-memory use; embedders tune
/// cadences and buffer sizes per deployment.
#[derive(Clone, Debug, Default)]
pub struct LoomConfig {
    /// Checkpoint cadence.
    pub checkpoint: CheckpointPolicy,
    /// Heads-map snapshot cadence for embedded looms.
    pub heads: HeadsPolicy,
    /// Subscription bus defaults.
    pub bus: BusConfig,
    /// What garbage collection keeps alive.
    pub gc: GcPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = LoomConfig::default();
        assert!(config.checkpoint.every > 0);
        assert!(config.heads.snapshot_every > 0);
        assert!(config.bus.buffer_size > 0);
        assert!(!config.gc.follow_linked_to);
    }
}
