//! Configuration toggles for the interceptors.

/// Controls which interceptors are active.
///
/// Disabling a toggle turns the corresponding interceptor into a
/// pass-through; failures then reach the caller unchanged.
///
/// # Examples
///
/// ```
/// use oversend::config::AdjustmentConfig;
///
/// let config = AdjustmentConfig::default()
///     .replay_oversized_cycles(false)
///     .log_adjustments(false);
///
/// assert!(config.adjust_unscoped_sends);
/// assert!(!config.replay_oversized_cycles);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdjustmentConfig {
    /// Retry sends issued outside a processing cycle once with an adjusted
    /// payload after a size rejection.
    ///
    /// Default: true.
    pub adjust_unscoped_sends: bool,

    /// Replay a processing cycle once, with adjustment required, when its
    /// handler fails with a size rejection.
    ///
    /// Default: true.
    pub replay_oversized_cycles: bool,

    /// Adjust every send of a flagged cycle before it reaches the transport.
    ///
    /// Default: true.
    pub preemptive_in_cycle: bool,

    /// Emit an `info` event for every adjustment.
    ///
    /// Default: true.
    pub log_adjustments: bool,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            adjust_unscoped_sends: true,
            replay_oversized_cycles: true,
            preemptive_in_cycle: true,
            log_adjustments: true,
        }
    }
}

impl AdjustmentConfig {
    #[must_use]
    pub fn adjust_unscoped_sends(mut self, enabled: bool) -> Self {
        self.adjust_unscoped_sends = enabled;
        self
    }

    #[must_use]
    pub fn replay_oversized_cycles(mut self, enabled: bool) -> Self {
        self.replay_oversized_cycles = enabled;
        self
    }

    #[must_use]
    pub fn preemptive_in_cycle(mut self, enabled: bool) -> Self {
        self.preemptive_in_cycle = enabled;
        self
    }

    #[must_use]
    pub fn log_adjustments(mut self, enabled: bool) -> Self {
        self.log_adjustments = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_is_enabled_by_default() {
        let config = AdjustmentConfig::default();
        assert!(config.adjust_unscoped_sends);
        assert!(config.replay_oversized_cycles);
        assert!(config.preemptive_in_cycle);
        assert!(config.log_adjustments);
    }

    #[test]
    fn builder_methods_set_fields() {
        let config = AdjustmentConfig::default()
            .adjust_unscoped_sends(false)
            .preemptive_in_cycle(false);
        assert!(!config.adjust_unscoped_sends);
        assert!(!config.preemptive_in_cycle);
        assert!(config.replay_oversized_cycles);
    }
}
