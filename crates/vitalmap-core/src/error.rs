//! Error types for the simulator core.

use vitalmap_types::Category;

/// Errors raised while building or running an
/// [`EventStreamSimulator`](crate::simulator::EventStreamSimulator).
///
/// Configuration problems are reported at construction so a bad setup
/// fails before the first tick. After construction the only error a
/// caller can trigger is [`SimulatorError::InvalidCategory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulatorError {
    /// A configuration value is out of range.
    #[error("invalid simulator configuration: {reason}")]
    Configuration {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },

    /// The region table is empty or every weight is zero.
    #[error("region table is empty or has no region with positive weight")]
    EmptyRegionTable,

    /// The requested category is not part of the configured set.
    #[error("category {category} is not configured")]
    InvalidCategory {
        /// The category that was requested.
        category: Category,
    },

    /// The tick counter or the event sequence would overflow.
    #[error("counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

impl SimulatorError {
    /// Shorthand for a [`SimulatorError::Configuration`] error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
