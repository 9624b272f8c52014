//! Value marshalling across the runtime stack
//!
//! - `reader`: stack slot → native `Value`
//! - `classify`: table → sequence or mapping
//! - `writer`: native `Value` → one stack push
//! - `bridge`: native functions as runtime-callable trampolines
//! - `globals`: binding and reading named globals
//!
//! All operations hang off [`MarshalContext`], which carries the settings
//! that shape a conversion (currently the table nesting limit).

mod bridge;
mod classify;
mod globals;
mod reader;
mod writer;

pub use classify::TableShape;
pub use reader::read_text;

use crate::error::MarshalError;
use tabula_config::{BridgeConfig, DEFAULT_MAX_DEPTH};
use tracing::warn;

/// Settings for moving values across the stack
///
/// # Example
///
/// ```
/// use tabula_bridge::memory::MemoryState;
/// use tabula_bridge::{MarshalContext, Value};
///
/// let ctx = MarshalContext::new();
/// let mut state = MemoryState::new();
///
/// ctx.write(&mut state, &Value::sequence(vec![Value::from(1.0), Value::from(2.0)])).unwrap();
/// let value = ctx.read(&mut state, -1).unwrap();
/// assert_eq!(value, Value::sequence(vec![Value::from(1.0), Value::from(2.0)]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarshalContext {
    max_depth: usize,
}

impl MarshalContext {
    /// Create a context with the default nesting limit
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Create a context from loaded configuration
    pub fn with_config(config: &BridgeConfig) -> Self {
        Self::with_max_depth(config.max_depth())
    }

    /// Create a context with an explicit nesting limit (at least 1)
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    /// Deepest table nesting followed when reading or writing
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn check_depth(&self, depth: usize) -> Result<(), MarshalError> {
        if depth >= self.max_depth {
            warn!(limit = self.max_depth, "table nesting limit reached");
            return Err(MarshalError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        Ok(())
    }
}

impl Default for MarshalContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_config() {
        let mut config = BridgeConfig::default();
        assert_eq!(MarshalContext::with_config(&config).max_depth(), DEFAULT_MAX_DEPTH);

        config.set_max_depth(5);
        assert_eq!(MarshalContext::with_config(&config).max_depth(), 5);
    }

    #[test]
    fn test_zero_depth_clamped() {
        assert_eq!(MarshalContext::with_max_depth(0).max_depth(), 1);
    }

    #[test]
    fn test_check_depth() {
        let ctx = MarshalContext::with_max_depth(2);
        assert!(ctx.check_depth(1).is_ok());
        assert_eq!(
            ctx.check_depth(2),
            Err(MarshalError::DepthExceeded { limit: 2 })
        );
    }
}
