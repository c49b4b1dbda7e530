//! VM configuration.

/// Environment variable that switches execution tracing on.
pub const TRACE_ENV_VAR: &str = "NOTC_TRACE_EXECUTION";

/// Runtime switches for a [`crate::bytecode::VM`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VmConfig {
    /// Print the stack and the next instruction before every dispatch.
    pub trace_execution: bool,
}

impl VmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            trace_execution: std::env::var(TRACE_ENV_VAR)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    pub fn with_trace(mut self, trace_execution: bool) -> Self {
        self.trace_execution = trace_execution;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_tracing_off() {
        assert!(!VmConfig::new().trace_execution);
        assert!(VmConfig::new().with_trace(true).trace_execution);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("off"));
    }
}
