//! Session configuration.

use crate::core::{DEFAULT_CLOSE_CODE, DEFAULT_ERROR_CLOSE_CODE, DEFAULT_RESET_CODE};

/// What a malformed atom on a control stream does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingPolicy {
    /// Stop only the offending stream; the session keeps running.
    #[default]
    Isolate,
    /// Stop the stream and end the session.
    Fatal,
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Code for rejected bidirectional streams, malformed control streams
    /// and failed outbound streams.
    pub reset_code: u32,

    /// Handling of control-stream framing errors.
    pub framing_policy: FramingPolicy,

    /// Close code when the session ends without error.
    pub close_code: u32,

    /// Close code when the session ends on a fatal error.
    pub error_close_code: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reset_code: DEFAULT_RESET_CODE,
            framing_policy: FramingPolicy::default(),
            close_code: DEFAULT_CLOSE_CODE,
            error_close_code: DEFAULT_ERROR_CLOSE_CODE,
        }
    }
}

impl SessionConfig {
    /// Start building a configuration.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    /// Set the stream reset code.
    pub fn reset_code(mut self, code: u32) -> Self {
        self.config.reset_code = code;
        self
    }

    /// Set the framing error policy.
    pub fn framing_policy(mut self, policy: FramingPolicy) -> Self {
        self.config.framing_policy = policy;
        self
    }

    /// Set the clean close code.
    pub fn close_code(mut self, code: u32) -> Self {
        self.config.close_code = code;
        self
    }

    /// Set the error close code.
    pub fn error_close_code(mut self, code: u32) -> Self {
        self.config.error_close_code = code;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.reset_code, 1);
        assert_eq!(config.framing_policy, FramingPolicy::Isolate);
        assert_eq!(config.close_code, 0);
        assert_eq!(config.error_close_code, 1);
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::builder()
            .reset_code(7)
            .framing_policy(FramingPolicy::Fatal)
            .close_code(2)
            .error_close_code(3)
            .build();

        assert_eq!(config.reset_code, 7);
        assert_eq!(config.framing_policy, FramingPolicy::Fatal);
        assert_eq!(config.close_code, 2);
        assert_eq!(config.error_close_code, 3);
    }
}
