//! Runtime configuration for fast-path dispatch.

/// Environment variable that turns specialization off when set to any
/// non-empty value.
pub const NO_FASTPATH_ENV: &str = "ORI_NO_FASTPATH";

/// Settings read once when a runtime is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// When false, every call site delegates straight to generic dispatch
    /// and guards are never bound.
    pub fast_path: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { fast_path: true }
    }
}

impl DispatchConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        let value = std::env::var(NO_FASTPATH_ENV).ok();
        let config = Self::from_env_value(value.as_deref());
        if !config.fast_path {
            tracing::debug!(var = NO_FASTPATH_ENV, "fast-path dispatch disabled");
        }
        config
    }

    fn from_env_value(no_fast_path: Option<&str>) -> Self {
        Self {
            fast_path: !no_fast_path.is_some_and(|value| !value.is_empty()),
        }
    }

    #[must_use]
    pub fn with_fast_path(mut self, enabled: bool) -> Self {
        self.fast_path = enabled;
        self
    }
}
