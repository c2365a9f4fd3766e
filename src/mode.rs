/*
 * Responsibility
 * - Execution mode the composer and guards receive at construction
 * - Test mode: guards pass unconditionally, the composer propagates errors
 *   to the harness instead of rendering them
 */

/// How a composed handler and its guards behave at runtime.
///
/// The mode is injected at construction rather than read from process-wide
/// state at call time, so a harness can build a test-mode handler while the
/// rest of the process stays in normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    #[default]
    Normal,
    Test,
}

impl ExecMode {
    /// Convenience for binaries that still configure the mode from the
    /// environment: `APP_ENV=test` selects test mode, anything else is normal.
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "test" => Self::Test,
            _ => Self::Normal,
        }
    }

    pub fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }
}
