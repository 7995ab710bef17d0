//! Quiet-mode aware logging. When PROVENV_QUIET=1, progress lines are suppressed.
//! Uses `tracing::info!` so output goes through the installed subscriber.

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{
        if !$crate::log::is_quiet() {
            tracing::info!($($arg)*);
        }
    }};
}

pub fn is_quiet() -> bool {
    crate::config::ObservabilityConfig::from_env().quiet
}
