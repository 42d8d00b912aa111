/// Centralized logging macros for the control core
///
/// These macros provide consistent logging with:
/// - Debug-only compilation for debug/info/warn (stripped from release builds)
/// - Consistent formatting with component context
///
/// Log debug-level message (only in debug builds)
///
/// # Example
/// ```
/// use cycler_engine::link_debug;
/// link_debug!("LinkEngine: sent {}", "target_temp_block=95");
/// ```
#[macro_export]
macro_rules! link_debug {
    ($($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        {
            eprintln!("[DEBUG] {}", format!($($arg)*));
        }
    }};
}

/// Log info-level message (only in debug builds)
///
/// Use for phase changes and delivery milestones
#[macro_export]
macro_rules! link_info {
    ($($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        {
            eprintln!("[INFO] {}", format!($($arg)*));
        }
    }};
}

/// Log warning-level message (only in debug builds)
///
/// Use for recoverable conditions (retries, dropped events)
#[macro_export]
macro_rules! link_warn {
    ($($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        {
            eprintln!("[WARN] {}", format!($($arg)*));
        }
    }};
}

/// Log error-level message (always compiled, even in release)
///
/// Use for delivery failures and link loss
#[macro_export]
macro_rules! link_error {
    ($($arg:tt)*) => {
        {
            eprintln!("[ERROR] {}", format!($($arg)*));
        }
    };
}
