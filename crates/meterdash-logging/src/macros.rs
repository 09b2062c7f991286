//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging adapters and sinks."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Context-aware wrappers around `tracing::event!`.

/// Shared expansion for the leveled macros below.
#[doc(hidden)]
#[macro_export]
macro_rules! __md_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            channel = ctx.channel.unwrap_or(""),
            role = ctx.role.unwrap_or(""),
            group = ctx.group.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with dashboard context.
#[macro_export]
macro_rules! md_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__md_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__md_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with dashboard context.
#[macro_export]
macro_rules! md_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__md_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__md_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with dashboard context.
#[macro_export]
macro_rules! md_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__md_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__md_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}
