//! Logging macros that prefix every record with the virtual time and the name
//! of the emitting component.
//!
//! ```ignore
//! log_info!(self.ctx, "job {} arrived", job_id);
//! // [12.000 INFO  broker] job 7 arrived
//! ```

#[doc(hidden)]
pub use ::log as __private;

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {
        if $crate::log::__private::log_enabled!($level) {
            $crate::log::__private::log!(
                $level,
                "[{:.3} {:<5} {}] {}",
                $ctx.time(),
                $level,
                $ctx.name(),
                format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::log::__private::Level::Error, $ctx, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::log::__private::Level::Warn, $ctx, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::log::__private::Level::Info, $ctx, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::log::__private::Level::Debug, $ctx, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::log::__private::Level::Trace, $ctx, $($arg)+)
    };
}
