//! Panic reporting
//!
//! `install_panic_handler()` logs the location and message of a panic through
//! tracing before the default hook runs. Listener and task panics are caught
//! elsewhere with `catch_unwind`; this hook only sees the ones that escape.
//!
//! ```no_run
//! use feedwatch_core::utils::install_panic_handler;
//!
//! fn main() {
//!     install_panic_handler();
//!     // ... rest of application
//! }
//! ```

use std::any::Any;
use std::panic;
use tracing::error;

/// Extract the message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<no message>".to_string()
    }
}

/// Install a global panic hook that logs through tracing
///
/// Unlike a crash handler this does not exit the process: a panic on a
/// delivery thread must not take the health check down with it.
pub fn install_panic_handler() {
    // Store the default panic hook for delegation
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "<unknown location>".to_string());

        let message = panic_message(panic_info.payload());
        let thread = std::thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_string();

        error!(
            location = %location,
            message = %message,
            thread = %thread,
            "PANIC"
        );

        // Prints full backtrace if RUST_BACKTRACE=1
        default_hook(panic_info);
    }));

    tracing::info!("Panic handler installed");
}
