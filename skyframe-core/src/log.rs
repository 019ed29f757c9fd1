//! Injected log sink for display events.
//!
//! The host decides where display messages go. [`TracingLog`] routes
//! them to `tracing`; any `Fn(&str, bool)` closure works as well.

/// Receives `(message, is_error)` pairs from the display adapter.
pub trait DisplayLog: Send + Sync {
    fn log(&self, message: &str, is_error: bool);
}

impl<F> DisplayLog for F
where
    F: Fn(&str, bool) + Send + Sync,
{
    fn log(&self, message: &str, is_error: bool) {
        self(message, is_error)
    }
}

/// Forwards display messages to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl DisplayLog for TracingLog {
    fn log(&self, message: &str, is_error: bool) {
        if is_error {
            tracing::error!(target: "skyframe::display", "{message}");
        } else {
            tracing::info!(target: "skyframe::display", "{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn closures_are_log_sinks() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let lines = lines.clone();
            move |msg: &str, err: bool| lines.lock().unwrap().push((msg.to_string(), err))
        };
        sink.log("hello", false);
        sink.log("oops", true);
        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].1);
    }
}
