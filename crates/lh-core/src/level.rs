//! Temporary level overrides.

use std::sync::Arc;

use lh_config::LogLevel;

use crate::handler::Handler;
use crate::Logger;

/// Sets a logger and all of its handlers to one level until dropped.
///
/// Previous levels come back on drop, including when unwinding from a
/// panic. Handlers added while the guard is alive are left as they are.
#[must_use = "the previous levels are restored as soon as the guard is dropped"]
pub struct TemporaryLevel<'a> {
    logger: &'a Logger,
    previous: LogLevel,
    handlers: Vec<(Arc<dyn Handler>, LogLevel)>,
}

impl<'a> TemporaryLevel<'a> {
    pub fn new(logger: &'a Logger, level: LogLevel) -> Self {
        let previous = logger.level();
        let handlers: Vec<_> = logger
            .handlers()
            .into_iter()
            .map(|h| {
                let old = h.level();
                h.set_level(level);
                (h, old)
            })
            .collect();
        logger.set_level(level);
        TemporaryLevel {
            logger,
            previous,
            handlers,
        }
    }
}

impl Drop for TemporaryLevel<'_> {
    fn drop(&mut self) {
        for (handler, old) in &self.handlers {
            handler.set_level(*old);
        }
        self.logger.set_level(self.previous);
    }
}

/// Run `f` with `logger` temporarily at `level`.
pub fn with_level<T>(logger: &Logger, level: LogLevel, f: impl FnOnce() -> T) -> T {
    let _guard = TemporaryLevel::new(logger, level);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ColorFormatter;
    use crate::handler::StreamHandler;

    fn logger() -> Logger {
        Logger::new("app")
            .with_level(LogLevel::Warn)
            .with_handler(StreamHandler::new(Vec::new(), ColorFormatter::default()).with_level(LogLevel::Error))
            .with_handler(StreamHandler::new(Vec::new(), ColorFormatter::default()).with_level(LogLevel::Info))
    }

    fn handler_levels(logger: &Logger) -> Vec<LogLevel> {
        logger.handlers().iter().map(|h| h.level()).collect()
    }

    #[test]
    fn test_sets_and_restores_levels() {
        let logger = logger();
        {
            let _guard = TemporaryLevel::new(&logger, LogLevel::Debug);
            assert_eq!(logger.level(), LogLevel::Debug);
            assert_eq!(handler_levels(&logger), vec![LogLevel::Debug, LogLevel::Debug]);
        }
        assert_eq!(logger.level(), LogLevel::Warn);
        assert_eq!(handler_levels(&logger), vec![LogLevel::Error, LogLevel::Info]);
    }

    #[test]
    fn test_restores_on_panic() {
        let logger = logger();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_level(&logger, LogLevel::Trace, || panic!("boom"))
        }));
        assert!(result.is_err());
        assert_eq!(logger.level(), LogLevel::Warn);
        assert_eq!(handler_levels(&logger), vec![LogLevel::Error, LogLevel::Info]);
    }
}
