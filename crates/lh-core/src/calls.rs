//! Entry/exit logging around a call.

use std::fmt::{Debug, Display};

use lh_config::LogLevel;

use crate::{LogError, Logger};

/// Run `f`, logging its entry and its outcome.
///
/// Logs `→ Enter {name}` and then either `← Exit {name} returned={value:?}`
/// at `level`, or `‼ Exception in {name}: {err}` at `Error`. The result of
/// `f` is returned unchanged; a failure to log is converted into `E`.
pub fn log_calls<T, E, F>(logger: &Logger, level: LogLevel, name: &str, f: F) -> Result<T, E>
where
    T: Debug,
    E: Display + From<LogError>,
    F: FnOnce() -> Result<T, E>,
{
    logger.log(level, format!("→ Enter {name}"))?;
    match f() {
        Ok(value) => {
            logger.log(level, format!("← Exit {name} returned={value:?}"))?;
            Ok(value)
        }
        Err(err) => {
            logger.error(format!("‼ Exception in {name}: {err}"))?;
            Err(err)
        }
    }
}
