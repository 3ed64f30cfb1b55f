//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Logging of schema and data processing messages.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::error::Error;

static LOG_CALLBACK: OnceLock<Box<dyn LogCallback>> = OnceLock::new();
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warning as u8);

/// Verbosity of the messages emitted by yangtree.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Verbose = 2,
    Debug = 3,
}

/// A custom logger to pass to yangtree.
pub trait LogCallback: Send + Sync + 'static {
    fn log<'a>(
        &'a self,
        level: LogLevel,
        msg: Option<Cow<'a, str>>,
        data_path: Option<Cow<'a, str>>,
        schema_path: Option<Cow<'a, str>>,
        line: u64,
    );
}

/// Set the log level to [`LogLevel::Debug`]
pub fn set_log_level_trace() {
    LOG_LEVEL.store(LogLevel::Debug as u8, Ordering::Relaxed);
}

/// Set the log level to [`LogLevel::Verbose`]
pub fn set_log_level_debug() {
    LOG_LEVEL.store(LogLevel::Verbose as u8, Ordering::Relaxed);
}

/// Set the log level to [`LogLevel::Warning`]
pub fn set_log_level_warn() {
    LOG_LEVEL.store(LogLevel::Warning as u8, Ordering::Relaxed);
}

/// Set the log level to [`LogLevel::Error`]
pub fn set_log_level_error() {
    LOG_LEVEL.store(LogLevel::Error as u8, Ordering::Relaxed);
}

/// An error returned when the logging callback has already been initialized.
#[derive(Debug)]
pub struct LoggingCallbackAlreadySet {
    _private: (),
}

impl std::fmt::Display for LoggingCallbackAlreadySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Logging callback already set")
    }
}

impl std::error::Error for LoggingCallbackAlreadySet {}

/// Initialize the logging callback.
///
/// The callback can only be initialized once.
pub fn init_logger<C>(callback: C) -> Result<(), LoggingCallbackAlreadySet>
where
    C: LogCallback,
{
    LOG_CALLBACK
        .set(Box::new(callback))
        .map_err(|_| LoggingCallbackAlreadySet { _private: () })
}

/// Dispatch a message to the registered callback, or to the default logger
/// when none was registered.
pub(crate) fn emit(
    level: LogLevel,
    msg: &str,
    data_path: Option<&str>,
    schema_path: Option<&str>,
    line: u64,
) {
    if level as u8 > LOG_LEVEL.load(Ordering::Relaxed) {
        return;
    }

    let msg = Some(Cow::Borrowed(msg));
    let data_path = data_path.map(Cow::Borrowed);
    let schema_path = schema_path.map(Cow::Borrowed);
    match LOG_CALLBACK.get() {
        Some(cb) => cb.log(level, msg, data_path, schema_path, line),
        None => DefaultLogger::default()
            .log(level, msg, data_path, schema_path, line),
    }
}

/// Report an error that is about to be returned to the caller.
pub(crate) fn log_error(error: &Error) {
    let msg = error.msg.as_deref().unwrap_or("");
    emit(
        LogLevel::Error,
        msg,
        error.path.as_deref(),
        None,
        error.line.unwrap_or(0),
    );
}

pub(crate) fn warn(msg: &str, data_path: Option<&str>) {
    emit(LogLevel::Warning, msg, data_path, None, 0);
}

pub(crate) fn verbose(msg: &str) {
    emit(LogLevel::Verbose, msg, None, None, 0);
}

pub(crate) fn debug(msg: &str, schema_path: Option<&str>) {
    emit(LogLevel::Debug, msg, None, schema_path, 0);
}

/// A logger that to log yangtree messages using the `log` crate.
#[derive(Debug, Default)]
pub struct DefaultLogger {
    _private: (),
}

impl LogCallback for DefaultLogger {
    fn log<'a>(
        &'a self,
        level: LogLevel,
        msg: Option<Cow<'a, str>>,
        data_path: Option<Cow<'a, str>>,
        schema_path: Option<Cow<'a, str>>,
        line: u64,
    ) {
        let level = match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Verbose => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        };
        let msg = msg.unwrap_or_else(|| Cow::from(""));
        log::log! {
            target: "yangtree",
            level,
            "schema_path={schema_path:?}, data_path={data_path:?}, line={line}, msg={msg}",
        }
    }
}
