//! Logger injection for managed objects.
//!
//! A managed type exposes a write-once [`LoggerSlot`] through
//! [`LoggerAware`]. The composition root builds one [`LoggerInjector`] per
//! type and installs a logger scoped to that type into each new instance.

use once_cell::sync::OnceCell;
use std::fmt::Display;
use std::marker::PhantomData;
use tracing::Span;

use crate::core::{AppError, Result};

/// Logger bound to the type that owns it.
///
/// Events are emitted inside a span named after the owning type so they can
/// be filtered by scope. The span is entered per event, against whatever
/// subscriber is current then, so a logger built before tracing is
/// initialised still reports.
#[derive(Debug, Clone, Copy)]
pub struct ScopedLogger {
    scope: &'static str,
}

impl ScopedLogger {
    pub fn for_type<T: ?Sized>() -> Self {
        Self {
            scope: std::any::type_name::<T>(),
        }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    fn span(&self) -> Span {
        tracing::info_span!("scope", name = self.scope)
    }

    pub fn debug(&self, message: impl Display) {
        self.span()
            .in_scope(|| tracing::debug!(scope = self.scope, "{}", message));
    }

    pub fn info(&self, message: impl Display) {
        self.span()
            .in_scope(|| tracing::info!(scope = self.scope, "{}", message));
    }

    pub fn warn(&self, message: impl Display) {
        self.span()
            .in_scope(|| tracing::warn!(scope = self.scope, "{}", message));
    }

    pub fn error(&self, message: impl Display) {
        self.span()
            .in_scope(|| tracing::error!(scope = self.scope, "{}", message));
    }
}

/// Designated logger field of a managed object. Accepts one installation.
#[derive(Debug, Default)]
pub struct LoggerSlot {
    cell: OnceCell<ScopedLogger>,
}

impl LoggerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, logger: ScopedLogger) -> Result<()> {
        self.cell.set(logger).map_err(|rejected| {
            AppError::internal(format!(
                "logger for {} is already installed",
                rejected.scope()
            ))
        })
    }

    pub fn get(&self) -> Option<&ScopedLogger> {
        self.cell.get()
    }

    pub fn is_installed(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Implemented by managed types that carry a logger slot
pub trait LoggerAware {
    fn logger_slot(&self) -> &LoggerSlot;
}

/// Installs a logger scoped to `T` into managed instances of `T`
pub struct LoggerInjector<T> {
    logger: ScopedLogger,
    _marker: PhantomData<fn() -> T>,
}

impl<T: LoggerAware> LoggerInjector<T> {
    pub fn new() -> Self {
        Self {
            logger: ScopedLogger::for_type::<T>(),
            _marker: PhantomData,
        }
    }

    pub fn logger(&self) -> &ScopedLogger {
        &self.logger
    }

    /// Install the logger into `target`. A slot that is already filled is
    /// a wiring bug and is reported as an internal error.
    pub fn inject(&self, target: &T) -> Result<()> {
        target.logger_slot().install(self.logger)
    }

    /// Inject into a freshly constructed instance and hand it back
    pub fn construct(&self, target: T) -> Result<T> {
        self.inject(&target)?;
        Ok(target)
    }
}

impl<T: LoggerAware> Default for LoggerInjector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for LoggerInjector<T> {
    fn clone(&self) -> Self {
        Self {
            logger: self.logger,
            _marker: PhantomData,
        }
    }
}
