// Logger injection tests: a scoped logger is installed exactly once per
// managed instance, and repositories built by the factory carry one.

use restnucleus::logging::{LoggerAware, LoggerInjector, LoggerSlot, ScopedLogger};
use restnucleus::{AppError, GenericRepository, MemoryBackend, RepositoryFactory};
use std::sync::{Arc, Mutex};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Records the name of the span each event was emitted in
#[derive(Clone, Default)]
struct SpanRecorder {
    events: Arc<Mutex<Vec<Option<String>>>>,
}

impl<S> Layer<S> for SpanRecorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let span = ctx.event_span(event).map(|span| span.name().to_string());
        self.events.lock().unwrap().push(span);
    }
}

struct InvoiceMailer {
    logger: LoggerSlot,
    sent: u32,
}

impl InvoiceMailer {
    fn new() -> Self {
        Self {
            logger: LoggerSlot::new(),
            sent: 0,
        }
    }

    fn send(&mut self) {
        self.sent += 1;
        if let Some(logger) = self.logger.get() {
            logger.info(format_args!("sent {} mails", self.sent));
        }
    }
}

impl LoggerAware for InvoiceMailer {
    fn logger_slot(&self) -> &LoggerSlot {
        &self.logger
    }
}

#[test]
fn test_construct_installs_logger_scoped_to_type() {
    let injector = LoggerInjector::<InvoiceMailer>::new();
    let mut mailer = injector.construct(InvoiceMailer::new()).unwrap();

    let logger = mailer.logger_slot().get().unwrap();
    assert!(logger.scope().ends_with("InvoiceMailer"));

    mailer.send();
    assert_eq!(mailer.sent, 1);
}

#[test]
fn test_second_injection_is_fatal() {
    let injector = LoggerInjector::<InvoiceMailer>::new();
    let mailer = injector.construct(InvoiceMailer::new()).unwrap();

    let err = injector.inject(&mailer).unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
    assert!(mailer.logger_slot().is_installed());
}

#[test]
fn test_one_injector_serves_many_instances() {
    let injector = LoggerInjector::<InvoiceMailer>::new();
    let first = injector.construct(InvoiceMailer::new()).unwrap();
    let second = injector.construct(InvoiceMailer::new()).unwrap();

    assert_eq!(
        first.logger_slot().get().unwrap().scope(),
        second.logger_slot().get().unwrap().scope()
    );
}

#[test]
fn test_factory_repositories_carry_logger() {
    let factory = RepositoryFactory::new(MemoryBackend::new());
    let repository = factory.repository().unwrap();

    let logger = repository.logger_slot().get().unwrap();
    assert!(logger.scope().contains("GenericRepository"));

    let plain = GenericRepository::new(MemoryBackend::new());
    assert!(!plain.logger_slot().is_installed());
}

#[test]
fn test_logger_built_before_subscriber_still_reports_in_scope() {
    // built while no subscriber is installed
    let factory = RepositoryFactory::new(MemoryBackend::new());
    let logger: ScopedLogger = *factory.repository().unwrap().logger_slot().get().unwrap();

    let recorder = SpanRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    tracing::subscriber::with_default(subscriber, || {
        logger.info("ready");
        logger.error("boom");
    });

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|span| span.as_deref() == Some("scope")));
}
