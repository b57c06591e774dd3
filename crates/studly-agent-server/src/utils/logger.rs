use anyhow::Result;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the non-blocking writers flushing; hold it until shutdown.
pub struct LogGuards(#[allow(dead_code)] Vec<WorkerGuard>);

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync + 'static>;

pub fn init_logger() -> Result<LogGuards> {
    // Get log level from environment (default: info)
    let log_level = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,studly_agent_server=debug".to_string());

    // json (default) or pretty
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let log_dir = std::env::var("LOG_DIR").ok();

    let filter = EnvFilter::try_new(&log_level)?;

    let (stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let mut guards = vec![stdout_guard];

    build_subscriber(&log_format, filter, log_dir.as_deref(), stdout, &mut guards)?.try_init()?;

    Ok(LogGuards(guards))
}

fn build_subscriber(
    log_format: &str,
    filter: EnvFilter,
    log_dir: Option<&str>,
    stdout: NonBlocking,
    guards: &mut Vec<WorkerGuard>,
) -> Result<BoxedSubscriber> {
    // Optional daily-rotated JSON file. Layered right after the filter so both
    // stdout arms stack on the same subscriber type.
    let file_layer = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("studly")
                .filename_suffix("log")
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true),
            )
        }
        None => None,
    };

    let base = tracing_subscriber::registry().with(filter).with(file_layer);

    let subscriber: BoxedSubscriber = match log_format {
        "pretty" => Box::new(
            base.with(
                fmt::layer()
                    .pretty()
                    .with_writer(stdout)
                    .with_target(true)
                    .with_thread_ids(false),
            ),
        ),
        _ => Box::new(
            base.with(
                fmt::layer()
                    .json()
                    .with_writer(stdout)
                    .with_target(true)
                    .with_thread_ids(true),
            ),
        ),
    };

    Ok(subscriber)
}
