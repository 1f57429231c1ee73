use once_cell::sync::Lazy;
use slog::{o, Drain, FilterLevel, IgnoreResult, Logger, Never};
use slog_async::{Async, AsyncGuard};
use slog_envlogger::{EnvLogger, LogBuilder};
use std::sync::Mutex;

static GUARD: Mutex<Option<AsyncGuard>> = Mutex::new(None);

/// Passes Info and above, then applies `directives` (`RUST_LOG` syntax) on top.
fn level_filter<D: Drain>(drain: D, directives: Option<&str>) -> EnvLogger<D> {
    let builder = LogBuilder::new(drain).filter(None, FilterLevel::Info);
    match directives {
        Some(directives) => builder.parse(directives),
        None => builder,
    }
    .build()
}

fn spawn<D>(drain: D) -> IgnoreResult<Async>
where
    D: Drain<Err = Never, Ok = ()> + Send + 'static,
{
    let directives = std::env::var("RUST_LOG").ok();
    let filtered = level_filter(drain, directives.as_deref());
    let (drain, guard) = Async::new(filtered).build_with_guard();
    *GUARD.lock().unwrap_or_else(|e| e.into_inner()) = Some(guard);
    drain.ignore_res()
}

/// Root logger on stderr. `LOG_FORMAT=json` switches from terminal output to
/// JSON lines.
pub static DEFAULT: Lazy<Logger> = Lazy::new(|| {
    let format = std::env::var("LOG_FORMAT").unwrap_or_default();
    let drain = match format.as_str() {
        "json" => spawn(slog_json::Json::default(std::io::stderr()).fuse()),
        _ => {
            let decorator = slog_term::TermDecorator::new().stderr().build();
            spawn(slog_term::FullFormat::new(decorator).build().fuse())
        }
    };

    Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
});

/// Writes out every queued record and stops the logging thread. Records
/// logged afterwards are discarded.
pub fn flush() {
    let guard = GUARD.lock().unwrap_or_else(|e| e.into_inner()).take();
    drop(guard);
}
