//! A tracing formatter that knows about simulation time and entities.
//!
//! Every log line is prefixed with the logical time of the active runtime
//! and, while an entity handler executes, the name of that entity.

use crate::entity::EntityId;
use crate::time::SimTime;
use fxhash::FxHashMap;
use nu_ansi_term::{Color, Style};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc::{self, Receiver, Sender},
    Mutex, PoisonError, RwLock,
};
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    filter::Directive,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

static SCOPE_CURRENT: AtomicUsize = AtomicUsize::new(0);
static SCOPES: Mutex<Option<Sender<(usize, String)>>> = Mutex::new(None);

/// Registers the name of an entity with the installed formatter.
#[doc(hidden)]
pub fn new_scope(entity: EntityId, name: &str) {
    let lock = SCOPES.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(scopes) = &*lock {
        scopes.send((entity.raw(), name.to_string())).ok();
    }
}

/// Marks the entity whose handler is executing.
#[doc(hidden)]
pub fn enter_scope(entity: EntityId) {
    SCOPE_CURRENT.store(entity.raw(), Ordering::SeqCst);
}

/// Indicates that no entity handler is executing.
#[doc(hidden)]
pub fn leave_scope() {
    SCOPE_CURRENT.store(EntityId::NULL.raw(), Ordering::SeqCst);
}

/// The log level that will be used if `RUST_LOG` is not defined.
pub const FALLBACK_LOG_LEVEL: Level = Level::INFO;

/// Installs a global tracing subscriber with a [`SimFormat`] formatter.
///
/// # Errors
///
/// Fails if a global subscriber was already installed.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let subscriber = tracing_subscriber::fmt()
        .event_format(format())
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Directive::from(FALLBACK_LOG_LEVEL))
                .from_env_lossy(),
        );
    subscriber.finish().try_init()
}

/// Installs a global tracing subscriber with a [`SimFormat`] formatter,
/// doing nothing if one is already installed.
pub fn init() {
    if try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// An instance of a simulation formatter.
#[must_use]
pub fn format() -> SimFormat {
    SimFormat::init()
}

/// A formatter that includes simulation specific information into the tracing messages.
#[derive(Debug)]
pub struct SimFormat {
    scopes: RwLock<FxHashMap<usize, String>>,
    rx: Mutex<Receiver<(usize, String)>>,
}

impl SimFormat {
    fn init() -> SimFormat {
        let (tx, rx) = mpsc::channel();
        SCOPES
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(tx);
        SimFormat {
            scopes: RwLock::new(FxHashMap::default()),
            rx: Mutex::new(rx),
        }
    }

    fn fetch_scopes(&self) {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        let mut scopes = self.scopes.write().unwrap_or_else(PoisonError::into_inner);
        while let Ok((id, name)) = rx.try_recv() {
            scopes.insert(id, name);
        }
    }
}

macro_rules! maybe_ansi {
    ($style:ident, $ansi:ident, $writer:ident: $($t:tt)*) => {
        MaybeAnsi(format!($($t)*), $style, $ansi).write(&mut $writer)
    };
}

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        let dimmed = Style::new().dimmed();
        let bold = Style::new().bold();

        maybe_ansi!(dimmed, ansi, writer: "[ {:?} ] ", SimTime::now())?;

        let style = match *meta.level() {
            Level::TRACE => Style::new().fg(Color::Cyan),
            Level::DEBUG => Style::new().fg(Color::Purple),
            Level::INFO => Style::new().fg(Color::Green),
            Level::WARN => Style::new().fg(Color::Yellow),
            Level::ERROR => Style::new().fg(Color::Red),
        };

        self.fetch_scopes();
        let current = SCOPE_CURRENT.load(Ordering::SeqCst);
        let scopes = self.scopes.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(name) = scopes.get(&current) {
            if !ansi {
                write!(writer, "{} ", meta.level().as_str())?;
            }
            maybe_ansi!(style, ansi, writer: "{} ", name)?;
        } else {
            maybe_ansi!(style, ansi, writer: "{} ", meta.level().as_str())?;
        }

        if let Some(scope) = ctx.event_scope() {
            let mut seen = false;
            for span in scope.from_root() {
                maybe_ansi!(bold, ansi, writer: "{}", span.metadata().name())?;
                seen = true;
                let ext = span.extensions();
                if let Some(fields) = &ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        maybe_ansi!(bold, ansi, writer: "{{")?;
                        write!(writer, "{fields}")?;
                        maybe_ansi!(bold, ansi, writer: "}}")?;
                    }
                }
                maybe_ansi!(dimmed, ansi, writer: ":")?;
            }

            if seen {
                writer.write_char(' ')?;
            }
        }

        maybe_ansi!(dimmed, ansi, writer: "{}: ", meta.target())?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

struct MaybeAnsi(String, Style, bool);

impl MaybeAnsi {
    fn write(self, writer: &mut Writer<'_>) -> std::fmt::Result {
        if self.2 {
            write!(writer, "{}", self.1.prefix())?;
            write!(writer, "{}", self.0)?;
            write!(writer, "{}", self.1.suffix())
        } else {
            write!(writer, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn scopes_reach_the_formatter() {
        let format = format();
        new_scope(EntityId(3), "edge-0");
        new_scope(EntityId(4), "edge-1");

        format.fetch_scopes();
        let scopes = format.scopes.read().unwrap();
        assert_eq!(scopes.get(&3).map(String::as_str), Some("edge-0"));
        assert_eq!(scopes.get(&4).map(String::as_str), Some("edge-1"));
    }
}
