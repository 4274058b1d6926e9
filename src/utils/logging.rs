use chrono::Utc;
use console::style;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

struct CleanFormatter {
    show_timestamps: bool,
    use_color: bool,
}

impl CleanFormatter {
    fn new(show_timestamps: bool, use_color: bool) -> Self {
        Self {
            show_timestamps,
            use_color,
        }
    }

    fn format_level(&self, level: &Level) -> String {
        if !self.use_color {
            match *level {
                Level::ERROR => "ERROR ".to_string(),
                Level::WARN => "WARN  ".to_string(),
                Level::INFO => "".to_string(),
                Level::DEBUG => "DEBUG ".to_string(),
                Level::TRACE => "TRACE ".to_string(),
            }
        } else {
            match *level {
                Level::ERROR => format!("{} ", style("ERROR").red().bold()),
                Level::WARN => format!("{} ", style("WARN ").yellow()),
                Level::INFO => "".to_string(),
                Level::DEBUG => format!("{} ", style("DEBUG").blue()),
                Level::TRACE => format!("{} ", style("TRACE").magenta()),
            }
        }
    }
}

impl<S, N> FormatEvent<S, N> for CleanFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        if self.show_timestamps {
            let timestamp = Utc::now().format("%H:%M:%S");
            if self.use_color {
                write!(writer, "{} ", style(timestamp).dim())?;
            } else {
                write!(writer, "{} ", timestamp)?;
            }
        }

        write!(writer, "{}", self.format_level(event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

pub fn setup_logging(level: &str, show_timestamps: bool, colored: bool) -> crate::utils::Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let formatter = CleanFormatter::new(show_timestamps, colored);
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(false)
        .event_format(formatter);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
