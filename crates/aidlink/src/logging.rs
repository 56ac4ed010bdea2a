use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives that replace the
/// `--log-level` defaults, e.g. `aidlink_transport=trace,warn`.
pub const LOG_ENV: &str = "AIDLINK_LOG";

/// Crates whose events follow `--log-level`. Everything else stays at `warn`
/// or quieter.
const OWN_TARGETS: [&str; 4] = [
    "aidlink",
    "aidlink_transport",
    "aidlink_frame",
    "aidlink_client",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Default directives for `level`: the aidlink crates at `level`, dependencies
/// at `level` or `warn`, whichever is quieter.
pub fn default_directives(level: LogLevel) -> String {
    let fallback = level.min(LogLevel::Warn).as_directive();
    let mut directives = String::from(fallback);
    for target in OWN_TARGETS {
        directives.push(',');
        directives.push_str(target);
        directives.push('=');
        directives.push_str(level.as_directive());
    }
    directives
}

fn build_filter(level: LogLevel, env_directives: Option<&str>) -> EnvFilter {
    env_directives
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives(level)))
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let env_directives = std::env::var(LOG_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level, env_directives.as_deref()))
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
