use std::str::FromStr;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    pub include_file_location: bool,
    pub include_thread_names: bool,
    pub include_span_events: bool,
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            include_file_location: false,
            include_thread_names: false,
            include_span_events: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// 根据配置中的日志级别字符串构建；debug 模式强制 DEBUG 级别并带上源码位置
    pub fn from_level(level: &str, debug: bool) -> Self {
        let mut config = Self::default();
        if let Ok(parsed) = Level::from_str(level.trim()) {
            config.level = parsed;
        }
        if debug {
            config.level = Level::DEBUG;
            config.format = LogFormat::Pretty;
            config.include_file_location = true;
        }
        config
    }
}

/// 日志格式
#[derive(Debug, Clone)]
pub enum LogFormat {
    /// 人类可读的格式
    Pretty,
    /// 紧凑格式
    Compact,
}

/// 日志输出目标
#[derive(Debug, Clone)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// 追加写入文件
    File(String),
}

/// 设置日志系统
///
/// 重复初始化不会报错，已存在的全局 subscriber 保持不变。
pub fn setup_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = build_env_filter(&config)?;
    let writer = make_writer(&config.output)?;

    let span_events = if config.include_span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_file(config.include_file_location)
        .with_line_number(config.include_file_location)
        .with_thread_names(config.include_thread_names)
        .with_span_events(span_events);

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Pretty => registry.with(fmt_layer.pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt_layer.compact()).try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Logging already initialised: {}", e);
    }

    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    if let Some(filter) = &config.filter {
        return Ok(EnvFilter::try_new(filter)?);
    }

    let directive = format!("rebase_panel={}", config.level).parse()?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

fn make_writer(output: &LogOutput) -> anyhow::Result<BoxMakeWriter> {
    let writer = match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_level_parses_known_levels() {
        let config = LoggingConfig::from_level("info", false);
        assert_eq!(config.level, Level::INFO);

        let config = LoggingConfig::from_level("TRACE", false);
        assert_eq!(config.level, Level::TRACE);
    }

    #[test]
    fn test_from_level_keeps_default_on_garbage() {
        let config = LoggingConfig::from_level("loud", false);
        assert_eq!(config.level, Level::WARN);
    }

    #[test]
    fn test_debug_overrides_level() {
        let config = LoggingConfig::from_level("error", true);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.include_file_location);
        assert!(matches!(config.format, LogFormat::Pretty));
    }

    #[test]
    fn test_explicit_filter_is_used() {
        let config = LoggingConfig {
            filter: Some("rebase_panel=trace".to_string()),
            ..LoggingConfig::default()
        };
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn test_file_writer_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.log");
        let output = LogOutput::File(path.to_string_lossy().to_string());
        assert!(make_writer(&output).is_ok());
        assert!(path.exists());
    }
}
