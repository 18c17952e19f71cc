//! 可观测性模块
//!
//! 结构化日志初始化：控制台输出（纯文本或 JSON）加可选的按天滚动文件。

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::config::LoggingConfig;

/// 日志文件名前缀
pub const LOG_FILE_PREFIX: &str = "mnemos.log";

/// 构建日志过滤器；`RUST_LOG` 优先于配置中的级别
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// 初始化结构化日志
///
/// 返回文件写入器的 guard，调用方需持有到进程退出。重复初始化只记录警告。
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console = if config.structured {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .boxed()
    };

    let result = tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(console)
        .with(file_layer)
        .try_init();

    if let Err(e) = result {
        tracing::warn!("Logging already initialized: {}", e);
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        let config = LoggingConfig {
            level: "debug".into(),
            structured: true,
            log_dir: None,
        };
        assert!(init_logging(&config).is_none());
        assert!(init_logging(&config).is_none());
    }

    #[test]
    fn test_file_layer_returns_guard() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".into(),
            structured: false,
            log_dir: Some(dir.path().to_path_buf()),
        };
        assert!(init_logging(&config).is_some());
    }
}
