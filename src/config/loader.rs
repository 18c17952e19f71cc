use crate::config::config::{AppConfig, ReviewConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序：
    /// 1. 开发环境默认值
    /// 2. ./mnemos.toml
    /// 3. 环境变量（前缀 `MNEMOS_`，例如 `MNEMOS_SESSION__PAGE_SIZE`）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("MNEMOS_").split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.session.page_size == 0 {
            return Err(ConfigValidationError::InvalidPageSize);
        }

        Self::validate_review(&config.review)?;

        if config.events.capacity == 0 {
            return Err(ConfigValidationError::InvalidEventCapacity);
        }

        Ok(())
    }

    /// 验证复习间隔：必须为正且困难 <= 一般 <= 简单
    pub fn validate_review(review: &ReviewConfig) -> Result<(), ConfigValidationError> {
        let intervals = [
            review.hard_interval_hours,
            review.medium_interval_hours,
            review.easy_interval_hours,
        ];
        if intervals.iter().any(|hours| *hours <= 0) {
            return Err(ConfigValidationError::NonPositiveInterval);
        }
        if !(intervals[0] <= intervals[1] && intervals[1] <= intervals[2]) {
            return Err(ConfigValidationError::UnorderedIntervals);
        }
        if review.upcoming_window_hours <= 0 {
            return Err(ConfigValidationError::NonPositiveInterval);
        }
        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigValidationError {
    #[error("会话大小无效，必须大于 0")]
    InvalidPageSize,

    #[error("复习间隔必须大于 0")]
    NonPositiveInterval,

    #[error("复习间隔顺序无效，必须满足 困难 <= 一般 <= 简单")]
    UnorderedIntervals,

    #[error("事件通道容量无效，必须大于 0")]
    InvalidEventCapacity,
}

impl From<ConfigValidationError> for crate::error::AppError {
    fn from(e: ConfigValidationError) -> Self {
        crate::error::AppError::Config(e.to_string())
    }
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("mnemos.toml")
}

/// 检查配置文件是否存在
pub fn config_exists() -> bool {
    default_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_development_config_is_valid() {
        let config = AppConfig::development();
        assert!(ConfigLoader::validate(&config).is_ok());
        assert_eq!(config.session.page_size, 10);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = AppConfig::development();
        config.session.page_size = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidPageSize)
        );
    }

    #[test]
    fn test_unordered_intervals_rejected() {
        let mut config = AppConfig::development();
        config.review.hard_interval_hours = 200;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::UnorderedIntervals)
        );
    }

    #[test]
    fn test_load_from_toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\npage_size = 25\n\n[review]\neasy_interval_hours = 240").unwrap();

        let config = ConfigLoader::load_from(file.path()).unwrap();

        assert_eq!(config.session.page_size, 25);
        assert_eq!(config.review.easy_interval_hours, 240);
        // untouched keys keep the development defaults
        assert_eq!(config.review.hard_interval_hours, 24);
        assert_eq!(config.app_name, "mnemos");
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = ConfigLoader::load_from("/nonexistent/mnemos.toml").unwrap();
        assert_eq!(config.session.page_size, 10);
    }
}
