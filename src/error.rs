//! 统一错误处理
//!
//! 提供结构化错误类型。节点处理过程中的错误不会向外传播，
//! 这里的类型主要用于配置、设置存储和文档输入输出的边界。

use std::fmt;

use thiserror::Error;

/// 错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkTimeError {
    /// 配置错误（包括时薪未设置）
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 数字解析失败
    #[error("无法解析金额: {0}")]
    ParseFailure(String),

    /// 收入数值无效
    #[error("收入无效: {0}")]
    InvalidIncome(String),

    /// 设置存储错误
    #[error("设置存储错误: {0}")]
    StorageError(String),

    /// 变更观察器错误
    #[error("观察器错误: {0}")]
    ObserverError(String),

    /// 输入输出错误
    #[error("IO错误: {0}")]
    IoError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),
}

impl WorkTimeError {
    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WorkTimeError::ConfigError(_) => ErrorSeverity::Critical,
            WorkTimeError::ParseFailure(_) => ErrorSeverity::Info,
            WorkTimeError::InvalidIncome(_) => ErrorSeverity::Warning,
            WorkTimeError::StorageError(_) => ErrorSeverity::Error,
            WorkTimeError::ObserverError(_) => ErrorSeverity::Warning,
            WorkTimeError::IoError(_) => ErrorSeverity::Error,
            WorkTimeError::SerializationError(_) => ErrorSeverity::Error,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkTimeError::ConfigError(_) | WorkTimeError::InvalidIncome(_) => {
                ErrorCategory::Configuration
            }
            WorkTimeError::ParseFailure(_) => ErrorCategory::Parsing,
            WorkTimeError::StorageError(_) => ErrorCategory::Storage,
            WorkTimeError::ObserverError(_) => ErrorCategory::Processing,
            WorkTimeError::IoError(_) => ErrorCategory::Io,
            WorkTimeError::SerializationError(_) => ErrorCategory::Serialization,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let new_msg = format!("{} (上下文: {})", self.message(), context);

        match self {
            WorkTimeError::ConfigError(_) => WorkTimeError::ConfigError(new_msg),
            WorkTimeError::ParseFailure(_) => WorkTimeError::ParseFailure(new_msg),
            WorkTimeError::InvalidIncome(_) => WorkTimeError::InvalidIncome(new_msg),
            WorkTimeError::StorageError(_) => WorkTimeError::StorageError(new_msg),
            WorkTimeError::ObserverError(_) => WorkTimeError::ObserverError(new_msg),
            WorkTimeError::IoError(_) => WorkTimeError::IoError(new_msg),
            WorkTimeError::SerializationError(_) => WorkTimeError::SerializationError(new_msg),
        }
    }

    /// 错误携带的原始消息
    pub fn message(&self) -> &str {
        match self {
            WorkTimeError::ConfigError(msg)
            | WorkTimeError::ParseFailure(msg)
            | WorkTimeError::InvalidIncome(msg)
            | WorkTimeError::StorageError(msg)
            | WorkTimeError::ObserverError(msg)
            | WorkTimeError::IoError(msg)
            | WorkTimeError::SerializationError(msg) => msg,
        }
    }

    /// 按严重程度记录日志
    pub fn log(&self) {
        match self.severity() {
            ErrorSeverity::Info => tracing::debug!("{}", self),
            ErrorSeverity::Warning => tracing::warn!("{}", self),
            ErrorSeverity::Error => tracing::error!("{}", self),
            ErrorSeverity::Critical => tracing::error!("严重错误: {}", self),
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Parsing,
    Storage,
    Processing,
    Io,
    Serialization,
}

impl From<std::io::Error> for WorkTimeError {
    fn from(error: std::io::Error) -> Self {
        WorkTimeError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for WorkTimeError {
    fn from(error: serde_json::Error) -> Self {
        WorkTimeError::SerializationError(error.to_string())
    }
}

impl From<toml::de::Error> for WorkTimeError {
    fn from(error: toml::de::Error) -> Self {
        WorkTimeError::ConfigError(format!("解析TOML配置失败: {}", error))
    }
}

/// 结果类型别名
pub type WorkTimeResult<T> = Result<T, WorkTimeError>;
