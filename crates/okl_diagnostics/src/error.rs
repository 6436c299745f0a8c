//! DiagnosticError - 诊断系统错误
//!
//! 调用方的使用错误（缺少主位置、多余的 pop）以及边界上的 I/O 失败。
//! 这些都不是面向用户的诊断，而是调用阶段的 bug 或环境问题。

use std::path::PathBuf;

use thiserror::Error;

use crate::level::DiagnosticLevel;

/// 诊断系统错误
#[derive(Debug, Error)]
pub enum DiagnosticError {
    /// 打印时没有设置主位置
    #[error("{level} code is missing its origin")]
    MissingOrigin { level: DiagnosticLevel },

    /// 没有父帧时调用 pop
    #[error("unable to pop source origin: no enclosing frame")]
    UnbalancedPop,

    /// 字节范围不是缓冲区内的合法 span
    #[error("invalid span {start}..{end} in '{name}' ({len} bytes)")]
    InvalidSpan {
        name: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// 读取源文件失败
    #[error("failed to read source file '{}'", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 写入输出失败
    #[error("failed to write diagnostic")]
    Io(#[from] std::io::Error),

    #[error("failed to format diagnostic")]
    Format(#[from] std::fmt::Error),
}

/// 诊断系统结果类型
pub type Result<T> = std::result::Result<T, DiagnosticError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_origin_message() {
        let err = DiagnosticError::MissingOrigin {
            level: DiagnosticLevel::Warning,
        };
        assert_eq!(err.to_string(), "warning code is missing its origin");
    }

    #[test]
    fn test_invalid_span_message() {
        let err = DiagnosticError::InvalidSpan {
            name: "kernel.okl".to_string(),
            start: 4,
            end: 2,
            len: 10,
        };
        assert_eq!(
            err.to_string(),
            "invalid span 4..2 in 'kernel.okl' (10 bytes)"
        );
    }
}
