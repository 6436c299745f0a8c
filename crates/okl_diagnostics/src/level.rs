//! DiagnosticLevel - 诊断级别
//!
//! 内核编译前端只区分错误和警告

use colored::*;
use std::fmt;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticLevel {
    /// 错误 - 阻止编译
    Error,
    /// 警告 - 不阻止编译但应注意
    Warning,
}

impl DiagnosticLevel {
    /// 获取级别名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    /// 按数量选择单复数名称
    pub fn counted_name(&self, count: usize) -> &'static str {
        match (self, count) {
            (Self::Error, 1) => "error",
            (Self::Error, _) => "errors",
            (Self::Warning, 1) => "warning",
            (Self::Warning, _) => "warnings",
        }
    }

    /// 获取带颜色的级别名称
    pub fn colored_name(&self) -> ColoredString {
        match self {
            Self::Error => self.name().red().bold(),
            Self::Warning => self.name().yellow().bold(),
        }
    }

    /// 是否为错误
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_name() {
        assert_eq!(DiagnosticLevel::Error.name(), "error");
        assert_eq!(DiagnosticLevel::Warning.name(), "warning");
    }

    #[test]
    fn test_counted_name() {
        assert_eq!(DiagnosticLevel::Error.counted_name(1), "error");
        assert_eq!(DiagnosticLevel::Error.counted_name(2), "errors");
        assert_eq!(DiagnosticLevel::Warning.counted_name(1), "warning");
        assert_eq!(DiagnosticLevel::Warning.counted_name(95), "warnings");
    }

    #[test]
    fn test_is_error() {
        assert!(DiagnosticLevel::Error.is_error());
        assert!(!DiagnosticLevel::Warning.is_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", DiagnosticLevel::Error), "error");
        assert_eq!(format!("{}", DiagnosticLevel::Warning), "warning");
    }
}
