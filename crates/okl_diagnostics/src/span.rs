//! SourcePosition - 源码位置信息
//!
//! 缓冲区内的字节范围，附带缓存的行号和行首偏移，
//! 这样取整行文本时不需要重新扫描缓冲区。

use std::ops::Range;

/// 源码位置 (字节偏移)
///
/// 默认值（第 1 行，所有偏移为 0）是扫描起点，不指向任何具体 token。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    /// 行号 (从 1 开始)
    pub line: usize,
    /// 所在行的行首偏移
    pub line_start: usize,
    /// 起始偏移
    pub start: usize,
    /// 结束偏移 (不包含)
    pub end: usize,
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::root()
    }
}

impl SourcePosition {
    /// 创建新的位置
    ///
    /// `end` 小于 `start` 时按空 span 处理。
    pub fn new(line: usize, line_start: usize, start: usize, end: usize) -> Self {
        Self {
            line,
            line_start,
            start,
            end: end.max(start),
        }
    }

    /// 缓冲区起点
    pub fn root() -> Self {
        Self {
            line: 1,
            line_start: 0,
            start: 0,
            end: 0,
        }
    }

    /// 获取长度
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// 相对行首的列偏移
    pub fn column(&self) -> usize {
        self.start.saturating_sub(self.line_start)
    }

    /// 转为字节范围
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_creation() {
        let pos = SourcePosition::new(5, 27, 33, 37);
        assert_eq!(pos.line, 5);
        assert_eq!(pos.len(), 4);
        assert_eq!(pos.column(), 6);
        assert_eq!(pos.range(), 33..37);
        assert!(!pos.is_empty());
    }

    #[test]
    fn test_root_position() {
        let pos = SourcePosition::default();
        assert_eq!(pos, SourcePosition::root());
        assert_eq!(pos.line, 1);
        assert!(pos.is_empty());
        assert_eq!(pos.column(), 0);
    }

    #[test]
    fn test_reversed_span_is_empty() {
        let pos = SourcePosition::new(1, 0, 8, 3);
        assert!(pos.is_empty());
        assert_eq!(pos.len(), 0);
    }
}
