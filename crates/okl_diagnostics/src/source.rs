//! SourceBuffer - 源码缓冲区
//!
//! 不可变、共享的具名文本。可以来自真实文件，也可以是合成缓冲区：
//! `(builtin)` 表示没有真实文件，`(source)` 表示来自字符串。
//! 两个合成缓冲区存放在静态存储中，进程结束前不会释放。

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{self, AtomicU64};
use std::sync::{Arc, LazyLock};

use crate::error::{DiagnosticError, Result};
use crate::span::SourcePosition;

const BUILTIN_ID: u64 = 0;
const STRING_ID: u64 = 1;

/// 普通缓冲区的编号从合成缓冲区之后开始
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(STRING_ID + 1);

static BUILTIN: LazyLock<SourceBuffer> =
    LazyLock::new(|| SourceBuffer::synthetic(BUILTIN_ID, "(builtin)"));

static STRING: LazyLock<SourceBuffer> =
    LazyLock::new(|| SourceBuffer::synthetic(STRING_ID, "(source)"));

struct BufferData {
    id: u64,
    name: String,
    path: PathBuf,
    content: String,
}

/// 源码缓冲区
///
/// 克隆只增加引用计数，不复制内容。相等性、哈希和排序都基于
/// 构造时分配的进程内唯一编号，而不是内容。
#[derive(Clone)]
pub struct SourceBuffer(Arc<BufferData>);

impl SourceBuffer {
    /// 从文本创建缓冲区
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let path = PathBuf::from(&name);
        Self::with_id(next_id(), name, path, content.into())
    }

    /// 读取文件创建缓冲区
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| DiagnosticError::ReadSource {
                path: path.to_path_buf(),
                source,
            })?;
        let expanded = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        tracing::trace!(path = %expanded.display(), bytes = content.len(), "loaded source");
        Ok(Self::with_id(
            next_id(),
            path.display().to_string(),
            expanded,
            content,
        ))
    }

    /// 表示"没有真实文件"的合成缓冲区
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// 表示"来自字符串"的合成缓冲区
    pub fn string() -> Self {
        STRING.clone()
    }

    fn synthetic(id: u64, name: &str) -> Self {
        Self::with_id(id, name.to_string(), PathBuf::new(), String::new())
    }

    fn with_id(id: u64, name: String, path: PathBuf, content: String) -> Self {
        Self(Arc::new(BufferData {
            id,
            name,
            path,
            content,
        }))
    }

    /// 进程内唯一编号
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// 显示名称
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// 展开后的路径（合成缓冲区为空）
    pub fn path(&self) -> &Path {
        &self.0.path
    }

    /// 完整内容
    pub fn content(&self) -> &str {
        &self.0.content
    }

    pub fn is_builtin(&self) -> bool {
        self.0.id == BUILTIN_ID
    }

    pub fn is_synthetic(&self) -> bool {
        self.0.id <= STRING_ID
    }

    /// 取出字节范围内的文本，范围非法时返回空串
    pub fn slice(&self, range: Range<usize>) -> &str {
        self.0.content.get(range).unwrap_or("")
    }

    /// 取出从 `line_start` 开始的整行文本（不含换行符）
    pub fn line_at(&self, line_start: usize) -> &str {
        let rest = self.0.content.get(line_start..).unwrap_or("");
        let line = rest.split('\n').next().unwrap_or("");
        line.strip_suffix('\r').unwrap_or(line)
    }

    /// 根据字节范围计算位置（行号与行首）
    pub fn position(&self, range: Range<usize>) -> Result<SourcePosition> {
        let content = &self.0.content;
        let valid = range.start <= range.end
            && range.end <= content.len()
            && content.is_char_boundary(range.start)
            && content.is_char_boundary(range.end);
        if !valid {
            return Err(DiagnosticError::InvalidSpan {
                name: self.0.name.clone(),
                start: range.start,
                end: range.end,
                len: content.len(),
            });
        }

        let before = &content[..range.start];
        let line = 1 + before.bytes().filter(|&b| b == b'\n').count();
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        Ok(SourcePosition::new(line, line_start, range.start, range.end))
    }

    /// 两个句柄是否指向同一个缓冲区
    pub fn ptr_eq(&self, other: &SourceBuffer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn next_id() -> u64 {
    NEXT_BUFFER_ID.fetch_add(1, atomic::Ordering::Relaxed)
}

// 只输出身份信息，避免打印整个文件内容
impl fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBuffer")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .finish()
    }
}

impl PartialEq for SourceBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for SourceBuffer {}

impl Hash for SourceBuffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for SourceBuffer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceBuffer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KERNEL: &str = "@kernel void add() {\n  for (int i = 0; i < N; ++i; @tile(16)) {\n  }\n}\n";

    #[test]
    fn test_synthetic_buffers_are_singletons() {
        let a = SourceBuffer::builtin();
        let b = SourceBuffer::builtin();
        assert!(a.ptr_eq(&b));
        assert!(a.is_builtin());
        assert!(a.is_synthetic());
        assert_eq!(a.name(), "(builtin)");
        assert_eq!(a.content(), "");

        let s = SourceBuffer::string();
        assert_eq!(s.name(), "(source)");
        assert!(!s.is_builtin());
        assert!(s.is_synthetic());
        assert_ne!(a, s);
    }

    #[test]
    fn test_buffers_have_distinct_identity() {
        let a = SourceBuffer::new("a.okl", KERNEL);
        let b = SourceBuffer::new("a.okl", KERNEL);
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(a, a.clone());
        assert!(!a.is_synthetic());
    }

    #[test]
    fn test_position_computes_line() {
        let buffer = SourceBuffer::new("add.okl", KERNEL);
        let start = KERNEL.find("@tile").unwrap();
        let pos = buffer.position(start..start + 5).unwrap();
        assert_eq!(pos.line, 2);
        assert_eq!(pos.line_start, 21);
        assert_eq!(buffer.slice(pos.range()), "@tile");
        assert_eq!(
            buffer.line_at(pos.line_start),
            "  for (int i = 0; i < N; ++i; @tile(16)) {"
        );
    }

    #[test]
    fn test_position_rejects_bad_range() {
        let buffer = SourceBuffer::new("add.okl", KERNEL);
        assert!(buffer.position(4..2).is_err());
        assert!(buffer.position(0..KERNEL.len() + 1).is_err());

        let unicode = SourceBuffer::new("u.okl", "// é\n");
        assert!(unicode.position(4..5).is_err());
    }

    #[test]
    fn test_line_at_strips_carriage_return() {
        let buffer = SourceBuffer::new("crlf.okl", "a();\r\nb();\r\n");
        assert_eq!(buffer.line_at(0), "a();");
        assert_eq!(buffer.line_at(6), "b();");
        assert_eq!(buffer.line_at(100), "");
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = SourceBuffer::from_path("/definitely/not/here.okl").unwrap_err();
        assert!(matches!(err, DiagnosticError::ReadSource { .. }));
    }
}
