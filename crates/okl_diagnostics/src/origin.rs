//! SourceOrigin - 带上下文栈的源码位置
//!
//! 一个位置加上可选的父帧。父帧记录进入当前位置之前所处的位置，
//! 以及是通过 `#include` 打开新文件进入的，还是通过宏展开原地改写进入的。
//!
//! 父链是持久化的栈：`push` 把当前完整状态放进新分配的父帧，
//! `pop` 是它的精确逆操作。父帧通过 `Arc` 共享，复制一个
//! `SourceOrigin` 只是增加引用计数。

use std::fmt;
use std::sync::Arc;

use crate::emitter::Emitter;
use crate::error::{DiagnosticError, Result};
use crate::source::SourceBuffer;
use crate::span::SourcePosition;

/// 进入子上下文的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// 打开了另一个文件
    Include,
    /// 宏展开
    Expansion,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    origin: SourceOrigin,
}

/// 带上下文栈的源码位置
///
/// 默认值没有缓冲区，`is_valid()` 为 false。
#[derive(Debug, Clone, Default)]
pub struct SourceOrigin {
    buffer: Option<SourceBuffer>,
    position: SourcePosition,
    up: Option<Arc<Frame>>,
}

impl SourceOrigin {
    /// 锚定在缓冲区起点
    pub fn new(buffer: SourceBuffer) -> Self {
        Self::at(buffer, SourcePosition::root())
    }

    /// 锚定在缓冲区中的指定位置
    pub fn at(buffer: SourceBuffer, position: SourcePosition) -> Self {
        Self {
            buffer: Some(buffer),
            position,
            up: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&SourceBuffer> {
        self.buffer.as_ref()
    }

    pub fn position(&self) -> &SourcePosition {
        &self.position
    }

    /// 所在缓冲区的显示名称
    pub fn name(&self) -> &str {
        self.buffer.as_ref().map_or("", |b| b.name())
    }

    /// span 覆盖的文本
    pub fn text(&self) -> &str {
        self.buffer
            .as_ref()
            .map_or("", |b| b.slice(self.position.range()))
    }

    /// span 起点所在的整行文本
    pub fn line_text(&self) -> &str {
        self.buffer
            .as_ref()
            .map_or("", |b| b.line_at(self.position.line_start))
    }

    /// 直接外层的上下文
    pub fn parent(&self) -> Option<&SourceOrigin> {
        self.up.as_deref().map(|frame| &frame.origin)
    }

    /// 当前位置是如何从外层上下文进入的
    pub fn entered_via(&self) -> Option<FrameKind> {
        self.up.as_deref().map(|frame| frame.kind)
    }

    /// 外层上下文的层数
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(origin) = current {
            depth += 1;
            current = origin.parent();
        }
        depth
    }

    fn same_buffer(&self, other: &SourceOrigin) -> bool {
        matches!((&self.buffer, &other.buffer), (Some(a), Some(b)) if a == b)
    }

    /// `other` 起点到本位置终点的距离
    ///
    /// 不在同一缓冲区时无法比较，返回 `None`。
    /// 正数表示 `other` 严格位于本位置之后。
    pub fn distance_to(&self, other: &SourceOrigin) -> Option<isize> {
        if !self.same_buffer(other) {
            return None;
        }
        Some(other.position.start as isize - self.position.end as isize)
    }

    /// 是否位于同一缓冲区的同一行
    pub fn on_same_line(&self, other: &SourceOrigin) -> bool {
        self.same_buffer(other) && self.position.line_start == other.position.line_start
    }

    /// 进入新的上下文帧
    pub fn push(&mut self, kind: FrameKind, buffer: SourceBuffer, position: SourcePosition) {
        self.push_parts(kind, Some(buffer), position);
    }

    /// 以另一个位置作为新的栈顶
    pub fn push_origin(&mut self, kind: FrameKind, other: &SourceOrigin) {
        self.push_parts(kind, other.buffer.clone(), other.position);
    }

    fn push_parts(&mut self, kind: FrameKind, buffer: Option<SourceBuffer>, position: SourcePosition) {
        let previous = std::mem::take(self);
        tracing::trace!(
            ?kind,
            from = previous.name(),
            to = buffer.as_ref().map_or("", |b| b.name()),
            line = position.line,
            "push source origin"
        );
        *self = Self {
            buffer,
            position,
            up: Some(Arc::new(Frame {
                kind,
                origin: previous,
            })),
        };
    }

    /// 离开当前上下文帧
    ///
    /// 没有父帧时返回 `UnbalancedPop`，自身保持不变。
    pub fn pop(&mut self) -> Result<()> {
        let frame = self.up.take().ok_or(DiagnosticError::UnbalancedPop)?;
        tracing::trace!(from = self.name(), to = frame.origin.name(), "pop source origin");
        *self = frame.origin.clone();
        Ok(())
    }

    /// 返回 `other` 的副本，并把自身压到栈顶
    pub fn from(&self, kind: FrameKind, other: &SourceOrigin) -> SourceOrigin {
        let mut origin = other.clone();
        origin.push_origin(kind, self);
        origin
    }

    /// 从最外层开始输出所有外层帧，不包括自身
    pub fn write_stack(&self, out: &mut impl fmt::Write, emitter: &Emitter) -> fmt::Result {
        let Some(frame) = self.up.as_deref() else {
            return Ok(());
        };
        let origin = &frame.origin;
        origin.write_stack(out, emitter)?;

        write!(out, "{}:", emitter.paint_filename(origin.name()))?;
        if !origin.buffer.as_ref().is_some_and(|b| b.is_builtin()) {
            write!(out, "{}", origin.position.line)?;
        }
        match frame.kind {
            FrameKind::Include => writeln!(out, " Included file:"),
            FrameKind::Expansion => writeln!(out, " Expanded from macro '{}':", origin.text()),
        }
    }
}

// 父帧按指针比较：只有共享同一个栈节点才算同一个栈
impl PartialEq for SourceOrigin {
    fn eq(&self, other: &Self) -> bool {
        let same_up = match (&self.up, &other.up) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.buffer == other.buffer && self.position == other.position && same_up
    }
}

impl Eq for SourceOrigin {}
