//! Diagnostic - 诊断信息
//!
//! 一条主消息加任意数量的附加标注。提交标注时立即分类：
//!
//! - 与主位置同缓冲区、同一行的标注进入"同行"集合，按列排序；
//! - 其余标注按缓冲区分组，按提交顺序打破同起点的并列。
//!
//! 同行标注属于主消息的直接上下文，不受显示上限约束。

use std::collections::{BTreeMap, BTreeSet};

use crate::annotation::Annotation;
use crate::level::DiagnosticLevel;
use crate::origin::SourceOrigin;
use crate::source::SourceBuffer;

/// 默认最多显示的跨行标注数量
pub const DEFAULT_MAX_ERRORS_DISPLAYED: usize = 5;

/// 诊断信息
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 错误码，可以为空
    pub code: String,
    /// 主位置
    pub origin: SourceOrigin,
    /// 主要消息
    pub message: String,
    origin_line_sources: BTreeSet<Annotation>,
    sources: BTreeMap<SourceBuffer, BTreeSet<Annotation>>,
    source_index: usize,
}

impl Diagnostic {
    /// 创建新的诊断
    pub fn new(level: DiagnosticLevel, code: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
            origin: SourceOrigin::default(),
            message: String::new(),
            origin_line_sources: BTreeSet::new(),
            sources: BTreeMap::new(),
            source_index: 0,
        }
    }

    /// 创建错误诊断
    pub fn error(code: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, code)
    }

    /// 创建警告诊断
    pub fn warning(code: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, code)
    }

    /// 设置主位置和消息
    ///
    /// 标注在提交时按当前主位置分类，所以应先调用本方法。
    pub fn with_message(mut self, origin: &SourceOrigin, message: impl Into<String>) -> Self {
        self.origin = origin.clone();
        self.message = message.into();
        self
    }

    /// 添加标注
    pub fn with_source(self, origin: &SourceOrigin, label: impl Into<String>) -> Self {
        self.with_annotation(Annotation::new(origin.clone(), label))
    }

    /// 添加已构造的标注
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.add(annotation);
        self
    }

    /// 添加标注（可变引用版本，便于在循环中使用）
    pub fn add(&mut self, annotation: Annotation) {
        let Some(buffer) = annotation.origin.buffer().cloned() else {
            tracing::warn!(label = %annotation.label, "dropping annotation without a source buffer");
            return;
        };

        let seq = self.source_index;
        self.source_index += 1;

        if annotation.origin.on_same_line(&self.origin) {
            let column = annotation.origin.position().column();
            tracing::trace!(column, label = %annotation.label, "annotation on origin line");
            self.origin_line_sources
                .insert(annotation.with_index(column, seq));
        } else {
            tracing::trace!(buffer = buffer.name(), seq, label = %annotation.label, "annotation");
            self.sources
                .entry(buffer)
                .or_default()
                .insert(annotation.with_index(seq, seq));
        }
    }

    /// 主位置所在行的标注，按列排序
    pub fn origin_line_sources(&self) -> &BTreeSet<Annotation> {
        &self.origin_line_sources
    }

    /// 其余标注，按缓冲区分组
    pub fn sources(&self) -> &BTreeMap<SourceBuffer, BTreeSet<Annotation>> {
        &self.sources
    }

    /// 主位置所在缓冲区中的跨行标注
    pub fn origin_file_sources(&self) -> Option<&BTreeSet<Annotation>> {
        self.origin.buffer().and_then(|b| self.sources.get(b))
    }

    /// 跨行标注数量
    pub fn source_count(&self) -> usize {
        self.sources.values().map(BTreeSet::len).sum()
    }

    /// 全部标注数量
    pub fn annotation_count(&self) -> usize {
        self.origin_line_sources.len() + self.source_count()
    }

    /// 按显示上限截断跨行标注，返回被隐藏的数量
    ///
    /// 按缓冲区顺序消耗额度：整组放得下就保留；放不下就截掉尾部，
    /// 之后的缓冲区整组丢弃。同行标注不计入。
    pub fn suppress_sources(&mut self, max_sources: usize) -> usize {
        let mut available = max_sources;
        let mut suppressed = 0;

        for (buffer, group) in self.sources.iter_mut() {
            if group.len() <= available {
                available -= group.len();
                continue;
            }

            if let Some(cut) = group.iter().nth(available).cloned() {
                let dropped = group.split_off(&cut);
                tracing::debug!(
                    buffer = buffer.name(),
                    kept = group.len(),
                    dropped = dropped.len(),
                    "suppressing annotations"
                );
                suppressed += dropped.len();
            }
            available = 0;
        }

        self.sources.retain(|_, group| !group.is_empty());
        suppressed
    }

    /// 主缓冲区是否需要分段显示
    ///
    /// 只要有一个跨行标注严格位于主位置之后，就先显示主位置所在行，
    /// 再用分隔线隔开其余标注。
    pub fn needs_split(&self) -> bool {
        let Some(group) = self.origin_file_sources() else {
            return false;
        };
        group.iter().any(|source| {
            !source.origin.on_same_line(&self.origin)
                && self
                    .origin
                    .distance_to(&source.origin)
                    .is_some_and(|distance| distance > 0)
        })
    }
}
