//! Annotation - 附加源码标注
//!
//! 诊断中除主位置之外的带标签位置，例如 "declared here"。

use std::cmp::Ordering;

use crate::origin::SourceOrigin;

/// 附加源码标注
///
/// 排序：缓冲区编号，然后 span 起点，然后 `index`，最后 `seq`。
/// `index` 在主位置所在行中是列偏移，其他情况下是提交序号；
/// `seq` 始终是提交序号，保证同一 span 上的多个标签互不覆盖。
#[derive(Debug, Clone)]
pub struct Annotation {
    pub index: usize,
    pub seq: usize,
    pub origin: SourceOrigin,
    pub label: String,
}

impl Annotation {
    /// 创建新的标注
    pub fn new(origin: SourceOrigin, label: impl Into<String>) -> Self {
        Self {
            index: 0,
            seq: 0,
            origin,
            label: label.into(),
        }
    }

    /// 设置排序索引
    pub fn with_index(mut self, index: usize, seq: usize) -> Self {
        self.index = index;
        self.seq = seq;
        self
    }

    pub fn line(&self) -> usize {
        self.origin.position().line
    }

    fn buffer_id(&self) -> Option<u64> {
        self.origin.buffer().map(|b| b.id())
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Annotation {}

impl PartialOrd for Annotation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Annotation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.buffer_id()
            .cmp(&other.buffer_id())
            .then_with(|| self.origin.position().start.cmp(&other.origin.position().start))
            .then_with(|| self.index.cmp(&other.index))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceBuffer;
    use std::collections::BTreeSet;

    const KERNEL: &str = "@kernel void add(const int N,\n                float *a) {\n}\n";

    fn annotation(buffer: &SourceBuffer, needle: &str, label: &str) -> Annotation {
        let start = buffer.content().find(needle).unwrap();
        let pos = buffer.position(start..start + needle.len()).unwrap();
        Annotation::new(SourceOrigin::at(buffer.clone(), pos), label)
    }

    #[test]
    fn test_orders_by_start_before_index() {
        let buffer = SourceBuffer::new("add.okl", KERNEL);
        let late = annotation(&buffer, "float", "second").with_index(0, 0);
        let early = annotation(&buffer, "const", "first").with_index(1, 1);

        let set: BTreeSet<_> = [late, early].into_iter().collect();
        let labels: Vec<_> = set.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, ["first", "second"]);
    }

    #[test]
    fn test_same_span_keeps_both_labels() {
        let buffer = SourceBuffer::new("add.okl", KERNEL);
        let a = annotation(&buffer, "N", "a").with_index(4, 0);
        let b = annotation(&buffer, "N", "b").with_index(4, 1);
        assert!(a < b);

        let set: BTreeSet<_> = [b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_buffers_order_before_offsets() {
        let first = SourceBuffer::new("a.okl", KERNEL);
        let second = SourceBuffer::new("b.okl", KERNEL);
        let a = annotation(&first, "}", "end of a");
        let b = annotation(&second, "@kernel", "start of b");
        assert!(a < b);
    }
}
