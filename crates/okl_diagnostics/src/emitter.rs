//! Emitter - 诊断输出器
//!
//! 负责将诊断信息格式化输出。输出由以下部分组成：
//!
//! 1. 主位置的外层上下文栈、`级别[错误码]: 消息` 和 `-->` 位置行；
//! 2. 主位置所在缓冲区的标注（平铺，或先主行、再分隔线、再其余标注）；
//! 3. 其他缓冲区的标注，每个缓冲区一段；
//! 4. 有标注被隐藏时，末尾的 `Suppressed N additional error(s)`。

use std::fmt::Write as _;
use std::io;

use colored::*;

use crate::annotation::Annotation;
use crate::diagnostic::{Diagnostic, DEFAULT_MAX_ERRORS_DISPLAYED};
use crate::error::{DiagnosticError, Result};
use crate::origin::SourceOrigin;
use crate::source::SourceBuffer;

const DIVIDER: &str = "^^^";

/// 诊断输出器
#[derive(Debug, Clone)]
pub struct Emitter {
    /// 是否使用颜色
    use_colors: bool,
    /// 最多显示的跨行标注数量
    max_sources: usize,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    /// 创建新的输出器
    pub fn new() -> Self {
        Self {
            use_colors: true,
            max_sources: DEFAULT_MAX_ERRORS_DISPLAYED,
        }
    }

    /// 创建无颜色的输出器
    pub fn without_colors() -> Self {
        Self {
            use_colors: false,
            ..Self::new()
        }
    }

    /// 设置跨行标注的显示上限
    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources;
        self
    }

    pub fn use_colors(&self) -> bool {
        self.use_colors
    }

    pub fn max_sources(&self) -> usize {
        self.max_sources
    }

    /// 输出单个诊断
    pub fn emit(&self, diagnostic: Diagnostic, out: &mut impl io::Write) -> Result<()> {
        let report = self.render(diagnostic)?;
        out.write_all(report.as_bytes())?;
        Ok(())
    }

    /// 把诊断渲染成文本
    ///
    /// 主位置无效时返回 `MissingOrigin`，不产生任何输出。
    pub fn render(&self, mut diagnostic: Diagnostic) -> Result<String> {
        if !diagnostic.origin.is_valid() {
            return Err(DiagnosticError::MissingOrigin {
                level: diagnostic.level,
            });
        }

        // 必须在渲染前截断，渲染只看截断后的分组
        let suppressed = diagnostic.suppress_sources(self.max_sources);

        let mut out = String::new();
        self.write_header(&mut out, &diagnostic)?;
        self.write_sources(&mut out, &diagnostic)?;
        if suppressed > 0 {
            out.push('\n');
            self.write_suppressed(&mut out, &diagnostic, suppressed)?;
        }
        Ok(out)
    }

    fn write_header(&self, out: &mut String, diagnostic: &Diagnostic) -> std::fmt::Result {
        let origin = &diagnostic.origin;
        origin.write_stack(out, self)?;

        if self.use_colors {
            let code = if diagnostic.code.is_empty() {
                String::new()
            } else {
                format!("[{}]", diagnostic.code)
            };
            let code = match diagnostic.level.is_error() {
                true => code.red().bold(),
                false => code.yellow().bold(),
            };
            writeln!(
                out,
                "{}{}: {}",
                diagnostic.level.colored_name(),
                code,
                diagnostic.message.bold()
            )?;
        } else if diagnostic.code.is_empty() {
            writeln!(out, "{}: {}", diagnostic.level, diagnostic.message)?;
        } else {
            writeln!(
                out,
                "{}[{}]: {}",
                diagnostic.level, diagnostic.code, diagnostic.message
            )?;
        }

        let arrow = self.paint(" -->", |s| s.blue().bold());
        write!(out, "{} {}", arrow, self.paint_filename(origin.name()))?;
        if !origin.buffer().is_some_and(SourceBuffer::is_builtin) {
            let position = origin.position();
            write!(out, ":{}:{}", position.line, position.column() + 1)?;
        }
        out.push('\n');
        Ok(())
    }

    fn write_sources(&self, out: &mut String, diagnostic: &Diagnostic) -> std::fmt::Result {
        self.write_origin_file_sources(out, diagnostic)?;

        for (buffer, sources) in diagnostic.sources() {
            if diagnostic.origin.buffer() == Some(buffer) {
                continue;
            }
            let max_line = sources.iter().map(Annotation::line).max().unwrap_or(1);
            out.push('\n');
            self.write_filename(out, buffer, None)?;
            self.write_lines(out, sources.iter(), sidebar_width(max_line))?;
        }
        Ok(())
    }

    /// 主位置所在缓冲区
    fn write_origin_file_sources(&self, out: &mut String, diagnostic: &Diagnostic) -> std::fmt::Result {
        let origin = &diagnostic.origin;
        let Some(buffer) = origin.buffer() else {
            return Ok(());
        };
        let origin_line = diagnostic.origin_line_sources();
        let file_sources = diagnostic.origin_file_sources();

        if !diagnostic.needs_split() {
            let mut merged: Vec<&Annotation> = origin_line
                .iter()
                .chain(file_sources.into_iter().flatten())
                .collect();
            if merged.is_empty() {
                return Ok(());
            }
            merged.sort();

            let max_line = merged.iter().map(|a| a.line()).max().unwrap_or(1);
            out.push('\n');
            self.write_filename(out, buffer, None)?;
            return self.write_lines(out, merged.into_iter(), sidebar_width(max_line));
        }

        let max_line = file_sources
            .into_iter()
            .flatten()
            .map(Annotation::line)
            .chain(std::iter::once(origin.position().line))
            .max()
            .unwrap_or(1);
        let sidebar = sidebar_width(max_line);

        out.push('\n');
        self.write_filename(out, buffer, Some(origin.position().line))?;
        if origin_line.is_empty() {
            let bare = Annotation::new(origin.clone(), "");
            self.write_lines(out, std::iter::once(&bare), sidebar)?;
        } else {
            self.write_lines(out, origin_line.iter(), sidebar)?;
        }

        self.write_divider(out, sidebar)?;
        self.write_lines(out, file_sources.into_iter().flatten(), sidebar)
    }

    fn write_filename(&self, out: &mut String, buffer: &SourceBuffer, line: Option<usize>) -> std::fmt::Result {
        write!(out, "{}", self.paint_filename(buffer.name()))?;
        match line {
            Some(line) if !buffer.is_builtin() => writeln!(out, ":{}", line),
            _ => writeln!(out),
        }
    }

    /// 逐个输出标注：源码行，然后标记行。
    /// 连续落在同一行的标注共用一次源码行。
    fn write_lines<'a>(
        &self,
        out: &mut String,
        sources: impl Iterator<Item = &'a Annotation>,
        sidebar: usize,
    ) -> std::fmt::Result {
        let mut previous: Option<(u64, usize)> = None;

        for source in sources {
            let origin = &source.origin;
            let position = origin.position();
            let key = (origin.buffer().map_or(0, SourceBuffer::id), position.line_start);

            let line = origin.line_text();
            if previous != Some(key) {
                let number = format!(" {:>width$} |", position.line, width = sidebar - 2);
                write!(out, "{}", self.paint(&number, |s| s.blue().bold()))?;
                if line.is_empty() {
                    out.push('\n');
                } else {
                    writeln!(out, " {}", line)?;
                }
                previous = Some(key);
            }

            self.write_marker(out, origin, line, &source.label, sidebar)?;
        }
        Ok(())
    }

    fn write_marker(
        &self,
        out: &mut String,
        origin: &SourceOrigin,
        line: &str,
        label: &str,
        sidebar: usize,
    ) -> std::fmt::Result {
        let position = origin.position();
        let column = position.column();

        // 跨行的 span 只标到行尾
        let indent = line.get(..column).map_or(column, |s| s.chars().count());
        let end = (column + position.len()).min(line.len());
        let width = line
            .get(column..end)
            .map_or(0, |s| s.chars().count())
            .max(1);

        let bar = format!("{}|", " ".repeat(sidebar));
        let carets = "^".repeat(width);
        write!(
            out,
            "{} {}{}",
            self.paint(&bar, |s| s.blue().bold()),
            " ".repeat(indent),
            self.paint(&carets, |s| s.green().bold())
        )?;
        if !label.is_empty() {
            write!(out, " {}", label)?;
        }
        out.push('\n');
        Ok(())
    }

    /// 分隔线以侧边栏边界为中心
    fn write_divider(&self, out: &mut String, sidebar: usize) -> std::fmt::Result {
        let padding = sidebar.saturating_sub(DIVIDER.len() / 2);
        writeln!(out, "{}{}", " ".repeat(padding), DIVIDER)
    }

    fn write_suppressed(&self, out: &mut String, diagnostic: &Diagnostic, suppressed: usize) -> std::fmt::Result {
        let message = format!(
            "Suppressed {} additional {}",
            suppressed,
            diagnostic.level.counted_name(suppressed)
        );
        writeln!(out, "{}", self.paint(&message, |s| s.yellow()))
    }

    /// 文件名样式
    pub fn paint_filename(&self, name: &str) -> String {
        self.paint(name, |s| s.blue())
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.use_colors {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

/// 侧边栏宽度：左右各留一格，再加行号位数
pub fn sidebar_width(max_line: usize) -> usize {
    let mut width = 3;
    let mut line = max_line / 10;
    while line > 0 {
        width += 1;
        line /= 10;
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourcePosition;

    const KERNEL: &str = "@kernel void add(const int N, float *a) {\n  a[0] += N;\n}\n";

    fn origin(buffer: &SourceBuffer, needle: &str) -> SourceOrigin {
        let start = buffer.content().find(needle).unwrap();
        let pos = buffer.position(start..start + needle.len()).unwrap();
        SourceOrigin::at(buffer.clone(), pos)
    }

    #[test]
    fn test_emitter_creation() {
        let emitter = Emitter::new();
        assert!(emitter.use_colors());
        assert_eq!(emitter.max_sources(), DEFAULT_MAX_ERRORS_DISPLAYED);

        let emitter = Emitter::without_colors().with_max_sources(2);
        assert!(!emitter.use_colors());
        assert_eq!(emitter.max_sources(), 2);
    }

    #[test]
    fn test_sidebar_width() {
        assert_eq!(sidebar_width(1), 3);
        assert_eq!(sidebar_width(9), 3);
        assert_eq!(sidebar_width(10), 4);
        assert_eq!(sidebar_width(999), 5);
        assert_eq!(sidebar_width(1000), 6);
    }

    #[test]
    fn test_missing_origin() {
        let err = Emitter::without_colors()
            .render(Diagnostic::error("E0001"))
            .unwrap_err();
        assert!(matches!(err, DiagnosticError::MissingOrigin { .. }));
    }

    #[test]
    fn test_header_without_code() {
        let buffer = SourceBuffer::new("add.okl", KERNEL);
        let diag = Diagnostic::warning("").with_message(&origin(&buffer, "N,"), "unused argument");
        let report = Emitter::without_colors().render(diag).unwrap();
        assert_eq!(report, "warning: unused argument\n --> add.okl:1:28\n");
    }

    #[test]
    fn test_builtin_origin_has_no_line() {
        let origin = SourceOrigin::new(SourceBuffer::builtin());
        let diag = Diagnostic::error("E0002").with_message(&origin, "missing kernel");
        let report = Emitter::without_colors().render(diag).unwrap();
        assert_eq!(report, "error[E0002]: missing kernel\n --> (builtin)\n");
    }

    #[test]
    fn test_caret_clipped_to_line_end() {
        let buffer = SourceBuffer::new("add.okl", KERNEL);
        let start = KERNEL.find('{').unwrap();
        let end = KERNEL.rfind('}').unwrap() + 1;
        let body = SourceOrigin::at(buffer.clone(), buffer.position(start..end).unwrap());

        let diag = Diagnostic::error("E0003")
            .with_message(&body, "empty body")
            .with_source(&body, "body");
        let report = Emitter::without_colors().render(diag).unwrap();
        let expected = format!(
            "error[E0003]: empty body\n --> add.okl:1:41\n\nadd.okl\n 1 | {}\n   | {}^ body\n",
            KERNEL.lines().next().unwrap(),
            " ".repeat(40)
        );
        assert_eq!(report, expected);
    }

    #[test]
    fn test_stack_precedes_header() {
        let buffer = SourceBuffer::new("add.okl", KERNEL);
        let defs = SourceBuffer::new("defs.okl", "#define N 16\n");
        let mut origin = origin(&buffer, "N;");
        origin.push(
            crate::origin::FrameKind::Expansion,
            defs.clone(),
            defs.position(10..12).unwrap(),
        );

        let diag = Diagnostic::error("E0004").with_message(&origin, "not a variable");
        let report = Emitter::without_colors().render(diag).unwrap();
        assert_eq!(
            report,
            "add.okl:2 Expanded from macro 'N;':\nerror[E0004]: not a variable\n --> defs.okl:1:11\n"
        );
    }

    #[test]
    fn test_empty_source_line() {
        let buffer = SourceBuffer::new("gap.okl", "a();\n\nb();\n");
        let primary = origin(&buffer, "a()");
        let empty = SourceOrigin::at(buffer.clone(), SourcePosition::new(2, 5, 5, 5));

        let diag = Diagnostic::error("")
            .with_message(&primary, "gap")
            .with_source(&empty, "blank");
        let report = Emitter::without_colors().render(diag).unwrap();
        assert_eq!(
            report,
            "error: gap\n --> gap.okl:1:1\n\ngap.okl:1\n 1 | a();\n   | ^^^\n  ^^^\n 2 |\n   | ^ blank\n"
        );
    }
}
