//! DiagnosticSink - 诊断输出目标
//!
//! 持有输出流和输出器，并统计已经输出的错误和警告，
//! 编译前端据此决定是否继续。默认输出到标准错误。

use std::io;

use crate::diagnostic::Diagnostic;
use crate::emitter::Emitter;
use crate::error::Result;
use crate::level::DiagnosticLevel;
use crate::origin::SourceOrigin;

/// 诊断输出目标
#[derive(Debug)]
pub struct DiagnosticSink<W: io::Write> {
    out: W,
    emitter: Emitter,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticSink<io::Stderr> {
    /// 输出到标准错误
    pub fn stderr() -> Self {
        Self::new(io::stderr(), Emitter::new())
    }
}

impl<W: io::Write> DiagnosticSink<W> {
    /// 创建新的输出目标
    pub fn new(out: W, emitter: Emitter) -> Self {
        Self {
            out,
            emitter,
            error_count: 0,
            warning_count: 0,
        }
    }

    /// 输出诊断，诊断之间空一行
    pub fn emit(&mut self, diagnostic: Diagnostic) -> Result<()> {
        let level = diagnostic.level;
        let report = self.emitter.render(diagnostic)?;

        if self.error_count + self.warning_count > 0 {
            self.out.write_all(b"\n")?;
        }
        self.out.write_all(report.as_bytes())?;
        self.out.flush()?;

        match level {
            DiagnosticLevel::Error => self.error_count += 1,
            DiagnosticLevel::Warning => self.warning_count += 1,
        }
        tracing::debug!(%level, errors = self.error_count, warnings = self.warning_count, "emitted diagnostic");
        Ok(())
    }

    /// 在指定位置报告错误
    pub fn error_at(&mut self, origin: &SourceOrigin, message: impl Into<String>, code: impl Into<String>) -> Result<()> {
        self.emit(Diagnostic::error(code).with_message(origin, message))
    }

    /// 在指定位置报告警告
    pub fn warning_at(&mut self, origin: &SourceOrigin, message: impl Into<String>, code: impl Into<String>) -> Result<()> {
        self.emit(Diagnostic::warning(code).with_message(origin, message))
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// 获取警告数量
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// 取回输出流
    pub fn into_inner(self) -> W {
        self.out
    }
}
