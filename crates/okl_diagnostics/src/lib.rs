//! OKL Diagnostics
//!
//! 内核语言编译前端的源码位置与诊断输出系统。词法、语法和类型检查阶段
//! 用它记录位置（包括 `#include` 和宏展开带来的上下文），并把错误和警告
//! 连同源码片段一起输出。
//!
//! # 核心类型
//!
//! - [`SourceBuffer`] - 不可变的共享源码缓冲区
//! - [`SourcePosition`] - 缓冲区内的字节范围
//! - [`SourceOrigin`] - 带 include/宏展开上下文栈的位置
//! - [`Annotation`] - 附加源码标注
//! - [`Diagnostic`] - 诊断信息主体
//! - [`Emitter`] - 诊断输出器
//! - [`DiagnosticSink`] - 诊断输出目标
//!
//! # 示例
//!
//! ```rust
//! use okl_diagnostics::{Diagnostic, Emitter, SourceBuffer, SourceOrigin};
//!
//! let buffer = SourceBuffer::new("add.okl", "@kernel void add(int N) {\n  N += 1;\n}\n");
//! let decl = SourceOrigin::at(buffer.clone(), buffer.position(21..22).unwrap());
//! let write = SourceOrigin::at(buffer.clone(), buffer.position(28..29).unwrap());
//!
//! let report = Emitter::without_colors()
//!     .render(
//!         Diagnostic::error("E0101")
//!             .with_message(&write, "cannot assign to a kernel argument")
//!             .with_source(&write, "assigned here")
//!             .with_source(&decl, "declared here"),
//!     )
//!     .unwrap();
//!
//! assert!(report.starts_with("error[E0101]: cannot assign to a kernel argument"));
//! ```

pub mod annotation;
pub mod diagnostic;
pub mod emitter;
pub mod error;
pub mod level;
pub mod origin;
pub mod sink;
pub mod source;
pub mod span;

// 重新导出核心类型
pub use annotation::Annotation;
pub use diagnostic::{Diagnostic, DEFAULT_MAX_ERRORS_DISPLAYED};
pub use emitter::Emitter;
pub use error::{DiagnosticError, Result};
pub use level::DiagnosticLevel;
pub use origin::{FrameKind, SourceOrigin};
pub use sink::DiagnosticSink;
pub use source::SourceBuffer;
pub use span::SourcePosition;
