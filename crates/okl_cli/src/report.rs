//! 根据命令行参数构造诊断

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use okl_diagnostics::{
    Annotation, Diagnostic, DiagnosticSink, Emitter, FrameKind, SourceBuffer, SourceOrigin,
};

use crate::cli::{Cli, Location};

/// 已加载的源文件，同一路径只读取一次
#[derive(Default)]
struct Sources {
    buffers: HashMap<PathBuf, SourceBuffer>,
}

impl Sources {
    fn load(&mut self, path: &Path) -> Result<SourceBuffer> {
        if let Some(buffer) = self.buffers.get(path) {
            return Ok(buffer.clone());
        }
        let buffer = SourceBuffer::from_path(path)
            .with_context(|| format!("could not load '{}'", path.display()))?;
        self.buffers.insert(path.to_path_buf(), buffer.clone());
        Ok(buffer)
    }

    fn origin(&mut self, main: &Path, location: &Location) -> Result<SourceOrigin> {
        let path = location.file.as_deref().unwrap_or(main);
        let buffer = self.load(path)?;
        let position = buffer
            .position(location.range.clone())
            .with_context(|| format!("bad location in '{}'", path.display()))?;
        Ok(SourceOrigin::at(buffer, position))
    }
}

/// 构造诊断
pub fn build(cli: &Cli) -> Result<Diagnostic> {
    let mut sources = Sources::default();
    let primary = Location {
        file: None,
        range: cli.span.clone(),
    };
    let target = sources.origin(&cli.file, &primary)?;

    // 从最外层的 include 开始逐层进入
    let origin = match cli.included_from.split_first() {
        Some((outermost, rest)) => {
            let mut origin = sources.origin(&cli.file, outermost)?;
            for site in rest {
                let site = sources.origin(&cli.file, site)?;
                origin.push_origin(FrameKind::Include, &site);
            }
            origin.push_origin(FrameKind::Include, &target);
            origin
        }
        None => target,
    };
    tracing::debug!(depth = origin.depth(), "primary origin");

    let mut diagnostic = match cli.warning {
        true => Diagnostic::warning(&cli.code),
        false => Diagnostic::error(&cli.code),
    }
    .with_message(&origin, &cli.message);

    for label in &cli.labels {
        let source = sources.origin(&cli.file, &label.location)?;
        diagnostic.add(Annotation::new(source, &label.text));
    }

    Ok(diagnostic)
}

/// 根据参数配置输出器
pub fn emitter(cli: &Cli) -> Emitter {
    let emitter = match cli.no_color {
        true => Emitter::without_colors(),
        false => Emitter::new(),
    };
    emitter.with_max_sources(cli.max_sources)
}

/// 构造并输出诊断，返回是否报告了错误
pub fn run(cli: &Cli, out: impl io::Write) -> Result<bool> {
    let diagnostic = build(cli)?;
    let mut sink = DiagnosticSink::new(out, emitter(cli));
    sink.emit(diagnostic)?;
    Ok(sink.has_errors())
}
