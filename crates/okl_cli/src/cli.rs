//! 命令行参数

use std::ops::Range;
use std::path::PathBuf;

use clap::Parser;
use okl_diagnostics::DEFAULT_MAX_ERRORS_DISPLAYED;

/// Render an OKL compiler diagnostic anchored at byte ranges of source files.
///
/// Locations are written as `[FILE:]START..END`; without a file they refer
/// to the primary source file.
#[derive(Parser, Debug)]
#[command(name = "okl-diag")]
#[command(version)]
#[command(about = "Render an OKL compiler diagnostic")]
pub struct Cli {
    /// Source file the primary message points into
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Byte range of the primary span
    #[arg(long, value_name = "START..END", value_parser = parse_range)]
    pub span: Range<usize>,

    /// Primary message
    #[arg(short, long)]
    pub message: String,

    /// Error code shown next to the severity
    #[arg(long, default_value = "")]
    pub code: String,

    /// Report a warning instead of an error
    #[arg(long)]
    pub warning: bool,

    /// Secondary annotation, may be repeated
    #[arg(short, long = "label", value_name = "[FILE:]START..END=TEXT", value_parser = parse_label)]
    pub labels: Vec<Label>,

    /// Enclosing #include site, outermost first; may be repeated
    #[arg(long = "included-from", value_name = "[FILE:]START..END", value_parser = parse_location)]
    pub included_from: Vec<Location>,

    /// Maximum number of annotations shown outside the primary line
    #[arg(long, default_value_t = DEFAULT_MAX_ERRORS_DISPLAYED)]
    pub max_sources: usize,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// 某个文件中的字节范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// 为空时表示主源文件
    pub file: Option<PathBuf>,
    pub range: Range<usize>,
}

/// 附加标注
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub location: Location,
    pub text: String,
}

pub fn parse_range(s: &str) -> Result<Range<usize>, String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{}'", s))?;
    let start = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid start offset '{}': {}", start, e))?;
    let end = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid end offset '{}': {}", end, e))?;
    Ok(start..end)
}

pub fn parse_location(s: &str) -> Result<Location, String> {
    match s.rsplit_once(':') {
        Some((file, range)) if !file.is_empty() => Ok(Location {
            file: Some(PathBuf::from(file)),
            range: parse_range(range)?,
        }),
        _ => Ok(Location {
            file: None,
            range: parse_range(s.trim_start_matches(':'))?,
        }),
    }
}

pub fn parse_label(s: &str) -> Result<Label, String> {
    let (location, text) = s
        .split_once('=')
        .ok_or_else(|| format!("expected [FILE:]START..END=TEXT, got '{}'", s))?;
    Ok(Label {
        location: parse_location(location)?,
        text: text.to_string(),
    })
}
