//! Netsift Filter List Compiler
//!
//! This crate compiles Adblock Plus style filter lists into the categorized
//! rule tables matched by `ns-core`. Compilation is lossy: lines the
//! engine does not model are dropped (and reported), never treated as errors.
//! The only failure is being unable to read the source.

pub mod parser;
pub mod options;
pub mod optimizer;
pub mod builder;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use ns_core::list::CompiledFilterList;
use ns_core::orchestrator::SharedFilterSet;

pub use builder::ListCompiler;
pub use optimizer::CompileStats;
pub use parser::{parse_line, DropReason, DroppedLine};

/// Error type for reading a filter list source.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read filter list: {0}")]
    Read(#[from] io::Error),
}

/// Compile filter-list lines. Never fails.
pub fn compile<I, S>(lines: I) -> CompiledFilterList
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    compile_with_diagnostics(lines, |_| {})
}

/// Compile a whole filter-list document.
pub fn compile_str(text: &str) -> CompiledFilterList {
    compile(text.lines())
}

/// Compile, reporting every dropped line to `on_drop`.
pub fn compile_with_diagnostics<I, S, F>(lines: I, on_drop: F) -> CompiledFilterList
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnMut(DroppedLine<'_>),
{
    let mut compiler = ListCompiler::with_diagnostics(on_drop);
    for line in lines {
        compiler.feed_line(line.as_ref());
    }
    compiler.finish().0
}

/// Stream a list from a reader into `compiler`.
///
/// Invalid UTF-8 is replaced rather than rejected; only I/O failures surface.
pub fn feed_reader<R, F>(compiler: &mut ListCompiler<F>, mut reader: R) -> Result<(), CompileError>
where
    R: BufRead,
    F: FnMut(DroppedLine<'_>),
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        compiler.feed_line(line.trim_end_matches(['\n', '\r']));
    }
}

/// Compile a list from a reader; the list is named by its `! Title:` header.
pub fn compile_reader<R: BufRead>(reader: R) -> Result<CompiledFilterList, CompileError> {
    let mut compiler = ListCompiler::new();
    feed_reader(&mut compiler, reader)?;
    Ok(compiler.finish().0)
}

/// Compile a list file under an explicit name, returning its statistics.
pub fn compile_file(name: &str, path: &Path) -> Result<(CompiledFilterList, CompileStats), CompileError> {
    compile_file_with(ListCompiler::new().with_name(name), path)
}

/// Compile a list file through a configured compiler (name, drop callback).
pub fn compile_file_with<F>(
    mut compiler: ListCompiler<F>,
    path: &Path,
) -> Result<(CompiledFilterList, CompileStats), CompileError>
where
    F: FnMut(DroppedLine<'_>),
{
    let file = File::open(path).map_err(|source| CompileError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    feed_reader(&mut compiler, BufReader::new(file))?;
    Ok(compiler.finish())
}

/// Recompile one list and swap it into `set`.
///
/// On failure the previously installed table stays in place and the error is
/// returned to the caller.
pub fn reload_list<R: BufRead>(set: &SharedFilterSet, name: &str, reader: R) -> Result<CompileStats, CompileError> {
    let mut compiler = ListCompiler::new().with_name(name);
    if let Err(e) = feed_reader(&mut compiler, reader) {
        log::warn!("Keeping previous '{}' table: {}", name, e);
        return Err(e);
    }
    let (list, stats) = compiler.finish();
    set.replace_list(list);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use ns_core::orchestrator::FilterSet;
    use ns_core::types::RequestDescriptor;

    use super::*;

    /// Yields some bytes, then fails.
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn compile_reader_handles_crlf_and_invalid_utf8() {
        let mut bytes = b"! Title: CRLF\r\n||ads.net^|\r\n".to_vec();
        bytes.extend_from_slice(b"||bad\xff.net^\n");
        let list = compile_reader(Cursor::new(bytes)).unwrap();

        assert_eq!(list.name(), "CRLF");
        assert_eq!(list.rule_count(), 2);
        let request = RequestDescriptor::new(None, "https://x.com/ads.net", false);
        assert!(ns_core::evaluate(&list, &request).is_blocked());
    }

    #[test]
    fn compile_accepts_any_string_lines() {
        let owned = vec!["||a.com^".to_string(), "||b.com^".to_string()];
        assert_eq!(compile(owned).rule_count(), 2);
        assert_eq!(compile(["||a.com^"]).rule_count(), 1);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = compile_file("missing", Path::new("/nonexistent/netsift/list.txt")).unwrap_err();
        assert!(matches!(err, CompileError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/netsift/list.txt"));
    }

    #[test]
    fn compile_file_with_reports_drops() {
        let path = std::env::temp_dir().join(format!("netsift-compile-{}.txt", std::process::id()));
        std::fs::write(&path, "! Title: Temp\n||ads.net^\n##.banner\n").unwrap();

        let mut reasons = Vec::new();
        let compiler = ListCompiler::with_diagnostics(|line: DroppedLine<'_>| reasons.push(line.reason))
            .with_fallback_name("temp");
        let result = compile_file_with(compiler, &path);
        std::fs::remove_file(&path).unwrap();

        let (list, stats) = result.unwrap();
        assert_eq!(list.name(), "Temp");
        assert_eq!(stats.rules, 1);
        assert_eq!(reasons, vec![DropReason::ElementHiding]);
    }

    #[test]
    fn failed_reload_keeps_previous_table() {
        let set = SharedFilterSet::new(FilterSet::default());
        reload_list(&set, "ads", Cursor::new(b"||ads.net^\n".to_vec())).unwrap();

        let request = RequestDescriptor::new(None, "https://ads.net/x.js", false);
        assert!(set.evaluate(&request).is_blocked());

        let failing = BufReader::new(FailingReader {
            data: Cursor::new(b"@@||ads.net^\n".to_vec()),
        });
        let err = reload_list(&set, "ads", failing).unwrap_err();
        assert!(matches!(err, CompileError::Read(_)));

        assert!(set.evaluate(&request).is_blocked());
        assert_eq!(set.list_count(), 1);
    }

    #[test]
    fn successful_reload_replaces_table() {
        let set = SharedFilterSet::new(FilterSet::default());
        reload_list(&set, "ads", Cursor::new(b"||ads.net^\n".to_vec())).unwrap();
        let stats = reload_list(&set, "ads", Cursor::new(b"||other.net^\n! c\n".to_vec())).unwrap();
        assert_eq!(stats.rules, 1);
        assert_eq!(stats.dropped, 1);

        assert!(set
            .evaluate(&RequestDescriptor::new(None, "https://ads.net/x.js", false))
            .is_default());
        assert!(set
            .evaluate(&RequestDescriptor::new(None, "https://other.net/x.js", false))
            .is_blocked());
        assert_eq!(set.list_count(), 1);
    }
}
