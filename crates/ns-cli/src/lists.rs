use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use ns_compiler::{compile_file_with, CompileError, CompileStats, DropReason, ListCompiler};
use ns_core::list::CompiledFilterList;
use serde::Serialize;

/// `--list` argument: `NAME=PATH` or a bare `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSpec {
    pub name: Option<String>,
    pub path: PathBuf,
}

impl FromStr for ListSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty list specification".to_string());
        }
        match s.split_once('=') {
            Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok(Self {
                name: Some(name.to_string()),
                path: PathBuf::from(path),
            }),
            Some(_) => Err(format!("invalid list specification '{}', expected NAME=PATH", s)),
            None => Ok(Self {
                name: None,
                path: PathBuf::from(s),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedEntry {
    pub line: usize,
    pub reason: String,
    pub text: String,
}

pub struct LoadedList {
    pub list: Arc<CompiledFilterList>,
    pub path: PathBuf,
    pub stats: CompileStats,
    pub dropped: Vec<DroppedEntry>,
    pub elapsed_ms: f64,
}

/// Compile one list file. Blank lines are never recorded as dropped entries.
pub fn load_list(spec: &ListSpec, keep_dropped: bool) -> Result<LoadedList, String> {
    let start = Instant::now();
    let mut dropped = Vec::new();
    let on_drop = |line: ns_compiler::DroppedLine<'_>| {
        if keep_dropped && line.reason != DropReason::Blank {
            dropped.push(DroppedEntry {
                line: line.line_number,
                reason: line.reason.to_string(),
                text: line.text.to_string(),
            });
        }
    };

    let compiler = ListCompiler::with_diagnostics(on_drop);
    let compiler = match &spec.name {
        Some(name) => compiler.with_name(name),
        None => compiler.with_fallback_name(&fallback_name(&spec.path)),
    };

    let (list, stats) = compile_file_with(compiler, &spec.path).map_err(|e| match e {
        CompileError::Open { .. } => e.to_string(),
        CompileError::Read(_) => format!("Failed to read '{}': {}", spec.path.display(), e),
    })?;

    Ok(LoadedList {
        list: Arc::new(list),
        path: spec.path.clone(),
        stats,
        dropped,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}

/// Compile every list on the blocking pool, keeping the configured order.
pub async fn load_lists(specs: &[ListSpec], keep_dropped: bool) -> Result<Vec<LoadedList>, String> {
    if specs.is_empty() {
        return Err("No filter lists specified".to_string());
    }

    let handles: Vec<_> = specs
        .iter()
        .cloned()
        .map(|spec| tokio::task::spawn_blocking(move || load_list(&spec, keep_dropped)))
        .collect();

    let mut loaded = Vec::with_capacity(handles.len());
    for handle in handles {
        let list = handle
            .await
            .map_err(|e| format!("Compile task failed: {}", e))??;
        log::debug!("Loaded '{}' from {}", list.list.name(), list.path.display());
        loaded.push(list);
    }

    Ok(loaded)
}

fn fallback_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
