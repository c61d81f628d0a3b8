use crate::annotate::{ActionCounts, AnnotateOptions, HandleStatus, annotate_source};
use crate::error::{AnnotateError, Result};
use crate::imports::ImportStatus;
use crate::module_map::ModuleMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Options for an annotate run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub annotate: AnnotateOptions,
    /// Compute changes without writing files
    pub dry_run: bool,
}

/// What happened to a single page file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub module: String,
    pub import: ImportStatus,
    pub handle: HandleStatus,
    pub gated: ActionCounts,
    pub already_gated: ActionCounts,
    /// The annotated text differs from the file contents
    pub changed: bool,
    /// The file was rewritten on disk
    pub written: bool,
}

/// Summary of a run over a pages tree
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
    /// Map entries with no matching file under the root
    pub missing: Vec<String>,
}

impl RunSummary {
    pub fn updated(&self) -> usize {
        self.outcomes.iter().filter(|o| o.changed).count()
    }

    pub fn unchanged(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.changed).count()
    }

    /// Files where the handle could not be inserted for lack of an anchor
    pub fn anchor_skips(&self) -> Vec<&FileOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.handle == HandleStatus::MissingAnchor)
            .collect()
    }

    pub fn total_gated(&self) -> ActionCounts {
        self.outcomes.iter().fold(ActionCounts::default(), |acc, o| ActionCounts {
            create: acc.create + o.gated.create,
            edit: acc.edit + o.gated.edit,
            delete: acc.delete + o.gated.delete,
        })
    }
}

/// Callback invoked as each page file is processed
pub type RunProgressCallback = Arc<dyn Fn(&FileOutcome) + Send + Sync>;

/// Find the first file named `file_name` under `root`, visiting entries in
/// file-name order
pub fn find_page_file(root: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| AnnotateError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && entry.file_name().to_str() == Some(file_name) {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}

/// Annotate one file, rewriting it only when its contents change
pub fn annotate_file(path: &Path, module: &str, options: &RunOptions) -> Result<FileOutcome> {
    debug!("Processing {} as module {}", path.display(), module);

    let original = fs::read_to_string(path).map_err(|source| AnnotateError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let annotation = annotate_source(&original, module, &options.annotate);
    let changed = annotation.text != original;

    let written = if changed && !options.dry_run {
        fs::write(path, &annotation.text).map_err(|source| AnnotateError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Updated {}", path.display());
        true
    } else {
        false
    };

    Ok(FileOutcome {
        path: path.to_path_buf(),
        module: module.to_string(),
        import: annotation.import,
        handle: annotation.handle,
        gated: annotation.gated,
        already_gated: annotation.already_gated,
        changed,
        written,
    })
}

/// Annotate every page file named in `map` found under `root`
pub fn annotate_tree(
    root: &Path,
    map: &ModuleMap,
    options: &RunOptions,
    progress: Option<RunProgressCallback>,
) -> Result<RunSummary> {
    info!("Annotating {} page(s) under {}", map.len(), root.display());

    let mut summary = RunSummary::default();

    for (file_name, module) in map.iter() {
        let Some(path) = find_page_file(root, file_name)? else {
            debug!("No {} under {}", file_name, root.display());
            summary.missing.push(file_name.to_string());
            continue;
        };

        let outcome = annotate_file(&path, module, options)?;
        if let Some(ref callback) = progress {
            callback(&outcome);
        }
        summary.outcomes.push(outcome);
    }

    Ok(summary)
}
