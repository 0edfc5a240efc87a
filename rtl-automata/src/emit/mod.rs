//! Artifacts produced from a validated machine.
//!
//! Every emitter only reads the [`Machine`]; they may run in any order.

mod graph;
mod testbench;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempPath};

pub use graph::{render_graph, Dot, GraphFormat, Mermaid};
pub use testbench::{
    render_testbench, TestbenchKind, TestbenchOptions, VerilatorHarness, VerilogTestbench,
};

use crate::error::{Error, Result};
use crate::lower::render_rtl;
use crate::model::Machine;

/// The closed set of things that can be rendered from a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitter {
    Rtl,
    Graph(GraphFormat),
    Testbench(TestbenchKind, TestbenchOptions),
}

impl Emitter {
    pub fn render(&self, machine: &Machine) -> Result<String> {
        let text = match *self {
            Emitter::Rtl => render_rtl(machine)?,
            Emitter::Graph(format) => render_graph(machine, format),
            Emitter::Testbench(kind, opts) => render_testbench(machine, kind, opts),
        };
        log::debug!("rendered {:?} for `{}` ({} bytes)", self, machine.name(), text.len());
        Ok(text)
    }
}

/// Rendered text and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

impl Artifact {
    /// Renders `emitter` for `machine`, destined for `path`.
    pub fn render(emitter: Emitter, machine: &Machine, path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            contents: emitter.render(machine)?,
        })
    }
}

/// Writes all artifacts or none of them.
///
/// Contents are staged in temporary files beside their destinations and only
/// renamed into place once every one of them was written successfully. A
/// destination that already exists is moved aside first and put back if a
/// later rename fails.
pub fn write_artifacts(artifacts: &[Artifact]) -> Result<()> {
    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        staged.push((stage(artifact)?, artifact.path.as_path()));
    }

    let mut persisted: Vec<(&Path, Option<TempPath>)> = Vec::new();
    for (file, path) in staged {
        let backup = match set_aside(path) {
            Ok(backup) => backup,
            Err(e) => {
                roll_back(persisted);
                return Err(Error::resource(path, e));
            }
        };
        if let Err(e) = file.persist(path) {
            // The failed destination was never replaced; only restore it.
            if let Some(backup) = backup {
                restore(path, backup);
            }
            roll_back(persisted);
            return Err(Error::resource(path, e.error));
        }
        log::debug!("wrote `{}`", path.display());
        persisted.push((path, backup));
    }
    Ok(())
}

/// Moves an existing regular file at `path` to a temporary name in the same
/// directory. The temporary file is deleted when the returned handle drops.
fn set_aside(path: &Path) -> io::Result<Option<TempPath>> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_file() => {
            let backup = NamedTempFile::new_in(parent_dir(path))?.into_temp_path();
            fs::rename(path, &backup)?;
            Ok(Some(backup))
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn restore(path: &Path, backup: TempPath) {
    if let Err(e) = fs::rename(&backup, path) {
        log::warn!(
            "could not restore `{}` from `{}`: {e}",
            path.display(),
            backup.display()
        );
        // Leave the saved contents on disk rather than losing them.
        if let Err(e) = backup.keep() {
            log::warn!("could not keep backup of `{}`: {e}", path.display());
        }
    }
}

/// Undoes already persisted artifacts, newest first.
fn roll_back(persisted: Vec<(&Path, Option<TempPath>)>) {
    for (path, backup) in persisted.into_iter().rev() {
        match backup {
            Some(backup) => restore(path, backup),
            None => {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("could not remove partially written `{}`: {e}", path.display());
                }
            }
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn stage(artifact: &Artifact) -> Result<NamedTempFile> {
    let path = &artifact.path;
    let mut file =
        NamedTempFile::new_in(parent_dir(path)).map_err(|e| Error::resource(path, e))?;
    file.write_all(artifact.contents.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| Error::resource(path, e))?;
    Ok(file)
}
