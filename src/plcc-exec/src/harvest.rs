//! Collecting tool outputs from the workspace.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::types::{InputFile, NamedOutput, OutputSpec};
use crate::workspace::Workspace;

/// Collect the files described by `spec`.
///
/// Never fails: a file that exists but cannot be read or decoded is stored
/// as a placeholder message instead.
pub(crate) async fn harvest(
    workspace: &Workspace,
    spec: &OutputSpec,
    inputs: &[InputFile],
) -> BTreeMap<String, String> {
    match spec {
        OutputSpec::Named(outputs) => harvest_named(workspace, outputs).await,
        OutputSpec::Enumerate { exclude } => {
            let excluded: BTreeSet<&str> = inputs
                .iter()
                .map(|input| input.name.as_str())
                .chain(exclude.iter().map(String::as_str))
                .collect();
            harvest_all(workspace, &excluded).await
        }
    }
}

async fn harvest_named(
    workspace: &Workspace,
    outputs: &[NamedOutput],
) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for output in outputs {
        let path = workspace.join(&output.file_name);
        match read_output(&path, &output.file_name).await {
            Some(content) => {
                files.insert(output.key.clone(), content);
            }
            None => debug!(file = %output.file_name, "Expected output not produced"),
        }
    }
    files
}

async fn harvest_all(workspace: &Workspace, excluded: &BTreeSet<&str>) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();

    let mut entries = match tokio::fs::read_dir(workspace.path()).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                workspace = %workspace.path().display(),
                error = %e,
                "Failed to list workspace"
            );
            return files;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read workspace entry");
                break;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if excluded.contains(name.as_str()) {
            continue;
        }

        match entry.file_type().await {
            Ok(file_type) if file_type.is_file() => {}
            Ok(_) => {
                debug!(file = %name, "Skipping non-regular workspace entry");
                continue;
            }
            Err(e) => {
                files.insert(name.clone(), placeholder(&name, &e.to_string()));
                continue;
            }
        }

        if let Some(content) = read_output(&entry.path(), &name).await {
            files.insert(name, content);
        }
    }

    files
}

/// Read an output file as text. `None` if it does not exist.
async fn read_output(path: &Path, name: &str) -> Option<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(String::from_utf8(bytes).unwrap_or_else(|e| {
            warn!(file = %name, error = %e, "Output is not valid UTF-8");
            placeholder(name, &e.to_string())
        })),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(file = %name, error = %e, "Failed to read output");
            Some(placeholder(name, &e.to_string()))
        }
    }
}

fn placeholder(name: &str, reason: &str) -> String {
    format!("<error reading {name}: {reason}>")
}
