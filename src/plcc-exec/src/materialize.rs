//! Writing request inputs into the workspace.

use std::path::{Component, Path};

use tracing::debug;

use crate::error::{ExecError, ExecResult};
use crate::types::InputFile;
use crate::workspace::Workspace;

/// Check that `name` is a single plain file name.
///
/// Rejects empty names, `.` and `..`, separators, NUL bytes and anything
/// that would resolve outside the workspace root.
pub fn validate_file_name(name: &str) -> ExecResult<()> {
    let invalid = |reason| {
        Err(ExecError::InvalidFileName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("name is empty");
    }
    if name.contains('\0') {
        return invalid("name contains a NUL byte");
    }
    if name.contains('/') || name.contains('\\') {
        return invalid("name contains a path separator");
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => invalid("name is not a plain file name"),
    }
}

/// Write every input file directly under the workspace root.
///
/// All names are validated before anything is written. Existing files are
/// overwritten.
pub(crate) async fn materialize(workspace: &Workspace, inputs: &[InputFile]) -> ExecResult<()> {
    for input in inputs {
        validate_file_name(&input.name)?;
    }

    for input in inputs {
        let path = workspace.join(&input.name);
        tokio::fs::write(&path, input.contents.as_bytes())
            .await
            .map_err(|source| ExecError::WriteInput {
                name: input.name.clone(),
                source,
            })?;
        debug!(
            file = %input.name,
            bytes = input.contents.as_bytes().len(),
            "Input written"
        );
    }

    Ok(())
}
