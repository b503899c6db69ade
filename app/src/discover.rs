use std::path::{Path, PathBuf};

use glob::glob;

use pcd_store::is_point_cloud_path;

use crate::error::CliError;

/// All LAS/LAZ files below `root`, in path order. A single file is
/// accepted as its own input.
pub fn find_point_cloud_files(root: &Path) -> Result<Vec<PathBuf>, CliError> {
    let mut files = Vec::new();
    if root.is_file() {
        if is_point_cloud_path(root) {
            files.push(root.to_path_buf());
        }
    } else {
        let escaped = glob::Pattern::escape(&root.to_string_lossy());
        let pattern = Path::new(&escaped).join("**").join("*");
        for entry in glob(&pattern.to_string_lossy())? {
            let path = entry?;
            if path.is_file() && is_point_cloud_path(&path) {
                files.push(path);
            }
        }
        files.sort();
    }

    if files.is_empty() {
        return Err(CliError::NoInput(root.to_path_buf()));
    }
    Ok(files)
}

/// Where the cleaned copy of `file` goes so that the output tree mirrors
/// the input tree.
pub fn mirror_path(input_root: &Path, file: &Path, output_root: &Path) -> Result<PathBuf, CliError> {
    if file == input_root {
        let name = file.file_name().ok_or_else(|| CliError::OutsideInput {
            file: file.to_path_buf(),
            root: input_root.to_path_buf(),
        })?;
        return Ok(output_root.join(name));
    }

    let relative = file
        .strip_prefix(input_root)
        .map_err(|_| CliError::OutsideInput {
            file: file.to_path_buf(),
            root: input_root.to_path_buf(),
        })?;
    Ok(output_root.join(relative))
}
