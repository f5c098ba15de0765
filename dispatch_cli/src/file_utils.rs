use std::path::{Path, PathBuf};

/// Every `.json` file under the folder, recursively and sorted.
pub fn read_json_files(folder_path: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder_path)? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(read_json_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }

    files.sort();

    Ok(files)
}

/// The input itself when it is a file, its json files otherwise.
pub fn input_files(input: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if input.is_file() {
        Ok(vec![input.to_path_buf()])
    } else {
        read_json_files(input)
    }
}

pub fn write_output(out: &Path, content: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(out, content)
}
