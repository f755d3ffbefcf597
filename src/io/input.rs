use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Resolve a text argument
///
/// - `-` reads stdin
/// - `@path` reads the file at `path`
/// - an argument naming an existing file reads that file
/// - anything else is taken literally
pub fn read_text(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }

    if let Some(path) = arg.strip_prefix('@') {
        return read_file(Path::new(path));
    }

    let path = Path::new(arg);
    if !arg.contains('\n') && path.is_file() {
        debug!("Argument names an existing file, reading {:?}", path);
        return read_file(path);
    }

    Ok(arg.to_string())
}

/// Resolve an optional override file, falling back to built-in text
pub fn read_or_default(path: Option<&Path>, default: &str) -> Result<String> {
    match path {
        Some(path) => read_file(path),
        None => Ok(default.to_string()),
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_literal_text() {
        assert_eq!(read_text("Summarize this").unwrap(), "Summarize this");
        assert_eq!(read_text("line one\nline two").unwrap(), "line one\nline two");
    }

    #[test]
    fn test_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "from file").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        assert_eq!(read_text(&path).unwrap(), "from file");
        assert_eq!(read_text(&format!("@{}", path)).unwrap(), "from file");
    }

    #[test]
    fn test_missing_path_stays_literal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("README");
        let arg = missing.to_str().unwrap();

        assert_eq!(read_text(arg).unwrap(), arg);

        std::fs::write(&missing, "readme body").unwrap();
        assert_eq!(read_text(arg).unwrap(), "readme body");
    }

    #[test]
    fn test_forced_missing_file() {
        assert!(read_text("@/definitely/not/here.txt").is_err());
    }

    #[test]
    fn test_read_or_default() {
        assert_eq!(read_or_default(None, "builtin").unwrap(), "builtin");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "custom guide").unwrap();
        assert_eq!(
            read_or_default(Some(file.path()), "builtin").unwrap(),
            "custom guide"
        );
    }
}
