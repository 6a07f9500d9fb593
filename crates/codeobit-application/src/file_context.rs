//! Inlines resolved `@path` references into AI prompts.

use std::fs;
use std::path::Path;

/// Files larger than this are truncated.
pub const MAX_INLINE_FILE_BYTES: u64 = 100 * 1024;
/// Characters kept from a truncated file.
pub const TRUNCATED_FILE_CHARS: usize = 1000;
/// Entries shown for a referenced directory.
pub const MAX_DIR_ENTRIES: usize = 50;

/// Renders each `(token, path)` as a delimited block of file content or a
/// directory listing. Unreadable entries are rendered with the error so the
/// request still goes through.
pub fn render_references<'a, I>(references: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Path)>,
{
    let mut out = String::new();
    for (token, path) in references {
        let body = if path.is_dir() {
            render_directory(path)
        } else {
            render_file(path)
        };
        out.push_str(&format!("--- @{token} ({}) ---\n", path.display()));
        out.push_str(&body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn render_file(path: &Path) -> String {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => return format!("[Error reading file: {e}]"),
    };
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return format!("[Error reading file: {e}]"),
    };
    let text = String::from_utf8_lossy(&bytes);

    if size > MAX_INLINE_FILE_BYTES {
        tracing::debug!(path = %path.display(), size, "Truncating large referenced file");
        let head: String = text.chars().take(TRUNCATED_FILE_CHARS).collect();
        return format!(
            "[File too large: {size} bytes. Showing first {TRUNCATED_FILE_CHARS} characters]\n{head}\n[...truncated]\n"
        );
    }
    text.into_owned()
}

fn render_directory(path: &Path) -> String {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => return format!("[Error listing directory: {e}]"),
    };
    let mut items: Vec<(String, Option<u64>)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let size = entry
                .metadata()
                .ok()
                .filter(|meta| meta.is_file())
                .map(|meta| meta.len());
            (name, size)
        })
        .collect();
    items.sort();

    let mut out = format!("Directory listing for {}:\n", path.display());
    for (name, size) in items.iter().take(MAX_DIR_ENTRIES) {
        match size {
            Some(size) => out.push_str(&format!("file: {name} ({size} bytes)\n")),
            None => out.push_str(&format!("dir: {name}/\n")),
        }
    }
    if items.len() > MAX_DIR_ENTRIES {
        out.push_str(&format!(
            "... and {} more items\n",
            items.len() - MAX_DIR_ENTRIES
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_small_file_is_inlined_whole() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("app.py");
        fs::write(&file, "print('hi')\n").unwrap();

        let rendered = render_references([("app.py", file.as_path())]);
        assert!(rendered.starts_with("--- @app.py ("));
        assert!(rendered.contains("print('hi')\n"));
    }

    #[test]
    fn test_large_file_is_truncated() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("big.txt");
        fs::write(&file, "#".repeat(MAX_INLINE_FILE_BYTES as usize + 1)).unwrap();

        let rendered = render_references([("big.txt", file.as_path())]);
        assert!(rendered.contains("[File too large: 102401 bytes"));
        assert!(rendered.contains("[...truncated]"));
        let hash_count = rendered.chars().filter(|c| *c == '#').count();
        assert_eq!(hash_count, TRUNCATED_FILE_CHARS);
    }

    #[test]
    fn test_directory_listing_is_capped() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..55 {
            fs::write(temp_dir.path().join(format!("f{i:02}.rs")), "").unwrap();
        }
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join(".hidden"), "").unwrap();

        let rendered = render_references([("src", temp_dir.path())]);
        assert!(rendered.contains("file: f00.rs (0 bytes)"));
        assert!(!rendered.contains(".hidden"));
        assert!(!rendered.contains("sub/"));
        assert!(rendered.contains("... and 6 more items"));
    }
}
