use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

/// Bytes read from the end of the file; enough for any sensible `max_lines`.
const TAIL_WINDOW: u64 = 256 * 1024;

/// Last `max_lines` lines of the text file at `path`, trimmed.
///
/// Only the final [`TAIL_WINDOW`] bytes are read, so a large log costs no
/// more than a small one. Never fails: a missing or unreadable file yields a
/// placeholder line that ends up in the mail instead.
pub fn tail_text(path: impl AsRef<Path>, max_lines: usize) -> String {
    let path = path.as_ref();
    match read_suffix(path, TAIL_WINDOW) {
        Ok((bytes, truncated)) => {
            let text = String::from_utf8_lossy(&bytes);
            let mut lines: Vec<&str> = text.lines().collect();
            if truncated && !lines.is_empty() {
                // first line of the window is probably cut
                lines.remove(0);
            }
            let start = lines.len().saturating_sub(max_lines);
            lines[start..].join("\n").trim().to_string()
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            format!("(Nu am gasit {})", path.display())
        }
        Err(e) => format!("(Eroare la citirea {}: {e})", path.display()),
    }
}

/// At most `window` trailing bytes of the file, and whether anything before
/// them was skipped.
fn read_suffix(path: &Path, window: u64) -> io::Result<(Vec<u8>, bool)> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let start = len.saturating_sub(window);
    file.seek(SeekFrom::Start(start))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok((bytes, start > 0))
}
