//! Conversion between project paths and Claude's flattened directory names.
//!
//! On disk a project working directory like `/Users/ozan/Projects/app` is
//! stored as `-Users-ozan-Projects-app`: every `/` becomes `-`, and a path
//! segment's leading `.` becomes a doubled dash, so
//! `/Users/ozan/app/.worktrees/wip` encodes as
//! `-Users-ozan-app--worktrees-wip`.
//!
//! Encoding is total; decoding is lossless only for paths whose segments
//! contain no dashes. A segment like `my-project` encodes to `my-project`
//! and decodes to `my/project` — the encoding itself is ambiguous, which is
//! why matching always goes through [`encode_project_path`] on the
//! process's real cwd, and decoding is only a display fallback.

/// Convert a working directory to its on-disk directory name.
pub fn encode_project_path(path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);

    let mut result = String::from("-");
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' => {
                if chars.peek() == Some(&'.') {
                    // Hidden folder: double dash and drop the dot.
                    result.push('-');
                    result.push('-');
                    chars.next();
                } else {
                    result.push('-');
                }
            }
            _ => result.push(c),
        }
    }

    result
}

/// Best-effort inverse of [`encode_project_path`].
pub fn decode_project_dir_name(dir_name: &str) -> String {
    let name = dir_name.strip_prefix('-').unwrap_or(dir_name);

    let mut result = String::from("/");
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '-' {
            if chars.peek() == Some(&'-') {
                chars.next();
                result.push_str("/.");
            } else {
                result.push('/');
            }
        } else {
            result.push(c);
        }
    }

    result
}
