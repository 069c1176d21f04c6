// Parsers for the plain-text output of rclone subcommands

use crate::models::DirectoryEntry;

/// Parse `rclone lsd` output.
///
/// rclone prints `size date time count name`, where the name may contain
/// spaces. Lines that do not follow that layout are kept whole as the name.
pub fn parse_lsd(stdout: &str) -> Vec<DirectoryEntry> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| parse_lsd_line(line).unwrap_or_else(|| DirectoryEntry::named(line)))
        .collect()
}

fn parse_lsd_line(line: &str) -> Option<DirectoryEntry> {
    let (cols, name) = split_columns(line, 4)?;
    cols[0].parse::<i64>().ok()?;
    let count = cols[3].parse::<i64>().ok()?;
    if name.is_empty() {
        return None;
    }
    Some(DirectoryEntry {
        name: name.to_string(),
        modified: Some(format!("{} {}", cols[1], cols[2])),
        count: if count < 0 { None } else { Some(count) },
    })
}

/// Split off `n` whitespace-separated columns and return the untouched rest.
fn split_columns(line: &str, n: usize) -> Option<(Vec<&str>, &str)> {
    let mut rest = line.trim_start();
    let mut cols = Vec::with_capacity(n);
    for _ in 0..n {
        let end = rest.find(char::is_whitespace)?;
        cols.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    Some((cols, rest.trim_end()))
}

/// Whether `rclone listremotes` output contains the remote `name`.
pub fn remote_exists(listremotes_stdout: &str, name: &str) -> bool {
    listremotes_stdout
        .lines()
        .map(str::trim)
        .any(|line| line.strip_suffix(':') == Some(name))
}

/// Read `key = value` from `rclone config show <name>` output.
pub fn config_value(show_stdout: &str, key: &str) -> Option<String> {
    show_stdout.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        if k.trim() == key {
            Some(v.trim().to_string())
        } else {
            None
        }
    })
}

/// Drop every line that carries a secret from `rclone config show` output.
pub fn redact_profile_text(show_stdout: &str) -> String {
    show_stdout
        .lines()
        .filter(|line| {
            let lower = line.to_ascii_lowercase();
            !(lower.contains("pass") || lower.contains("2fa") || lower.contains("token"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First non-empty line, e.g. `rclone v1.66.0` from `rclone version`.
pub fn first_line(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).find(|l| !l.is_empty())
}
