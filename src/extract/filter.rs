//! Entry selection by name.

use std::path::Path;

use super::options::ExtractOptions;
use crate::zip::ZipEntry;

/// Decide whether `entry` takes part in a run with `options`.
///
/// - with include patterns, only file entries matching one are kept
///   (directories are then implied by the files' parents)
/// - with junk paths, directory entries are dropped
/// - entries matching an exclude pattern are dropped
pub fn is_selected(entry: &ZipEntry, options: &ExtractOptions) -> bool {
    if entry.is_directory && (options.junk_paths || !options.include.is_empty()) {
        return false;
    }

    if !options.include.is_empty()
        && !options
            .include
            .iter()
            .any(|pattern| matches_include(pattern, &entry.file_name))
    {
        return false;
    }

    !options
        .exclude
        .iter()
        .any(|x| entry.file_name.contains(x.as_str()) || glob_match(x, &entry.file_name))
}

/// Globs match the whole name; plain patterns match the full name or the
/// base name.
fn matches_include(pattern: &str, name: &str) -> bool {
    if has_glob_chars(pattern) {
        return glob_match(pattern, name);
    }
    let basename = Path::new(name)
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    name == pattern || basename == pattern
}

/// Check if a pattern contains glob wildcard characters.
fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    // Iterative matcher with single-star backtracking
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text_chars.len() {
        match pattern_chars.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text_chars[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern_chars[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::CompressionMethod;

    fn entry(name: &str) -> ZipEntry {
        ZipEntry {
            file_name: name.to_string(),
            compression_method: CompressionMethod::Stored,
            compressed_size: 0,
            uncompressed_size: 0,
            crc32: 0,
            flags: 0,
            lfh_offset: 0,
            data_offset: 0,
            last_mod_time: 0,
            last_mod_date: 0,
            is_directory: name.ends_with('/'),
        }
    }

    #[test]
    fn glob_basics() {
        assert!(glob_match("*.txt", "readme.txt"));
        assert!(glob_match("file?.dat", "file1.dat"));
        assert!(!glob_match("*.txt", "readme.md"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("?", ""));
    }

    #[test]
    fn default_options_select_everything() {
        let options = ExtractOptions::default();
        assert!(is_selected(&entry("a/"), &options));
        assert!(is_selected(&entry("a/b.txt"), &options));
    }

    #[test]
    fn include_by_basename_or_glob() {
        let options = ExtractOptions::default().include(["b.txt", "*.md"]);
        assert!(is_selected(&entry("a/b.txt"), &options));
        assert!(is_selected(&entry("docs/readme.md"), &options));
        assert!(!is_selected(&entry("a/c.txt"), &options));
        assert!(!is_selected(&entry("a/"), &options));
    }

    #[test]
    fn exclude_wins() {
        let options = ExtractOptions::default().exclude(["secret"]);
        assert!(!is_selected(&entry("a/secret.txt"), &options));
        assert!(is_selected(&entry("a/public.txt"), &options));
    }

    #[test]
    fn junk_paths_drops_directories() {
        let options = ExtractOptions::default().junk_paths(true);
        assert!(!is_selected(&entry("a/"), &options));
        assert!(is_selected(&entry("a/b.txt"), &options));
    }
}
