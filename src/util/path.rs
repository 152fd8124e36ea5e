pub const SEPARATOR: char = '/';

/// Maps caller paths to bucket keys under an optional key prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathPrefixer {
    prefix: String,
}

impl PathPrefixer {
    /// An empty or all-separator prefix means "no prefix"; anything else is
    /// stored with exactly one trailing separator.
    pub fn new(prefix: Option<&str>) -> Self {
        let trimmed = prefix.unwrap_or("").trim_matches(SEPARATOR);
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}{}", trimmed, SEPARATOR)
        };

        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn apply_prefix(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches(SEPARATOR))
    }

    pub fn remove_prefix<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }
}

/// Parent of `path`; the empty string at the root, never ".".
pub fn dirname(path: &str) -> &str {
    let path = path.trim_end_matches(SEPARATOR);
    match path.rfind(SEPARATOR) {
        Some(pos) => path[..pos].trim_end_matches(SEPARATOR),
        None => "",
    }
}

/// Last segment of `path`.
pub fn basename(path: &str) -> &str {
    let path = path.trim_end_matches(SEPARATOR);
    match path.rfind(SEPARATOR) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// `dir`, `dir/` and `dir//` all become `dir/`.
pub fn normalise_dir_name(path: &str) -> String {
    format!("{}{}", path.trim_end_matches(SEPARATOR), SEPARATOR)
}

/// Percent-encodes each segment on its own so separators survive.
pub fn encode_url_path(path: &str) -> String {
    path.split(SEPARATOR)
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_prefixer() {
        let cases = vec![
            (None, ""),
            (Some(""), ""),
            (Some("/"), ""),
            (Some("prefix"), "prefix/"),
            (Some("prefix/"), "prefix/"),
            (Some("prefix//"), "prefix/"),
            (Some("/nested/prefix/"), "nested/prefix/"),
        ];

        for (input, expected) in cases {
            let prefixer = PathPrefixer::new(input);
            assert_eq!(prefixer.prefix(), expected, "failed for case: {:?}", input);
        }
    }

    #[test]
    fn test_apply_prefix() {
        let cases = vec![
            (None, "file.txt", "file.txt"),
            (None, "dir/file.txt", "dir/file.txt"),
            (Some("pre"), "file.txt", "pre/file.txt"),
            (Some("pre"), "/file.txt", "pre/file.txt"),
            (Some("pre"), "//dir/file.txt", "pre/dir/file.txt"),
            (Some("pre"), "", "pre/"),
        ];

        for (prefix, input, expected) in cases {
            let prefixer = PathPrefixer::new(prefix);
            assert_eq!(prefixer.apply_prefix(input), expected, "failed for case: {}", input);
        }
    }

    #[test]
    fn test_remove_prefix_round_trip() {
        let cases = vec!["file.txt", "dir/file.txt", "dir/", "a/b/c/d.bin", ""];

        for prefix in [None, Some("pre"), Some("deep/pre")] {
            let prefixer = PathPrefixer::new(prefix);
            for path in &cases {
                let key = prefixer.apply_prefix(path);
                assert_eq!(
                    prefixer.remove_prefix(&key),
                    *path,
                    "failed for case: {:?} {}",
                    prefix,
                    path
                );
            }
        }
    }

    #[test]
    fn test_remove_prefix_foreign_key() {
        let prefixer = PathPrefixer::new(Some("pre"));
        assert_eq!(prefixer.remove_prefix("other/file.txt"), "other/file.txt");
    }

    #[test]
    fn test_dirname() {
        let cases = vec![
            ("file.txt", ""),
            ("dir/file.txt", "dir"),
            ("dir/sub/file.txt", "dir/sub"),
            ("dir/sub/", "dir"),
            ("dir", ""),
            ("/file.txt", ""),
            ("", ""),
        ];

        for (input, expected) in cases {
            assert_eq!(dirname(input), expected, "failed for case: {}", input);
        }
    }

    #[test]
    fn test_basename() {
        let cases = vec![
            ("file.txt", "file.txt"),
            ("dir/file.txt", "file.txt"),
            ("dir/sub/", "sub"),
            ("", ""),
        ];

        for (input, expected) in cases {
            assert_eq!(basename(input), expected, "failed for case: {}", input);
        }
    }

    #[test]
    fn test_normalise_dir_name() {
        let cases = vec![
            ("dir_name", "dir_name/"),
            ("dir_name/", "dir_name/"),
            ("dir_name//", "dir_name/"),
            ("", "/"),
        ];

        for (input, expected) in cases {
            assert_eq!(normalise_dir_name(input), expected, "failed for case: {}", input);
        }
    }

    #[test]
    fn test_encode_url_path() {
        let cases = vec![
            ("file.txt", "file.txt"),
            ("test folder/file(1).txt", "test%20folder/file%281%29.txt"),
            ("a+b/c~d_e-f.g", "a%2Bb/c~d_e-f.g"),
            ("prefix/dir/", "prefix/dir/"),
        ];

        for (input, expected) in cases {
            assert_eq!(encode_url_path(input), expected, "failed for case: {}", input);
        }
    }
}
