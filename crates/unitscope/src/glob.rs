use regex::RegexSet;

use crate::error::ConfigError;

/// Include globs matched against `/`-separated paths relative to a plugin's
/// base directory.
///
/// Supports `*` (within one path segment), `**` (across segments), `?`,
/// `[...]`/`[!...]` classes, `{a,b}` alternation and `\` escapes.
#[derive(Debug, Clone)]
pub struct GlobSet {
    globs: Vec<String>,
    set: RegexSet,
}

impl GlobSet {
    pub fn compile<I, S>(globs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sources = Vec::new();
        let mut translated = Vec::new();
        for glob in globs {
            let glob = glob.as_ref();
            let pattern = glob_to_regex(glob).map_err(|reason| ConfigError::InvalidGlob {
                glob: glob.to_string(),
                reason,
            })?;
            regex::Regex::new(&pattern).map_err(|err| ConfigError::InvalidGlob {
                glob: glob.to_string(),
                reason: err.to_string(),
            })?;
            sources.push(glob.to_string());
            translated.push(pattern);
        }
        let set = RegexSet::new(&translated).map_err(|err| ConfigError::InvalidGlob {
            glob: sources.join(", "),
            reason: err.to_string(),
        })?;
        Ok(Self {
            globs: sources,
            set,
        })
    }

    pub fn is_match(&self, relative_path: &str) -> bool {
        self.set.is_match(relative_path)
    }

    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }
}

fn glob_to_regex(glob: &str) -> Result<String, String> {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    let mut depth = 0usize;
    let mut buf = [0u8; 4];

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                let mut closed = false;
                for c in chars.by_ref() {
                    match c {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' | '[' | '&' | '~' => {
                            out.push('\\');
                            out.push(c);
                        }
                        _ => out.push(c),
                    }
                }
                if !closed {
                    return Err("unterminated character class".into());
                }
                out.push(']');
            }
            '{' => {
                depth += 1;
                out.push_str("(?:");
            }
            '}' if depth > 0 => {
                depth -= 1;
                out.push(')');
            }
            ',' if depth > 0 => out.push('|'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(escaped.encode_utf8(&mut buf))),
                None => return Err("dangling escape at end of glob".into()),
            },
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }

    if depth != 0 {
        return Err("unbalanced `{` in glob".into());
    }
    out.push('$');
    Ok(out)
}
