//! Minimal `go.mod` reader.
//!
//! Only `require` directives are interpreted, in both forms:
//!
//! ```text
//! require golang.org/x/text v0.3.0
//! require (
//!     golang.org/x/net v0.1.0 // indirect
//!     "example.com/quoted" v1.2.3
//! )
//! ```
//!
//! Every other directive and block (`module`, `go`, `replace`, `exclude`,
//! `retract`, ...) is skipped.

use thiserror::Error;

/// A dependency declared by a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub path: String,
    pub version: String,
}

/// Manifest syntax errors. Line numbers are 1-based.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("line {line}: `{directive} (` block is never closed")]
    UnterminatedBlock { directive: String, line: usize },

    #[error("line {line}: malformed requirement `{text}`")]
    MalformedRequire { line: usize, text: String },

    #[error("line {line}: unexpected `)`")]
    UnexpectedClose { line: usize },
}

/// Extracts the `require` list from manifest `source`.
pub fn parse_requirements(source: &str) -> Result<Vec<Requirement>, ManifestError> {
    let mut requirements = Vec::new();
    // Open block: directive name and the line it started on.
    let mut block: Option<(String, usize)> = None;

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some((directive, _)) = &block {
            if line == ")" {
                block = None;
            } else if directive == "require" {
                requirements.push(parse_requirement(line, line_no)?);
            }
            continue;
        }

        if line == ")" {
            return Err(ManifestError::UnexpectedClose { line: line_no });
        }

        let (directive, rest) = match line.split_once(char::is_whitespace) {
            Some((directive, rest)) => (directive, rest.trim()),
            None => (line.trim_end_matches('('), ""),
        };
        let rest = if line.ends_with('(') && rest.is_empty() {
            "("
        } else {
            rest
        };

        match rest {
            "(" => block = Some((directive.trim_end_matches('(').to_string(), line_no)),
            "()" => {}
            _ if directive == "require" => requirements.push(parse_requirement(rest, line_no)?),
            _ => {}
        }
    }

    match block {
        Some((directive, line)) => Err(ManifestError::UnterminatedBlock { directive, line }),
        None => Ok(requirements),
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_requirement(text: &str, line: usize) -> Result<Requirement, ManifestError> {
    let malformed = || ManifestError::MalformedRequire {
        line,
        text: text.to_string(),
    };

    let mut tokens = text.split_whitespace();
    let (Some(path), Some(version), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(malformed());
    };

    let path = unquote(path);
    let version = unquote(version);
    if path.is_empty() || version.is_empty() {
        return Err(malformed());
    }

    Ok(Requirement {
        path: path.to_string(),
        version: version.to_string(),
    })
}

fn unquote(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| token.strip_prefix('`').and_then(|t| t.strip_suffix('`')))
        .unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(path: &str, version: &str) -> Requirement {
        Requirement {
            path: path.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_empty_manifest() {
        assert!(parse_requirements("").unwrap().is_empty());
        assert!(parse_requirements("module x/y\n\ngo 1.21\n").unwrap().is_empty());
    }

    #[test]
    fn test_single_line_require() {
        let reqs = parse_requirements("module x/y\nrequire a/b v0.1.0\n").unwrap();
        assert_eq!(reqs, vec![req("a/b", "v0.1.0")]);
    }

    #[test]
    fn test_require_block_with_comments() {
        let source = r#"
module example.com/app

go 1.22

require (
	golang.org/x/net v0.1.0 // indirect
	// commented out line
	"example.com/quoted" v1.2.3

	golang.org/x/text v0.3.0
)

require github.com/pkg/errors v0.9.1
"#;
        let reqs = parse_requirements(source).unwrap();

        assert_eq!(
            reqs,
            vec![
                req("golang.org/x/net", "v0.1.0"),
                req("example.com/quoted", "v1.2.3"),
                req("golang.org/x/text", "v0.3.0"),
                req("github.com/pkg/errors", "v0.9.1"),
            ]
        );
    }

    #[test]
    fn test_other_blocks_are_ignored() {
        let source = "replace (\n\ta/b => ../b\n)\nexclude (\n\tc/d v1.0.0\n)\nretract [v1.0.0, v1.1.0]\nrequire e/f v2.0.0\n";
        assert_eq!(parse_requirements(source).unwrap(), vec![req("e/f", "v2.0.0")]);
    }

    #[test]
    fn test_block_opened_without_space() {
        let source = "require(\n\ta/b v1.0.0\n)\nrequire ()\n";
        assert_eq!(parse_requirements(source).unwrap(), vec![req("a/b", "v1.0.0")]);
    }

    #[test]
    fn test_unterminated_block() {
        let err = parse_requirements("module x\nrequire (\n\ta/b v1.0.0\n").unwrap_err();
        assert_eq!(
            err,
            ManifestError::UnterminatedBlock {
                directive: "require".to_string(),
                line: 2
            }
        );
    }

    #[test]
    fn test_malformed_requirement() {
        let err = parse_requirements("require a/b\n").unwrap_err();
        assert!(matches!(err, ManifestError::MalformedRequire { line: 1, .. }));

        let err = parse_requirements("require (\n\ta/b v1 extra\n)\n").unwrap_err();
        assert!(matches!(err, ManifestError::MalformedRequire { line: 2, .. }));
    }

    #[test]
    fn test_stray_close() {
        assert_eq!(
            parse_requirements("module x\n)\n").unwrap_err(),
            ManifestError::UnexpectedClose { line: 2 }
        );
    }
}
