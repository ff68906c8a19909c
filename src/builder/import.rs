//! Import targets: local paths, URLs, environment variables.

use super::{child, shape, token, Builder};
use crate::ast::{
    Expression, File, FilePrefix, Import, ImportMode, ImportType, Scheme, Sha256Digest, Url,
};
use crate::errors::AstError;
use crate::syntax::ParseTree;

impl Builder {
    pub(super) fn import(&mut self, node: &ParseTree) -> Result<Expression, AstError> {
        let import_type = self.import_type(child(node, 0)?)?;
        let mut import = Import {
            import_type,
            mode: ImportMode::Code,
            hash: None,
        };
        for part in &node.children()[1..] {
            match part.rule() {
                "hash" => {
                    let hex = token(part)?.trim_start_matches("sha256:");
                    let digest = Sha256Digest::from_hex(hex)
                        .ok_or_else(|| shape(part, "malformed sha256 digest"))?;
                    import.hash = Some(digest);
                }
                "import-mode" => {
                    import.mode = match token(part)? {
                        "Text" => ImportMode::RawText,
                        "Location" => ImportMode::Location,
                        other => return Err(shape(part, format!("unknown import mode `{}`", other))),
                    };
                }
                _ => return Err(shape(part, "unexpected import suffix")),
            }
        }
        Ok(Expression::Import(import))
    }

    fn import_type(&mut self, node: &ParseTree) -> Result<ImportType, AstError> {
        let prefix = match node.rule() {
            "missing" => return Ok(ImportType::Missing),
            "http-import" => return Ok(ImportType::Remote(self.url(node)?)),
            "env-import" => return Ok(ImportType::Env(environment_variable(node)?)),
            "parent-path" => FilePrefix::Parent,
            "here-path" => FilePrefix::Here,
            "home-path" => FilePrefix::Home,
            "absolute-path" => FilePrefix::Absolute,
            _ => return Err(shape(node, "not an import")),
        };
        let components = node
            .children()
            .iter()
            .map(path_component)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ImportType::Local(prefix, File::from_components(components)))
    }

    fn url(&mut self, node: &ParseTree) -> Result<Url, AstError> {
        let scheme = match token(child(node, 0)?)? {
            "https" => Scheme::Https,
            _ => Scheme::Http,
        };
        let authority = token(child(node, 1)?)?.to_string();
        let mut components = Vec::new();
        let mut query = None;
        let mut headers = None;
        for part in &node.children()[2..] {
            match part.rule() {
                "url-path-component" => {
                    components.push(token(part)?.trim_start_matches('/').to_string())
                }
                "query" => query = Some(token(part)?.to_string()),
                "missing" | "parent-path" | "here-path" | "home-path" | "absolute-path"
                | "http-import" | "env-import" => {
                    let import_type = self.import_type(part)?;
                    headers = Some(Box::new(Expression::Import(Import {
                        import_type,
                        mode: ImportMode::Code,
                        hash: None,
                    })));
                }
                _ => headers = Some(Box::new(self.expression(part)?)),
            }
        }
        Ok(Url {
            scheme,
            authority,
            path: File::from_components(components),
            query,
            headers,
        })
    }
}

/// `/foo` or `/"foo bar"` to the bare component.
fn path_component(node: &ParseTree) -> Result<String, AstError> {
    let text = token(node)?;
    let text = text
        .strip_prefix('/')
        .ok_or_else(|| shape(node, "path component without a separator"))?;
    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    Ok(text.to_string())
}

fn environment_variable(node: &ParseTree) -> Result<String, AstError> {
    let name = child(node, 0)?;
    let text = token(name)?;
    match name.rule() {
        "bash-environment-variable" => Ok(text.to_string()),
        "posix-environment-variable" => Ok(unescape_posix(text)),
        _ => Err(shape(name, "not an environment variable")),
    }
}

fn unescape_posix(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{b}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Span;
    use std::sync::Arc;

    #[test]
    fn quoted_path_components_are_unwrapped() {
        let node = ParseTree::leaf(Arc::from("path-component"), Span::new(0, 6), "/\"a b\"");
        assert_eq!(path_component(&node).unwrap(), "a b");
        let node = ParseTree::leaf(Arc::from("path-component"), Span::new(0, 4), "/foo");
        assert_eq!(path_component(&node).unwrap(), "foo");
    }

    #[test]
    fn posix_escapes_decode() {
        assert_eq!(unescape_posix("a\\\"b"), "a\"b");
        assert_eq!(unescape_posix("x\\ny"), "x\ny");
        assert_eq!(unescape_posix("plain"), "plain");
    }
}
