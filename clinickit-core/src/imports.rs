// ES module import statements: discovery and name merging

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^import\s+(?:(?P<clause>[^;'"]*?)\s+from\s+)?['"](?P<source>[^'"\n]+)['"][ \t]*;?"#,
    )
    .expect("import pattern is valid")
});

/// One `import ... from '...'` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub span: Range<usize>,
    /// Span of the import clause (`{ a, b }`, `Default`, ...), absent for
    /// side-effect imports
    pub clause: Option<Range<usize>>,
    pub source: String,
}

/// How the permission hook import was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    /// The name already occurs in the file
    Present,
    /// Merged into an existing import from the auth module
    Merged,
    /// Added as a new import statement
    Added,
}

pub fn find_imports(source: &str) -> Vec<ImportStatement> {
    IMPORT_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(ImportStatement {
                span: whole.range(),
                clause: caps.name("clause").map(|m| m.range()),
                source: caps.name("source")?.as_str().to_string(),
            })
        })
        .collect()
}

/// Last path segment of a module specifier (`../../contexts/AuthContext` ->
/// `AuthContext`)
fn module_stem(specifier: &str) -> &str {
    let last = specifier.rsplit('/').next().unwrap_or(specifier);
    last.split('.').next().unwrap_or(last)
}

/// Make sure `name` is imported from `auth_module`.
///
/// The name is merged into an existing import of the same module when one
/// exists, otherwise a new statement goes on the line after the last import
/// (or at the top of a file without imports).
pub fn ensure_named_import(source: &str, name: &str, auth_module: &str) -> (String, ImportStatus) {
    if source.contains(name) {
        return (source.to_string(), ImportStatus::Present);
    }

    let imports = find_imports(source);
    let stem = module_stem(auth_module);

    if let Some(existing) = imports.iter().find(|i| module_stem(&i.source) == stem)
        && let Some(clause) = existing.clause.clone()
        && let Some(merged) = merge_into_clause(&source[clause.clone()], name)
    {
        let mut out = String::with_capacity(source.len() + name.len() + 4);
        out.push_str(&source[..clause.start]);
        out.push_str(&merged);
        out.push_str(&source[clause.end..]);
        return (out, ImportStatus::Merged);
    }

    let statement = format!("import {{ {} }} from '{}';", name, auth_module);

    let out = match imports.last() {
        Some(last) => {
            let insert_at = source[last.span.end..]
                .find('\n')
                .map(|off| last.span.end + off + 1);
            match insert_at {
                Some(at) => format!("{}{}\n{}", &source[..at], statement, &source[at..]),
                None => format!("{}\n{}\n", source, statement),
            }
        }
        None => format!("{}\n{}", statement, source),
    };

    (out, ImportStatus::Added)
}

/// Add `name` to an import clause. Returns `None` for namespace imports,
/// which cannot take named specifiers.
fn merge_into_clause(clause: &str, name: &str) -> Option<String> {
    if let (Some(open), Some(close)) = (clause.find('{'), clause.rfind('}')) {
        let inner = &clause[open + 1..close];
        let body = inner.trim_end();

        if body.trim().is_empty() {
            return Some(format!("{}{{ {} }}{}", &clause[..open], name, &clause[close + 1..]));
        }

        let has_trailing_comma = body.ends_with(',');
        let insertion = if inner.contains('\n') {
            let indent = inner
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(|l| &l[..l.len() - l.trim_start().len()])
                .unwrap_or("  ");
            if has_trailing_comma {
                format!("\n{}{},", indent, name)
            } else {
                format!(",\n{}{}", indent, name)
            }
        } else if has_trailing_comma {
            format!(" {},", name)
        } else {
            format!(", {}", name)
        };

        let split = open + 1 + body.len();
        return Some(format!("{}{}{}", &clause[..split], insertion, &clause[split..]));
    }

    if clause.trim_start().starts_with('*') {
        return None;
    }

    Some(format!("{}, {{ {} }}", clause.trim_end(), name))
}
