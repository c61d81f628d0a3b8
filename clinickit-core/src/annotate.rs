// Permission gating of page components

use crate::imports::{ImportStatus, ensure_named_import};
use crate::jsx::{Element, parse_elements};
use std::fmt;
use tracing::{debug, warn};

/// Hook that yields the permission predicates
pub const PERMISSION_HOOK: &str = "usePermission";

/// Module the hook is imported from, relative to a page file
pub const DEFAULT_AUTH_MODULE: &str = "../../contexts/AuthContext";

/// The handle goes right after the line obtaining the router's navigate
/// function, the first statement of every page component body.
pub const NAVIGATION_ANCHOR: &str = "useNavigate()";

const HANDLE_STATEMENT: &str = "const { canCreate, canEdit, canDelete } = usePermission();";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Create,
    Edit,
    Delete,
}

impl ActionKind {
    /// Name of the predicate gating this action
    pub fn predicate(&self) -> &'static str {
        match self {
            ActionKind::Create => "canCreate",
            ActionKind::Edit => "canEdit",
            ActionKind::Delete => "canDelete",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Edit => "edit",
            ActionKind::Delete => "delete",
        }
    }

    /// Recognize an action element by its icon marker.
    ///
    /// `elements` is the full element list of the file, used to look inside
    /// confirmation dialogs for their delete button.
    pub fn classify(element: &Element, elements: &[Element]) -> Option<Self> {
        match element.name.as_str() {
            "Button" => {
                let icon = element.attr_text("icon")?;
                if icon.contains("<PlusOutlined") && element.attr_text("type") == Some("primary") {
                    Some(ActionKind::Create)
                } else if icon.contains("<EditOutlined") {
                    Some(ActionKind::Edit)
                } else {
                    None
                }
            }
            "Popconfirm" => elements
                .iter()
                .any(|inner| {
                    inner.name == "Button"
                        && element.encloses(inner)
                        && inner
                            .attr_text("icon")
                            .is_some_and(|icon| icon.contains("<DeleteOutlined"))
                })
                .then_some(ActionKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the permission handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    /// A `usePermission()` call already exists
    Present,
    /// Inserted after the navigation anchor
    Inserted,
    /// No navigation anchor line, so nothing was inserted
    MissingAnchor,
}

/// Per-action tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionCounts {
    pub create: usize,
    pub edit: usize,
    pub delete: usize,
}

impl ActionCounts {
    fn bump(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Create => self.create += 1,
            ActionKind::Edit => self.edit += 1,
            ActionKind::Delete => self.delete += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.create + self.edit + self.delete
    }
}

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub auth_module: String,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            auth_module: DEFAULT_AUTH_MODULE.to_string(),
        }
    }
}

/// Result of annotating one source text
#[derive(Debug, Clone)]
pub struct Annotation {
    pub text: String,
    pub import: ImportStatus,
    pub handle: HandleStatus,
    /// Elements wrapped by this run
    pub gated: ActionCounts,
    /// Elements that were already gated and left alone
    pub already_gated: ActionCounts,
}

/// Apply every pass to `source` for the page's `module` identifier
pub fn annotate_source(source: &str, module: &str, options: &AnnotateOptions) -> Annotation {
    let (text, import) = ensure_named_import(source, PERMISSION_HOOK, &options.auth_module);
    let (text, handle) = ensure_handle(&text);
    let (text, gated, already_gated) = gate_actions(&text, module);

    Annotation {
        text,
        import,
        handle,
        gated,
        already_gated,
    }
}

/// Insert the permission handle after the navigation anchor line
pub fn ensure_handle(source: &str) -> (String, HandleStatus) {
    if source.contains("usePermission()") {
        return (source.to_string(), HandleStatus::Present);
    }

    let Some(anchor) = source.find(NAVIGATION_ANCHOR) else {
        warn!("No {} line to anchor the permission handle", NAVIGATION_ANCHOR);
        return (source.to_string(), HandleStatus::MissingAnchor);
    };

    let line_start = source[..anchor].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &source[line_start..];
    let indent = &line[..line.len() - line.trim_start_matches([' ', '\t']).len()];

    let out = match source[anchor..].find('\n') {
        Some(off) => {
            let newline = anchor + off;
            let eol = if newline > 0 && source.as_bytes()[newline - 1] == b'\r' {
                "\r\n"
            } else {
                "\n"
            };
            let at = newline + 1;
            format!(
                "{}{}{}{}{}",
                &source[..at],
                indent,
                HANDLE_STATEMENT,
                eol,
                &source[at..]
            )
        }
        None => format!("{}\n{}{}\n", source, indent, HANDLE_STATEMENT),
    };

    (out, HandleStatus::Inserted)
}

/// Wrap every ungated create, edit and delete element in a conditional on
/// its predicate. Returns the new text, the elements gated now and the ones
/// found already gated.
pub fn gate_actions(source: &str, module: &str) -> (String, ActionCounts, ActionCounts) {
    let elements = parse_elements(source);

    let candidates: Vec<(ActionKind, &Element)> = elements
        .iter()
        .filter_map(|e| ActionKind::classify(e, &elements).map(|kind| (kind, e)))
        .collect();

    // Outermost wins when one action element sits inside another
    let outermost: Vec<(ActionKind, &Element)> = candidates
        .iter()
        .filter(|(_, e)| !candidates.iter().any(|(_, outer)| outer.encloses(e)))
        .copied()
        .collect();

    let mut gated = ActionCounts::default();
    let mut already_gated = ActionCounts::default();
    let mut pending = Vec::new();

    for (kind, element) in outermost {
        if is_gated(source, element, kind, &elements) {
            debug!("{} element at byte {} already gated", kind, element.span.start);
            already_gated.bump(kind);
        } else {
            pending.push((kind, element));
        }
    }

    // Rewrite back to front so earlier spans stay valid
    pending.sort_by_key(|(_, e)| std::cmp::Reverse(e.span.start));

    let mut text = source.to_string();
    for (kind, element) in pending {
        let direct_child = elements.iter().any(|e| e.children.contains(&element.span));
        let wrapped = wrap(source, element, kind, module, direct_child);
        text.replace_range(element.span.clone(), &wrapped);
        gated.bump(kind);
    }

    (text, gated, already_gated)
}

fn wrap(source: &str, element: &Element, kind: ActionKind, module: &str, direct_child: bool) -> String {
    let line_start = source[..element.span.start]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let line = &source[line_start..];
    let indent = &line[..line.len() - line.trim_start_matches([' ', '\t']).len()];
    let body = &source[element.span.clone()];
    let condition = format!("{}('{}') && (\n{}{}\n{})", kind.predicate(), module, indent, body, indent);

    // Inside an element body the conditional needs an expression container
    if direct_child {
        format!("{{{}}}", condition)
    } else {
        condition
    }
}

/// An element is gated when it is the right operand of an `&&` chain with a
/// call to its predicate among the operands, or when one of its ancestors is.
fn is_gated(source: &str, element: &Element, kind: ActionKind, elements: &[Element]) -> bool {
    let predicate = kind.predicate();
    guard_calls(source, element.span.start).contains(&predicate)
        || elements.iter().any(|ancestor| {
            ancestor.encloses(element) && guard_calls(source, ancestor.span.start).contains(&predicate)
        })
}

/// Names of the functions called by the operands of the `a && b && (`
/// chain ending right before `pos`.
fn guard_calls(source: &str, pos: usize) -> Vec<&str> {
    let head = source[..pos].trim_end();
    let head = head.strip_suffix('(').map(str::trim_end).unwrap_or(head);
    let Some(head) = head.strip_suffix("&&") else {
        return Vec::new();
    };

    split_and(&head[chain_start(head)..])
        .into_iter()
        .filter_map(call_name)
        .collect()
}

/// Start of the `&&` chain that `head` ends with: just past the open bracket
/// or the lower-precedence operator in front of it.
fn chain_start(head: &str) -> usize {
    let bytes = head.as_bytes();
    let mut depth = 0usize;
    let mut i = bytes.len();

    while i > 0 {
        i -= 1;
        match bytes[i] {
            b')' | b']' | b'}' => depth += 1,
            b'(' | b'[' | b'{' => {
                if depth == 0 {
                    return i + 1;
                }
                depth -= 1;
            }
            q @ (b'\'' | b'"' | b'`') => {
                while i > 0 {
                    i -= 1;
                    if bytes[i] == q && (i == 0 || bytes[i - 1] != b'\\') {
                        break;
                    }
                }
            }
            _ if depth > 0 => {}
            b'|' if i > 0 && bytes[i - 1] == b'|' => return i + 1,
            b'>' if i > 0 && bytes[i - 1] == b'=' => return i + 1,
            // `?.` is optional chaining, not a conditional
            b'?' if bytes.get(i + 1) != Some(&b'.') => return i + 1,
            b':' | b',' | b';' => return i + 1,
            _ => {}
        }
    }

    0
}

/// Split `chain` at its top-level `&&` operators
fn split_and(chain: &str) -> Vec<&str> {
    let bytes = chain.as_bytes();
    let mut operands = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            q @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != q {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'&' if depth == 0 && bytes.get(i + 1) == Some(&b'&') => {
                operands.push(&chain[start..i]);
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    operands.push(&chain[start.min(chain.len())..]);
    operands
}

/// Name of the function when `operand` is a plain call like `canEdit('x')`
/// or `perms.canEdit('x')`
fn call_name(operand: &str) -> Option<&str> {
    let operand = operand.trim();
    let args_end = operand.len().checked_sub(1)?;
    if !operand.ends_with(')') {
        return None;
    }

    let mut depth = 0usize;
    let mut open = None;
    for (i, c) in operand[..args_end].char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' if depth == 0 => {
                open = Some(i);
                break;
            }
            '(' => depth -= 1,
            _ => {}
        }
    }

    let callee = operand[..open?].trim_end();
    let is_path = !callee.is_empty()
        && callee
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.'));
    if !is_path {
        return None;
    }

    callee.rsplit('.').next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calls_before<'a>(src: &'a str, marker: &str) -> Vec<&'a str> {
        guard_calls(src, src.find(marker).unwrap())
    }

    #[test]
    fn test_guard_with_parens() {
        let src = "{canEdit('exams') && (\n  <Button";
        assert_eq!(calls_before(src, "<Button"), vec!["canEdit"]);
    }

    #[test]
    fn test_guard_without_parens() {
        let src = "{canDelete(\"x\") && <Popconfirm";
        assert_eq!(calls_before(src, "<Popconfirm"), vec!["canDelete"]);
    }

    #[test]
    fn test_guard_plain_condition_is_not_a_call() {
        let src = "{isOpen && (\n  <Button";
        assert!(calls_before(src, "<Button").is_empty());
    }

    #[test]
    fn test_guard_nothing() {
        let src = "<Space>\n  <Button";
        assert!(calls_before(src, "<Button").is_empty());
    }

    #[test]
    fn test_guard_compound_chain() {
        let src = "{canEdit('data_requests') && record.status !== 'completed' && (\n  <Button";
        assert_eq!(calls_before(src, "<Button"), vec!["canEdit"]);

        let src = "extra={\n  !selected.otp_verified && canEdit('data_requests') && (\n  <Button";
        assert_eq!(calls_before(src, "<Button"), vec!["canEdit"]);
    }

    #[test]
    fn test_guard_chain_stops_at_lower_precedence_operator() {
        let src = "{canEdit('x') || isAdmin && (\n  <Button";
        assert!(calls_before(src, "<Button").is_empty());

        let src = "{loading ? null : canEdit('x') && <Button";
        assert_eq!(calls_before(src, "<Button"), vec!["canEdit"]);
    }

    #[test]
    fn test_call_name() {
        assert_eq!(call_name(" canEdit('x') "), Some("canEdit"));
        assert_eq!(call_name("perms.canDelete(\"x\")"), Some("canDelete"));
        assert_eq!(call_name("record.status !== 'done'"), None);
        assert_eq!(call_name("!canEdit('x')"), None);
        assert_eq!(call_name("(a)"), None);
    }

    #[test]
    fn test_create_requires_primary_type() {
        let src = r#"<Button icon={<PlusOutlined />}>Add</Button>"#;
        let elements = parse_elements(src);
        assert_eq!(ActionKind::classify(&elements[0], &elements), None);

        let src = r#"<Button type="primary" icon={<PlusOutlined />}>Add</Button>"#;
        let elements = parse_elements(src);
        assert_eq!(
            ActionKind::classify(&elements[0], &elements),
            Some(ActionKind::Create)
        );
    }
}
