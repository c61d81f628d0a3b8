// Token claims and dashboard menu visibility

use crate::error::{Result, SmokeError};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;
use std::collections::BTreeMap;

const ADMIN_ROLE: &str = "admin";

/// Decode the payload segment of a JWT. The signature is not checked.
pub fn decode_claims(token: &str) -> Result<Value> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(SmokeError::DecodeError(format!(
            "expected 3 token segments, found {}",
            parts.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| SmokeError::DecodeError(format!("token payload: {}", e)))?;

    serde_json::from_slice(&payload)
        .map_err(|e| SmokeError::DecodeError(format!("token claims: {}", e)))
}

/// Role and per-module action grants carried by the token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    pub role: Option<String>,
    modules: BTreeMap<String, BTreeMap<String, bool>>,
}

impl PermissionSet {
    /// Read `role` and `permissions` from decoded claims. Grants that are not
    /// `true` count as denied.
    pub fn from_claims(claims: &Value) -> Self {
        let role = claims.get("role").and_then(Value::as_str).map(str::to_string);

        let modules = claims
            .get("permissions")
            .and_then(Value::as_object)
            .map(|modules| {
                modules
                    .iter()
                    .filter_map(|(module, actions)| {
                        let actions = actions
                            .as_object()?
                            .iter()
                            .map(|(action, granted)| (action.clone(), granted.as_bool() == Some(true)))
                            .collect();
                        Some((module.clone(), actions))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { role, modules }
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        self.is_admin()
            || self
                .modules
                .get(module)
                .and_then(|actions| actions.get(action))
                .copied()
                .unwrap_or(false)
    }

    pub fn has_any_permission(&self, module: &str) -> bool {
        self.is_admin()
            || self
                .modules
                .get(module)
                .is_some_and(|actions| actions.values().any(|granted| *granted))
    }

    pub fn can_view(&self, module: &str) -> bool {
        self.has_permission(module, "view") || self.has_any_permission(module)
    }

    /// Number of modules listed in the claims
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Modules with at least one granted action, with those actions, in
    /// module order
    pub fn granted(&self) -> Vec<(&str, Vec<&str>)> {
        self.modules
            .iter()
            .filter_map(|(module, actions)| {
                let granted: Vec<&str> = actions
                    .iter()
                    .filter(|(_, granted)| **granted)
                    .map(|(action, _)| action.as_str())
                    .collect();
                (!granted.is_empty()).then_some((module.as_str(), granted))
            })
            .collect()
    }
}

/// An entry of the dashboard side menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub key: &'static str,
    pub label: &'static str,
    pub permission: Option<&'static str>,
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    fn leaf(key: &'static str, label: &'static str, permission: &'static str) -> Self {
        Self {
            key,
            label,
            permission: Some(permission),
            children: Vec::new(),
        }
    }

    fn group(key: &'static str, label: &'static str, children: Vec<MenuItem>) -> Self {
        Self {
            key,
            label,
            permission: None,
            children,
        }
    }
}

/// Every item of the dashboard menu
pub fn dashboard_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::leaf("/", "Dashboard", "dashboard"),
        MenuItem::leaf("/appointments", "Agenda", "appointments"),
        MenuItem::leaf("/patients", "Pacientes", "patients"),
        MenuItem::leaf("/medical-records", "Prontuários", "medical_records"),
        MenuItem::leaf("/prescriptions", "Receituário", "prescriptions"),
        MenuItem::leaf("/exams", "Exames", "exams"),
        MenuItem::group(
            "financial",
            "Financeiro",
            vec![
                MenuItem::leaf("/budgets", "Orçamentos", "budgets"),
                MenuItem::leaf("/payments", "Pagamentos", "payments"),
            ],
        ),
        MenuItem::group(
            "inventory",
            "Estoque",
            vec![
                MenuItem::leaf("/products", "Produtos", "products"),
                MenuItem::leaf("/suppliers", "Fornecedores", "suppliers"),
                MenuItem::leaf("/stock-movements", "Movimentações", "stock_movements"),
            ],
        ),
        MenuItem::leaf("/campaigns", "Campanhas", "campaigns"),
        MenuItem::leaf("/reports", "Relatórios", "reports"),
    ]
}

/// Items of `menu` the permission set may see. Groups keep only their
/// visible children and disappear when none are left.
pub fn visible_menu(menu: Vec<MenuItem>, permissions: &PermissionSet) -> Vec<MenuItem> {
    menu.into_iter()
        .filter_map(|mut item| {
            if !item.children.is_empty() {
                item.children = visible_menu(item.children, permissions);
                return (!item.children.is_empty()).then_some(item);
            }
            match item.permission {
                Some(module) => permissions.can_view(module).then_some(item),
                None => Some(item),
            }
        })
        .collect()
}

/// Result of checking a login token against the menu rules
#[derive(Debug, Clone)]
pub struct MenuCheck {
    pub permissions: PermissionSet,
    pub menu: Vec<MenuItem>,
}

/// Decode `token` and compute the menu its claims unlock. When the claims
/// carry no role, `fallback_role` is used.
pub fn check_menu(token: &str, fallback_role: Option<&str>) -> Result<MenuCheck> {
    let claims = decode_claims(token)?;
    let mut permissions = PermissionSet::from_claims(&claims);
    if permissions.role.is_none() {
        permissions.role = fallback_role.map(str::to_string);
    }

    let menu = visible_menu(dashboard_menu(), &permissions);
    Ok(MenuCheck { permissions, menu })
}

/// Render the permissions and visible menu
pub fn generate_menu_report(check: &MenuCheck) -> String {
    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str(&format!(
        "# Role: {}\n",
        check.permissions.role.as_deref().unwrap_or("(none)")
    ));

    out.push_str(&format!(
        "\n## Permissions ({} module(s))\n",
        check.permissions.module_count()
    ));
    let granted = check.permissions.granted();
    if granted.is_empty() {
        out.push_str("  No permissions in token\n");
    }
    for (module, actions) in granted {
        out.push_str(&format!("  {}: {}\n", module, actions.join(", ")));
    }

    out.push_str(&format!("\n## Menu ({} item(s))\n", check.menu.len()));
    if check.menu.is_empty() {
        out.push_str("  No visible menu items\n");
    }
    for item in &check.menu {
        out.push_str(&format!("  ✓ {}\n", item.label));
        for child in &item.children {
            out.push_str(&format!("    ✓ {}\n", child.label));
        }
    }

    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    out
}
