use std::collections::BTreeMap;

/// Tallies collected while driving the API. Each step returns its own
/// report and the suite absorbs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmokeReport {
    /// Records created, by module
    pub created: BTreeMap<String, usize>,
    /// Records edited, by module
    pub edited: BTreeMap<String, usize>,
    /// Download URLs that answered 200
    pub accessible: usize,
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
}

impl SmokeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&mut self, module: &str) {
        *self.created.entry(module.to_string()).or_insert(0) += 1;
    }

    pub fn record_edited(&mut self, module: &str) {
        *self.edited.entry(module.to_string()).or_insert(0) += 1;
    }

    pub fn record_accessible(&mut self) {
        self.accessible += 1;
    }

    pub fn skip(&mut self, reason: impl Into<String>) {
        self.skipped.push(reason.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Merge the tallies of a finished step into this report
    pub fn absorb(&mut self, other: SmokeReport) {
        for (module, count) in other.created {
            *self.created.entry(module).or_insert(0) += count;
        }
        for (module, count) in other.edited {
            *self.edited.entry(module).or_insert(0) += count;
        }
        self.accessible += other.accessible;
        self.skipped.extend(other.skipped);
        self.errors.extend(other.errors);
    }

    pub fn total_created(&self) -> usize {
        self.created.values().sum()
    }

    pub fn total_edited(&self) -> usize {
        self.edited.values().sum()
    }

    /// Modules with at least one created record
    pub fn modules_tested(&self) -> usize {
        self.created.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Render the end-of-suite summary
pub fn generate_smoke_report(title: &str, report: &SmokeReport) -> String {
    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str(&format!("# {} summary:\n", title));

    out.push_str(&format!("  Records created: {}\n", report.total_created()));
    for (module, count) in &report.created {
        out.push_str(&format!("    - {}: {}\n", module, count));
    }

    out.push_str(&format!("  Records edited: {}\n", report.total_edited()));
    for (module, count) in &report.edited {
        out.push_str(&format!("    - {}: {}\n", module, count));
    }

    if report.accessible > 0 {
        out.push_str(&format!("  Files accessible: {}\n", report.accessible));
    }
    out.push_str(&format!("  Modules tested: {}\n", report.modules_tested()));

    if !report.skipped.is_empty() {
        out.push_str("\n## Skipped\n");
        for reason in &report.skipped {
            out.push_str(&format!("  - {}\n", reason));
        }
    }

    if report.errors.is_empty() {
        out.push_str("\nNo errors recorded.\n");
    } else {
        out.push_str(&format!("\n## Errors ({})\n", report.errors.len()));
        for error in &report.errors {
            out.push_str(&format!("  - {}\n", error));
        }
    }

    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_merges_counts() {
        let mut total = SmokeReport::new();
        total.record_created("patients");

        let mut step = SmokeReport::new();
        step.record_created("patients");
        step.record_edited("patients");
        step.error("Budget PUT 4: 500");
        step.skip("appointments: no patient id");
        total.absorb(step);

        assert_eq!(total.created.get("patients"), Some(&2));
        assert_eq!(total.total_edited(), 1);
        assert_eq!(total.errors, vec!["Budget PUT 4: 500".to_string()]);
        assert_eq!(total.skipped.len(), 1);
        assert!(!total.is_clean());
    }

    #[test]
    fn test_report_lists_errors() {
        let mut report = SmokeReport::new();
        report.record_created("products");
        report.error("Patients GET: 503");

        let text = generate_smoke_report("Modules", &report);
        assert!(text.contains("# Modules summary:"));
        assert!(text.contains("Records created: 1"));
        assert!(text.contains("    - products: 1"));
        assert!(text.contains("## Errors (1)"));
        assert!(text.contains("  - Patients GET: 503"));
    }
}
