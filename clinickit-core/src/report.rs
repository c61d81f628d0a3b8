// Console report for annotate runs

use crate::run::RunSummary;

/// Generate the end-of-run report
pub fn generate_run_report(summary: &RunSummary, dry_run: bool) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");

    let verb = if dry_run { "needing changes" } else { "updated" };
    report.push_str(&format!("  Files {}: {}\n", verb, summary.updated()));
    report.push_str(&format!("  Files unchanged: {}\n", summary.unchanged()));

    let gated = summary.total_gated();
    report.push_str(&format!(
        "  Elements gated: {} (create {}, edit {}, delete {})\n",
        gated.total(),
        gated.create,
        gated.edit,
        gated.delete
    ));

    let skips = summary.anchor_skips();
    if !skips.is_empty() {
        report.push_str("\n## Permission handle not inserted (no useNavigate() line)\n");
        for outcome in skips {
            report.push_str(&format!("  {}\n", outcome.path.display()));
        }
    }

    if !summary.missing.is_empty() {
        report.push_str("\n## Pages not found\n");
        for file_name in &summary.missing {
            report.push_str(&format!("  {}\n", file_name));
        }
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report
}
