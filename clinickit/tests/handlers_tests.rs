use clinickit::handlers::*;
use clinickit::{FileOutcome, ModuleMap};
use clinickit_core::annotate::{ActionCounts, HandleStatus};
use clinickit_core::imports::ImportStatus;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};
use tracing::Level;

fn outcome(import: ImportStatus, handle: HandleStatus, gated: ActionCounts) -> FileOutcome {
    FileOutcome {
        path: PathBuf::from("pages/Exams.jsx"),
        module: "exams".to_string(),
        import,
        handle,
        gated,
        already_gated: ActionCounts::default(),
        changed: true,
        written: true,
    }
}

#[test]
fn test_verbosity_levels() {
    assert_eq!(verbosity_level(0), Level::WARN);
    assert_eq!(verbosity_level(1), Level::INFO);
    assert_eq!(verbosity_level(2), Level::DEBUG);
    assert_eq!(verbosity_level(7), Level::TRACE);
}

#[test]
fn test_resolve_path() {
    assert_eq!(resolve_path("frontend/src/pages"), PathBuf::from("frontend/src/pages"));
    assert!(!resolve_path("~/pages").starts_with("~"));
}

#[test]
fn test_outcome_details() {
    let details = outcome_details(&outcome(
        ImportStatus::Merged,
        HandleStatus::Inserted,
        ActionCounts {
            create: 1,
            edit: 2,
            delete: 0,
        },
    ));
    assert_eq!(
        details,
        vec![
            "import merged".to_string(),
            "permission handle added".to_string(),
            "3 gated (create 1, edit 2, delete 0)".to_string(),
        ]
    );

    let details = outcome_details(&outcome(
        ImportStatus::Present,
        HandleStatus::MissingAnchor,
        ActionCounts::default(),
    ));
    assert_eq!(details, vec!["no useNavigate() line".to_string()]);
}

#[test]
fn test_load_module_map_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, r#"{{"Tasks.jsx": "tasks"}}"#)?;

    let map = load_module_map(Some(temp_file.path()))?;
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("Tasks.jsx"), Some("tasks"));

    Ok(())
}

#[test]
fn test_load_module_map_defaults() {
    let map = load_module_map(None).unwrap();
    assert_eq!(map, ModuleMap::default());
}

#[test]
fn test_run_annotate_dry_run_leaves_files() {
    let dir = TempDir::new().unwrap();
    let page = "const Payments = () => {\n  const navigate = useNavigate();\n  return <Button icon={<EditOutlined />} />;\n};\n";
    fs::create_dir_all(dir.path().join("finance")).unwrap();
    fs::write(dir.path().join("finance/Payments.jsx"), page).unwrap();

    let summary = run_annotate(
        dir.path(),
        &ModuleMap::default(),
        "@/contexts/AuthContext",
        true,
        None,
    )
    .unwrap();

    assert_eq!(summary.updated(), 1);
    assert_eq!(summary.outcomes[0].gated.edit, 1);
    assert!(!summary.outcomes[0].written);
    assert_eq!(summary.missing.len(), 8);
    assert_eq!(
        fs::read_to_string(dir.path().join("finance/Payments.jsx")).unwrap(),
        page
    );
}

#[test]
fn test_credentials_from_arguments() {
    let matches = clap::Command::new("smoke")
        .arg(clap::arg!(--"email" <EMAIL>))
        .arg(clap::arg!(--"password" <PASSWORD>))
        .try_get_matches_from(["smoke", "--email", "ana@clinic.test", "--password", "s3cret"])
        .unwrap();

    let (email, password) = credentials(&matches).unwrap();
    assert_eq!(email, "ana@clinic.test");
    assert_eq!(password, "s3cret");
}
