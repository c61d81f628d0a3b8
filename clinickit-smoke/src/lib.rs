pub mod client;
pub mod entities;
pub mod error;
pub mod menu;
pub mod report;
pub mod suites;

pub use client::{ApiClient, Session};
pub use error::SmokeError;
pub use menu::{MenuCheck, PermissionSet, check_menu, generate_menu_report};
pub use report::{SmokeReport, generate_smoke_report};
pub use suites::{StepCallback, Suite, SuiteContext, run_exams, run_modules, run_system};
