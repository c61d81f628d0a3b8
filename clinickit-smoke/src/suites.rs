// Smoke suites driven against a logged-in API client

use crate::client::{ApiClient, DOWNLOAD_CHECK_TIMEOUT, Session};
use crate::entities::{self, Entity, merged, record_id};
use crate::report::SmokeReport;
use chrono::{Local, NaiveDateTime};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback invoked as each step of a suite starts
pub type StepCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Which suite to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    Modules,
    System,
    Exams,
    Menu,
}

impl Suite {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "modules" => Some(Self::Modules),
            "system" => Some(Self::System),
            "exams" => Some(Self::Exams),
            "menu" => Some(Self::Menu),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Modules => "Module sweep",
            Self::System => "Complete system",
            Self::Exams => "Exam downloads",
            Self::Menu => "Login and menu",
        }
    }
}

/// Shared state for one suite run
pub struct SuiteContext<'a> {
    client: &'a ApiClient,
    session: &'a Session,
    progress: Option<StepCallback>,
    now: fn() -> NaiveDateTime,
}

impl<'a> SuiteContext<'a> {
    pub fn new(client: &'a ApiClient, session: &'a Session) -> Self {
        Self {
            client,
            session,
            progress: None,
            now: || Local::now().naive_local(),
        }
    }

    pub fn with_progress_callback(mut self, callback: StepCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Override the clock used for timestamps in payloads
    pub fn with_clock(mut self, now: fn() -> NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    fn step(&self, name: &str) {
        info!("Testing {}", name);
        if let Some(ref callback) = self.progress {
            callback(name);
        }
    }

    fn now(&self) -> NaiveDateTime {
        (self.now)()
    }
}

// ============================================================================
// Module sweep: list, edit the first record, create a new one
// ============================================================================

/// List, edit and create across the main modules
pub async fn run_modules(ctx: &SuiteContext<'_>) -> SmokeReport {
    let mut report = SmokeReport::new();

    let now = ctx.now();
    let (step, first_patient) = sweep(ctx, &entities::PATIENTS, "notes", Some(entities::patient(now))).await;
    report.absorb(step);

    // New appointments reuse a patient from the listing when there is one
    ctx.step(entities::APPOINTMENTS.module);
    let (step, first_appointment) = list_and_edit(ctx, &entities::APPOINTMENTS, "notes").await;
    report.absorb(step);
    if let Some(listing) = first_appointment.as_ref() {
        let patient_id = listing
            .as_ref()
            .and_then(|record| record.get("patient_id"))
            .and_then(Value::as_i64)
            .or_else(|| first_patient.as_ref().and_then(record_id));
        match patient_id {
            Some(patient_id) => {
                let payload = entities::appointment(patient_id, ctx.session.user.id, now);
                report.absorb(create(ctx, &entities::APPOINTMENTS, &payload).await.0);
            }
            None => report.skip("Appointment POST: no patient to book"),
        }
    }

    report.absorb(sweep(ctx, &entities::BUDGETS, "notes", None).await.0);
    report.absorb(sweep(ctx, &entities::PRODUCTS, "notes", Some(entities::product(now))).await.0);
    report.absorb(sweep(ctx, &entities::TASKS, "description", None).await.0);

    report
}

/// List an entity, edit its first record and optionally create a new one.
/// Returns the first listed record.
async fn sweep(
    ctx: &SuiteContext<'_>,
    entity: &Entity,
    stamp_field: &str,
    new_record: Option<Value>,
) -> (SmokeReport, Option<Value>) {
    ctx.step(entity.module);
    let (mut report, listing) = list_and_edit(ctx, entity, stamp_field).await;

    let Some(first) = listing else {
        return (report, None);
    };

    if let Some(payload) = new_record {
        report.absorb(create(ctx, entity, &payload).await.0);
    }

    (report, first)
}

/// `None` when the listing failed, otherwise the first record if any
async fn list_and_edit(
    ctx: &SuiteContext<'_>,
    entity: &Entity,
    stamp_field: &str,
) -> (SmokeReport, Option<Option<Value>>) {
    let mut report = SmokeReport::new();
    let query = [("page", "1".to_string()), ("page_size", "10".to_string())];

    let body = match ctx.client.get(entity.path, &query).await {
        Ok(response) if response.status == 200 => response.body,
        Ok(response) => {
            report.error(format!("{} GET: {}", entity.plural, response.status));
            return (report, None);
        }
        Err(e) => {
            report.error(format!("{} GET: {}", entity.plural, e));
            return (report, None);
        }
    };

    let records = entity.records(&body);
    debug!("{} {} listed", records.len(), entity.module);

    let Some(first) = records.first().cloned() else {
        return (report, Some(None));
    };

    if let Some(id) = record_id(&first) {
        let edited = merged(&first, json!({ stamp_field: entities::edit_stamp(ctx.now()) }));
        match ctx.client.put(&entity.item_path(id), &edited).await {
            Ok(response) if response.status == 200 => report.record_edited(entity.module),
            Ok(response) => {
                report.error(format!("{} PUT {}: {}", entity.singular, id, response.status))
            }
            Err(e) => report.error(format!("{} PUT {}: {}", entity.singular, id, e)),
        }
    } else {
        report.skip(format!("{} PUT: first record has no id", entity.singular));
    }

    (report, Some(Some(first)))
}

/// POST a new record. Returns the created id when the response carries one.
async fn create(ctx: &SuiteContext<'_>, entity: &Entity, payload: &Value) -> (SmokeReport, Option<i64>) {
    let mut report = SmokeReport::new();

    match ctx.client.post(entity.path, payload).await {
        Ok(response) if response.status == 201 => {
            report.record_created(entity.module);
            let id = entity.created_id(&response.body);
            if id.is_none() {
                warn!("{} created without an id in the response", entity.singular);
            }
            (report, id)
        }
        Ok(response) => {
            report.error(format!("{} POST: {}", entity.singular, response.status));
            (report, None)
        }
        Err(e) => {
            report.error(format!("{} POST: {}", entity.singular, e));
            (report, None)
        }
    }
}

// ============================================================================
// Complete system: create then edit every module, chaining ids
// ============================================================================

/// Create and edit a record in every module, feeding created patient and
/// product ids to the modules that depend on them
pub async fn run_system(ctx: &SuiteContext<'_>) -> SmokeReport {
    let mut report = SmokeReport::new();
    let now = ctx.now();

    let (step, patient_id) = create_then_edit(
        ctx,
        &entities::PATIENTS,
        entities::patient(now),
        json!({ "phone": "(11) 91111-2222", "notes": "Patient updated by the smoke run" }),
    )
    .await;
    report.absorb(step);

    match patient_id {
        Some(patient_id) => {
            let (step, _) = create_then_edit(
                ctx,
                &entities::APPOINTMENTS,
                entities::appointment(patient_id, ctx.session.user.id, now),
                json!({ "status": "confirmed", "notes": "Appointment confirmed by the smoke run" }),
            )
            .await;
            report.absorb(step);
        }
        None => report.skip("appointments: no patient id"),
    }

    let (step, _) = create_then_edit(
        ctx,
        &entities::TASKS,
        entities::task(ctx.session.user.id, now),
        json!({ "status": "in_progress", "description": "Task updated - now in progress" }),
    )
    .await;
    report.absorb(step);

    match patient_id {
        Some(patient_id) => {
            let (step, _) = create_then_edit(
                ctx,
                &entities::MEDICAL_RECORDS,
                entities::medical_record(patient_id),
                json!({ "notes": "Updated: patient improved after treatment" }),
            )
            .await;
            report.absorb(step);

            let (step, _) = create_then_edit(
                ctx,
                &entities::BUDGETS,
                entities::budget(patient_id),
                json!({ "discount": 100.0, "notes": "Budget updated with higher discount" }),
            )
            .await;
            report.absorb(step);
        }
        None => {
            report.skip("medical_records: no patient id");
            report.skip("budgets: no patient id");
        }
    }

    let (step, _) = create_then_edit(
        ctx,
        &entities::PAYMENTS,
        entities::payment(now),
        json!({ "notes": "Payment updated by the smoke run" }),
    )
    .await;
    report.absorb(step);

    let (step, product_id) = create_then_edit(
        ctx,
        &entities::PRODUCTS,
        entities::product(now),
        json!({ "unit_price": 55.0, "description": "Product updated - new price" }),
    )
    .await;
    report.absorb(step);

    let (step, _) = create_then_edit(
        ctx,
        &entities::SUPPLIERS,
        entities::supplier(now),
        json!({ "phone": "(11) 3333-5555", "notes": "Supplier updated by the smoke run" }),
    )
    .await;
    report.absorb(step);

    // Stock movements are append-only
    match product_id {
        Some(product_id) => {
            ctx.step(entities::STOCK_MOVEMENTS.module);
            let payload = entities::stock_movement(product_id);
            report.absorb(create(ctx, &entities::STOCK_MOVEMENTS, &payload).await.0);
        }
        None => report.skip("stock_movements: no product id"),
    }

    let (step, _) = create_then_edit(
        ctx,
        &entities::CAMPAIGNS,
        entities::campaign(now),
        json!({ "message": "Updated campaign message!", "status": "scheduled" }),
    )
    .await;
    report.absorb(step);

    match patient_id {
        Some(patient_id) => {
            let (step, _) = create_then_edit(
                ctx,
                &entities::PRESCRIPTIONS,
                entities::prescription(patient_id),
                json!({ "notes": "Prescription updated - patient allergies checked" }),
            )
            .await;
            report.absorb(step);
        }
        None => report.skip("prescriptions: no patient id"),
    }

    report
}

/// Create a record, then PUT it back with `changes` applied. Returns the
/// created id even when the edit fails.
async fn create_then_edit(
    ctx: &SuiteContext<'_>,
    entity: &Entity,
    payload: Value,
    changes: Value,
) -> (SmokeReport, Option<i64>) {
    ctx.step(entity.module);
    let (mut report, id) = create(ctx, entity, &payload).await;

    let Some(id) = id else {
        if report.created.contains_key(entity.module) {
            report.skip(format!("{}: created record has no id", entity.module));
        }
        return (report, None);
    };

    let edited = merged(&payload, changes);
    match ctx.client.put(&entity.item_path(id), &edited).await {
        Ok(response) if response.status == 200 => report.record_edited(entity.module),
        Ok(response) => report.error(format!("{} PUT {}: {}", entity.singular, id, response.status)),
        Err(e) => report.error(format!("{} PUT {}: {}", entity.singular, id, e)),
    }

    (report, Some(id))
}

// ============================================================================
// Exam downloads: every exam of a patient must have a reachable file
// ============================================================================

/// Fetch a download URL for each exam of `patient_id` and check the file
/// answers a HEAD request
pub async fn run_exams(ctx: &SuiteContext<'_>, patient_id: i64) -> SmokeReport {
    let mut report = SmokeReport::new();
    ctx.step(entities::EXAMS.module);

    let query = [("patient_id", patient_id.to_string())];
    let body = match ctx.client.get(entities::EXAMS.path, &query).await {
        Ok(response) if response.status == 200 => response.body,
        Ok(response) => {
            report.error(format!("Exams GET: {}", response.status));
            return report;
        }
        Err(e) => {
            report.error(format!("Exams GET: {}", e));
            return report;
        }
    };

    let exams = entities::EXAMS.records(&body);
    info!("Found {} exam(s) for patient {}", exams.len(), patient_id);
    if exams.is_empty() {
        report.skip(format!("no exams for patient {}", patient_id));
        return report;
    }

    for exam in exams {
        let Some(id) = record_id(exam) else {
            report.skip("exam without an id");
            continue;
        };
        let name = exam.get("name").and_then(Value::as_str).unwrap_or("unnamed");
        ctx.step(&format!("exam #{} {}", id, name));
        report.absorb(check_exam_download(ctx, id).await);
    }

    report
}

async fn check_exam_download(ctx: &SuiteContext<'_>, id: i64) -> SmokeReport {
    let mut report = SmokeReport::new();

    let path = format!("{}/download", entities::EXAMS.item_path(id));
    let body = match ctx.client.get(&path, &[]).await {
        Ok(response) if response.status == 200 => response.body,
        Ok(response) => {
            report.error(format!("Exam #{}: status {} fetching download URL", id, response.status));
            return report;
        }
        Err(e) => {
            report.error(format!("Exam #{}: {}", id, e));
            return report;
        }
    };

    let Some(url) = body.get("download_url").and_then(Value::as_str) else {
        report.error(format!("Exam #{}: no download_url in response", id));
        return report;
    };
    let expires_in = body.get("expires_in").and_then(Value::as_i64).unwrap_or(0);
    debug!("Exam #{} download URL expires in {}s", id, expires_in);

    match ctx.client.head(url, DOWNLOAD_CHECK_TIMEOUT).await {
        Ok(head) if head.status == 200 => {
            debug!(
                "Exam #{} file: {} ({} bytes)",
                id,
                head.content_type.as_deref().unwrap_or("unknown type"),
                head.content_length
                    .map(|len| len.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            );
            report.record_accessible();
        }
        Ok(head) => report.error(format!("Exam #{}: HTTP {} fetching file", id, head.status)),
        Err(e) => report.error(format!("Exam #{}: {}", id, e)),
    }

    report
}
