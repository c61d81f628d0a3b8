// Entity catalog and request payloads for the clinic API

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde_json::{Value, json};

/// A REST collection exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    /// Permission module identifier, also used as the report key
    pub module: &'static str,
    /// Collection path under the API base URL
    pub path: &'static str,
    /// Key holding the records in a list response
    pub list_key: &'static str,
    /// Keys that may hold the created object in a create response
    pub item_keys: &'static [&'static str],
    /// The create response may be the object itself
    pub root_item: bool,
    pub singular: &'static str,
    pub plural: &'static str,
}

impl Entity {
    const fn new(
        module: &'static str,
        path: &'static str,
        item_keys: &'static [&'static str],
        singular: &'static str,
        plural: &'static str,
    ) -> Self {
        Self {
            module,
            path,
            list_key: module,
            item_keys,
            root_item: false,
            singular,
            plural,
        }
    }

    const fn with_root_item(mut self) -> Self {
        self.root_item = true;
        self
    }

    /// Path of a single record
    pub fn item_path(&self, id: i64) -> String {
        format!("{}/{}", self.path, id)
    }

    /// Records of a list response, or nothing when the key is absent
    pub fn records<'a>(&self, body: &'a Value) -> &'a [Value] {
        body.get(self.list_key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Id of the object returned by a create call
    pub fn created_id(&self, body: &Value) -> Option<i64> {
        self.item_keys
            .iter()
            .find_map(|key| body.get(*key).and_then(record_id))
            .or_else(|| if self.root_item { record_id(body) } else { None })
    }
}

/// The `id` field of a record
pub fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

pub const PATIENTS: Entity = Entity::new("patients", "patients", &["patient"], "Patient", "Patients");
pub const APPOINTMENTS: Entity = Entity::new(
    "appointments",
    "appointments",
    &["appointment"],
    "Appointment",
    "Appointments",
);
pub const TASKS: Entity = Entity::new("tasks", "tasks", &["task"], "Task", "Tasks");
pub const MEDICAL_RECORDS: Entity = Entity::new(
    "medical_records",
    "medical-records",
    &["medical_record", "record"],
    "Medical record",
    "Medical records",
)
.with_root_item();
pub const BUDGETS: Entity = Entity::new("budgets", "budgets", &["budget"], "Budget", "Budgets");
pub const PAYMENTS: Entity = Entity::new("payments", "payments", &["payment"], "Payment", "Payments");
pub const PRODUCTS: Entity = Entity::new("products", "products", &["product"], "Product", "Products");
pub const SUPPLIERS: Entity =
    Entity::new("suppliers", "suppliers", &["supplier"], "Supplier", "Suppliers");
pub const STOCK_MOVEMENTS: Entity = Entity::new(
    "stock_movements",
    "stock-movements",
    &["stock_movement", "movement"],
    "Stock movement",
    "Stock movements",
)
.with_root_item();
pub const CAMPAIGNS: Entity =
    Entity::new("campaigns", "campaigns", &["campaign"], "Campaign", "Campaigns");
pub const PRESCRIPTIONS: Entity = Entity::new(
    "prescriptions",
    "prescriptions",
    &["prescription"],
    "Prescription",
    "Prescriptions",
);
pub const EXAMS: Entity = Entity::new("exams", "exams", &["exam"], "Exam", "Exams");

const API_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Text stamped into an edited record
pub fn edit_stamp(now: NaiveDateTime) -> String {
    format!("TEST EDITED - {}", now.format("%H:%M:%S"))
}

/// Copy of `base` with the fields of `changes` overwritten
pub fn merged(base: &Value, changes: Value) -> Value {
    let mut out = base.clone();
    if let (Some(target), Value::Object(changes)) = (out.as_object_mut(), changes) {
        target.extend(changes);
    }
    out
}

fn compact(now: NaiveDateTime) -> String {
    now.format("%H%M%S").to_string()
}

pub fn patient(now: NaiveDateTime) -> Value {
    json!({
        "name": format!("Test Patient {}", compact(now)),
        "email": format!("patient{}@test.com", now.and_utc().timestamp()),
        "phone": "(11) 98765-4321",
        "cpf": "123.456.789-00",
        "birth_date": "1990-05-15T00:00:00Z",
        "address": "Rua Teste, 123",
        "city": "São Paulo",
        "state": "SP",
        "zip_code": "01234-567",
        "active": true
    })
}

/// Routine appointment three days out at 14:00, one hour long
pub fn appointment(patient_id: i64, dentist_id: i64, now: NaiveDateTime) -> Value {
    let start = (now.date() + Duration::days(3)).and_time(NaiveTime::MIN) + Duration::hours(14);
    let end = start + Duration::hours(1);
    json!({
        "patient_id": patient_id,
        "dentist_id": dentist_id,
        "title": "Consulta de Rotina",
        "type": "regular",
        "procedure": "Consulta de teste",
        "start_time": start.format(API_TIMESTAMP).to_string(),
        "end_time": end.format(API_TIMESTAMP).to_string(),
        "status": "scheduled",
        "notes": format!("TEST CREATED - {}", now.format("%H:%M:%S"))
    })
}

pub fn task(assignee: i64, now: NaiveDateTime) -> Value {
    json!({
        "title": format!("Test Task {}", now.format("%H:%M:%S")),
        "description": "Task created by the smoke run",
        "due_date": (now.date() + Duration::days(5)).format("%Y-%m-%d").to_string(),
        "priority": "high",
        "status": "pending",
        "assigned_to": [assignee]
    })
}

pub fn medical_record(patient_id: i64) -> Value {
    json!({
        "patient_id": patient_id,
        "diagnosis": "Cárie no dente 16",
        "treatment": "Restauração com resina composta",
        "prescription": "Analgésico 500mg - 1cp 8/8h por 3 dias",
        "notes": "Patient reported sensitivity"
    })
}

pub fn budget(patient_id: i64) -> Value {
    json!({
        "patient_id": patient_id,
        "description": "Tratamento completo",
        "items": [
            { "description": "Restauração", "quantity": 2, "unit_price": 250.0 },
            { "description": "Limpeza", "quantity": 1, "unit_price": 150.0 }
        ],
        "discount": 50.0,
        "notes": "Smoke run budget"
    })
}

pub fn payment(now: NaiveDateTime) -> Value {
    json!({
        "description": format!("Payment Test {}", now.format("%H:%M:%S")),
        "amount": 500.0,
        "payment_method": "credit_card",
        "payment_date": now.date().format("%Y-%m-%d").to_string(),
        "status": "completed",
        "notes": "Smoke run payment"
    })
}

pub fn product(now: NaiveDateTime) -> Value {
    json!({
        "name": format!("Product Test {}", compact(now)),
        "sku": format!("SKU{}", now.and_utc().timestamp()),
        "code": format!("TST{}", compact(now)),
        "description": "Smoke run product",
        "category": "Materials",
        "unit_price": 50.0,
        "stock_quantity": 100,
        "min_stock": 10,
        "active": true
    })
}

pub fn supplier(now: NaiveDateTime) -> Value {
    json!({
        "name": format!("Supplier Test {}", compact(now)),
        "cnpj": "12.345.678/0001-90",
        "email": format!("supplier{}@test.com", now.and_utc().timestamp()),
        "phone": "(11) 3333-4444",
        "address": "Av. Test, 456",
        "city": "São Paulo",
        "state": "SP",
        "zip_code": "01234-567",
        "active": true
    })
}

pub fn stock_movement(product_id: i64) -> Value {
    json!({
        "product_id": product_id,
        "type": "entry",
        "quantity": 50,
        "reason": "purchase",
        "notes": "Smoke run stock movement"
    })
}

pub fn campaign(now: NaiveDateTime) -> Value {
    json!({
        "name": format!("Campaign Test {}", now.format("%H:%M:%S")),
        "message": "Hello! This is a test campaign message.",
        "scheduled_date": (now + Duration::days(2)).format("%Y-%m-%dT%H:%M:%S").to_string(),
        "status": "draft"
    })
}

pub fn prescription(patient_id: i64) -> Value {
    json!({
        "patient_id": patient_id,
        "medications": [{
            "name": "Amoxicilina 500mg",
            "dosage": "1 cápsula",
            "frequency": "8/8h",
            "duration": "7 dias"
        }],
        "notes": "Smoke run prescription"
    })
}
