//! Rust structs that represent the identity partition tables.
//!
//! Administrators, doctors and patients live in three separate tables with
//! partly different columns. These models mirror the stored rows; the
//! normalized view lives in `services::identity_service`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// Role of an identity. Determined by the partition a record lives in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    pub fn partition(self) -> Partition {
        match self {
            Role::Admin => Partition::Administrators,
            Role::Doctor => Partition::Doctors,
            Role::Patient => Partition::Patients,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// One of the three disjoint identity tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Administrators,
    Doctors,
    Patients,
}

impl Partition {
    /// Resolution order. The first partition holding a match wins.
    pub const LOOKUP_ORDER: [Partition; 3] = [
        Partition::Administrators,
        Partition::Doctors,
        Partition::Patients,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Partition::Administrators => "administrators",
            Partition::Doctors => "doctors",
            Partition::Patients => "patients",
        }
    }

    /// Column and value marking a record as active (or inactive).
    ///
    /// Administrators carry an integer status where 1 means active; the
    /// other partitions carry a boolean flag.
    pub fn activity(self, active: bool) -> (&'static str, ColumnValue) {
        match self {
            Partition::Administrators => ("status", ColumnValue::Integer(Some(i64::from(active)))),
            Partition::Doctors | Partition::Patients => ("is_active", ColumnValue::Bool(active)),
        }
    }

    pub fn active_filter(self) -> RowFilter {
        let (column, value) = self.activity(true);
        RowFilter::Eq(column, value)
    }
}

/// A value bound to a column in a filter, insert or update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Bool(bool),
    Date(Option<NaiveDate>),
    Timestamp(DateTime<Utc>),
}

impl ColumnValue {
    /// Renders the value the way the REST query API expects it in filters.
    pub fn to_filter_literal(&self) -> String {
        match self {
            ColumnValue::Text(Some(text)) => text.clone(),
            ColumnValue::Integer(Some(number)) => number.to_string(),
            ColumnValue::Bool(flag) => flag.to_string(),
            ColumnValue::Date(Some(date)) => date.format("%Y-%m-%d").to_string(),
            ColumnValue::Timestamp(at) => at.to_rfc3339(),
            ColumnValue::Text(None) | ColumnValue::Integer(None) | ColumnValue::Date(None) => {
                "null".to_string()
            }
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(Some(value.to_string()))
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(Some(value))
    }
}

impl From<Option<String>> for ColumnValue {
    fn from(value: Option<String>) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Integer(Some(value))
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Bool(value)
    }
}

/// Row predicate understood by every store backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RowFilter {
    Eq(&'static str, ColumnValue),
    NotEq(&'static str, ColumnValue),
}

/// Column assignments for inserts and partial updates.
pub type ColumnValues = Vec<(&'static str, ColumnValue)>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdministratorRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_names: String,
    pub password_hash: String,
    pub status: i64,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_names: String,
    pub password_hash: String,
    pub is_active: bool,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub specialty_id: Option<i64>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub years_of_experience: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatientRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_names: String,
    pub password_hash: String,
    pub is_active: bool,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medical_conditions: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A stored record together with the partition it came from.
#[derive(Debug, Clone)]
pub enum PartitionRecord {
    Admin(AdministratorRow),
    Doctor(DoctorRow),
    Patient(PatientRow),
}

impl PartitionRecord {
    pub fn partition(&self) -> Partition {
        match self {
            PartitionRecord::Admin(_) => Partition::Administrators,
            PartitionRecord::Doctor(_) => Partition::Doctors,
            PartitionRecord::Patient(_) => Partition::Patients,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PartitionRecord::Admin(row) => &row.id,
            PartitionRecord::Doctor(row) => &row.id,
            PartitionRecord::Patient(row) => &row.id,
        }
    }
}

/// Ids come back as strings or numbers depending on the table definition.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}
