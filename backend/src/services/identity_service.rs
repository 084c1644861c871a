//! Identity resolution across the administrator, doctor and patient partitions.
//!
//! Callers see a single `Identity` no matter which table a record lives in.
//! Lookups walk the partitions in `Partition::LOOKUP_ORDER` and stop at the
//! first match; writes always go to the identity's origin partition.

use crate::database::field_map::{MappingPurpose, ProfileField, map_fields};
use crate::database::models::{
    AdministratorRow, ColumnValue, ColumnValues, DoctorRow, Partition, PartitionRecord, PatientRow,
    Role, RowFilter,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::partition_store::PartitionStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Normalized view of a record from any partition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub family_name: String,
    pub role: Role,
    pub active: bool,
    pub origin_partition: Partition,
    pub created_at: Option<DateTime<Utc>>,
    pub profile: RoleProfile,
    #[serde(skip)]
    secret_hash: String,
}

impl Identity {
    pub(crate) fn secret_hash(&self) -> &str {
        &self.secret_hash
    }
}

/// Role-specific profile data carried by an identity.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RoleProfile {
    Admin(AdminProfile),
    Doctor(DoctorProfile),
    Patient(PatientProfile),
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub national_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub national_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub specialty_id: Option<i64>,
    pub biography: Option<String>,
    pub years_of_experience: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub national_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

impl From<AdministratorRow> for Identity {
    fn from(row: AdministratorRow) -> Self {
        Identity {
            id: row.id,
            email: row.email,
            display_name: row.first_name,
            family_name: row.last_names,
            role: Role::Admin,
            active: row.status == 1,
            origin_partition: Partition::Administrators,
            created_at: row.created_at,
            profile: RoleProfile::Admin(AdminProfile {
                national_id: row.national_id,
                birth_date: row.birth_date,
                address: row.address,
                department: row.department,
                province: row.province,
                district: row.district,
            }),
            secret_hash: row.password_hash,
        }
    }
}

impl From<DoctorRow> for Identity {
    fn from(row: DoctorRow) -> Self {
        Identity {
            id: row.id,
            email: row.email,
            display_name: row.first_name,
            family_name: row.last_names,
            role: Role::Doctor,
            active: row.is_active,
            origin_partition: Partition::Doctors,
            created_at: row.created_at,
            profile: RoleProfile::Doctor(DoctorProfile {
                national_id: row.national_id,
                birth_date: row.birth_date,
                gender: row.gender,
                phone: row.phone,
                license_number: row.license_number,
                specialty_id: row.specialty_id,
                biography: row.biography,
                years_of_experience: row.years_of_experience,
            }),
            secret_hash: row.password_hash,
        }
    }
}

impl From<PatientRow> for Identity {
    fn from(row: PatientRow) -> Self {
        Identity {
            id: row.id,
            email: row.email,
            display_name: row.first_name,
            family_name: row.last_names,
            role: Role::Patient,
            active: row.is_active,
            origin_partition: Partition::Patients,
            created_at: row.created_at,
            profile: RoleProfile::Patient(PatientProfile {
                national_id: row.national_id,
                birth_date: row.birth_date,
                gender: row.gender,
                phone: row.phone,
                address: row.address,
                department: row.department,
                province: row.province,
                district: row.district,
                blood_type: row.blood_type,
                allergies: row.allergies,
                medical_conditions: row.medical_conditions,
                emergency_contact_name: row.emergency_contact_name,
                emergency_contact_phone: row.emergency_contact_phone,
            }),
            secret_hash: row.password_hash,
        }
    }
}

impl From<PartitionRecord> for Identity {
    fn from(record: PartitionRecord) -> Self {
        match record {
            PartitionRecord::Admin(row) => row.into(),
            PartitionRecord::Doctor(row) => row.into(),
            PartitionRecord::Patient(row) => row.into(),
        }
    }
}

/// Optional profile fields shared by registration and profile updates.
///
/// Each partition only stores a subset; the rest is dropped by the field map.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    #[validate(length(min = 6, max = 20, message = "Phone must be between 6 and 20 characters"))]
    pub phone: Option<String>,

    #[validate(length(
        min = 1,
        max = 20,
        message = "National ID must be between 1 and 20 characters"
    ))]
    pub national_id: Option<String>,

    pub birth_date: Option<NaiveDate>,

    #[validate(length(max = 20, message = "Gender must be at most 20 characters"))]
    pub gender: Option<String>,

    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    pub address: Option<String>,

    #[validate(length(max = 100, message = "Department must be at most 100 characters"))]
    pub department: Option<String>,

    #[validate(length(max = 100, message = "Province must be at most 100 characters"))]
    pub province: Option<String>,

    #[validate(length(max = 100, message = "District must be at most 100 characters"))]
    pub district: Option<String>,

    #[validate(length(
        min = 1,
        max = 50,
        message = "License number must be between 1 and 50 characters"
    ))]
    pub license_number: Option<String>,

    #[validate(range(min = 1, message = "Specialty must be a positive id"))]
    pub specialty_id: Option<i64>,

    #[validate(length(max = 2000, message = "Biography must be at most 2000 characters"))]
    pub biography: Option<String>,

    #[validate(range(min = 0, max = 80, message = "Years of experience must be between 0 and 80"))]
    pub years_of_experience: Option<i64>,

    #[validate(length(max = 5, message = "Blood type must be at most 5 characters"))]
    pub blood_type: Option<String>,

    #[validate(length(max = 1000, message = "Allergies must be at most 1000 characters"))]
    pub allergies: Option<String>,

    #[validate(length(max = 1000, message = "Medical conditions must be at most 1000 characters"))]
    pub medical_conditions: Option<String>,

    #[validate(length(
        max = 100,
        message = "Emergency contact name must be at most 100 characters"
    ))]
    pub emergency_contact_name: Option<String>,

    #[validate(length(
        min = 6,
        max = 20,
        message = "Emergency contact phone must be between 6 and 20 characters"
    ))]
    pub emergency_contact_phone: Option<String>,
}

impl ProfileDetails {
    /// Present values as generic field assignments.
    pub fn field_values(&self) -> Vec<(ProfileField, ColumnValue)> {
        let text = [
            (ProfileField::Phone, &self.phone),
            (ProfileField::NationalId, &self.national_id),
            (ProfileField::Gender, &self.gender),
            (ProfileField::Address, &self.address),
            (ProfileField::Department, &self.department),
            (ProfileField::Province, &self.province),
            (ProfileField::District, &self.district),
            (ProfileField::LicenseNumber, &self.license_number),
            (ProfileField::Biography, &self.biography),
            (ProfileField::BloodType, &self.blood_type),
            (ProfileField::Allergies, &self.allergies),
            (ProfileField::MedicalConditions, &self.medical_conditions),
            (ProfileField::EmergencyContactName, &self.emergency_contact_name),
            (ProfileField::EmergencyContactPhone, &self.emergency_contact_phone),
        ];
        let numbers = [
            (ProfileField::SpecialtyId, self.specialty_id),
            (ProfileField::YearsOfExperience, self.years_of_experience),
        ];

        let mut values: Vec<(ProfileField, ColumnValue)> = text
            .into_iter()
            .filter_map(|(field, value)| value.clone().map(|v| (field, ColumnValue::from(v))))
            .collect();
        values.extend(
            numbers
                .into_iter()
                .filter_map(|(field, value)| value.map(|v| (field, ColumnValue::from(v)))),
        );
        if let Some(date) = self.birth_date {
            values.push((ProfileField::BirthDate, ColumnValue::Date(Some(date))));
        }
        values
    }
}

/// Data for a new identity. The secret is already hashed.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub secret_hash: String,
    pub display_name: String,
    pub family_name: String,
    pub details: ProfileDetails,
}

impl NewIdentity {
    fn field_values(&self) -> Vec<(ProfileField, ColumnValue)> {
        let mut values = vec![
            (ProfileField::DisplayName, ColumnValue::from(self.display_name.as_str())),
            (ProfileField::FamilyName, ColumnValue::from(self.family_name.as_str())),
        ];
        values.extend(self.details.field_values());
        values
    }
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub family_name: Option<String>,
    pub details: ProfileDetails,
}

impl ProfileChanges {
    fn field_values(&self) -> Vec<(ProfileField, ColumnValue)> {
        let mut values = Vec::new();
        if let Some(name) = &self.display_name {
            values.push((ProfileField::DisplayName, ColumnValue::from(name.as_str())));
        }
        if let Some(name) = &self.family_name {
            values.push((ProfileField::FamilyName, ColumnValue::from(name.as_str())));
        }
        values.extend(self.details.field_values());
        values
    }
}

/// Resolves identities over the three partitions of a `PartitionStore`.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn PartitionStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn PartitionStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Round trip to the store.
    pub async fn ping(&self) -> ServiceResult<()> {
        self.store.ping().await?;
        Ok(())
    }

    /// Walks the partitions in lookup order and returns the first active match.
    async fn find_first(
        &self,
        column: &'static str,
        value: &str,
    ) -> ServiceResult<Option<Identity>> {
        for partition in Partition::LOOKUP_ORDER {
            let filters = [
                RowFilter::Eq(column, ColumnValue::from(value)),
                partition.active_filter(),
            ];
            if let Some(record) = self.store.select_one(partition, &filters).await? {
                debug!("Resolved {} in {}", column, partition.table());
                return Ok(Some(record.into()));
            }
        }
        Ok(None)
    }

    /// Finds the active identity owning `email`.
    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Identity> {
        self.find_first("email", email)
            .await?
            .ok_or_else(|| ServiceError::not_found("Identity", email))
    }

    /// Finds the active identity with `id`.
    pub async fn find_by_id(&self, id: &str) -> ServiceResult<Identity> {
        self.find_first("id", id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Identity", id))
    }

    /// Checks every partition for `email`, active or not.
    pub async fn email_exists(&self, email: &str, exclude_id: Option<&str>) -> ServiceResult<bool> {
        let mut filters = vec![RowFilter::Eq("email", ColumnValue::from(email))];
        if let Some(id) = exclude_id {
            filters.push(RowFilter::NotEq("id", ColumnValue::from(id)));
        }

        let mut total = 0;
        for partition in Partition::LOOKUP_ORDER {
            total += self.store.count(partition, &filters).await?;
        }
        Ok(total > 0)
    }

    /// Inserts a new identity into the partition owned by `role`.
    pub async fn create(&self, role: Role, new_identity: NewIdentity) -> ServiceResult<Identity> {
        if self.email_exists(&new_identity.email, None).await? {
            return Err(ServiceError::DuplicateEmail);
        }

        let partition = role.partition();
        let mut values: ColumnValues = vec![
            ("id", ColumnValue::from(Uuid::now_v7().to_string())),
            ("email", ColumnValue::from(new_identity.email.as_str())),
            ("password_hash", ColumnValue::from(new_identity.secret_hash.as_str())),
            partition.activity(true),
            ("created_at", ColumnValue::Timestamp(Utc::now())),
        ];
        values.extend(map_fields(
            partition,
            MappingPurpose::Create,
            new_identity.field_values(),
        ));

        let record = self.store.insert(partition, values).await?;
        info!("Created {} identity {}", role, record.id());
        Ok(record.into())
    }

    /// Applies a partial profile update to the identity's origin partition.
    ///
    /// Fields the partition does not store are ignored. When nothing applies
    /// the current identity is returned without a write.
    pub async fn update(&self, id: &str, changes: ProfileChanges) -> ServiceResult<Identity> {
        let current = self.find_by_id(id).await?;
        let partition = current.origin_partition;

        let mut values = map_fields(partition, MappingPurpose::Update, changes.field_values());
        if let Some(email) = changes.email.as_deref().filter(|email| *email != current.email) {
            if self.email_exists(email, Some(id)).await? {
                return Err(ServiceError::DuplicateEmail);
            }
            values.push(("email", ColumnValue::from(email)));
        }

        if values.is_empty() {
            return Ok(current);
        }

        self.write(partition, id, values).await
    }

    /// Replaces the stored password hash.
    pub async fn change_secret(
        &self,
        identity: &Identity,
        secret_hash: &str,
    ) -> ServiceResult<Identity> {
        self.write(
            identity.origin_partition,
            &identity.id,
            vec![("password_hash", ColumnValue::from(secret_hash))],
        )
        .await
    }

    /// Marks the identity inactive. Records are never deleted.
    pub async fn deactivate(&self, identity: &Identity) -> ServiceResult<Identity> {
        let partition = identity.origin_partition;
        let deactivated = self
            .write(partition, &identity.id, vec![partition.activity(false)])
            .await?;
        info!("Deactivated {} identity {}", identity.role, identity.id);
        Ok(deactivated)
    }

    async fn write(
        &self,
        partition: Partition,
        id: &str,
        values: ColumnValues,
    ) -> ServiceResult<Identity> {
        self.store
            .update(partition, id, values)
            .await?
            .map(Identity::from)
            .ok_or_else(|| ServiceError::not_found("Identity", id))
    }
}
