//! Mapping of generic profile fields onto partition columns.
//!
//! Every partition names and stores profile data differently. This table is
//! the single place that says which generic field lands in which column of
//! which partition, and whether it may be changed after registration.

use super::models::{ColumnValue, ColumnValues, Partition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    DisplayName,
    FamilyName,
    Phone,
    NationalId,
    BirthDate,
    Gender,
    Address,
    Department,
    Province,
    District,
    LicenseNumber,
    SpecialtyId,
    Biography,
    YearsOfExperience,
    BloodType,
    Allergies,
    MedicalConditions,
    EmergencyContactName,
    EmergencyContactPhone,
}

/// Whether a mapping is being resolved for a new record or a profile update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingPurpose {
    Create,
    Update,
}

struct FieldSpec {
    field: ProfileField,
    column: &'static str,
    partitions: &'static [Partition],
    updatable: bool,
}

const ALL: &[Partition] = &[
    Partition::Administrators,
    Partition::Doctors,
    Partition::Patients,
];
const ADMIN_AND_PATIENT: &[Partition] = &[Partition::Administrators, Partition::Patients];
const DOCTOR_AND_PATIENT: &[Partition] = &[Partition::Doctors, Partition::Patients];
const DOCTOR: &[Partition] = &[Partition::Doctors];
const PATIENT: &[Partition] = &[Partition::Patients];

#[rustfmt::skip]
const FIELD_MAP: &[FieldSpec] = &[
    FieldSpec { field: ProfileField::DisplayName, column: "first_name", partitions: ALL, updatable: true },
    FieldSpec { field: ProfileField::FamilyName, column: "last_names", partitions: ALL, updatable: true },
    FieldSpec { field: ProfileField::Phone, column: "phone", partitions: DOCTOR_AND_PATIENT, updatable: true },
    FieldSpec { field: ProfileField::NationalId, column: "national_id", partitions: ALL, updatable: false },
    FieldSpec { field: ProfileField::BirthDate, column: "birth_date", partitions: ALL, updatable: false },
    FieldSpec { field: ProfileField::Gender, column: "gender", partitions: DOCTOR_AND_PATIENT, updatable: false },
    FieldSpec { field: ProfileField::Address, column: "address", partitions: ADMIN_AND_PATIENT, updatable: true },
    FieldSpec { field: ProfileField::Department, column: "department", partitions: ADMIN_AND_PATIENT, updatable: true },
    FieldSpec { field: ProfileField::Province, column: "province", partitions: ADMIN_AND_PATIENT, updatable: true },
    FieldSpec { field: ProfileField::District, column: "district", partitions: ADMIN_AND_PATIENT, updatable: true },
    FieldSpec { field: ProfileField::LicenseNumber, column: "license_number", partitions: DOCTOR, updatable: true },
    FieldSpec { field: ProfileField::SpecialtyId, column: "specialty_id", partitions: DOCTOR, updatable: true },
    FieldSpec { field: ProfileField::Biography, column: "biography", partitions: DOCTOR, updatable: true },
    FieldSpec { field: ProfileField::YearsOfExperience, column: "years_of_experience", partitions: DOCTOR, updatable: true },
    FieldSpec { field: ProfileField::BloodType, column: "blood_type", partitions: PATIENT, updatable: true },
    FieldSpec { field: ProfileField::Allergies, column: "allergies", partitions: PATIENT, updatable: true },
    FieldSpec { field: ProfileField::MedicalConditions, column: "medical_conditions", partitions: PATIENT, updatable: true },
    FieldSpec { field: ProfileField::EmergencyContactName, column: "emergency_contact_name", partitions: PATIENT, updatable: false },
    FieldSpec { field: ProfileField::EmergencyContactPhone, column: "emergency_contact_phone", partitions: PATIENT, updatable: false },
];

impl ProfileField {
    /// Column backing this field in `partition`, if the partition stores it.
    pub fn column(self, partition: Partition, purpose: MappingPurpose) -> Option<&'static str> {
        FIELD_MAP
            .iter()
            .find(|spec| spec.field == self)
            .filter(|spec| spec.partitions.contains(&partition))
            .filter(|spec| purpose == MappingPurpose::Create || spec.updatable)
            .map(|spec| spec.column)
    }
}

/// Translates generic field values into column assignments for `partition`.
///
/// Fields the partition does not store, or may not change for `purpose`,
/// are dropped without error.
pub fn map_fields(
    partition: Partition,
    purpose: MappingPurpose,
    values: Vec<(ProfileField, ColumnValue)>,
) -> ColumnValues {
    values
        .into_iter()
        .filter_map(|(field, value)| {
            field
                .column(partition, purpose)
                .map(|column| (column, value))
        })
        .collect()
}
