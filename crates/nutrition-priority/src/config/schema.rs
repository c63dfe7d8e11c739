use std::env;

/// Table and column identifiers the report queries are built from.
///
/// Every identifier is checked against `[A-Za-z_][A-Za-z0-9_]*` before it can
/// reach a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSchema {
    region_table: String,
    region_name_column: String,
    severity_column: String,
    geometry_column: String,
    beneficiary_table: String,
    beneficiary_status_column: String,
    beneficiary_district_column: String,
    facility_table: String,
    facility_type_column: String,
    facility_district_column: String,
}

impl Default for ReportSchema {
    fn default() -> Self {
        Self {
            region_table: "kecamatan".to_string(),
            region_name_column: "kecamatan".to_string(),
            severity_column: "jumlah_stunting".to_string(),
            geometry_column: "geom".to_string(),
            beneficiary_table: "balita".to_string(),
            beneficiary_status_column: "status_gizi".to_string(),
            beneficiary_district_column: "kecamatan".to_string(),
            facility_table: "faskes".to_string(),
            facility_type_column: "jenis".to_string(),
            facility_district_column: "kecamatan".to_string(),
        }
    }
}

impl ReportSchema {
    pub fn from_env() -> Result<Self, SchemaError> {
        let defaults = Self::default();
        Ok(Self {
            region_table: identifier_from_env("NUTRITION_REGION_TABLE", defaults.region_table)?,
            region_name_column: identifier_from_env(
                "NUTRITION_REGION_NAME_COLUMN",
                defaults.region_name_column,
            )?,
            severity_column: identifier_from_env(
                "NUTRITION_SEVERITY_COLUMN",
                defaults.severity_column,
            )?,
            geometry_column: identifier_from_env(
                "NUTRITION_GEOMETRY_COLUMN",
                defaults.geometry_column,
            )?,
            beneficiary_table: identifier_from_env(
                "NUTRITION_BENEFICIARY_TABLE",
                defaults.beneficiary_table,
            )?,
            beneficiary_status_column: identifier_from_env(
                "NUTRITION_BENEFICIARY_STATUS_COLUMN",
                defaults.beneficiary_status_column,
            )?,
            beneficiary_district_column: identifier_from_env(
                "NUTRITION_BENEFICIARY_DISTRICT_COLUMN",
                defaults.beneficiary_district_column,
            )?,
            facility_table: identifier_from_env(
                "NUTRITION_FACILITY_TABLE",
                defaults.facility_table,
            )?,
            facility_type_column: identifier_from_env(
                "NUTRITION_FACILITY_TYPE_COLUMN",
                defaults.facility_type_column,
            )?,
            facility_district_column: identifier_from_env(
                "NUTRITION_FACILITY_DISTRICT_COLUMN",
                defaults.facility_district_column,
            )?,
        })
    }

    pub fn region_table(&self) -> &str {
        &self.region_table
    }

    pub fn region_name_column(&self) -> &str {
        &self.region_name_column
    }

    pub fn severity_column(&self) -> &str {
        &self.severity_column
    }

    pub fn geometry_column(&self) -> &str {
        &self.geometry_column
    }

    pub fn beneficiary_table(&self) -> &str {
        &self.beneficiary_table
    }

    /// Column holding `normal`, `underweight`, `severely_underweight` or `stunting`.
    pub fn beneficiary_status_column(&self) -> &str {
        &self.beneficiary_status_column
    }

    pub fn beneficiary_district_column(&self) -> &str {
        &self.beneficiary_district_column
    }

    pub fn facility_table(&self) -> &str {
        &self.facility_table
    }

    /// Column holding `puskesmas` or `pustu`.
    pub fn facility_type_column(&self) -> &str {
        &self.facility_type_column
    }

    pub fn facility_district_column(&self) -> &str {
        &self.facility_district_column
    }

    pub fn with_region_table(mut self, value: &str) -> Result<Self, SchemaError> {
        self.region_table = checked("region_table", value)?;
        Ok(self)
    }

    pub fn with_region_name_column(mut self, value: &str) -> Result<Self, SchemaError> {
        self.region_name_column = checked("region_name_column", value)?;
        Ok(self)
    }

    pub fn with_severity_column(mut self, value: &str) -> Result<Self, SchemaError> {
        self.severity_column = checked("severity_column", value)?;
        Ok(self)
    }

    pub fn with_geometry_column(mut self, value: &str) -> Result<Self, SchemaError> {
        self.geometry_column = checked("geometry_column", value)?;
        Ok(self)
    }

    pub fn with_beneficiary_table(mut self, value: &str) -> Result<Self, SchemaError> {
        self.beneficiary_table = checked("beneficiary_table", value)?;
        Ok(self)
    }

    pub fn with_beneficiary_status_column(mut self, value: &str) -> Result<Self, SchemaError> {
        self.beneficiary_status_column = checked("beneficiary_status_column", value)?;
        Ok(self)
    }

    pub fn with_beneficiary_district_column(mut self, value: &str) -> Result<Self, SchemaError> {
        self.beneficiary_district_column = checked("beneficiary_district_column", value)?;
        Ok(self)
    }

    pub fn with_facility_table(mut self, value: &str) -> Result<Self, SchemaError> {
        self.facility_table = checked("facility_table", value)?;
        Ok(self)
    }

    pub fn with_facility_type_column(mut self, value: &str) -> Result<Self, SchemaError> {
        self.facility_type_column = checked("facility_type_column", value)?;
        Ok(self)
    }

    pub fn with_facility_district_column(mut self, value: &str) -> Result<Self, SchemaError> {
        self.facility_district_column = checked("facility_district_column", value)?;
        Ok(self)
    }
}

fn identifier_from_env(variable: &'static str, default: String) -> Result<String, SchemaError> {
    match env::var(variable) {
        Ok(value) => checked(variable, &value),
        Err(_) => Ok(default),
    }
}

fn checked(variable: &'static str, value: &str) -> Result<String, SchemaError> {
    let value = value.trim();
    let mut chars = value.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(value.to_string())
    } else {
        Err(SchemaError::InvalidIdentifier {
            variable,
            value: value.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{variable} must be a plain SQL identifier, got '{value}'")]
    InvalidIdentifier {
        variable: &'static str,
        value: String,
    },
}
