/// Maintenance requests
///
/// Tenants submit requests; administrators list, approve, reject and move
/// them through their statuses. Listings are served through a cache that any
/// write clears entirely.

mod cache;
mod repository;
mod service;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub use cache::{Listing, ListingCache};
pub use repository::{InMemoryMaintenanceRepository, MaintenanceRepository, PgMaintenanceRepository};
pub use service::MaintenanceService;

/// Longest accepted description, matching the column width
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Open,
    InProgress,
    Resolved,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Open, Status::InProgress, Status::Resolved, Status::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "OPEN",
            Status::InProgress => "IN_PROGRESS",
            Status::Resolved => "RESOLVED",
            Status::Rejected => "REJECTED",
        }
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidFormat(format!("status {:?}", s)))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    Plumbing,
    Electrical,
    Hvac,
    Carpentry,
    HouseholdFix,
    Painting,
    Cleaning,
    PestControl,
    ApplianceRepair,
    GeneralMaintenance,
}

impl Department {
    pub const ALL: [Department; 10] = [
        Department::Plumbing,
        Department::Electrical,
        Department::Hvac,
        Department::Carpentry,
        Department::HouseholdFix,
        Department::Painting,
        Department::Cleaning,
        Department::PestControl,
        Department::ApplianceRepair,
        Department::GeneralMaintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Plumbing => "PLUMBING",
            Department::Electrical => "ELECTRICAL",
            Department::Hvac => "HVAC",
            Department::Carpentry => "CARPENTRY",
            Department::HouseholdFix => "HOUSEHOLD_FIX",
            Department::Painting => "PAINTING",
            Department::Cleaning => "CLEANING",
            Department::PestControl => "PEST_CONTROL",
            Department::ApplianceRepair => "APPLIANCE_REPAIR",
            Department::GeneralMaintenance => "GENERAL_MAINTENANCE",
        }
    }
}

impl FromStr for Department {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Department::ALL
            .into_iter()
            .find(|department| department.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidFormat(format!("department {:?}", s)))
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRequest {
    pub id: Uuid,
    pub tenant_name: String,
    pub unit_number: String,
    pub description: String,
    pub status: Status,
    pub department: Department,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submission payload from a tenant
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenanceRequest {
    pub unit_number: String,
    pub description: String,
    pub department: Department,
}

/// Listing filter; also names the cache entry holding its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestFilter {
    All,
    Status(Status),
    Department(Department),
    StatusAndDepartment(Status, Department),
}

/// `ALL` in a query string means "no filter on this field"
const ANY: &str = "ALL";

impl RequestFilter {
    /// Build a filter from optional query values. Absent, empty and `ALL`
    /// values leave the field unfiltered.
    pub fn from_query(status: Option<&str>, department: Option<&str>) -> Result<Self, ValidationError> {
        let status = status
            .filter(|s| !s.is_empty() && *s != ANY)
            .map(str::parse::<Status>)
            .transpose()?;
        let department = department
            .filter(|d| !d.is_empty() && *d != ANY)
            .map(str::parse::<Department>)
            .transpose()?;

        Ok(match (status, department) {
            (Some(s), Some(d)) => RequestFilter::StatusAndDepartment(s, d),
            (Some(s), None) => RequestFilter::Status(s),
            (None, Some(d)) => RequestFilter::Department(d),
            (None, None) => RequestFilter::All,
        })
    }

    pub fn cache_key(&self) -> String {
        match self {
            RequestFilter::All => "all".to_string(),
            RequestFilter::Status(s) => s.as_str().to_string(),
            RequestFilter::Department(d) => d.as_str().to_string(),
            RequestFilter::StatusAndDepartment(s, d) => format!("{}_{}", s.as_str(), d.as_str()),
        }
    }

    pub fn matches(&self, request: &MaintenanceRequest) -> bool {
        match self {
            RequestFilter::All => true,
            RequestFilter::Status(s) => request.status == *s,
            RequestFilter::Department(d) => request.department == *d,
            RequestFilter::StatusAndDepartment(s, d) => {
                request.status == *s && request.department == *d
            }
        }
    }
}
