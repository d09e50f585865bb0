use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Offset pagination request, clamped by [`PageRequest::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Clamp to `page >= 1` and `1 <= page_size <= MAX_PAGE_SIZE`,
    /// substituting `default_size` when no size was given.
    pub fn normalized(page: Option<u32>, page_size: Option<u32>, default_size: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(default_size).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip: `(page - 1) * page_size`.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn meta(&self, total_count: i64) -> Pagination {
        let size = i64::from(self.page_size);
        Pagination {
            page: self.page,
            page_size: self.page_size,
            total_count,
            total_pages: (total_count + size - 1) / size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoctorSort {
    #[default]
    Experience,
    Fee,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Default)]
pub struct DoctorFilter {
    /// Substring of name or specialization.
    pub search: Option<String>,
    pub city: Option<String>,
    pub sort_by: DoctorSort,
    pub sort_order: SortOrder,
}

/// Whose appointments a listing may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    /// Appointments booked by this patient user.
    Patient(Uuid),
    /// Appointments with this doctor profile.
    Doctor(i64),
}
