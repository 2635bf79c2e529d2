use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{blank_or_email, blank_or_url, not_blank, Pagination, Timestamp};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Doctor {
    pub id: String,
    pub slug: String,
    pub full_name: String,
    pub specialty: String,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub license_number: Option<String>,
    pub years_experience: Option<i64>,
    pub published: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewDoctor {
    #[validate(length(min = 2, max = 120), custom = "not_blank")]
    pub full_name: String,
    #[validate(length(min = 2, max = 120), custom = "not_blank")]
    pub specialty: String,
    pub city: Option<String>,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    pub phone: Option<String>,
    #[validate(custom = "blank_or_email")]
    pub email: Option<String>,
    #[validate(custom = "blank_or_url")]
    pub photo_url: Option<String>,
    pub license_number: Option<String>,
    #[validate(range(min = 0, max = 80))]
    pub years_experience: Option<i64>,
    #[serde(default)]
    pub published: bool,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct DoctorUpdate {
    #[validate(length(min = 2, max = 120), custom = "not_blank")]
    pub full_name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[validate(length(min = 2, max = 120), custom = "not_blank")]
    pub specialty: Option<String>,
    pub city: Option<String>,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    pub phone: Option<String>,
    #[validate(custom = "blank_or_email")]
    pub email: Option<String>,
    #[validate(custom = "blank_or_url")]
    pub photo_url: Option<String>,
    pub license_number: Option<String>,
    #[validate(range(min = 0, max = 80))]
    pub years_experience: Option<i64>,
    pub published: Option<bool>,
}

impl DoctorUpdate {
    pub fn apply(self, doctor: &mut Doctor) {
        if let Some(v) = self.full_name {
            doctor.full_name = v.trim().to_string();
        }
        if let Some(v) = self.specialty {
            doctor.specialty = v.trim().to_string();
        }
        if self.city.is_some() {
            doctor.city = super::non_blank(self.city);
        }
        if self.bio.is_some() {
            doctor.bio = super::non_blank(self.bio);
        }
        if self.phone.is_some() {
            doctor.phone = super::non_blank(self.phone);
        }
        if self.email.is_some() {
            doctor.email = super::non_blank(self.email);
        }
        if self.photo_url.is_some() {
            doctor.photo_url = super::non_blank(self.photo_url);
        }
        if self.license_number.is_some() {
            doctor.license_number = super::non_blank(self.license_number);
        }
        if let Some(v) = self.years_experience {
            doctor.years_experience = Some(v);
        }
        if let Some(v) = self.published {
            doctor.published = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DoctorFilter {
    pub specialty: Option<String>,
    pub city: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl DoctorFilter {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
