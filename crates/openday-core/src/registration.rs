//! The prospective-student record submitted by open-day terminals
//!
//! Field names serialize exactly as the backend API expects them.
//! Client-side validation mirrors the server's rules so obviously-invalid
//! records are rejected before they can ever reach the offline queue.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 255;
const PHONE_MAX: usize = 20;
const HIGH_SCHOOL_MAX: usize = 255;
const YKS_SCORE_MAX: f64 = 600.0;

/// National university entrance exam track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum YksType {
    /// Quantitative track
    Sayisal,
    /// Verbal track
    Sozel,
    /// Equal-weight track
    Ea,
    /// Language track
    Dil,
}

/// A visitor registration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Visitor's first name
    pub first_name: String,
    /// Visitor's last name
    pub last_name: String,
    /// Contact email; optional, validated when non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// High school the visitor attends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_school: Option<String>,
    /// National exam ranking, 1-based
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<u32>,
    /// National exam score, 0 to 600
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yks_score: Option<f64>,
    /// Exam track the score belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yks_type: Option<YksType>,
    /// Department the visitor is interested in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    /// Whether the visitor requested a campus tour
    #[serde(default)]
    pub wants_tour: bool,
}

impl RegistrationRecord {
    /// Create a minimal record with just the required fields
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone: None,
            high_school: None,
            ranking: None,
            yks_score: None,
            yks_type: None,
            department_id: None,
            wants_tour: false,
        }
    }

    /// Validate against the same rules the backend enforces
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "first_name",
            });
        }
        if self.first_name.chars().count() > NAME_MAX {
            return Err(ValidationError::TooLong {
                field: "first_name",
                max: NAME_MAX,
            });
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::Required { field: "last_name" });
        }
        if self.last_name.chars().count() > NAME_MAX {
            return Err(ValidationError::TooLong {
                field: "last_name",
                max: NAME_MAX,
            });
        }

        if let Some(email) = &self.email
            && !email.is_empty()
        {
            if email.chars().count() > EMAIL_MAX {
                return Err(ValidationError::TooLong {
                    field: "email",
                    max: EMAIL_MAX,
                });
            }
            if !email.contains('@') {
                return Err(ValidationError::InvalidEmail);
            }
        }

        if let Some(phone) = &self.phone
            && phone.chars().count() > PHONE_MAX
        {
            return Err(ValidationError::TooLong {
                field: "phone",
                max: PHONE_MAX,
            });
        }

        if let Some(school) = &self.high_school
            && school.chars().count() > HIGH_SCHOOL_MAX
        {
            return Err(ValidationError::TooLong {
                field: "high_school",
                max: HIGH_SCHOOL_MAX,
            });
        }

        if self.ranking == Some(0) {
            return Err(ValidationError::OutOfRange {
                field: "ranking",
                min: 1,
                max: i64::MAX,
            });
        }

        if let Some(score) = self.yks_score
            && !(0.0..=YKS_SCORE_MAX).contains(&score)
        {
            return Err(ValidationError::OutOfRange {
                field: "yks_score",
                min: 0,
                max: YKS_SCORE_MAX as i64,
            });
        }

        Ok(())
    }
}
