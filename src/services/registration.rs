//! Trainee personal-information registration wizard.
//!
//! The browser keeps the whole draft and sends it on every step; validating
//! one step never touches another step's data.

use std::{borrow::Cow, fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::schemas::lenient_date;

const MINIMUM_AGE_YEARS: u32 = 16;
const EARLIEST_GRADUATION_YEAR: i32 = 1950;

const SEX_OPTIONS: &[&str] = &["male", "female"];
const CIVIL_STATUS_OPTIONS: &[&str] = &["single", "married", "widowed", "separated", "annulled"];
const ATTAINMENT_OPTIONS: &[&str] = &[
    "high_school",
    "senior_high_school",
    "vocational",
    "college_undergraduate",
    "college_graduate",
    "post_graduate",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    Personal,
    Contact,
    EmergencyContact,
    Education,
}

impl RegistrationStep {
    pub const ALL: [Self; 4] = [
        Self::Personal,
        Self::Contact,
        Self::EmergencyContact,
        Self::Education,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Contact => "contact",
            Self::EmergencyContact => "emergency_contact",
            Self::Education => "education",
        }
    }

    pub fn number(self) -> usize {
        Self::ALL
            .iter()
            .position(|step| *step == self)
            .map_or(1, |index| index + 1)
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.number()).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.number()
            .checked_sub(2)
            .and_then(|index| Self::ALL.get(index).copied())
    }
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStep {
    type Err = ();

    /// Accepts the step name (`emergency_contact`, `emergency-contact`) or its
    /// 1-based position.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        if let Ok(position) = normalized.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|index| Self::ALL.get(index).copied())
                .ok_or(());
        }
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == normalized)
            .ok_or(())
    }
}

// ---------- Step sections ----------

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct PersonalInfo {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(max = 100))]
    pub middle_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Last name is required."))]
    pub last_name: String,
    #[validate(length(max = 10))]
    pub suffix: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    #[validate(required(message = "Birth date is required."))]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "Birth place is required."))]
    pub birth_place: String,
    #[serde(default)]
    #[validate(custom(function = "validate_sex"))]
    pub sex: String,
    #[serde(default)]
    #[validate(custom(function = "validate_civil_status"))]
    pub civil_status: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 60, message = "Nationality is required."))]
    pub nationality: String,
}

impl PersonalInfo {
    fn check(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        if let Some(birth_date) = self.birth_date {
            if birth_date > today {
                errors.add(
                    "birth_date",
                    error_with_message("future_date", "Birth date cannot be in the future."),
                );
            } else if today.years_since(birth_date).unwrap_or(0) < MINIMUM_AGE_YEARS {
                errors.add(
                    "birth_date",
                    error_with_message(
                        "minimum_age",
                        "Trainee must be at least 16 years old.",
                    ),
                );
            }
        }
        into_result(errors)
    }
}

/// Address codes come from the external geographic-division lookup and are
/// stored as given.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ContactInfo {
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "validate_ph_mobile"))]
    pub mobile_number: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Region is required."))]
    pub region_code: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Province is required."))]
    pub province_code: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "City or municipality is required."))]
    pub city_code: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Barangay is required."))]
    pub barangay_code: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Street address is required."))]
    pub street: String,
    #[validate(length(max = 10))]
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct EmergencyContact {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Contact name is required."))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 60, message = "Relationship is required."))]
    pub relationship: String,
    #[serde(default)]
    #[validate(custom(function = "validate_ph_mobile"))]
    pub mobile_number: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct EducationInfo {
    #[serde(default)]
    #[validate(custom(function = "validate_attainment"))]
    pub highest_attainment: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "School name is required."))]
    pub school_name: String,
    #[validate(
        required(message = "Year graduated is required."),
        range(min = 1950, message = "Year graduated is too early.")
    )]
    pub year_graduated: Option<i32>,
    /// Seafarer registration number, when the trainee already has one.
    #[validate(length(max = 30))]
    pub srn: Option<String>,
}

impl EducationInfo {
    fn check(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        if let Some(year) = self.year_graduated {
            if year >= EARLIEST_GRADUATION_YEAR && year > today.year() {
                errors.add(
                    "year_graduated",
                    error_with_message("future_year", "Year graduated cannot be in the future."),
                );
            }
        }
        into_result(errors)
    }
}

// ---------- Draft and wizard ----------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistrationDraft {
    #[serde(default)]
    pub personal: Option<PersonalInfo>,
    #[serde(default)]
    pub contact: Option<ContactInfo>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub education: Option<EducationInfo>,
}

impl RegistrationDraft {
    pub fn validate_step(
        &self,
        step: RegistrationStep,
        today: NaiveDate,
    ) -> Result<(), ValidationErrors> {
        match step {
            RegistrationStep::Personal => match &self.personal {
                Some(section) => section.check(today),
                None => Err(missing_section(step)),
            },
            RegistrationStep::Contact => match &self.contact {
                Some(section) => section.validate(),
                None => Err(missing_section(step)),
            },
            RegistrationStep::EmergencyContact => match &self.emergency_contact {
                Some(section) => section.validate(),
                None => Err(missing_section(step)),
            },
            RegistrationStep::Education => match &self.education {
                Some(section) => section.check(today),
                None => Err(missing_section(step)),
            },
        }
    }

    /// First step that does not validate, in wizard order.
    pub fn first_invalid_step(
        &self,
        today: NaiveDate,
    ) -> Option<(RegistrationStep, ValidationErrors)> {
        RegistrationStep::ALL.into_iter().find_map(|step| {
            self.validate_step(step, today)
                .err()
                .map(|errors| (step, errors))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "step", rename_all = "snake_case")]
pub enum StepOutcome {
    Moved(RegistrationStep),
    Completed,
}

#[derive(Debug, Clone)]
pub struct RegistrationWizard {
    draft: RegistrationDraft,
    current: RegistrationStep,
}

impl RegistrationWizard {
    pub fn new(draft: RegistrationDraft) -> Self {
        Self::resume(draft, RegistrationStep::Personal)
    }

    pub fn resume(draft: RegistrationDraft, current: RegistrationStep) -> Self {
        Self { draft, current }
    }

    pub fn current(&self) -> RegistrationStep {
        self.current
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    pub fn into_draft(self) -> RegistrationDraft {
        self.draft
    }

    /// Validates the current step and moves forward. On failure the wizard
    /// stays put and the draft is untouched.
    pub fn advance(&mut self, today: NaiveDate) -> Result<StepOutcome, ValidationErrors> {
        self.draft.validate_step(self.current, today)?;
        match self.current.next() {
            Some(next) => {
                self.current = next;
                Ok(StepOutcome::Moved(next))
            }
            None => Ok(StepOutcome::Completed),
        }
    }

    pub fn back(&mut self) -> RegistrationStep {
        if let Some(previous) = self.current.previous() {
            self.current = previous;
        }
        self.current
    }

    pub fn can_submit(&self, today: NaiveDate) -> bool {
        self.draft.first_invalid_step(today).is_none()
    }
}

// ---------- Validators ----------

fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn missing_section(step: RegistrationStep) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        step.as_str(),
        error_with_message("required", "This step has not been filled in."),
    );
    errors
}

fn into_result(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn one_of(value: &str, options: &[&str], message: &'static str) -> Result<(), ValidationError> {
    let normalized = value.trim().to_ascii_lowercase();
    if options.contains(&normalized.as_str()) {
        Ok(())
    } else {
        Err(error_with_message("one_of", message))
    }
}

fn validate_sex(value: &str) -> Result<(), ValidationError> {
    one_of(value, SEX_OPTIONS, "Select male or female.")
}

fn validate_civil_status(value: &str) -> Result<(), ValidationError> {
    one_of(value, CIVIL_STATUS_OPTIONS, "Select a civil status.")
}

fn validate_attainment(value: &str) -> Result<(), ValidationError> {
    one_of(value, ATTAINMENT_OPTIONS, "Select the highest educational attainment.")
}

/// `09XXXXXXXXX` or `+639XXXXXXXXX`; spaces and dashes are ignored.
pub fn normalize_ph_mobile(raw: &str) -> Option<String> {
    let compact = raw
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '-'))
        .collect::<String>();
    let local = if let Some(rest) = compact.strip_prefix("+63") {
        format!("0{rest}")
    } else {
        compact
    };
    let valid = local.len() == 11
        && local.starts_with("09")
        && local.chars().all(|ch| ch.is_ascii_digit());
    valid.then_some(local)
}

fn validate_ph_mobile(value: &str) -> Result<(), ValidationError> {
    normalize_ph_mobile(value)
        .map(|_| ())
        .ok_or_else(|| error_with_message("mobile", "Enter a mobile number like 09171234567."))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        normalize_ph_mobile, ContactInfo, EducationInfo, EmergencyContact, PersonalInfo,
        RegistrationDraft, RegistrationStep, RegistrationWizard, StepOutcome,
    };
    use crate::error::field_error_map;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn personal() -> PersonalInfo {
        PersonalInfo {
            first_name: "Maria".to_string(),
            middle_name: Some("Reyes".to_string()),
            last_name: "Santos".to_string(),
            suffix: None,
            birth_date: NaiveDate::from_ymd_opt(2000, 3, 14),
            birth_place: "Iloilo City".to_string(),
            sex: "Female".to_string(),
            civil_status: "single".to_string(),
            nationality: "Filipino".to_string(),
        }
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            email: "maria.santos@example.com".to_string(),
            mobile_number: "0917 123 4567".to_string(),
            region_code: "060000000".to_string(),
            province_code: "063000000".to_string(),
            city_code: "063022000".to_string(),
            barangay_code: "063022001".to_string(),
            street: "12 Rizal St.".to_string(),
            zip_code: Some("5000".to_string()),
        }
    }

    fn emergency_contact() -> EmergencyContact {
        EmergencyContact {
            full_name: "Ana Santos".to_string(),
            relationship: "Mother".to_string(),
            mobile_number: "+639181234567".to_string(),
        }
    }

    fn education() -> EducationInfo {
        EducationInfo {
            highest_attainment: "college_graduate".to_string(),
            school_name: "Western Visayas Maritime College".to_string(),
            year_graduated: Some(2021),
            srn: None,
        }
    }

    fn complete_draft() -> RegistrationDraft {
        RegistrationDraft {
            personal: Some(personal()),
            contact: Some(contact()),
            emergency_contact: Some(emergency_contact()),
            education: Some(education()),
        }
    }

    #[test]
    fn parses_step_names_and_positions() {
        assert_eq!(
            "personal".parse::<RegistrationStep>(),
            Ok(RegistrationStep::Personal)
        );
        assert_eq!(
            "Emergency-Contact".parse::<RegistrationStep>(),
            Ok(RegistrationStep::EmergencyContact)
        );
        assert_eq!("4".parse::<RegistrationStep>(), Ok(RegistrationStep::Education));
        assert!("0".parse::<RegistrationStep>().is_err());
        assert!("payment".parse::<RegistrationStep>().is_err());
    }

    #[test]
    fn steps_walk_in_order() {
        assert_eq!(RegistrationStep::Personal.next(), Some(RegistrationStep::Contact));
        assert_eq!(RegistrationStep::Education.next(), None);
        assert_eq!(RegistrationStep::Personal.previous(), None);
        assert_eq!(
            RegistrationStep::Education.previous(),
            Some(RegistrationStep::EmergencyContact)
        );
        assert_eq!(RegistrationStep::EmergencyContact.number(), 3);
    }

    #[test]
    fn complete_draft_walks_to_completion() {
        let mut wizard = RegistrationWizard::new(complete_draft());
        assert_eq!(
            wizard.advance(today()).ok(),
            Some(StepOutcome::Moved(RegistrationStep::Contact))
        );
        assert_eq!(
            wizard.advance(today()).ok(),
            Some(StepOutcome::Moved(RegistrationStep::EmergencyContact))
        );
        assert_eq!(
            wizard.advance(today()).ok(),
            Some(StepOutcome::Moved(RegistrationStep::Education))
        );
        assert_eq!(wizard.advance(today()).ok(), Some(StepOutcome::Completed));
        assert!(wizard.can_submit(today()));
    }

    #[test]
    fn invalid_step_keeps_position_and_other_data() {
        let mut draft = complete_draft();
        if let Some(contact) = draft.contact.as_mut() {
            contact.email = "not-an-email".to_string();
            contact.mobile_number = "12345".to_string();
        }
        let mut wizard = RegistrationWizard::resume(draft, RegistrationStep::Contact);

        let errors = wizard.advance(today()).expect_err("contact is invalid");
        let fields = field_error_map(&errors);
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("mobile_number"));

        assert_eq!(wizard.current(), RegistrationStep::Contact);
        assert_eq!(
            wizard.draft().personal.as_ref().map(|p| p.first_name.as_str()),
            Some("Maria")
        );
        assert!(wizard.draft().education.is_some());
        assert!(!wizard.can_submit(today()));
    }

    #[test]
    fn back_never_validates_or_clears() {
        let draft = RegistrationDraft {
            personal: Some(personal()),
            ..RegistrationDraft::default()
        };
        let mut wizard = RegistrationWizard::resume(draft, RegistrationStep::Contact);
        assert_eq!(wizard.back(), RegistrationStep::Personal);
        assert_eq!(wizard.back(), RegistrationStep::Personal);
        assert!(wizard.draft().personal.is_some());
    }

    #[test]
    fn missing_section_reports_the_step() {
        let draft = RegistrationDraft::default();
        let errors = draft
            .validate_step(RegistrationStep::EmergencyContact, today())
            .expect_err("missing");
        assert!(field_error_map(&errors).contains_key("emergency_contact"));

        let (step, _) = draft.first_invalid_step(today()).expect("nothing filled");
        assert_eq!(step, RegistrationStep::Personal);
    }

    #[test]
    fn birth_date_rules() {
        let mut future = personal();
        future.birth_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        let errors = future.check(today()).expect_err("future birth date");
        assert_eq!(
            field_error_map(&errors)["birth_date"][0],
            "Birth date cannot be in the future."
        );

        let mut young = personal();
        young.birth_date = NaiveDate::from_ymd_opt(2012, 1, 1);
        assert!(young.check(today()).is_err());

        let mut absent = personal();
        absent.birth_date = None;
        assert!(absent.check(today()).is_err());
    }

    #[test]
    fn rejects_unknown_choices() {
        let mut info = personal();
        info.civil_status = "complicated".to_string();
        let errors = info.check(today()).expect_err("bad civil status");
        assert!(field_error_map(&errors).contains_key("civil_status"));
    }

    #[test]
    fn graduation_year_bounds() {
        let mut info = education();
        info.year_graduated = Some(2026);
        assert!(info.check(today()).is_err());
        info.year_graduated = Some(1949);
        assert!(info.check(today()).is_err());
        info.year_graduated = None;
        assert!(info.check(today()).is_err());
        info.year_graduated = Some(2025);
        assert!(info.check(today()).is_ok());
    }

    #[test]
    fn normalizes_mobile_numbers() {
        assert_eq!(
            normalize_ph_mobile("+63 917-123-4567").as_deref(),
            Some("09171234567")
        );
        assert_eq!(normalize_ph_mobile("09171234567").as_deref(), Some("09171234567"));
        assert_eq!(normalize_ph_mobile("0817123456"), None);
        assert_eq!(normalize_ph_mobile("0917123456a"), None);
    }

    #[test]
    fn partial_json_draft_deserializes() {
        let draft: RegistrationDraft = serde_json::from_value(serde_json::json!({
            "personal": { "first_name": "Maria", "birth_date": "not a date" }
        }))
        .expect("lenient draft");
        let personal = draft.personal.expect("personal section");
        assert_eq!(personal.birth_date, None);
        assert!(personal.last_name.is_empty());
        assert!(draft.contact.is_none());
    }

    #[test]
    fn birth_date_decodes_through_shared_date_parser() {
        let draft: RegistrationDraft = serde_json::from_value(serde_json::json!({
            "personal": { "birth_date": "2000-03-14T00:00:00+08:00" }
        }))
        .expect("draft");
        let personal = draft.personal.expect("personal section");
        assert_eq!(personal.birth_date, NaiveDate::from_ymd_opt(2000, 3, 14));
    }
}
