//! Request and response bodies.
//!
//! Request bodies derive [`Validate`] and are taken through [`ValidJson`],
//! which answers 422 with the list of failed fields before the handler runs.

use std::borrow::Cow;

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::entity::{location_seat, picture, review, user};
use crate::error::{ApiError, FieldError};

/// Rust field names that travel under a different JSON key.
const WIRE_NAMES: &[(&str, &str)] = &[("type_id", "type"), ("status_id", "status")];

fn wire_name(field: &str) -> &str {
    WIRE_NAMES
        .iter()
        .find(|(rust, _)| *rust == field)
        .map_or(field, |(_, wire)| *wire)
}

/// Flattens a validation report into `{field, message}` pairs, nested
/// structs as dotted paths, sorted by field.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(errors, "", &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = format!("{prefix}{}", wire_name(field));
        match kind {
            ValidationErrorsKind::Field(failures) => {
                out.extend(failures.iter().map(|failure| FieldError {
                    field: path.clone(),
                    message: failure
                        .message
                        .as_ref()
                        .map_or_else(|| failure.code.to_string(), |m| m.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &format!("{path}."), out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{path}[{index}]."), out);
                }
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(field_errors(&errors))
    }
}

/// Latitude in `-90..=90`.
pub fn latitude(value: &Decimal) -> Result<(), ValidationError> {
    if (Decimal::from(-90)..=Decimal::from(90)).contains(value) {
        Ok(())
    } else {
        Err(ValidationError::new("latitude")
            .with_message(Cow::Borrowed("latitude must be between -90 and 90")))
    }
}

/// Longitude in `-180..=180`.
pub fn longitude(value: &Decimal) -> Result<(), ValidationError> {
    if (Decimal::from(-180)..=Decimal::from(180)).contains(value) {
        Ok(())
    } else {
        Err(ValidationError::new("longitude")
            .with_message(Cow::Borrowed("longitude must be between -180 and 180")))
    }
}

/// JSON body that passed [`Validate`].
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

// ---- users ----

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserCreate {
    #[serde(alias = "Username")]
    #[validate(length(min = 1, max = 255, message = "length must be between 1 and 255"))]
    pub username: String,
    #[validate(
        length(min = 3, max = 255, message = "length must be between 3 and 255"),
        contains(pattern = "@", message = "must be an email address")
    )]
    pub email: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    #[validate(
        length(min = 6, message = "must be at least 6 characters"),
        must_match(other = "password", message = "passwords do not match")
    )]
    pub password_confirm: String,
}

/// Form body of `POST /login`. `username` may also be an email address.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role_id: Option<i32>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role_id: model.role_id,
        }
    }
}

// ---- reviews ----

/// Review fields shared by [`ReviewCreate`] and the nested first review of a
/// new location.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewFields {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rate: i64,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub pollution_id: i32,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub condition_id: i32,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub material_id: i32,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub seating_positions: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewCreate {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rate: i64,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub pollution_id: i32,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub condition_id: i32,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub material_id: i32,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub seating_positions: i64,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub location_id: i32,
}

impl ReviewCreate {
    /// The review columns and the target location.
    pub fn split(self) -> (ReviewFields, i32) {
        let fields = ReviewFields {
            rate: self.rate,
            pollution_id: self.pollution_id,
            condition_id: self.condition_id,
            material_id: self.material_id,
            seating_positions: self.seating_positions,
        };
        (fields, self.location_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReviewUpdate {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rate: Option<i64>,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub pollution_id: Option<i32>,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub condition_id: Option<i32>,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub material_id: Option<i32>,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub seating_positions: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: i32,
    pub rate: i64,
    pub pollution_id: i32,
    pub condition_id: i32,
    pub material_id: i32,
    pub seating_positions: i64,
    pub location_id: Option<i32>,
    pub author_id: i32,
    pub created_at: DateTime<Utc>,
}

impl ReviewResponse {
    pub fn new(model: review::Model, location_id: Option<i32>) -> Self {
        Self {
            id: model.id,
            rate: model.rate,
            pollution_id: model.pollution_id,
            condition_id: model.condition_id,
            material_id: model.material_id,
            seating_positions: model.seating_positions,
            location_id,
            author_id: model.author_id,
            created_at: model.created_at,
        }
    }
}

// ---- pictures ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureResponse {
    pub id: i32,
    pub url: String,
    pub user_id: i32,
}

impl From<picture::Model> for PictureResponse {
    fn from(model: picture::Model) -> Self {
        Self {
            id: model.id,
            url: model.url,
            user_id: model.user_id,
        }
    }
}

// ---- locations ----

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationSeatCreate {
    #[validate(length(min = 1, max = 255, message = "length must be between 1 and 255"))]
    pub name: String,
    #[validate(length(min = 1, max = 1000, message = "length must be between 1 and 1000"))]
    pub description: String,
    #[validate(length(min = 1, max = 500, message = "length must be between 1 and 500"))]
    pub address: String,
    #[serde(rename = "type")]
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub type_id: i32,
    #[serde(rename = "status")]
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub status_id: i32,
    #[validate(custom(function = "latitude"))]
    pub cord_x: Decimal,
    #[validate(custom(function = "longitude"))]
    pub cord_y: Decimal,
    #[validate(nested)]
    pub first_review: Option<ReviewFields>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LocationSeatUpdate {
    #[validate(length(min = 1, max = 255, message = "length must be between 1 and 255"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 1000, message = "length must be between 1 and 1000"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 500, message = "length must be between 1 and 500"))]
    pub address: Option<String>,
    #[serde(rename = "type")]
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub type_id: Option<i32>,
    #[serde(rename = "status")]
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub status_id: Option<i32>,
    #[validate(custom(function = "latitude"))]
    pub cord_x: Option<Decimal>,
    #[validate(custom(function = "longitude"))]
    pub cord_y: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSeatResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub address: String,
    #[serde(rename = "type")]
    pub type_id: i32,
    #[serde(rename = "status")]
    pub status_id: i32,
    pub cord_x: Decimal,
    pub cord_y: Decimal,
    pub author_id: i32,
    pub reviews: Vec<ReviewResponse>,
    pub pictures: Vec<PictureResponse>,
}

impl LocationSeatResponse {
    pub fn new(
        model: location_seat::Model,
        reviews: Vec<ReviewResponse>,
        pictures: Vec<PictureResponse>,
    ) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            address: model.address,
            type_id: model.type_id,
            status_id: model.status_id,
            cord_x: model.cord_x,
            cord_y: model.cord_y,
            author_id: model.author_id,
            reviews,
            pictures,
        }
    }
}

// ---- dictionaries ----

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DictionaryCreate {
    #[validate(length(min = 1, max = 255, message = "length must be between 1 and 255"))]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryItem {
    pub id: i32,
    pub name: String,
}
