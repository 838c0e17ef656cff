//! Error and response types for the REST API
use crate::db::DatabaseError;
use actix_web::body::Body;
use actix_web::error::JsonPayloadError;
use actix_web::http::{header, HeaderValue, StatusCode};
use actix_web::{HttpRequest, HttpResponse, Responder, ResponseError};
use actix_web_httpauth::headers::www_authenticate::bearer::{Bearer, Error};
use actix_web_httpauth::headers::www_authenticate::Challenge;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use validator::ValidationErrors;

/// Error handler for the actix JSON extractor
///
/// Gets called when an incoming request results in a [`JsonPayloadError`].
/// Returns a `Bad Request` [`ApiError`] with an appropriate error code and message.
pub fn json_error_handler(err: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    let error_code = match err {
        JsonPayloadError::ContentType => "invalid_content_type",
        JsonPayloadError::Deserialize(_) => "invalid_json",
        _ => "invalid_payload",
    };

    ApiError::bad_request()
        .with_code(error_code)
        .with_message(err.to_string())
        .into()
}

#[derive(Debug, Serialize)]
struct StandardErrorBody {
    // Machine readable error code
    code: Cow<'static, str>,
    // Human readable message
    message: Cow<'static, str>,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorEntry {
    /// The field related to the error
    /// It's a struct level error when no field is set
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<Cow<'static, str>>,
    /// Machine readable error code
    code: Cow<'static, str>,
    /// Human readable error message
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<Cow<'static, str>>,
}

impl ValidationErrorEntry {
    pub fn new<F, C, M>(field: F, code: C, message: Option<M>) -> Self
    where
        F: Into<Cow<'static, str>>,
        C: Into<Cow<'static, str>>,
        M: Into<Cow<'static, str>>,
    {
        Self {
            field: Some(field.into()),
            code: code.into(),
            message: message.map(|m| m.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ValidationErrorBody {
    /// Machine readable error code
    code: Cow<'static, str>,
    // Human readable message
    message: Cow<'static, str>,
    // A list of validation errors
    errors: Vec<ValidationErrorEntry>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ErrorBody {
    /// The standard error body
    Standard(StandardErrorBody),
    /// Special error body for validation errors
    Validation(ValidationErrorBody),
}

/// Error variants for the WWW Authenticate header
#[derive(Debug)]
pub enum AuthenticationError {
    InvalidIdToken,
    InvalidAccessToken,
    SessionExpired,
}

impl AuthenticationError {
    fn error(&self) -> Error {
        match self {
            Self::InvalidIdToken | Self::InvalidAccessToken => Error::InvalidToken,
            Self::SessionExpired => Error::InvalidRequest,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::InvalidIdToken => "The provided login token is invalid",
            Self::InvalidAccessToken => "The provided access token is invalid",
            Self::SessionExpired => "The user session expired",
        }
    }
}

/// The default REST API error
///
/// Can be built via the associated functions to represent various HTTP errors. Each
/// HTTP error has their default error code and message that get sent in a JSON body.
/// The error code and message can be overwritten when creating an error.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    www_authenticate: Option<HeaderValue>,
    body: ErrorBody,
}

impl ApiError {
    fn new_standard<T>(status: StatusCode, code: T, message: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        Self {
            status,
            www_authenticate: None,
            body: ErrorBody::Standard(StandardErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// Override the default code for an error
    pub fn with_code<T>(mut self, code: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        match &mut self.body {
            ErrorBody::Standard(std) => std.code = code.into(),
            ErrorBody::Validation(val) => val.code = code.into(),
        }

        self
    }

    /// Override the default message for an error
    pub fn with_message<T>(mut self, message: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        match &mut self.body {
            ErrorBody::Standard(std) => std.message = message.into(),
            ErrorBody::Validation(val) => val.message = message.into(),
        }

        self
    }

    /// Add a WWW Authenticate header to a response
    pub fn with_www_authenticate(mut self, authentication_error: AuthenticationError) -> Self {
        let bearer = Bearer::build()
            .error(authentication_error.error())
            .error_description(authentication_error.message())
            .finish();

        let header_value = match HeaderValue::from_maybe_shared(bearer.to_bytes()) {
            Ok(header_value) => header_value,
            Err(e) => {
                log::error!(
                    "Error generating HeaderValue for WWW-Authenticate bearer '{:?}', {}",
                    bearer,
                    e
                );
                HeaderValue::from_static(r#"Bearer error="invalid_request""#)
            }
        };

        self.www_authenticate = Some(header_value);

        self
    }

    /// Create a new 400 Bad Request error
    pub fn bad_request() -> Self {
        Self::new_standard(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "Invalid request due to malformed syntax",
        )
    }

    /// Create a new 401 Unauthorized error
    pub fn unauthorized() -> Self {
        Self::new_standard(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Authentication failed",
        )
    }

    /// Create a new 403 Forbidden error
    pub fn forbidden() -> Self {
        Self::new_standard(
            StatusCode::FORBIDDEN,
            "forbidden",
            "Access to the requested resource is forbidden",
        )
    }

    /// Create a new 404 Not Found error
    pub fn not_found() -> Self {
        Self::new_standard(
            StatusCode::NOT_FOUND,
            "not_found",
            "A requested resource could not be found",
        )
    }

    /// Create a new 409 Conflict error
    pub fn conflict() -> Self {
        Self::new_standard(
            StatusCode::CONFLICT,
            "conflict",
            "The request conflicts with the state of the resource",
        )
    }

    /// Create a new 422 Unprocessable Entity error
    ///
    /// This error is normally created from [`ValidationErrors`] from the validator crate.
    /// The JSON body for this error additionally contains a list of errors for each invalid field.
    pub fn unprocessable_entities<I>(errors: I) -> Self
    where
        I: IntoIterator<Item = ValidationErrorEntry>,
    {
        let validation_body = ValidationErrorBody {
            code: Cow::Borrowed("validation_failed"),
            message: Cow::Borrowed("Some provided values are invalid"),
            errors: errors.into_iter().collect(),
        };

        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            www_authenticate: None,
            body: ErrorBody::Validation(validation_body),
        }
    }

    /// Create a new 500 Internal Server Error
    pub fn internal() -> Self {
        Self::new_standard(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_server_error",
            "An internal server error occurred",
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            ErrorBody::Standard(StandardErrorBody { code, message }) => {
                write!(
                    f,
                    "status={}, code={}, message={}",
                    self.status, code, message
                )
            }
            ErrorBody::Validation(ValidationErrorBody {
                code,
                message,
                errors,
            }) => {
                write!(
                    f,
                    "status={}, code={}, message={}, errors={}",
                    self.status,
                    code,
                    message,
                    serde_json::to_string(errors)
                        .unwrap_or_else(|_| "unserializable errors".to_string())
                )
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse<Body> {
        let mut response = HttpResponse::new(self.status_code());

        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/json; charset=utf-8"),
        );

        if let Some(www_authenticate) = self.www_authenticate.clone() {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, www_authenticate);
        }

        let body = match serde_json::to_string(&self.body) {
            Ok(body) => body,
            Err(e) => {
                log::error!("Unable to serialize API error body, {}", e);
                return HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        response.set_body(Body::from(body))
    }
}

impl From<DatabaseError> for ApiError {
    fn from(db_error: DatabaseError) -> Self {
        match db_error {
            DatabaseError::NotFound => Self::not_found(),
            e => {
                log::error!("REST API threw internal error from database error: {}", e);
                Self::internal()
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    /// Creates a 422 Unprocessable Entity response from the [`ValidationErrors`]
    ///
    /// Each validation error is mapped to its field; struct level errors carry
    /// no field name.
    fn from(validation_errors: ValidationErrors) -> Self {
        Self::unprocessable_entities(validation_error_entries(validation_errors))
    }
}

/// Convert [`ValidationErrors`] into one [`ValidationErrorEntry`] per violated rule
pub fn validation_error_entries(validation_errors: ValidationErrors) -> Vec<ValidationErrorEntry> {
    let mut entries = Vec::with_capacity(validation_errors.errors().len());

    collect_validation_errors(validation_errors, &mut entries);

    entries
}

fn collect_validation_errors(
    validation_errors: ValidationErrors,
    entries: &mut Vec<ValidationErrorEntry>,
) {
    let errors = validation_errors.into_errors();

    for (field, error_kind) in errors {
        let field = match field {
            "__all__" => None,
            field => Some(field.into()),
        };

        match error_kind {
            validator::ValidationErrorsKind::Field(v) => {
                for error in v {
                    entries.push(ValidationErrorEntry {
                        field: field.clone(),
                        code: convert_validation_code(error.code),
                        message: error.message,
                    });
                }
            }
            validator::ValidationErrorsKind::Struct(inner_errors) => {
                // Assume all fields were flattened when we encounter a struct level validation error
                collect_validation_errors(*inner_errors, entries);
            }
            validator::ValidationErrorsKind::List(list) => {
                let invalid_indexes = list
                    .keys()
                    .take(15)
                    .map(|idx| idx.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");

                entries.push(ValidationErrorEntry {
                    field,
                    code: Cow::Borrowed("invalid_values"),
                    message: Some(Cow::Owned(format!(
                        "Invalid values at index {}",
                        invalid_indexes
                    ))),
                })
            }
        };
    }
}

fn convert_validation_code(code: Cow<'static, str>) -> Cow<'static, str> {
    match code.as_ref() {
        "length" => Cow::Borrowed("invalid_length"),
        "range" => Cow::Borrowed("out_of_range"),
        "required" => Cow::Borrowed("value_required"),
        // custom validators already carry a descriptive code
        _ => code,
    }
}

// Represents a 204 No Content HTTP Response
pub struct NoContent;

impl Responder for NoContent {
    fn respond_to(self, _: &HttpRequest) -> HttpResponse {
        HttpResponse::NoContent().finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct ValidationTester {
        #[validate(length(max = 5))]
        length: String,
        #[validate(range(min = 5, max = 10))]
        range: i64,
        #[validate(required)]
        required: Option<bool>,
    }

    #[test]
    fn api_validation_error() {
        let tester = ValidationTester {
            length: "looong".into(),
            range: 11,
            required: None,
        };

        let mut api_error = match tester.validate() {
            Ok(_) => panic!("Validation should fail"),
            Err(err) => ApiError::from(err),
        };

        assert_eq!(api_error.status, StatusCode::UNPROCESSABLE_ENTITY);

        match &mut api_error.body {
            ErrorBody::Standard(_) => panic!("Expected validation error body"),
            ErrorBody::Validation(val) => val.errors.sort_by(|a, b| a.field.cmp(&b.field)),
        }

        let body = serde_json::to_value(&api_error.body).unwrap();

        assert_eq!(
            body,
            json!({
                "code": "validation_failed",
                "message": "Some provided values are invalid",
                "errors": [
                    {
                        "field": "length",
                        "code": "invalid_length"
                    },
                    {
                        "field": "range",
                        "code": "out_of_range"
                    },
                    {
                        "field": "required",
                        "code": "value_required"
                    }
                ]
            })
        );
    }

    #[test]
    fn api_error_with_code_and_message() {
        let error = ApiError::not_found()
            .with_code("custom_code")
            .with_message("A custom message");

        let body = serde_json::to_value(&error.body).unwrap();

        assert_eq!(
            body,
            json!({
                "code": "custom_code",
                "message": "A custom message"
            })
        );
    }
}
