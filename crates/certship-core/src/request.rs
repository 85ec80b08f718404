//! Certificate request DTO and its validation

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::IssueError;

/// Propagation wait applied when the request omits `propagation_seconds`.
pub const DEFAULT_PROPAGATION_SECONDS: u64 = 60;

const MISSING_FIELD: &str = "Missing data for required field.";

/// Wire form of a certificate request. Every field is optional so that a
/// missing field turns into a per-field validation message instead of a
/// deserialization failure for the whole body.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RawIssueRequest {
    /// DNS provider id, e.g. `route53`
    #[schema(example = "route53")]
    pub provider: Option<String>,
    /// Secret holding the provider credentials
    #[schema(example = "dns-credentials")]
    pub secret_id: Option<String>,
    /// Project namespace the secret lives under
    #[schema(example = "acme-prod")]
    pub project: Option<String>,
    /// Domains to issue for; order is preserved on the certbot command line
    #[schema(example = json!(["*.example.com", "www.example.com"]))]
    pub domains: Option<Vec<String>>,
    /// Contact email registered with the ACME account
    #[schema(example = "ops@example.com")]
    pub email: Option<String>,
    /// Bucket receiving the issued bundle
    #[schema(example = "example-certs")]
    pub target_bucket: Option<String>,
    /// Key prefix inside the bucket
    #[schema(example = "certificates/example.com")]
    pub target_bucket_path: Option<String>,
    /// DNS propagation wait in seconds, defaults to 60
    #[schema(example = 600)]
    pub propagation_seconds: Option<i64>,
}

/// A fully validated certificate request.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub provider: String,
    pub secret_id: String,
    pub project: String,
    pub domains: Vec<String>,
    pub email: String,
    pub target_bucket: String,
    pub target_bucket_path: String,
    pub propagation_seconds: u64,
}

impl RawIssueRequest {
    /// Parses a JSON body leniently and validates it. Each field is
    /// extracted on its own, so a wrongly typed value is reported under its
    /// field name; only a body that is not a JSON object at all is rejected
    /// wholesale.
    pub fn parse(
        body: &serde_json::Value,
        known_providers: &[&str],
    ) -> Result<IssueRequest, IssueError> {
        let Some(object) = body.as_object() else {
            return Err(Self::invalid_body());
        };
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let raw = RawIssueRequest {
            provider: take_string(object, "provider", &mut errors),
            secret_id: take_string(object, "secret_id", &mut errors),
            project: take_string(object, "project", &mut errors),
            domains: take_string_list(object, "domains", &mut errors),
            email: take_string(object, "email", &mut errors),
            target_bucket: take_string(object, "target_bucket", &mut errors),
            target_bucket_path: take_string(object, "target_bucket_path", &mut errors),
            propagation_seconds: take_integer(object, "propagation_seconds", &mut errors),
        };
        raw.validate_with(errors, known_providers)
    }

    /// The rejection for a body that cannot be treated as a request object
    /// at all. Keyed under `_request` to keep the field-keyed shape.
    pub fn invalid_body() -> IssueError {
        let mut errors = BTreeMap::new();
        errors.insert(
            "_request".to_string(),
            vec!["Request json is absent or invalid!".to_string()],
        );
        IssueError::Validation { errors }
    }

    /// Checks every field and returns either the validated request or a map
    /// of messages keyed by field name. `known_providers` must be sorted;
    /// the ids appear verbatim in the rejection message.
    pub fn validate(self, known_providers: &[&str]) -> Result<IssueRequest, IssueError> {
        self.validate_with(BTreeMap::new(), known_providers)
    }

    fn validate_with(
        self,
        mut errors: BTreeMap<String, Vec<String>>,
        known_providers: &[&str],
    ) -> Result<IssueRequest, IssueError> {
        let provider = require(&mut errors, "provider", self.provider);
        let secret_id = require(&mut errors, "secret_id", self.secret_id);
        let project = require(&mut errors, "project", self.project);
        let domains = require(&mut errors, "domains", self.domains);
        let email = require(&mut errors, "email", self.email);
        let target_bucket = require(&mut errors, "target_bucket", self.target_bucket);
        let target_bucket_path = require(&mut errors, "target_bucket_path", self.target_bucket_path);

        if let Some(provider) = provider.as_deref() {
            if !known_providers.contains(&provider) {
                field_error(
                    &mut errors,
                    "provider",
                    format!("Must be one of: {}.", known_providers.join(", ")),
                );
            }
        }

        if let Some(domains) = domains.as_deref() {
            if domains.is_empty() {
                field_error(&mut errors, "domains", "Domains list can't be empty!");
            }
            let unique: BTreeSet<&String> = domains.iter().collect();
            if unique.len() != domains.len() {
                field_error(
                    &mut errors,
                    "domains",
                    "Domains list can't contain duplicates!",
                );
            }
        }

        if let Some(email) = email.as_deref() {
            if !is_plausible_email(email) {
                field_error(&mut errors, "email", "Not a valid email address.");
            }
        }

        let propagation_seconds = match self.propagation_seconds {
            None => DEFAULT_PROPAGATION_SECONDS,
            Some(seconds) if seconds < 1 => {
                field_error(
                    &mut errors,
                    "propagation_seconds",
                    "Value must be greater than 0",
                );
                0
            }
            Some(seconds) => seconds as u64,
        };

        match (
            provider,
            secret_id,
            project,
            domains,
            email,
            target_bucket,
            target_bucket_path,
        ) {
            (
                Some(provider),
                Some(secret_id),
                Some(project),
                Some(domains),
                Some(email),
                Some(target_bucket),
                Some(target_bucket_path),
            ) if errors.is_empty() => Ok(IssueRequest {
                provider,
                secret_id,
                project,
                domains,
                email,
                target_bucket,
                target_bucket_path,
                propagation_seconds,
            }),
            _ => Err(IssueError::Validation { errors }),
        }
    }
}

fn require<T>(
    errors: &mut BTreeMap<String, Vec<String>>,
    field: &str,
    value: Option<T>,
) -> Option<T> {
    // a field dropped for a type error already has a message
    if value.is_none() && !errors.contains_key(field) {
        field_error(errors, field, MISSING_FIELD);
    }
    value
}

fn take_string(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    errors: &mut BTreeMap<String, Vec<String>>,
) -> Option<String> {
    match object.get(field) {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(_) => {
            field_error(errors, field, "Not a valid string.");
            None
        }
    }
}

fn take_string_list(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    errors: &mut BTreeMap<String, Vec<String>>,
) -> Option<Vec<String>> {
    let items = match object.get(field) {
        None | Some(serde_json::Value::Null) => return None,
        Some(serde_json::Value::Array(items)) => items,
        Some(_) => {
            field_error(errors, field, "Not a valid list.");
            return None;
        }
    };
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(s) => values.push(s.to_string()),
            None => {
                field_error(errors, field, "Not a valid string.");
                return None;
            }
        }
    }
    Some(values)
}

fn take_integer(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    errors: &mut BTreeMap<String, Vec<String>>,
) -> Option<i64> {
    match object.get(field) {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => match value.as_i64() {
            Some(n) => Some(n),
            None => {
                field_error(errors, field, "Not a valid integer.");
                None
            }
        },
    }
}

fn field_error(
    errors: &mut BTreeMap<String, Vec<String>>,
    field: &str,
    message: impl Into<String>,
) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// Shallow shape check: one `@`, non-empty local part, dotted domain.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.split_once('.') {
        Some((head, tail)) => !head.is_empty() && !tail.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDERS: &[&str] = &["cloudflare", "google", "route53"];

    fn full_request() -> RawIssueRequest {
        RawIssueRequest {
            provider: Some("route53".into()),
            secret_id: Some("dns-creds".into()),
            project: Some("acme-prod".into()),
            domains: Some(vec!["*.example.com".into(), "www.example.com".into()]),
            email: Some("ops@example.com".into()),
            target_bucket: Some("example-certs".into()),
            target_bucket_path: Some("certificates/example.com".into()),
            propagation_seconds: Some(120),
        }
    }

    fn validation_errors(
        result: Result<IssueRequest, IssueError>,
    ) -> BTreeMap<String, Vec<String>> {
        match result {
            Err(IssueError::Validation { errors }) => errors,
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    #[test]
    fn accepts_a_complete_request() {
        let req = full_request().validate(PROVIDERS).unwrap();
        assert_eq!(req.provider, "route53");
        assert_eq!(req.domains, vec!["*.example.com", "www.example.com"]);
        assert_eq!(req.propagation_seconds, 120);
    }

    #[test]
    fn reports_every_missing_field() {
        let errors = validation_errors(RawIssueRequest::default().validate(PROVIDERS));
        let expected = [
            "provider",
            "secret_id",
            "project",
            "domains",
            "email",
            "target_bucket",
            "target_bucket_path",
        ];
        assert_eq!(errors.len(), expected.len());
        for field in expected {
            assert_eq!(errors[field], vec!["Missing data for required field."]);
        }
    }

    #[test]
    fn propagation_defaults_to_sixty() {
        let mut raw = full_request();
        raw.propagation_seconds = None;
        let req = raw.validate(PROVIDERS).unwrap();
        assert_eq!(req.propagation_seconds, DEFAULT_PROPAGATION_SECONDS);
    }

    #[test]
    fn rejects_non_positive_propagation() {
        for value in [0, -5] {
            let mut raw = full_request();
            raw.propagation_seconds = Some(value);
            let errors = validation_errors(raw.validate(PROVIDERS));
            assert_eq!(
                errors["propagation_seconds"],
                vec!["Value must be greater than 0"]
            );
        }
    }

    #[test]
    fn rejects_empty_domains() {
        let mut raw = full_request();
        raw.domains = Some(vec![]);
        let errors = validation_errors(raw.validate(PROVIDERS));
        assert_eq!(errors["domains"], vec!["Domains list can't be empty!"]);
    }

    #[test]
    fn rejects_duplicate_domains() {
        let mut raw = full_request();
        raw.domains = Some(vec!["example.com".into(), "example.com".into()]);
        let errors = validation_errors(raw.validate(PROVIDERS));
        assert_eq!(
            errors["domains"],
            vec!["Domains list can't contain duplicates!"]
        );
    }

    #[test]
    fn rejects_unknown_provider_listing_the_choices() {
        let mut raw = full_request();
        raw.provider = Some("acme-dns".into());
        let errors = validation_errors(raw.validate(PROVIDERS));
        assert_eq!(
            errors["provider"],
            vec!["Must be one of: cloudflare, google, route53."]
        );
    }

    #[test]
    fn rejects_malformed_emails() {
        let samples = [
            "ops",
            "ops@",
            "@example.com",
            "ops@example",
            "ops @example.com",
            "a@b@c.com",
            "ops@.com",
            "ops@example.",
        ];
        for email in samples {
            let mut raw = full_request();
            raw.email = Some(email.into());
            let errors = validation_errors(raw.validate(PROVIDERS));
            assert_eq!(
                errors["email"],
                vec!["Not a valid email address."],
                "email: {email}"
            );
        }
    }

    #[test]
    fn collects_errors_across_fields() {
        let raw = RawIssueRequest {
            domains: Some(vec![]),
            propagation_seconds: Some(0),
            ..full_request()
        };
        let errors = validation_errors(raw.validate(PROVIDERS));
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key("domains"));
        assert!(errors.contains_key("propagation_seconds"));
    }

    #[test]
    fn missing_body_fields_deserialize_to_none() {
        let raw: RawIssueRequest = serde_json::from_str("{}").unwrap();
        assert!(raw.provider.is_none());
        assert!(raw.propagation_seconds.is_none());
    }

    fn full_body() -> serde_json::Value {
        serde_json::json!({
            "provider": "route53",
            "secret_id": "dns-creds",
            "project": "acme-prod",
            "domains": ["*.example.com", "www.example.com"],
            "email": "ops@example.com",
            "target_bucket": "example-certs",
            "target_bucket_path": "certificates/example.com",
            "propagation_seconds": 120,
        })
    }

    #[test]
    fn parse_accepts_a_complete_body() {
        let req = RawIssueRequest::parse(&full_body(), PROVIDERS).unwrap();
        assert_eq!(req.provider, "route53");
        assert_eq!(req.propagation_seconds, 120);
    }

    #[test]
    fn parse_keeps_type_errors_field_keyed() {
        let mut body = full_body();
        body["propagation_seconds"] = serde_json::json!("abc");
        body["provider"] = serde_json::json!(5);

        let errors = validation_errors(RawIssueRequest::parse(&body, PROVIDERS));

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors["propagation_seconds"],
            vec!["Not a valid integer."]
        );
        assert_eq!(errors["provider"], vec!["Not a valid string."]);
    }

    #[test]
    fn parse_rejects_non_list_domains() {
        let mut body = full_body();
        body["domains"] = serde_json::json!("example.com");
        let errors = validation_errors(RawIssueRequest::parse(&body, PROVIDERS));
        assert_eq!(errors["domains"], vec!["Not a valid list."]);
    }

    #[test]
    fn parse_rejects_non_string_domain_entries() {
        let mut body = full_body();
        body["domains"] = serde_json::json!(["example.com", 5]);
        let errors = validation_errors(RawIssueRequest::parse(&body, PROVIDERS));
        assert_eq!(errors["domains"], vec!["Not a valid string."]);
    }

    #[test]
    fn parse_rejects_fractional_propagation() {
        let mut body = full_body();
        body["propagation_seconds"] = serde_json::json!(1.5);
        let errors = validation_errors(RawIssueRequest::parse(&body, PROVIDERS));
        assert_eq!(
            errors["propagation_seconds"],
            vec!["Not a valid integer."]
        );
    }

    #[test]
    fn parse_treats_null_fields_as_missing() {
        let mut body = full_body();
        body["email"] = serde_json::Value::Null;
        let errors = validation_errors(RawIssueRequest::parse(&body, PROVIDERS));
        assert_eq!(errors["email"], vec!["Missing data for required field."]);
    }

    #[test]
    fn parse_rejects_non_object_bodies_wholesale() {
        for body in [
            serde_json::json!([1, 2]),
            serde_json::json!("a string"),
            serde_json::Value::Null,
        ] {
            let errors = validation_errors(RawIssueRequest::parse(&body, PROVIDERS));
            assert_eq!(
                errors["_request"],
                vec!["Request json is absent or invalid!"]
            );
        }
    }
}
