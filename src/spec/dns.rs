//! DNS hosted-zone lookup and TLS certificate descriptors
//!
//! The hosted zone is owned externally: the stack only looks it up, and the
//! certificate is validated against it by creating DNS records. Actual
//! issuance and validation polling happen on the provider side and can block
//! a real deployment for an unbounded period; none of that is modeled here.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Read-only reference to an externally managed hosted zone
///
/// The zone is never created or destroyed by the stack.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostedZoneLookup {
    /// Domain name of the zone, e.g. `cdkdemo.techmonkey.pro`
    pub domain_name: String,
}

impl HostedZoneLookup {
    /// Create a lookup for the given zone domain
    pub fn new(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
        }
    }

    /// Validate the lookup
    pub fn validate(&self) -> crate::Result<()> {
        if self.domain_name.trim().is_empty() {
            return Err(crate::Error::validation("hosted zone domain must not be empty"));
        }
        if !self.domain_name.contains('.') {
            return Err(crate::Error::validation(format!(
                "hosted zone domain {} is not a fully qualified name",
                self.domain_name
            )));
        }
        Ok(())
    }
}

/// Certificate validation method
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[non_exhaustive]
pub enum ValidationMethod {
    /// Validation by DNS record against the hosted zone
    #[default]
    Dns,
    /// Validation by email to the domain contacts
    Email,
}

impl std::fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dns => write!(f, "DNS"),
            Self::Email => write!(f, "EMAIL"),
        }
    }
}

/// TLS certificate declaration for a domain
///
/// Created and validated against the hosted zone, torn down with the stack.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Primary domain the certificate covers
    pub domain_name: String,

    /// Alternative names covered alongside the primary domain
    pub subject_alternative_names: Vec<String>,

    /// How the certificate is validated
    #[serde(default)]
    pub validation_method: ValidationMethod,

    /// Domain of the hosted zone the validation records are written to
    pub hosted_zone: String,
}

impl CertificateSpec {
    /// Build the stack's certificate for a looked-up zone
    ///
    /// Covers the zone apex plus a single wildcard alternative name.
    pub fn for_zone(zone: &HostedZoneLookup) -> Self {
        Self {
            domain_name: zone.domain_name.clone(),
            subject_alternative_names: vec![format!("*.{}", zone.domain_name)],
            validation_method: ValidationMethod::Dns,
            hosted_zone: zone.domain_name.clone(),
        }
    }

    /// Validate the certificate declaration
    ///
    /// The stack's certificate contract is narrow: exactly one wildcard
    /// alternative name for the primary domain, always DNS-validated against
    /// the looked-up zone.
    pub fn validate(&self) -> crate::Result<()> {
        if self.domain_name.trim().is_empty() {
            return Err(crate::Error::validation("certificate domain must not be empty"));
        }
        if self.validation_method != ValidationMethod::Dns {
            return Err(crate::Error::validation(format!(
                "certificate for {} must use DNS validation against the hosted zone, not {}",
                self.domain_name, self.validation_method
            )));
        }
        if self.subject_alternative_names.len() != 1 {
            return Err(crate::Error::validation(format!(
                "certificate for {} must list exactly one alternative name, found {}",
                self.domain_name,
                self.subject_alternative_names.len()
            )));
        }
        let san = &self.subject_alternative_names[0];
        if san != &format!("*.{}", self.domain_name) {
            return Err(crate::Error::validation(format!(
                "certificate alternative name {san} must be the wildcard of {}",
                self.domain_name
            )));
        }
        if !(self.domain_name == self.hosted_zone
            || self.domain_name.ends_with(&format!(".{}", self.hosted_zone)))
        {
            return Err(crate::Error::validation(format!(
                "certificate domain {} is not inside hosted zone {}",
                self.domain_name, self.hosted_zone
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Story: The Certificate Contract
    // =========================================================================

    /// Story: A certificate built from a zone lookup covers apex plus wildcard
    ///
    /// `cdkdemo.techmonkey.pro` plus exactly one alternative name
    /// `*.cdkdemo.techmonkey.pro`, DNS-validated against the same zone.
    #[test]
    fn story_certificate_covers_apex_and_wildcard() {
        let zone = HostedZoneLookup::new("cdkdemo.techmonkey.pro");
        let cert = CertificateSpec::for_zone(&zone);

        assert_eq!(cert.domain_name, "cdkdemo.techmonkey.pro");
        assert_eq!(
            cert.subject_alternative_names,
            vec!["*.cdkdemo.techmonkey.pro".to_string()]
        );
        assert_eq!(cert.validation_method, ValidationMethod::Dns);
        assert_eq!(cert.hosted_zone, "cdkdemo.techmonkey.pro");
        assert!(cert.validate().is_ok());
    }

    /// Story: Email validation is rejected
    ///
    /// Validation is always DNS against the looked-up zone, never a different
    /// method.
    #[test]
    fn story_email_validation_is_rejected() {
        let zone = HostedZoneLookup::new("cdkdemo.techmonkey.pro");
        let cert = CertificateSpec {
            validation_method: ValidationMethod::Email,
            ..CertificateSpec::for_zone(&zone)
        };
        let result = cert.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("DNS validation"));
    }

    /// Story: Extra or missing alternative names are rejected
    #[test]
    fn story_exactly_one_alternative_name() {
        let zone = HostedZoneLookup::new("cdkdemo.techmonkey.pro");

        let cert = CertificateSpec {
            subject_alternative_names: vec![],
            ..CertificateSpec::for_zone(&zone)
        };
        assert!(cert.validate().is_err());

        let cert = CertificateSpec {
            subject_alternative_names: vec![
                "*.cdkdemo.techmonkey.pro".to_string(),
                "api.cdkdemo.techmonkey.pro".to_string(),
            ],
            ..CertificateSpec::for_zone(&zone)
        };
        let result = cert.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exactly one"));
    }

    /// Story: The alternative name must be the wildcard of the primary domain
    #[test]
    fn story_alternative_name_must_be_wildcard() {
        let zone = HostedZoneLookup::new("cdkdemo.techmonkey.pro");
        let cert = CertificateSpec {
            subject_alternative_names: vec!["www.cdkdemo.techmonkey.pro".to_string()],
            ..CertificateSpec::for_zone(&zone)
        };
        let result = cert.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("wildcard"));
    }

    /// Story: The certificate domain must live inside its validation zone
    #[test]
    fn story_domain_outside_zone_is_rejected() {
        let cert = CertificateSpec {
            domain_name: "example.com".to_string(),
            subject_alternative_names: vec!["*.example.com".to_string()],
            validation_method: ValidationMethod::Dns,
            hosted_zone: "cdkdemo.techmonkey.pro".to_string(),
        };
        let result = cert.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not inside"));
    }

    // =========================================================================
    // Hosted Zone Lookup
    // =========================================================================

    #[test]
    fn test_zone_lookup_validation() {
        assert!(HostedZoneLookup::new("cdkdemo.techmonkey.pro").validate().is_ok());
        assert!(HostedZoneLookup::new("").validate().is_err());
        assert!(HostedZoneLookup::new("localhost").validate().is_err());
    }

    #[test]
    fn test_validation_method_serde() {
        let json = serde_json::to_string(&ValidationMethod::Dns).unwrap();
        assert_eq!(json, "\"DNS\"");
        let parsed: ValidationMethod = serde_json::from_str("\"EMAIL\"").unwrap();
        assert_eq!(parsed, ValidationMethod::Email);
    }

    #[test]
    fn test_certificate_serde_roundtrip() {
        let cert = CertificateSpec::for_zone(&HostedZoneLookup::new("cdkdemo.techmonkey.pro"));
        let json = serde_json::to_string(&cert).unwrap();
        let parsed: CertificateSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(cert, parsed);
    }
}
