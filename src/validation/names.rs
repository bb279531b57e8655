//! Kubernetes name syntax checks.
//!
//! Each check returns the list of problems with the value, empty if valid.
//! Messages follow the ones printed by the API server.

use regex::Regex;
use std::sync::OnceLock;

const DNS1035_LABEL_FMT: &str = "[a-z]([-a-z0-9]*[a-z0-9])?";
const DNS1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
const DNS1123_SUBDOMAIN_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?(\\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*";
const QUALIFIED_NAME_FMT: &str = "([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]";
const LABEL_VALUE_FMT: &str = "(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?";
const ENV_VAR_NAME_FMT: &str = "[-._a-zA-Z][-._a-zA-Z0-9]*";

const DNS1035_LABEL_MAX_LENGTH: usize = 63;
const DNS1123_LABEL_MAX_LENGTH: usize = 63;
const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const QUALIFIED_NAME_MAX_LENGTH: usize = 63;
const LABEL_VALUE_MAX_LENGTH: usize = 63;

static DNS1035_LABEL: OnceLock<Regex> = OnceLock::new();
static DNS1123_LABEL: OnceLock<Regex> = OnceLock::new();
static DNS1123_SUBDOMAIN: OnceLock<Regex> = OnceLock::new();
static QUALIFIED_NAME: OnceLock<Regex> = OnceLock::new();
static LABEL_VALUE: OnceLock<Regex> = OnceLock::new();
static ENV_VAR_NAME: OnceLock<Regex> = OnceLock::new();

fn anchored(cell: &'static OnceLock<Regex>, fmt: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(&format!("^{fmt}$")).expect("name formats are valid regexes"))
}

fn max_len_error(length: usize) -> String {
    format!("must be no more than {length} characters")
}

fn regex_error(message: &str, fmt: &str, examples: &[&str]) -> String {
    let examples = examples
        .iter()
        .map(|example| format!("'{example}'"))
        .collect::<Vec<_>>()
        .join(", or ");

    format!("{message} (e.g. {examples}, regex used for validation is '{fmt}')")
}

pub fn is_dns1035_label(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1035_LABEL_MAX_LENGTH {
        errors.push(max_len_error(DNS1035_LABEL_MAX_LENGTH));
    }
    if !anchored(&DNS1035_LABEL, DNS1035_LABEL_FMT).is_match(value) {
        errors.push(regex_error(
            "a DNS-1035 label must consist of lower case alphanumeric characters or '-', start with an alphabetic character, and end with an alphanumeric character",
            DNS1035_LABEL_FMT,
            &["my-name", "abc-123"],
        ));
    }
    errors
}

pub fn is_dns1123_label(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1123_LABEL_MAX_LENGTH {
        errors.push(max_len_error(DNS1123_LABEL_MAX_LENGTH));
    }
    if !anchored(&DNS1123_LABEL, DNS1123_LABEL_FMT).is_match(value) {
        errors.push(regex_error(
            "a lowercase RFC 1123 label must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character",
            DNS1123_LABEL_FMT,
            &["my-name", "123-abc"],
        ));
    }
    errors
}

pub fn is_dns1123_subdomain(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        errors.push(max_len_error(DNS1123_SUBDOMAIN_MAX_LENGTH));
    }
    if !anchored(&DNS1123_SUBDOMAIN, DNS1123_SUBDOMAIN_FMT).is_match(value) {
        errors.push(regex_error(
            "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character",
            DNS1123_SUBDOMAIN_FMT,
            &["example.com"],
        ));
    }
    errors
}

/// A qualified name is an optional DNS subdomain prefix and a name, joined by `/`.
pub fn is_qualified_name(value: &str) -> Vec<String> {
    let mut errors = Vec::new();

    let parts: Vec<&str> = value.split('/').collect();
    let name = match parts.as_slice() {
        [name] => *name,
        [prefix, name] => {
            if prefix.is_empty() {
                errors.push(String::from("prefix part must be non-empty"));
            } else {
                errors.extend(
                    is_dns1123_subdomain(prefix)
                        .into_iter()
                        .map(|error| format!("prefix part {error}")),
                );
            }
            *name
        }
        _ => {
            errors.push(regex_error(
                "a qualified name must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character with an optional DNS subdomain prefix and '/'",
                QUALIFIED_NAME_FMT,
                &["MyName", "my.name", "123-abc"],
            ));
            return errors;
        }
    };

    if name.is_empty() {
        errors.push(String::from("name part must be non-empty"));
    } else if name.len() > QUALIFIED_NAME_MAX_LENGTH {
        errors.push(format!("name part {}", max_len_error(QUALIFIED_NAME_MAX_LENGTH)));
    }
    if !anchored(&QUALIFIED_NAME, QUALIFIED_NAME_FMT).is_match(name) {
        errors.push(format!(
            "name part {}",
            regex_error(
                "must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character",
                QUALIFIED_NAME_FMT,
                &["MyName", "my.name", "123-abc"],
            )
        ));
    }
    errors
}

pub fn is_valid_label_value(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > LABEL_VALUE_MAX_LENGTH {
        errors.push(max_len_error(LABEL_VALUE_MAX_LENGTH));
    }
    if !anchored(&LABEL_VALUE, LABEL_VALUE_FMT).is_match(value) {
        errors.push(regex_error(
            "a valid label must be an empty string or consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character",
            LABEL_VALUE_FMT,
            &["MyValue", "my_value", "12345"],
        ));
    }
    errors
}

pub fn is_env_var_name(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if !anchored(&ENV_VAR_NAME, ENV_VAR_NAME_FMT).is_match(value) {
        errors.push(regex_error(
            "a valid environment variable name must consist of alphabetic characters, digits, '_', '-', or '.', and must not start with a digit",
            ENV_VAR_NAME_FMT,
            &["my.env-name", "MY_ENV.NAME", "MyEnvName1"],
        ));
    }

    match value {
        "." => errors.push(String::from("must not be '.'")),
        ".." => errors.push(String::from("must not be '..'")),
        _ if value.starts_with("..") => errors.push(String::from("must not start with '..'")),
        _ => {}
    }
    errors
}
