use itertools::Itertools;
use std::fmt;

/// A problem with a single field, rendered the way the API server does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Required {
        path: String,
        detail: Option<String>,
    },
    Invalid {
        path: String,
        value: String,
        detail: String,
    },
    TooLong {
        path: String,
        max: usize,
    },
}

impl FieldError {
    pub fn required(path: impl Into<String>, detail: Option<&str>) -> Self {
        FieldError::Required {
            path: path.into(),
            detail: detail.map(String::from),
        }
    }

    pub fn invalid(path: impl Into<String>, value: &str, detail: impl Into<String>) -> Self {
        FieldError::Invalid {
            path: path.into(),
            value: value.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Required { path, detail } => {
                write!(f, "{path}: Required value")?;
                if let Some(detail) = detail {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
            FieldError::Invalid {
                path,
                value,
                detail,
            } => write!(f, "{path}: Invalid value: {value:?}: {detail}"),
            FieldError::TooLong { path, max } => {
                write!(f, "{path}: Too long: must have at most {max} bytes")
            }
        }
    }
}

/// Joins field errors into one message: a single error as is, several as
/// `[a, b]`.
pub fn aggregate(errors: Vec<FieldError>) -> Result<(), String> {
    match errors.as_slice() {
        [] => Ok(()),
        [error] => Err(error.to_string()),
        errors => Err(format!("[{}]", errors.iter().join(", "))),
    }
}
