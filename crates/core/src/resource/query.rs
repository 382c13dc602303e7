use super::error::ResourceError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Collection query filter.
///
/// Accepts `true`, `false` and `<field> eq <json literal>`, for example
/// `mail eq "jake.feasel@forgerock.com"`.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    True,
    False,
    Equals { field: String, value: Value },
}

impl QueryFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let field = if field.starts_with('/') {
            field
        } else {
            format!("/{}", field)
        };
        Self::Equals {
            field,
            value: value.into(),
        }
    }

    pub fn matches(&self, content: &Value) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Equals { field, value } => content.pointer(field) == Some(value),
        }
    }
}

impl FromStr for QueryFilter {
    type Err = ResourceError;

    fn from_str(filter: &str) -> Result<Self, Self::Err> {
        let filter = filter.trim();
        match filter {
            "true" => return Ok(Self::True),
            "false" => return Ok(Self::False),
            _ => {}
        }

        let (field, literal) = filter.split_once(" eq ").ok_or_else(|| {
            ResourceError::bad_request(format!("Unsupported query filter '{}'", filter))
        })?;

        let field = field.trim();
        if field.is_empty() {
            return Err(ResourceError::bad_request(format!(
                "Query filter '{}' has no field",
                filter
            )));
        }

        let value: Value = serde_json::from_str(literal.trim()).map_err(|_| {
            ResourceError::bad_request(format!(
                "Query filter '{}' compares against an invalid value",
                filter
            ))
        })?;

        Ok(Self::equals(field, value))
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("true"),
            Self::False => f.write_str("false"),
            Self::Equals { field, value } => write!(f, "{} eq {}", field, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse() {
        assert_eq!("true".parse::<QueryFilter>().unwrap(), QueryFilter::True);
        assert_eq!(" false ".parse::<QueryFilter>().unwrap(), QueryFilter::False);
        assert_eq!(
            r#"name eq "Jake""#.parse::<QueryFilter>().unwrap(),
            QueryFilter::equals("/name", "Jake")
        );
        assert_eq!(
            "/logins eq 3".parse::<QueryFilter>().unwrap(),
            QueryFilter::equals("logins", 3)
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!("name sw \"J\"".parse::<QueryFilter>().is_err());
        assert!(" eq \"J\"".parse::<QueryFilter>().is_err());
        assert!("name eq Jake".parse::<QueryFilter>().is_err());
    }

    #[test]
    fn test_matches() {
        let content = json!({"name": "Jake", "mail": "jake.feasel@forgerock.com"});
        assert!(QueryFilter::True.matches(&content));
        assert!(!QueryFilter::False.matches(&content));
        assert!(QueryFilter::equals("name", "Jake").matches(&content));
        assert!(!QueryFilter::equals("name", "Andy").matches(&content));
        assert!(!QueryFilter::equals("missing", "Jake").matches(&content));
    }

    #[test]
    fn test_display() {
        assert_eq!(QueryFilter::equals("name", "Jake").to_string(), r#"/name eq "Jake""#);
    }
}
