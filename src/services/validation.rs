/// Caller-supplied email policy. The roster itself only insists on a
/// non-empty address; everything else is up to the validator it was built
/// with.
pub trait EmailValidator: Send + Sync {
    fn validate(&self, email: &str) -> Result<(), String>;
}

impl<F> EmailValidator for F
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, email: &str) -> Result<(), String> {
        self(email)
    }
}

/// Accepts `local@domain` with no whitespace and exactly one `@`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicEmailValidator;

impl EmailValidator for BasicEmailValidator {
    fn validate(&self, email: &str) -> Result<(), String> {
        if email.chars().any(char::is_whitespace) {
            return Err("Email must not contain whitespace".to_string());
        }
        let mut parts = email.split('@');
        let local = parts.next().unwrap_or("");
        let domain = parts.next().unwrap_or("");
        if local.is_empty() || domain.is_empty() || parts.next().is_some() {
            return Err("Email must look like name@domain".to_string());
        }
        if domain.starts_with('.') || domain.ends_with('.') {
            return Err("Email domain is malformed".to_string());
        }
        Ok(())
    }
}

pub fn require_non_empty(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email must not be empty".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_validator_accepts_school_addresses() {
        let v = BasicEmailValidator;
        assert!(v.validate("michael@mergington.edu").is_ok());
        assert!(v.validate("a@x.edu").is_ok());
        assert!(v.validate("first.last+chess@sub.mergington.edu").is_ok());
    }

    #[test]
    fn basic_validator_rejects_malformed() {
        let v = BasicEmailValidator;
        for bad in [
            "no-at-sign",
            "@mergington.edu",
            "student@",
            "two@@mergington.edu",
            "a@b@c",
            "student @mergington.edu",
            "student@.edu",
            "student@mergington.",
        ] {
            assert!(v.validate(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn closures_are_validators() {
        let only_school = |email: &str| {
            if email.ends_with("@mergington.edu") {
                Ok(())
            } else {
                Err("Use your school address".to_string())
            }
        };
        assert!(only_school.validate("emma@mergington.edu").is_ok());
        assert_eq!(
            only_school.validate("emma@gmail.com"),
            Err("Use your school address".to_string())
        );
    }

    #[test]
    fn blank_is_empty() {
        assert!(require_non_empty("").is_err());
        assert!(require_non_empty("   ").is_err());
        assert!(require_non_empty("x").is_ok());
    }
}
