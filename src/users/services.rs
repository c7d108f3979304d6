use crate::validator::{is_valid_email, Validator};

pub fn validate_name(v: &mut Validator, name: &str) {
    v.check(!name.is_empty(), "name", "must be provided");
    v.check(name.len() <= 500, "name", "must not be more than 500 bytes long");
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(is_valid_email(email), "email", "must be a valid email address");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        let mut v = Validator::new();
        validate_name(&mut v, "");
        assert_eq!(v.errors()["name"], "must be provided");

        let mut v = Validator::new();
        validate_name(&mut v, &"a".repeat(501));
        assert_eq!(v.errors()["name"], "must not be more than 500 bytes long");
    }

    #[test]
    fn email_rules() {
        let mut v = Validator::new();
        validate_email(&mut v, "");
        assert_eq!(v.errors()["email"], "must be provided");

        let mut v = Validator::new();
        validate_email(&mut v, "not-an-email");
        assert_eq!(v.errors()["email"], "must be a valid email address");

        let mut v = Validator::new();
        validate_email(&mut v, "alice@example.com");
        assert!(v.valid());
    }
}
