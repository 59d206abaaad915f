pub const MAX_NAME_LENGTH: usize = 64;
pub const MAX_DESCRIPTION_LENGTH: usize = 255;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 512;
pub const MIN_SEARCH_QUERY_LENGTH: usize = 2;

#[derive(Debug)]
pub enum Validity {
    Valid,
    Invalid(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match &self {
            Validity::Valid => true,
            Validity::Invalid(_) => false,
        }
    }
}

pub fn validate_email_address(email: &str) -> Validity {
    if email.chars().count() > 320 {
        return Validity::Invalid(String::from("Email address is too long."));
    }

    for c in email.chars() {
        if c == ' ' || !c.is_ascii() {
            return Validity::Invalid(String::from(
                "Email address cannot contain a space or non-ASCII characters.",
            ));
        }
    }

    if email.contains("@.") {
        return Validity::Invalid(String::from(
            "Domain name in email address cannot begin with a period.",
        ));
    }

    let email = match email.split_once('@') {
        Some(s) => s,
        None => {
            return Validity::Invalid(String::from("Email address must contain an at symbol (@)."))
        }
    };

    if email.0.is_empty() || email.1.len() < 3 {
        return Validity::Invalid(String::from("Email username or domain name is too short."));
    }

    if email.1.contains('@') || !email.1.contains('.') {
        return Validity::Invalid(String::from(
            "Email address must have only one at symbol (@) and the domain must contain a period.",
        ));
    }

    if email.1.ends_with('.') {
        return Validity::Invalid(String::from("Email address cannot end with a period."));
    }

    Validity::Valid
}

/// Used for user, category and list names.
pub fn validate_name(name: &str) -> Validity {
    if name.trim().is_empty() {
        return Validity::Invalid(String::from("Name cannot be empty."));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Validity::Invalid(format!(
            "Name cannot be longer than {MAX_NAME_LENGTH} characters."
        ));
    }

    Validity::Valid
}

pub fn validate_description(description: &str) -> Validity {
    if description.trim().is_empty() {
        return Validity::Invalid(String::from("Description cannot be empty."));
    }

    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Validity::Invalid(format!(
            "Description cannot be longer than {MAX_DESCRIPTION_LENGTH} characters."
        ));
    }

    Validity::Valid
}

/// Colors are `#RRGGBB`.
pub fn validate_hex_color(color: &str) -> Validity {
    let Some(digits) = color.strip_prefix('#') else {
        return Validity::Invalid(String::from("Color must start with '#'."));
    };

    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Validity::Invalid(String::from(
            "Color must be '#' followed by six hexadecimal digits.",
        ));
    }

    Validity::Valid
}

/// ISO 4217 style: three uppercase ASCII letters.
pub fn validate_currency(currency: &str) -> Validity {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Validity::Invalid(String::from(
            "Currency must be a three-letter uppercase code.",
        ));
    }

    Validity::Valid
}

pub fn validate_password(password: &str) -> Validity {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Validity::Invalid(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long."
        ));
    }

    if length > MAX_PASSWORD_LENGTH {
        return Validity::Invalid(format!(
            "Password cannot be longer than {MAX_PASSWORD_LENGTH} characters."
        ));
    }

    Validity::Valid
}

pub fn validate_search_query(query: &str) -> Validity {
    if query.trim().chars().count() < MIN_SEARCH_QUERY_LENGTH {
        return Validity::Invalid(format!(
            "Search query must be at least {MIN_SEARCH_QUERY_LENGTH} characters long."
        ));
    }

    Validity::Valid
}
