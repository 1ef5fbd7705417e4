/// Minimum length for a password to count as strong
const STRONG_MIN_LEN: usize = 8;

/// Minimum length for a password to count as medium
const MEDIUM_MIN_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    Empty,
    Weak,
    Medium,
    Strong,
}

impl Strength {
    pub fn label(&self) -> &'static str {
        match self {
            Strength::Empty => "",
            Strength::Weak => "Weak",
            Strength::Medium => "Medium",
            Strength::Strong => "Strong",
        }
    }
}

pub fn password_strength(password: &str) -> Strength {
    let len = password.chars().count();
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if len >= STRONG_MIN_LEN && has_upper && has_digit {
        Strength::Strong
    } else if len >= MEDIUM_MIN_LEN {
        Strength::Medium
    } else if len > 0 {
        Strength::Weak
    } else {
        Strength::Empty
    }
}
