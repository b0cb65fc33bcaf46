use uuid::Uuid;

/// Externally addressable session identifier, distinct from the row id.
pub fn generate_session_token() -> String {
    format!("quiz_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_prefixed_and_unique() {
        let a = generate_session_token();
        let b = generate_session_token();

        assert!(a.starts_with("quiz_"));
        assert_eq!(a.len(), "quiz_".len() + 32);
        assert_ne!(a, b);
    }
}
