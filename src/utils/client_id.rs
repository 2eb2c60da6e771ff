use uuid::Uuid;

/// client token 的合法形状：非空、不超过 64 字符、仅含字母数字和 '-'。
/// 不做任何密码学校验（身份即持有该 token）。
pub fn is_well_formed_client_id(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= 64
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// 身份分配：已有合法 token 原样返回；否则生成新的随机 UUIDv4。
/// 返回 (token, 是否新生成)，新生成时调用方需要负责持久化（cookie 一年有效）。
pub fn ensure_identity(existing_token: Option<&str>) -> (String, bool) {
    match existing_token {
        Some(token) if is_well_formed_client_id(token) => (token.to_string(), false),
        _ => (Uuid::new_v4().to_string(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_token_returned_unchanged() {
        let token = Uuid::new_v4().to_string();
        let (id1, fresh1) = ensure_identity(Some(&token));
        let (id2, fresh2) = ensure_identity(Some(&token));
        assert_eq!(id1, token);
        assert_eq!(id2, token);
        assert!(!fresh1);
        assert!(!fresh2);
    }

    #[test]
    fn test_missing_token_generates_distinct_ids() {
        let (id1, fresh1) = ensure_identity(None);
        let (id2, fresh2) = ensure_identity(None);
        assert!(fresh1);
        assert!(fresh2);
        assert_ne!(id1, id2);
        assert!(is_well_formed_client_id(&id1));
    }

    #[test]
    fn test_malformed_token_replaced() {
        let (id, fresh) = ensure_identity(Some("not a token; drop table users"));
        assert!(fresh);
        assert!(is_well_formed_client_id(&id));

        let (_, fresh_empty) = ensure_identity(Some(""));
        assert!(fresh_empty);

        let too_long = "a".repeat(65);
        let (_, fresh_long) = ensure_identity(Some(&too_long));
        assert!(fresh_long);
    }
}
