/// Input validation for payloads sent by the game server
use thiserror::Error;

const MAX_GUID_LEN: usize = 64;
const MAX_NAME_LEN: usize = 64;
const MAX_IP_LEN: usize = 64;
const MAX_PLAYERS: usize = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("GUID cannot be empty")]
    GuidEmpty,

    #[error("GUID too long (max 64 characters, got {0})")]
    GuidTooLong(usize),

    #[error("GUID contains invalid characters (only alphanumeric allowed)")]
    GuidInvalidChars,

    #[error("Player name cannot be empty")]
    PlayerNameEmpty,

    #[error("Player name too long (max 64 characters, got {0})")]
    PlayerNameTooLong(usize),

    #[error("IP address too long (max 64 characters, got {0})")]
    IpTooLong(usize),

    #[error("Player list too large (max {max} players, got {actual})")]
    PlayerListTooLarge { max: usize, actual: usize },
}

/// Validates a player GUID
///
/// Rules:
/// - Cannot be empty
/// - Max 64 characters
/// - Only ASCII alphanumeric characters
pub fn validate_guid(guid: &str) -> Result<(), ValidationError> {
    if guid.is_empty() {
        return Err(ValidationError::GuidEmpty);
    }

    if guid.len() > MAX_GUID_LEN {
        return Err(ValidationError::GuidTooLong(guid.len()));
    }

    if !guid.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::GuidInvalidChars);
    }

    Ok(())
}

/// Validates a display name. Any characters are allowed since games
/// permit color codes and symbols in names.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::PlayerNameEmpty);
    }

    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::PlayerNameTooLong(len));
    }

    Ok(())
}

pub fn validate_ip(ip: &str) -> Result<(), ValidationError> {
    if ip.len() > MAX_IP_LEN {
        return Err(ValidationError::IpTooLong(ip.len()));
    }
    Ok(())
}

/// Validates one player's identity fields
pub fn validate_player(guid: &str, name: &str, ip: &str) -> Result<(), ValidationError> {
    validate_guid(guid)?;
    validate_player_name(name)?;
    validate_ip(ip)
}

/// Validates the size of a roster sync (max 1000 players per request)
pub fn validate_player_count(count: usize) -> Result<(), ValidationError> {
    if count > MAX_PLAYERS {
        return Err(ValidationError::PlayerListTooLarge {
            max: MAX_PLAYERS,
            actual: count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_guids() {
        assert!(validate_guid("0123456789ABCDEF0123456789ABCDEF").is_ok());
        assert!(validate_guid("a").is_ok());
        assert!(validate_guid(&"F".repeat(64)).is_ok());
    }

    #[test]
    fn test_empty_guid() {
        assert_eq!(validate_guid(""), Err(ValidationError::GuidEmpty));
    }

    #[test]
    fn test_guid_too_long() {
        assert_eq!(
            validate_guid(&"F".repeat(65)),
            Err(ValidationError::GuidTooLong(65))
        );
    }

    #[test]
    fn test_guid_invalid_chars() {
        assert_eq!(
            validate_guid("ABC-123"),
            Err(ValidationError::GuidInvalidChars)
        );
        assert_eq!(
            validate_guid("ABC 123"),
            Err(ValidationError::GuidInvalidChars)
        );
    }

    #[test]
    fn test_player_names() {
        assert!(validate_player_name("^1Red^7Name").is_ok());
        assert!(validate_player_name("[clan] player").is_ok());
        assert_eq!(
            validate_player_name(""),
            Err(ValidationError::PlayerNameEmpty)
        );
        assert_eq!(
            validate_player_name(&"x".repeat(65)),
            Err(ValidationError::PlayerNameTooLong(65))
        );
    }

    #[test]
    fn test_validate_player_reports_first_problem() {
        assert!(validate_player("ABC123", "Steve", "10.0.0.1").is_ok());
        assert_eq!(
            validate_player("", "", "10.0.0.1"),
            Err(ValidationError::GuidEmpty)
        );
        assert_eq!(
            validate_player("ABC123", "Steve", &"1".repeat(65)),
            Err(ValidationError::IpTooLong(65))
        );
    }

    #[test]
    fn test_player_count() {
        assert!(validate_player_count(0).is_ok());
        assert!(validate_player_count(1000).is_ok());
        assert_eq!(
            validate_player_count(1001),
            Err(ValidationError::PlayerListTooLarge {
                max: 1000,
                actual: 1001
            })
        );
    }
}
