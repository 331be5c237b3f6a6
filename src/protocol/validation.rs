use crate::config::ProtocolConfig;

use super::types::ROOM_ID_LENGTH;

pub fn validate_participant_id_with_config(id: &str, config: &ProtocolConfig) -> Result<(), String> {
    if id.is_empty() {
        return Err("Participant id cannot be empty".to_string());
    }
    if id.len() > config.max_participant_id_length {
        return Err(format!(
            "Participant id too long (max {} characters)",
            config.max_participant_id_length
        ));
    }
    if id.trim().len() != id.len() {
        return Err("Participant id cannot have leading or trailing whitespace".to_string());
    }
    if id.chars().any(char::is_control) {
        return Err("Participant id contains invalid characters".to_string());
    }
    Ok(())
}

pub fn validate_display_name_with_config(
    name: &str,
    config: &ProtocolConfig,
) -> Result<(), String> {
    if name.is_empty() {
        return Err("Display name cannot be empty".to_string());
    }
    if name.chars().count() > config.max_display_name_length {
        return Err(format!(
            "Display name too long (max {} characters)",
            config.max_display_name_length
        ));
    }
    if name.trim().is_empty() {
        return Err("Display name cannot be blank".to_string());
    }
    if name.chars().any(char::is_control) {
        return Err("Display name cannot contain control characters".to_string());
    }
    Ok(())
}

/// Room ids are unpadded base64url strings of a fixed length.
pub fn is_well_formed_room_id(room_id: &str) -> bool {
    room_id.len() == ROOM_ID_LENGTH
        && room_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn participant_id_rules() {
        let cfg = ProtocolConfig::default();
        assert!(validate_participant_id_with_config("clinician-42", &cfg).is_ok());
        assert!(validate_participant_id_with_config("", &cfg).is_err());
        assert!(validate_participant_id_with_config(" padded", &cfg).is_err());
        assert!(validate_participant_id_with_config("tab\tinside", &cfg).is_err());
        let long = "x".repeat(cfg.max_participant_id_length + 1);
        assert!(validate_participant_id_with_config(&long, &cfg).is_err());
    }

    #[test]
    fn display_name_rules() {
        let cfg = ProtocolConfig::default();
        assert!(validate_display_name_with_config("Dr. Müller", &cfg).is_ok());
        assert!(validate_display_name_with_config("   ", &cfg).is_err());
        assert!(validate_display_name_with_config("", &cfg).is_err());
        assert!(validate_display_name_with_config("line\nbreak", &cfg).is_err());
    }

    #[test]
    fn display_name_limit_counts_characters_not_bytes() {
        let cfg = ProtocolConfig {
            max_display_name_length: 4,
            ..ProtocolConfig::default()
        };
        assert!(validate_display_name_with_config("ääää", &cfg).is_ok());
        assert!(validate_display_name_with_config("äääää", &cfg).is_err());
    }

    #[test]
    fn room_id_shape() {
        assert!(is_well_formed_room_id("AbCdEfGhIjKlMnOpQr-_12"));
        assert!(!is_well_formed_room_id("short"));
        assert!(!is_well_formed_room_id("AbCdEfGhIjKlMnOpQr+/12"));
    }

    proptest! {
        #[test]
        fn generated_base64url_ids_are_well_formed(id in "[A-Za-z0-9_-]{22}") {
            prop_assert!(is_well_formed_room_id(&id));
        }

        #[test]
        fn other_lengths_are_rejected(id in "[A-Za-z0-9_-]{0,21}|[A-Za-z0-9_-]{23,40}") {
            prop_assert!(!is_well_formed_room_id(&id));
        }
    }
}
