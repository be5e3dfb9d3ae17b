//! JSON encoding of [`AppState`] with the validation gate applied both ways.

use mockchat_shared::validation::is_valid_app_state;
use mockchat_shared::AppState;
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Serialize a state for storage, refusing anything that would not load back.
pub fn encode_state(state: &AppState) -> Result<String> {
    let value = serde_json::to_value(state)?;
    if !is_valid_app_state(&value) {
        return Err(StoreError::InvalidState(
            "refusing to persist a malformed state".into(),
        ));
    }
    Ok(value.to_string())
}

/// Decode a stored JSON value, checking its structure first.
pub fn decode_state(value: Value) -> Result<AppState> {
    if !is_valid_app_state(&value) {
        return Err(StoreError::InvalidState(
            "stored blob failed structural validation".into(),
        ));
    }
    serde_json::from_value(value).map_err(|e| StoreError::InvalidState(e.to_string()))
}

pub fn parse_state(raw: &str) -> Result<AppState> {
    decode_state(serde_json::from_str(raw)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockchat_shared::{Message, PhoneTheme, User};
    use serde_json::json;

    pub(crate) fn decorated_state() -> AppState {
        let mut state = AppState::defaults_at(10_000);
        state.users[0].avatar = Some("data:image/png;base64,QUxJQ0U=".into());
        state.users.push(User::new("dora", "Dora", "#abc"));
        state.messages.push(Message::image(
            "m3",
            "bob",
            "data:image/jpeg;base64,UElD",
            9_000,
        ));
        state.messages.push(Message::text("m4", "dora", "  spaced  ", 9_500));
        state.current_user_id = "dora".into();
        state.selected_user_ids = vec!["dora".into(), "bob".into()];
        state.wallpaper = Some("data:image/png;base64,V0FMTA==".into());
        state.group_settings.name = "Book club".into();
        state.group_settings.avatar = Some("data:image/png;base64,R1JPVVA=".into());
        state.phone_theme = PhoneTheme {
            frame_color1: "#000000".into(),
            frame_color2: "#ffffff".into(),
            screen_bg_color: "#123456".into(),
            screen_bg_image: Some("data:image/png;base64,Qkc=".into()),
            frame_gradient_angle: 42.5,
            display_time: None,
        };
        state
    }

    #[test]
    fn encode_then_parse_round_trips() {
        let state = AppState::defaults_at(10_000);
        let raw = encode_state(&state).unwrap();
        assert_eq!(parse_state(&raw).unwrap(), state);
    }

    #[test]
    fn decorated_state_round_trips() {
        let state = decorated_state();
        let raw = encode_state(&state).unwrap();
        assert_eq!(parse_state(&raw).unwrap(), state);
    }

    #[test]
    fn encode_rejects_invalid_users() {
        let mut state = AppState::defaults_at(0);
        state.users.push(User::new("x", "  ", "#fff"));
        assert!(matches!(
            encode_state(&state),
            Err(StoreError::InvalidState(_))
        ));

        let mut state = AppState::defaults_at(0);
        state.users[0].color = "pink".into();
        assert!(encode_state(&state).is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse_state("{not json"),
            Err(StoreError::Serialization(_))
        ));
        assert!(matches!(
            parse_state(r#"{"users": 3}"#),
            Err(StoreError::InvalidState(_))
        ));
    }

    #[test]
    fn structurally_valid_blobs_always_decode() {
        let mut value = serde_json::to_value(AppState::defaults_at(0)).unwrap();
        value["messages"][0]["createdAt"] = json!(1.5);
        value["phoneTheme"]["frameGradientAngle"] = json!("135");
        value["phoneTheme"]["frameColor1"] = json!(null);
        value["groupSettings"]["avatar"] = json!(5);
        assert!(is_valid_app_state(&value));

        let state = decode_state(value).unwrap();
        assert_eq!(state.messages[0].created_at, 1);
        assert_eq!(state.phone_theme, PhoneTheme::default());
        assert_eq!(state.group_settings.avatar, None);
    }
}
