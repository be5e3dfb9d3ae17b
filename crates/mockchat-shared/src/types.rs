//! Domain model of a chat mockup.
//!
//! The wire format is camelCase JSON so a persisted blob stays readable by
//! every generation of the application.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A fictional chat participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque identifier, unique within a state.
    pub id: String,
    /// Display name.
    pub name: String,
    /// `#rgb` or `#rrggbb` color used for the bubble/name tag.
    pub color: String,
    /// Optional avatar image as a data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            avatar: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
}

/// A single bubble in the mocked conversation.
///
/// `user_id` is expected to reference a [`User`], but dangling references are
/// tolerated; renderers filter them out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// Empty only for image messages.
    pub text: String,
    pub user_id: String,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(deserialize_with = "millis")]
    pub created_at: i64,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Data URL of the picture, present only when `kind` is [`MessageKind::Image`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Message {
    pub fn text(
        id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            user_id: user_id.into(),
            created_at,
            kind: MessageKind::Text,
            image: None,
        }
    }

    pub fn image(
        id: impl Into<String>,
        user_id: impl Into<String>,
        image: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
            user_id: user_id.into(),
            created_at,
            kind: MessageKind::Image,
            image: Some(image.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Cosmetic settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupSettings {
    pub name: String,
    #[serde(default, deserialize_with = "string_or_none")]
    pub avatar: Option<String>,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            name: "Gossip Girl".into(),
            avatar: None,
        }
    }
}

/// Look of the phone frame around the conversation.
///
/// Free-form: a missing or mistyped field falls back to the default theme.
/// An explicit `null` clears the optional fields.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhoneTheme {
    pub frame_color1: String,
    pub frame_color2: String,
    pub screen_bg_color: String,
    pub screen_bg_image: Option<String>,
    /// Gradient angle in degrees.
    pub frame_gradient_angle: f64,
    /// Clock label shown in the status bar (`HH:MM`).
    pub display_time: Option<String>,
}

impl Default for PhoneTheme {
    fn default() -> Self {
        Self {
            frame_color1: "#667eea".into(),
            frame_color2: "#764ba2".into(),
            screen_bg_color: "#f0f4f8".into(),
            screen_bg_image: None,
            frame_gradient_angle: 135.0,
            display_time: Some("9:41".into()),
        }
    }
}

impl<'de> Deserialize<'de> for PhoneTheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let mut theme = PhoneTheme::default();

        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
        if let Some(color) = text("frameColor1") {
            theme.frame_color1 = color;
        }
        if let Some(color) = text("frameColor2") {
            theme.frame_color2 = color;
        }
        if let Some(color) = text("screenBgColor") {
            theme.screen_bg_color = color;
        }
        if let Some(angle) = fields.get("frameGradientAngle").and_then(as_degrees) {
            theme.frame_gradient_angle = angle;
        }
        theme.screen_bg_image = text("screenBgImage");
        match fields.get("displayTime") {
            Some(Value::Null) => theme.display_time = None,
            Some(Value::String(label)) => theme.display_time = Some(label.clone()),
            _ => {}
        }
        Ok(theme)
    }
}

/// Numbers, and numbers written as strings (`"135"`).
fn as_degrees(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Partial update merged into a [`PhoneTheme`]; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhoneThemePatch {
    pub frame_color1: Option<String>,
    pub frame_color2: Option<String>,
    pub screen_bg_color: Option<String>,
    pub screen_bg_image: Option<Option<String>>,
    pub frame_gradient_angle: Option<f64>,
    pub display_time: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The single persisted aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub users: Vec<User>,
    pub messages: Vec<Message>,
    pub current_user_id: String,
    pub selected_user_ids: Vec<String>,
    pub wallpaper: Option<String>,
    pub group_settings: GroupSettings,
    pub phone_theme: PhoneTheme,
}

impl AppState {
    /// Compiled-in starting conversation, with message timestamps relative
    /// to `now_ms`.
    pub fn defaults_at(now_ms: i64) -> Self {
        Self {
            users: vec![
                User::new("alice", "Alice", "#ff6b6b"),
                User::new("bob", "Bob", "#4ecdc4"),
                User::new("charlie", "Charlie", "#45b7d1"),
            ],
            messages: vec![
                Message::text("m1", "alice", "Hi! How are you?", now_ms - 120_000),
                Message::text("m2", "bob", "All good, and you?", now_ms - 60_000),
            ],
            current_user_id: "alice".into(),
            selected_user_ids: vec!["alice".into(), "bob".into()],
            wallpaper: None,
            group_settings: GroupSettings::default(),
            phone_theme: PhoneTheme::default(),
        }
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Messages whose author still exists, in creation order.
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(move |m| self.user(&m.user_id).is_some())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::defaults_at(now_millis())
    }
}

/// Any JSON number as whole milliseconds; fractions are truncated.
fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value.as_i64() {
        Some(ms) => Ok(ms),
        None => value
            .as_f64()
            .map(|ms| ms as i64)
            .ok_or_else(|| serde::de::Error::custom("createdAt must be a number")),
    }
}

/// A string, or `None` for `null` and any other type.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Fresh opaque identifier for users and messages.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format_is_camel_case() {
        let state = AppState::defaults_at(1_000_000);
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["currentUserId"], "alice");
        assert_eq!(value["selectedUserIds"], json!(["alice", "bob"]));
        assert_eq!(value["messages"][0]["userId"], "alice");
        assert_eq!(value["messages"][0]["type"], "text");
        assert_eq!(value["phoneTheme"]["frameColor1"], "#667eea");
        assert!(value["wallpaper"].is_null());
    }

    #[test]
    fn partial_phone_theme_decodes_with_defaults() {
        let theme: PhoneTheme =
            serde_json::from_value(json!({ "frameColor1": "#000000" })).unwrap();
        assert_eq!(theme.frame_color1, "#000000");
        assert_eq!(theme.frame_color2, PhoneTheme::default().frame_color2);
    }

    #[test]
    fn mistyped_theme_fields_fall_back_per_field() {
        let theme: PhoneTheme = serde_json::from_value(json!({
            "frameColor1": null,
            "frameColor2": "#111111",
            "screenBgColor": 7,
            "screenBgImage": false,
            "frameGradientAngle": "90",
            "displayTime": ["9:41"]
        }))
        .unwrap();

        let defaults = PhoneTheme::default();
        assert_eq!(theme.frame_color1, defaults.frame_color1);
        assert_eq!(theme.frame_color2, "#111111");
        assert_eq!(theme.screen_bg_color, defaults.screen_bg_color);
        assert_eq!(theme.screen_bg_image, None);
        assert_eq!(theme.frame_gradient_angle, 90.0);
        assert_eq!(theme.display_time, defaults.display_time);
    }

    #[test]
    fn cleared_display_time_survives_a_round_trip() {
        let theme = PhoneTheme {
            display_time: None,
            ..PhoneTheme::default()
        };
        let value = serde_json::to_value(&theme).unwrap();
        assert!(value["displayTime"].is_null());
        assert_eq!(serde_json::from_value::<PhoneTheme>(value).unwrap(), theme);
    }

    #[test]
    fn group_avatar_of_wrong_type_decodes_as_none() {
        let group: GroupSettings =
            serde_json::from_value(json!({ "name": "Club", "avatar": 5 })).unwrap();
        assert_eq!(group.avatar, None);
    }

    #[test]
    fn fractional_created_at_is_truncated() {
        let msg: Message = serde_json::from_value(json!({
            "id": "m1",
            "text": "hello",
            "userId": "alice",
            "createdAt": 1500.75
        }))
        .unwrap();
        assert_eq!(msg.created_at, 1500);
    }

    #[test]
    fn message_kind_defaults_to_text() {
        let msg: Message = serde_json::from_value(json!({
            "id": "m1",
            "text": "hello",
            "userId": "alice",
            "createdAt": 5
        }))
        .unwrap();
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.image, None);
    }

    #[test]
    fn visible_messages_skip_dangling_authors() {
        let mut state = AppState::defaults_at(0);
        state.messages.push(Message::text("m3", "ghost", "boo", 1));
        let ids: Vec<_> = state.visible_messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }
}
