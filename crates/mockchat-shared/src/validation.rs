//! Structural validation of persisted state.
//!
//! Every predicate is total: it inspects an arbitrary JSON value and answers
//! `true`/`false` without panicking. Validation is structural, so unknown
//! extra fields are ignored.

use serde_json::Value;

/// A string with at least one non-whitespace character.
pub fn is_non_empty_string(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}

/// Identifiers only need to be non-empty strings.
pub fn is_valid_id(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.is_empty())
}

/// `#rgb` or `#rrggbb`, case-insensitive.
pub fn is_valid_hex_color(color: &str) -> bool {
    let Some(digits) = color.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Absent, `null`, or a string.
fn is_optional_string(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null) | Some(Value::String(_)))
}

fn field<'a>(value: &'a Value, name: &str) -> &'a Value {
    value.get(name).unwrap_or(&Value::Null)
}

pub fn is_valid_user(value: &Value) -> bool {
    if !value.is_object() {
        return false;
    }
    is_valid_id(field(value, "id"))
        && is_non_empty_string(field(value, "name"))
        && field(value, "color").as_str().is_some_and(is_valid_hex_color)
        && is_optional_string(value.get("avatar"))
}

pub fn is_valid_users(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|users| users.iter().all(is_valid_user))
}

pub fn is_valid_message(value: &Value) -> bool {
    if !value.is_object() {
        return false;
    }
    let kind_ok = match value.get("type") {
        None => true,
        Some(Value::String(kind)) => kind == "text" || kind == "image",
        Some(_) => false,
    };
    is_valid_id(field(value, "id"))
        && field(value, "text").is_string()
        && is_valid_id(field(value, "userId"))
        && field(value, "createdAt").is_number()
        && kind_ok
        && is_optional_string(value.get("image"))
}

pub fn is_valid_messages(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|messages| messages.iter().all(is_valid_message))
}

/// Whether `value` is a well-formed persisted application state.
///
/// `phoneTheme` is only required to be an object; its fields are cosmetic and
/// decode with defaults.
pub fn is_valid_app_state(value: &Value) -> bool {
    if !value.is_object() {
        return false;
    }

    let selected_ok = field(value, "selectedUserIds")
        .as_array()
        .is_some_and(|ids| ids.iter().all(is_valid_id));

    let wallpaper_ok = matches!(
        value.get("wallpaper"),
        Some(Value::Null) | Some(Value::String(_))
    );

    let group = field(value, "groupSettings");
    let group_ok = group.is_object() && field(group, "name").is_string();

    is_valid_users(field(value, "users"))
        && is_valid_messages(field(value, "messages"))
        && is_valid_id(field(value, "currentUserId"))
        && selected_ok
        && wallpaper_ok
        && group_ok
        && field(value, "phoneTheme").is_object()
}
