use mockchat_shared::validation::is_valid_hex_color;
use mockchat_shared::User;

use super::{rejected, ServiceError};
use crate::coordinator::StateCoordinator;

pub fn create_character(
    coordinator: &StateCoordinator,
    name: &str,
    color: &str,
) -> Result<User, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(rejected("createCharacter", ServiceError::EmptyName));
    }
    if !is_valid_hex_color(color) {
        return Err(rejected(
            "createCharacter",
            ServiceError::InvalidColor(color.to_string()),
        ));
    }
    Ok(coordinator.add_user(name, color))
}

pub fn update_character_name(
    coordinator: &StateCoordinator,
    user_id: &str,
    name: &str,
) -> Result<(), ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(rejected("updateCharacterName", ServiceError::EmptyName));
    }
    coordinator.update_user_name(user_id, name);
    Ok(())
}

pub fn update_character_color(
    coordinator: &StateCoordinator,
    user_id: &str,
    color: &str,
) -> Result<(), ServiceError> {
    if !is_valid_hex_color(color) {
        return Err(rejected(
            "updateCharacterColor",
            ServiceError::InvalidColor(color.to_string()),
        ));
    }
    coordinator.set_user_color(user_id, color);
    Ok(())
}

pub fn update_character_avatar(
    coordinator: &StateCoordinator,
    user_id: &str,
    avatar: Option<&str>,
) {
    coordinator.set_user_avatar(user_id, avatar);
}

pub fn delete_character(coordinator: &StateCoordinator, user_id: &str) {
    coordinator.remove_user(user_id);
}
