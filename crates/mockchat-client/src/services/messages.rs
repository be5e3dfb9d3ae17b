use mockchat_shared::Message;

use super::{rejected, ServiceError};
use crate::coordinator::StateCoordinator;

pub fn create_text_message(
    coordinator: &StateCoordinator,
    text: &str,
    user_id: &str,
) -> Result<Message, ServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(rejected("createTextMessage", ServiceError::EmptyText));
    }
    if user_id.is_empty() {
        return Err(rejected("createTextMessage", ServiceError::MissingUser));
    }
    Ok(coordinator.add_message(text, user_id))
}

pub fn update_message(
    coordinator: &StateCoordinator,
    message_id: &str,
    text: &str,
) -> Result<(), ServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(rejected("updateMessage", ServiceError::EmptyText));
    }
    coordinator.edit_message(message_id, text);
    Ok(())
}

pub fn delete_message(coordinator: &StateCoordinator, message_id: &str) {
    coordinator.remove_message(message_id);
}

/// Post a picture. `image_data_url` is expected to be a `data:` URL.
pub fn create_image_message(
    coordinator: &StateCoordinator,
    user_id: &str,
    image_data_url: &str,
) -> Result<Message, ServiceError> {
    if user_id.is_empty() {
        return Err(rejected("createImageMessage", ServiceError::MissingUser));
    }
    if image_data_url.trim().is_empty() {
        return Err(rejected("createImageMessage", ServiceError::InvalidImage));
    }
    Ok(coordinator.add_image_message(user_id, image_data_url))
}
