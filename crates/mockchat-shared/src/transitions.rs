//! Pure state transitions.
//!
//! Each function borrows the current snapshot and returns a brand-new
//! [`AppState`]; callers swap the result in wholesale. Arguments are assumed
//! to be validated already.

use crate::types::{AppState, Message, PhoneThemePatch, User};

impl AppState {
    pub fn with_message(&self, message: Message) -> Self {
        let mut next = self.clone();
        next.messages.push(message);
        next
    }

    pub fn with_message_text(&self, message_id: &str, text: &str) -> Self {
        let mut next = self.clone();
        for message in next.messages.iter_mut().filter(|m| m.id == message_id) {
            message.text = text.to_string();
        }
        next
    }

    pub fn without_message(&self, message_id: &str) -> Self {
        let mut next = self.clone();
        next.messages.retain(|m| m.id != message_id);
        next
    }

    pub fn with_user(&self, user: User) -> Self {
        let mut next = self.clone();
        next.users.push(user);
        next
    }

    fn map_user(&self, user_id: &str, f: impl Fn(&mut User)) -> Self {
        let mut next = self.clone();
        for user in next.users.iter_mut().filter(|u| u.id == user_id) {
            f(user);
        }
        next
    }

    pub fn with_user_name(&self, user_id: &str, name: &str) -> Self {
        self.map_user(user_id, |u| u.name = name.to_string())
    }

    pub fn with_user_color(&self, user_id: &str, color: &str) -> Self {
        self.map_user(user_id, |u| u.color = color.to_string())
    }

    pub fn with_user_avatar(&self, user_id: &str, avatar: Option<&str>) -> Self {
        self.map_user(user_id, |u| u.avatar = avatar.map(str::to_string))
    }

    /// Removes a user together with everything that points at it.
    ///
    /// Messages authored by the user and its selection entry go away. If it
    /// was the current user, the first remaining user takes over; with no
    /// users left the current id is left dangling.
    pub fn without_user(&self, user_id: &str) -> Self {
        let users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.id != user_id)
            .cloned()
            .collect();

        let current_user_id = match users.first() {
            Some(first) if self.current_user_id == user_id => first.id.clone(),
            _ => self.current_user_id.clone(),
        };

        Self {
            messages: self
                .messages
                .iter()
                .filter(|m| m.user_id != user_id)
                .cloned()
                .collect(),
            selected_user_ids: self
                .selected_user_ids
                .iter()
                .filter(|id| id.as_str() != user_id)
                .cloned()
                .collect(),
            users,
            current_user_id,
            ..self.clone()
        }
    }

    pub fn with_wallpaper(&self, wallpaper: Option<&str>) -> Self {
        Self {
            wallpaper: wallpaper.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_group_name(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.group_settings.name = name.to_string();
        next
    }

    pub fn with_group_avatar(&self, avatar: Option<&str>) -> Self {
        let mut next = self.clone();
        next.group_settings.avatar = avatar.map(str::to_string);
        next
    }

    pub fn with_phone_theme(&self, patch: &PhoneThemePatch) -> Self {
        let mut next = self.clone();
        let theme = &mut next.phone_theme;
        if let Some(c) = &patch.frame_color1 {
            theme.frame_color1 = c.clone();
        }
        if let Some(c) = &patch.frame_color2 {
            theme.frame_color2 = c.clone();
        }
        if let Some(c) = &patch.screen_bg_color {
            theme.screen_bg_color = c.clone();
        }
        if let Some(image) = &patch.screen_bg_image {
            theme.screen_bg_image = image.clone();
        }
        if let Some(angle) = patch.frame_gradient_angle {
            theme.frame_gradient_angle = angle;
        }
        if let Some(time) = &patch.display_time {
            theme.display_time = time.clone();
        }
        next
    }

    pub fn with_current_user(&self, user_id: &str) -> Self {
        Self {
            current_user_id: user_id.to_string(),
            ..self.clone()
        }
    }

    pub fn with_selected_users(&self, ids: &[String]) -> Self {
        Self {
            selected_user_ids: ids.to_vec(),
            ..self.clone()
        }
    }
}
