//! Learner profile and delivery preferences.

use serde::{Deserialize, Serialize};
use crate::id::UserId;
use crate::notification::Channel;

/// Contact details and preferences of a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Learner id
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Email destination
    pub email: Option<String>,
    /// SMS destination
    pub phone: Option<String>,
    /// Preferences
    #[serde(default)]
    pub preferences: NotificationPreferences,
}

/// Per-channel opt-ins plus study pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Email opt-in
    pub email: bool,
    /// SMS opt-in
    pub sms: bool,
    /// Push opt-in
    pub push: bool,
    /// Used to project completion dates
    pub study_hours_per_week: u32,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
            push: true,
            study_hours_per_week: 10,
        }
    }
}

impl NotificationPreferences {
    /// Whether the learner opted into `channel`.
    pub fn allows(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email,
            Channel::Sms => self.sms,
            Channel::Push => self.push,
        }
    }
}

impl UserProfile {
    /// Profile with default preferences.
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            email: None,
            phone: None,
            preferences: NotificationPreferences::default(),
        }
    }

    /// Preferences narrowed to channels that have a destination.
    pub fn effective_preferences(&self) -> NotificationPreferences {
        NotificationPreferences {
            email: self.preferences.email && self.email.is_some(),
            sms: self.preferences.sms && self.phone.is_some(),
            ..self.preferences.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sms_needs_a_phone_number() {
        let mut profile = UserProfile::new(UserId::from("u1"), "Aisha");
        profile.preferences.sms = true;
        profile.email = Some("aisha@example.com".into());

        let prefs = profile.effective_preferences();
        assert!(!prefs.allows(Channel::Sms));
        assert!(prefs.allows(Channel::Email));

        profile.phone = Some("+15550100".into());
        assert!(profile.effective_preferences().allows(Channel::Sms));
    }
}
