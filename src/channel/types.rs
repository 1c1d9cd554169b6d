use crate::utils;

/// Channel kind, derived from the name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Public,
    Private,
    Presence,
}

impl ChannelType {
    pub fn from_name(name: &str) -> Self {
        if utils::is_presence_channel(name) {
            ChannelType::Presence
        } else if utils::is_private_channel(name) {
            ChannelType::Private
        } else {
            ChannelType::Public
        }
    }

    pub fn requires_authentication(&self) -> bool {
        matches!(self, ChannelType::Private | ChannelType::Presence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_name_prefix() {
        assert_eq!(ChannelType::from_name("chat"), ChannelType::Public);
        assert_eq!(ChannelType::from_name("private-room"), ChannelType::Private);
        assert_eq!(ChannelType::from_name("presence-lobby"), ChannelType::Presence);
        // Prefixes only count at the start of the name.
        assert_eq!(ChannelType::from_name("not-presence-x"), ChannelType::Public);
    }

    #[test]
    fn authentication_requirement() {
        assert!(!ChannelType::Public.requires_authentication());
        assert!(ChannelType::Private.requires_authentication());
        assert!(ChannelType::Presence.requires_authentication());
    }
}
