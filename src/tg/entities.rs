use std::fmt;

use serde::{Deserialize, Serialize};

/// Bare reference to a user, basic group or channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "_")]
pub enum Peer {
    #[serde(rename = "PeerUser")]
    User { user_id: i64 },
    #[serde(rename = "PeerChat")]
    Chat { chat_id: i64 },
    #[serde(rename = "PeerChannel")]
    Channel { channel_id: i64 },
}

impl Peer {
    pub fn id(&self) -> i64 {
        match self {
            Peer::User { user_id } => *user_id,
            Peer::Chat { chat_id } => *chat_id,
            Peer::Channel { channel_id } => *channel_id,
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::User { user_id } => write!(f, "PeerUser({})", user_id),
            Peer::Chat { chat_id } => write!(f, "PeerChat({})", chat_id),
            Peer::Channel { channel_id } => write!(f, "PeerChannel({})", channel_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Username {
    pub username: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub access_hash: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub usernames: Vec<Username>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub participants_count: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub access_hash: Option<i64>,
    pub title: String,
    pub username: Option<String>,
    #[serde(default)]
    pub usernames: Vec<Username>,
    #[serde(default)]
    pub broadcast: bool,
    #[serde(default)]
    pub megagroup: bool,
}

/// A resolved remote user, group or channel.
///
/// Serializes with a `_` discriminator holding the class name, the same shape
/// the metadata sidecars and chat exports embed under `peer_id._entity`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_")]
pub enum Entity {
    User(User),
    UserEmpty { id: i64 },
    Chat(Chat),
    ChatEmpty { id: i64 },
    ChatForbidden { id: i64, title: String },
    Channel(Channel),
    ChannelForbidden {
        id: i64,
        access_hash: i64,
        title: String,
    },
}

impl Entity {
    pub fn id(&self) -> i64 {
        match self {
            Entity::User(user) => user.id,
            Entity::UserEmpty { id } => *id,
            Entity::Chat(chat) => chat.id,
            Entity::ChatEmpty { id } => *id,
            Entity::ChatForbidden { id, .. } => *id,
            Entity::Channel(channel) => channel.id,
            Entity::ChannelForbidden { id, .. } => *id,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            Entity::User(_) => "User",
            Entity::UserEmpty { .. } => "UserEmpty",
            Entity::Chat(_) => "Chat",
            Entity::ChatEmpty { .. } => "ChatEmpty",
            Entity::ChatForbidden { .. } => "ChatForbidden",
            Entity::Channel(_) => "Channel",
            Entity::ChannelForbidden { .. } => "ChannelForbidden",
        }
    }

    pub fn peer(&self) -> Peer {
        match self {
            Entity::User(_) | Entity::UserEmpty { .. } => Peer::User { user_id: self.id() },
            Entity::Chat(_) | Entity::ChatEmpty { .. } | Entity::ChatForbidden { .. } => {
                Peer::Chat { chat_id: self.id() }
            }
            Entity::Channel(_) | Entity::ChannelForbidden { .. } => Peer::Channel {
                channel_id: self.id(),
            },
        }
    }
}

/// What a caller hands in to be resolved: a numeric id, a username or
/// `t.me` link, or an explicit peer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Id(i64),
    Username(String),
    Peer(Peer),
}

impl EntityRef {
    /// Key used by [`EntityCache`](crate::tg::cache::EntityCache).
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Id(id) => write!(f, "{}", id),
            EntityRef::Username(name) => f.write_str(name),
            EntityRef::Peer(peer) => write!(f, "{}", peer),
        }
    }
}

impl From<i64> for EntityRef {
    fn from(id: i64) -> Self {
        EntityRef::Id(id)
    }
}

impl From<&str> for EntityRef {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = value.parse() {
                return EntityRef::Id(id);
            }
        }
        EntityRef::Username(value.to_string())
    }
}

impl From<String> for EntityRef {
    fn from(value: String) -> Self {
        EntityRef::from(value.as_str())
    }
}

impl From<Peer> for EntityRef {
    fn from(peer: Peer) -> Self {
        EntityRef::Peer(peer)
    }
}

impl From<&Entity> for EntityRef {
    fn from(entity: &Entity) -> Self {
        EntityRef::Peer(entity.peer())
    }
}

impl From<&EntityRef> for EntityRef {
    fn from(value: &EntityRef) -> Self {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_strings_become_ids() {
        assert_eq!(EntityRef::from("12345"), EntityRef::Id(12345));
        assert_eq!(EntityRef::from(" 42 "), EntityRef::Id(42));
        assert_eq!(
            EntityRef::from("durov"),
            EntityRef::Username("durov".to_string())
        );
        assert_eq!(
            EntityRef::from("-100"),
            EntityRef::Username("-100".to_string())
        );
    }

    #[test]
    fn cache_keys_match_the_input_form() {
        assert_eq!(EntityRef::Id(7).cache_key(), "7");
        assert_eq!(EntityRef::from("t.me/durov").cache_key(), "t.me/durov");
        assert_eq!(
            EntityRef::Peer(Peer::Channel { channel_id: 9 }).cache_key(),
            "PeerChannel(9)"
        );
    }

    #[test]
    fn entity_serializes_with_class_tag() {
        let entity = Entity::ChatForbidden {
            id: 3,
            title: "gone".to_string(),
        };
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["_"], "ChatForbidden");
        assert_eq!(value["id"], 3);
        assert_eq!(entity.peer(), Peer::Chat { chat_id: 3 });
    }
}
