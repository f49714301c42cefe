//! Static catalogue of the chat rooms advertised to clients.

use serde::Serialize;

/// A chat room listed by the catalogue endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRoomInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const CHAT_ROOMS: [ChatRoomInfo; 6] = [
    ChatRoomInfo {
        id: "general",
        name: "General Discussion",
        description: "Open chat for all users",
    },
    ChatRoomInfo {
        id: "crops",
        name: "Crop Management",
        description: "Discuss farming techniques",
    },
    ChatRoomInfo {
        id: "market",
        name: "Market Prices",
        description: "Share market information",
    },
    ChatRoomInfo {
        id: "weather",
        name: "Weather Updates",
        description: "Weather-related discussions",
    },
    ChatRoomInfo {
        id: "expert-qa",
        name: "Expert Q&A",
        description: "Direct questions to experts",
    },
    ChatRoomInfo {
        id: "equipment",
        name: "Equipment Help",
        description: "Machinery and tools discussion",
    },
];

pub fn default_chat_rooms() -> &'static [ChatRoomInfo] {
    &CHAT_ROOMS
}

/// Look up a catalogue entry by room id.
pub fn find_chat_room(id: &str) -> Option<&'static ChatRoomInfo> {
    CHAT_ROOMS.iter().find(|room| room.id == id)
}
