//! Inbound message classification
//!
//! Pure rules that sort a decoded frame into a feed category and derive the
//! session-state update it implies. The connection layer applies the update;
//! nothing here touches a socket.

use serde_json::Value;

use super::protocol::{InboundMessage, MessageCategory, RoomSnapshot};

/// Result of classifying one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Feed category for the display message
    pub category: MessageCategory,
    /// Session-state change implied by the frame, if any
    pub update: Option<RoomUpdate>,
}

impl Classification {
    fn new(category: MessageCategory) -> Self {
        Self {
            category,
            update: None,
        }
    }

    fn with_update(mut self, update: RoomUpdate) -> Self {
        self.update = Some(update);
        self
    }

    fn maybe_with(self, update: Option<RoomUpdate>) -> Self {
        match update {
            Some(update) => self.with_update(update),
            None => self,
        }
    }
}

/// A change to the current room snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum RoomUpdate {
    /// Replace the snapshot wholesale (room create/join response)
    Replace(RoomSnapshot),
    /// Merge player counts from a membership broadcast, leaving every other
    /// field untouched
    MergeCounts {
        room_id: String,
        current_players: Option<u32>,
        max_players: Option<u32>,
    },
    /// Clear the snapshot (room leave response)
    Clear,
}

impl RoomUpdate {
    /// Apply this update to the snapshot slot
    pub fn apply(self, slot: &mut Option<RoomSnapshot>) {
        match self {
            RoomUpdate::Replace(snapshot) => *slot = Some(snapshot),
            RoomUpdate::Clear => *slot = None,
            RoomUpdate::MergeCounts {
                room_id,
                current_players,
                max_players,
            } => match slot {
                Some(snapshot) => {
                    if current_players.is_some() {
                        snapshot.current_players = current_players;
                    }
                    if max_players.is_some() {
                        snapshot.max_players = max_players;
                    }
                }
                None => {
                    *slot = Some(RoomSnapshot {
                        id: Some(room_id),
                        current_players,
                        max_players,
                        is_active: Some(true),
                        ..RoomSnapshot::default()
                    });
                }
            },
        }
    }
}

/// Classify one inbound frame
///
/// Rules apply in precedence order, first match wins:
/// 1. `type == "error"` is an error, regardless of event.
/// 2. Membership events (`user_joined` / `user_left`) are broadcasts and
///    merge player counts when they name a room.
/// 3. Any other event containing `broadcast` is a broadcast.
/// 4. Everything else is received; room lifecycle responses update the
///    snapshot on success.
///
/// Raw (undecodable) frames fall through to `Received` with no update.
pub fn classify(message: &InboundMessage) -> Classification {
    if message.kind() == Some("error") {
        return Classification::new(MessageCategory::Error);
    }

    match message.event() {
        Some("user_joined") | Some("user_left") => {
            let mut classification = Classification::new(MessageCategory::Broadcast);
            if let Some(update) = membership_update(message.data()) {
                classification = classification.with_update(update);
            }
            classification
        }
        Some(event) if event.contains("broadcast") => {
            Classification::new(MessageCategory::Broadcast)
        }
        _ => Classification::new(MessageCategory::Received)
            .maybe_with(response_update(message)),
    }
}

/// Player-count merge implied by a membership broadcast
fn membership_update(data: Option<&Value>) -> Option<RoomUpdate> {
    let data = data?;
    let room_id = data.get("room_id")?.as_str()?;

    Some(RoomUpdate::MergeCounts {
        room_id: room_id.to_string(),
        current_players: read_count(data, "current_players"),
        max_players: read_count(data, "max_players"),
    })
}

/// Snapshot change implied by a room lifecycle response
fn response_update(message: &InboundMessage) -> Option<RoomUpdate> {
    if message.kind() != Some("success") {
        return None;
    }

    match message.event()? {
        "create_room_response" => {
            let data = message.data()?;
            data.get("id")?;
            RoomSnapshot::from_payload(data).map(RoomUpdate::Replace)
        }
        "join_room_response" => {
            let data = message.data()?;
            RoomSnapshot::from_payload(data).map(RoomUpdate::Replace)
        }
        "leave_room_response" => Some(RoomUpdate::Clear),
        _ => None,
    }
}

fn read_count(data: &Value, key: &str) -> Option<u32> {
    data.get(key)?.as_u64().map(|n| n as u32)
}
