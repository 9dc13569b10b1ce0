use framelink_protocol::{Role, ServerMessage};
use std::collections::HashMap;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Sending half of an open WebSocket. The socket task owns the receive
/// loop and the connection lifetime; the registry only holds handles.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn new(id: Uuid, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Serialize and enqueue for the socket's writer task. Delivery is
    /// best-effort: a message for a closed peer is dropped without error.
    pub fn send(&self, message: &ServerMessage) {
        let json = match serde_json::to_string(message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                return;
            }
        };

        if self.tx.send(json).is_err() {
            tracing::debug!(connection_id = %self.id, "dropping message for closed connection");
        }
    }
}

/// Per-role slots of one room. Each slot holds the single live handle
/// bound to that role, or nothing.
#[derive(Debug, Default)]
struct Room {
    viewer: Option<ConnectionHandle>,
    phone: Option<ConnectionHandle>,
    infer: Option<ConnectionHandle>,
}

impl Room {
    fn slot(&self, role: Role) -> &Option<ConnectionHandle> {
        match role {
            Role::Viewer => &self.viewer,
            Role::Phone => &self.phone,
            Role::Infer => &self.infer,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionHandle> {
        match role {
            Role::Viewer => &mut self.viewer,
            Role::Phone => &mut self.phone,
            Role::Infer => &mut self.infer,
        }
    }

    fn media_peers(&self) -> RoomPeers {
        RoomPeers {
            phone: self.phone.clone(),
            viewer: self.viewer.clone(),
        }
    }
}

/// Snapshot of a room's two media slots, taken under the registry lock.
#[derive(Debug, Clone, Default)]
pub struct RoomPeers {
    pub phone: Option<ConnectionHandle>,
    pub viewer: Option<ConnectionHandle>,
}

/// Maps room ids to role-bound connections. Rooms are created lazily on
/// first reference and live for the process lifetime.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Bind `handle` into the room's role slot, creating the room if
    /// needed. A previous occupant is replaced without notice. Returns the
    /// media peers as they stand immediately after this bind, so join
    /// notifications observe occupancy at the bind instant.
    pub async fn bind(&self, room_id: &str, role: Role, handle: ConnectionHandle) -> RoomPeers {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_string()).or_default();
        *room.slot_mut(role) = Some(handle);
        room.media_peers()
    }

    /// Clear the slot only if it still holds `connection_id`. A newer
    /// connection that reused the role in the meantime is left untouched.
    pub async fn unbind(&self, room_id: &str, role: Role, connection_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(room_id) {
            let slot = room.slot_mut(role);
            if slot.as_ref().is_some_and(|h| h.id() == connection_id) {
                *slot = None;
                tracing::debug!(room = room_id, %role, %connection_id, "slot released");
            }
        }
    }

    pub async fn peer(&self, room_id: &str, role: Role) -> Option<ConnectionHandle> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .and_then(|room| room.slot(role).clone())
    }

    /// Phone and viewer handles of a room, for result fan-out.
    pub async fn peers(&self, room_id: &str) -> RoomPeers {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map(Room::media_peers)
            .unwrap_or_default()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (ConnectionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(Uuid::new_v4(), tx), rx)
    }

    #[tokio::test]
    async fn bind_reports_occupancy_at_bind_instant() {
        let registry = RoomRegistry::new();
        let (phone, _rx1) = handle();
        let (viewer, _rx2) = handle();

        let peers = registry.bind("r1", Role::Phone, phone.clone()).await;
        assert!(peers.viewer.is_none());
        assert_eq!(peers.phone.as_ref().unwrap().id(), phone.id());

        let peers = registry.bind("r1", Role::Viewer, viewer.clone()).await;
        assert_eq!(peers.phone.as_ref().unwrap().id(), phone.id());
        assert_eq!(peers.viewer.as_ref().unwrap().id(), viewer.id());
    }

    #[tokio::test]
    async fn rebind_replaces_the_slot() {
        let registry = RoomRegistry::new();
        let (first, _rx1) = handle();
        let (second, _rx2) = handle();

        registry.bind("r1", Role::Phone, first).await;
        registry.bind("r1", Role::Phone, second.clone()).await;

        let stored = registry.peer("r1", Role::Phone).await.unwrap();
        assert_eq!(stored.id(), second.id());
    }

    #[tokio::test]
    async fn unbind_ignores_stale_connection() {
        let registry = RoomRegistry::new();
        let (old, _rx1) = handle();
        let (new, _rx2) = handle();

        registry.bind("r1", Role::Phone, old.clone()).await;
        registry.bind("r1", Role::Phone, new.clone()).await;

        // The replaced connection closes late; the live slot must survive.
        registry.unbind("r1", Role::Phone, old.id()).await;
        assert_eq!(registry.peer("r1", Role::Phone).await.unwrap().id(), new.id());

        registry.unbind("r1", Role::Phone, new.id()).await;
        assert!(registry.peer("r1", Role::Phone).await.is_none());
    }

    #[tokio::test]
    async fn absent_room_has_no_peers() {
        let registry = RoomRegistry::new();
        assert!(registry.peer("nope", Role::Viewer).await.is_none());
        let peers = registry.peers("nope").await;
        assert!(peers.phone.is_none() && peers.viewer.is_none());
    }

    #[tokio::test]
    async fn roles_occupy_independent_slots() {
        let registry = RoomRegistry::new();
        let (viewer, _rx1) = handle();
        let (phone, _rx2) = handle();
        let (infer, _rx3) = handle();

        registry.bind("r1", Role::Viewer, viewer.clone()).await;
        registry.bind("r1", Role::Phone, phone.clone()).await;
        registry.bind("r1", Role::Infer, infer.clone()).await;

        assert_eq!(registry.peer("r1", Role::Viewer).await.unwrap().id(), viewer.id());
        assert_eq!(registry.peer("r1", Role::Phone).await.unwrap().id(), phone.id());
        assert_eq!(registry.peer("r1", Role::Infer).await.unwrap().id(), infer.id());
    }
}
