use axum::Json;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct NewRoomResponse {
    #[serde(rename = "roomId")]
    pub room_id: Uuid,
}

/// A fresh random room id. The registry is not consulted: rooms come into
/// being when the first connection joins, not here.
pub async fn new_room() -> Json<NewRoomResponse> {
    Json(NewRoomResponse {
        room_id: Uuid::new_v4(),
    })
}
