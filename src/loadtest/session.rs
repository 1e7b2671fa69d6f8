//! Per-virtual-user session state threaded through the journey steps.

use serde_json::Value;

/// State one virtual user carries from step to step.
///
/// Every slot starts empty and is filled by the step that owns it. A
/// context belongs to exactly one VU and lives for the whole run, across
/// journey cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Bearer credential from the last successful login.
    pub token: Option<String>,
    /// User id from the last successful login.
    pub user_id: Option<String>,
    /// Client-generated key scoping the current match.
    pub match_key: Option<String>,
    /// Server-issued match id from the last successful join.
    pub match_id: Option<String>,
    /// Acting player's id from the last successful join.
    pub player_id: Option<String>,
}

impl SessionContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh 32-character hex match key, stores it, and returns it.
    pub fn rotate_match_key(&mut self) -> String {
        let key = uuid::Uuid::new_v4().simple().to_string();
        self.match_key = Some(key.clone());
        key
    }

    /// Returns `(match_id, player_id)` when both are known.
    pub fn match_slot(&self) -> Option<(&str, &str)> {
        match (self.match_id.as_deref(), self.player_id.as_deref()) {
            (Some(match_id), Some(player_id)) => Some((match_id, player_id)),
            _ => None,
        }
    }

    /// Stores the login result found in a response `data` object.
    ///
    /// Fields missing from the response clear the corresponding slot.
    pub fn apply_login(&mut self, data: &Value) {
        self.token = id_at(data, "/tokens/accessToken");
        self.user_id = id_at(data, "/user/id");
    }

    /// Stores the join result found in a response `data` object.
    ///
    /// An empty `players` array leaves the previous player id in place.
    pub fn apply_join(&mut self, data: &Value) {
        self.match_id = id_at(data, "/matchId");
        let first_player = data
            .get("players")
            .and_then(Value::as_array)
            .and_then(|players| players.first());
        if let Some(player) = first_player {
            self.player_id = id_at(player, "/playerId");
        }
    }
}

/// Reads an identifier at a JSON pointer. Strings are taken as-is, numbers
/// keep their JSON text, anything else counts as absent.
fn id_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
