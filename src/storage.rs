use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::warn;

use crate::models::RoomState;

const ROOM_STATE_SLOT: &str = "roomState";

pub fn init_db(path: &Path) -> anyhow::Result<Connection> {
  let conn = Connection::open(path)?;
  migrate(&conn)?;
  Ok(conn)
}

fn migrate(conn: &Connection) -> anyhow::Result<()> {
  conn.execute_batch(
    "
    CREATE TABLE IF NOT EXISTS room_state (
      slot TEXT PRIMARY KEY,
      updated_at TEXT NOT NULL,
      state_json TEXT NOT NULL
    );
    ",
  )?;
  Ok(())
}

/// Replaces the cached room state wholesale.
pub async fn save_room_state(db: &Mutex<Connection>, state: &RoomState) -> anyhow::Result<()> {
  let state_json = serde_json::to_string(state)?;
  let updated_at = Utc::now().to_rfc3339();
  let conn = db.lock().await;
  conn.execute(
    "INSERT OR REPLACE INTO room_state (slot, updated_at, state_json) VALUES (?1, ?2, ?3)",
    params![ROOM_STATE_SLOT, updated_at, state_json],
  )?;
  Ok(())
}

pub async fn load_room_state(db: &Mutex<Connection>) -> anyhow::Result<Option<RoomState>> {
  let conn = db.lock().await;
  let stored: Option<String> = conn
    .query_row(
      "SELECT state_json FROM room_state WHERE slot = ?1",
      params![ROOM_STATE_SLOT],
      |row| row.get(0),
    )
    .optional()?;

  Ok(stored.and_then(|json| match serde_json::from_str(&json) {
    Ok(state) => Some(state),
    Err(err) => {
      warn!("ignoring unreadable cached room state: {err}");
      None
    }
  }))
}

#[cfg(test)]
pub fn in_memory() -> Mutex<Connection> {
  let conn = Connection::open_in_memory().unwrap();
  migrate(&conn).unwrap();
  Mutex::new(conn)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::normalize::{room_state_from_value, NormalizeContext};

  fn state(theme: &str) -> RoomState {
    let ctx = NormalizeContext {
      created_at_ms: 42,
      room_size_feet: 10.0,
      spawn_position: [0.0; 3],
    };
    room_state_from_value(&serde_json::json!({ "theme": theme, "existingItems": [{ "name": "Sofa" }] }), &ctx)
  }

  #[tokio::test]
  async fn empty_slot_reads_none() {
    let db = in_memory();
    assert!(load_room_state(&db).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn later_write_replaces_earlier_one() {
    let db = in_memory();
    save_room_state(&db, &state("industrial")).await.unwrap();
    save_room_state(&db, &state("bohemian")).await.unwrap();

    let loaded = load_room_state(&db).await.unwrap().unwrap();
    assert_eq!(loaded.theme, "bohemian");
    assert_eq!(loaded.existing_items.len(), 1);

    let rows: i64 = db
      .lock()
      .await
      .query_row("SELECT COUNT(*) FROM room_state", [], |row| row.get(0))
      .unwrap();
    assert_eq!(rows, 1);
  }

  #[tokio::test]
  async fn corrupt_blob_reads_none() {
    let db = in_memory();
    db.lock()
      .await
      .execute(
        "INSERT INTO room_state (slot, updated_at, state_json) VALUES (?1, 'now', '{broken')",
        params![ROOM_STATE_SLOT],
      )
      .unwrap();
    assert!(load_room_state(&db).await.unwrap().is_none());
  }
}
