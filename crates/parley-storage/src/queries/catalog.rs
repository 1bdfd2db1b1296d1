// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exercise packs, their recorded exercises, and purchases.

use std::str::FromStr;

use parley_core::{MediaKind, ParleyError, UserId};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{Exercise, Pack, PackOffer, Purchase, RecordedPart};

fn row_to_pack(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pack> {
    Ok(Pack {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
    })
}

fn row_to_exercise(row: &rusqlite::Row<'_>) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: row.get(0)?,
        pack_id: row.get(1)?,
        name: row.get(2)?,
    })
}

fn row_to_part(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordedPart> {
    let kind: Option<String> = row.get(0)?;
    let file_id: Option<String> = row.get(1)?;
    let media = match (kind, file_id) {
        (Some(kind), Some(file_id)) => {
            let kind = MediaKind::from_str(&kind)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
            Some((kind, file_id))
        }
        _ => None,
    };
    Ok(RecordedPart {
        media,
        body: row.get(2)?,
    })
}

// --- Packs ---

/// Creates a pack. Fails on a duplicate name.
pub async fn add_pack(db: &Database, name: &str, price: u32) -> Result<i64, ParleyError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO packs (name, price) VALUES (?1, ?2)",
                params![name, price],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Every pack, empty ones included.
pub async fn list_packs(db: &Database) -> Result<Vec<Pack>, ParleyError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT pack_id, name, price FROM packs ORDER BY pack_id")?;
            let rows = stmt.query_map([], row_to_pack)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_pack(db: &Database, id: i64) -> Result<Option<Pack>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT pack_id, name, price FROM packs WHERE pack_id = ?1",
                params![id],
                row_to_pack,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn rename_pack(db: &Database, id: i64, name: &str) -> Result<bool, ParleyError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE packs SET name = ?1 WHERE pack_id = ?2",
                params![name, id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_pack_price(db: &Database, id: i64, price: u32) -> Result<bool, ParleyError> {
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE packs SET price = ?1 WHERE pack_id = ?2",
                params![price, id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a pack together with its exercises and purchases.
pub async fn delete_pack(db: &Database, id: i64) -> Result<bool, ParleyError> {
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM packs WHERE pack_id = ?1", params![id])?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

const OFFER_SELECT: &str = "SELECT p.pack_id, p.name, p.price,
        EXISTS (SELECT 1 FROM purchases b WHERE b.pack_id = p.pack_id AND b.user_id = ?1)
     FROM packs p";

fn row_to_offer(row: &rusqlite::Row<'_>) -> rusqlite::Result<PackOffer> {
    Ok(PackOffer {
        pack: row_to_pack(row)?,
        purchased: row.get(3)?,
    })
}

/// Packs holding at least one exercise, marked with whether `user` bought them.
pub async fn offers_for(db: &Database, user: UserId) -> Result<Vec<PackOffer>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{OFFER_SELECT}
                 WHERE EXISTS (SELECT 1 FROM exercises e WHERE e.pack_id = p.pack_id)
                 ORDER BY p.pack_id"
            ))?;
            let rows = stmt.query_map(params![user.0], row_to_offer)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn offer(db: &Database, user: UserId, pack: i64) -> Result<Option<PackOffer>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{OFFER_SELECT} WHERE p.pack_id = ?2"),
                params![user.0, pack],
                row_to_offer,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Stores a purchase. Returns `false` if the user already owned the pack.
pub async fn record_purchase(db: &Database, purchase: &Purchase) -> Result<bool, ParleyError> {
    let p = purchase.clone();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "INSERT INTO purchases (user_id, pack_id, checkout_id, paid)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, pack_id) DO NOTHING",
                params![p.user_id.0, p.pack_id, p.checkout_id, p.paid],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

// --- Exercises ---

/// Stores an exercise with its recorded parts in one transaction.
pub async fn add_exercise(
    db: &Database,
    pack: i64,
    name: &str,
    parts: Vec<RecordedPart>,
) -> Result<i64, ParleyError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO exercises (pack_id, name) VALUES (?1, ?2)",
                params![pack, name],
            )?;
            let id = tx.last_insert_rowid();
            for (position, part) in parts.iter().enumerate() {
                let (kind, file_id) = match &part.media {
                    Some((kind, file_id)) => (Some(kind.to_string()), Some(file_id.clone())),
                    None => (None, None),
                };
                tx.execute(
                    "INSERT INTO exercise_parts (exercise_id, position, media_kind, file_id, body)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, position as i64, kind, file_id, part.body],
                )?;
            }
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_exercises(db: &Database, pack: i64) -> Result<Vec<Exercise>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT exercise_id, pack_id, name FROM exercises
                 WHERE pack_id = ?1 ORDER BY exercise_id",
            )?;
            let rows = stmt.query_map(params![pack], row_to_exercise)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_exercise(db: &Database, id: i64) -> Result<Option<Exercise>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT exercise_id, pack_id, name FROM exercises WHERE exercise_id = ?1",
                params![id],
                row_to_exercise,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_exercise(db: &Database, id: i64) -> Result<bool, ParleyError> {
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM exercises WHERE exercise_id = ?1", params![id])?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Recorded parts of an exercise in the order they were recorded.
pub async fn exercise_parts(db: &Database, id: i64) -> Result<Vec<RecordedPart>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT media_kind, file_id, body FROM exercise_parts
                 WHERE exercise_id = ?1 ORDER BY position",
            )?;
            let rows = stmt.query_map(params![id], row_to_part)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn voice(file: &str) -> RecordedPart {
        RecordedPart {
            media: Some((MediaKind::Voice, file.into())),
            body: String::new(),
        }
    }

    fn text(body: &str) -> RecordedPart {
        RecordedPart {
            media: None,
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn empty_packs_are_not_offered() {
        let (db, _dir) = setup_db().await;
        let empty = add_pack(&db, "Empty", 0).await.unwrap();
        let full = add_pack(&db, "Morning", 5).await.unwrap();
        add_exercise(&db, full, "Lip trill", vec![text("Relax your lips")])
            .await
            .unwrap();

        assert_eq!(list_packs(&db).await.unwrap().len(), 2);
        let offers = offers_for(&db, UserId(1)).await.unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].pack.name, "Morning");
        assert!(!offers[0].purchased);
        assert!(!offers[0].unlocked());
        assert!(offer(&db, UserId(1), empty).await.unwrap().unwrap().unlocked());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_pack_names_are_rejected() {
        let (db, _dir) = setup_db().await;
        add_pack(&db, "Morning", 0).await.unwrap();
        assert!(add_pack(&db, "Morning", 3).await.is_err());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purchases_unlock_once() {
        let (db, _dir) = setup_db().await;
        let pack = add_pack(&db, "Evening", 7).await.unwrap();
        let purchase = Purchase {
            user_id: UserId(2),
            pack_id: pack,
            checkout_id: "c1".into(),
            paid: "700EUR".into(),
        };
        assert!(record_purchase(&db, &purchase).await.unwrap());
        assert!(!record_purchase(&db, &purchase).await.unwrap());
        assert!(offer(&db, UserId(2), pack).await.unwrap().unwrap().purchased);
        assert!(!offer(&db, UserId(3), pack).await.unwrap().unwrap().purchased);
        assert_eq!(offer(&db, UserId(2), pack + 1).await.unwrap(), None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn parts_replay_in_order() {
        let (db, _dir) = setup_db().await;
        let pack = add_pack(&db, "Morning", 0).await.unwrap();
        let id = add_exercise(&db, pack, "Sirens", vec![text("Listen first"), voice("f-1")])
            .await
            .unwrap();
        let parts = exercise_parts(&db, id).await.unwrap();
        assert_eq!(parts, vec![text("Listen first"), voice("f-1")]);
        assert_eq!(get_exercise(&db, id).await.unwrap().unwrap().name, "Sirens");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn deleting_a_pack_cascades() {
        let (db, _dir) = setup_db().await;
        let pack = add_pack(&db, "Morning", 2).await.unwrap();
        let id = add_exercise(&db, pack, "Hum", vec![voice("f-2")]).await.unwrap();
        assert!(rename_pack(&db, pack, "Dawn").await.unwrap());
        assert!(set_pack_price(&db, pack, 0).await.unwrap());
        assert!(get_pack(&db, pack).await.unwrap().unwrap().is_free());

        assert!(delete_pack(&db, pack).await.unwrap());
        assert_eq!(get_exercise(&db, id).await.unwrap(), None);
        assert!(exercise_parts(&db, id).await.unwrap().is_empty());
        assert!(!delete_exercise(&db, id).await.unwrap());
        db.close().await.unwrap();
    }
}
