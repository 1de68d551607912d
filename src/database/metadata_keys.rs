//! Metadata-key table queries and the atomic rebuild.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::models::User;
use crate::database::{Database, DatabaseError, DbResult};
use crate::metadata::models::{MetadataKey, MetadataKeyPurpose, MetadataPrivateKey};

fn parse_datetime(value: String) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidValue(format!("timestamp '{}': {}", value, e)))
}

fn parse_uuid(value: String) -> DbResult<Uuid> {
    Uuid::parse_str(&value)
        .map_err(|e| DatabaseError::InvalidValue(format!("uuid '{}': {}", value, e)))
}

impl Database {
    /// Look up a user by id. Returns `None` for unknown ids.
    pub fn get_user(&self, id: Uuid) -> DbResult<Option<User>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, username, first_name, last_name, armored_public_key,
                        key_fingerprint, disabled
                 FROM users WHERE id = ?1",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, bool>(6)?,
                    ))
                },
            )
            .optional()?;

        row.map(
            |(id, username, first_name, last_name, armored_public_key, key_fingerprint, disabled)| {
                Ok(User {
                    id: parse_uuid(id)?,
                    username,
                    first_name,
                    last_name,
                    armored_public_key,
                    key_fingerprint,
                    disabled,
                })
            },
        )
        .transpose()
    }

    /// Insert or replace a user row. The user directory is normally
    /// maintained by the account sync subsystem.
    pub fn upsert_user(&self, user: &User) -> DbResult<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO users
                (id, username, first_name, last_name, armored_public_key, key_fingerprint, disabled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id.to_string(),
                user.username,
                user.first_name,
                user.last_name,
                user.armored_public_key,
                user.key_fingerprint,
                user.disabled,
            ],
        )?;
        Ok(())
    }

    /// Replace the whole metadata-key table with a fresh snapshot.
    ///
    /// Runs in a single transaction so no reader ever observes a
    /// half-rebuilt table; a cancelled run rolls back to the previous
    /// snapshot.
    pub fn rebuild_metadata_keys(&mut self, keys: &[MetadataKey]) -> DbResult<()> {
        let tx = self.conn_mut().transaction()?;

        tx.execute("DELETE FROM metadata_private_keys", [])?;
        tx.execute("DELETE FROM metadata_keys", [])?;

        for key in keys {
            tx.execute(
                "INSERT INTO metadata_keys (id, armored_key, fingerprint, modified, expired, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key.id.to_string(),
                    key.armored_key,
                    key.fingerprint,
                    key.modified.to_rfc3339(),
                    key.expired.map(|dt| dt.to_rfc3339()),
                    key.deleted.map(|dt| dt.to_rfc3339()),
                ],
            )?;

            for private_key in &key.private_keys {
                tx.execute(
                    "INSERT INTO metadata_private_keys
                        (id, metadata_key_id, user_id, pgp_message,
                         created, created_by, modified, modified_by)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        private_key.id.to_string(),
                        private_key.metadata_key_id.to_string(),
                        private_key.user_id.to_string(),
                        private_key.pgp_message,
                        private_key.created.to_rfc3339(),
                        private_key.created_by.map(|u| u.to_string()),
                        private_key.modified.to_rfc3339(),
                        private_key.modified_by.map(|u| u.to_string()),
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Load metadata keys filtered by purpose, most recently modified
    /// first, each with its private-key copies in creation order.
    pub fn get_metadata_keys(&self, purpose: MetadataKeyPurpose) -> DbResult<Vec<MetadataKey>> {
        let filter = match purpose {
            MetadataKeyPurpose::Encrypt => "WHERE expired IS NULL AND deleted IS NULL",
            MetadataKeyPurpose::Decrypt => "",
        };

        let sql = format!(
            "SELECT id, armored_key, fingerprint, modified, expired, deleted
             FROM metadata_keys {} ORDER BY modified DESC, id",
            filter
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut keys = Vec::new();
        for row in rows {
            let (id, armored_key, fingerprint, modified, expired, deleted) = row?;
            let id = parse_uuid(id)?;
            keys.push(MetadataKey {
                id,
                armored_key,
                fingerprint,
                modified: parse_datetime(modified)?,
                expired: expired.map(parse_datetime).transpose()?,
                deleted: deleted.map(parse_datetime).transpose()?,
                private_keys: self.get_private_keys(id)?,
            });
        }
        Ok(keys)
    }

    fn get_private_keys(&self, key_id: Uuid) -> DbResult<Vec<MetadataPrivateKey>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, metadata_key_id, user_id, pgp_message,
                    created, created_by, modified, modified_by
             FROM metadata_private_keys WHERE metadata_key_id = ?1
             ORDER BY created, id",
        )?;

        let rows = stmt.query_map([key_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut private_keys = Vec::new();
        for row in rows {
            let (id, metadata_key_id, user_id, pgp_message, created, created_by, modified, modified_by) =
                row?;
            private_keys.push(MetadataPrivateKey {
                id: parse_uuid(id)?,
                metadata_key_id: parse_uuid(metadata_key_id)?,
                user_id: parse_uuid(user_id)?,
                pgp_message,
                created: parse_datetime(created)?,
                created_by: created_by.map(parse_uuid).transpose()?,
                modified: parse_datetime(modified)?,
                modified_by: modified_by.map(parse_uuid).transpose()?,
            });
        }
        Ok(private_keys)
    }
}
