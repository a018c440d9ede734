use chrono::Utc;
use tenet_core::{
  kas::{KasGrants, KasUpdate, KeyAccessServer, NewKeyAccessServer},
  metadata::Metadata,
  store::KasRegistryStore,
};
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  db::{Update, exec, exec_one, next_metadata, query, query_row, text, to_json},
  encode::{RawKas, RawKasGrants, encode_uuid},
};

const KAS_SELECT: &str = "SELECT id, uri, public_key, metadata FROM key_access_servers";

/// Per KAS, the definitions and values granted to it as `{id, fqn}` arrays.
const GRANTS_SELECT: &str = "
SELECT k.id, k.uri,
       (SELECT json_group_array(json_object(
                 'id', g.attribute_definition_id, 'fqn', IFNULL(f.fqn, '')))
        FROM attribute_definition_key_access_grants g
        LEFT JOIN attribute_fqns f
          ON f.attribute_id = g.attribute_definition_id AND f.value_id IS NULL
        WHERE g.key_access_server_id = k.id),
       (SELECT json_group_array(json_object(
                 'id', g.attribute_value_id, 'fqn', IFNULL(f.fqn, '')))
        FROM attribute_value_key_access_grants g
        LEFT JOIN attribute_fqns f ON f.value_id = g.attribute_value_id
        WHERE g.key_access_server_id = k.id)
FROM key_access_servers k";

fn validate_uri(uri: &str) -> Result<()> {
  if uri.trim().is_empty() {
    return Err(
      tenet_core::Error::Validation("key access server uri is required".into())
        .into(),
    );
  }
  Ok(())
}

impl KasRegistryStore for SqliteStore {
  async fn create_kas(&self, input: NewKeyAccessServer) -> Result<KeyAccessServer> {
    validate_uri(&input.uri)?;
    let id = Uuid::new_v4();
    let metadata = Metadata::new(input.metadata, Utc::now());

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        exec(
          tx,
          "INSERT INTO key_access_servers (id, uri, public_key, metadata)
           VALUES (?1, ?2, ?3, ?4)",
          vec![
            text(id_str),
            text(input.uri),
            text(to_json(&input.public_key)?),
            text(to_json(&metadata)?),
          ],
        )?;
        Ok(())
      })
      .await?;

    self.get_kas(id).await
  }

  async fn get_kas(&self, id: Uuid) -> Result<KeyAccessServer> {
    let id_str = encode_uuid(id);
    let raw = self
      .read(move |conn| {
        Ok(query_row(
          conn,
          &format!("{KAS_SELECT} WHERE id = ?1"),
          vec![text(id_str)],
          RawKas::from_row,
        )?)
      })
      .await?;
    raw.into_kas()
  }

  async fn list_kas(&self) -> Result<Vec<KeyAccessServer>> {
    let raws = self
      .read(|conn| {
        Ok(query(
          conn,
          &format!("{KAS_SELECT} ORDER BY rowid"),
          Vec::new(),
          RawKas::from_row,
        )?)
      })
      .await?;
    raws.into_iter().map(RawKas::into_kas).collect()
  }

  async fn update_kas(&self, id: Uuid, update: KasUpdate) -> Result<KeyAccessServer> {
    if update.is_empty() {
      return self.get_kas(id).await;
    }
    if let Some(uri) = &update.uri {
      validate_uri(uri)?;
    }

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        let metadata = next_metadata(
          tx,
          "key_access_servers",
          &id_str,
          update.metadata.as_ref(),
          Utc::now(),
        )?;
        let public_key = update.public_key.as_ref().map(to_json).transpose()?;
        Update::new("key_access_servers")
          .set("metadata", text(metadata))
          .set_opt("uri", update.uri.map(text))
          .set_opt("public_key", public_key.map(text))
          .execute(tx, &id_str)?;
        Ok(())
      })
      .await?;

    self.get_kas(id).await
  }

  async fn delete_kas(&self, id: Uuid) -> Result<KeyAccessServer> {
    let id_str = encode_uuid(id);
    let raw = self
      .write(move |tx| {
        let raw = query_row(
          tx,
          &format!("{KAS_SELECT} WHERE id = ?1"),
          vec![text(id_str.as_str())],
          RawKas::from_row,
        )?;
        exec_one(tx, "DELETE FROM key_access_servers WHERE id = ?1", vec![text(id_str)])?;
        Ok(raw)
      })
      .await?;
    raw.into_kas()
  }

  async fn list_kas_grants(&self, kas_id: Option<Uuid>) -> Result<Vec<KasGrants>> {
    let raws = self
      .read(move |conn| {
        let raws = match kas_id {
          Some(kas_id) => vec![query_row(
            conn,
            &format!("{GRANTS_SELECT} WHERE k.id = ?1"),
            vec![text(encode_uuid(kas_id))],
            RawKasGrants::from_row,
          )?],
          None => query(
            conn,
            &format!(
              "{GRANTS_SELECT}
               WHERE EXISTS (SELECT 1 FROM attribute_definition_key_access_grants
                             WHERE key_access_server_id = k.id)
                  OR EXISTS (SELECT 1 FROM attribute_value_key_access_grants
                             WHERE key_access_server_id = k.id)
               ORDER BY k.rowid"
            ),
            Vec::new(),
            RawKasGrants::from_row,
          )?,
        };
        Ok(raws)
      })
      .await?;
    raws.into_iter().map(RawKasGrants::into_grants).collect()
  }
}
