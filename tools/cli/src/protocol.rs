//! Line-delimited JSON driver for the service facade.
//!
//! Each request is one JSON object `{"method": ..., "params": {...}}` and
//! each response is either `{"ok": ...}` or `{"error": {"name", "message"}}`.
//! Byte fields are standard base64.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use secretd_common::{CollectionId, Error, ItemId};
use secretd_crypto::Secret;
use secretd_service::{ItemProperties, SecretService, SessionHandle};
use secretd_store::{Attributes, LockTarget};

/// A secret with base64-encoded byte fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireSecret {
    pub algorithm: String,
    #[serde(default)]
    pub parameters: String,
    pub value: String,
}

impl WireSecret {
    fn encode(secret: &Secret) -> Self {
        Self {
            algorithm: secret.algorithm.clone(),
            parameters: STANDARD.encode(&secret.parameters),
            value: STANDARD.encode(&secret.value),
        }
    }

    fn decode(&self) -> Result<Secret, Error> {
        Ok(Secret::new(
            self.algorithm.clone(),
            decode_bytes(&self.parameters)?,
            decode_bytes(&self.value)?,
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    OpenSession {
        algorithm: String,
        #[serde(default)]
        input: String,
    },
    CloseSession {
        session: SessionHandle,
    },
    CreateCollection {
        label: String,
        #[serde(default)]
        private: bool,
    },
    SetCollectionLabel {
        collection: CollectionId,
        label: String,
    },
    DeleteCollection {
        collection: CollectionId,
    },
    ListCollections,
    ListItems {
        collection: CollectionId,
    },
    LockService,
    Lock {
        objects: Vec<String>,
    },
    Unlock {
        objects: Vec<String>,
    },
    SearchCollections {
        #[serde(default)]
        fields: Attributes,
    },
    SearchItems {
        collection: CollectionId,
        #[serde(default)]
        fields: Attributes,
    },
    CreateItem {
        session: SessionHandle,
        collection: CollectionId,
        label: String,
        #[serde(default)]
        attributes: Attributes,
        secret: WireSecret,
        content_type: Option<String>,
        #[serde(default)]
        replace: bool,
    },
    DeleteItem {
        item: ItemId,
    },
    RetrieveSecrets {
        session: SessionHandle,
        items: Vec<ItemId>,
    },
}

/// Handle one request line and build its response.
pub fn handle_line(service: &SecretService, line: &str) -> Value {
    let outcome = serde_json::from_str::<Request>(line)
        .map_err(|e| Error::InvalidInput(format!("Malformed request: {}", e)))
        .and_then(|request| dispatch(service, request));

    match outcome {
        Ok(value) => json!({ "ok": value }),
        Err(e) => json!({
            "error": {
                "name": e.dbus_name(),
                "message": e.to_string(),
            }
        }),
    }
}

/// Execute a decoded request.
pub fn dispatch(service: &SecretService, request: Request) -> Result<Value, Error> {
    let value = match request {
        Request::OpenSession { algorithm, input } => {
            let opened = service.open_session(&algorithm, &decode_bytes(&input)?)?;
            json!({
                "session": opened.handle,
                "algorithm": opened.algorithm,
                "output": STANDARD.encode(&opened.server_public),
            })
        }
        Request::CloseSession { session } => json!(service.close_session(&session)),
        Request::CreateCollection { label, private } => {
            json!(service.create_collection(&label, private)?)
        }
        Request::SetCollectionLabel { collection, label } => {
            service.set_collection_label(collection, &label)?;
            Value::Null
        }
        Request::DeleteCollection { collection } => {
            service.delete_collection(collection)?;
            Value::Null
        }
        Request::ListCollections => to_value(service.list_collections())?,
        Request::ListItems { collection } => to_value(service.list_items(collection)?)?,
        Request::LockService => {
            service.lock_service();
            Value::Null
        }
        Request::Lock { objects } => {
            service.lock(&parse_targets(&objects)?)?;
            Value::Null
        }
        Request::Unlock { objects } => {
            service.unlock(&parse_targets(&objects)?)?;
            Value::Null
        }
        Request::SearchCollections { fields } => to_value(service.search_collections(&fields))?,
        Request::SearchItems { collection, fields } => {
            to_value(service.search_items(collection, &fields)?)?
        }
        Request::CreateItem {
            session,
            collection,
            label,
            attributes,
            secret,
            content_type,
            replace,
        } => {
            let properties = ItemProperties {
                label,
                attributes,
                content_type,
            };
            let secret = secret.decode()?;
            json!(service.create_item(&session, collection, properties, &secret, replace)?)
        }
        Request::DeleteItem { item } => {
            service.delete_item(item)?;
            Value::Null
        }
        Request::RetrieveSecrets { session, items } => {
            let secrets = service.retrieve_secrets(&session, &items)?;
            Value::Array(
                secrets
                    .iter()
                    .map(|r| {
                        json!({
                            "item": r.item,
                            "content_type": r.content_type,
                            "secret": WireSecret::encode(&r.secret),
                        })
                    })
                    .collect(),
            )
        }
    };
    Ok(value)
}

/// Interpret an object path as a collection or an item.
pub fn parse_target(path: &str) -> Result<LockTarget, Error> {
    CollectionId::parse(path)
        .map(LockTarget::Collection)
        .or_else(|_| ItemId::parse(path).map(LockTarget::Item))
}

fn parse_targets(paths: &[String]) -> Result<Vec<LockTarget>, Error> {
    paths.iter().map(|p| parse_target(p)).collect()
}

fn decode_bytes(encoded: &str) -> Result<Vec<u8>, Error> {
    STANDARD
        .decode(encoded)
        .map_err(|e| Error::InvalidInput(format!("Invalid base64: {}", e)))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secretd_service::ServiceConfig;

    fn call(service: &SecretService, request: Value) -> Value {
        handle_line(service, &request.to_string())
    }

    #[test]
    fn test_session_collection_item_flow() {
        let service = SecretService::new(ServiceConfig::default()).unwrap();

        let opened = call(&service, json!({"method": "open_session", "params": {"algorithm": "plain"}}));
        assert_eq!(opened["ok"]["algorithm"], "plain");
        let session = opened["ok"]["session"].clone();

        let created = call(
            &service,
            json!({"method": "create_collection", "params": {"label": "work"}}),
        );
        let collection = created["ok"].clone();
        assert_eq!(collection, "/org/freedesktop/secrets/collection/1");

        let item = call(
            &service,
            json!({"method": "create_item", "params": {
                "session": session,
                "collection": collection,
                "label": "alice",
                "attributes": {"user": "alice"},
                "secret": {"algorithm": "plain", "value": STANDARD.encode(b"pw")},
            }}),
        );
        let item = item["ok"].clone();

        let found = call(
            &service,
            json!({"method": "search_collections", "params": {"fields": {"user": "alice"}}}),
        );
        assert_eq!(found["ok"]["unlocked"], json!([item.clone()]));

        let retrieved = call(
            &service,
            json!({"method": "retrieve_secrets", "params": {"session": session, "items": [item]}}),
        );
        assert_eq!(retrieved["ok"][0]["secret"]["value"], STANDARD.encode(b"pw"));
    }

    #[test]
    fn test_errors_carry_dbus_names() {
        let service = SecretService::new(ServiceConfig::default()).unwrap();

        let unsupported = call(
            &service,
            json!({"method": "open_session", "params": {"algorithm": "rot13"}}),
        );
        assert_eq!(
            unsupported["error"]["name"],
            "org.freedesktop.DBus.Error.NotSupported"
        );

        let malformed = handle_line(&service, "not json");
        assert_eq!(
            malformed["error"]["name"],
            "org.freedesktop.DBus.Error.InvalidArgs"
        );
    }

    #[test]
    fn test_lock_service_over_wire() {
        let service = SecretService::new(ServiceConfig::default()).unwrap();
        call(&service, json!({"method": "create_collection", "params": {"label": "a"}}));

        let locked = call(&service, json!({"method": "lock_service"}));
        assert_eq!(locked["ok"], Value::Null);
        assert!(service.list_collections()[0].locked);
    }

    #[test]
    fn test_set_collection_label_over_wire() {
        let service = SecretService::new(ServiceConfig::default()).unwrap();
        let created = call(&service, json!({"method": "create_collection", "params": {"label": "a"}}));

        let renamed = call(
            &service,
            json!({"method": "set_collection_label", "params": {"collection": created["ok"], "label": "b"}}),
        );
        assert_eq!(renamed["ok"], Value::Null);
        assert_eq!(service.list_collections()[0].label, "b");

        let rejected = call(
            &service,
            json!({"method": "set_collection_label", "params": {"collection": created["ok"], "label": ""}}),
        );
        assert_eq!(rejected["error"]["name"], "org.freedesktop.DBus.Error.InvalidArgs");
    }

    #[test]
    fn test_parse_target() {
        let collection = CollectionId::new(1);
        let item = ItemId::new(collection, 2);

        assert_eq!(
            parse_target(&collection.to_path()).unwrap(),
            LockTarget::Collection(collection)
        );
        assert_eq!(parse_target(&item.to_path()).unwrap(), LockTarget::Item(item));
        assert!(parse_target("/org/freedesktop/secrets").is_err());
    }
}
