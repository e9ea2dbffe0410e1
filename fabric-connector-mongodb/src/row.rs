//! `bson::Document` <-> [`Row`] conversion. Mongo's extended JSON keeps
//! type-tagged wrappers (`$oid`, `$date`, `$numberDecimal`, ...) for values
//! that don't map onto plain JSON; we keep the relaxed form so scalars stay
//! ergonomic and only exotic types carry the wrapper.

use bson::{Bson, Document};
use fabric_connector::adapter::Row;
use serde_json::Value;

pub fn from_document(doc: Document) -> Row {
    let mut row = Row::new();
    for (key, value) in doc {
        row.insert(key, bson_to_json(value));
    }
    row
}

pub fn bson_to_json(value: Bson) -> Value {
    value.into_relaxed_extjson()
}

pub fn row_to_document(row: &Row) -> Document {
    let mut doc = Document::new();
    for (key, value) in row {
        doc.insert(key.clone(), json_to_bson(value));
    }
    doc
}

pub fn json_to_bson(value: &Value) -> Bson {
    Bson::try_from(value.clone()).unwrap_or(Bson::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn round_trips_scalar_document() {
        let doc = doc! { "name": "alice", "age": 30i32, "active": true };
        let row = from_document(doc);
        assert_eq!(row.get("name").and_then(Value::as_str), Some("alice"));
        assert_eq!(row.get("age").and_then(Value::as_i64), Some(30));
        let back = row_to_document(&row);
        assert_eq!(back.get_str("name").unwrap(), "alice");
    }

    #[test]
    fn object_id_renders_as_extended_json_wrapper() {
        let id = bson::oid::ObjectId::new();
        let doc = doc! { "_id": id };
        let row = from_document(doc);
        assert!(row.get("_id").unwrap().get("$oid").is_some());
    }
}
