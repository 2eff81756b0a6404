//! Record transform seam
//!
//! The transform turns one raw API document into an output record, or `None`
//! when the document is not part of the collection being harvested. It is a
//! pure function supplied by the caller; the harvester core never inspects
//! document fields beyond what the transform returns.

use crate::state::OutputRecord;
use serde_json::{Map, Value};

/// A pure mapping from raw document to output record
///
/// Returning `None` means "not part of this collection" and is never an error.
pub type RecordTransform = Box<dyn Fn(&Value) -> Option<OutputRecord> + Send>;

/// Builds the default transform: the record id is read from a JSON pointer
/// and the whole document object becomes the record's fields.
///
/// Documents whose pointer is missing, empty, or non-scalar are skipped.
pub fn id_pointer_transform(pointer: &str) -> RecordTransform {
    let pointer = pointer.to_string();
    Box::new(move |doc: &Value| {
        let id = match doc.pointer(&pointer)? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        let mut fields = match doc {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        // The id is carried on the record itself; avoid a duplicate key in
        // the flattened serialized form.
        fields.remove("id");

        Some(OutputRecord::new(id, fields))
    })
}
