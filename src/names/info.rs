use serde_json::{Map, Value};

use crate::chain::Script;
use crate::errors::*;
use crate::names::encoding::{add_encoded_name, decode_name, NameEncodings};
use crate::names::script::{
    build_name_script, NameOp, NameOpKind, MAX_NAME_LENGTH, MAX_VALUE_LENGTH,
};

/// JSON description of a name operation, e.g. for decoded scripts or
/// pending transactions.
pub fn name_op_to_json(op: &NameOp, encodings: &NameEncodings) -> Value {
    let mut obj = Map::new();
    obj.insert("op".to_string(), json!(op.kind.as_str()));
    add_encoded_name(&mut obj, "name", &op.name, encodings.name);
    add_encoded_name(&mut obj, "value", &op.value, encodings.value);
    Value::Object(obj)
}

/// Builds the output script for a `{"op", "name", "value"}` request on top
/// of an existing `address` script. Name and value are decoded with the
/// configured encodings.
pub fn name_op_from_json(
    nameop: &Value,
    address: &Script,
    encodings: &NameEncodings,
) -> Result<Script> {
    let obj = nameop
        .as_object()
        .chain_err(|| ErrorKind::InvalidNameOp("expected a JSON object".to_string()))?;

    let kind: NameOpKind = str_field(obj, "op")?.parse()?;
    let name = decode_name(str_field(obj, "name")?, encodings.name)?;
    let value = decode_name(str_field(obj, "value")?, encodings.value)?;

    if name.len() > MAX_NAME_LENGTH {
        bail!(ErrorKind::InvalidNameOp("name is too long".to_string()));
    }
    if value.len() > MAX_VALUE_LENGTH {
        bail!(ErrorKind::InvalidNameOp("value is too long".to_string()));
    }

    Ok(build_name_script(kind, &name, &value, address))
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .chain_err(|| ErrorKind::InvalidNameOp(format!("missing string field '{}'", key)))
}
