pub mod encoding;
pub mod info;
pub mod script;

pub use self::encoding::{
    add_encoded_name, decode_name, encode_name, encode_name_for_message, NameEncoding,
    NameEncodings,
};
pub use self::info::{name_op_from_json, name_op_to_json};
pub use self::script::{build_name_script, name_outputs, NameOp, NameOpKind, NameScript};
