use crate::names::encoding::NameEncoding;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    errors {
        InvalidNameString(enc: NameEncoding, text: String) {
            description("invalid name string")
            display("invalid string for encoding {}: {}", enc, text)
        }

        InvalidEncoding(text: String) {
            description("invalid name/value encoding")
            display("invalid name/value encoding: {}", text)
        }

        InvalidNameHash(msg: String) {
            description("invalid name hash")
            display("invalid name hash: {}", msg)
        }

        InvalidNameOp(msg: String) {
            description("invalid name operation")
            display("invalid name operation: {}", msg)
        }

        IndexWriteFailure(msg: String) {
            description("index write failed")
            display("index write failed: {}", msg)
        }

        IndexReadFailure(msg: String) {
            description("index read failed")
            display("index read failed: {}", msg)
        }

        IncompatibleDatabase {
            description("incompatible database")
            display("Incompatible database found. Please reindex.")
        }

        IndexDisabled {
            description("namehash index is not enabled")
            display("namehash index is not enabled")
        }
    }
}
