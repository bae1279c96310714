use std::fmt;
use std::str::FromStr;

use bitcoin::blockdata::opcodes::all::{
    OP_2DROP, OP_DROP, OP_NOP, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4, OP_PUSHNUM_1,
    OP_PUSHNUM_2,
};
use bitcoin::blockdata::script::Builder;

use crate::chain::{opcodes, Script, Transaction};
use crate::errors::*;

pub const OP_NAME_REGISTER: opcodes::All = OP_PUSHNUM_1;
pub const OP_NAME_UPDATE: opcodes::All = OP_PUSHNUM_2;

/// Upper bound on the name length accepted by the chain.
pub const MAX_NAME_LENGTH: usize = 255;
/// Upper bound on the value length accepted by the chain.
pub const MAX_VALUE_LENGTH: usize = 1023;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum NameOpKind {
    Register,
    Update,
}

impl NameOpKind {
    pub fn opcode(self) -> opcodes::All {
        match self {
            NameOpKind::Register => OP_NAME_REGISTER,
            NameOpKind::Update => OP_NAME_UPDATE,
        }
    }

    fn from_opcode(opcode: u8) -> Option<Self> {
        if opcode == OP_NAME_REGISTER.into_u8() {
            Some(NameOpKind::Register)
        } else if opcode == OP_NAME_UPDATE.into_u8() {
            Some(NameOpKind::Update)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NameOpKind::Register => "name_register",
            NameOpKind::Update => "name_update",
        }
    }
}

impl fmt::Display for NameOpKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameOpKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name_register" => Ok(NameOpKind::Register),
            "name_update" => Ok(NameOpKind::Update),
            _ => bail!(ErrorKind::InvalidNameOp(format!("unknown operation {}", s))),
        }
    }
}

/// A name operation picked apart from an output script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameOp {
    pub kind: NameOpKind,
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    /// The script following the name prefix, i.e. the ownership condition.
    pub address: Script,
}

impl NameOp {
    pub fn new(kind: NameOpKind, name: Vec<u8>, value: Vec<u8>, address: Script) -> Self {
        NameOp {
            kind,
            name,
            value,
            address,
        }
    }

    pub fn is_register(&self) -> bool {
        self.kind == NameOpKind::Register
    }

    pub fn to_script(&self) -> Script {
        build_name_script(self.kind, &self.name, &self.value, &self.address)
    }
}

/// Result of inspecting an output script for a name prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameScript {
    NotAnOperation,
    Operation(NameOp),
}

impl NameScript {
    /// Recognizes `<kind> <name> <value> (OP_DROP|OP_2DROP|OP_NOP)+ <address>`.
    /// Any structural mismatch yields `NotAnOperation`.
    pub fn parse(script: &Script) -> NameScript {
        let mut reader = OpReader::new(script.as_bytes());

        let kind = match reader.next_op().and_then(|(op, _)| NameOpKind::from_opcode(op)) {
            Some(kind) => kind,
            None => return NameScript::NotAnOperation,
        };

        let mut args: Vec<&[u8]> = vec![];
        loop {
            let (opcode, data) = match reader.next_op() {
                Some(op) => op,
                None => return NameScript::NotAnOperation,
            };
            if is_cleanup(opcode) {
                break;
            }
            if opcode > OP_PUSHDATA4.into_u8() {
                return NameScript::NotAnOperation;
            }
            args.push(data);
        }

        // the address starts at the first opcode that is not a DROP/NOP
        let address_start = loop {
            let start = reader.position();
            match reader.next_op() {
                Some((opcode, _)) if is_cleanup(opcode) => (),
                _ => break start,
            }
        };

        let (name, value) = match args.as_slice() {
            [name, value] => (name.to_vec(), value.to_vec()),
            _ => return NameScript::NotAnOperation,
        };

        NameScript::Operation(NameOp {
            kind,
            name,
            value,
            address: Script::from(script.as_bytes()[address_start..].to_vec()),
        })
    }

    pub fn is_name_op(&self) -> bool {
        matches!(self, NameScript::Operation(_))
    }

    pub fn as_op(&self) -> Option<&NameOp> {
        match self {
            NameScript::Operation(op) => Some(op),
            NameScript::NotAnOperation => None,
        }
    }

    pub fn into_op(self) -> Option<NameOp> {
        match self {
            NameScript::Operation(op) => Some(op),
            NameScript::NotAnOperation => None,
        }
    }
}

/// Builds `<kind> <name> <value> OP_2DROP OP_DROP` followed by `address`.
pub fn build_name_script(kind: NameOpKind, name: &[u8], value: &[u8], address: &Script) -> Script {
    let prefix = Builder::new()
        .push_opcode(kind.opcode())
        .push_slice(name)
        .push_slice(value)
        .push_opcode(OP_2DROP)
        .push_opcode(OP_DROP)
        .into_script();

    let mut bytes = prefix.into_bytes();
    bytes.extend_from_slice(address.as_bytes());
    Script::from(bytes)
}

/// All name operations among the outputs of `tx`, keyed by output index.
pub fn name_outputs(tx: &Transaction) -> impl Iterator<Item = (u32, NameOp)> + '_ {
    tx.output.iter().enumerate().filter_map(|(vout, txo)| {
        NameScript::parse(&txo.script_pubkey)
            .into_op()
            .map(|op| (vout as u32, op))
    })
}

fn is_cleanup(opcode: u8) -> bool {
    opcode == OP_DROP.into_u8() || opcode == OP_2DROP.into_u8() || opcode == OP_NOP.into_u8()
}

/// Walks the raw opcodes of a script, keeping track of the byte offset.
/// Non-minimal pushes are accepted as they are.
struct OpReader<'a> {
    script: &'a [u8],
    pos: usize,
}

impl<'a> OpReader<'a> {
    fn new(script: &'a [u8]) -> Self {
        OpReader { script, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn read_len(&self, at: usize, width: usize) -> Option<usize> {
        let bytes = self.script.get(at..at.checked_add(width)?)?;
        Some(
            bytes
                .iter()
                .rev()
                .fold(0usize, |acc, b| (acc << 8) | *b as usize),
        )
    }

    /// Returns the next opcode and its pushed data (empty for non-push
    /// opcodes), or `None` at the end of the script or on a truncated push.
    fn next_op(&mut self) -> Option<(u8, &'a [u8])> {
        let opcode = *self.script.get(self.pos)?;
        let mut start = self.pos + 1;

        let len = if opcode < OP_PUSHDATA1.into_u8() {
            opcode as usize
        } else if opcode == OP_PUSHDATA1.into_u8() {
            start += 1;
            self.read_len(self.pos + 1, 1)?
        } else if opcode == OP_PUSHDATA2.into_u8() {
            start += 2;
            self.read_len(self.pos + 1, 2)?
        } else if opcode == OP_PUSHDATA4.into_u8() {
            start += 4;
            self.read_len(self.pos + 1, 4)?
        } else {
            0
        };

        let end = start.checked_add(len)?;
        let data = self.script.get(start..end)?;
        self.pos = end;
        Some((opcode, data))
    }
}
