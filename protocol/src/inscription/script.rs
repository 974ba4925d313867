//! # Reveal Script
//!
//! The tapscript leaf that carries an inscription. Content sits in an
//! unexecuted `OP_FALSE OP_IF ... OP_ENDIF` envelope after a plain
//! `<key> OP_CHECKSIG`, so the script spends like a single-key leaf and the
//! envelope is pure data:
//!
//! ```text
//! <x-only key> OP_CHECKSIG
//! OP_FALSE OP_IF
//!   "ord"
//!   01 <content type>
//!   02 <pointer, little-endian, trailing zeros trimmed>   (optional)
//!   05 <metadata JSON>                                     (optional, repeatable)
//!   OP_0
//!   <body in pushes of at most 520 bytes>
//! OP_ENDIF
//! ```
//!
//! Metadata is carried as canonical JSON. Values longer than one push are
//! split across repeated `05` tags and concatenated on parse.

use bitcoin::opcodes::all::{OP_CHECKSIG, OP_ENDIF, OP_IF, OP_PUSHNUM_1};
use bitcoin::opcodes::OP_FALSE;
use bitcoin::script::{Builder, Instruction, PushBytes};
use bitcoin::secp256k1::XOnlyPublicKey;
use bitcoin::{Script, ScriptBuf};
use serde_json::Value;

use crate::config::MAX_SCRIPT_ELEMENT_SIZE;
use crate::content::InscriptionContent;
use crate::error::{BtcoError, BtcoResult};
use crate::proof::canonical::canonical_bytes;

/// Envelope protocol marker.
pub const PROTOCOL_ID: &[u8] = b"ord";

const TAG_CONTENT_TYPE: u8 = 1;
const TAG_POINTER: u8 = 2;
const TAG_METADATA: u8 = 5;

fn push(builder: Builder, data: &[u8]) -> BtcoResult<Builder> {
    let bytes = <&PushBytes>::try_from(data)
        .map_err(|_| BtcoError::Transaction(format!("push of {} bytes is too large", data.len())))?;
    Ok(builder.push_slice(bytes))
}

fn push_chunked(mut builder: Builder, tag: Option<u8>, data: &[u8]) -> BtcoResult<Builder> {
    for chunk in data.chunks(MAX_SCRIPT_ELEMENT_SIZE) {
        if let Some(tag) = tag {
            builder = push(builder, &[tag])?;
        }
        builder = push(builder, chunk)?;
    }
    Ok(builder)
}

/// Minimal little-endian encoding of a pointer value.
fn encode_pointer(pointer: u64) -> Vec<u8> {
    let mut bytes = pointer.to_le_bytes().to_vec();
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes
}

/// Build the reveal leaf for `content`, spendable by `key`.
pub fn build_reveal_script(key: &XOnlyPublicKey, content: &InscriptionContent) -> BtcoResult<ScriptBuf> {
    if content.content_type.len() > MAX_SCRIPT_ELEMENT_SIZE {
        return Err(BtcoError::InvalidInput("content type is longer than one script push".into()));
    }

    let mut builder = Builder::new()
        .push_x_only_key(key)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_FALSE)
        .push_opcode(OP_IF);
    builder = push(builder, PROTOCOL_ID)?;

    builder = push(builder, &[TAG_CONTENT_TYPE])?;
    builder = push(builder, content.content_type.as_bytes())?;

    if let Some(pointer) = content.pointer {
        builder = push(builder, &[TAG_POINTER])?;
        builder = push(builder, &encode_pointer(pointer))?;
    }

    if let Some(metadata) = &content.metadata {
        builder = push_chunked(builder, Some(TAG_METADATA), &canonical_bytes(metadata))?;
    }

    // Body separator.
    builder = push(builder, &[])?;
    builder = push_chunked(builder, None, &content.body)?;

    Ok(builder.push_opcode(OP_ENDIF).into_script())
}

/// An inscription read back out of a reveal script.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEnvelope {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub metadata: Option<Value>,
    pub pointer: Option<u64>,
}

impl ParsedEnvelope {
    /// Convert into pipeline content, defaulting a missing type.
    pub fn into_content(self) -> InscriptionContent {
        InscriptionContent {
            content_type: self
                .content_type
                .unwrap_or_else(|| crate::content::mime::OCTET_STREAM.to_string()),
            body: self.body,
            metadata: self.metadata,
            pointer: self.pointer,
        }
    }
}

/// Find and decode the first `ord` envelope in `script`.
///
/// Returns `None` when the script holds no well-formed envelope.
pub fn parse_envelope(script: &Script) -> Option<ParsedEnvelope> {
    let instructions: Vec<Instruction<'_>> = script.instructions().collect::<Result<_, _>>().ok()?;

    let start = instructions.windows(3).position(|w| {
        is_empty_push(&w[0]) && w[1] == Instruction::Op(OP_IF) && push_bytes(&w[2]) == Some(PROTOCOL_ID)
    })?;
    let mut iter = instructions[start + 3..].iter();

    let mut content_type = None;
    let mut pointer = None;
    let mut metadata_bytes: Vec<u8> = Vec::new();
    let mut has_metadata = false;
    let mut body = Vec::new();

    // Tag section, up to the empty push that starts the body.
    loop {
        let tag = iter.next()?;
        if *tag == Instruction::Op(OP_ENDIF) {
            break;
        }
        if is_empty_push(tag) {
            for instruction in iter.by_ref() {
                if *instruction == Instruction::Op(OP_ENDIF) {
                    break;
                }
                body.extend_from_slice(push_bytes(instruction)?);
            }
            break;
        }
        let tag = tag_value(tag)?;
        let value = push_bytes(iter.next()?)?;
        match tag {
            TAG_CONTENT_TYPE => content_type = Some(String::from_utf8(value.to_vec()).ok()?),
            TAG_POINTER => {
                if value.len() > 8 {
                    return None;
                }
                let mut le = [0u8; 8];
                le[..value.len()].copy_from_slice(value);
                pointer = Some(u64::from_le_bytes(le));
            }
            TAG_METADATA => {
                has_metadata = true;
                metadata_bytes.extend_from_slice(value);
            }
            // Unknown tags are skipped, the way indexers treat them.
            _ => {}
        }
    }

    let metadata = if has_metadata {
        Some(serde_json::from_slice(&metadata_bytes).ok()?)
    } else {
        None
    };

    Some(ParsedEnvelope {
        content_type,
        body,
        metadata,
        pointer,
    })
}

fn push_bytes<'a>(instruction: &Instruction<'a>) -> Option<&'a [u8]> {
    match instruction {
        Instruction::PushBytes(bytes) => Some(bytes.as_bytes()),
        Instruction::Op(_) => None,
    }
}

fn is_empty_push(instruction: &Instruction<'_>) -> bool {
    push_bytes(instruction).is_some_and(<[u8]>::is_empty)
}

fn tag_value(instruction: &Instruction<'_>) -> Option<u8> {
    match instruction {
        Instruction::PushBytes(bytes) if bytes.len() == 1 => Some(bytes.as_bytes()[0]),
        // Minimal-push encoders write tag 1 as OP_1.
        Instruction::Op(op) if *op == OP_PUSHNUM_1 => Some(TAG_CONTENT_TYPE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::prepare_content;
    use bitcoin::secp256k1::{Keypair, Secp256k1};
    use serde_json::json;

    fn key() -> XOnlyPublicKey {
        let secp = Secp256k1::new();
        let kp = Keypair::from_seckey_slice(&secp, &[0x11; 32]).unwrap();
        kp.x_only_public_key().0
    }

    #[test]
    fn hello_round_trips_through_envelope() {
        let content = prepare_content("hello", "text/plain;charset=utf-8", None, None).unwrap();
        let script = build_reveal_script(&key(), &content).unwrap();
        let parsed = parse_envelope(&script).unwrap();
        assert_eq!(parsed.content_type.as_deref(), Some("text/plain;charset=utf-8"));
        assert_eq!(parsed.body, b"hello");
        assert_eq!(parsed.pointer, None);
        assert_eq!(parsed.metadata, None);
    }

    #[test]
    fn large_body_is_split_into_520_byte_pushes() {
        let body = vec![0xAB; 1500];
        let content = prepare_content(body.clone(), "application/octet-stream", None, None).unwrap();
        let script = build_reveal_script(&key(), &content).unwrap();

        let max_push = script
            .instructions()
            .filter_map(|i| match i.unwrap() {
                Instruction::PushBytes(b) => Some(b.len()),
                Instruction::Op(_) => None,
            })
            .max()
            .unwrap();
        assert_eq!(max_push, MAX_SCRIPT_ELEMENT_SIZE);
        assert_eq!(parse_envelope(&script).unwrap().body, body);
    }

    #[test]
    fn metadata_and_pointer_survive() {
        let metadata = json!({"title": "x".repeat(700), "n": 1});
        let content =
            prepare_content("{}", "application/json", Some(metadata.clone()), Some(300)).unwrap();
        let script = build_reveal_script(&key(), &content).unwrap();
        let parsed = parse_envelope(&script).unwrap();
        assert_eq!(parsed.metadata, Some(metadata));
        assert_eq!(parsed.pointer, Some(300));
        assert_eq!(parsed.body, b"{}");
    }

    #[test]
    fn pointer_encoding_is_minimal() {
        assert_eq!(encode_pointer(0), Vec::<u8>::new());
        assert_eq!(encode_pointer(1), vec![1]);
        assert_eq!(encode_pointer(256), vec![0, 1]);
    }

    #[test]
    fn plain_script_has_no_envelope() {
        let script = Builder::new()
            .push_x_only_key(&key())
            .push_opcode(OP_CHECKSIG)
            .into_script();
        assert!(parse_envelope(&script).is_none());
    }
}
