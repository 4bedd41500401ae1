//! Hook points for decrypting string and stream payloads.
//!
//! Key derivation and ciphers live outside this crate; a caller plugs in a
//! [`Decryptor`] and the document applies it to every object it parses.

use super::error::{PDFError, PDFResult};
use super::object::{Dictionary, ObjectId, PDFObject};
use tracing::debug;

/// Decrypts the payload of one string or stream.
///
/// `id` is the indirect object that contains the payload; ciphers key on
/// it.
pub trait Decryptor: Send + Sync {
    fn decrypt(&self, id: ObjectId, data: &[u8]) -> PDFResult<Vec<u8>>;
}

impl<F> Decryptor for F
where
    F: Fn(ObjectId, &[u8]) -> PDFResult<Vec<u8>> + Send + Sync,
{
    fn decrypt(&self, id: ObjectId, data: &[u8]) -> PDFResult<Vec<u8>> {
        self(id, data)
    }
}

/// What the document's `Encrypt` dictionary says about decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHandler {
    pub version: i64,
    pub revision: i64,
    /// False when `/EncryptMetadata false` leaves metadata streams in clear.
    pub encrypt_metadata: bool,
    /// The `Encrypt` object itself, which is never decrypted.
    pub encrypt_id: Option<ObjectId>,
}

impl SecurityHandler {
    /// Checks that the encryption dictionary names a handler we can drive.
    pub fn validate(encrypt: &Dictionary, encrypt_id: Option<ObjectId>) -> PDFResult<Self> {
        match encrypt.get_name("Filter") {
            Some(b"Standard") => {}
            Some(other) => {
                return Err(PDFError::EncryptionHandlerRejected(format!(
                    "unsupported security handler /{}",
                    String::from_utf8_lossy(other)
                )));
            }
            None => {
                return Err(PDFError::EncryptionHandlerRejected(
                    "encryption dictionary has no /Filter".to_string(),
                ));
            }
        }

        let handler = SecurityHandler {
            version: encrypt.get_integer("V").unwrap_or(0),
            revision: encrypt.get_integer("R").unwrap_or(0),
            encrypt_metadata: encrypt
                .get("EncryptMetadata")
                .and_then(PDFObject::as_bool)
                .unwrap_or(true),
            encrypt_id,
        };
        debug!(
            version = handler.version,
            revision = handler.revision,
            encrypt_metadata = handler.encrypt_metadata,
            "standard security handler"
        );
        Ok(handler)
    }

    /// Returns true if `object` (numbered `id`) must go through the decryptor.
    pub fn applies_to(&self, id: ObjectId, object: &PDFObject) -> bool {
        if self.encrypt_id == Some(id) {
            return false;
        }
        if !self.encrypt_metadata {
            if let PDFObject::Stream { dict, .. } = object {
                if dict.is_type("Metadata") {
                    return false;
                }
            }
        }
        true
    }

    /// Decrypts every string and stream payload inside `object`.
    pub fn decrypt_object(
        &self,
        decryptor: &dyn Decryptor,
        id: ObjectId,
        object: PDFObject,
    ) -> PDFResult<PDFObject> {
        if !self.applies_to(id, &object) {
            return Ok(object);
        }
        decrypt_strings(decryptor, id, object)
    }
}

fn decrypt_strings(decryptor: &dyn Decryptor, id: ObjectId, object: PDFObject) -> PDFResult<PDFObject> {
    Ok(match object {
        PDFObject::String(bytes) => PDFObject::String(decryptor.decrypt(id, &bytes)?),
        PDFObject::HexString(bytes) => PDFObject::HexString(decryptor.decrypt(id, &bytes)?),
        PDFObject::Array(items) => PDFObject::Array(
            items
                .into_iter()
                .map(|item| decrypt_strings(decryptor, id, item))
                .collect::<PDFResult<_>>()?,
        ),
        PDFObject::Dictionary(dict) => PDFObject::Dictionary(decrypt_dict(decryptor, id, dict)?),
        PDFObject::Stream { dict, data } => PDFObject::Stream {
            dict: decrypt_dict(decryptor, id, dict)?,
            data: decryptor.decrypt(id, &data)?,
        },
        other => other,
    })
}

fn decrypt_dict(decryptor: &dyn Decryptor, id: ObjectId, mut dict: Dictionary) -> PDFResult<Dictionary> {
    for value in dict.values_mut() {
        let taken = std::mem::replace(value, PDFObject::Null);
        *value = decrypt_strings(decryptor, id, taken)?;
    }
    Ok(dict)
}
