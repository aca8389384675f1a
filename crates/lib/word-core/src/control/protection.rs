//! Editing restrictions and content signatures.
//!
//! Protection is Word's `w:documentProtection` setting: a password hash that
//! a conforming editor checks before lifting the restriction. The hash follows
//! ISO/IEC 29500: SHA-512 over the salt and the UTF-16LE password, then
//! `spinCount` rounds of `H(hash || u32le(round))`.
//!
//! A signature is a SHA-256 digest of every part except the property parts,
//! recorded with the signer's details as custom document properties.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use word_ooxml::schema::{
    CT_CUSTOM_PROPS, CUSTOM_PROPS_FMTID, NS_CUSTOM_PROPS, NS_VT, PART_CORE_PROPS,
    PART_CUSTOM_PROPS, REL_CUSTOM_PROPS, REL_SETTINGS,
};
use word_ooxml::{Package, XmlDocument, XmlElement};

use crate::body::{
    RPR_ORDER, body_paragraph_positions, max_numeric_attr, new_paragraph, paragraph_text,
    set_ordered,
};
use crate::document::Document;
use crate::settings::{set_setting, update_settings};

use super::content::append_block;
use super::{ControlError, DocumentControl, require_text, utc_timestamp};

const SPIN_COUNT: u32 = 100_000;
const SALT_LEN: usize = 16;
const SHA512_SID: &str = "14";

const PROP_SIGNER: &str = "SignatureSigner";
const PROP_REASON: &str = "SignatureReason";
const PROP_SIGNED_AT: &str = "SignatureTimestamp";
const PROP_DIGEST: &str = "SignatureDigest";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionChanged {
    pub protected: bool,
    pub edit_mode: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictedEditing {
    pub editable_sections: Vec<String>,
    pub unmatched_sections: Vec<String>,
    pub editable_paragraphs: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signer: String,
    pub reason: Option<String>,
    pub signed_at: String,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub protected: bool,
    pub enforced: bool,
    pub edit_mode: Option<String>,
    pub algorithm: Option<String>,
    /// Whether the given password matches; `None` when none was given or
    /// the protection carries no hash.
    pub password_valid: Option<bool>,
    pub signature: Option<SignatureInfo>,
    pub signature_valid: Option<bool>,
}

impl DocumentControl {
    /// Restricts the document to read-only editing behind `password`.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty password.
    pub async fn protect_document(
        &self,
        filename: &str,
        password: &str,
    ) -> Result<ProtectionChanged, ControlError> {
        if password.is_empty() {
            return Err(ControlError::InvalidInput("password is required".to_string()));
        }
        let protection = protection_element(password, "readOnly");
        self.edit(filename, "protect_document", |doc| {
            update_settings(doc, |settings| {
                set_setting(settings, protection);
                Ok(())
            })?;
            Ok(ProtectionChanged {
                protected: true,
                edit_mode: Some("readOnly".to_string()),
                message: "Document protected (read-only)".to_string(),
            })
        })
        .await
    }

    /// Lifts protection after checking `password` against the stored hash.
    ///
    /// # Errors
    /// Returns `InvalidInput` when the document is not protected and
    /// `PermissionDenied` for a wrong password.
    pub async fn unprotect_document(
        &self,
        filename: &str,
        password: &str,
    ) -> Result<ProtectionChanged, ControlError> {
        self.edit(filename, "unprotect_document", |doc| {
            update_settings(doc, |settings| {
                let Some(protection) = settings.child("w:documentProtection") else {
                    return Err(ControlError::InvalidInput(
                        "Document is not protected".to_string(),
                    ));
                };
                if verify_password(protection, password)? == Some(false) {
                    return Err(ControlError::PermissionDenied(
                        "Incorrect password".to_string(),
                    ));
                }
                settings.remove_children_named("w:documentProtection");
                Ok(())
            })?;
            Ok(ProtectionChanged {
                protected: false,
                edit_mode: None,
                message: "Document protection removed".to_string(),
            })
        })
        .await
    }

    /// Protects the document read-only except for body paragraphs containing
    /// one of `editable_sections`, which become editable by everyone.
    ///
    /// # Errors
    /// Returns `NotFound` when no paragraph matches any section text.
    pub async fn add_restricted_editing(
        &self,
        filename: &str,
        password: &str,
        editable_sections: &[String],
    ) -> Result<RestrictedEditing, ControlError> {
        if password.is_empty() {
            return Err(ControlError::InvalidInput("password is required".to_string()));
        }
        let sections: Vec<&String> = editable_sections
            .iter()
            .filter(|section| !section.trim().is_empty())
            .collect();
        if sections.is_empty() {
            return Err(ControlError::InvalidInput(
                "editable_sections must name at least one section".to_string(),
            ));
        }
        let protection = protection_element(password, "readOnly");
        self.edit(filename, "add_restricted_editing", |doc| {
            let mut next_id = max_numeric_attr(doc.root(), "w:id", &|el| {
                el.is("w:permStart") || el.is("w:permEnd")
            })
            .map_or(0, |max| max + 1);

            let body = doc.body_mut()?;
            let mut matched = vec![false; sections.len()];
            let mut editable_paragraphs = Vec::new();
            for (ordinal, position) in body_paragraph_positions(body).into_iter().enumerate() {
                let Some(paragraph) = body.children[position].as_element_mut() else {
                    continue;
                };
                let text = paragraph_text(paragraph);
                let mut hit = false;
                for (index, section) in sections.iter().enumerate() {
                    if text.contains(section.as_str()) {
                        matched[index] = true;
                        hit = true;
                    }
                }
                if hit {
                    wrap_permission(paragraph, next_id);
                    next_id += 1;
                    editable_paragraphs.push(ordinal);
                }
            }
            if editable_paragraphs.is_empty() {
                return Err(ControlError::NotFound(
                    "None of the editable sections were found in the document".to_string(),
                ));
            }
            update_settings(doc, |settings| {
                set_setting(settings, protection);
                Ok(())
            })?;

            let (found, missing): (Vec<_>, Vec<_>) =
                sections.iter().zip(matched).partition(|(_, hit)| *hit);
            Ok(RestrictedEditing {
                editable_sections: found.into_iter().map(|(s, _)| (*s).clone()).collect(),
                unmatched_sections: missing.into_iter().map(|(s, _)| (*s).clone()).collect(),
                editable_paragraphs,
            })
        })
        .await
    }

    /// Appends a visible signature line and records the signer and a content
    /// digest in the custom document properties.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a blank signer.
    pub async fn add_digital_signature(
        &self,
        filename: &str,
        signer_name: &str,
        reason: Option<&str>,
    ) -> Result<SignatureInfo, ControlError> {
        require_text(signer_name, "signer_name")?;
        let reason = reason.map(str::trim).filter(|reason| !reason.is_empty());
        self.edit(filename, "add_digital_signature", |doc| {
            let signed_at = utc_timestamp();
            let mut line = format!("Digitally signed by {signer_name} on {signed_at}");
            if let Some(reason) = reason {
                line.push_str(&format!(" (Reason: {reason})"));
            }
            let mut paragraph = new_paragraph(&line, None);
            for run in paragraph.children_named_mut("w:r") {
                set_ordered(run.ensure_first_child("w:rPr"), XmlElement::new("w:i"), RPR_ORDER);
            }
            append_block(doc.body_mut()?, paragraph);

            let mut properties = read_custom_properties(doc.package())?;
            properties.retain(|(name, _)| {
                ![PROP_SIGNER, PROP_REASON, PROP_SIGNED_AT, PROP_DIGEST].contains(&name.as_str())
            });
            properties.push((PROP_SIGNER.to_string(), signer_name.to_string()));
            if let Some(reason) = reason {
                properties.push((PROP_REASON.to_string(), reason.to_string()));
            }
            properties.push((PROP_SIGNED_AT.to_string(), signed_at.clone()));

            // The custom part must exist before hashing: adding it touches
            // the content types and package relationships.
            doc.package_mut().add_related_part(
                "",
                PART_CUSTOM_PROPS,
                REL_CUSTOM_PROPS,
                CT_CUSTOM_PROPS,
                custom_properties_xml(&properties).to_bytes(),
            )?;
            let main = doc.main_xml().into_bytes();
            let digest = content_digest(doc.package(), Some((doc.main_part(), &main)));
            properties.push((PROP_DIGEST.to_string(), digest.clone()));
            doc.package_mut()
                .set_part(PART_CUSTOM_PROPS, custom_properties_xml(&properties).to_bytes());

            Ok(SignatureInfo {
                signer: signer_name.to_string(),
                reason: reason.map(ToString::to_string),
                signed_at,
                digest,
            })
        })
        .await
    }

    /// Reports protection state, password validity, and signature integrity.
    ///
    /// # Errors
    /// Returns `ControlError` when the document cannot be read.
    pub async fn verify_document(
        &self,
        filename: &str,
        password: Option<&str>,
    ) -> Result<VerificationReport, ControlError> {
        self.inspect(filename, "verify_document", |doc| {
            let settings = doc.load_related(REL_SETTINGS)?.map(|(_, settings)| settings);
            let protection = settings
                .as_ref()
                .and_then(|settings| settings.root.child("w:documentProtection"));
            let enforced = protection.is_some_and(|el| {
                el.attr("w:enforcement")
                    .is_some_and(|value| matches!(value, "1" | "true" | "on"))
            });
            let password_valid = match (protection, password) {
                (Some(protection), Some(password)) => verify_password(protection, password)?,
                _ => None,
            };
            let signature = read_signature(doc.package())?;
            let signature_valid = signature
                .as_ref()
                .map(|info| info.digest == content_digest(doc.package(), None));
            Ok(VerificationReport {
                protected: protection.is_some(),
                enforced,
                edit_mode: protection
                    .and_then(|el| el.attr("w:edit"))
                    .map(ToString::to_string),
                algorithm: protection.and_then(algorithm_name),
                password_valid,
                signature,
                signature_valid,
            })
        })
        .await
    }
}

fn password_hash(password: &str, salt: &[u8], spin_count: u32) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(salt);
    for unit in password.encode_utf16() {
        hasher.update(unit.to_le_bytes());
    }
    let mut hash = hasher.finalize().to_vec();
    for round in 0..spin_count {
        let mut hasher = Sha512::new();
        hasher.update(&hash);
        hasher.update(round.to_le_bytes());
        hash = hasher.finalize().to_vec();
    }
    hash
}

fn protection_element(password: &str, edit: &str) -> XmlElement {
    let mut salt = [0_u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = password_hash(password, &salt, SPIN_COUNT);
    XmlElement::new("w:documentProtection")
        .with_attr("w:edit", edit)
        .with_attr("w:enforcement", "1")
        .with_attr("w:cryptProviderType", "rsaAES")
        .with_attr("w:cryptAlgorithmClass", "hash")
        .with_attr("w:cryptAlgorithmType", "typeAny")
        .with_attr("w:cryptAlgorithmSid", SHA512_SID)
        .with_attr("w:cryptSpinCount", SPIN_COUNT.to_string())
        .with_attr("w:hash", STANDARD.encode(hash))
        .with_attr("w:salt", STANDARD.encode(salt))
}

/// Hash algorithm of a protection element, from either attribute form.
fn algorithm_name(protection: &XmlElement) -> Option<String> {
    if let Some(name) = protection.attr("w:algorithmName") {
        return Some(name.to_string());
    }
    match protection.attr("w:cryptAlgorithmSid")? {
        "1" => Some("MD2".to_string()),
        "2" => Some("MD4".to_string()),
        "3" => Some("MD5".to_string()),
        "4" => Some("SHA-1".to_string()),
        "12" => Some("SHA-256".to_string()),
        "13" => Some("SHA-384".to_string()),
        "14" => Some("SHA-512".to_string()),
        other => Some(format!("sid {other}")),
    }
}

/// `Some(matches)` for a SHA-512 protection hash, `None` when the protection
/// carries no hash.
fn verify_password(protection: &XmlElement, password: &str) -> Result<Option<bool>, ControlError> {
    let hash = protection
        .attr("w:hashValue")
        .or_else(|| protection.attr("w:hash"));
    let salt = protection
        .attr("w:saltValue")
        .or_else(|| protection.attr("w:salt"));
    let (Some(hash), Some(salt)) = (hash, salt) else {
        return Ok(None);
    };
    let algorithm = algorithm_name(protection);
    if algorithm.as_deref().is_some_and(|name| name != "SHA-512") {
        return Err(ControlError::Unsupported(format!(
            "Protection uses {}, only SHA-512 hashes can be verified",
            algorithm.unwrap_or_default()
        )));
    }
    let spin_count = protection
        .attr("w:spinCount")
        .or_else(|| protection.attr("w:cryptSpinCount"))
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(SPIN_COUNT);
    let decode = |value: &str| {
        STANDARD.decode(value).map_err(|err| {
            ControlError::Unsupported(format!("Protection hash is not valid base64: {err}"))
        })
    };
    let expected = decode(hash)?;
    let salt = decode(salt)?;
    Ok(Some(password_hash(password, &salt, spin_count) == expected))
}

fn wrap_permission(paragraph: &mut XmlElement, id: i64) {
    let id = id.to_string();
    let start_at = paragraph.child_index("w:pPr").map_or(0, |index| index + 1);
    paragraph.insert(
        start_at,
        XmlElement::new("w:permStart")
            .with_attr("w:id", &id)
            .with_attr("w:edGrp", "everyone"),
    );
    paragraph.push(XmlElement::new("w:permEnd").with_attr("w:id", id));
}

/// SHA-256 over every part except the core and custom property parts, in
/// part-name order. `main` substitutes unsaved main-part bytes.
fn content_digest(package: &Package, main: Option<(&str, &[u8])>) -> String {
    let mut names: Vec<&str> = package
        .part_names()
        .filter(|name| *name != PART_CUSTOM_PROPS && *name != PART_CORE_PROPS)
        .collect();
    names.sort_unstable();
    let mut hasher = Sha256::new();
    for name in names {
        let data = match main {
            Some((main_name, bytes)) if main_name == name => Some(bytes),
            _ => package.part(name),
        };
        hasher.update(name.as_bytes());
        hasher.update([0]);
        hasher.update(data.unwrap_or_default());
    }
    STANDARD.encode(hasher.finalize())
}

fn read_custom_properties(package: &Package) -> Result<Vec<(String, String)>, ControlError> {
    if !package.has_part(PART_CUSTOM_PROPS) {
        return Ok(Vec::new());
    }
    let xml = package.xml_part(PART_CUSTOM_PROPS)?;
    Ok(xml
        .root
        .elements()
        .filter(|el| el.local_name() == "property")
        .filter_map(|property| {
            let name = property.attr("name")?.to_string();
            let value = property.elements().next().map(XmlElement::text).unwrap_or_default();
            Some((name, value))
        })
        .collect())
}

fn custom_properties_xml(properties: &[(String, String)]) -> XmlDocument {
    let mut root = XmlElement::new("Properties")
        .with_attr("xmlns", NS_CUSTOM_PROPS)
        .with_attr("xmlns:vt", NS_VT);
    // Property ids 0 and 1 are reserved.
    for (pid, (name, value)) in (2_usize..).zip(properties) {
        root.push(
            XmlElement::new("property")
                .with_attr("fmtid", CUSTOM_PROPS_FMTID)
                .with_attr("pid", pid.to_string())
                .with_attr("name", name)
                .with_child(XmlElement::new("vt:lpwstr").with_text(value)),
        );
    }
    XmlDocument::new(root)
}

fn read_signature(package: &Package) -> Result<Option<SignatureInfo>, ControlError> {
    let properties = read_custom_properties(package)?;
    let get = |key: &str| {
        properties
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
    };
    let (Some(signer), Some(digest)) = (get(PROP_SIGNER), get(PROP_DIGEST)) else {
        return Ok(None);
    };
    Ok(Some(SignatureInfo {
        signer,
        reason: get(PROP_REASON),
        signed_at: get(PROP_SIGNED_AT).unwrap_or_default(),
        digest,
    }))
}

pub(crate) fn is_protected(doc: &Document) -> Result<bool, ControlError> {
    Ok(doc
        .load_related(REL_SETTINGS)?
        .is_some_and(|(_, settings)| settings.root.child("w:documentProtection").is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_depends_on_salt_and_password() {
        let salt = [7_u8; SALT_LEN];
        let first = password_hash("secret", &salt, 10);
        assert_eq!(first.len(), 64);
        assert_eq!(first, password_hash("secret", &salt, 10));
        assert_ne!(first, password_hash("Secret", &salt, 10));
        assert_ne!(first, password_hash("secret", &[8_u8; SALT_LEN], 10));
        assert_ne!(first, password_hash("secret", &salt, 11));
    }

    #[test]
    fn protection_element_verifies_its_password() {
        let protection = protection_element("hunter2", "readOnly");
        assert_eq!(protection.attr("w:cryptSpinCount"), Some("100000"));
        assert_eq!(algorithm_name(&protection).as_deref(), Some("SHA-512"));
        assert_eq!(verify_password(&protection, "hunter2").expect("verified"), Some(true));
        assert_eq!(verify_password(&protection, "hunter3").expect("verified"), Some(false));
        let bare = XmlElement::new("w:documentProtection").with_attr("w:edit", "readOnly");
        assert_eq!(verify_password(&bare, "x").expect("no hash"), None);
    }

    #[test]
    fn custom_properties_round_trip() {
        let mut package = Package::new_blank("", "");
        let properties = vec![
            ("Project".to_string(), "Apollo".to_string()),
            (PROP_SIGNER.to_string(), "Ann".to_string()),
            (PROP_DIGEST.to_string(), "abc".to_string()),
        ];
        package
            .add_related_part(
                "",
                PART_CUSTOM_PROPS,
                REL_CUSTOM_PROPS,
                CT_CUSTOM_PROPS,
                custom_properties_xml(&properties).to_bytes(),
            )
            .expect("added");
        assert_eq!(read_custom_properties(&package).expect("read"), properties);
        let signature = read_signature(&package).expect("read").expect("signed");
        assert_eq!(signature.signer, "Ann");
        assert_eq!(signature.reason, None);
    }

    #[test]
    fn digest_ignores_property_parts_only() {
        let mut package = Package::new_blank("", "");
        let before = content_digest(&package, None);
        package.set_part(PART_CORE_PROPS, b"<changed/>".to_vec());
        assert_eq!(before, content_digest(&package, None));
        package.set_part("word/media/image1.png", vec![1, 2, 3]);
        assert_ne!(before, content_digest(&package, None));
    }

    #[test]
    fn permission_markers_wrap_paragraph_content() {
        let mut paragraph = new_paragraph("editable", Some("Normal"));
        wrap_permission(&mut paragraph, 3);
        let names: Vec<_> = paragraph.elements().map(|el| el.name.as_str()).collect();
        assert_eq!(names, vec!["w:pPr", "w:permStart", "w:r", "w:permEnd"]);
    }
}
