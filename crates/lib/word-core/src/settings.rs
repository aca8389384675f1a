//! `word/settings.xml` access with schema-ordered updates.

use word_ooxml::schema::{CT_SETTINGS, NS_R, NS_W, REL_SETTINGS};
use word_ooxml::template::PART_SETTINGS;
use word_ooxml::{XmlDocument, XmlElement};

use crate::body::set_ordered;
use crate::control::ControlError;
use crate::document::Document;

pub const SETTINGS_ORDER: &[&str] = &[
    "w:writeProtection", "w:view", "w:zoom", "w:removePersonalInformation",
    "w:removeDateAndTime", "w:doNotDisplayPageBoundaries", "w:displayBackgroundShape",
    "w:printPostScriptOverText", "w:printFractionalCharacterWidth", "w:printFormsData",
    "w:embedTrueTypeFonts", "w:embedSystemFonts", "w:saveSubsetFonts", "w:saveFormsData",
    "w:mirrorMargins", "w:alignBordersAndEdges", "w:bordersDoNotSurroundHeader",
    "w:bordersDoNotSurroundFooter", "w:gutterAtTop", "w:hideSpellingErrors",
    "w:hideGrammaticalErrors", "w:activeWritingStyle", "w:proofState", "w:formsDesign",
    "w:attachedTemplate", "w:linkStyles", "w:stylePaneFormatFilter", "w:stylePaneSortMethod",
    "w:documentType", "w:mailMerge", "w:revisionView", "w:trackRevisions",
    "w:doNotTrackMoves", "w:doNotTrackFormatting", "w:documentProtection",
    "w:autoFormatOverride", "w:styleLockTheme", "w:styleLockQFSet", "w:defaultTabStop",
    "w:autoHyphenation", "w:consecutiveHyphenLimit", "w:hyphenationZone",
    "w:doNotHyphenateCaps", "w:showEnvelope", "w:summaryLength", "w:clickAndTypeStyle",
    "w:defaultTableStyle", "w:evenAndOddHeaders", "w:bookFoldRevPrinting",
    "w:bookFoldPrinting", "w:bookFoldPrintingSheets", "w:drawingGridHorizontalSpacing",
    "w:drawingGridVerticalSpacing", "w:displayHorizontalDrawingGridEvery",
    "w:displayVerticalDrawingGridEvery", "w:doNotUseMarginsForDrawingGridOrigin",
    "w:drawingGridHorizontalOrigin", "w:drawingGridVerticalOrigin", "w:doNotShadeFormData",
    "w:noPunctuationKerning", "w:characterSpacingControl", "w:printTwoOnOne",
    "w:strictFirstAndLastChars", "w:noLineBreaksAfter", "w:noLineBreaksBefore",
    "w:savePreviewPicture", "w:doNotValidateAgainstSchema", "w:saveInvalidXml",
    "w:ignoreMixedContent", "w:alwaysShowPlaceholderText", "w:doNotDemarcateInvalidXml",
    "w:saveXmlDataOnly", "w:useXSLTWhenSaving", "w:saveThroughXslt", "w:showXMLTags",
    "w:alwaysMergeEmptyNamespace", "w:updateFields", "w:hdrShapeDefaults", "w:footnotePr",
    "w:endnotePr", "w:compat", "w:docVars", "w:rsids", "m:mathPr", "w:attachedSchema",
    "w:themeFontLang", "w:clrSchemeMapping", "w:doNotIncludeSubdocsInStats",
    "w:doNotAutoCompressPictures", "w:forceUpgrade", "w:captions", "w:readModeInkLockDown",
    "w:smartTagType", "sl:schemaLibrary", "w:shapeDefaults", "w:doNotEmbedSmartTags",
    "w:decimalSymbol", "w:listSeparator",
];

/// Loads the settings part, creating it when the package has none.
///
/// # Errors
/// Returns `ControlError` when existing parts are malformed.
pub fn settings_part(doc: &mut Document) -> Result<(String, XmlDocument), ControlError> {
    doc.ensure_related(REL_SETTINGS, PART_SETTINGS, CT_SETTINGS, || {
        XmlDocument::new(
            XmlElement::new("w:settings")
                .with_attr("xmlns:w", NS_W)
                .with_attr("xmlns:r", NS_R),
        )
    })
}

/// Applies `update` to the settings root and writes the part back.
///
/// # Errors
/// Returns `ControlError` when the settings part is malformed or `update` fails.
pub fn update_settings<T>(
    doc: &mut Document,
    update: impl FnOnce(&mut XmlElement) -> Result<T, ControlError>,
) -> Result<T, ControlError> {
    let (part, mut settings) = settings_part(doc)?;
    let result = update(&mut settings.root)?;
    doc.set_part_xml(&part, &settings);
    Ok(result)
}

/// Sets (or replaces) a settings child in schema order.
pub fn set_setting(settings: &mut XmlElement, element: XmlElement) {
    set_ordered(settings, element, SETTINGS_ORDER);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::content::blank_document;

    #[test]
    fn settings_are_inserted_in_schema_order() {
        let mut doc = blank_document();
        update_settings(&mut doc, |settings| {
            set_setting(settings, XmlElement::new("w:updateFields").with_attr("w:val", "true"));
            set_setting(
                settings,
                XmlElement::new("w:documentProtection").with_attr("w:edit", "readOnly"),
            );
            Ok(())
        })
        .expect("settings updated");
        let (_, settings) = settings_part(&mut doc).expect("settings");
        let names: Vec<_> = settings.root.elements().map(|el| el.name.clone()).collect();
        let protection = names.iter().position(|n| n == "w:documentProtection");
        let tab_stop = names.iter().position(|n| n == "w:defaultTabStop");
        let update = names.iter().position(|n| n == "w:updateFields");
        let compat = names.iter().position(|n| n == "w:compat");
        assert!(protection < tab_stop);
        assert!(update > tab_stop && update < compat);
    }
}
