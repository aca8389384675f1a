use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use word_ooxml::XmlElement;

use crate::body::{
    body_paragraph_position, is_heading_style, paragraph_style, paragraph_text, table_rows,
};

use super::{ControlError, DocumentControl, require_text};

/// Characters of context kept on each side of a match.
const CONTEXT_CHARS: usize = 40;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphText {
    pub index: usize,
    pub text: String,
    pub style: Option<String>,
    pub is_heading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextLocation {
    Paragraph {
        paragraph_index: usize,
    },
    TableCell {
        table_index: usize,
        row: usize,
        cell: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextOccurrence {
    pub location: TextLocation,
    /// Character offset of the match within the paragraph or cell text.
    pub position: usize,
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSearch {
    pub query: String,
    pub match_case: bool,
    pub whole_word: bool,
    pub total_count: usize,
    pub occurrences: Vec<TextOccurrence>,
}

impl DocumentControl {
    /// # Errors
    /// Returns `InvalidInput` for an out-of-range paragraph index.
    pub async fn get_paragraph_text_from_document(
        &self,
        filename: &str,
        paragraph_index: usize,
    ) -> Result<ParagraphText, ControlError> {
        self.inspect(filename, "get_paragraph_text_from_document", |doc| {
            let body = doc.body()?;
            let position = body_paragraph_position(body, paragraph_index)?;
            let paragraph = body.children[position]
                .as_element()
                .ok_or_else(|| ControlError::Unsupported("paragraph is not an element".into()))?;
            let style = paragraph_style(paragraph).map(ToString::to_string);
            Ok(ParagraphText {
                index: paragraph_index,
                text: paragraph_text(paragraph),
                is_heading: is_heading_style(style.as_deref()),
                style,
            })
        })
        .await
    }

    /// Finds every occurrence of `text_to_find` in body paragraphs and table cells.
    ///
    /// # Errors
    /// Returns `InvalidInput` for empty search text.
    pub async fn find_text_in_document(
        &self,
        filename: &str,
        text_to_find: &str,
        match_case: bool,
        whole_word: bool,
    ) -> Result<TextSearch, ControlError> {
        require_text(text_to_find, "text_to_find")?;
        let pattern = search_pattern(text_to_find, match_case, whole_word)?;
        self.inspect(filename, "find_text_in_document", |doc| {
            let mut occurrences = Vec::new();
            let mut paragraph_index = 0;
            let mut table_index = 0;
            for block in doc.body()?.elements() {
                match block.name.as_str() {
                    "w:p" => {
                        let location = TextLocation::Paragraph { paragraph_index };
                        collect(&pattern, &paragraph_text(block), &location, &mut occurrences);
                        paragraph_index += 1;
                    }
                    "w:tbl" => {
                        search_table(&pattern, block, table_index, &mut occurrences);
                        table_index += 1;
                    }
                    _ => {}
                }
            }
            Ok(TextSearch {
                query: text_to_find.to_string(),
                match_case,
                whole_word,
                total_count: occurrences.len(),
                occurrences,
            })
        })
        .await
    }
}

fn search_pattern(text: &str, match_case: bool, whole_word: bool) -> Result<Regex, ControlError> {
    let escaped = regex::escape(text);
    let pattern = if whole_word {
        format!(r"\b{escaped}\b")
    } else {
        escaped
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(!match_case)
        .build()
        .map_err(|err| ControlError::InvalidInput(format!("Invalid search text: {err}")))
}

fn search_table(
    pattern: &Regex,
    table: &XmlElement,
    table_index: usize,
    occurrences: &mut Vec<TextOccurrence>,
) {
    for (row_index, row) in table_rows(table).into_iter().enumerate() {
        for (cell_index, cell) in row.children_named("w:tc").enumerate() {
            let location = TextLocation::TableCell {
                table_index,
                row: row_index,
                cell: cell_index,
            };
            for paragraph in cell.children_named("w:p") {
                collect(pattern, &paragraph_text(paragraph), &location, occurrences);
            }
        }
    }
}

fn collect(
    pattern: &Regex,
    text: &str,
    location: &TextLocation,
    occurrences: &mut Vec<TextOccurrence>,
) {
    for found in pattern.find_iter(text) {
        let before = &text[..found.start()];
        let after = &text[found.end()..];
        let lead: String = {
            let mut chars: Vec<char> = before.chars().rev().take(CONTEXT_CHARS).collect();
            chars.reverse();
            chars.into_iter().collect()
        };
        let tail: String = after.chars().take(CONTEXT_CHARS).collect();
        occurrences.push(TextOccurrence {
            location: location.clone(),
            position: before.chars().count(),
            context: format!("{lead}{}{tail}", found.as_str()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(text: &str, needle: &str, match_case: bool, whole_word: bool) -> Vec<usize> {
        let pattern = search_pattern(needle, match_case, whole_word).expect("pattern");
        let mut occurrences = Vec::new();
        let location = TextLocation::Paragraph { paragraph_index: 0 };
        collect(&pattern, text, &location, &mut occurrences);
        occurrences.into_iter().map(|found| found.position).collect()
    }

    #[test]
    fn case_and_word_options_narrow_matches() {
        let text = "Cat scatter cat. CAT";
        assert_eq!(find(text, "cat", true, false), vec![5, 12]);
        assert_eq!(find(text, "cat", false, false), vec![0, 5, 12, 17]);
        assert_eq!(find(text, "cat", false, true), vec![0, 12, 17]);
    }

    #[test]
    fn special_characters_are_literal() {
        assert_eq!(find("costs $5 (net)", "$5 (net)", true, false), vec![6]);
    }

    #[test]
    fn positions_count_characters_and_context_is_bounded() {
        let text = format!("é{}needle{}", "x".repeat(60), "y".repeat(60));
        let pattern = search_pattern("needle", true, false).expect("pattern");
        let mut occurrences = Vec::new();
        collect(
            &pattern,
            &text,
            &TextLocation::Paragraph { paragraph_index: 2 },
            &mut occurrences,
        );
        assert_eq!(occurrences[0].position, 61);
        assert_eq!(occurrences[0].context.chars().count(), CONTEXT_CHARS * 2 + 6);
    }
}
