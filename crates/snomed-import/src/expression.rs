//! Tolerant parser for compositional expressions.
//!
//! Import rows define concepts with expressions such as:
//!
//! ```text
//! === 64572001 | Disease |: { 363698007 | Finding site | = 53134007 | Structure of paraurethral ducts ,
//!     116676008 | Associated morphology | = 367643001 | Cyst}
//! ```
//!
//! Authors paste these from browsers, so labels often lose their closing pipe.
//! Parsing runs in two stages: [`make_machine_readable`] strips labels and
//! whitespace to get `===64572001:{363698007=53134007,116676008=367643001}`,
//! then the `extract_*` functions consume the canonical text front to back,
//! each returning its value together with the unconsumed remainder.

use snomed_import_types::{DefinitionStatus, Group, ParsedExpression, Relationship};
use tracing::debug;

use crate::types::{ImportError, ImportResult};

/// Marker for a fully defined expression.
pub const FULLY_DEFINED_MARKER: &str = "===";
/// Marker for a primitive expression.
pub const PRIMITIVE_MARKER: &str = "<<<";

/// Byte order mark that spreadsheet exports leave in front of the first cell.
const BOM: char = '\u{feff}';

/// Parses a raw expression into a [`ParsedExpression`].
///
/// # Errors
/// Returns [`ImportError::MalformedExpression`] if the marker is unknown or a
/// concept reference is missing where the grammar requires one.
///
/// # Example
///
/// ```
/// use snomed_import::expression;
///
/// let parsed = expression::parse("<<< 133906008 | Postpartum care   {260870009  | Priority = 373113001 | Routine}")?;
/// assert_eq!(parsed.focus_concepts, vec!["133906008"]);
/// assert_eq!(parsed.groups[0].relationships[0].target_id, "373113001");
/// # Ok::<(), snomed_import::ImportError>(())
/// ```
pub fn parse(raw: &str) -> ImportResult<ParsedExpression> {
    let canonical = make_machine_readable(raw);
    parse_canonical(&canonical).map_err(|err| match err {
        ImportError::MalformedExpression { reason, .. } => {
            ImportError::malformed_expression(raw.trim(), reason)
        }
        other => other,
    })
}

fn parse_canonical(canonical: &str) -> ImportResult<ParsedExpression> {
    let (definition_status, rest) = extract_definition_status(canonical)?;
    let (focus_concepts, rest) = extract_focus_concepts(rest)?;
    let groups = extract_groups(rest)?;

    debug!(
        expression = canonical,
        focus_concepts = focus_concepts.len(),
        groups = groups.len(),
        "parsed expression"
    );

    Ok(ParsedExpression {
        definition_status,
        focus_concepts,
        groups,
    })
}

/// Removes every occurrence of `c` from `s`, keeping all other characters in
/// their original order.
pub fn remove(s: &str, c: char) -> String {
    s.chars().filter(|&ch| ch != c).collect()
}

/// Strips labels and whitespace, producing the canonical expression text.
///
/// ```
/// use snomed_import::expression::make_machine_readable;
///
/// assert_eq!(
///     make_machine_readable("<<< 73211009 |Diabetes mellitus| + 49601007 |Disorder of cardiovascular system|"),
///     "<<<73211009+49601007"
/// );
/// ```
pub fn make_machine_readable(raw: &str) -> String {
    // Label boundaries are found on bytes, so non-ASCII spaces become ASCII first.
    let spaced: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let stripped = strip_labels(&spaced);
    remove(&stripped, BOM)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Consumes the leading `===` or `<<<` marker.
pub fn extract_definition_status(canonical: &str) -> ImportResult<(DefinitionStatus, &str)> {
    if let Some(rest) = canonical.strip_prefix(FULLY_DEFINED_MARKER) {
        Ok((DefinitionStatus::FullyDefined, rest))
    } else if let Some(rest) = canonical.strip_prefix(PRIMITIVE_MARKER) {
        Ok((DefinitionStatus::Primitive, rest))
    } else {
        Err(ImportError::malformed_expression(
            canonical,
            format!(
                "expected definition status marker '{}' or '{}'",
                FULLY_DEFINED_MARKER, PRIMITIVE_MARKER
            ),
        ))
    }
}

/// Consumes `+`-separated focus concepts up to an optional `:` (consumed) or
/// the first `{` (left in place).
pub fn extract_focus_concepts(canonical: &str) -> ImportResult<(Vec<String>, &str)> {
    let end = canonical
        .find(|c: char| c == ':' || c == '{')
        .unwrap_or(canonical.len());
    let (focus_text, rest) = canonical.split_at(end);
    let rest = rest.strip_prefix(':').unwrap_or(rest);

    let focus_concepts = focus_text
        .split('+')
        .map(|id| {
            if is_concept_id(id) {
                Ok(id.to_string())
            } else {
                Err(ImportError::malformed_expression(
                    canonical,
                    format!("expected focus concept id, found '{}'", id),
                ))
            }
        })
        .collect::<ImportResult<Vec<_>>>()?;

    Ok((focus_concepts, rest))
}

/// Extracts `{...}` refinement groups, numbering them from 1 in text order.
///
/// Groups may be separated by commas. An empty block is not materialized and
/// does not consume a group number; a final block missing its `}` runs to the
/// end of the text.
pub fn extract_groups(canonical: &str) -> ImportResult<Vec<Group>> {
    let mut groups: Vec<Group> = Vec::new();
    let mut rest = canonical;

    loop {
        rest = rest.trim_start_matches(',');
        if rest.is_empty() {
            break;
        }

        let Some(body) = rest.strip_prefix('{') else {
            return Err(ImportError::malformed_expression(
                canonical,
                format!("expected '{{' to open a refinement group, found '{}'", rest),
            ));
        };

        let (content, after) = match body.find('}') {
            Some(close) => (&body[..close], &body[close + 1..]),
            None => {
                debug!(expression = canonical, "refinement group not closed");
                (body, "")
            }
        };

        if content.contains('{') {
            return Err(ImportError::malformed_expression(
                canonical,
                "nested refinement groups are not supported",
            ));
        }

        let relationships = extract_relationships(content, canonical)?;
        rest = after;

        if relationships.is_empty() {
            debug!(expression = canonical, "skipping empty refinement group");
            continue;
        }

        let group_number = u16::try_from(groups.len() + 1).map_err(|_| {
            ImportError::malformed_expression(canonical, "too many refinement groups")
        })?;
        groups.push(Group {
            group_number,
            relationships,
        });
    }

    Ok(groups)
}

/// Splits the inside of one group into `type=target` pairs.
fn extract_relationships(content: &str, canonical: &str) -> ImportResult<Vec<Relationship>> {
    content
        .split(',')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (type_id, target_id) = pair.split_once('=').ok_or_else(|| {
                ImportError::malformed_expression(
                    canonical,
                    format!("expected 'type=target' in refinement, found '{}'", pair),
                )
            })?;
            if !is_concept_id(type_id) || !is_concept_id(target_id) {
                return Err(ImportError::malformed_expression(
                    canonical,
                    format!("expected concept ids on both sides of '{}'", pair),
                ));
            }
            Ok(Relationship::new(type_id, target_id))
        })
        .collect()
}

fn is_concept_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ═══════════════════════════════════════════════════════════════════════════
// LABEL STRIPPING
// ═══════════════════════════════════════════════════════════════════════════

/// Where a label that opened after a `|` stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelEnd {
    /// Terminated by the pipe at this offset.
    Closed(usize),
    /// No usable closing pipe; the label text stops before this offset.
    Open(usize),
}

/// Copies `raw` with every `|label|` removed, keeping all other characters.
fn strip_labels(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut pos = 0;

    while let Some(offset) = raw[pos..].find('|') {
        let open = pos + offset;
        out.push_str(&raw[pos..open]);
        pos = match label_end(bytes, open + 1) {
            LabelEnd::Closed(close) => close + 1,
            LabelEnd::Open(end) => end,
        };
    }

    out.push_str(&raw[pos..]);
    out
}

/// Decides where a label starting at byte offset `start` ends.
///
/// A following pipe wins when it is a clean close. Otherwise the label stops
/// at the first separator from which [`starts_concept_ref`] sees the next
/// concept reference or the end of input. If neither applies, the next pipe
/// closes the label after all.
///
/// When the only lookahead match is the tail of the input (end of text or a
/// trailing `}`), a bare concept reference without a label, as found by
/// [`starts_bare_concept_ref`], ends the label earlier.
fn label_end(bytes: &[u8], start: usize) -> LabelEnd {
    let next_pipe = bytes[start..]
        .iter()
        .position(|&b| b == b'|')
        .map(|i| start + i);

    if let Some(pipe) = next_pipe {
        if is_clean_close(bytes, pipe) {
            return LabelEnd::Closed(pipe);
        }
    }

    let limit = next_pipe.unwrap_or(bytes.len());
    let lookahead = (start..=limit)
        .find(|&at| (at == bytes.len() || is_separator(bytes[at])) && starts_concept_ref(bytes, at));
    let lookahead = match lookahead {
        Some(end) if bytes[end..].iter().all(|&b| is_separator(b)) => (start..end)
            .find(|&at| is_separator(bytes[at]) && starts_bare_concept_ref(bytes, at))
            .or(Some(end)),
        other => other,
    };

    match (lookahead, next_pipe) {
        (Some(end), _) => LabelEnd::Open(end),
        (None, Some(pipe)) => LabelEnd::Closed(pipe),
        (None, None) => LabelEnd::Open(bytes.len()),
    }
}

/// A pipe is a clean close when only whitespace separates it from a
/// structural character or the end of input.
fn is_clean_close(bytes: &[u8], pipe: usize) -> bool {
    match bytes[pipe + 1..].iter().find(|b| !b.is_ascii_whitespace()) {
        None => true,
        Some(&b) => is_structural(b),
    }
}

/// Peeks from `at`: after skipping separators, is there either nothing left
/// or a digit run followed (after optional whitespace) by a `|`?
fn starts_concept_ref(bytes: &[u8], at: usize) -> bool {
    let mut i = at;
    while i < bytes.len() && is_separator(bytes[i]) {
        i += 1;
    }
    if i == bytes.len() {
        return true;
    }

    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return false;
    }

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i < bytes.len() && bytes[i] == b'|'
}

/// Peeks from `at` for an unlabelled reference such as `, 3 = 4`: separators
/// holding at least one structural character, a digit run, optional
/// whitespace, then `=`, `,`, `}` or the end of input.
fn starts_bare_concept_ref(bytes: &[u8], at: usize) -> bool {
    let mut i = at;
    let mut structural = false;
    while i < bytes.len() && is_separator(bytes[i]) {
        structural |= is_structural(bytes[i]);
        i += 1;
    }
    if !structural {
        return false;
    }

    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return false;
    }

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i == bytes.len() || matches!(bytes[i], b'=' | b',' | b'}')
}

fn is_structural(b: u8) -> bool {
    matches!(b, b'=' | b',' | b'}' | b'{' | b':' | b'+')
}

fn is_separator(b: u8) -> bool {
    is_structural(b) || b.is_ascii_whitespace()
}
