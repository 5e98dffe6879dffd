//! Decode state and container building
//!
//! Decoding is an explicit fold `(DecodeState, Line) -> DecodeState`. The
//! state carries the section context set by the most recent declaration; an
//! assignment takes its section *kind* from that context and its section id
//! from its own text.
//!
//! Input ordering is a precondition, not something checked here: `uci show`
//! emits every section's declaration immediately followed by that section's
//! options, and an assignment seen under a different declaration is filed
//! under whichever kind was declared last.

use crate::document::{Document, Section, SectionGroup};
use crate::line::{classify, Line, SectionId};
use indexmap::IndexMap;

/// Largest gap `IndexPlacement::Positional` pads over in one step.
const MAX_POSITIONAL_PADDING: usize = 1 << 16;

/// Where an anonymous section lands inside a `List` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPlacement {
    /// A new empty section is appended whenever `index >= len`; the literal
    /// index is only used to look the section up afterwards. `[0]` then `[2]`
    /// yields two appends rather than a gap.
    #[default]
    Append,
    /// The list is padded with empty sections so that `[n]` always lands at
    /// position `n`.
    Positional,
}

/// Options for a decode pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Store anonymous sections as lists instead of maps keyed by index
    pub native_type: bool,
    pub placement: IndexPlacement,
}

impl DecodeOptions {
    pub fn new(native_type: bool) -> Self {
        Self {
            native_type,
            placement: IndexPlacement::default(),
        }
    }

    pub fn with_placement(mut self, placement: IndexPlacement) -> Self {
        self.placement = placement;
        self
    }
}

/// Context set by the last section declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionContext {
    pub package: String,
    pub kind: String,
    pub section: String,
}

/// Transient state of one decode pass
#[derive(Debug, Clone)]
pub struct DecodeState {
    options: DecodeOptions,
    context: Option<SectionContext>,
    document: Document,
}

impl DecodeState {
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            options,
            context: None,
            document: Document::new(),
        }
    }

    /// The active section context, if any declaration has been seen
    pub fn context(&self) -> Option<&SectionContext> {
        self.context.as_ref()
    }

    /// Fold one classified line into the state.
    pub fn apply(mut self, line: Line<'_>) -> Self {
        match line {
            Line::Declaration {
                package,
                section,
                kind,
            } => {
                self.context = Some(SectionContext {
                    package: package.to_string(),
                    kind: kind.to_string(),
                    section: section.to_string(),
                });
                ensure_section(&mut self.document, self.options, package, kind, &section);
            }
            Line::Assignment {
                package,
                section,
                option,
                value,
            } => {
                let Some(context) = &self.context else {
                    tracing::debug!(package, %section, option, "assignment before any section declaration, skipping");
                    return self;
                };
                let kind = context.kind.as_str();
                match ensure_section(&mut self.document, self.options, package, kind, &section) {
                    Some(target) => target.set(option, value),
                    None => {
                        tracing::debug!(package, kind, %section, option, "no slot for assignment, skipping");
                    }
                }
            }
            Line::Unrecognized => {}
        }
        self
    }

    pub fn finish(self) -> Document {
        self.document
    }
}

/// Decode a `uci show` dump.
///
/// With `native_type`, kinds whose first section is anonymous are stored as
/// lists; otherwise anonymous sections are keyed by their decimal index.
pub fn decode(text: &str, native_type: bool) -> Document {
    decode_with(text, DecodeOptions::new(native_type))
}

/// Decode with explicit options.
pub fn decode_with(text: &str, options: DecodeOptions) -> Document {
    text.lines()
        .fold(DecodeState::new(options), |state, raw| {
            let line = classify(raw);
            if line.is_unrecognized() && !raw.trim().is_empty() {
                tracing::trace!(line = raw, "skipping unrecognized line");
            }
            state.apply(line)
        })
        .finish()
}

/// Make sure the section exists under `package`/`kind` and return it.
///
/// The group representation is picked here on first reference to `kind`.
/// Returns `None` when the section can't be placed in an existing group: a
/// named id inside a `List` group, or an index beyond what the placement
/// rule covers.
fn ensure_section<'d>(
    document: &'d mut Document,
    options: DecodeOptions,
    package: &str,
    kind: &str,
    section: &SectionId<'_>,
) -> Option<&'d mut Section> {
    let group = document.package_mut(package).group_mut_or_insert_with(kind, || {
        if options.native_type && section.is_anonymous() {
            SectionGroup::List(Vec::new())
        } else {
            SectionGroup::Named(IndexMap::new())
        }
    });

    match (group, section) {
        (SectionGroup::Named(sections), id) => Some(sections.entry(id.key()).or_default()),
        (SectionGroup::List(sections), SectionId::Anonymous { index, .. }) => {
            list_slot(sections, *index, options.placement)
        }
        (SectionGroup::List(_), SectionId::Named(_)) => None,
    }
}

fn list_slot(
    sections: &mut Vec<Section>,
    index: usize,
    placement: IndexPlacement,
) -> Option<&mut Section> {
    if index >= sections.len() {
        match placement {
            IndexPlacement::Append => sections.push(Section::default()),
            IndexPlacement::Positional => {
                if index - sections.len() > MAX_POSITIONAL_PADDING {
                    return None;
                }
                sections.resize_with(index + 1, Section::default);
            }
        }
    }
    sections.get_mut(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(lines: &[&str], options: DecodeOptions) -> DecodeState {
        lines
            .iter()
            .fold(DecodeState::new(options), |state, raw| state.apply(classify(raw)))
    }

    #[test]
    fn test_context_follows_last_declaration() {
        let state = fold(
            &["network.wan=interface", "firewall.@zone[1]=zone", "bogus"],
            DecodeOptions::new(true),
        );

        assert_eq!(
            state.context(),
            Some(&SectionContext {
                package: "firewall".to_string(),
                kind: "zone".to_string(),
                section: "@zone[1]".to_string(),
            })
        );
    }

    #[test]
    fn test_assignment_uses_tracked_kind() {
        // The attribute line names `lan`, but the last declared kind is `device`.
        let doc = fold(
            &["network.@device[0]=device", "network.lan.proto='static'"],
            DecodeOptions::new(false),
        )
        .finish();

        let device = &doc["network"]["device"];
        assert_eq!(device.len(), 2);
        assert_eq!(&device["lan"]["proto"], "static");
        assert!(doc["network"].get("interface").is_none());
    }

    #[test]
    fn test_assignment_without_declaration_is_skipped() {
        let doc = fold(&["network.wan.proto='dhcp'"], DecodeOptions::new(true)).finish();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_named_id_in_list_group_is_dropped() {
        let doc = fold(
            &[
                "network.@device[0]=device",
                "network.@device[0].name='eth0'",
                "network.br=device",
                "network.br.name='br-lan'",
            ],
            DecodeOptions::new(true),
        )
        .finish();

        let device = &doc["network"]["device"];
        assert!(device.is_list());
        assert_eq!(device.len(), 1);
        assert_eq!(&device[0]["name"], "eth0");
    }

    #[test]
    fn test_anonymous_id_in_named_group_uses_decimal_key() {
        let doc = fold(
            &[
                "network.br=device",
                "network.@device[1]=device",
                "network.@device[1].name='eth1'",
            ],
            DecodeOptions::new(true),
        )
        .finish();

        let device = &doc["network"]["device"];
        assert!(!device.is_list());
        assert_eq!(&device["1"]["name"], "eth1");
    }

    #[test]
    fn test_append_placement_out_of_range_assignment_is_dropped() {
        // [0] is never declared, so [3] appends at position 0 and has no slot at 3.
        let doc = fold(
            &["network.@device[3]=device", "network.@device[3].name='eth3'"],
            DecodeOptions::new(true),
        )
        .finish();

        let device = &doc["network"]["device"];
        assert_eq!(device.len(), 2);
        assert!(device.sections().all(Section::is_empty));
    }

    #[test]
    fn test_positional_padding_is_bounded() {
        let mut sections = Vec::new();
        let far = MAX_POSITIONAL_PADDING + 1;
        assert!(list_slot(&mut sections, far, IndexPlacement::Positional).is_none());
        assert!(sections.is_empty());

        assert!(list_slot(&mut sections, 4, IndexPlacement::Positional).is_some());
        assert_eq!(sections.len(), 5);
    }
}
