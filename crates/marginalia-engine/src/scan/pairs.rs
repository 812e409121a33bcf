use marginalia_config::{CommentKind, Settings};

use super::cursor::Cursor;
use super::escape::EscapeRuns;
use super::types::AnnotationRange;
use crate::kinds;
use crate::span::Span;

/// Which paired markers a scan looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkerSet {
    pub star: bool,
    pub percent: bool,
}

impl MarkerSet {
    /// Kinds that are paired inside a line, i.e. enabled and in inline mode.
    pub fn inline(settings: &Settings) -> Self {
        Self {
            star: settings.star().is_inline(),
            percent: settings.percent().is_inline(),
        }
    }

    /// Every enabled kind regardless of scope.
    pub fn enabled(settings: &Settings) -> Self {
        Self {
            star: settings.star().enabled(),
            percent: settings.percent().enabled(),
        }
    }

    pub fn contains(self, kind: CommentKind) -> bool {
        match kind {
            CommentKind::Star => self.star,
            CommentKind::Percent => self.percent,
        }
    }

    pub fn is_empty(self) -> bool {
        !self.star && !self.percent
    }

    /// Active kinds in tie-break priority order.
    pub fn kinds(self) -> impl Iterator<Item = CommentKind> {
        CommentKind::ALL.into_iter().filter(move |&k| self.contains(k))
    }
}

/// Pairs unescaped open/close markers left to right.
///
/// The earliest opener among the active kinds wins; on an equal offset star
/// beats percent. An opener with no later closer of the same kind is a stray
/// literal and the scan moves one marker past it. Returned ranges are ordered
/// and never overlap.
pub fn scan_marker_pairs(text: &str, markers: MarkerSet, runs: &EscapeRuns) -> Vec<AnnotationRange> {
    let mut out = Vec::new();
    if markers.is_empty() {
        return out;
    }
    let mut cur = Cursor::new(text);
    let mut openers = Openers::new(markers);
    while !cur.eof() {
        let Some((kind, open)) = openers.earliest(&cur, runs) else {
            break;
        };
        let mark = kinds::marker(kind);
        let mut after_open = cur.clone();
        after_open.i = open + mark.len();
        match after_open.find_unescaped(mark, runs) {
            Some(close) => {
                let span = Span::new(open, close + mark.len());
                out.push(AnnotationRange::new(kind.into(), text, span));
                cur.i = span.end;
            }
            None => {
                openers.exhaust(kind);
                cur.i = open + mark.len();
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Unknown,
    At(usize),
    Exhausted,
}

/// Next opener candidate per kind. A candidate is searched for again only
/// once the cursor has moved past it, so every kind's search only moves
/// forward.
struct Openers {
    markers: MarkerSet,
    slots: [Candidate; 2],
}

impl Openers {
    fn new(markers: MarkerSet) -> Self {
        Self {
            markers,
            slots: [Candidate::Unknown; 2],
        }
    }

    fn slot(kind: CommentKind) -> usize {
        match kind {
            CommentKind::Star => 0,
            CommentKind::Percent => 1,
        }
    }

    fn earliest(&mut self, cur: &Cursor<'_>, runs: &EscapeRuns) -> Option<(CommentKind, usize)> {
        let mut best: Option<(CommentKind, usize)> = None;
        for kind in self.markers.kinds() {
            let slot = &mut self.slots[Self::slot(kind)];
            let at = match *slot {
                Candidate::Exhausted => continue,
                Candidate::At(at) if at >= cur.i => at,
                _ => match cur.find_unescaped(kinds::marker(kind), runs) {
                    Some(at) => {
                        *slot = Candidate::At(at);
                        at
                    }
                    None => {
                        *slot = Candidate::Exhausted;
                        continue;
                    }
                },
            };
            if best.is_none_or(|(_, b)| at < b) {
                best = Some((kind, at));
            }
        }
        best
    }

    /// No closer exists past an opener, so the kind has no pair left.
    fn exhaust(&mut self, kind: CommentKind) {
        self.slots[Self::slot(kind)] = Candidate::Exhausted;
    }
}
