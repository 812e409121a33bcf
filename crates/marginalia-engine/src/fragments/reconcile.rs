use html_escape::{encode_double_quoted_attribute, encode_text};
use marginalia_config::{CommentKind, Settings};
use std::cmp::Reverse;
use std::ops::Range;

use super::{Fragment, Nesting, TextIndex};
use crate::classify::{IgnoredLines, is_blank, line_mode_range_in, paragraph_kind_in};
use crate::kinds::{self, RubyGloss};
use crate::scan::{
    AnnotationRange, EscapeRuns, MarkerSet, gloss_parts, merge_ranges, scan_marker_pairs, scan_ruby,
};
use crate::span::Span;

/// Context the host knows about a fragment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotateOptions {
    /// The run is the content of a paragraph block, so paragraph mode applies.
    pub paragraph: bool,
    /// Host line index of the run's first buffer line.
    pub base_line: usize,
    /// Host lines that never qualify for line or paragraph mode.
    pub ignored: IgnoredLines,
    /// Buffer offsets of characters the host already unescaped. They never
    /// start a marker and never escape one.
    pub literal: Vec<usize>,
}

/// What the host should do with the enclosing paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParagraphAction {
    Keep,
    /// The block is a deleted comment; drop it with its tags.
    Drop,
    /// Put this class on the paragraph element itself.
    Class(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotated {
    pub fragments: Vec<Fragment>,
    pub paragraph: ParagraphAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Wrap(CommentKind),
    Delete,
    Ruby,
}

/// An insertion point: the gap before fragment `g`, or a byte offset strictly
/// inside a text fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Point {
    Gap(usize),
    Within(usize, usize),
}

impl Point {
    /// Fragments lying wholly between `start` and `end`.
    fn between(start: Point, end: Point) -> Range<usize> {
        let lo = match start {
            Point::Gap(g) => g,
            Point::Within(a, _) => a + 1,
        };
        let hi = match end {
            Point::Gap(g) | Point::Within(g, _) => g,
        };
        lo..hi.max(lo)
    }

    /// True when fragment `f` lies after this point.
    fn precedes(self, f: usize) -> bool {
        match self {
            Point::Gap(g) => f >= g,
            Point::Within(a, _) => f > a,
        }
    }

    /// True when fragment `f` lies before this point.
    fn follows(self, f: usize) -> bool {
        match self {
            Point::Gap(g) => f < g,
            Point::Within(b, _) => f < b,
        }
    }
}

/// Markup spliced in at a point. Closes sort before opens, opens before
/// glosses; among closes the inner one first, among opens the outer one.
#[derive(Debug, Clone)]
struct Insert {
    rank: (u8, Reverse<usize>),
    fragment: Fragment,
}

#[derive(Debug, Default)]
struct LocalEdits {
    deleted: Vec<Span>,
    inserts: Vec<(usize, Insert)>,
}

/// Side table of edits keyed by fragment index.
struct Edits {
    gaps: Vec<Vec<Insert>>,
    within: Vec<Option<LocalEdits>>,
    hidden: Vec<bool>,
    /// Tags of an element a range crosses; replaced by their host source.
    crossed: Vec<bool>,
}

impl Edits {
    fn new(len: usize) -> Self {
        Self {
            gaps: vec![Vec::new(); len + 1],
            within: (0..len).map(|_| None).collect(),
            hidden: vec![false; len],
            crossed: vec![false; len],
        }
    }

    fn local(&mut self, f: usize) -> &mut LocalEdits {
        self.within[f].get_or_insert_with(LocalEdits::default)
    }

    fn insert(&mut self, point: Point, insert: Insert) {
        match point {
            Point::Gap(g) => self.gaps[g].push(insert),
            Point::Within(f, offset) => self.local(f).inserts.push((offset, insert)),
        }
    }

    fn delete_text(&mut self, fragments: &[Fragment], index: &TextIndex, span: Span) {
        for (f, local) in index.pieces(span) {
            match fragments[f] {
                Fragment::Text(_) => self.local(f).deleted.push(local),
                _ => self.hidden[f] = true,
            }
        }
    }
}

struct Reconciler<'a> {
    fragments: &'a [Fragment],
    settings: &'a Settings,
    index: TextIndex,
    runs: EscapeRuns,
    nesting: Nesting,
    edits: Edits,
}

/// Splices comment containers, deletions and ruby markup into a fragment run.
///
/// Ranges are found on the concatenated buffer, so a comment may open in one
/// text fragment and close in another. Elements enclosing only one end of a
/// range are suppressed on both sides, leaving their host source text if
/// they have one. A range touching malformed markup, or a gloss split across
/// fragments, is left as plain text.
pub fn annotate(fragments: Vec<Fragment>, settings: &Settings, options: &AnnotateOptions) -> Annotated {
    if !settings.any_enabled() || fragments.is_empty() {
        return Annotated {
            fragments,
            paragraph: ParagraphAction::Keep,
        };
    }
    let index = TextIndex::new(&fragments);
    let runs = EscapeRuns::with_literals(index.buffer(), &options.literal);
    let mut paragraph = ParagraphAction::Keep;
    let mut planned: Vec<(AnnotationRange, Action)> = Vec::new();

    if let Some(kind) = leading_paragraph_kind(&fragments, &index, &runs, settings, options) {
        let comment = settings.comment(kind);
        if comment.delete() {
            return Annotated {
                fragments,
                paragraph: ParagraphAction::Drop,
            };
        }
        match comment.paragraph_class() {
            Some(class) => paragraph = ParagraphAction::Class(class.to_string()),
            None => {
                let buffer = index.buffer();
                let start = buffer.len() - buffer.trim_start().len();
                let end = buffer.trim_end().len();
                if start < end {
                    let range = AnnotationRange::new(kind.into(), buffer, Span::new(start, end));
                    planned.push((range, Action::Wrap(kind)));
                }
            }
        }
    }

    let (line_scopes, every_line_deleted) = line_scopes(&index, &runs, settings, options);
    if options.paragraph && every_line_deleted {
        return Annotated {
            fragments,
            paragraph: ParagraphAction::Drop,
        };
    }
    planned.extend(line_scopes);

    let scopes: Vec<(Span, Action)> = planned.iter().map(|(r, a)| (r.span, *a)).collect();
    for range in buffer_ranges(&fragments, &index, &runs, settings) {
        let clashes = scopes.iter().any(|&(scope, action)| {
            range.span.intersects(scope) && (action == Action::Delete || !scope.contains(range.span))
        });
        if clashes {
            log::trace!("dropping {:?} range overlapping a scope at {:?}", range.kind, range.span);
            continue;
        }
        let action = match range.kind.comment() {
            Some(kind) if settings.comment(kind).delete() => Action::Delete,
            Some(kind) => Action::Wrap(kind),
            None => Action::Ruby,
        };
        planned.push((range, action));
    }

    let mut reconciler = Reconciler {
        nesting: Nesting::new(&fragments),
        edits: Edits::new(fragments.len()),
        fragments: &fragments,
        settings,
        index,
        runs,
    };
    for (range, action) in &planned {
        reconciler.apply(range, *action);
    }
    reconciler.collapse_escapes();
    let edits = reconciler.edits;

    Annotated {
        fragments: rebuild(fragments, edits),
        paragraph,
    }
}

/// Inline comment pairs over the whole buffer, glosses per text fragment.
fn buffer_ranges(
    fragments: &[Fragment],
    index: &TextIndex,
    runs: &EscapeRuns,
    settings: &Settings,
) -> Vec<AnnotationRange> {
    let buffer = index.buffer();
    let pairs = scan_marker_pairs(buffer, MarkerSet::inline(settings), runs);
    if !settings.ruby() {
        return pairs;
    }
    let glosses = fragments
        .iter()
        .enumerate()
        .filter(|(_, fragment)| matches!(fragment, Fragment::Text(_)))
        .flat_map(|(f, _)| scan_ruby(buffer, index.segment(f)))
        .collect();
    merge_ranges(pairs, glosses)
}

fn leading_paragraph_kind(
    fragments: &[Fragment],
    index: &TextIndex,
    runs: &EscapeRuns,
    settings: &Settings,
    options: &AnnotateOptions,
) -> Option<CommentKind> {
    if !options.paragraph || options.ignored.contains(options.base_line) {
        return None;
    }
    if !matches!(fragments.first(), Some(Fragment::Text(_))) {
        return None;
    }
    let buffer = index.buffer();
    let first_line = Span::new(0, buffer.find('\n').unwrap_or(buffer.len()));
    paragraph_kind_in(buffer, first_line, settings, runs)
}

/// Line-mode scopes, plus whether every non-blank line is a deleted comment.
fn line_scopes(
    index: &TextIndex,
    runs: &EscapeRuns,
    settings: &Settings,
    options: &AnnotateOptions,
) -> (Vec<(AnnotationRange, Action)>, bool) {
    let buffer = index.buffer();
    let mut scopes = Vec::new();
    let mut content_lines = 0;
    let mut deleted_lines = 0;
    let mut consumed_break: Option<usize> = None;
    let mut line_start = 0;

    for (k, line) in buffer.split('\n').enumerate() {
        let line_span = Span::new(line_start, line_start + line.len());
        line_start = line_span.end + 1;
        if is_blank(line) {
            continue;
        }
        content_lines += 1;
        if options.ignored.contains(options.base_line + k) {
            continue;
        }
        let Some(range) = line_mode_range_in(buffer, line_span, settings, runs) else {
            continue;
        };
        let Some(kind) = range.kind.comment() else {
            continue;
        };
        if settings.comment(kind).delete() {
            let before = line_span.start.checked_sub(1).filter(|&b| consumed_break != Some(b));
            let span = match before {
                Some(b) => Span::new(b, line_span.end),
                None if line_span.end < buffer.len() => {
                    consumed_break = Some(line_span.end);
                    Span::new(line_span.start, line_span.end + 1)
                }
                None => line_span,
            };
            deleted_lines += 1;
            scopes.push((AnnotationRange::new(range.kind, buffer, span), Action::Delete));
        } else {
            scopes.push((range, Action::Wrap(kind)));
        }
    }
    (scopes, content_lines > 0 && deleted_lines == content_lines)
}

impl Reconciler<'_> {
    fn start_point(&self, byte: usize) -> Option<Point> {
        let (f, local) = self.index.locate(byte)?;
        Some(if local == 0 {
            Point::Gap(f)
        } else {
            Point::Within(f, local)
        })
    }

    fn end_point(&self, end: usize) -> Option<Point> {
        let (f, _) = self.index.locate(end.checked_sub(1)?)?;
        let segment = self.index.segment(f);
        Some(if end == segment.end {
            Point::Gap(f + 1)
        } else {
            Point::Within(f, end - segment.start)
        })
    }

    /// Moves a boundary that sits on a fragment edge outward over markup
    /// whose partner lies inside the range, so whole elements end up inside
    /// the container instead of crossing it.
    fn widen(&self, start: Point, end: Point) -> (Point, Point) {
        let mut widened_start = start;
        if let Point::Gap(mut g) = start {
            while g > 0 {
                let open = g - 1;
                let closes_inside = matches!(self.fragments[open], Fragment::Open { .. })
                    && self.nesting.partner(open).is_some_and(|c| end.follows(c));
                if !closes_inside {
                    break;
                }
                g -= 1;
            }
            widened_start = Point::Gap(g);
        }
        let mut widened_end = end;
        if let Point::Gap(mut g) = end {
            while g < self.fragments.len() {
                let opens_inside = matches!(self.fragments[g], Fragment::Close { .. })
                    && self.nesting.partner(g).is_some_and(|o| start.precedes(o));
                if !opens_inside {
                    break;
                }
                g += 1;
            }
            widened_end = Point::Gap(g);
        }
        (widened_start, widened_end)
    }

    fn apply(&mut self, range: &AnnotationRange, action: Action) {
        let (Some(start), Some(end)) = (self.start_point(range.span.start), self.end_point(range.span.end)) else {
            return;
        };
        if action == Action::Ruby {
            self.apply_ruby(range, start, end);
            return;
        }
        let (start, end) = self.widen(start, end);
        let inside = Point::between(start, end);

        if inside.clone().any(|f| self.nesting.is_malformed(f)) {
            log::trace!("leaving {:?} range at {:?} untouched: malformed markup", range.kind, range.span);
            return;
        }

        for f in inside.clone() {
            let Some(partner) = self.nesting.partner(f) else {
                continue;
            };
            if !inside.contains(&partner) {
                log::trace!("suppressing markup pair {f}/{partner} crossed by {:?}", range.span);
                self.edits.crossed[f] = true;
                self.edits.crossed[partner] = true;
            }
        }

        match action {
            Action::Wrap(kind) => {
                let class = encode_double_quoted_attribute(self.settings.comment(kind).class());
                self.edits.insert(
                    start,
                    Insert {
                        rank: (1, Reverse(range.span.end)),
                        fragment: Fragment::Open {
                            name: "span".to_string(),
                            raw: format!("<span class=\"{class}\">"),
                            source: None,
                        },
                    },
                );
                self.edits.insert(
                    end,
                    Insert {
                        rank: (0, Reverse(range.span.start)),
                        fragment: Fragment::Close {
                            name: "span".to_string(),
                            raw: "</span>".to_string(),
                            source: None,
                        },
                    },
                );
            }
            Action::Delete => {
                self.edits.delete_text(self.fragments, &self.index, range.span);
                for f in inside {
                    if self.fragments[f].buffer_text().is_none() {
                        self.edits.hidden[f] = true;
                    }
                }
            }
            Action::Ruby => {}
        }
    }

    /// Glosses are scanned per text fragment, so both ends share one.
    fn apply_ruby(&mut self, range: &AnnotationRange, start: Point, end: Point) {
        let Some((f, _)) = self.index.locate(range.span.start) else {
            return;
        };
        let Some(parts) = gloss_parts(&range.text) else {
            return;
        };
        let base = encode_text(parts.base);
        let reading = encode_text(parts.reading);
        let framed = start == Point::Gap(f)
            && end == Point::Gap(f + 1)
            && f > 0
            && self.fragments[f - 1].is_open("ruby")
            && self.fragments.get(f + 1).is_some_and(|next| next.is_close("ruby"));
        let raw = if framed && !parts.wrapped {
            RubyGloss::body_html(&base, &reading)
        } else {
            RubyGloss::html(&base, &reading)
        };
        self.edits.delete_text(self.fragments, &self.index, range.span);
        self.edits.insert(
            start,
            Insert {
                rank: (2, Reverse(0)),
                fragment: Fragment::Void { raw },
            },
        );
    }

    /// A run of N backslashes before an enabled marker keeps floor(N/2) of
    /// them. Works on the buffer, so runs split across fragments collapse too.
    fn collapse_escapes(&mut self) {
        let buffer = self.index.buffer();
        for kind in MarkerSet::enabled(self.settings).kinds() {
            let mark = kinds::marker(kind);
            let step = mark.chars().next().map_or(1, char::len_utf8);
            let mut from = 0;
            while let Some(found) = buffer[from..].find(mark) {
                let at = from + found;
                let run = self.runs.run_before(at);
                if run > 0 && !self.runs.is_literal(Span::new(at, at + mark.len())) {
                    let drop = Span::new(at - run, at - run + run.div_ceil(2));
                    self.edits.delete_text(self.fragments, &self.index, drop);
                }
                from = at + step;
            }
        }
    }
}

fn rebuild(fragments: Vec<Fragment>, mut edits: Edits) -> Vec<Fragment> {
    let mut out = Vec::with_capacity(fragments.len());
    let len = fragments.len();
    let mut fragments = fragments.into_iter();
    for g in 0..=len {
        let mut gap = std::mem::take(&mut edits.gaps[g]);
        gap.sort_by_key(|insert| insert.rank);
        out.extend(gap.into_iter().map(|insert| insert.fragment));

        let Some(fragment) = fragments.next() else {
            break;
        };
        if edits.hidden[g] {
            continue;
        }
        if edits.crossed[g] {
            if let Some(source) = fragment.source() {
                out.push(Fragment::text(source));
            }
            continue;
        }
        match (fragment, edits.within[g].take()) {
            (Fragment::Text(text), Some(local)) => split_text(&text, local, &mut out),
            (fragment, _) => out.push(fragment),
        }
    }
    out
}

fn split_text(text: &str, mut edits: LocalEdits, out: &mut Vec<Fragment>) {
    edits.inserts.sort_by_key(|(offset, insert)| (*offset, insert.rank));
    let deleted = merge_spans(edits.deleted);
    let mut inserts = edits.inserts.into_iter().peekable();
    let mut next_deleted = 0;
    let mut run = String::new();
    for (i, ch) in text.char_indices() {
        while let Some((_, insert)) = inserts.next_if(|(offset, _)| *offset <= i) {
            flush(&mut run, out);
            out.push(insert.fragment);
        }
        while deleted.get(next_deleted).is_some_and(|d| d.end <= i) {
            next_deleted += 1;
        }
        if !deleted.get(next_deleted).is_some_and(|d| d.start <= i) {
            run.push(ch);
        }
    }
    flush(&mut run, out);
    out.extend(inserts.map(|(_, insert)| insert.fragment));
}

/// Sorted, non-overlapping cover of `spans`.
fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by_key(|span| span.start);
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans.into_iter().filter(|span| !span.is_empty()) {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

fn flush(run: &mut String, out: &mut Vec<Fragment>) {
    if !run.is_empty() {
        out.push(Fragment::Text(std::mem::take(run)));
    }
}
