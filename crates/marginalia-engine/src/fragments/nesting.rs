use super::Fragment;

/// Open/close matching over a fragment sequence.
///
/// Every `Close` pairs with the nearest unmatched `Open` of the same name.
/// Opens skipped over by such a match, opens never closed and closes without
/// an opener are malformed and belong to no pair.
#[derive(Debug, Clone, Default)]
pub struct Nesting {
    partner: Vec<Option<usize>>,
    malformed: Vec<bool>,
}

impl Nesting {
    pub fn new(fragments: &[Fragment]) -> Self {
        let mut partner = vec![None; fragments.len()];
        let mut malformed = vec![false; fragments.len()];
        let mut stack: Vec<usize> = Vec::new();

        for (i, fragment) in fragments.iter().enumerate() {
            match fragment {
                Fragment::Open { .. } => stack.push(i),
                Fragment::Close { name, .. } => {
                    let found = stack
                        .iter()
                        .rposition(|&open| fragments[open].name() == Some(name.as_str()));
                    match found {
                        Some(at) => {
                            let open = stack[at];
                            for skipped in stack.drain(at..).skip(1) {
                                malformed[skipped] = true;
                            }
                            partner[open] = Some(i);
                            partner[i] = Some(open);
                        }
                        None => malformed[i] = true,
                    }
                }
                _ => {}
            }
        }
        for open in stack {
            malformed[open] = true;
        }
        Self { partner, malformed }
    }

    /// The matching close of an open, or open of a close.
    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partner.get(index).copied().flatten()
    }

    pub fn is_malformed(&self, index: usize) -> bool {
        self.malformed.get(index).copied().unwrap_or(false)
    }

    /// Well-formed `(open, close)` pairs, ordered by open index.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.partner
            .iter()
            .enumerate()
            .filter_map(|(open, close)| close.filter(|&c| c > open).map(|c| (open, c)))
    }

    /// Opens of the well-formed elements enclosing fragment `index`,
    /// outermost first.
    pub fn chain(&self, index: usize) -> Vec<usize> {
        self.pairs()
            .filter(|&(open, close)| open < index && index < close)
            .map(|(open, _)| open)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn open(name: &str) -> Fragment {
        Fragment::html(&format!("<{name}>"))
    }

    fn close(name: &str) -> Fragment {
        Fragment::html(&format!("</{name}>"))
    }

    fn text(s: &str) -> Fragment {
        Fragment::Text(s.to_string())
    }

    #[test]
    fn balanced_pairs_and_chain() {
        let fragments = vec![
            open("em"),
            text("a"),
            open("strong"),
            text("b"),
            close("strong"),
            close("em"),
        ];
        let nesting = Nesting::new(&fragments);
        assert_eq!(nesting.pairs().collect::<Vec<_>>(), vec![(0, 5), (2, 4)]);
        assert_eq!(nesting.chain(3), vec![0, 2]);
        assert_eq!(nesting.chain(1), vec![0]);
        assert_eq!(nesting.partner(4), Some(2));
        assert!((0..fragments.len()).all(|i| !nesting.is_malformed(i)));
    }

    #[test]
    fn skipped_and_unclosed_opens_are_malformed() {
        let fragments = vec![
            open("span"),
            open("b"),
            text("x"),
            close("span"),
            open("i"),
            close("u"),
        ];
        let nesting = Nesting::new(&fragments);
        assert_eq!(nesting.pairs().collect::<Vec<_>>(), vec![(0, 3)]);
        assert!(nesting.is_malformed(1));
        assert!(nesting.is_malformed(4));
        assert!(nesting.is_malformed(5));
        assert!(!nesting.is_malformed(0));
        assert_eq!(nesting.chain(2), vec![0]);
    }

    #[test]
    fn close_matches_nearest_same_name() {
        let fragments = vec![open("span"), open("span"), close("span"), close("span")];
        let nesting = Nesting::new(&fragments);
        assert_eq!(nesting.partner(1), Some(2));
        assert_eq!(nesting.partner(0), Some(3));
    }
}
