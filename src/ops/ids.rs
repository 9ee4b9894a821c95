use crate::model::item::{ItemKind, Tree};

/// Hands out tree ids of the form `<kind>_<n>` from one monotonic counter.
///
/// The counter is seeded above the largest trailing number found in any id
/// already in the tree, so a generated id never repeats an existing one.
/// Once `u64::MAX` has been seen or handed out the generator is exhausted
/// and yields nothing.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    /// `None` when no number is left
    next: Option<u64>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        IdGenerator { next: Some(1) }
    }
}

impl IdGenerator {
    pub fn seeded_from(tree: &Tree) -> Self {
        let mut generator = IdGenerator::default();
        generator.observe_tree(tree);
        generator
    }

    /// Bump the counter past every numbered id in `tree`
    pub fn observe_tree(&mut self, tree: &Tree) {
        tree.for_each_id(&mut |id| self.observe(id));
    }

    /// Bump the counter past `id` if it ends in a number
    pub fn observe(&mut self, id: &str) {
        if let Some(n) = trailing_number(id) {
            self.raise_to(n.checked_add(1));
        }
    }

    /// Never hand out a number below `n`
    pub fn reserve_below(&mut self, n: u64) {
        self.raise_to(Some(n));
    }

    fn raise_to(&mut self, floor: Option<u64>) {
        self.next = match (self.next, floor) {
            (Some(next), Some(floor)) => Some(next.max(floor)),
            _ => None,
        };
    }

    /// The number the next id will carry; `u64::MAX` once exhausted
    pub fn peek(&self) -> u64 {
        self.next.unwrap_or(u64::MAX)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }

    /// Hand out the next id, or `None` when the number space is used up.
    pub fn next_id(&mut self, kind: ItemKind) -> Option<String> {
        let n = self.next?;
        self.next = n.checked_add(1);
        Some(format!("{}_{}", kind, n))
    }
}

/// Parse the run of ASCII digits at the end of `id`
pub fn trailing_number(id: &str) -> Option<u64> {
    let digits_start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    id[digits_start..].parse().ok()
}
