//! Order-insensitive comparison of tuple lists.

use crate::tuple::Tuple;

/// Sorted canonical strings of `tuples`. Two lists are equal as multisets iff
/// their normal forms are equal.
pub fn normalize(tuples: &[Tuple]) -> Vec<String> {
    let mut out: Vec<String> = tuples.iter().map(Tuple::canonical).collect();
    out.sort();
    out
}

/// Whether every list equals the first one as a multiset of tuples.
/// Vacuously true for no lists.
pub fn all_identical<L: AsRef<[Tuple]>>(lists: &[L]) -> bool {
    let Some((first, rest)) = lists.split_first() else {
        return true;
    };
    let reference = normalize(first.as_ref());
    rest.iter().all(|l| normalize(l.as_ref()) == reference)
}
