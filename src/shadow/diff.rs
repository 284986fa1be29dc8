use std::collections;

/// Shadow records to delete and to add after a document mutation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShadowDiff {
    /// Keys present before and absent after.
    pub to_delete: collections::BTreeSet<String>,
    /// Keys absent before and present after.
    pub to_add: collections::BTreeSet<String>,
}

impl ShadowDiff {
    /// Union of `diffs`, side by side.
    pub fn merge(diffs: impl IntoIterator<Item = Self>) -> Self {
        diffs
            .into_iter()
            .fold(Self::default(), |mut merged, diff| {
                merged.to_delete.extend(diff.to_delete);
                merged.to_add.extend(diff.to_add);
                merged
            })
    }

    /// Whether nothing changes.
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_add.is_empty()
    }

    /// Number of shadow writes the diff costs.
    pub fn len(&self) -> usize {
        self.to_delete.len() + self.to_add.len()
    }
}

/// `old − new` and `new − old`, with both inputs read as sets.
///
/// ```rust
/// use dynamodb_shadow::shadow::diff;
///
/// let diff = diff::diff(["a", "b"], ["b", "c"]);
/// assert!(diff.to_delete.contains("a"));
/// assert!(diff.to_add.contains("c"));
/// ```
pub fn diff<O, N>(old: O, new: N) -> ShadowDiff
where
    O: IntoIterator,
    O::Item: Into<String>,
    N: IntoIterator,
    N::Item: Into<String>,
{
    let old: collections::BTreeSet<String> = old.into_iter().map(Into::into).collect();
    let new: collections::BTreeSet<String> = new.into_iter().map(Into::into).collect();
    ShadowDiff {
        to_delete: old.difference(&new).cloned().collect(),
        to_add: new.difference(&old).cloned().collect(),
    }
}
