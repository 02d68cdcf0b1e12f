//! Label identities for a single method.
//!
//! Every branch, switch case, payload reference and try/catch boundary names its target
//! through a label. Labels are interned by `(kind, address)` so that all references to the
//! same target render against one label directive.

use std::collections::HashMap;
use std::fmt;

use log::trace;

/// Label kinds. Variants are declared in the alphabetical order of their prefixes, so
/// the derived ordering is also the ordering of the rendered names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelKind {
    ArrayData,
    Catch,
    CatchAll,
    Cond,
    Goto,
    PackedSwitch,
    PackedSwitchData,
    SparseSwitch,
    SparseSwitchData,
    TryEnd,
    TryStart,
}

impl LabelKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            LabelKind::ArrayData => "array_",
            LabelKind::Catch => "catch_",
            LabelKind::CatchAll => "catchall_",
            LabelKind::Cond => "cond_",
            LabelKind::Goto => "goto_",
            LabelKind::PackedSwitch => "pswitch_",
            LabelKind::PackedSwitchData => "pswitch_data_",
            LabelKind::SparseSwitch => "sswitch_",
            LabelKind::SparseSwitchData => "sswitch_data_",
            LabelKind::TryEnd => "try_end_",
            LabelKind::TryStart => "try_start_",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId {
    pub kind: LabelKind,
    pub address: u32,
}

impl LabelId {
    pub fn new(kind: LabelKind, address: u32) -> Self {
        LabelId { kind, address }
    }
}

/// Handle to an interned label, only meaningful for the cache that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelRef(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    id: LabelId,
    sequence: Option<u32>,
}

impl Label {
    pub fn id(&self) -> LabelId {
        self.id
    }

    pub fn kind(&self) -> LabelKind {
        self.id.kind
    }

    pub fn address(&self) -> u32 {
        self.id.address
    }

    pub fn sequence(&self) -> Option<u32> {
        self.sequence
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence {
            Some(n) => write!(f, ":{}{}", self.id.kind.prefix(), n),
            None => write!(f, ":{}{:x}", self.id.kind.prefix(), self.id.address),
        }
    }
}

/// Arena of interned labels.
#[derive(Debug, Default)]
pub struct LabelCache {
    labels: Vec<Label>,
    index: HashMap<LabelId, LabelRef>,
}

impl LabelCache {
    pub fn new() -> Self {
        LabelCache::default()
    }

    /// The canonical label for `id`, created on first request.
    pub fn intern(&mut self, id: LabelId) -> LabelRef {
        if let Some(existing) = self.index.get(&id) {
            return *existing;
        }
        let label_ref = LabelRef(self.labels.len());
        self.labels.push(Label { id, sequence: None });
        self.index.insert(id, label_ref);
        label_ref
    }

    /// The label behind `label`, or `None` if it was issued by another cache.
    pub fn get(&self, label: LabelRef) -> Option<&Label> {
        self.labels.get(label.0)
    }

    // refs handed out by this cache always index into `labels`
    pub(crate) fn label(&self, label: LabelRef) -> &Label {
        &self.labels[label.0]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All labels ordered by address, then kind.
    pub fn sorted_labels(&self) -> Vec<LabelRef> {
        let mut refs: Vec<LabelRef> = (0..self.labels.len()).map(LabelRef).collect();
        refs.sort_by_key(|r| {
            let id = self.labels[r.0].id;
            (id.address, id.kind)
        });
        refs
    }

    /// Numbers labels from 0 per kind, in address order. Any previous numbering is
    /// discarded, so this can be rerun after more labels were interned.
    pub fn assign_sequential_numbers(&mut self) {
        let mut next_sequence: HashMap<LabelKind, u32> = HashMap::new();
        for label_ref in self.sorted_labels() {
            let label = &mut self.labels[label_ref.0];
            let sequence = next_sequence.entry(label.id.kind).or_insert(0);
            label.sequence = Some(*sequence);
            *sequence += 1;
        }
        trace!("numbered {} labels across {} kinds", self.labels.len(), next_sequence.len());
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelCache, LabelId, LabelKind};

    #[test]
    fn interning_coalesces() {
        let mut cache = LabelCache::new();
        let a = cache.intern(LabelId::new(LabelKind::Cond, 0x10));
        let b = cache.intern(LabelId::new(LabelKind::Cond, 0x10));
        let c = cache.intern(LabelId::new(LabelKind::Goto, 0x10));
        let d = cache.intern(LabelId::new(LabelKind::Cond, 0x12));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_ne!(c, d);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn address_names_by_default() {
        let mut cache = LabelCache::new();
        let l = cache.intern(LabelId::new(LabelKind::TryStart, 0x1a));
        assert_eq!(cache.label(l).to_string(), ":try_start_1a");
        assert_eq!(cache.label(l).sequence(), None);
    }

    #[test]
    fn sequential_numbers_per_kind() {
        let mut cache = LabelCache::new();
        let late_cond = cache.intern(LabelId::new(LabelKind::Cond, 0x20));
        let goto = cache.intern(LabelId::new(LabelKind::Goto, 0x08));
        let early_cond = cache.intern(LabelId::new(LabelKind::Cond, 0x04));
        let same_addr_goto = cache.intern(LabelId::new(LabelKind::Goto, 0x20));
        cache.assign_sequential_numbers();

        assert_eq!(cache.label(early_cond).to_string(), ":cond_0");
        assert_eq!(cache.label(late_cond).to_string(), ":cond_1");
        assert_eq!(cache.label(goto).to_string(), ":goto_0");
        assert_eq!(cache.label(same_addr_goto).to_string(), ":goto_1");

        // renumbering after a new label shifts the later ones
        let new_cond = cache.intern(LabelId::new(LabelKind::Cond, 0x10));
        cache.assign_sequential_numbers();
        assert_eq!(cache.label(new_cond).sequence(), Some(1));
        assert_eq!(cache.label(late_cond).sequence(), Some(2));
    }

    #[test]
    fn sorted_by_address_then_kind() {
        let mut cache = LabelCache::new();
        let s = cache.intern(LabelId::new(LabelKind::TryStart, 4));
        let e = cache.intern(LabelId::new(LabelKind::TryEnd, 4));
        let g = cache.intern(LabelId::new(LabelKind::Goto, 0));
        assert_eq!(cache.sorted_labels(), vec![g, e, s]);
    }

    #[test]
    fn foreign_refs_do_not_resolve() {
        let mut big = LabelCache::new();
        big.intern(LabelId::new(LabelKind::Cond, 0));
        let foreign = big.intern(LabelId::new(LabelKind::Cond, 2));
        let mut small = LabelCache::new();
        let own = small.intern(LabelId::new(LabelKind::Goto, 0));
        assert_eq!(small.get(foreign), None);
        assert_eq!(small.get(own).map(|l| l.to_string()), Some(":goto_0".to_string()));
    }
}
