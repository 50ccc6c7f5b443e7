use std::ops::Range;

/// Contiguous split of a plane range across workers.
///
/// The first `len % workers` slabs get one extra plane; when there are more
/// workers than planes the trailing slabs are empty (`start == end`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlabPartition {
    slabs: Vec<Range<usize>>,
}

impl SlabPartition {
    pub fn new(extent: Range<usize>, workers: usize) -> Self {
        let workers = workers.max(1);
        let len = extent.len();
        let base = len / workers;
        let extra = len % workers;

        let mut slabs = Vec::with_capacity(workers);
        let mut start = extent.start;
        for w in 0..workers {
            let size = base + usize::from(w < extra);
            slabs.push(start..start + size);
            start += size;
        }
        SlabPartition { slabs }
    }

    pub fn slabs(&self) -> &[Range<usize>] {
        &self.slabs
    }

    pub fn workers(&self) -> usize {
        self.slabs.len()
    }

    /// Slabs with at least one plane. Always a prefix of `slabs()`.
    pub fn active(&self) -> impl Iterator<Item = &Range<usize>> {
        self.slabs.iter().filter(|slab| !slab.is_empty())
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }
}

/// Cuts `buf` into one mutable sub-slice per slab, each covering the slab's
/// planes. Slabs must be contiguous and ascending, which `SlabPartition`
/// guarantees.
pub(crate) fn split_slabs_mut<'a>(
    buf: &'a mut [f64],
    slabs: &[Range<usize>],
    plane: usize,
) -> Vec<&'a mut [f64]> {
    let mut out = Vec::with_capacity(slabs.len());
    let Some(first) = slabs.first() else {
        return out;
    };
    let (_, mut rest) = buf.split_at_mut(first.start * plane);
    for slab in slabs {
        let (head, tail) = rest.split_at_mut(slab.len() * plane);
        out.push(head);
        rest = tail;
    }
    out
}
