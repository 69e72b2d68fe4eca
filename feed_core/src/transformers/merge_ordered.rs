use crate::data_model::DataPoint;
use crate::point_source::PointSource;

/// N-way merge by `end_time`, ties broken by source index (first listed
/// wins). A generalization of `AuxiliarySync`'s two-way merge used by the
/// option-chain and futures-chain universe branches to
/// combine per-contract subscriptions into one ordered stream.
pub struct MergeOrdered {
    sources: Vec<Box<dyn PointSource>>,
    staged: Vec<Option<DataPoint>>,
    current: Option<DataPoint>,
}

impl MergeOrdered {
    pub fn new(sources: Vec<Box<dyn PointSource>>) -> Self {
        let staged = vec![None; sources.len()];
        MergeOrdered { sources, staged, current: None }
    }
}

impl PointSource for MergeOrdered {
    fn move_next(&mut self) -> bool {
        for (slot, source) in self.staged.iter_mut().zip(self.sources.iter_mut()) {
            if slot.is_none() && source.move_next() {
                *slot = source.current().cloned();
            }
        }

        let earliest = self
            .staged
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|p| (i, p.end_time)))
            .min_by_key(|(_, end_time)| *end_time)
            .map(|(i, _)| i);

        match earliest {
            Some(index) => {
                self.current = self.staged[index].take();
                true
            }
            None => {
                self.current = None;
                false
            }
        }
    }

    fn current(&self) -> Option<&DataPoint> {
        self.current.as_ref()
    }

    fn is_finished(&self) -> bool {
        self.staged.iter().all(Option::is_none) && self.sources.iter().all(|s| s.is_finished())
    }

    fn dispose(&mut self) {
        for source in self.sources.iter_mut() {
            source.dispose();
        }
    }
}
