use burn::data::dataset::Dataset;

/// The seed edges of one partition, as a Burn dataset.
/// Each item is the index of a seed edge in the partition graph;
/// the batcher turns a run of them into a sampled subgraph.
pub struct SeedDataset {
    seeds: Vec<usize>,
}

impl SeedDataset {
    pub fn new(seeds: Vec<usize>) -> Self { Self { seeds } }

    pub fn seed_count(&self) -> usize { self.seeds.len() }
}

impl Dataset<usize> for SeedDataset {
    fn get(&self, index: usize) -> Option<usize> {
        self.seeds.get(index).copied()
    }

    fn len(&self) -> usize {
        self.seeds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_yields_seeds_in_order() {
        let dataset = SeedDataset::new(vec![4, 0, 9]);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.get(2), Some(9));
        assert_eq!(dataset.get(3), None);
        assert_eq!(dataset.iter().collect::<Vec<_>>(), vec![4, 0, 9]);
    }
}
