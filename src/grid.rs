//! Spatial queries: ordered radius lookups and a bucket grid for the
//! per-frame motion pass.

use crate::arena::{EntityId, Identified};
use crate::ecology::Populations;
use crate::geometry::{Bounds, Vec2};
use crate::organism::{Animal, Located, Plant, Species};

/// Entities of `candidates` within `radius` (inclusive) of `origin`,
/// nearest first. `origin` itself is never returned.
pub fn neighbors<'a, T: Located>(origin: &impl Located, radius: f32, candidates: &'a [T]) -> Vec<&'a T> {
    let center = origin.position();
    let radius_sq = radius * radius;
    let own_id = origin.id();

    let mut found: Vec<(f32, &'a T)> = candidates
        .iter()
        .filter(|c| c.id() != own_id)
        .filter_map(|c| {
            let d_sq = c.position().distance_squared(center);
            (d_sq <= radius_sq).then_some((d_sq, c))
        })
        .collect();

    // Squared distance is monotonic in distance, so it is a valid sort key
    found.sort_by(|a, b| a.0.total_cmp(&b.0));
    found.into_iter().map(|(_, c)| c).collect()
}

/// Read-only view of the populations used by the decision engine
#[derive(Clone, Copy)]
pub struct Surroundings<'a> {
    populations: &'a Populations,
}

impl<'a> Surroundings<'a> {
    pub fn new(populations: &'a Populations) -> Self {
        Self { populations }
    }

    pub fn nearby_plants(&self, origin: &impl Located, radius: f32) -> Vec<&'a Plant> {
        neighbors(origin, radius, self.populations.plants.as_slice())
    }

    pub fn nearby_fish(&self, origin: &impl Located, radius: f32) -> Vec<&'a Animal> {
        neighbors(origin, radius, self.populations.fish.as_slice())
    }

    pub fn nearby_trout(&self, origin: &impl Located, radius: f32) -> Vec<&'a Animal> {
        neighbors(origin, radius, self.populations.trout.as_slice())
    }

    pub fn nearby_sharks(&self, origin: &impl Located, radius: f32) -> Vec<&'a Animal> {
        neighbors(origin, radius, self.populations.sharks.as_slice())
    }

    pub fn nearby(&self, species: Species, origin: &impl Located, radius: f32) -> Vec<&'a Animal> {
        match self.populations.animals(species) {
            Some(arena) => neighbors(origin, radius, arena.as_slice()),
            None => Vec::new(),
        }
    }

    /// Predators of `animal` within `radius`: trout and sharks for a fish,
    /// sharks for a trout. Results are merged and ordered by distance.
    pub fn nearby_predators(&self, animal: &Animal, radius: f32) -> Vec<&'a Animal> {
        let mut predators: Vec<&'a Animal> = animal
            .species
            .predators()
            .iter()
            .flat_map(|species| self.nearby(*species, animal, radius))
            .collect();

        let center = animal.position;
        predators.sort_by(|a, b| {
            a.position
                .distance_squared(center)
                .total_cmp(&b.position.distance_squared(center))
        });
        predators
    }

    /// Leader plus its nearest trout allies, at most `max_size` in total
    pub fn form_trout_pack(&self, leader: &Animal, radius: f32, max_size: usize) -> Vec<EntityId> {
        std::iter::once(leader.id())
            .chain(self.nearby_trout(leader, radius).into_iter().map(Identified::id))
            .take(max_size.max(1))
            .collect()
    }

    /// Resolve a non-owning animal reference; `None` once it was removed
    pub fn animal(&self, id: EntityId) -> Option<&'a Animal> {
        self.populations.animal(id)
    }

    pub fn plant(&self, id: EntityId) -> Option<&'a Plant> {
        self.populations.plants.get(id)
    }
}

/// Uniform grid of buckets over the playfield.
///
/// Each bucket holds indices into a caller-owned slice. The grid is
/// rebuilt before every motion frame, so lookups cost O(1) per touched
/// bucket instead of a scan over every animal.
#[derive(Clone, Debug)]
pub struct BucketGrid {
    cell_size: f32,
    cols: usize,
    rows: usize,
    /// cells[row * cols + col] contains indices of entities in that cell
    cells: Vec<Vec<usize>>,
}

impl BucketGrid {
    pub fn new(bounds: Bounds, cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 64.0 };
        let cols = ((bounds.width / cell_size).ceil() as usize).max(1);
        let rows = ((bounds.height / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
        }
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    #[inline]
    fn cell_of(&self, position: Vec2) -> (usize, usize) {
        let col = (position.x / self.cell_size).floor().max(0.0) as usize;
        let row = (position.y / self.cell_size).floor().max(0.0) as usize;
        (col.min(self.cols - 1), row.min(self.rows - 1))
    }

    #[inline]
    pub fn insert(&mut self, position: Vec2, index: usize) {
        let (col, row) = self.cell_of(position);
        self.cells[row * self.cols + col].push(index);
    }

    /// Clear and insert every position with its slice index
    pub fn rebuild<I: IntoIterator<Item = Vec2>>(&mut self, positions: I) {
        self.clear();
        for (index, position) in positions.into_iter().enumerate() {
            self.insert(position, index);
        }
    }

    /// Candidate indices in every bucket touched by the square around
    /// `center` of half-width `radius`. Callers filter by exact distance.
    pub fn query(&self, center: Vec2, radius: f32) -> Vec<usize> {
        let radius = radius.max(0.0);
        let (c_min, r_min) = self.cell_of(Vec2::new(center.x - radius, center.y - radius));
        let (c_max, r_max) = self.cell_of(Vec2::new(center.x + radius, center.y + radius));

        let mut results = Vec::new();
        for row in r_min..=r_max {
            for col in c_min..=c_max {
                results.extend_from_slice(&self.cells[row * self.cols + col]);
            }
        }
        results
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ecology::IdAllocator;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn populations_with(trout_positions: &[(f32, f32)], fish_positions: &[(f32, f32)]) -> Populations {
        let config = Config::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut ids = IdAllocator::new();
        let mut pops = Populations::new();

        for &(x, y) in trout_positions {
            pops.trout.insert(Animal::new(
                ids.allocate(),
                Species::Trout,
                Vec2::new(x, y),
                &config.trout.profile,
                &mut rng,
            ));
        }
        for &(x, y) in fish_positions {
            pops.fish.insert(Animal::new(
                ids.allocate(),
                Species::Fish,
                Vec2::new(x, y),
                &config.fish.profile,
                &mut rng,
            ));
        }
        pops
    }

    #[test]
    fn test_neighbors_sorted_and_inclusive() {
        let pops = populations_with(&[(0.0, 0.0), (30.0, 40.0), (10.0, 0.0), (100.0, 0.0)], &[]);
        let origin = &pops.trout.as_slice()[0];

        let found = neighbors(origin, 50.0, pops.trout.as_slice());
        let positions: Vec<Vec2> = found.iter().map(|a| a.position).collect();

        // (30, 40) sits exactly on the radius and is included
        assert_eq!(positions, vec![Vec2::new(10.0, 0.0), Vec2::new(30.0, 40.0)]);
    }

    #[test]
    fn test_neighbors_excludes_self() {
        let pops = populations_with(&[(5.0, 5.0)], &[]);
        let origin = &pops.trout.as_slice()[0];
        assert!(neighbors(origin, 1000.0, pops.trout.as_slice()).is_empty());
    }

    #[test]
    fn test_predators_merged_by_distance() {
        let config = Config::default();
        let mut pops = populations_with(&[(200.0, 0.0)], &[(0.0, 0.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        pops.sharks.insert(Animal::new(
            500,
            Species::Shark,
            Vec2::new(50.0, 0.0),
            &config.shark.profile,
            &mut rng,
        ));

        let view = Surroundings::new(&pops);
        let fish = &pops.fish.as_slice()[0];
        let predators = view.nearby_predators(fish, 300.0);

        assert_eq!(predators.len(), 2);
        assert_eq!(predators[0].species, Species::Shark);
        assert_eq!(predators[1].species, Species::Trout);

        // Trout only fear sharks
        let trout = &pops.trout.as_slice()[0];
        assert_eq!(view.nearby_predators(trout, 300.0).len(), 1);
    }

    #[test]
    fn test_pack_is_bounded_and_led() {
        let pops = populations_with(&[(0.0, 0.0), (20.0, 0.0), (40.0, 0.0), (60.0, 0.0)], &[]);
        let view = Surroundings::new(&pops);
        let leader = &pops.trout.as_slice()[2];

        let pack = view.form_trout_pack(leader, 220.0, 3);
        assert_eq!(pack.len(), 3);
        assert_eq!(pack[0], leader.id());
    }

    #[test]
    fn test_bucket_grid_query() {
        let mut grid = BucketGrid::new(Bounds::new(640.0, 320.0), 64.0);
        assert_eq!(grid.dimensions(), (10, 5));

        grid.rebuild([
            Vec2::new(10.0, 10.0),
            Vec2::new(70.0, 10.0),
            Vec2::new(600.0, 300.0),
            Vec2::new(-5.0, 900.0),
        ]);

        let near = grid.query(Vec2::new(40.0, 20.0), 30.0);
        assert!(near.contains(&0));
        assert!(near.contains(&1));
        assert!(!near.contains(&2));

        // Out-of-bounds positions land in edge buckets
        assert!(grid.query(Vec2::new(0.0, 319.0), 1.0).contains(&3));
    }
}
