//! Score Calculator: Silhouette Score (SS), Dunn Index (DI), and
//! Davies–Bouldin Index (DBI) over a clustering, computed from a precomputed
//! pairwise-distance dictionary restricted to the entities under test.
//!
//! Distances are `1 - coefficient`, so the closer the coefficient is to `1`
//! (identical term sets), the smaller the distance; an absent pair
//! (coefficient `0.0`, indistinguishable from a stored `0.0`) becomes
//! distance `1.0`, treating every missing pair as maximally dissimilar.

use std::collections::HashMap;

use crate::domain::EntityIndex;

/// Reduction of a list of distances to a single scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Linkage {
    /// Mean of the list. Default linkage for Dunn/DBI cluster reductions.
    #[default]
    Average,
    /// Maximum of the list.
    Complete,
    /// Minimum of the list.
    Single,
}

impl Linkage {
    /// Reduce `distances` to a scalar under this linkage. Empty lists reduce to `0.0`.
    pub fn reduce(&self, distances: &[f64]) -> f64 {
        if distances.is_empty() {
            return 0.0;
        }
        match self {
            Linkage::Average => distances.iter().sum::<f64>() / distances.len() as f64,
            Linkage::Complete => distances.iter().copied().fold(f64::MIN, f64::max),
            Linkage::Single => distances.iter().copied().fold(f64::MAX, f64::min),
        }
    }
}

/// One entity's cluster assignment, keyed by a caller-assigned dense cluster index.
#[derive(Debug, Clone, Copy)]
pub struct ClusterAssignment {
    /// The entity being assigned.
    pub entity: EntityIndex,
    /// Dense cluster index (`0..num_clusters`).
    pub cluster: usize,
}

/// Combined result of the three cluster-validity indices over one category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterScores {
    /// Global Silhouette Score. Higher is better. `0.0` if a single cluster.
    pub silhouette: f64,
    /// Dunn Index. Higher is better. `0.0` if a single cluster.
    pub dunn: f64,
    /// Davies-Bouldin Index. Lower is better. `0.0` if a single cluster.
    pub davies_bouldin: f64,
    /// Per-cluster average partial silhouette score, auxiliary output.
    pub per_cluster_silhouette: HashMap<usize, f64>,
}

/// Compute SS/DI/DBI for `assignments` given a pairwise coefficient lookup.
///
/// `coefficient` should return the stored similarity coefficient for a pair
/// (not yet converted to a distance); this function performs the `1 -
/// coefficient` conversion once, filtering out `d <= 0` pairs (perfectly
/// identical term sets) from every accumulator.
pub fn compute_cluster_scores(
    assignments: &[ClusterAssignment],
    linkage: Linkage,
    mut coefficient: impl FnMut(EntityIndex, EntityIndex) -> f64,
) -> ClusterScores {
    let n = assignments.len();
    let num_clusters = assignments.iter().map(|a| a.cluster).max().map_or(0, |m| m + 1);

    if num_clusters <= 1 {
        return ClusterScores::default();
    }

    let mut entity_intra: Vec<Vec<f64>> = vec![Vec::new(); n];
    let mut entity_inter: Vec<HashMap<usize, Vec<f64>>> = vec![HashMap::new(); n];
    let mut cluster_intra: HashMap<usize, Vec<f64>> = HashMap::new();
    let mut cluster_inter: HashMap<(usize, usize), Vec<f64>> = HashMap::new();
    let mut cluster_size: HashMap<usize, usize> = HashMap::new();

    for a in assignments {
        *cluster_size.entry(a.cluster).or_insert(0) += 1;
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let d = 1.0 - coefficient(assignments[i].entity, assignments[j].entity);
            if d <= 0.0 {
                continue;
            }
            let (ci, cj) = (assignments[i].cluster, assignments[j].cluster);
            if ci == cj {
                entity_intra[i].push(d);
                entity_intra[j].push(d);
                cluster_intra.entry(ci).or_default().push(d);
            } else {
                entity_inter[i].entry(cj).or_default().push(d);
                entity_inter[j].entry(ci).or_default().push(d);
                let key = (ci.min(cj), ci.max(cj));
                cluster_inter.entry(key).or_default().push(d);
            }
        }
    }

    let avg = |xs: &[f64]| -> f64 {
        if xs.is_empty() {
            0.0
        } else {
            xs.iter().sum::<f64>() / xs.len() as f64
        }
    };

    let clusters: Vec<usize> = (0..num_clusters).collect();

    // Silhouette always uses average linkage regardless of the `linkage` parameter.
    let mut total = 0.0;
    let mut per_cluster_sum: HashMap<usize, f64> = HashMap::new();
    for (i, a) in assignments.iter().enumerate() {
        let n_c = *cluster_size.get(&a.cluster).unwrap_or(&0);
        let intra = avg(&entity_intra[i]);

        let other_clusters = clusters.iter().filter(|&&c| c != a.cluster);
        let b = other_clusters
            .map(|c| entity_inter[i].get(c).map_or(0.0, |xs| avg(xs)))
            .fold(f64::INFINITY, f64::min);
        let b = if b.is_finite() { b } else { 0.0 };

        let denom = intra.max(b);
        let s = if n_c > 1 && denom > 0.0 {
            (b - intra) / denom
        } else {
            0.0
        };

        total += s;
        *per_cluster_sum.entry(a.cluster).or_insert(0.0) += s;
    }
    let silhouette = total / n as f64;
    let per_cluster_silhouette = per_cluster_sum
        .into_iter()
        .map(|(c, sum)| {
            let size = *cluster_size.get(&c).unwrap_or(&1) as f64;
            (c, sum / size)
        })
        .collect();

    // Dunn index.
    let max_intra = clusters
        .iter()
        .map(|c| linkage.reduce(cluster_intra.get(c).map_or(&[][..], |v| v.as_slice())))
        .fold(0.0_f64, f64::max);
    let mut missing_inter = false;
    let mut min_inter = f64::INFINITY;
    for i in 0..clusters.len() {
        for j in (i + 1)..clusters.len() {
            match cluster_inter.get(&(clusters[i], clusters[j])) {
                Some(xs) if !xs.is_empty() => {
                    min_inter = min_inter.min(linkage.reduce(xs));
                }
                _ => missing_inter = true,
            }
        }
    }
    let numerator = if missing_inter { 0.0 } else { min_inter };
    let dunn = if max_intra > 0.0 {
        numerator / max_intra
    } else if numerator > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    // Davies-Bouldin index.
    let cluster_scatter: HashMap<usize, f64> = clusters
        .iter()
        .map(|&c| {
            (
                c,
                linkage.reduce(cluster_intra.get(&c).map_or(&[][..], |v| v.as_slice())),
            )
        })
        .collect();
    let mut db_sum = 0.0;
    for &c in &clusters {
        let mut worst = 0.0_f64;
        for &other in &clusters {
            if other == c {
                continue;
            }
            let key = (c.min(other), c.max(other));
            let m = cluster_inter
                .get(&key)
                .map_or(0.0, |xs| linkage.reduce(xs));
            let ratio = if m > 0.0 {
                (cluster_scatter[&c] + cluster_scatter[&other]) / m
            } else {
                f64::INFINITY
            };
            worst = worst.max(ratio);
        }
        db_sum += worst;
    }
    let davies_bouldin = db_sum / num_clusters as f64;

    ClusterScores {
        silhouette,
        dunn,
        davies_bouldin,
        per_cluster_silhouette,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    /// Clusters {A,B}, {C}, {D}; d(A,B)=0.2, all cross-pair distances=0.9, d(C,D)=0.9.
    fn scenario() -> (Vec<ClusterAssignment>, HashMap<(EntityIndex, EntityIndex), f64>) {
        // entities: A=0, B=1, C=2, D=3; clusters: {A,B}=0, {C}=1, {D}=2.
        let assignments = vec![
            ClusterAssignment { entity: 0, cluster: 0 },
            ClusterAssignment { entity: 1, cluster: 0 },
            ClusterAssignment { entity: 2, cluster: 1 },
            ClusterAssignment { entity: 3, cluster: 2 },
        ];
        let mut coef = HashMap::new();
        // coefficient = 1 - distance.
        coef.insert((0, 1), 1.0 - 0.2);
        coef.insert((0, 2), 1.0 - 0.9);
        coef.insert((0, 3), 1.0 - 0.9);
        coef.insert((1, 2), 1.0 - 0.9);
        coef.insert((1, 3), 1.0 - 0.9);
        coef.insert((2, 3), 1.0 - 0.9);
        (assignments, coef)
    }

    fn lookup(coef: &HashMap<(EntityIndex, EntityIndex), f64>, a: EntityIndex, b: EntityIndex) -> f64 {
        let key = (a.min(b), a.max(b));
        *coef.get(&key).unwrap_or(&0.0)
    }

    #[test]
    fn silhouette_matches_concrete_scenario() {
        let (assignments, coef) = scenario();
        let scores = compute_cluster_scores(&assignments, Linkage::Average, |a, b| lookup(&coef, a, b));
        assert_abs_diff_eq!(scores.silhouette, 0.388_888_9, epsilon = 1e-6);
    }

    #[test]
    fn dunn_matches_concrete_scenario() {
        let (assignments, coef) = scenario();
        let scores = compute_cluster_scores(&assignments, Linkage::Average, |a, b| lookup(&coef, a, b));
        assert_abs_diff_eq!(scores.dunn, 4.5, epsilon = 1e-9);
    }

    #[test]
    fn davies_bouldin_is_finite_for_well_separated_clusters() {
        let (assignments, coef) = scenario();
        let scores = compute_cluster_scores(&assignments, Linkage::Average, |a, b| lookup(&coef, a, b));
        assert!(scores.davies_bouldin.is_finite());
        assert!(scores.davies_bouldin > 0.0);
    }

    #[test]
    fn single_cluster_collapses_to_zero() {
        let assignments = vec![
            ClusterAssignment { entity: 0, cluster: 0 },
            ClusterAssignment { entity: 1, cluster: 0 },
        ];
        let scores = compute_cluster_scores(&assignments, Linkage::Average, |_, _| 0.5);
        assert_eq!(scores, ClusterScores::default());
    }

    #[test]
    fn singleton_clusters_give_zero_silhouette_for_that_entity() {
        let assignments = vec![
            ClusterAssignment { entity: 0, cluster: 0 },
            ClusterAssignment { entity: 1, cluster: 1 },
        ];
        let scores = compute_cluster_scores(&assignments, Linkage::Average, |_, _| 0.5);
        assert_eq!(scores.silhouette, 0.0);
    }
}
