//! Cluster-validity comparator: Silhouette/Dunn/Davies-Bouldin
//! per category via the Score Calculator, restricted to the mapped ids.

use std::collections::HashMap;

use crate::comparator::{ClusterLabel, CompareContext, ComparisonOutcome, Metric};
use crate::core::errors::{CoherenceError, Result};
use crate::domain::{Category, EntityIndex};
use crate::registry::IdentifierRegistry;
use crate::score::{compute_cluster_scores, ClusterAssignment, Linkage};

pub(super) fn compare(
    ctx: &CompareContext<'_>,
    assignments: &[(String, ClusterLabel)],
    id_type: &str,
) -> Result<ComparisonOutcome> {
    let namespace = IdentifierRegistry::resolve_namespace(id_type)?;
    let domain = namespace.domain();

    let mut label_index: HashMap<ClusterLabel, usize> = HashMap::new();
    let mut cluster_assignments: Vec<ClusterAssignment> = Vec::new();
    let mut mapped_ids = Vec::new();

    for (id, label) in assignments {
        let entities = ctx.registry.canonicalize(id, namespace)?;
        let Some(&entity) = entities.first() else {
            continue;
        };
        let next = label_index.len();
        let cluster = *label_index.entry(label.clone()).or_insert(next);
        cluster_assignments.push(ClusterAssignment { entity, cluster });
        mapped_ids.push(id.clone());
    }

    if cluster_assignments.is_empty() {
        return Err(CoherenceError::no_mapping(
            "none of the clustering's ids resolved to a known entity",
        ));
    }

    let entities: Vec<EntityIndex> = cluster_assignments.iter().map(|a| a.entity).collect();

    let mut outcome = ComparisonOutcome::default();
    for &category in Category::all_for(domain) {
        ctx.check_cancelled()?;

        ctx.extender.extend(
            ctx.distances,
            ctx.annotations,
            domain,
            ctx.coefficient,
            category,
            &entities,
        );

        let scores = compute_cluster_scores(&cluster_assignments, Linkage::Average, |a, b| {
            ctx.distances.get(category, ctx.coefficient, a, b)
        });

        let missing = entities
            .iter()
            .filter(|&&e| !ctx.annotations.has_annotation(e, category))
            .count();

        outcome.record(Metric::Silhouette, category, scores.silhouette);
        outcome.record(Metric::Dunn, category, scores.dunn);
        outcome.record(Metric::DaviesBouldin, category, scores.davies_bouldin);
        outcome.mapped_ids.insert(category, mapped_ids.clone());
        outcome.missing_counts.insert(category, missing);
    }
    Ok(outcome)
}
